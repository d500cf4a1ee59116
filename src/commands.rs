use crate::client::CommandError;
use crate::config::Apn;
use crate::timing::DATA_MODE_TIMEOUT_MS;
use chrono::{Datelike, NaiveDateTime, Timelike};
use core::fmt::Write;
use heapless::String;

/// Max. length of a command line without the `AT` prefix and line terminator
pub const COMMAND_SIZE: usize = 160;

/// Default marker signaling a successful exchange
pub const OK: &str = "OK";

/// Default marker signaling a rejected command
pub const ERROR: &str = "ERROR";

#[derive(Clone, Debug)]
enum Text {
    Static(&'static str),
    Formatted(String<COMMAND_SIZE>),
}

/// A single command exchange: text, deadline and reply markers
///
/// The `AT` prefix and the line terminator are added by the client.
#[derive(Clone, Debug)]
pub struct Command {
    text: Text,

    /// Deadline in ms. None => default command timeout of the driver config
    pub(crate) timeout_ms: Option<u32>,

    /// Substring marking success. None => no pattern match, wait for the deadline
    pub(crate) success: Option<&'static str>,

    /// Substring marking failure
    pub(crate) failure: Option<&'static str>,
}

impl Command {
    /// Command with the default `OK`/`ERROR` markers and the default timeout
    pub const fn new(text: &'static str) -> Self {
        Self {
            text: Text::Static(text),
            timeout_ms: None,
            success: Some(OK),
            failure: Some(ERROR),
        }
    }

    /// Formats the command text, fails if it does not fit in [COMMAND_SIZE]
    pub fn format(args: core::fmt::Arguments<'_>) -> Result<Self, CommandError> {
        let mut text = String::new();
        text.write_fmt(args).map_err(|_| CommandError::TooLong)?;

        Ok(Self {
            text: Text::Formatted(text),
            ..Self::new("")
        })
    }

    /// Overrides the deadline
    pub fn timeout_ms(mut self, timeout: u32) -> Self {
        self.timeout_ms = Some(timeout);
        self
    }

    /// Overrides the success and failure markers
    pub fn markers(mut self, success: Option<&'static str>, failure: Option<&'static str>) -> Self {
        self.success = success;
        self.failure = failure;
        self
    }

    pub fn text(&self) -> &str {
        match &self.text {
            Text::Static(text) => text,
            Text::Formatted(text) => text.as_str(),
        }
    }

    /// Bare `AT` used for syncing the link
    pub const fn sync() -> Self {
        Self::new("")
    }

    pub const fn echo_off() -> Self {
        Self::new("E0")
    }

    pub const fn factory_defaults() -> Self {
        Self::new("&F")
    }

    /// Stores the current configuration in the user profile
    pub const fn save_profile() -> Self {
        Self::new("&W")
    }

    /// Fixes the modem link speed
    pub fn set_baud_rate(baud_rate: u32) -> Result<Self, CommandError> {
        Self::format(format_args!("+IPR={}", baud_rate))
    }

    pub const fn imei() -> Self {
        Self::new("+GSN")
    }

    pub const fn clock_query() -> Self {
        Self::new("+CCLK?")
    }

    /// Sets the RTC. `year` is the two digit year
    pub fn clock_set(year: u8, time: &NaiveDateTime) -> Result<Self, CommandError> {
        Self::format(format_args!(
            "+CCLK=\"{:02}/{:02}/{:02},{:02}:{:02}:{:02}+00\"",
            year,
            time.month(),
            time.day(),
            time.hour(),
            time.minute(),
            time.second()
        ))
    }

    /// Sets a bearer profile parameter, e.g. `APN`
    pub fn bearer_parameter(name: &str, value: &str) -> Result<Self, CommandError> {
        Self::format(format_args!("+SAPBR=3,1,\"{}\",\"{}\"", name, value))
    }

    pub const fn bearer_open() -> Self {
        Self::new("+SAPBR=1,1")
    }

    pub const fn bearer_query() -> Self {
        Self::new("+SAPBR=2,1")
    }

    pub const fn bearer_close() -> Self {
        Self::new("+SAPBR=0,1")
    }

    pub const fn http_init() -> Self {
        Self::new("+HTTPINIT")
    }

    pub const fn http_term() -> Self {
        Self::new("+HTTPTERM")
    }

    /// Binds the HTTP context to bearer profile 1
    pub const fn http_bearer_profile() -> Self {
        Self::new("+HTTPPARA=\"CID\",1")
    }

    /// Sets the URL. Double quotes in the path get escaped as `%22`.
    pub fn http_url(server: &str, path: &str) -> Result<Self, CommandError> {
        let mut text: String<COMMAND_SIZE> = String::new();
        write!(text, "+HTTPPARA=\"URL\",\"{}", server).map_err(|_| CommandError::TooLong)?;

        for segment in path.split_inclusive('"') {
            let (segment, quoted) = match segment.strip_suffix('"') {
                Some(segment) => (segment, true),
                None => (segment, false),
            };

            text.push_str(segment).map_err(|_| CommandError::TooLong)?;
            if quoted {
                text.push_str("%22").map_err(|_| CommandError::TooLong)?;
            }
        }

        text.push('"').map_err(|_| CommandError::TooLong)?;

        Ok(Self {
            text: Text::Formatted(text),
            ..Self::new("")
        })
    }

    /// Fires a GET request
    pub const fn http_get() -> Self {
        Self::new("+HTTPACTION=0")
    }

    pub const fn http_read() -> Self {
        Self::new("+HTTPREAD")
    }

    /// Single IP connection mode
    pub const fn single_connection() -> Self {
        Self::new("+CIPMUX=0")
    }

    pub const fn transparent_mode() -> Self {
        Self::new("+CIPMODE=1")
    }

    /// Starts the IP task with APN and credentials
    pub fn start_task(apn: &Apn<'_>) -> Result<Self, CommandError> {
        Self::format(format_args!(
            "+CSTT=\"{}\",\"{}\",\"{}\"",
            apn.name, apn.username, apn.password
        ))
    }

    /// Brings up the wireless connection
    pub const fn bring_up_wireless() -> Self {
        Self::new("+CIICR")
    }

    pub const fn local_address() -> Self {
        Self::new("+CIFSR")
    }

    pub fn tcp_connect(host: &str, port: u16) -> Result<Self, CommandError> {
        Self::format(format_args!("+CIPSTART=\"TCP\",\"{}\",\"{}\"", host, port))
    }

    pub const fn ip_shutdown() -> Self {
        Self::new("+CIPSHUT")
    }

    /// Switches back from command mode to transparent data mode
    pub const fn resume_data_mode() -> Self {
        Self {
            text: Text::Static("O0"),
            timeout_ms: Some(DATA_MODE_TIMEOUT_MS),
            success: Some("CONNECT"),
            failure: Some(ERROR),
        }
    }

    pub const fn close_connection() -> Self {
        Self::new("+CIPCLOSE=0")
    }
}
