//! # HTTP client
//!
//! GET requests using the HTTP client integrated in the module. Requires an open GPRS bearer,
//! s. [Modem::start_network].
//!
//! ## Example
//!
//! ````
//! # use sim800_at_nal::config::{Apn, Config, NoPin};
//! # use sim800_at_nal::example::{ExampleTimer, ExampleTransport};
//! # use sim800_at_nal::modem::Modem;
//! # use sim800_at_nal::transport::NoWatchdog;
//! #
//! # let mut modem: Modem<_, _, _, _, _, 1_000, 256> = Modem::new(
//! #     ExampleTransport::default(),
//! #     ExampleTimer::default(),
//! #     NoPin,
//! #     NoPin,
//! #     NoWatchdog,
//! #     Config::default(),
//! # );
//! # modem.init().unwrap();
//! #
//! modem.start_network(&Apn::new("internet")).unwrap();
//!
//! let mut body = [0x0; 512];
//! let length = modem.http_get("http://example.org", "/status", &mut body).unwrap();
//! assert_eq!(16, length);
//! ````
use crate::client::{CommandError, MatchStatus};
use crate::commands::{Command, ERROR, OK};
use crate::modem::{Modem, ModemError};
use crate::responses::{parse_http_read_length, HttpActionResponse};
use crate::state::SessionKind;
use crate::transport::{Transport, Watchdog};
use embedded_hal::digital::OutputPin;
use fugit_timer::Timer;

/// Status code of a successful request
const HTTP_OK: u16 = 200;

/// Errors of a HTTP request
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HttpError {
    /// Modem needs to be initialized first
    NotInitialized,

    /// GPRS bearer is not open
    NotRegistered,

    /// `AT+HTTPINIT` failed, also after terminating the context and retrying
    InitFailed(CommandError),

    /// Setting the bearer profile or the URL failed
    ParameterFailed(CommandError),

    /// `AT+HTTPACTION` failed or the status line did not arrive
    ActionFailed(CommandError),

    /// Server replied with a status other than 200
    Status(u16),

    /// Declared body length does not fit in the destination buffer. No body bytes were read.
    CapacityExceeded(usize),

    /// Reading the body failed
    ReadFailed(CommandError),

    /// `AT+HTTPTERM` failed, the context is still considered open
    TerminateFailed(CommandError),

    /// Reply did not have the expected format
    ProtocolMismatch,
}

impl From<ModemError> for HttpError {
    fn from(error: ModemError) -> Self {
        match error {
            ModemError::NotInitialized => Self::NotInitialized,
            ModemError::CommandFailed(error) => Self::ActionFailed(error),
            ModemError::ProtocolMismatch => Self::ProtocolMismatch,
        }
    }
}

impl<T, TM, PWR, RST, W, const TIMER_HZ: u32, const BUF_SIZE: usize> Modem<T, TM, PWR, RST, W, TIMER_HZ, BUF_SIZE>
where
    T: Transport,
    TM: Timer<TIMER_HZ>,
    PWR: OutputPin,
    RST: OutputPin,
    W: Watchdog,
{
    /// Fires a GET request for `server` + `path` and writes the body to `destination`
    ///
    /// `server` may include scheme and port, e.g. `http://example.org:8080`. Double quotes in
    /// `path` are escaped. Returns the body length. A body of length L requires a destination of
    /// at least L + 1 bytes.
    ///
    /// A failed request may leave the HTTP context open, it gets terminated by the next call.
    pub fn http_get(&mut self, server: &str, path: &str, destination: &mut [u8]) -> Result<usize, HttpError> {
        self.assert_initialized()?;
        if self.state.session() != SessionKind::BearerHttp {
            return Err(HttpError::NotRegistered);
        }

        if self.state.is_http_open() {
            debug!("Terminating open HTTP context");
            if let Err(error) = self.http_terminate() {
                warn!("Terminating HTTP context failed: {:?}", error);
            }
        }

        self.http_init()?;

        self.client
            .execute(&Command::http_bearer_profile())
            .map_err(HttpError::ParameterFailed)?;
        let url = Command::http_url(server, path).map_err(HttpError::ParameterFailed)?;
        self.client.execute(&url).map_err(HttpError::ParameterFailed)?;

        let action = self.http_action()?;
        debug!("HTTP status {}, {} bytes", action.status, action.length);

        if action.status != HTTP_OK {
            return Err(HttpError::Status(action.status));
        }

        // One byte of the destination stays reserved
        if action.length >= destination.len() {
            return Err(HttpError::CapacityExceeded(action.length));
        }

        let length = self.http_read(action.length, destination)?;
        self.http_terminate()?;
        Ok(length)
    }

    /// Opens the context, terminates a stale one and retries once on failure
    fn http_init(&mut self) -> Result<(), HttpError> {
        if let Err(error) = self.client.execute(&Command::http_init()) {
            warn!("HTTPINIT failed: {:?}, retrying", error);
            if let Err(error) = self.http_terminate() {
                debug!("Terminating HTTP context failed: {:?}", error);
            }

            self.client
                .execute(&Command::http_init())
                .map_err(HttpError::InitFailed)?;
        }

        self.state.set_context_open();
        Ok(())
    }

    /// Fires the GET action and waits for the status line
    fn http_action(&mut self) -> Result<HttpActionResponse, HttpError> {
        let timeout = self.config.http_timeout_ms;

        self.client
            .execute(&Command::http_get())
            .map_err(HttpError::ActionFailed)?;
        let line = self.client.next_line(timeout).map_err(HttpError::ActionFailed)?;

        let line = line.as_str().ok_or(HttpError::ProtocolMismatch)?;
        HttpActionResponse::parse(line).map_err(|_| HttpError::ProtocolMismatch)
    }

    /// Reads the body announced by `+HTTPREAD: <length>` and consumes the trailing OK
    fn http_read(&mut self, declared: usize, destination: &mut [u8]) -> Result<usize, HttpError> {
        let timeout = self.config.http_timeout_ms;

        self.client
            .send(&Command::http_read())
            .map_err(HttpError::ReadFailed)?;

        let line = self.client.next_line(timeout).map_err(HttpError::ReadFailed)?;
        if line.contains(ERROR) {
            return Err(HttpError::ReadFailed(CommandError::Rejected));
        }

        let line = line.as_str().ok_or(HttpError::ProtocolMismatch)?;
        let length = parse_http_read_length(line).map_err(|_| HttpError::ProtocolMismatch)?;
        if length > declared {
            return Err(HttpError::ProtocolMismatch);
        }

        self.client
            .receive_exact(timeout, &mut destination[..length])
            .map_err(HttpError::ReadFailed)?;

        let trailer = self
            .client
            .receive(timeout, Some(OK), Some(ERROR))
            .map_err(HttpError::ReadFailed)?;

        match trailer.status {
            MatchStatus::Success => Ok(length),
            MatchStatus::Failure => Err(HttpError::ReadFailed(CommandError::Rejected)),
            MatchStatus::Full => Err(HttpError::ReadFailed(CommandError::BufferFull)),
            MatchStatus::Unmatched => Err(HttpError::ReadFailed(CommandError::Timeout)),
        }
    }

    /// The context flag is only cleared if the module confirms
    fn http_terminate(&mut self) -> Result<(), HttpError> {
        self.client
            .execute(&Command::http_term())
            .map_err(HttpError::TerminateFailed)?;

        self.state.clear_context_open();
        Ok(())
    }
}
