use core::net::Ipv4Addr;
use core::str::FromStr;
use heapless::{String, Vec};

/// Raw reply of a command exchange, framing terminators stripped
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Response<const N: usize> {
    bytes: Vec<u8, N>,
}

impl<const N: usize> Response<N> {
    pub(crate) fn new(bytes: Vec<u8, N>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the reply as string. None if the modem sent non UTF-8 bytes
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.bytes).ok()
    }

    pub fn contains(&self, needle: &str) -> bool {
        contains(&self.bytes, needle.as_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Removes exactly one leading and one trailing CRLF, if present
    pub(crate) fn strip_framing(&mut self) {
        if self.bytes.starts_with(b"\r\n") {
            let length = self.bytes.len();
            self.bytes.copy_within(2.., 0);
            self.bytes.truncate(length - 2);
        }

        if self.bytes.ends_with(b"\r\n") {
            self.bytes.truncate(self.bytes.len() - 2);
        }
    }
}

/// Byte substring search
pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }

    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Error returned by the reply tokenizers, the reply did not have the expected shape
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParseError;

/// Strict tokenizer over a reply line. Every call consumes exactly the expected token.
struct Tokenizer<'a> {
    rest: &'a str,
}

impl<'a> Tokenizer<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    /// Consumes the given literal
    fn literal(&mut self, literal: &str) -> Result<(), ParseError> {
        self.rest = self.rest.strip_prefix(literal).ok_or(ParseError)?;
        Ok(())
    }

    /// Consumes leading spaces
    fn spaces(&mut self) {
        self.rest = self.rest.trim_start_matches(' ');
    }

    /// Consumes an unsigned decimal integer
    fn integer<T: FromStr>(&mut self) -> Result<T, ParseError> {
        self.spaces();
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());

        if end == 0 {
            return Err(ParseError);
        }

        let value = self.rest[..end].parse().map_err(|_| ParseError)?;
        self.rest = &self.rest[end..];
        Ok(value)
    }

    /// Consumes exactly two decimal digits
    fn two_digits(&mut self) -> Result<u8, ParseError> {
        let digits = self.rest.get(..2).ok_or(ParseError)?;
        if !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(ParseError);
        }

        self.rest = &self.rest[2..];
        digits.parse().map_err(|_| ParseError)
    }

    /// Consumes everything up to the given delimiter (exclusive)
    fn until(&mut self, delimiter: char) -> Result<&'a str, ParseError> {
        let end = self.rest.find(delimiter).ok_or(ParseError)?;
        let token = &self.rest[..end];
        self.rest = &self.rest[end..];
        Ok(token)
    }

    /// Returns the first line of the remaining input
    fn line(&self) -> &'a str {
        self.rest.split("\r\n").next().unwrap_or("")
    }
}

/// Status line of `AT+HTTPACTION`: `+HTTPACTION: <method>,<status>,<length>`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HttpActionResponse {
    /// 0 = GET, 1 = POST, 2 = HEAD
    pub method: u8,

    /// HTTP status code, or a 6xx network error code of the modem
    pub status: u16,

    /// Body length in bytes
    pub length: usize,
}

impl HttpActionResponse {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut tokens = Tokenizer::new(line);
        tokens.literal("+HTTPACTION:")?;
        let method = tokens.integer()?;
        tokens.literal(",")?;
        let status = tokens.integer()?;
        tokens.literal(",")?;
        let length = tokens.integer()?;

        Ok(Self {
            method,
            status,
            length,
        })
    }
}

/// Declared length of `AT+HTTPREAD`: `+HTTPREAD: <length>`
pub(crate) fn parse_http_read_length(line: &str) -> Result<usize, ParseError> {
    let mut tokens = Tokenizer::new(line);
    tokens.literal("+HTTPREAD:")?;
    tokens.integer()
}

/// Reply of `AT+SAPBR=2,1`: `+SAPBR: <cid>,<status>,"<ip>"`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BearerStatus {
    /// Bearer profile id
    pub cid: u8,

    /// 0 = connecting, 1 = connected, 2 = closing, 3 = closed
    pub status: u8,

    /// Address assigned to the bearer
    pub address: Ipv4Addr,
}

impl BearerStatus {
    pub const CONNECTED: u8 = 1;

    pub fn parse(reply: &str) -> Result<Self, ParseError> {
        let mut tokens = Tokenizer::new(reply);
        tokens.literal("+SAPBR:")?;
        let cid = tokens.integer()?;
        tokens.literal(",")?;
        let status = tokens.integer()?;
        tokens.literal(",\"")?;
        let address = tokens.until('"')?;
        tokens.literal("\"")?;

        Ok(Self {
            cid,
            status,
            address: Ipv4Addr::from_str(address).map_err(|_| ParseError)?,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.status == Self::CONNECTED
    }
}

/// Address line of `AT+CIFSR`
pub(crate) fn parse_local_address(line: &str) -> Result<Ipv4Addr, ParseError> {
    Ipv4Addr::from_str(line.trim()).map_err(|_| ParseError)
}

/// First token of the `AT+GSN` reply, digits only
pub(crate) fn parse_imei(reply: &str) -> Result<String<16>, ParseError> {
    let token = Tokenizer::new(reply.trim_start()).line().trim();
    if token.is_empty() || !token.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ParseError);
    }

    String::try_from(token).map_err(|_| ParseError)
}

/// Reply of `AT+CCLK?`: `+CCLK: "yy/MM/dd,hh:mm:ss±zz"`, fields as sent by the modem
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockResponse {
    /// Two digit year
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,

    /// Time zone offset in quarters of an hour
    pub zone: i8,
}

impl ClockResponse {
    pub fn parse(reply: &str) -> Result<Self, ParseError> {
        let mut tokens = Tokenizer::new(reply);
        tokens.literal("+CCLK:")?;
        tokens.spaces();
        tokens.literal("\"")?;
        let year = tokens.two_digits()?;
        tokens.literal("/")?;
        let month = tokens.two_digits()?;
        tokens.literal("/")?;
        let day = tokens.two_digits()?;
        tokens.literal(",")?;
        let hour = tokens.two_digits()?;
        tokens.literal(":")?;
        let minute = tokens.two_digits()?;
        tokens.literal(":")?;
        let second = tokens.two_digits()?;

        let sign = if tokens.literal("+").is_ok() {
            1
        } else {
            tokens.literal("-")?;
            -1
        };
        let zone = tokens.two_digits()? as i8 * sign;
        tokens.literal("\"")?;

        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            zone,
        })
    }
}
