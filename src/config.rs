//! Driver configuration
use crate::timing::{
    ACTIVATION_TIMEOUT_MS, AUTOBAUD_RATE, COMMAND_TIMEOUT_MS, TCP_CONNECT_TIMEOUT_MS,
};
use core::convert::Infallible;
use embedded_hal::digital::{ErrorType, OutputPin};

/// Placeholder for boards without a power key or reset line
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Access point credentials, used by both the bearer and the raw TCP session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Apn<'a> {
    /// Access point name
    pub name: &'a str,

    /// User name, empty if not required by the provider
    pub username: &'a str,

    /// Password, empty if not required by the provider
    pub password: &'a str,
}

impl<'a> Apn<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            username: "",
            password: "",
        }
    }

    pub fn with_credentials(name: &'a str, username: &'a str, password: &'a str) -> Self {
        Self {
            name,
            username,
            password,
        }
    }
}

/// Adjustable timeouts and init parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Deadline of plain command exchanges in ms
    pub command_timeout_ms: u32,

    /// Deadline for `AT+SAPBR=1,1` and `AT+CIICR` in ms
    pub activation_timeout_ms: u32,

    /// Deadline for the `CONNECT` confirmation of a TCP connection in ms
    pub connect_timeout_ms: u32,

    /// Deadline for every step of the HTTP exchange which waits on the network in ms
    pub http_timeout_ms: u32,

    /// Link speed used while probing for autobaud
    pub autobaud_rate: u32,

    /// Number of autobaud probes before the fixed baud rate sweep starts
    pub autobaud_attempts: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_timeout_ms: COMMAND_TIMEOUT_MS,
            activation_timeout_ms: ACTIVATION_TIMEOUT_MS,
            connect_timeout_ms: TCP_CONNECT_TIMEOUT_MS,
            http_timeout_ms: COMMAND_TIMEOUT_MS,
            autobaud_rate: AUTOBAUD_RATE,
            autobaud_attempts: 3,
        }
    }
}

impl Config {
    pub fn command_timeout_ms(mut self, timeout: u32) -> Self {
        self.command_timeout_ms = timeout;
        self
    }

    pub fn activation_timeout_ms(mut self, timeout: u32) -> Self {
        self.activation_timeout_ms = timeout;
        self
    }

    pub fn connect_timeout_ms(mut self, timeout: u32) -> Self {
        self.connect_timeout_ms = timeout;
        self
    }

    pub fn http_timeout_ms(mut self, timeout: u32) -> Self {
        self.http_timeout_ms = timeout;
        self
    }

    pub fn autobaud(mut self, rate: u32, attempts: u8) -> Self {
        self.autobaud_rate = rate;
        self.autobaud_attempts = attempts;
        self
    }
}
