//! # SIM800 network layer client
//!
//! Driver for SIM800 GSM/GPRS modules connected by a serial link. Covers power sequencing,
//! link speed detection, the GPRS bearer with the integrated HTTP client and raw TCP connections
//! in transparent mode, exposed as [embedded_nal::TcpClientStack].
//!
//! The driver is fully blocking. Every wait is bounded by a deadline of the given
//! [fugit_timer::Timer], the [transport::Watchdog] hook is fed while waiting.
//!
//! ## Example
//!
//! ````
//! use sim800_at_nal::config::{Apn, Config, NoPin};
//! use sim800_at_nal::modem::Modem;
//! use sim800_at_nal::transport::NoWatchdog;
//! # use sim800_at_nal::example::{ExampleTimer, ExampleTransport};
//! #
//! # let serial = ExampleTransport::default();
//! # let timer = ExampleTimer::default();
//! # let power_key = NoPin;
//!
//! let mut modem: Modem<_, _, _, _, _, 1_000, 256> =
//!     Modem::new(serial, timer, power_key, NoPin, NoWatchdog, Config::default());
//!
//! assert_eq!(115_200, modem.init().unwrap());
//! modem.start_network(&Apn::new("internet")).unwrap();
//!
//! let mut body = [0x0; 256];
//! let length = modem.http_get("http://example.org", "/", &mut body).unwrap();
//! assert_eq!(b"nice to see you!", &body[..length]);
//! ````
#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

// Needs to come first, the logging macros are used by all other modules
mod fmt;

pub mod client;
pub mod clock;
pub mod commands;
pub mod config;
#[cfg(feature = "examples")]
pub mod example;
pub mod http;
pub mod modem;
pub mod network;
pub mod responses;
pub mod stack;
pub mod state;
pub mod timing;
pub mod transport;

#[cfg(test)]
mod tests;
