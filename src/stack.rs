//! # Transparent TCP stream
//!
//! Once the IP context is up (s. [Modem::tcp_start]), a single TCP connection can be opened. The
//! module then relays all bytes of the serial link transparently, until the `+++` escape sequence
//! switches back to command mode.
//!
//! The connection is either used through [TransparentStream] or through the [TcpClientStack]
//! implementation of [Modem].
//!
//! ## Example
//!
//! ````
//! # use core::net::SocketAddr;
//! # use core::str::FromStr;
//! # use embedded_nal::TcpClientStack;
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
//! let address = modem.tcp_start(&Apn::new("internet")).unwrap();
//! assert_eq!("10.0.0.7", address.to_string());
//!
//! let mut socket = modem.socket().unwrap();
//! modem.connect(&mut socket, SocketAddr::from_str("10.0.0.1:21").unwrap()).unwrap();
//! modem.send(&mut socket, b"hallo!").unwrap();
//!
//! let mut buffer = [0x0; 64];
//! let length = nb::block!(modem.receive(&mut socket, &mut buffer)).unwrap();
//! assert_eq!(b"nice to see you!", &buffer[..length]);
//!
//! modem.close(socket).unwrap();
//! ````
use crate::client::CommandError;
use crate::commands::Command;
use crate::modem::Modem;
use crate::state::SessionKind;
use crate::timing::ESCAPE_GUARD_TIME_MS;
use crate::transport::{Transport, Watchdog};
use core::fmt::Write as _;
use core::net::SocketAddr;
use embedded_hal::digital::OutputPin;
use embedded_nal::{TcpClientStack, TcpError, TcpErrorKind};
use fugit_timer::Timer;
use heapless::String;

/// Escape sequence switching from transparent to command mode
const ESCAPE_SEQUENCE: &[u8] = b"+++";

/// The single TCP socket of the module
#[derive(Debug)]
pub struct Socket {
    _private: (),
}

/// Stream related errors
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamError {
    /// IP context is not up, s. [Modem::tcp_start]
    NotRegistered,

    /// Only one socket is supported, the existing one needs to be closed first
    NoSocketAvailable,

    /// A connection is already active. It needs to be stopped first.
    AlreadyConnected,

    /// Unable to send or receive data if no connection is active
    SocketUnconnected,

    /// SIM800 only supports IPv4
    UnsupportedAddress,

    /// `AT+CIPSTART` failed or the connection was not confirmed by `CONNECT`
    ConnectFailed(CommandError),

    /// Module did not confirm command mode after the escape sequence
    EscapeFailed(CommandError),

    /// Switching back to transparent mode failed
    ResumeFailed(CommandError),

    /// Reading or writing on the serial link failed
    LinkFailed(CommandError),
}

impl TcpError for StreamError {
    fn kind(&self) -> TcpErrorKind {
        match self {
            StreamError::SocketUnconnected => TcpErrorKind::PipeClosed,
            _ => TcpErrorKind::Other,
        }
    }
}

/// Byte stream over the transparent TCP connection
pub struct TransparentStream<'a, T, TM, PWR, RST, W, const TIMER_HZ: u32, const BUF_SIZE: usize>
where
    T: Transport,
    TM: Timer<TIMER_HZ>,
    PWR: OutputPin,
    RST: OutputPin,
    W: Watchdog,
{
    modem: &'a mut Modem<T, TM, PWR, RST, W, TIMER_HZ, BUF_SIZE>,
}

impl<T, TM, PWR, RST, W, const TIMER_HZ: u32, const BUF_SIZE: usize> Modem<T, TM, PWR, RST, W, TIMER_HZ, BUF_SIZE>
where
    T: Transport,
    TM: Timer<TIMER_HZ>,
    PWR: OutputPin,
    RST: OutputPin,
    W: Watchdog,
{
    /// Returns the stream of the transparent TCP connection
    pub fn stream(&mut self) -> TransparentStream<'_, T, TM, PWR, RST, W, TIMER_HZ, BUF_SIZE> {
        TransparentStream { modem: self }
    }
}

impl<T, TM, PWR, RST, W, const TIMER_HZ: u32, const BUF_SIZE: usize>
    TransparentStream<'_, T, TM, PWR, RST, W, TIMER_HZ, BUF_SIZE>
where
    T: Transport,
    TM: Timer<TIMER_HZ>,
    PWR: OutputPin,
    RST: OutputPin,
    W: Watchdog,
{
    /// Opens a TCP connection and enters transparent mode
    pub fn connect(&mut self, host: &str, port: u16) -> Result<(), StreamError> {
        if self.modem.state.session() != SessionKind::RawTcp {
            return Err(StreamError::NotRegistered);
        }

        if self.modem.state.is_stream_active() {
            return Err(StreamError::AlreadyConnected);
        }

        info!("Connecting to {}:{}", host, port);
        let command = Command::tcp_connect(host, port).map_err(StreamError::ConnectFailed)?;
        self.modem
            .client
            .execute(&command)
            .map_err(StreamError::ConnectFailed)?;

        let timeout = self.modem.config.connect_timeout_ms;
        let line = self
            .modem
            .client
            .next_line(timeout)
            .map_err(StreamError::ConnectFailed)?;

        if !line.contains("CONNECT") || line.contains("FAIL") {
            debug!("Connection refused: {}", line.as_str().unwrap_or("<binary>"));
            return Err(StreamError::ConnectFailed(CommandError::Rejected));
        }

        self.modem.state.set_context_open();
        Ok(())
    }

    /// True while the transparent connection is considered active. The link is not checked.
    pub fn connected(&self) -> bool {
        self.modem.state.is_stream_active()
    }

    /// True if at least one received byte is pending
    pub fn available(&mut self) -> Result<bool, StreamError> {
        self.assert_active()?;
        self.modem.client.byte_available().map_err(StreamError::LinkFailed)
    }

    pub fn read_byte(&mut self) -> Result<Option<u8>, StreamError> {
        self.assert_active()?;
        self.modem.client.read_byte().map_err(StreamError::LinkFailed)
    }

    /// Reads all pending bytes up to the buffer length. Does not block.
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<usize, StreamError> {
        self.assert_active()?;

        let mut length = 0;
        while length < buffer.len() {
            match self.modem.client.read_byte().map_err(StreamError::LinkFailed)? {
                Some(byte) => {
                    buffer[length] = byte;
                    length += 1;
                }
                None => break,
            }
        }

        Ok(length)
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), StreamError> {
        self.write(&[byte]).map(|_| ())
    }

    /// Writes all bytes, returns the number of bytes written
    pub fn write(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        self.assert_active()?;
        self.modem.client.write(data).map_err(StreamError::LinkFailed)?;
        Ok(data.len())
    }

    /// Bytes are written directly, nothing to flush
    pub fn flush(&mut self) -> Result<(), StreamError> {
        Ok(())
    }

    /// Switches from transparent to command mode and confirms it with a bare AT
    pub fn escape(&mut self) -> Result<(), StreamError> {
        let client = &mut self.modem.client;

        client.delay_ms(ESCAPE_GUARD_TIME_MS).map_err(StreamError::EscapeFailed)?;
        client.write(ESCAPE_SEQUENCE).map_err(StreamError::EscapeFailed)?;
        client.delay_ms(ESCAPE_GUARD_TIME_MS).map_err(StreamError::EscapeFailed)?;

        client.execute(&Command::sync()).map_err(StreamError::EscapeFailed)?;
        Ok(())
    }

    /// Switches back from command mode to the transparent connection
    pub fn resume(&mut self) -> Result<(), StreamError> {
        if self.modem.state.session() != SessionKind::RawTcp {
            return Err(StreamError::NotRegistered);
        }

        self.modem
            .client
            .execute(&Command::resume_data_mode())
            .map_err(StreamError::ResumeFailed)?;

        self.modem.state.set_context_open();
        Ok(())
    }

    /// Closes the connection. Best effort, errors are only logged.
    ///
    /// May be called at any time, also repeatedly.
    pub fn stop(&mut self) {
        self.modem.state.clear_context_open();

        if let Err(error) = self.escape() {
            warn!("Escaping transparent mode failed: {:?}", error);
        }

        if let Err(error) = self.modem.client.execute(&Command::close_connection()) {
            warn!("Closing connection failed: {:?}", error);
        }
    }

    fn assert_active(&self) -> Result<(), StreamError> {
        if !self.connected() {
            return Err(StreamError::SocketUnconnected);
        }

        Ok(())
    }
}

impl<T, TM, PWR, RST, W, const TIMER_HZ: u32, const BUF_SIZE: usize> TcpClientStack
    for Modem<T, TM, PWR, RST, W, TIMER_HZ, BUF_SIZE>
where
    T: Transport,
    TM: Timer<TIMER_HZ>,
    PWR: OutputPin,
    RST: OutputPin,
    W: Watchdog,
{
    type TcpSocket = Socket;
    type Error = StreamError;

    /// Returns the single socket. [StreamError::NoSocketAvailable] if it is already in use.
    fn socket(&mut self) -> Result<Self::TcpSocket, Self::Error> {
        if self.state.session() != SessionKind::RawTcp {
            return Err(StreamError::NotRegistered);
        }

        if self.socket_open {
            return Err(StreamError::NoSocketAvailable);
        }

        self.socket_open = true;
        Ok(Socket { _private: () })
    }

    /// Opens the connection. Only IPv4 remotes are supported.
    fn connect(&mut self, _socket: &mut Socket, remote: SocketAddr) -> nb::Result<(), Self::Error> {
        let SocketAddr::V4(remote) = remote else {
            return Err(nb::Error::Other(StreamError::UnsupportedAddress));
        };

        let mut host: String<15> = String::new();
        write!(host, "{}", remote.ip()).map_err(|_| nb::Error::Other(StreamError::UnsupportedAddress))?;

        self.stream().connect(&host, remote.port())?;
        Ok(())
    }

    fn send(&mut self, _socket: &mut Socket, buffer: &[u8]) -> nb::Result<usize, Self::Error> {
        Ok(self.stream().write(buffer)?)
    }

    /// Returns [nb::Error::WouldBlock] if no data is pending
    fn receive(&mut self, _socket: &mut Socket, buffer: &mut [u8]) -> nb::Result<usize, Self::Error> {
        match self.stream().read(buffer)? {
            0 if !buffer.is_empty() => Err(nb::Error::WouldBlock),
            length => Ok(length),
        }
    }

    /// Stops an active connection and releases the socket
    fn close(&mut self, _socket: Socket) -> Result<(), Self::Error> {
        if self.state.is_stream_active() {
            self.stream().stop();
        }

        self.socket_open = false;
        Ok(())
    }
}
