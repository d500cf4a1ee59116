//! # AT command engine
//!
//! Sends single command lines over the [Transport] and collects the reply byte by byte until a
//! success marker, a failure marker, a full buffer or the deadline is reached. The link has no
//! framing and no request ids, so replies are matched purely by substring.
//!
//! Every exchange drains stale bytes before sending. Otherwise the tail of a previous reply
//! could match the markers of the next command.
use crate::commands::Command;
use crate::responses::Response;
use crate::timing::COMMAND_GUARD_TIME_MS;
use crate::transport::{Transport, Watchdog};
use embedded_io::{Error as _, Read as _, ReadReady as _, Write as _};
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;
use heapless::Vec;

/// Line terminator of the AT protocol
pub const CRLF: &str = "\r\n";

/// Errors of a single command exchange
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Deadline reached without any marker match
    Timeout,

    /// Failure marker matched, e.g. `ERROR`
    Rejected,

    /// Receive buffer filled up without any marker match
    BufferFull,

    /// Command text does not fit in the command buffer
    TooLong,

    /// Serial link error
    Transport(embedded_io::ErrorKind),

    /// Upstream timer error
    TimerError,
}

/// Result of matching the reply against the markers
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatchStatus {
    /// Success marker found
    Success,

    /// Failure marker found
    Failure,

    /// Buffer reached its capacity before any marker matched
    Full,

    /// Deadline reached. The only possible outcome if no marker is configured
    Unmatched,
}

/// Raw outcome of a receive loop
#[derive(Clone, Debug)]
pub struct Exchange<const N: usize> {
    pub status: MatchStatus,

    /// Bytes received, including all line terminators
    pub reply: Vec<u8, N>,
}

/// Command engine owning the serial link, the deadline timer and the watchdog hook
///
/// BUF_SIZE: Capacity of the receive buffer. At most BUF_SIZE - 1 bytes are accepted per
/// exchange, the last slot is reserved.
pub struct AtClient<T: Transport, TM: Timer<TIMER_HZ>, W: Watchdog, const TIMER_HZ: u32, const BUF_SIZE: usize> {
    /// Serial link
    pub(crate) transport: T,

    /// Timer used for deadlines and settle delays
    pub(crate) timer: TM,

    /// Fed on every poll iteration
    watchdog: W,

    /// Default deadline of commands without an explicit timeout
    pub(crate) default_timeout_ms: u32,
}

impl<T: Transport, TM: Timer<TIMER_HZ>, W: Watchdog, const TIMER_HZ: u32, const BUF_SIZE: usize>
    AtClient<T, TM, W, TIMER_HZ, BUF_SIZE>
{
    pub fn new(transport: T, timer: TM, watchdog: W, default_timeout_ms: u32) -> Self {
        Self {
            transport,
            timer,
            watchdog,
            default_timeout_ms,
        }
    }

    /// Sends the command and waits for one of its markers
    ///
    /// Returns the reply with one leading and one trailing CRLF stripped if the success marker
    /// matched.
    pub fn execute(&mut self, command: &Command) -> Result<Response<BUF_SIZE>, CommandError> {
        self.send(command)?;

        let timeout = command.timeout_ms.unwrap_or(self.default_timeout_ms);
        let exchange = self.receive(timeout, command.success, command.failure)?;
        trace!("RX: {}", printable(&exchange.reply));

        match exchange.status {
            MatchStatus::Success => {
                let mut response = Response::new(exchange.reply);
                response.strip_framing();
                Ok(response)
            }
            MatchStatus::Failure => Err(CommandError::Rejected),
            MatchStatus::Full => Err(CommandError::BufferFull),
            MatchStatus::Unmatched => Err(CommandError::Timeout),
        }
    }

    /// Waits the guard time, drains pending input and writes the command line
    pub fn send(&mut self, command: &Command) -> Result<(), CommandError> {
        self.delay_ms(COMMAND_GUARD_TIME_MS)?;
        self.drain()?;

        trace!("TX: AT{}", command.text());
        self.write(b"AT")?;
        self.write(command.text().as_bytes())?;
        self.write(CRLF.as_bytes())
    }

    /// Receives bytes until a marker matches, the buffer is full or the timeout expires
    pub fn receive(
        &mut self,
        timeout_ms: u32,
        success: Option<&str>,
        failure: Option<&str>,
    ) -> Result<Exchange<BUF_SIZE>, CommandError> {
        let deadline = self.deadline(timeout_ms);
        self.receive_until(deadline, success, failure)
    }

    fn receive_until(
        &mut self,
        deadline: TimerInstantU32<TIMER_HZ>,
        success: Option<&str>,
        failure: Option<&str>,
    ) -> Result<Exchange<BUF_SIZE>, CommandError> {
        let mut reply: Vec<u8, BUF_SIZE> = Vec::new();

        while self.timer.now() < deadline {
            self.watchdog.feed();

            if reply.len() >= BUF_SIZE.saturating_sub(1) {
                return Ok(Exchange {
                    status: MatchStatus::Full,
                    reply,
                });
            }

            let Some(byte) = self.read_byte()? else {
                continue;
            };
            // Capacity was checked above
            let _ = reply.push(byte);

            // Checked after every byte, so a new match can only end at the last byte
            if success.is_some_and(|marker| reply.ends_with(marker.as_bytes())) {
                return Ok(Exchange {
                    status: MatchStatus::Success,
                    reply,
                });
            }

            if failure.is_some_and(|marker| reply.ends_with(marker.as_bytes())) {
                return Ok(Exchange {
                    status: MatchStatus::Failure,
                    reply,
                });
            }
        }

        Ok(Exchange {
            status: MatchStatus::Unmatched,
            reply,
        })
    }

    /// Reads exactly `buffer.len()` bytes, without any marker matching
    pub fn receive_exact(&mut self, timeout_ms: u32, buffer: &mut [u8]) -> Result<(), CommandError> {
        let deadline = self.deadline(timeout_ms);
        let mut position = 0;

        while position < buffer.len() {
            if self.timer.now() >= deadline {
                debug!("Received {} of {} bytes", position, buffer.len());
                return Err(CommandError::Timeout);
            }

            self.watchdog.feed();
            if let Some(byte) = self.read_byte()? {
                buffer[position] = byte;
                position += 1;
            }
        }

        Ok(())
    }

    /// Reads a single line, returned without the terminator
    pub fn read_line(&mut self, timeout_ms: u32) -> Result<Response<BUF_SIZE>, CommandError> {
        let deadline = self.deadline(timeout_ms);
        self.read_line_until(deadline)
    }

    /// Reads lines until a reply line arrives. Blank framing lines and command echoes are skipped.
    pub fn next_line(&mut self, timeout_ms: u32) -> Result<Response<BUF_SIZE>, CommandError> {
        let deadline = self.deadline(timeout_ms);

        loop {
            let line = self.read_line_until(deadline)?;
            if !line.is_empty() && !line.as_bytes().starts_with(b"AT") {
                return Ok(line);
            }
        }
    }

    fn read_line_until(&mut self, deadline: TimerInstantU32<TIMER_HZ>) -> Result<Response<BUF_SIZE>, CommandError> {
        let exchange = self.receive_until(deadline, Some(CRLF), None)?;
        trace!("RX line: {}", printable(&exchange.reply));

        match exchange.status {
            MatchStatus::Success => {
                let mut reply = exchange.reply;
                reply.truncate(reply.len() - CRLF.len());
                Ok(Response::new(reply))
            }
            MatchStatus::Full => Err(CommandError::BufferFull),
            MatchStatus::Failure | MatchStatus::Unmatched => Err(CommandError::Timeout),
        }
    }

    /// Discards all bytes which are already pending
    pub fn drain(&mut self) -> Result<(), CommandError> {
        let mut skipped = 0usize;
        while self.read_byte()?.is_some() {
            skipped += 1;
        }

        if skipped > 0 {
            trace!("Skipped {} stale bytes", skipped);
        }

        Ok(())
    }

    /// Busy waits for the given duration while feeding the watchdog
    pub fn delay_ms(&mut self, duration_ms: u32) -> Result<(), CommandError> {
        self.timer
            .start(TimerDurationU32::millis(duration_ms))
            .map_err(|_| CommandError::TimerError)?;

        loop {
            self.watchdog.feed();

            match self.timer.wait() {
                Ok(_) => return Ok(()),
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(_)) => return Err(CommandError::TimerError),
            }
        }
    }

    /// Writes raw bytes, e.g. the escape sequence or payload in transparent mode
    pub fn write(&mut self, data: &[u8]) -> Result<(), CommandError> {
        self.transport
            .write_all(data)
            .map_err(|error| CommandError::Transport(error.kind()))
    }

    /// Returns true if at least one byte is pending
    pub fn byte_available(&mut self) -> Result<bool, CommandError> {
        self.transport
            .read_ready()
            .map_err(|error| CommandError::Transport(error.kind()))
    }

    /// Reads a single byte if one is pending
    pub fn read_byte(&mut self) -> Result<Option<u8>, CommandError> {
        if !self.byte_available()? {
            return Ok(None);
        }

        let mut byte = [0x0; 1];
        let count = self
            .transport
            .read(&mut byte)
            .map_err(|error| CommandError::Transport(error.kind()))?;

        Ok((count == 1).then_some(byte[0]))
    }

    /// Changes the link speed of the host side
    pub fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), CommandError> {
        self.transport
            .set_baud_rate(baud_rate)
            .map_err(|error| CommandError::Transport(error.kind()))
    }

    /// Deadline computed once from the monotonic timer
    fn deadline(&mut self, timeout_ms: u32) -> TimerInstantU32<TIMER_HZ> {
        self.timer.now() + TimerDurationU32::millis(timeout_ms)
    }
}

/// Reply as text for logging
fn printable(bytes: &[u8]) -> &str {
    core::str::from_utf8(bytes).unwrap_or("<binary>")
}
