//! Mocks for doc examples
use crate::transport::Transport;
use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;
use heapless::{Deque, Vec};

/// Serial link mock answering the commands used in the doc examples
#[derive(Default)]
pub struct ExampleTransport {
    /// Bytes pending for the driver
    rx: Deque<u8, 256>,

    /// Command line currently written
    line: Vec<u8, 192>,
}

impl ExampleTransport {
    fn process_line(&mut self) {
        let line = self.line.strip_suffix(b"\r\n").unwrap_or(&self.line[..]);

        let reply: &'static [u8] = match line {
            b"AT+GSN" => b"\r\n869170031234567\r\n\r\nOK\r\n",
            b"AT+SAPBR=2,1" => b"\r\n+SAPBR: 1,1,\"10.0.0.5\"\r\n\r\nOK\r\n",
            b"AT+HTTPACTION=0" => b"\r\nOK\r\n\r\n+HTTPACTION: 0,200,16\r\n",
            b"AT+HTTPREAD" => b"\r\n+HTTPREAD: 16\r\nnice to see you!\r\nOK\r\n",
            b"AT+CIFSR" => b"\r\n10.0.0.7\r\n",
            b"AT+CIPCLOSE=0" => b"\r\nCLOSE OK\r\n",
            line if line.starts_with(b"AT+CIPSTART") => b"\r\nOK\r\n\r\nCONNECT\r\n",
            _ => b"\r\nOK\r\n",
        };

        self.push_rx(reply);
        self.line.clear();
    }

    fn push_rx(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.rx.push_back(*byte).ok();
        }
    }
}

impl ErrorType for ExampleTransport {
    type Error = ErrorKind;
}

impl Read for ExampleTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0;
        while count < buf.len() {
            match self.rx.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }

        Ok(count)
    }
}

impl ReadReady for ExampleTransport {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.is_empty())
    }
}

impl Write for ExampleTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        // Payload in transparent mode, the remote echoes a greeting
        if self.line.is_empty() && !buf.starts_with(b"AT") {
            if buf == b"hallo!" {
                self.push_rx(b"nice to see you!");
            }
            return Ok(buf.len());
        }

        self.line.extend_from_slice(buf).map_err(|_| ErrorKind::OutOfMemory)?;
        if self.line.ends_with(b"\r\n") {
            self.process_line();
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Transport for ExampleTransport {
    fn set_baud_rate(&mut self, _baud_rate: u32) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Timer mock, time advances by one ms on every call and delays expire immediately
#[derive(Default)]
pub struct ExampleTimer {
    tick: u32,
}

impl Timer<1_000> for ExampleTimer {
    type Error = u32;

    fn now(&mut self) -> TimerInstantU32<1_000> {
        self.tick += 1;
        TimerInstantU32::from_ticks(self.tick)
    }

    fn start(&mut self, _duration: TimerDurationU32<1_000>) -> Result<(), Self::Error> {
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}
