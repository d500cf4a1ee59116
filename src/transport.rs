//! Boundary to the serial link and the host watchdog
use embedded_io::{Read, ReadReady, Write};

/// Full-duplex serial link to the modem
///
/// `read_ready()` must not block. The driver reads one byte at a time and only after
/// `read_ready()` returned true, so bytes trickling in across many polls are fine.
pub trait Transport: Read + Write + ReadReady {
    /// Changes the link speed of the host UART
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), Self::Error>;
}

/// Hook called on every poll iteration while the driver waits
pub trait Watchdog {
    fn feed(&mut self);
}

/// Watchdog for platforms without one
#[derive(Copy, Clone, Debug, Default)]
pub struct NoWatchdog;

impl Watchdog for NoWatchdog {
    fn feed(&mut self) {}
}
