//! Access to the real time clock of the module
//!
//! The module stores a two digit year, the century is fixed to 2000. Times are treated as UTC,
//! the time zone field of the module is ignored when reading and written as `+00`.
use crate::client::CommandError;
use crate::commands::Command;
use crate::modem::{Modem, ModemError};
use crate::responses::ClockResponse;
use crate::transport::{Transport, Watchdog};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use embedded_hal::digital::OutputPin;
use fugit_timer::Timer;

/// First year representable by the module clock
const CENTURY: i32 = 2000;

/// Two digit year the module reports after power on, before the clock was ever set
const UNSET_YEAR: u8 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// Modem needs to be initialized first
    NotInitialized,

    /// Querying or setting the clock failed
    CommandFailed(CommandError),

    /// Reply did not have the expected format or contained an invalid date
    ProtocolMismatch,

    /// Clock was never set since power on
    NeverSet,

    /// Year is outside of 2000 - 2099
    OutOfRange,
}

impl From<ModemError> for ClockError {
    fn from(error: ModemError) -> Self {
        match error {
            ModemError::NotInitialized => Self::NotInitialized,
            ModemError::CommandFailed(error) => Self::CommandFailed(error),
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
    /// Reads the module clock
    pub fn read_clock(&mut self) -> Result<NaiveDateTime, ClockError> {
        self.assert_initialized()?;

        let response = self
            .client
            .execute(&Command::clock_query())
            .map_err(ClockError::CommandFailed)?;
        let reply = response.as_str().ok_or(ClockError::ProtocolMismatch)?;
        let clock = ClockResponse::parse(reply).map_err(|_| ClockError::ProtocolMismatch)?;

        if clock.year == UNSET_YEAR {
            return Err(ClockError::NeverSet);
        }

        NaiveDate::from_ymd_opt(CENTURY + clock.year as i32, clock.month as u32, clock.day as u32)
            .and_then(|date| date.and_hms_opt(clock.hour as u32, clock.minute as u32, clock.second as u32))
            .ok_or(ClockError::ProtocolMismatch)
    }

    /// Sets the module clock. Sub second precision is dropped.
    ///
    /// The Unix epoch is treated as "no time available" and ignored.
    pub fn write_clock(&mut self, time: &NaiveDateTime) -> Result<(), ClockError> {
        if time.and_utc().timestamp() == 0 {
            debug!("Ignoring clock update to zero time");
            return Ok(());
        }

        self.assert_initialized()?;

        let year = time.year() - CENTURY;
        if !(0..100).contains(&year) {
            return Err(ClockError::OutOfRange);
        }

        let command = Command::clock_set(year as u8, time).map_err(ClockError::CommandFailed)?;
        self.client.execute(&command).map_err(ClockError::CommandFailed)?;
        Ok(())
    }
}
