//! # Network sessions
//!
//! The module offers two mutually exclusive ways to reach the network:
//!
//! * GPRS bearer (`AT+SAPBR`), used by the integrated HTTP client, s. [Modem::start_network]
//! * IP context (`AT+CSTT`/`AT+CIICR`), used by raw TCP connections, s. [Modem::tcp_start]
//!
//! Only one session kind may be active. Starting one while the other is up returns
//! [NetworkError::SessionConflict], the active one needs to be stopped first.
use crate::client::CommandError;
use crate::commands::Command;
use crate::config::Apn;
use crate::modem::{Modem, ModemError};
use crate::responses::{parse_local_address, BearerStatus};
use crate::state::SessionKind;
use crate::transport::{Transport, Watchdog};
use core::net::Ipv4Addr;
use embedded_hal::digital::OutputPin;
use fugit_timer::Timer;

/// Errors of the network session manager
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkError {
    /// Modem needs to be initialized first
    NotInitialized,

    /// Required session is not active
    NotRegistered,

    /// The other session kind is active and needs to be stopped first
    SessionConflict,

    /// Setting a session parameter failed (`AT+SAPBR=3`, `AT+CIPMUX`, `AT+CIPMODE`, `AT+CSTT`)
    ConfigurationFailed(CommandError),

    /// Opening the bearer or bringing up the IP context failed
    ActivationFailed(CommandError),

    /// Querying the bearer status or the local address failed
    QueryFailed(CommandError),

    /// Bearer was opened, but is not reported as connected
    NotConnected,

    /// Reply did not have the expected format
    ProtocolMismatch,

    /// Closing the bearer or shutting down the IP context failed. The session is kept.
    TeardownFailed(CommandError),
}

impl From<ModemError> for NetworkError {
    fn from(error: ModemError) -> Self {
        match error {
            ModemError::NotInitialized => Self::NotInitialized,
            ModemError::CommandFailed(error) => Self::QueryFailed(error),
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
    /// Opens the GPRS bearer and returns the assigned address
    ///
    /// An already open bearer is always closed and reopened. Teardown failures are ignored.
    pub fn start_network(&mut self, apn: &Apn<'_>) -> Result<Ipv4Addr, NetworkError> {
        self.assert_initialized()?;
        self.assert_session_free(SessionKind::BearerHttp)?;

        if self.state.session() == SessionKind::BearerHttp {
            debug!("Bearer already open, resetting it");
            if let Err(error) = self.stop_network() {
                warn!("Closing bearer failed: {:?}", error);
            }
        }

        info!("Opening GPRS bearer");
        self.state.clear_session();

        for (name, value) in [
            ("Contype", "GPRS"),
            ("APN", apn.name),
            ("USER", apn.username),
            ("PWD", apn.password),
        ] {
            let command = Command::bearer_parameter(name, value).map_err(NetworkError::ConfigurationFailed)?;
            self.client
                .execute(&command)
                .map_err(NetworkError::ConfigurationFailed)?;
        }

        let open = Command::bearer_open().timeout_ms(self.config.activation_timeout_ms);
        self.client.execute(&open).map_err(NetworkError::ActivationFailed)?;

        let status = self.query_bearer()?;
        if !status.is_connected() {
            return Err(NetworkError::NotConnected);
        }

        self.state.set_session(SessionKind::BearerHttp);
        info!("Bearer open");
        Ok(status.address)
    }

    /// Closes the GPRS bearer. The session is only cleared if the module confirms.
    pub fn stop_network(&mut self) -> Result<(), NetworkError> {
        self.assert_initialized()?;
        if self.state.session() == SessionKind::RawTcp {
            return Err(NetworkError::SessionConflict);
        }

        info!("Closing GPRS bearer");
        self.client
            .execute(&Command::bearer_close())
            .map_err(NetworkError::TeardownFailed)?;

        self.state.clear_session();
        Ok(())
    }

    /// Queries the bearer status from the module and updates the session accordingly
    ///
    /// Returns true if the bearer is connected.
    pub fn check_network(&mut self) -> Result<bool, NetworkError> {
        self.assert_initialized()?;
        if self.state.session() == SessionKind::RawTcp {
            return Err(NetworkError::SessionConflict);
        }

        let status = match self.query_bearer() {
            Ok(status) => status,
            Err(error) => {
                self.state.clear_session();
                return Err(error);
            }
        };

        if !status.is_connected() {
            debug!("Bearer reported as not connected (status {})", status.status);
            self.state.clear_session();
            return Ok(false);
        }

        self.state.set_session(SessionKind::BearerHttp);
        Ok(true)
    }

    /// Address currently assigned to the bearer
    pub fn local_ip(&mut self) -> Result<Ipv4Addr, NetworkError> {
        self.assert_initialized()?;
        if self.state.session() != SessionKind::BearerHttp {
            return Err(NetworkError::NotRegistered);
        }

        let status = self.query_bearer()?;
        if !status.is_connected() {
            return Err(NetworkError::NotConnected);
        }

        Ok(status.address)
    }

    fn query_bearer(&mut self) -> Result<BearerStatus, NetworkError> {
        let response = self
            .client
            .execute(&Command::bearer_query())
            .map_err(NetworkError::QueryFailed)?;

        let reply = response.as_str().ok_or(NetworkError::ProtocolMismatch)?;
        BearerStatus::parse(reply).map_err(|_| NetworkError::ProtocolMismatch)
    }

    /// Brings up the IP context for raw TCP connections and returns the assigned address
    ///
    /// The module is switched to single connection and transparent mode. A failing step aborts
    /// without retry.
    pub fn tcp_start(&mut self, apn: &Apn<'_>) -> Result<Ipv4Addr, NetworkError> {
        self.assert_initialized()?;
        self.assert_session_free(SessionKind::RawTcp)?;

        if self.state.session() == SessionKind::RawTcp {
            debug!("IP context already up, resetting it");
            if let Err(error) = self.tcp_stop() {
                warn!("Shutting down IP context failed: {:?}", error);
            }
        }

        info!("Bringing up IP context");
        self.state.clear_session();

        self.client
            .execute(&Command::single_connection())
            .map_err(NetworkError::ConfigurationFailed)?;
        self.client
            .execute(&Command::transparent_mode())
            .map_err(NetworkError::ConfigurationFailed)?;

        let task = Command::start_task(apn).map_err(NetworkError::ConfigurationFailed)?;
        self.client.execute(&task).map_err(NetworkError::ConfigurationFailed)?;

        let bring_up = Command::bring_up_wireless().timeout_ms(self.config.activation_timeout_ms);
        self.client
            .execute(&bring_up)
            .map_err(NetworkError::ActivationFailed)?;

        let address = self.query_tcp_address()?;
        self.state.set_session(SessionKind::RawTcp);
        info!("IP context up");
        Ok(address)
    }

    /// Shuts down the IP context, an active transparent connection is stopped first
    ///
    /// The session is only cleared if the module confirms.
    pub fn tcp_stop(&mut self) -> Result<(), NetworkError> {
        self.assert_initialized()?;
        if self.state.session() == SessionKind::BearerHttp {
            return Err(NetworkError::SessionConflict);
        }

        if self.state.is_stream_active() {
            self.stream().stop();
        }

        info!("Shutting down IP context");
        self.client
            .execute(&Command::ip_shutdown())
            .map_err(NetworkError::TeardownFailed)?;

        self.state.clear_session();
        Ok(())
    }

    /// Address currently assigned to the IP context
    pub fn tcp_local_ip(&mut self) -> Result<Ipv4Addr, NetworkError> {
        self.assert_initialized()?;
        if self.state.session() != SessionKind::RawTcp {
            return Err(NetworkError::NotRegistered);
        }

        self.query_tcp_address()
    }

    /// `AT+CIFSR` replies with the bare address line, without any OK
    fn query_tcp_address(&mut self) -> Result<Ipv4Addr, NetworkError> {
        self.client
            .send(&Command::local_address())
            .map_err(NetworkError::QueryFailed)?;

        let timeout = self.config.command_timeout_ms;
        let line = self.client.next_line(timeout).map_err(NetworkError::QueryFailed)?;
        if line.contains(crate::commands::ERROR) {
            return Err(NetworkError::QueryFailed(CommandError::Rejected));
        }

        let line = line.as_str().ok_or(NetworkError::ProtocolMismatch)?;
        parse_local_address(line).map_err(|_| NetworkError::ProtocolMismatch)
    }

    /// Fails if the session kind other than `kind` is active
    fn assert_session_free(&self, kind: SessionKind) -> Result<(), NetworkError> {
        match self.state.session() {
            SessionKind::None => Ok(()),
            active if active == kind => Ok(()),
            _ => Err(NetworkError::SessionConflict),
        }
    }
}
