//! # SIM800 modem driver
//!
//! Power sequencing and link initialization. The module is expected in autobaud mode. If it does
//! not answer, the link speeds in [BAUD_RATES] are tried one after another and the first
//! answering one gets persisted in the module.
//!
//! ## Example
//!
//! ````
//! # use sim800_at_nal::config::{Config, NoPin};
//! # use sim800_at_nal::example::{ExampleTimer, ExampleTransport};
//! # use sim800_at_nal::modem::{InitPhase, Modem};
//! # use sim800_at_nal::transport::NoWatchdog;
//! #
//! # let serial = ExampleTransport::default();
//! # let timer = ExampleTimer::default();
//! # let power_key = NoPin;
//! #
//! let mut modem: Modem<_, _, _, _, _, 1_000, 256> =
//!     Modem::new(serial, timer, power_key, NoPin, NoWatchdog, Config::default());
//!
//! modem.init().unwrap();
//! modem.setup().unwrap();
//! assert_eq!(InitPhase::Initialized, modem.init_phase());
//!
//! let imei = modem.imei().unwrap();
//! assert_eq!("869170031234567", imei.as_str());
//! ````
use crate::client::{AtClient, CommandError};
use crate::commands::Command;
use crate::config::Config;
use crate::responses::parse_imei;
use crate::state::ModemState;
use crate::timing::{
    AUTOBAUD_RETRY_DELAY_MS, BAUD_RATES, POWER_SETTLE_TIME_MS, POWER_TOGGLE_TIME_MS, RESET_SETTLE_TIME_MS,
    RESET_TIME_MS,
};
use crate::transport::{Transport, Watchdog};
use embedded_hal::digital::OutputPin;
use fugit_timer::Timer;
use heapless::String;

/// Phase of the initialization sequence
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitPhase {
    #[default]
    Off,
    PoweringOn,
    AutobaudProbe,
    FixedBaudSweep,
    Initialized,
    Failed,
}

/// Errors of the initialization sequence
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// Module did not answer at any link speed
    BaudDetection,

    /// Serial link or timer failed, the sequence was aborted
    Link(CommandError),
}

/// Errors of plain modem commands
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemError {
    /// Modem needs to be initialized first, s. [Modem::init]
    NotInitialized,

    /// Command failed
    CommandFailed(CommandError),

    /// Reply did not have the expected format
    ProtocolMismatch,
}

impl From<CommandError> for ModemError {
    fn from(error: CommandError) -> Self {
        Self::CommandFailed(error)
    }
}

/// Central driver for a SIM800 module
///
/// TIMER_HZ: Frequency of the deadline timer
///
/// BUF_SIZE: Capacity in bytes of the reply buffer of a single command exchange
pub struct Modem<T, TM, PWR, RST, W, const TIMER_HZ: u32, const BUF_SIZE: usize>
where
    T: Transport,
    TM: Timer<TIMER_HZ>,
    PWR: OutputPin,
    RST: OutputPin,
    W: Watchdog,
{
    /// AT command engine
    pub(crate) client: AtClient<T, TM, W, TIMER_HZ, BUF_SIZE>,

    /// Power key, toggles the module on and off
    power_pin: PWR,

    /// Reset line, active low
    reset_pin: RST,

    pub(crate) config: Config,

    pub(crate) state: ModemState,

    init_phase: InitPhase,

    /// Link speed found by the last successful initialization
    baud_rate: Option<u32>,

    /// True while the single [crate::stack::Socket] is handed out
    pub(crate) socket_open: bool,
}

impl<T, TM, PWR, RST, W, const TIMER_HZ: u32, const BUF_SIZE: usize> Modem<T, TM, PWR, RST, W, TIMER_HZ, BUF_SIZE>
where
    T: Transport,
    TM: Timer<TIMER_HZ>,
    PWR: OutputPin,
    RST: OutputPin,
    W: Watchdog,
{
    pub fn new(transport: T, timer: TM, power_pin: PWR, mut reset_pin: RST, watchdog: W, config: Config) -> Self {
        reset_pin.set_high().ok();

        Self {
            client: AtClient::new(transport, timer, watchdog, config.command_timeout_ms),
            power_pin,
            reset_pin,
            config,
            state: ModemState::default(),
            init_phase: InitPhase::Off,
            baud_rate: None,
            socket_open: false,
        }
    }

    /// Current state facets
    pub fn state(&self) -> &ModemState {
        &self.state
    }

    pub fn init_phase(&self) -> InitPhase {
        self.init_phase
    }

    /// Link speed found by the last successful initialization
    pub fn baud_rate(&self) -> Option<u32> {
        self.baud_rate
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    /// True if a bearer or IP context is up. Not re-queried, s. [Modem::check_network]
    pub fn is_registered(&self) -> bool {
        self.state.is_registered()
    }

    /// Powers the module on and runs the init sequence
    ///
    /// Autobaud is probed first. If the module does not answer, the fixed link speeds are swept.
    /// Returns the link speed the module answered at.
    pub fn init(&mut self) -> Result<u32, InitError> {
        self.power_on().map_err(InitError::Link)?;
        self.state.clear_initialized();
        self.baud_rate = None;

        if self.init_autobaud()? || self.init_fixed_baud()? {
            return self.baud_rate.ok_or(InitError::BaudDetection);
        }

        Err(InitError::BaudDetection)
    }

    /// Probes the module in autobaud mode
    fn init_autobaud(&mut self) -> Result<bool, InitError> {
        self.init_phase = InitPhase::AutobaudProbe;
        info!("Initializing modem in autobaud mode...");

        let rate = self.config.autobaud_rate;
        self.client.set_baud_rate(rate).map_err(InitError::Link)?;

        for attempt in 0..self.config.autobaud_attempts {
            if attempt > 0 {
                self.client
                    .delay_ms(AUTOBAUD_RETRY_DELAY_MS)
                    .map_err(InitError::Link)?;
            }

            if self.probe()? {
                info!("Modem answered in autobaud mode at attempt {}", attempt + 1);
                self.initialized(rate);
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Sweeps the fixed link speeds. On success the speed gets persisted in the module.
    fn init_fixed_baud(&mut self) -> Result<bool, InitError> {
        self.init_phase = InitPhase::FixedBaudSweep;
        info!("Initializing modem with fixed baud rates...");

        for rate in BAUD_RATES {
            self.client.drain().map_err(InitError::Link)?;
            self.client.set_baud_rate(rate).map_err(InitError::Link)?;
            debug!("Trying baud rate {}", rate);

            if !self.probe()? {
                continue;
            }

            match self.persist_baud_rate(rate) {
                Ok(_) => {
                    info!("Modem answered at {} baud", rate);
                    self.initialized(rate);
                    return Ok(true);
                }
                Err(error) => warn!("Persisting baud rate {} failed: {:?}", rate, error),
            }
        }

        self.init_phase = InitPhase::Failed;
        error!("Modem initialization failed");
        Ok(false)
    }

    /// Sends a bare AT. Link level failures abort, anything else is a failed probe.
    fn probe(&mut self) -> Result<bool, InitError> {
        match self.client.execute(&Command::sync()) {
            Ok(_) => Ok(true),
            Err(CommandError::Transport(kind)) => Err(InitError::Link(CommandError::Transport(kind))),
            Err(CommandError::TimerError) => Err(InitError::Link(CommandError::TimerError)),
            Err(_) => Ok(false),
        }
    }

    fn persist_baud_rate(&mut self, rate: u32) -> Result<(), CommandError> {
        self.client.execute(&Command::set_baud_rate(rate)?)?;
        self.client.execute(&Command::factory_defaults())?;
        self.client.execute(&Command::save_profile())?;
        Ok(())
    }

    fn initialized(&mut self, rate: u32) {
        self.state.set_initialized();
        self.baud_rate = Some(rate);
        self.init_phase = InitPhase::Initialized;
    }

    /// Restores the factory defaults and disables the command echo
    pub fn setup(&mut self) -> Result<(), ModemError> {
        self.assert_initialized()?;

        self.client.execute(&Command::factory_defaults())?;
        self.client.execute(&Command::echo_off())?;
        Ok(())
    }

    /// Returns the IMEI of the module
    pub fn imei(&mut self) -> Result<String<16>, ModemError> {
        self.assert_initialized()?;

        let response = self.client.execute(&Command::imei())?;
        let reply = response.as_str().ok_or(ModemError::ProtocolMismatch)?;
        parse_imei(reply).map_err(|_| ModemError::ProtocolMismatch)
    }

    /// Toggles the power key if the module is not powered yet
    pub fn power_on(&mut self) -> Result<(), CommandError> {
        if self.state.is_powered() {
            return Ok(());
        }

        info!("Switching modem on");
        self.init_phase = InitPhase::PoweringOn;
        self.toggle_power()?;
        self.state.set_powered(true);
        Ok(())
    }

    /// Toggles the power key if the module is powered. Clears all state.
    pub fn power_off(&mut self) -> Result<(), CommandError> {
        if !self.state.is_powered() {
            return Ok(());
        }

        info!("Switching modem off");
        self.toggle_power()?;
        self.state.set_powered(false);
        self.init_phase = InitPhase::Off;
        self.baud_rate = None;
        Ok(())
    }

    /// Pulses the reset line. The module needs to be initialized again afterwards.
    pub fn reset(&mut self) -> Result<(), CommandError> {
        info!("Resetting modem");
        self.reset_pin.set_low().ok();
        self.client.delay_ms(RESET_TIME_MS)?;
        self.reset_pin.set_high().ok();
        self.client.delay_ms(RESET_SETTLE_TIME_MS)?;

        self.state.clear_initialized();
        self.init_phase = if self.state.is_powered() {
            InitPhase::PoweringOn
        } else {
            InitPhase::Off
        };
        Ok(())
    }

    fn toggle_power(&mut self) -> Result<(), CommandError> {
        self.power_pin.set_high().ok();
        self.client.delay_ms(POWER_TOGGLE_TIME_MS)?;
        self.power_pin.set_low().ok();
        self.client.delay_ms(POWER_SETTLE_TIME_MS)
    }

    pub(crate) fn assert_initialized(&self) -> Result<(), ModemError> {
        if !self.state.is_initialized() {
            return Err(ModemError::NotInitialized);
        }

        Ok(())
    }
}
