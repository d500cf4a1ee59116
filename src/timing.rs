//! Fixed timings of the SIM800 power, reset and command interface, in milliseconds.

/// High time of the power key to toggle the module on or off
pub const POWER_TOGGLE_TIME_MS: u32 = 2_000;

/// Settle time after releasing the power key
pub const POWER_SETTLE_TIME_MS: u32 = 1_000;

/// Low time of the reset pin to trigger a module reset
pub const RESET_TIME_MS: u32 = 1_300;

/// Time to wait for the module to boot after a reset pulse
pub const RESET_SETTLE_TIME_MS: u32 = 3_000;

/// Guard time before every command line
pub const COMMAND_GUARD_TIME_MS: u32 = 100;

/// Default deadline for a single command exchange
pub const COMMAND_TIMEOUT_MS: u32 = 5_000;

/// Deadline for activating the GPRS bearer or the IP context
pub const ACTIVATION_TIMEOUT_MS: u32 = 60_000;

/// Deadline for the `CONNECT` line after `AT+CIPSTART`
pub const TCP_CONNECT_TIMEOUT_MS: u32 = 10_000;

/// Deadline for re-entering transparent mode
pub const DATA_MODE_TIMEOUT_MS: u32 = 5_000;

/// Silence required before and after the `+++` escape sequence
pub const ESCAPE_GUARD_TIME_MS: u32 = 1_000;

/// Wait between autobaud probes. The module may return garbage on the first
/// characters after power on.
pub const AUTOBAUD_RETRY_DELAY_MS: u32 = 5_000;

/// Link speed used for autobaud probing
pub const AUTOBAUD_RATE: u32 = 115_200;

/// Candidate link speeds of the fixed baud rate sweep, in sweep order
pub const BAUD_RATES: [u32; 8] = [1_200, 2_400, 4_800, 9_600, 19_200, 38_400, 57_600, 115_200];
