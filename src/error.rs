//! Error types.
//!
//! Nothing here unwinds. Rejected configuration writes come back as
//! [`ConfigError`] and leave the previous settings in place. Hardware
//! bring-up failures are [`InitError`] and end in [`halt`].

use thiserror::Error;

use crate::logging::log;

/// Reasons a configuration write is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Blob length does not match the record layout.
    #[error("invalid data length for {record}: expected {expected}, got {actual}")]
    InvalidLength {
        record: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A field decoded to a value outside its domain.
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: i32 },

    /// Control change passthrough was not `"<cc>,<value>"`.
    #[error("malformed control change command")]
    MalformedCommand,

    /// The target has no readable or writable record.
    #[error("target {0} does not carry a settings record")]
    NoRecord(&'static str),
}

/// Fatal hardware bring-up failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InitError {
    /// An I/O expander did not answer on the bus.
    #[error("I/O expander at {address:#04x} not responding")]
    ExpanderNotResponding { address: u8 },
}

/// Log a fatal error and stop forever.
///
/// Continuing after a failed bring-up would drive undefined hardware state,
/// so the device waits for a manual reset.
pub fn halt(error: InitError) -> ! {
    log!("[halt] {}", error);
    loop {
        core::hint::spin_loop();
    }
}
