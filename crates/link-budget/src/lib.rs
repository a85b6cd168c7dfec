//! RF Link Budget Calculator
//!
//! Downlink budget from a spacecraft transmitter to a ground receiver.
//! Accounts for:
//! - Free space path loss
//! - Transmitter power, cable loss and antenna gain (EIRP)
//! - Receiver G/T from antenna and receiver noise temperatures
//! - C/N0, available Eb/N0 and margin against a required Eb/N0
//!
//! Every step is a small pure function in [`formulas`]; [`evaluate`] chains
//! them for one geometry sample. All inputs are SI: metres, hertz, watts,
//! kelvin. Slant ranges from the geometry layer arrive in km and are
//! converted here, never by the caller.

use thiserror::Error;

pub mod budget;
pub mod formulas;
pub mod params;

pub use budget::{evaluate, LinkBudgetResult};
pub use formulas::*;
pub use params::RfParameters;

/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Boltzmann's constant, 10·log10(1.380649e-23) (dBW/K/Hz)
pub const BOLTZMANN_DBW_PER_K_HZ: f64 = -228.6;

/// Plausible carrier frequencies: VLF through sub-millimetre (Hz)
pub const FREQUENCY_RANGE_HZ: (f64, f64) = (3.0e3, 3.0e12);

/// Plausible link distances: a metre out to ~100 AU (m)
pub const RANGE_RANGE_M: (f64, f64) = (1.0, 1.5e13);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkBudgetError {
    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("Unit mismatch for {name}: {value} {unit} outside plausible range [{min:e}, {max:e}]")]
    UnitMismatch {
        name: &'static str,
        value: f64,
        unit: &'static str,
        min: f64,
        max: f64,
    },
}

pub type Result<T> = std::result::Result<T, LinkBudgetError>;

/// Finite and strictly positive
pub(crate) fn positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(LinkBudgetError::InvalidParameter { name, value })
    }
}

/// Finite (dB quantities may be any sign)
pub(crate) fn finite(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LinkBudgetError::InvalidParameter { name, value })
    }
}

/// Positive and inside the plausible band for its unit
pub(crate) fn plausible(
    name: &'static str,
    value: f64,
    unit: &'static str,
    (min, max): (f64, f64),
) -> Result<f64> {
    positive(name, value)?;
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(LinkBudgetError::UnitMismatch {
            name,
            value,
            unit,
            min,
            max,
        })
    }
}
