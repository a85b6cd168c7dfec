//! Transmitter/receiver parameters for one run

use crate::{finite, plausible, positive, Result, FREQUENCY_RANGE_HZ};
use serde::{Deserialize, Serialize};

/// RF parameters, fixed for the lifetime of a run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RfParameters {
    /// RF input power at the transmitter (W)
    pub tx_power_w: f64,
    pub tx_cable_loss_db: f64,
    pub tx_antenna_gain_dbi: f64,
    pub rx_antenna_gain_dbi: f64,
    /// Carrier frequency (Hz)
    pub frequency_hz: f64,
    pub data_rate_bps: f64,
    pub antenna_noise_temp_k: f64,
    /// Receiver/component noise temperature (K)
    pub receiver_noise_temp_k: f64,
    /// Eb/N0 needed for the target bit error rate (dB)
    pub required_eb_n0_db: f64,
}

impl RfParameters {
    /// Check every field before any result is computed
    pub fn validate(&self) -> Result<()> {
        positive("tx_power_w", self.tx_power_w)?;
        finite("tx_cable_loss_db", self.tx_cable_loss_db)?;
        finite("tx_antenna_gain_dbi", self.tx_antenna_gain_dbi)?;
        finite("rx_antenna_gain_dbi", self.rx_antenna_gain_dbi)?;
        plausible("frequency_hz", self.frequency_hz, "Hz", FREQUENCY_RANGE_HZ)?;
        positive("data_rate_bps", self.data_rate_bps)?;
        finite("antenna_noise_temp_k", self.antenna_noise_temp_k)?;
        finite("receiver_noise_temp_k", self.receiver_noise_temp_k)?;
        positive(
            "system_noise_temp_k",
            self.antenna_noise_temp_k + self.receiver_noise_temp_k,
        )?;
        finite("required_eb_n0_db", self.required_eb_n0_db)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn reference_parameters() -> RfParameters {
    RfParameters {
        tx_power_w: 5.0,
        tx_cable_loss_db: 1.0,
        tx_antenna_gain_dbi: 5.3,
        rx_antenna_gain_dbi: 30.96,
        frequency_hz: 2.2e9,
        data_rate_bps: 1_000_000.0,
        antenna_noise_temp_k: 290.0,
        receiver_noise_temp_k: 43.0,
        required_eb_n0_db: 10.5,
    }
}
