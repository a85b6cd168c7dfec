//! Full link budget for one geometry sample

use crate::formulas::*;
use crate::{positive, Result, RfParameters};
use orbital_mechanics::{GeometrySample, SampleKey};
use serde::Serialize;
use tracing::trace;

/// Link budget breakdown at one tick or elevation angle
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct LinkBudgetResult {
    pub key: SampleKey,
    pub slant_range_km: f64,
    pub azimuth_deg: Option<f64>,
    pub elevation_deg: f64,
    pub fspl_db: f64,
    pub eirp_dbw: f64,
    pub system_noise_temp_dbk: f64,
    pub g_over_t_db: f64,
    pub cn0_dbhz: f64,
    pub eb_n0_db: f64,
    pub link_margin_db: f64,
}

impl LinkBudgetResult {
    pub fn closes(&self) -> bool {
        self.link_margin_db >= 0.0
    }
}

/// Chain every step for `sample`. EIRP is referenced to 1 W.
pub fn evaluate(sample: &GeometrySample, params: &RfParameters) -> Result<LinkBudgetResult> {
    params.validate()?;

    // Geometry layer works in km, formulas in m
    let range_m = positive("slant_range_km", sample.slant_range_km)? * 1000.0;

    let fspl_db = free_space_path_loss_db(range_m, params.frequency_hz)?;
    let eirp_dbw = eirp_dbw(
        params.tx_power_w,
        params.tx_cable_loss_db,
        params.tx_antenna_gain_dbi,
    )?;
    let system_noise_temp_dbk =
        system_noise_temp_dbk(params.antenna_noise_temp_k, params.receiver_noise_temp_k)?;
    let g_over_t_db = g_over_t_db(params.rx_antenna_gain_dbi, system_noise_temp_dbk);
    let cn0_dbhz = carrier_to_noise_density_db(eirp_dbw, fspl_db, g_over_t_db);
    let eb_n0_db = eb_n0_available_db(cn0_dbhz, params.data_rate_bps)?;
    let link_margin_db = link_margin_db(eb_n0_db, params.required_eb_n0_db);

    trace!(
        "{}: FSPL {:.2} dB, C/N0 {:.2} dB-Hz, margin {:.2} dB",
        sample.key,
        fspl_db,
        cn0_dbhz,
        link_margin_db
    );

    Ok(LinkBudgetResult {
        key: sample.key,
        slant_range_km: sample.slant_range_km,
        azimuth_deg: sample.azimuth_deg,
        elevation_deg: sample.elevation_deg,
        fspl_db,
        eirp_dbw,
        system_noise_temp_dbk,
        g_over_t_db,
        cn0_dbhz,
        eb_n0_db,
        link_margin_db,
    })
}
