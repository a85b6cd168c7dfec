//! Link budget steps
//!
//! One function per line of a link budget sheet, so each can be checked
//! against a hand calculation.

use crate::{
    finite, plausible, positive, Result, BOLTZMANN_DBW_PER_K_HZ, FREQUENCY_RANGE_HZ,
    RANGE_RANGE_M, SPEED_OF_LIGHT_M_S,
};
use std::f64::consts::PI;

/// Free space path loss in dB
///
/// `20·log10(d) + 20·log10(f) + 20·log10(4π/c)`
pub fn free_space_path_loss_db(range_m: f64, freq_hz: f64) -> Result<f64> {
    let range_m = plausible("range_m", range_m, "m", RANGE_RANGE_M)?;
    let freq_hz = plausible("frequency_hz", freq_hz, "Hz", FREQUENCY_RANGE_HZ)?;

    Ok(20.0 * range_m.log10()
        + 20.0 * freq_hz.log10()
        + 20.0 * (4.0 * PI / SPEED_OF_LIGHT_M_S).log10())
}

pub fn watts_to_dbm(power_w: f64) -> Result<f64> {
    let power_w = positive("power_w", power_w)?;
    Ok(10.0 * (power_w * 1000.0).log10())
}

pub fn watts_to_dbw(power_w: f64) -> Result<f64> {
    Ok(watts_to_dbm(power_w)? - 30.0)
}

/// EIRP referenced to 1 mW
pub fn eirp_dbm(power_w: f64, cable_loss_db: f64, antenna_gain_db: f64) -> Result<f64> {
    let cable_loss_db = finite("cable_loss_db", cable_loss_db)?;
    let antenna_gain_db = finite("antenna_gain_db", antenna_gain_db)?;
    Ok(watts_to_dbm(power_w)? - cable_loss_db + antenna_gain_db)
}

/// EIRP referenced to 1 W
pub fn eirp_dbw(power_w: f64, cable_loss_db: f64, antenna_gain_db: f64) -> Result<f64> {
    Ok(eirp_dbm(power_w, cable_loss_db, antenna_gain_db)? - 30.0)
}

/// System noise temperature in dBK
pub fn system_noise_temp_dbk(antenna_temp_k: f64, receiver_temp_k: f64) -> Result<f64> {
    let total = positive("system_noise_temp_k", antenna_temp_k + receiver_temp_k)?;
    Ok(10.0 * total.log10())
}

pub fn g_over_t_db(rx_gain_dbi: f64, noise_temp_dbk: f64) -> f64 {
    rx_gain_dbi - noise_temp_dbk
}

/// C/N0 in dB-Hz: EIRP - FSPL + G/T - k
pub fn carrier_to_noise_density_db(eirp_dbw: f64, fspl_db: f64, g_over_t_db: f64) -> f64 {
    eirp_dbw - fspl_db + g_over_t_db - BOLTZMANN_DBW_PER_K_HZ
}

pub fn eb_n0_available_db(cn0_db: f64, data_rate_bps: f64) -> Result<f64> {
    let data_rate_bps = positive("data_rate_bps", data_rate_bps)?;
    Ok(cn0_db - 10.0 * data_rate_bps.log10())
}

/// Positive margin means the link closes
pub fn link_margin_db(eb_n0_available_db: f64, eb_n0_required_db: f64) -> f64 {
    eb_n0_available_db - eb_n0_required_db
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinkBudgetError;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_one_watt_is_thirty_dbm() {
        assert!(close(watts_to_dbm(1.0).unwrap(), 30.0, 1e-12));
        assert!(close(watts_to_dbw(1.0).unwrap(), 0.0, 1e-12));
        assert!(close(watts_to_dbm(5.0).unwrap(), 36.9897, 1e-4));
    }

    #[test]
    fn test_non_positive_power_rejected() {
        for p in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                watts_to_dbm(p),
                Err(LinkBudgetError::InvalidParameter { name: "power_w", .. })
            ));
        }
    }

    #[test]
    fn test_fspl_reference_value() {
        // 510 km at 2.2 GHz
        let fspl = free_space_path_loss_db(510_000.0, 2.2e9).unwrap();
        assert!(close(fspl, 153.4476, 1e-3), "fspl {fspl}");
    }

    #[test]
    fn test_fspl_doubling_range_adds_six_db() {
        let a = free_space_path_loss_db(1.0e6, 2.2e9).unwrap();
        let b = free_space_path_loss_db(2.0e6, 2.2e9).unwrap();
        assert!(close(b - a, 20.0 * 2f64.log10(), 1e-9));
        assert!(close(b - a, 6.0206, 1e-4));
    }

    #[test]
    fn test_fspl_rejects_non_positive_inputs() {
        assert!(matches!(
            free_space_path_loss_db(0.0, 2.2e9),
            Err(LinkBudgetError::InvalidParameter { .. })
        ));
        assert!(matches!(
            free_space_path_loss_db(1000.0, -1.0),
            Err(LinkBudgetError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_fspl_rejects_mhz_passed_as_hz() {
        // 2200 "Hz" is really 2200 MHz
        assert!(matches!(
            free_space_path_loss_db(510_000.0, 2200.0),
            Err(LinkBudgetError::UnitMismatch { name: "frequency_hz", .. })
        ));
        assert!(matches!(
            free_space_path_loss_db(1.0e16, 2.2e9),
            Err(LinkBudgetError::UnitMismatch { name: "range_m", .. })
        ));
    }

    #[test]
    fn test_eirp_references_differ_by_thirty() {
        let dbm = eirp_dbm(5.0, 1.0, 5.3).unwrap();
        let dbw = eirp_dbw(5.0, 1.0, 5.3).unwrap();
        assert!(close(dbm - dbw, 30.0, 1e-12));
        assert!(close(dbw, 11.2897, 1e-4));
    }

    #[test]
    fn test_system_noise_and_g_over_t() {
        let t = system_noise_temp_dbk(290.0, 43.0).unwrap();
        assert!(close(t, 25.2244, 1e-4));
        assert!(close(g_over_t_db(30.96, t), 5.7356, 1e-4));
        assert!(system_noise_temp_dbk(0.0, 0.0).is_err());
        assert!(system_noise_temp_dbk(100.0, -150.0).is_err());
    }

    #[test]
    fn test_cn0_adds_228_6() {
        let cn0 = carrier_to_noise_density_db(10.0, 150.0, 5.0);
        assert!(close(cn0, 10.0 - 150.0 + 5.0 + 228.6, 1e-12));
    }

    #[test]
    fn test_eb_n0_and_margin() {
        let ebn0 = eb_n0_available_db(92.0, 1.0e6).unwrap();
        assert!(close(ebn0, 32.0, 1e-12));
        assert!(close(link_margin_db(ebn0, 10.5), 21.5, 1e-12));
        assert!(eb_n0_available_db(92.0, 0.0).is_err());
    }
}
