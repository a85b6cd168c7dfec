//! Spherical-earth slant range
//!
//! Range from a ground station to a body at a given altitude as a function
//! of elevation angle only. No clock, no observer location: used for
//! worst-case and discrete-angle link budgets without a propagator.

use crate::{GeometryError, GeometrySample, Result, SampleKey};

/// Mean Earth radius for the slant-range model (km)
pub const EARTH_MEAN_RADIUS_KM: f64 = 6378.14;

/// Zenith down to the horizon
pub const DEFAULT_SWEEP_DEG: [f64; 5] = [90.0, 60.0, 30.0, 10.0, 0.0];

/// Law of cosines on a spherical earth:
/// `R * (sqrt(((h + R) / R)^2 - cos²(el)) - sin(el))`
pub fn slant_range_from_elevation(altitude_km: f64, elevation_deg: f64) -> Result<f64> {
    if !altitude_km.is_finite() || altitude_km <= 0.0 {
        return Err(GeometryError::InvalidParameter(format!(
            "altitude must be positive, got {altitude_km} km"
        )));
    }
    if !elevation_deg.is_finite() || !(-90.0..=90.0).contains(&elevation_deg) {
        return Err(GeometryError::InvalidParameter(format!(
            "elevation {elevation_deg}° outside [-90, 90]"
        )));
    }

    let r = EARTH_MEAN_RADIUS_KM;
    let (sin_el, cos_el) = elevation_deg.to_radians().sin_cos();
    let ratio = (altitude_km + r) / r;

    Ok(r * ((ratio * ratio - cos_el * cos_el).sqrt() - sin_el))
}

/// Analytic geometry source for a body at fixed altitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlantRangeModel {
    altitude_km: f64,
}

impl SlantRangeModel {
    pub fn new(altitude_km: f64) -> Result<Self> {
        // Validates the altitude once up front
        slant_range_from_elevation(altitude_km, 90.0)?;
        Ok(Self { altitude_km })
    }

    pub fn altitude_km(&self) -> f64 {
        self.altitude_km
    }

    pub fn sample(&self, elevation_deg: f64) -> Result<GeometrySample> {
        let range_km = slant_range_from_elevation(self.altitude_km, elevation_deg)?;
        GeometrySample::new(
            SampleKey::Elevation(elevation_deg),
            range_km,
            None,
            elevation_deg,
        )
    }
}
