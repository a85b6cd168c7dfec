//! Orbital Mechanics Library
//!
//! Observer/target geometry for ground-station link analysis:
//! SGP4 propagation of TLE element sets, a low-precision solar ephemeris,
//! topocentric look angles, pass (AOS/peak/LOS) search and the
//! spherical-earth slant-range model used for discrete elevation sweeps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub mod pass;
pub mod provider;
pub mod slant_range;
pub mod solar;

pub use pass::{find_next_pass, PassSearch, PassWindow};
pub use provider::{EphemerisProvider, GeometryProvider, DEFAULT_MAX_EPOCH_AGE_DAYS};
pub use slant_range::{
    slant_range_from_elevation, SlantRangeModel, DEFAULT_SWEEP_DEG, EARTH_MEAN_RADIUS_KM,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Geometry undefined at {at}: {reason}")]
    Undefined { at: SampleKey, reason: String },
    #[error("No pass found within {searched_hours:.1} h after {after}")]
    NoPassFound {
        after: DateTime<Utc>,
        searched_hours: f64,
    },
    #[error("Invalid TLE format: {0}")]
    InvalidTle(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, GeometryError>;

/// Observer altitude above sea level, unit fixed at construction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Altitude {
    Meters(f64),
    Kilometers(f64),
}

impl Altitude {
    pub fn km(&self) -> f64 {
        match *self {
            Altitude::Meters(m) => m / 1000.0,
            Altitude::Kilometers(km) => km,
        }
    }

    pub fn meters(&self) -> f64 {
        self.km() * 1000.0
    }
}

/// Ground observer (geodetic, WGS-84)
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Observer {
    latitude_deg: f64,
    longitude_deg: f64,
    altitude: Altitude,
}

impl Observer {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude: Altitude) -> Result<Self> {
        if !latitude_deg.is_finite() || !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(GeometryError::InvalidParameter(format!(
                "latitude {latitude_deg} outside [-90, 90]"
            )));
        }
        if !longitude_deg.is_finite() || !(-180.0..=180.0).contains(&longitude_deg) {
            return Err(GeometryError::InvalidParameter(format!(
                "longitude {longitude_deg} outside [-180, 180]"
            )));
        }
        if !altitude.km().is_finite() {
            return Err(GeometryError::InvalidParameter(
                "observer altitude must be finite".to_string(),
            ));
        }

        Ok(Self {
            latitude_deg,
            longitude_deg,
            altitude,
        })
    }

    pub fn latitude_deg(&self) -> f64 {
        self.latitude_deg
    }

    pub fn longitude_deg(&self) -> f64 {
        self.longitude_deg
    }

    pub fn altitude(&self) -> Altitude {
        self.altitude
    }
}

/// An orbiting body identified by its TLE element set
#[derive(Clone, Serialize)]
pub struct Satellite {
    pub name: String,
    pub norad_id: u64,
    pub tle_line1: String,
    pub tle_line2: String,
    pub epoch: DateTime<Utc>,
    /// SGP4 initialisation, built once per element set
    #[serde(skip)]
    constants: Arc<sgp4::Constants>,
}

impl fmt::Debug for Satellite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Satellite")
            .field("name", &self.name)
            .field("norad_id", &self.norad_id)
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StateVector {
    pub position_km: [f64; 3],
    pub velocity_km_s: [f64; 3],
    pub epoch: DateTime<Utc>,
}

impl Satellite {
    /// Parse and validate a two-line element set
    pub fn from_tle(name: impl Into<String>, tle_line1: &str, tle_line2: &str) -> Result<Self> {
        let name = name.into();
        let elements = propagation::parse_elements(&name, tle_line1, tle_line2)?;
        let constants = sgp4::Constants::from_elements(&elements)
            .map_err(|e| GeometryError::InvalidTle(format!("{:?}", e)))?;

        Ok(Self {
            name,
            norad_id: elements.norad_id,
            tle_line1: tle_line1.trim_end().to_string(),
            tle_line2: tle_line2.trim_end().to_string(),
            epoch: DateTime::<Utc>::from_naive_utc_and_offset(elements.datetime, Utc),
            constants: Arc::new(constants),
        })
    }

    pub fn propagate(&self, time: DateTime<Utc>) -> Result<StateVector> {
        propagation::sgp4_propagate(self, time)
    }
}

/// Anything the ground station can point at
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    Satellite(Satellite),
    Sun,
}

impl Target {
    pub fn name(&self) -> &str {
        match self {
            Target::Satellite(sat) => &sat.name,
            Target::Sun => "Sun",
        }
    }
}

/// What a sample (and the link budget derived from it) is indexed by
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SampleKey {
    Time(DateTime<Utc>),
    Elevation(f64),
}

impl SampleKey {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        match *self {
            SampleKey::Time(t) => Some(t),
            SampleKey::Elevation(_) => None,
        }
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleKey::Time(t) => write!(f, "{}", t.to_rfc3339()),
            SampleKey::Elevation(deg) => write!(f, "{deg}°"),
        }
    }
}

/// Observer-relative geometry at one tick or one elevation angle
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct GeometrySample {
    pub key: SampleKey,
    pub slant_range_km: f64,
    /// Absent for the analytic slant-range model
    pub azimuth_deg: Option<f64>,
    pub elevation_deg: f64,
}

impl GeometrySample {
    pub fn new(
        key: SampleKey,
        slant_range_km: f64,
        azimuth_deg: Option<f64>,
        elevation_deg: f64,
    ) -> Result<Self> {
        let undefined = |reason: String| GeometryError::Undefined { at: key, reason };

        if !slant_range_km.is_finite() || slant_range_km < 0.0 {
            return Err(undefined(format!("slant range {slant_range_km} km")));
        }
        if !elevation_deg.is_finite() || !(-90.0..=90.0).contains(&elevation_deg) {
            return Err(undefined(format!("elevation {elevation_deg}°")));
        }
        if let Some(az) = azimuth_deg {
            if !az.is_finite() {
                return Err(undefined(format!("azimuth {az}°")));
            }
        }

        Ok(Self {
            key,
            slant_range_km,
            azimuth_deg,
            elevation_deg,
        })
    }
}

pub mod propagation {
    use super::*;

    pub(crate) fn parse_elements(
        name: &str,
        tle_line1: &str,
        tle_line2: &str,
    ) -> Result<sgp4::Elements> {
        sgp4::Elements::from_tle(
            Some(name.to_string()),
            tle_line1.trim_end().as_bytes(),
            tle_line2.trim_end().as_bytes(),
        )
        .map_err(|e| GeometryError::InvalidTle(format!("{:?}", e)))
    }

    /// Propagate with SGP4; position/velocity are in the TEME frame
    pub fn sgp4_propagate(satellite: &Satellite, time: DateTime<Utc>) -> Result<StateVector> {
        let undefined = |reason: String| GeometryError::Undefined {
            at: SampleKey::Time(time),
            reason,
        };

        let minutes_since_epoch =
            time.signed_duration_since(satellite.epoch).num_milliseconds() as f64 / 60_000.0;

        let prediction = satellite
            .constants
            .propagate(minutes_since_epoch)
            .map_err(|e| undefined(format!("{:?}", e)))?;

        Ok(StateVector {
            position_km: prediction.position,
            velocity_km_s: prediction.velocity,
            epoch: time,
        })
    }
}

pub mod transforms {
    use super::*;
    use nalgebra::Vector3;
    use std::f64::consts::PI;

    const EARTH_RADIUS_KM: f64 = 6378.137;
    const EARTH_FLATTENING: f64 = 1.0 / 298.257223563;

    /// Azimuth/elevation/range from an observer
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct LookAngles {
        /// 0 = North, 90 = East, in [0, 360)
        pub azimuth_deg: f64,
        pub elevation_deg: f64,
        pub range_km: f64,
    }

    pub fn geodetic_to_ecef(observer: &Observer) -> Vector3<f64> {
        let lat = observer.latitude_deg().to_radians();
        let lon = observer.longitude_deg().to_radians();
        let alt = observer.altitude().km();

        let e2 = 2.0 * EARTH_FLATTENING - EARTH_FLATTENING * EARTH_FLATTENING;
        // Radius of curvature in prime vertical
        let n = EARTH_RADIUS_KM / (1.0 - e2 * lat.sin().powi(2)).sqrt();

        Vector3::new(
            (n + alt) * lat.cos() * lon.cos(),
            (n + alt) * lat.cos() * lon.sin(),
            (n * (1.0 - e2) + alt) * lat.sin(),
        )
    }

    /// Julian date (UT) of a UTC instant
    pub fn julian_date(time: DateTime<Utc>) -> f64 {
        let unix = time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9;
        unix / 86400.0 + 2440587.5
    }

    /// Greenwich Mean Sidereal Time in radians, [0, 2π)
    pub fn gmst_rad(time: DateTime<Utc>) -> f64 {
        // Julian centuries from J2000.0
        let t = (julian_date(time) - 2451545.0) / 36525.0;

        let gmst_sec = 67310.54841
            + (876600.0 * 3600.0 + 8640184.812866) * t
            + 0.093104 * t * t
            - 6.2e-6 * t * t * t;

        ((gmst_sec / 240.0) * (PI / 180.0)).rem_euclid(2.0 * PI)
    }

    /// Rotate an inertial (TEME) position into Earth-fixed axes
    pub fn inertial_to_ecef(position_km: [f64; 3], gmst_rad: f64) -> Vector3<f64> {
        let (sin_g, cos_g) = gmst_rad.sin_cos();
        let [x, y, z] = position_km;
        Vector3::new(cos_g * x + sin_g * y, -sin_g * x + cos_g * y, z)
    }

    /// Look angles from the observer to an Earth-fixed position
    pub fn look_angles(observer: &Observer, target_ecef: Vector3<f64>) -> LookAngles {
        let delta = target_ecef - geodetic_to_ecef(observer);
        let range_km = delta.norm();

        let (sin_lat, cos_lat) = observer.latitude_deg().to_radians().sin_cos();
        let (sin_lon, cos_lon) = observer.longitude_deg().to_radians().sin_cos();

        // East-North-Up rotation
        let east = Vector3::new(-sin_lon, cos_lon, 0.0).dot(&delta);
        let north = Vector3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat).dot(&delta);
        let up = Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat).dot(&delta);

        let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
        let elevation_deg = up.atan2(east.hypot(north)).to_degrees();

        LookAngles {
            azimuth_deg,
            elevation_deg,
            range_km,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::transforms::*;
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_observer_rejects_bad_coordinates() {
        assert!(Observer::new(91.0, 0.0, Altitude::Meters(0.0)).is_err());
        assert!(Observer::new(0.0, -180.5, Altitude::Meters(0.0)).is_err());
        assert!(Observer::new(f64::NAN, 0.0, Altitude::Meters(0.0)).is_err());
    }

    #[test]
    fn test_altitude_units() {
        assert!((Altitude::Meters(150.0).km() - 0.15).abs() < 1e-12);
        assert!((Altitude::Kilometers(0.15).meters() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_iss_tle() {
        let sat = Satellite::from_tle(ISS_NAME, ISS_LINE1, ISS_LINE2).unwrap();
        assert_eq!(sat.norad_id, 25544);
        // Epoch 24178.50504361 = 2024-06-26 12:07:15 UTC
        assert_eq!(sat.epoch.date_naive().to_string(), "2024-06-26");
        assert_eq!(Target::Satellite(sat).name(), ISS_NAME);
    }

    #[test]
    fn test_invalid_tle_rejected() {
        let err = Satellite::from_tle("junk", "1 not a tle", "2 also not").unwrap_err();
        assert!(matches!(err, GeometryError::InvalidTle(_)));
    }

    #[test]
    fn test_iss_orbit_radius() {
        let sat = Satellite::from_tle(ISS_NAME, ISS_LINE1, ISS_LINE2).unwrap();
        let state = sat.propagate(sat.epoch).unwrap();
        let [x, y, z] = state.position_km;
        let altitude = (x * x + y * y + z * z).sqrt() - 6378.137;
        assert!(altitude > 380.0 && altitude < 450.0, "ISS altitude {altitude} km");
    }

    #[test]
    fn test_sgp4_constants_built_once() {
        let sat = Satellite::from_tle(ISS_NAME, ISS_LINE1, ISS_LINE2).unwrap();
        let copy = sat.clone();
        assert!(Arc::ptr_eq(&sat.constants, &copy.constants));

        let t = sat.epoch + chrono::Duration::minutes(45);
        let a = sat.propagate(t).unwrap();
        let b = copy.propagate(t).unwrap();
        assert_eq!(a.position_km, b.position_km);
        assert_eq!(a.velocity_km_s, b.velocity_km_s);
    }

    #[test]
    fn test_geodetic_to_ecef_equator() {
        let obs = Observer::new(0.0, 0.0, Altitude::Meters(0.0)).unwrap();
        let ecef = geodetic_to_ecef(&obs);
        assert!((ecef.x - 6378.137).abs() < 0.1);
        assert!(ecef.y.abs() < 0.1);
        assert!(ecef.z.abs() < 0.1);
    }

    #[test]
    fn test_gmst_range_and_j2000() {
        let j2000 = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let gmst = gmst_rad(j2000).to_degrees();
        // 280.46° at J2000.0
        assert!((gmst - 280.46).abs() < 0.01, "gmst {gmst}");

        let later = Utc.with_ymd_and_hms(2024, 6, 26, 3, 17, 41).unwrap();
        let g = gmst_rad(later);
        assert!((0.0..2.0 * std::f64::consts::PI).contains(&g));
    }

    #[test]
    fn test_look_angles_zenith() {
        // On the equator the geodetic normal is radial
        let obs = Observer::new(0.0, 45.0, Altitude::Meters(150.0)).unwrap();
        let up = geodetic_to_ecef(&obs).normalize();
        let overhead = geodetic_to_ecef(&obs) + up * 500.0;
        let angles = look_angles(&obs, overhead);
        assert!((angles.elevation_deg - 90.0).abs() < 1e-6);
        assert!((angles.range_km - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_sample_validation() {
        let key = SampleKey::Elevation(45.0);
        assert!(GeometrySample::new(key, -1.0, None, 45.0).is_err());
        assert!(GeometrySample::new(key, 100.0, None, 95.0).is_err());
        assert!(GeometrySample::new(key, f64::NAN, None, 45.0).is_err());
        assert!(GeometrySample::new(key, 100.0, Some(10.0), 45.0).is_ok());
    }

    #[test]
    fn test_sample_key_display() {
        assert_eq!(SampleKey::Elevation(30.0).to_string(), "30°");
        let t = Utc.with_ymd_and_hms(2024, 6, 26, 0, 0, 0).unwrap();
        assert_eq!(SampleKey::Time(t).to_string(), "2024-06-26T00:00:00+00:00");
        assert_eq!(SampleKey::Time(t).time(), Some(t));
    }
}
