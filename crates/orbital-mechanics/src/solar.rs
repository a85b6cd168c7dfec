//! Low-precision solar ephemeris
//!
//! Good to roughly 0.01° in direction between 1950 and 2050, which is far
//! below anything a link budget can resolve.

use crate::transforms::{gmst_rad, julian_date, LookAngles};
use crate::Observer;
use chrono::{DateTime, Utc};

/// One astronomical unit (km)
pub const AU_KM: f64 = 149_597_870.7;

/// Apparent equatorial position of the Sun
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    pub right_ascension_deg: f64,
    pub declination_deg: f64,
    pub distance_au: f64,
}

pub fn solar_position(time: DateTime<Utc>) -> SolarPosition {
    // Days from J2000.0
    let n = julian_date(time) - 2451545.0;

    let mean_longitude = (280.460 + 0.9856474 * n).rem_euclid(360.0);
    let mean_anomaly = (357.528 + 0.9856003 * n).rem_euclid(360.0).to_radians();

    let ecliptic_longitude = (mean_longitude
        + 1.915 * mean_anomaly.sin()
        + 0.020 * (2.0 * mean_anomaly).sin())
    .to_radians();
    let obliquity = (23.439 - 0.0000004 * n).to_radians();

    let (sin_lambda, cos_lambda) = ecliptic_longitude.sin_cos();
    let right_ascension = (obliquity.cos() * sin_lambda).atan2(cos_lambda);
    let declination = (obliquity.sin() * sin_lambda).asin();

    SolarPosition {
        right_ascension_deg: right_ascension.to_degrees().rem_euclid(360.0),
        declination_deg: declination.to_degrees(),
        distance_au: 1.00014
            - 0.01671 * mean_anomaly.cos()
            - 0.00014 * (2.0 * mean_anomaly).cos(),
    }
}

/// Sun look angles from the observer; range is the Earth-Sun distance
pub fn look_angles(observer: &Observer, time: DateTime<Utc>) -> LookAngles {
    let sun = solar_position(time);

    let local_sidereal = gmst_rad(time) + observer.longitude_deg().to_radians();
    let hour_angle = local_sidereal - sun.right_ascension_deg.to_radians();

    let (sin_lat, cos_lat) = observer.latitude_deg().to_radians().sin_cos();
    let (sin_dec, cos_dec) = sun.declination_deg.to_radians().sin_cos();
    let (sin_ha, cos_ha) = hour_angle.sin_cos();

    let elevation = (sin_lat * sin_dec + cos_lat * cos_dec * cos_ha)
        .clamp(-1.0, 1.0)
        .asin();
    let azimuth = (-cos_dec * sin_ha).atan2(sin_dec * cos_lat - cos_dec * cos_ha * sin_lat);

    LookAngles {
        azimuth_deg: azimuth.to_degrees().rem_euclid(360.0),
        elevation_deg: elevation.to_degrees(),
        range_km: sun.distance_au * AU_KM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Altitude;
    use chrono::TimeZone;

    fn san_diego() -> Observer {
        Observer::new(32.6833, -117.2080, Altitude::Meters(150.0)).unwrap()
    }

    #[test]
    fn test_june_solstice_declination() {
        let t = Utc.with_ymd_and_hms(2024, 6, 20, 20, 51, 0).unwrap();
        let sun = solar_position(t);
        assert!((sun.declination_deg - 23.44).abs() < 0.05, "{}", sun.declination_deg);
        // Aphelion is early July
        assert!(sun.distance_au > 1.015);
    }

    #[test]
    fn test_local_noon_and_midnight() {
        // Local solar noon in San Diego is near 19:50 UTC in late June
        let noon = Utc.with_ymd_and_hms(2024, 6, 26, 19, 50, 0).unwrap();
        let angles = look_angles(&san_diego(), noon);
        assert!(angles.elevation_deg > 75.0, "noon elevation {}", angles.elevation_deg);
        // Sun due south-ish at noon for a northern observer
        assert!((angles.azimuth_deg - 180.0).abs() < 20.0, "az {}", angles.azimuth_deg);

        let midnight = Utc.with_ymd_and_hms(2024, 6, 27, 7, 50, 0).unwrap();
        let angles = look_angles(&san_diego(), midnight);
        assert!(angles.elevation_deg < -30.0, "midnight elevation {}", angles.elevation_deg);
    }

    #[test]
    fn test_range_is_about_one_au() {
        let t = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let angles = look_angles(&san_diego(), t);
        // Perihelion
        assert!((angles.range_km / AU_KM - 0.9833).abs() < 0.001);
    }
}
