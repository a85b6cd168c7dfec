//! Geometry providers
//!
//! `GeometryProvider` is the seam between the link-budget simulation and
//! whatever knows where the target is. `EphemerisProvider` answers for TLE
//! satellites (SGP4) and for the Sun.

use crate::pass::{find_next_pass, PassSearch, PassWindow};
use crate::transforms::{gmst_rad, inertial_to_ecef, look_angles, LookAngles};
use crate::{solar, GeometryError, GeometrySample, Observer, Result, SampleKey, Satellite, Target};
use chrono::{DateTime, Duration, Utc};
use tracing::trace;

/// Element sets older (or newer) than this are refused
pub const DEFAULT_MAX_EPOCH_AGE_DAYS: i64 = 30;

/// "Where is the target relative to the observer at time T"
pub trait GeometryProvider {
    fn sample(
        &self,
        target: &Target,
        observer: &Observer,
        time: DateTime<Utc>,
    ) -> Result<GeometrySample>;

    /// Search parameters used by the default `next_pass`
    fn pass_search(&self) -> PassSearch {
        PassSearch::default()
    }

    fn next_pass(
        &self,
        target: &Target,
        observer: &Observer,
        after: DateTime<Utc>,
    ) -> Result<PassWindow> {
        find_next_pass(
            |t| self.sample(target, observer, t).map(|s| s.elevation_deg),
            after,
            &self.pass_search(),
        )
    }
}

impl<P: GeometryProvider + ?Sized> GeometryProvider for &P {
    fn sample(
        &self,
        target: &Target,
        observer: &Observer,
        time: DateTime<Utc>,
    ) -> Result<GeometrySample> {
        (**self).sample(target, observer, time)
    }

    fn pass_search(&self) -> PassSearch {
        (**self).pass_search()
    }

    fn next_pass(
        &self,
        target: &Target,
        observer: &Observer,
        after: DateTime<Utc>,
    ) -> Result<PassWindow> {
        (**self).next_pass(target, observer, after)
    }
}

/// SGP4 for satellites, analytic ephemeris for the Sun
#[derive(Debug, Clone)]
pub struct EphemerisProvider {
    max_epoch_age: Duration,
    search: PassSearch,
}

impl Default for EphemerisProvider {
    fn default() -> Self {
        Self {
            max_epoch_age: Duration::days(DEFAULT_MAX_EPOCH_AGE_DAYS),
            search: PassSearch::default(),
        }
    }
}

impl EphemerisProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_epoch_age(mut self, age: Duration) -> Self {
        self.max_epoch_age = age;
        self
    }

    pub fn with_pass_search(mut self, search: PassSearch) -> Self {
        self.search = search;
        self
    }

    fn satellite_look_angles(
        &self,
        satellite: &Satellite,
        observer: &Observer,
        time: DateTime<Utc>,
    ) -> Result<LookAngles> {
        let age = time - satellite.epoch;
        if age.abs() > self.max_epoch_age {
            return Err(GeometryError::Undefined {
                at: SampleKey::Time(time),
                reason: format!(
                    "element set epoch {} is {:.1} days from requested time",
                    satellite.epoch,
                    age.num_seconds() as f64 / 86400.0
                ),
            });
        }

        let state = satellite.propagate(time)?;
        let ecef = inertial_to_ecef(state.position_km, gmst_rad(time));
        Ok(look_angles(observer, ecef))
    }
}

impl GeometryProvider for EphemerisProvider {
    fn sample(
        &self,
        target: &Target,
        observer: &Observer,
        time: DateTime<Utc>,
    ) -> Result<GeometrySample> {
        let angles = match target {
            Target::Satellite(sat) => self.satellite_look_angles(sat, observer, time)?,
            Target::Sun => solar::look_angles(observer, time),
        };

        trace!(
            "{} at {}: az {:.2}° el {:.2}° range {:.1} km",
            target.name(),
            time,
            angles.azimuth_deg,
            angles.elevation_deg,
            angles.range_km
        );

        GeometrySample::new(
            SampleKey::Time(time),
            angles.range_km,
            Some(angles.azimuth_deg),
            angles.elevation_deg,
        )
    }

    fn pass_search(&self) -> PassSearch {
        self.search
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use crate::Altitude;

    fn san_diego() -> Observer {
        Observer::new(32.6833, -117.2080, Altitude::Meters(150.0)).unwrap()
    }

    fn iss() -> Target {
        Target::Satellite(Satellite::from_tle(ISS_NAME, ISS_LINE1, ISS_LINE2).unwrap())
    }

    fn iss_epoch() -> DateTime<Utc> {
        match iss() {
            Target::Satellite(sat) => sat.epoch,
            Target::Sun => unreachable!(),
        }
    }

    #[test]
    fn test_iss_sample_is_physical() {
        let provider = EphemerisProvider::new();
        let sample = provider
            .sample(&iss(), &san_diego(), iss_epoch() + Duration::hours(1))
            .unwrap();

        // Never closer than its altitude, never farther than the far side of the orbit
        assert!(sample.slant_range_km > 350.0 && sample.slant_range_km < 13_500.0);
        assert!((-90.0..=90.0).contains(&sample.elevation_deg));
        let az = sample.azimuth_deg.unwrap();
        assert!((0.0..360.0).contains(&az));
    }

    #[test]
    fn test_stale_element_set_is_undefined() {
        let provider = EphemerisProvider::new();
        let err = provider
            .sample(&iss(), &san_diego(), iss_epoch() + Duration::days(45))
            .unwrap_err();
        assert!(matches!(err, GeometryError::Undefined { .. }));

        let lenient = EphemerisProvider::new().with_max_epoch_age(Duration::days(60));
        assert!(lenient
            .sample(&iss(), &san_diego(), iss_epoch() + Duration::days(45))
            .is_ok());
    }

    #[test]
    fn test_iss_next_pass() {
        let provider = EphemerisProvider::new();
        let after = iss_epoch();
        let window = provider.next_pass(&iss(), &san_diego(), after).unwrap();

        assert!(window.aos_time > after);
        assert!(window.aos_time < window.peak_time);
        assert!(window.peak_time < window.los_time);
        assert!(window.peak_elevation_deg > 0.0);
        // LEO passes last minutes, not hours
        assert!(window.duration() < Duration::minutes(20));

        let at_peak = provider.sample(&iss(), &san_diego(), window.peak_time).unwrap();
        let at_aos = provider.sample(&iss(), &san_diego(), window.aos_time).unwrap();
        assert!(at_peak.elevation_deg > at_aos.elevation_deg);
        assert!(at_peak.slant_range_km < at_aos.slant_range_km);
    }

    #[test]
    fn test_sun_pass_is_a_day() {
        let provider = EphemerisProvider::new();
        let window = provider
            .next_pass(&Target::Sun, &san_diego(), iss_epoch())
            .unwrap();
        let hours = window.duration().num_minutes() as f64 / 60.0;
        // Mid-summer day length at 32.7° N
        assert!(hours > 13.5 && hours < 14.8, "day length {hours} h");
        assert!(window.peak_elevation_deg > 75.0);
    }

    #[test]
    fn test_provider_by_reference() {
        fn elevation(p: impl GeometryProvider, t: DateTime<Utc>) -> f64 {
            p.sample(&Target::Sun, &san_diego(), t).unwrap().elevation_deg
        }
        let provider = EphemerisProvider::new();
        let t = iss_epoch();
        assert_eq!(elevation(&provider, t), elevation(provider.clone(), t));
    }
}
