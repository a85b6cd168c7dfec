//! Pass prediction
//!
//! Finds the next visibility window (AOS, peak, LOS) of a target by scanning
//! elevation on a coarse grid, bisecting the horizon crossings and refining
//! the culmination with a golden-section search.

use crate::{GeometryError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single visibility window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PassWindow {
    pub aos_time: DateTime<Utc>,
    pub peak_time: DateTime<Utc>,
    pub los_time: DateTime<Utc>,
    pub peak_elevation_deg: f64,
}

impl PassWindow {
    pub fn duration(&self) -> Duration {
        self.los_time - self.aos_time
    }
}

/// Search bounds and resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassSearch {
    /// Scan step; passes shorter than this can be missed
    pub coarse_step: Duration,
    /// How far past `after` to look before giving up
    pub search_span: Duration,
    /// Elevation that counts as "in view"
    pub horizon_deg: f64,
    /// Resolution of AOS/LOS/peak times
    pub tolerance: Duration,
}

impl Default for PassSearch {
    fn default() -> Self {
        Self {
            coarse_step: Duration::seconds(20),
            search_span: Duration::days(3),
            horizon_deg: 0.0,
            tolerance: Duration::milliseconds(1),
        }
    }
}

impl PassSearch {
    pub fn coarse_step(mut self, step: Duration) -> Self {
        self.coarse_step = step;
        self
    }

    pub fn search_span(mut self, span: Duration) -> Self {
        self.search_span = span;
        self
    }

    pub fn horizon_deg(mut self, horizon: f64) -> Self {
        self.horizon_deg = horizon;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.coarse_step <= Duration::zero()
            || self.search_span <= Duration::zero()
            || self.tolerance <= Duration::zero()
        {
            return Err(GeometryError::InvalidParameter(
                "pass search step, span and tolerance must be positive".to_string(),
            ));
        }
        if !self.horizon_deg.is_finite() || !(-90.0..90.0).contains(&self.horizon_deg) {
            return Err(GeometryError::InvalidParameter(format!(
                "horizon {}° outside [-90, 90)",
                self.horizon_deg
            )));
        }
        Ok(())
    }
}

/// Next window strictly after `after` for an elevation function.
///
/// A pass already in progress at `after` is skipped.
pub fn find_next_pass<F>(
    mut elevation_at: F,
    after: DateTime<Utc>,
    search: &PassSearch,
) -> Result<PassWindow>
where
    F: FnMut(DateTime<Utc>) -> Result<f64>,
{
    search.validate()?;

    let horizon = search.horizon_deg;
    let deadline = after.checked_add_signed(search.search_span).ok_or_else(|| {
        GeometryError::InvalidParameter(format!(
            "search span of {} days from {} is past the representable time range",
            search.search_span.num_days(),
            after
        ))
    })?;

    let mut prev_t = after;
    let mut prev_el = elevation_at(after)?;
    let mut aos: Option<DateTime<Utc>> = None;

    while prev_t < deadline {
        let t = prev_t
            .checked_add_signed(search.coarse_step)
            .map_or(deadline, |t| t.min(deadline));
        let el = elevation_at(t)?;

        match aos {
            None if prev_el < horizon && el >= horizon => {
                aos = Some(bisect(&mut elevation_at, prev_t, t, horizon, search.tolerance)?.1);
            }
            Some(rise) if el < horizon => {
                let set = bisect(&mut elevation_at, prev_t, t, horizon, search.tolerance)?.0;

                // Grazing passes shorter than a few ticks have no interior peak
                if set - rise > search.tolerance * 2 {
                    let window = refine_peak(&mut elevation_at, rise, set, search.tolerance)?;
                    debug!(
                        "Pass found: AOS {} peak {} ({:.1}°) LOS {}",
                        window.aos_time, window.peak_time, window.peak_elevation_deg, window.los_time
                    );
                    return Ok(window);
                }
                aos = None;
            }
            _ => {}
        }

        prev_t = t;
        prev_el = el;
    }

    Err(GeometryError::NoPassFound {
        after,
        searched_hours: search.search_span.num_seconds() as f64 / 3600.0,
    })
}

/// Narrow a horizon crossing in `[lo, hi]` to `tolerance`.
///
/// Returns the bracket `(lo, hi)` where exactly one side is in view.
fn bisect<F>(
    elevation_at: &mut F,
    mut lo: DateTime<Utc>,
    mut hi: DateTime<Utc>,
    horizon: f64,
    tolerance: Duration,
) -> Result<(DateTime<Utc>, DateTime<Utc>)>
where
    F: FnMut(DateTime<Utc>) -> Result<f64>,
{
    let lo_visible = elevation_at(lo)? >= horizon;

    while hi - lo > tolerance {
        let mid = lo + (hi - lo) / 2;
        if (elevation_at(mid)? >= horizon) == lo_visible {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Ok((lo, hi))
}

/// Golden-section search for the culmination between AOS and LOS
fn refine_peak<F>(
    elevation_at: &mut F,
    aos: DateTime<Utc>,
    los: DateTime<Utc>,
    tolerance: Duration,
) -> Result<PassWindow>
where
    F: FnMut(DateTime<Utc>) -> Result<f64>,
{
    const INV_PHI: f64 = 0.618_033_988_749_895;

    let at = |offset_ms: f64| aos + Duration::milliseconds(offset_ms.round() as i64);
    let tol_ms = tolerance.num_milliseconds().max(1) as f64;

    let mut a = 0.0;
    let mut b = (los - aos).num_milliseconds() as f64;
    let mut c = b - (b - a) * INV_PHI;
    let mut d = a + (b - a) * INV_PHI;
    let mut fc = elevation_at(at(c))?;
    let mut fd = elevation_at(at(d))?;

    while b - a > tol_ms {
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - (b - a) * INV_PHI;
            fc = elevation_at(at(c))?;
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + (b - a) * INV_PHI;
            fd = elevation_at(at(d))?;
        }
    }

    // Keep the peak strictly inside the window
    let peak_time = at((a + b) / 2.0)
        .max(aos + tolerance)
        .min(los - tolerance);

    Ok(PassWindow {
        aos_time: aos,
        peak_time,
        los_time: los,
        peak_elevation_deg: elevation_at(peak_time)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 26, 0, 0, 0).unwrap()
    }

    /// Bump of `peak` degrees centred on `centre`, `half_width` seconds to the horizon
    fn bump(
        centre: DateTime<Utc>,
        half_width: f64,
        peak: f64,
    ) -> impl FnMut(DateTime<Utc>) -> Result<f64> {
        move |t| {
            let x = (t - centre).num_milliseconds() as f64 / 1000.0 / half_width;
            Ok(peak * (1.0 - x * x) - 5.0 * x.abs().min(4.0))
        }
    }

    #[test]
    fn test_finds_window_after_start() {
        let centre = t0() + Duration::minutes(30);
        let window = find_next_pass(bump(centre, 300.0, 40.0), t0(), &PassSearch::default()).unwrap();

        assert!(window.aos_time > t0());
        assert!(window.aos_time < window.peak_time);
        assert!(window.peak_time < window.los_time);
        assert!((window.peak_time - centre).num_milliseconds().abs() <= 5);
        assert!((window.peak_elevation_deg - 40.0).abs() < 1e-3);
        // Horizon crossing of 40(1 - x²) - 5|x| = 0 is at |x| ≈ 0.9393
        let half = (window.duration().num_milliseconds() as f64 / 2000.0) / 300.0;
        assert!((half - 0.9393).abs() < 1e-3, "half {half}");
    }

    #[test]
    fn test_skips_pass_in_progress() {
        let centre = t0();
        let mut calls = 0;
        let result = find_next_pass(
            |t| {
                calls += 1;
                bump(centre, 300.0, 40.0)(t)
            },
            t0(),
            &PassSearch::default().search_span(Duration::hours(1)),
        );
        assert!(matches!(result, Err(GeometryError::NoPassFound { .. })));
        assert!(calls > 0);
    }

    #[test]
    fn test_no_pass_for_target_below_horizon() {
        let err = find_next_pass(|_| Ok(-10.0), t0(), &PassSearch::default()).unwrap_err();
        match err {
            GeometryError::NoPassFound { after, searched_hours } => {
                assert_eq!(after, t0());
                assert!((searched_hours - 72.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_no_pass_for_target_always_up() {
        let result = find_next_pass(|_| Ok(45.0), t0(), &PassSearch::default());
        assert!(matches!(result, Err(GeometryError::NoPassFound { .. })));
    }

    #[test]
    fn test_custom_horizon_mask() {
        let centre = t0() + Duration::hours(2);
        let search = PassSearch::default().horizon_deg(10.0);
        let masked = find_next_pass(bump(centre, 300.0, 40.0), t0(), &search).unwrap();
        let open = find_next_pass(bump(centre, 300.0, 40.0), t0(), &PassSearch::default()).unwrap();
        assert!(masked.duration() < open.duration());
        assert!(masked.aos_time > open.aos_time);
    }

    #[test]
    fn test_elevation_errors_propagate() {
        let err = find_next_pass(
            |t| {
                Err(GeometryError::Undefined {
                    at: crate::SampleKey::Time(t),
                    reason: "stale".to_string(),
                })
            },
            t0(),
            &PassSearch::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GeometryError::Undefined { .. }));
    }

    #[test]
    fn test_invalid_search_rejected() {
        let search = PassSearch::default().coarse_step(Duration::zero());
        assert!(matches!(
            find_next_pass(|_| Ok(0.0), t0(), &search),
            Err(GeometryError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_span_past_time_range_rejected() {
        let search = PassSearch::default().search_span(Duration::days(1_000_000_000));
        let mut calls = 0;
        let result = find_next_pass(
            |_| {
                calls += 1;
                Ok(-10.0)
            },
            t0(),
            &search,
        );
        assert!(matches!(result, Err(GeometryError::InvalidParameter(_))));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_oversized_step_stops_at_deadline() {
        let search = PassSearch::default().coarse_step(Duration::days(1_000_000_000));
        let err = find_next_pass(|_| Ok(-10.0), t0(), &search).unwrap_err();
        assert!(matches!(err, GeometryError::NoPassFound { .. }));
    }
}
