//! Run configuration loaded from JSON

use crate::driver::{AngleSweep, TimeWindow};
use crate::{Result, SimulationError};
use chrono::{DateTime, Duration, Utc};
use link_budget::RfParameters;
use orbital_mechanics::{
    Altitude, EphemerisProvider, Observer, PassSearch, Satellite, Target,
    DEFAULT_MAX_EPOCH_AGE_DAYS, DEFAULT_SWEEP_DEG,
};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

fn default_cadence_secs() -> f64 {
    crate::DEFAULT_CADENCE_SECS as f64
}

fn default_sweep() -> Vec<f64> {
    DEFAULT_SWEEP_DEG.to_vec()
}

fn default_max_epoch_age_days() -> i64 {
    DEFAULT_MAX_EPOCH_AGE_DAYS
}

fn default_coarse_step_secs() -> i64 {
    20
}

fn default_search_span_hours() -> i64 {
    72
}

/// Whole-second or fractional cadence to a chrono duration
pub fn cadence_from_secs(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(SimulationError::Config(format!(
            "cadence_secs must be positive, got {secs}"
        )));
    }
    let millis = (secs * 1000.0).round().max(1.0);
    if millis >= i64::MAX as f64 {
        return Err(out_of_range("cadence_secs", secs));
    }
    Duration::try_milliseconds(millis as i64).ok_or_else(|| out_of_range("cadence_secs", secs))
}

fn out_of_range(name: &str, value: impl std::fmt::Display) -> SimulationError {
    SimulationError::Config(format!("{name} = {value} is outside the representable time range"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub observer: ObserverConfig,
    /// Not needed by the elevation sweep
    #[serde(default)]
    pub target: Option<TargetConfig>,
    pub rf: RfParameters,
    pub mode: ModeConfig,
    #[serde(default)]
    pub propagation: PropagationConfig,
}

/// Station location; give exactly one of `altitude_m` / `altitude_km`
#[derive(Debug, Clone, Deserialize)]
pub struct ObserverConfig {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub altitude_m: Option<f64>,
    #[serde(default)]
    pub altitude_km: Option<f64>,
}

impl ObserverConfig {
    pub fn to_observer(&self) -> Result<Observer> {
        let altitude = match (self.altitude_m, self.altitude_km) {
            (Some(m), None) => Altitude::Meters(m),
            (None, Some(km)) => Altitude::Kilometers(km),
            (None, None) => {
                return Err(SimulationError::Config(
                    "observer needs altitude_m or altitude_km".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(SimulationError::Config(
                    "observer altitude given in both meters and kilometers".to_string(),
                ))
            }
        };
        Ok(Observer::new(self.latitude_deg, self.longitude_deg, altitude)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetConfig {
    Satellite {
        name: String,
        line1: String,
        line2: String,
    },
    Sun,
}

impl TargetConfig {
    pub fn to_target(&self) -> Result<Target> {
        match self {
            TargetConfig::Satellite { name, line1, line2 } => Ok(Target::Satellite(
                Satellite::from_tle(name.trim(), line1.trim(), line2.trim())?,
            )),
            TargetConfig::Sun => Ok(Target::Sun),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ModeConfig {
    TimeStepped {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        #[serde(default = "default_cadence_secs")]
        cadence_secs: f64,
    },
    Pass {
        /// Search start; current time when absent
        #[serde(default)]
        after: Option<DateTime<Utc>>,
        #[serde(default = "default_cadence_secs")]
        cadence_secs: f64,
    },
    AngleSweep {
        altitude_km: f64,
        #[serde(default = "default_sweep")]
        angles_deg: Vec<f64>,
    },
}

impl ModeConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ModeConfig::TimeStepped { .. } => "time_stepped",
            ModeConfig::Pass { .. } => "pass",
            ModeConfig::AngleSweep { .. } => "angle_sweep",
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            ModeConfig::TimeStepped {
                start,
                end,
                cadence_secs,
            } => {
                TimeWindow::new(*start, *end)?;
                cadence_from_secs(*cadence_secs)?;
            }
            ModeConfig::Pass { cadence_secs, .. } => {
                cadence_from_secs(*cadence_secs)?;
            }
            ModeConfig::AngleSweep {
                altitude_km,
                angles_deg,
            } => {
                AngleSweep::new(*altitude_km, angles_deg.clone())?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropagationConfig {
    #[serde(default = "default_max_epoch_age_days")]
    pub max_epoch_age_days: i64,
    #[serde(default = "default_coarse_step_secs")]
    pub coarse_step_secs: i64,
    #[serde(default = "default_search_span_hours")]
    pub search_span_hours: i64,
    #[serde(default)]
    pub horizon_deg: f64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            max_epoch_age_days: default_max_epoch_age_days(),
            coarse_step_secs: default_coarse_step_secs(),
            search_span_hours: default_search_span_hours(),
            horizon_deg: 0.0,
        }
    }
}

impl PropagationConfig {
    pub fn provider(&self) -> Result<EphemerisProvider> {
        if self.max_epoch_age_days <= 0 {
            return Err(SimulationError::Config(format!(
                "max_epoch_age_days must be positive, got {}",
                self.max_epoch_age_days
            )));
        }
        if self.coarse_step_secs <= 0 || self.search_span_hours <= 0 {
            return Err(SimulationError::Config(
                "pass search step and span must be positive".to_string(),
            ));
        }
        if !(-90.0..90.0).contains(&self.horizon_deg) {
            return Err(SimulationError::Config(format!(
                "horizon_deg out of range: {}",
                self.horizon_deg
            )));
        }

        let coarse_step = Duration::try_seconds(self.coarse_step_secs)
            .ok_or_else(|| out_of_range("coarse_step_secs", self.coarse_step_secs))?;
        let search_span = Duration::try_hours(self.search_span_hours)
            .ok_or_else(|| out_of_range("search_span_hours", self.search_span_hours))?;
        let max_epoch_age = Duration::try_days(self.max_epoch_age_days)
            .ok_or_else(|| out_of_range("max_epoch_age_days", self.max_epoch_age_days))?;

        let search = PassSearch::default()
            .coarse_step(coarse_step)
            .search_span(search_span)
            .horizon_deg(self.horizon_deg);

        Ok(EphemerisProvider::new()
            .with_max_epoch_age(max_epoch_age)
            .with_pass_search(search))
    }
}

impl RunConfig {
    /// Target for the time-driven modes
    pub fn target(&self) -> Result<Target> {
        match &self.target {
            Some(target) => target.to_target(),
            None => Err(SimulationError::Config(format!(
                "{} mode needs a target",
                self.mode.name()
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.rf.validate()?;
        self.observer.to_observer()?;
        self.propagation.provider()?;
        self.mode.validate()?;
        if !matches!(self.mode, ModeConfig::AngleSweep { .. }) {
            self.target()?;
        }
        Ok(())
    }
}

/// Load and validate a run configuration
pub fn load_run_config(path: impl AsRef<Path>) -> Result<RunConfig> {
    let path = path.as_ref();
    info!("Loading run configuration from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let config: RunConfig = serde_json::from_reader(reader)?;
    config.validate()?;

    info!("Loaded {} run", config.mode.name());
    Ok(config)
}
