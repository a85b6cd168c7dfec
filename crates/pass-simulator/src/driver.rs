//! Simulation driver
//!
//! Produces geometry samples (by clock or by elevation), runs each through
//! the link budget and appends the result. Ticks are strictly ordered and
//! never skipped: the first failure ends the run.

use crate::{Result, SimulationError};
use chrono::{DateTime, Duration, Utc};
use link_budget::{evaluate, LinkBudgetError, LinkBudgetResult, RfParameters};
use orbital_mechanics::{
    GeometryError, GeometryProvider, Observer, PassWindow, SampleKey, SlantRangeModel, Target,
    DEFAULT_SWEEP_DEG,
};
use serde::Serialize;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Default time-stepped cadence
pub const DEFAULT_CADENCE_SECS: i64 = 1;

/// Ordered results of a finished (or aborted) run
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct ResultSequence(Vec<LinkBudgetResult>);

impl ResultSequence {
    pub fn keys(&self) -> impl Iterator<Item = SampleKey> + '_ {
        self.0.iter().map(|r| r.key)
    }
}

impl Deref for ResultSequence {
    type Target = [LinkBudgetResult];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> IntoIterator for &'a ResultSequence {
    type Item = &'a LinkBudgetResult;
    type IntoIter = std::slice::Iter<'a, LinkBudgetResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Why a single tick failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TickError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    LinkBudget(#[from] LinkBudgetError),
}

/// A run that stopped at a failing tick
#[derive(Error, Debug)]
#[error("Run aborted at tick {index} ({key}): {cause}")]
pub struct RunFailure {
    pub index: usize,
    pub key: SampleKey,
    #[source]
    pub cause: TickError,
    /// Everything computed before the failing tick
    pub partial: ResultSequence,
}

/// Shared flag for stopping a long run between ticks
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Inclusive `[start, end]`
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(SimulationError::InvalidWindow(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub results: ResultSequence,
    /// True when stopped early through the cancel token
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassOutcome {
    pub window: PassWindow,
    /// Budget at the predicted culmination
    pub predicted: LinkBudgetResult,
    pub run: RunOutcome,
}

/// One observer tracking one target with fixed RF parameters
#[derive(Debug)]
pub struct SimulationRun {
    observer: Observer,
    target: Target,
    params: RfParameters,
    cadence: Duration,
    cancel: CancelToken,
    results: Vec<LinkBudgetResult>,
}

impl SimulationRun {
    pub fn new(observer: Observer, target: Target, params: RfParameters) -> Result<Self> {
        params.validate()?;

        Ok(Self {
            observer,
            target,
            params,
            cadence: Duration::seconds(DEFAULT_CADENCE_SECS),
            cancel: CancelToken::new(),
            results: Vec::new(),
        })
    }

    pub fn with_cadence(mut self, cadence: Duration) -> Result<Self> {
        if cadence <= Duration::zero() {
            return Err(SimulationError::InvalidWindow(format!(
                "cadence must be positive, got {} ms",
                cadence.num_milliseconds()
            )));
        }
        self.cadence = cadence;
        Ok(self)
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Sample every cadence tick from `start` through `end`.
    ///
    /// Both endpoints are always sampled: when the cadence does not divide
    /// the window the final tick is clamped to `end`.
    pub fn run_time_stepped<P>(mut self, provider: &P, window: TimeWindow) -> Result<RunOutcome>
    where
        P: GeometryProvider + ?Sized,
    {
        info!(
            "Time-stepped run: {} from {} to {} every {} ms",
            self.target.name(),
            window.start,
            window.end,
            self.cadence.num_milliseconds()
        );

        let mut cancelled = false;
        let mut time = window.start;

        loop {
            if self.cancel.is_cancelled() {
                info!("Run cancelled after {} ticks", self.results.len());
                cancelled = true;
                break;
            }

            let index = self.results.len();
            match self.evaluate_at(provider, time) {
                Ok(result) => {
                    trace!("tick {} at {}: margin {:.2} dB", index, time, result.link_margin_db);
                    self.results.push(result);
                }
                Err(cause) => return Err(self.abort(index, SampleKey::Time(time), cause)),
            }

            if time >= window.end {
                break;
            }
            // A step past the representable range still lands on `end`
            time = time
                .checked_add_signed(self.cadence)
                .map_or(window.end, |next| next.min(window.end));
        }

        info!("Run complete: {} results", self.results.len());
        Ok(RunOutcome {
            results: ResultSequence(self.results),
            cancelled,
        })
    }

    /// Predict the next pass after `after`, then step through it
    pub fn run_pass<P>(self, provider: &P, after: DateTime<Utc>) -> Result<PassOutcome>
    where
        P: GeometryProvider + ?Sized,
    {
        let window = provider.next_pass(&self.target, &self.observer, after)?;
        info!(
            "Next pass of {}: AOS {} peak {} ({:.1}°) LOS {}",
            self.target.name(),
            window.aos_time,
            window.peak_time,
            window.peak_elevation_deg,
            window.los_time
        );

        // Fresh geometry at the culmination time, not whatever was current
        // when the prediction was requested
        let predicted = match self.evaluate_at(provider, window.peak_time) {
            Ok(result) => result,
            Err(cause) => {
                let mut run = self;
                return Err(run.abort(0, SampleKey::Time(window.peak_time), cause));
            }
        };
        debug!("Predicted margin at peak: {:.2} dB", predicted.link_margin_db);

        let run = self.run_time_stepped(provider, TimeWindow::new(window.aos_time, window.los_time)?)?;

        Ok(PassOutcome {
            window,
            predicted,
            run,
        })
    }

    fn evaluate_at<P>(
        &self,
        provider: &P,
        time: DateTime<Utc>,
    ) -> std::result::Result<LinkBudgetResult, TickError>
    where
        P: GeometryProvider + ?Sized,
    {
        let sample = provider.sample(&self.target, &self.observer, time)?;
        Ok(evaluate(&sample, &self.params)?)
    }

    fn abort(&mut self, index: usize, key: SampleKey, cause: TickError) -> SimulationError {
        warn!("Run aborted at tick {} ({}): {}", index, key, cause);
        SimulationError::RunAborted(Box::new(RunFailure {
            index,
            key,
            cause,
            partial: ResultSequence(std::mem::take(&mut self.results)),
        }))
    }
}

/// Discrete elevation sweep over the analytic slant-range model
#[derive(Debug, Clone)]
pub struct AngleSweep {
    model: SlantRangeModel,
    angles_deg: Vec<f64>,
}

impl AngleSweep {
    pub fn new(altitude_km: f64, angles_deg: impl Into<Vec<f64>>) -> Result<Self> {
        let angles_deg = angles_deg.into();
        if angles_deg.is_empty() {
            return Err(SimulationError::InvalidWindow(
                "elevation sweep needs at least one angle".to_string(),
            ));
        }

        Ok(Self {
            model: SlantRangeModel::new(altitude_km)?,
            angles_deg,
        })
    }

    /// 90°, 60°, 30°, 10°, 0°
    pub fn standard(altitude_km: f64) -> Result<Self> {
        Self::new(altitude_km, DEFAULT_SWEEP_DEG)
    }

    pub fn altitude_km(&self) -> f64 {
        self.model.altitude_km()
    }

    /// One result per angle, in the order given
    pub fn run(&self, params: &RfParameters) -> Result<ResultSequence> {
        params.validate()?;
        info!(
            "Elevation sweep at {} km over {:?}",
            self.model.altitude_km(),
            self.angles_deg
        );

        let mut results = Vec::with_capacity(self.angles_deg.len());
        for (index, &angle) in self.angles_deg.iter().enumerate() {
            let result = self
                .model
                .sample(angle)
                .map_err(TickError::from)
                .and_then(|sample| evaluate(&sample, params).map_err(TickError::from));

            match result {
                Ok(result) => results.push(result),
                Err(cause) => {
                    warn!("Sweep aborted at {}°: {}", angle, cause);
                    return Err(SimulationError::RunAborted(Box::new(RunFailure {
                        index,
                        key: SampleKey::Elevation(angle),
                        cause,
                        partial: ResultSequence(results),
                    })));
                }
            }
        }

        Ok(ResultSequence(results))
    }
}
