//! Ground Station Pass Simulator
//!
//! Drives the link budget over time or geometry:
//!
//! | Mode | Geometry source | Result key |
//! |------|-----------------|------------|
//! | Time-stepped | `GeometryProvider::sample` every cadence tick | UTC time |
//! | Pass prediction | `next_pass`, then time-stepped over AOS..LOS | UTC time |
//! | Angle sweep | spherical-earth slant range per elevation | elevation |
//!
//! Every mode produces an ordered, append-only [`ResultSequence`] that is
//! frozen once the run returns. A failing tick aborts the run; the error
//! carries the tick index and the partial sequence.

use link_budget::LinkBudgetError;
use orbital_mechanics::GeometryError;
use thiserror::Error;

pub mod config;
pub mod driver;
pub mod report;

pub use config::{load_run_config, ModeConfig, RunConfig};
pub use driver::{
    AngleSweep, CancelToken, PassOutcome, ResultSequence, RunFailure, RunOutcome, SimulationRun,
    TickError, TimeWindow, DEFAULT_CADENCE_SECS,
};
pub use report::{Cell, Report, ReportAssembler, Row, Section};

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
    #[error("Link budget error: {0}")]
    LinkBudget(#[from] LinkBudgetError),
    #[error("Invalid window: {0}")]
    InvalidWindow(String),
    #[error("{0}")]
    RunAborted(Box<RunFailure>),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimulationError {
    /// Results computed before an aborted run failed
    pub fn partial(&self) -> Option<&ResultSequence> {
        match self {
            SimulationError::RunAborted(failure) => Some(&failure.partial),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
