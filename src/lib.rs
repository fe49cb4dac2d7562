use chrono::{DateTime, FixedOffset};
use thiserror::Error;

use crate::model::{Direction, Location};

/// Domain types shared by every matching stage
pub mod model;

/// Reference line geometry
pub mod geometry;

/// Reference line crossing detection for tracked trajectories
pub mod crossing_times;

/// Observation to trajectory matching stages and the orchestrator sequencing them
pub mod matching;

/// Constants of the recorded study: periods, lines, calibration data
pub mod study;

/// Synthetic inputs for tests, benchmarks and demos
pub mod test_stuff;

pub mod prelude;

/// Wall-clock instant with the recording site offset
pub type Timestamp = DateTime<FixedOffset>;

#[derive(Error, Debug, Clone)]
pub enum Errors {
    #[error("Skewness samples are inconsistent for the period starting at {period_start} ({direction}): {observations} observations vs {crossings} crossings.")]
    SampleCountMismatch {
        period_start: Timestamp,
        direction: Direction,
        observations: usize,
        crossings: usize,
    },
    #[error("No reference line is defined for {0}.")]
    UnsupportedSite(Location),
    #[error("Day {0} is not part of the study.")]
    UnsupportedDay(u32),
    #[error("Periods starting at {0}h are not recognised.")]
    UnknownPeriodStart(u32),
    #[error("Unknown {kind} label: {label}.")]
    UnknownCategory { kind: &'static str, label: String },
    #[error("Trajectory {id} at {location} ({direction}) is matched to more than one observation.")]
    DuplicateMatch {
        location: Location,
        id: u64,
        direction: Direction,
    },
    #[error("Calibration entry cannot be parsed: {0}.")]
    InvalidCalibration(String),
}
