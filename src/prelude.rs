pub use crate::crossing_times::{calculate_crossing_times, crossing_table, LinePlan, SiteTrajectories};
pub use crate::geometry::{line_intersection_index, ReferenceLine};
pub use crate::matching::assignment::{assign, AssignmentMatcher};
pub use crate::matching::duplicates::{match_nearest, resolve_duplicates, DuplicateResolution};
pub use crate::matching::options::{MatchingOptions, SkewOptions};
pub use crate::matching::orchestrator::{MatchOrchestrator, MatchStrategy, SiteDay, SiteOutcome};
pub use crate::matching::relative_position::reorder_by_relative_position;
pub use crate::matching::skew::{
    CalibrationKey, CorrectionMode, SamplePair, SkewAdjustment, SkewCalibration, SkewCorrector,
};
pub use crate::matching::uncertain::{match_uncertain, LabeledCrossing, UncertainOutcome};
pub use crate::model::crossing::{Crossing, CrossingRecord, TrajectoryPoint};
pub use crate::model::matched::{join_matches, Match, MatchRecord, MatchedCrossing};
pub use crate::model::observation::{Observation, ObservationBuilder, ObservationStore};
pub use crate::model::period::{Period, PeriodName};
pub use crate::model::{Direction, Location, PrimaryType, RelativePosition, SecondaryType};
pub use crate::{Errors, Timestamp};
