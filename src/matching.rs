/// Thresholds and tolerances of the matching stages
pub mod options;

/// Nearest-in-time lookups used by the as-of style joins
pub(crate) mod nearest;

/// Observer clock skew correction
pub mod skew;

/// Disambiguation of crossings that share the same time
pub mod uncertain;

/// Minimum cost bipartite matching (Hungarian algorithm)
pub mod assignment;

/// Repair pass for the nearest-crossing strategy
pub mod duplicates;

/// Reordering of simultaneous matches by their relative position
pub mod relative_position;

/// Per site sequencing of the stages
pub mod orchestrator;
