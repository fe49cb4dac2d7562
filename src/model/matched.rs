use crate::model::crossing::Crossing;
use crate::model::observation::Observation;
use crate::model::{Direction, Location};
use crate::{Errors, Timestamp};
use anyhow::Result;
use std::collections::HashMap;

/// Trajectory data attached to a matched observation
///
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedCrossing {
    pub id: u64,
    pub crossing_time: Timestamp,
    pub lateral_offset: Option<f64>,
}

impl MatchedCrossing {
    /// `None` when the crossing has no time and cannot be matched
    ///
    pub fn from_crossing(c: &Crossing) -> Option<Self> {
        c.crossing_time.map(|crossing_time| Self {
            id: c.id,
            crossing_time,
            lateral_offset: c.lateral_offset,
        })
    }
}

/// One observation with the trajectory it was matched to, if any
///
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub observation: Observation,
    pub crossing: Option<MatchedCrossing>,
}

impl Match {
    pub fn unmatched(observation: Observation) -> Self {
        Self {
            observation,
            crossing: None,
        }
    }

    pub fn trajectory_id(&self) -> Option<u64> {
        self.crossing.as_ref().map(|c| c.id)
    }

    /// Absolute observation-to-crossing distance in milliseconds
    ///
    pub fn time_distance_ms(&self) -> Option<i64> {
        self.crossing.as_ref().map(|c| {
            (self.observation.observation_time - c.crossing_time)
                .num_milliseconds()
                .abs()
        })
    }
}

/// Row of the final matches table
///
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub location: Location,
    pub matched: Match,
}

impl MatchRecord {
    pub fn trajectory_id(&self) -> Option<u64> {
        self.matched.trajectory_id()
    }
}

/// Attaches matched observations to trajectory rows, keyed by location, id and
/// direction. Every trajectory row is kept; rows of an unmatched trajectory get
/// `None`. Two matches sharing a key are rejected with [`Errors::DuplicateMatch`].
///
pub fn join_matches<'a, T, F>(
    rows: &'a [T],
    key: F,
    matches: &'a [MatchRecord],
) -> Result<Vec<(&'a T, Option<&'a MatchRecord>)>>
where
    F: Fn(&T) -> (Location, u64, Direction),
{
    let mut index = HashMap::new();
    for m in matches {
        let Some(id) = m.trajectory_id() else {
            continue;
        };
        let direction = m.matched.observation.direction;
        if index.insert((m.location, id, direction), m).is_some() {
            return Err(Errors::DuplicateMatch {
                location: m.location,
                id,
                direction,
            }
            .into());
        }
    }

    Ok(rows.iter().map(|r| (r, index.get(&key(r)).copied())).collect())
}
