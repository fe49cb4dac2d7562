use crate::matching::nearest::nearest_within;
use crate::model::crossing::Crossing;
use crate::model::matched::{Match, MatchedCrossing};
use crate::model::observation::Observation;
use crate::model::Direction;
use crate::Timestamp;
use chrono::Duration;
use itertools::Itertools;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

/// Crossings of one direction sorted by time, for nearest lookups
///
struct DirectionIndex<'a> {
    times: Vec<Timestamp>,
    crossings: Vec<&'a Crossing>,
}

impl<'a> DirectionIndex<'a> {
    fn new<I>(direction: Direction, crossings: I) -> Self
    where
        I: IntoIterator<Item = &'a Crossing>,
    {
        let (times, crossings) = crossings
            .into_iter()
            .filter(|c| c.direction == direction)
            .filter_map(|c| c.crossing_time.map(|t| (t, c)))
            .sorted_by_key(|(t, c)| (*t, c.id))
            .unzip();
        Self { times, crossings }
    }

    fn nearest(&self, target: &Timestamp, tolerance: Duration) -> Option<MatchedCrossing> {
        nearest_within(&self.times, target, tolerance)
            .and_then(|i| MatchedCrossing::from_crossing(self.crossings[i]))
    }
}

fn nearest_join<'a, I>(
    crossings: I,
    observation: &Observation,
    tolerance: Duration,
    index: &mut HashMap<Direction, DirectionIndex<'a>>,
) -> Option<MatchedCrossing>
where
    I: IntoIterator<Item = &'a Crossing>,
{
    index
        .entry(observation.direction)
        .or_insert_with(|| DirectionIndex::new(observation.direction, crossings))
        .nearest(&observation.observation_time, tolerance)
}

/// Matches every observation to the nearest crossing of the same direction within
/// `tolerance`. Several observations may end up with the same crossing.
///
pub fn match_nearest(
    observations: &[Observation],
    crossings: &[Crossing],
    tolerance: Duration,
) -> Vec<Match> {
    let mut index = HashMap::new();
    observations
        .iter()
        .map(|o| Match {
            observation: o.clone(),
            crossing: nearest_join(crossings, o, tolerance, &mut index),
        })
        .collect()
}

/// Outcome of the duplicate resolution
///
#[derive(Debug, Clone)]
pub struct DuplicateResolution {
    pub matches: Vec<Match>,
    pub iterations: usize,
    /// Rows still sharing a trajectory with another row
    pub residual_duplicates: usize,
}

fn duplicated_ids(rows: &[Match]) -> HashSet<u64> {
    rows.iter()
        .filter_map(|r| r.trajectory_id())
        .counts()
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(id, _)| id)
        .collect()
}

fn duplicated_rows(rows: &[Match]) -> usize {
    let ids = duplicated_ids(rows);
    rows.iter()
        .filter(|r| r.trajectory_id().map(|id| ids.contains(&id)).unwrap_or(false))
        .count()
}

fn distance(row: &Match) -> Option<Duration> {
    row.crossing
        .as_ref()
        .map(|c| (row.observation.observation_time - c.crossing_time).abs())
}

/// Repairs the many-to-one matches produced by [`match_nearest`].
///
/// Among the rows sharing a trajectory only the closest ones keep it; the others
/// are matched again to the nearest crossing, within `tolerance`, that no row
/// uses. This repeats while the number of duplicated rows decreases. Rows that
/// remain duplicated (equally close observations) are kept.
///
pub fn resolve_duplicates(
    rows: Vec<Match>,
    crossings: &[Crossing],
    tolerance: Duration,
) -> DuplicateResolution {
    let mut rows = rows;
    let mut duplicates = duplicated_rows(&rows);
    let mut iterations = 0;

    while duplicates > 0 {
        iterations += 1;

        let ids = duplicated_ids(&rows);
        let closest = rows
            .iter()
            .filter_map(|r| match (r.trajectory_id(), distance(r)) {
                (Some(id), Some(d)) if ids.contains(&id) => Some((id, d)),
                _ => None,
            })
            .into_grouping_map()
            .min();

        let used = rows
            .iter()
            .filter_map(|r| r.trajectory_id())
            .collect::<HashSet<_>>();

        let mut stripped = Vec::new();
        for (i, row) in rows.iter_mut().enumerate() {
            if let (Some(id), Some(d)) = (row.trajectory_id(), distance(row)) {
                if closest.get(&id).map(|m| d > *m).unwrap_or(false) {
                    row.crossing = None;
                    stripped.push(i);
                }
            }
        }

        let available = crossings
            .iter()
            .filter(|c| !used.contains(&c.id))
            .collect::<Vec<_>>();
        let mut index = HashMap::new();
        for i in stripped {
            let crossing = nearest_join(
                available.iter().copied(),
                &rows[i].observation,
                tolerance,
                &mut index,
            );
            rows[i].crossing = crossing;
        }

        let remaining = duplicated_rows(&rows);
        debug!(
            "Duplicate resolution pass {}: {} -> {} duplicated rows",
            iterations, duplicates, remaining
        );
        if remaining >= duplicates {
            break;
        }
        duplicates = remaining;
    }

    let residual_duplicates = duplicated_rows(&rows);
    if residual_duplicates > 0 {
        warn!(
            "{} rows still share their trajectory with another row after {} passes",
            residual_duplicates, iterations
        );
    }

    DuplicateResolution {
        matches: rows,
        iterations,
        residual_duplicates,
    }
}
