use crate::model::crossing::Crossing;
use crate::model::observation::Observation;
use crate::model::period::Period;
use crate::model::Direction;
use crate::Timestamp;
use chrono::Duration;
use itertools::Itertools;
use log::debug;
use pathfinding::kuhn_munkres::kuhn_munkres_min;
use pathfinding::matrix::Matrix;
use rayon::prelude::*;

/// Minimum cost one-to-one assignment of observation times to crossing times.
///
/// An observation and a crossing may only be paired when the observation lies in
/// `[crossing - threshold, crossing + threshold]`; the cost of the pair is their
/// distance in milliseconds. The solution has the largest possible number of pairs
/// and, among those, the smallest total distance.
///
/// Returns `(observation index, crossing index)` pairs ordered by observation.
///
pub fn assign(
    observations: &[Timestamp],
    crossings: &[Timestamp],
    threshold: Duration,
) -> Vec<(usize, usize)> {
    if observations.is_empty() || crossings.is_empty() {
        return Vec::default();
    }

    // the solver wants rows <= columns
    let transposed = crossings.len() > observations.len();
    let (rows, columns) = if transposed {
        (observations, crossings)
    } else {
        (crossings, observations)
    };

    let threshold_ms = threshold.num_milliseconds();
    let sentinel = threshold_ms * rows.len() as i64 + 1;

    let mut weights = Matrix::new(rows.len(), columns.len(), sentinel);
    for (r, row) in rows.iter().enumerate() {
        for (c, column) in columns.iter().enumerate() {
            let diff = *row - *column;
            if diff.abs() <= threshold {
                weights[(r, c)] = diff.num_milliseconds().abs();
            }
        }
    }

    let (_, solution) = kuhn_munkres_min(&weights);

    solution
        .into_iter()
        .enumerate()
        .filter(|(r, c)| weights[(*r, *c)] != sentinel)
        .map(|(r, c)| if transposed { (r, c) } else { (c, r) })
        .sorted()
        .collect()
}

/// Runs the assignment separately for every period and direction.
///
#[derive(Debug, Clone)]
pub struct AssignmentMatcher {
    threshold: Duration,
}

impl AssignmentMatcher {
    pub fn new(threshold: Duration) -> Self {
        assert!(threshold > Duration::zero(), "Threshold must be positive");
        Self { threshold }
    }

    /// Matches observations to crossings within each `(period, direction)` window.
    ///
    /// Window membership is inclusive and takes no slack. Observations and crossings
    /// outside every window stay unmatched.
    ///
    /// Returns `(observation index, crossing index)` pairs into the given slices.
    ///
    pub fn match_periods(
        &self,
        observations: &[Observation],
        crossings: &[Crossing],
        periods: &[Period],
    ) -> Vec<(usize, usize)> {
        let windows = periods
            .iter()
            .cartesian_product(Direction::ALL)
            .collect::<Vec<_>>();

        windows
            .into_par_iter()
            .flat_map(|(period, direction)| {
                let obs = observations
                    .iter()
                    .enumerate()
                    .filter(|(_, o)| {
                        o.direction == direction && period.contains(&o.observation_time)
                    })
                    .map(|(i, o)| (i, o.observation_time))
                    .collect::<Vec<_>>();

                let crs = crossings
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.direction == direction)
                    .filter_map(|(i, c)| {
                        c.crossing_time
                            .filter(|t| period.contains(t))
                            .map(|t| (i, t))
                    })
                    .collect::<Vec<_>>();

                let obs_times = obs.iter().map(|(_, t)| *t).collect::<Vec<_>>();
                let crs_times = crs.iter().map(|(_, t)| *t).collect::<Vec<_>>();
                let pairs = assign(&obs_times, &crs_times, self.threshold);

                debug!(
                    "Period {} - {} {}: {} observations, {} crossings, {} pairs",
                    period.start,
                    period.end,
                    direction,
                    obs.len(),
                    crs.len(),
                    pairs.len()
                );

                pairs
                    .into_iter()
                    .map(|(o, c)| (obs[o].0, crs[c].0))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .into_iter()
            .sorted()
            .collect()
    }
}
