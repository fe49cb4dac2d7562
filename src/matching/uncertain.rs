use crate::matching::nearest::latest_at_or_before;
use crate::model::crossing::Crossing;
use crate::model::observation::Observation;
use crate::model::{Direction, RelativePosition};
use crate::Timestamp;
use chrono::Duration;
use itertools::Itertools;
use log::{debug, warn};
use std::collections::HashSet;

/// Crossing sharing its time with another one, labelled by its lateral offset
///
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledCrossing {
    pub crossing: Crossing,
    pub relative_position: RelativePosition,
}

/// Result of the simultaneous crossings disambiguation
///
#[derive(Debug, Clone, Default)]
pub struct UncertainOutcome {
    /// Index of the observation and the crossing it was matched to
    pub matched: Vec<(usize, Crossing)>,
    /// Labelled crossings no observation could be found for
    pub unmatched: Vec<LabeledCrossing>,
    /// Crossings of groups with three or more members; they are not labelled
    pub unsupported: Vec<Crossing>,
}

impl UncertainOutcome {
    pub fn matched_ids(&self) -> HashSet<u64> {
        self.matched.iter().map(|(_, c)| c.id).collect()
    }

    pub fn matched_observations(&self) -> HashSet<usize> {
        self.matched.iter().map(|(o, _)| *o).collect()
    }
}

/// Labels the members of a simultaneous crossing group: the one farthest from
/// the east edge is at the back, the other in front.
///
/// Only pairs are supported, larger groups return `None`.
///
pub fn label_group(group: &[Crossing]) -> Option<Vec<LabeledCrossing>> {
    if group.len() != 2 {
        return None;
    }
    let max_offset = group
        .iter()
        .filter_map(|c| c.lateral_offset)
        .max_by(|l, r| l.total_cmp(r));

    Some(
        group
            .iter()
            .map(|c| LabeledCrossing {
                crossing: c.clone(),
                relative_position: if max_offset.is_some() && c.lateral_offset == max_offset {
                    RelativePosition::Back
                } else {
                    RelativePosition::Front
                },
            })
            .collect(),
    )
}

/// Matches crossings that happen at exactly the same time, which time alone cannot
/// tell apart, using the relative position the observer noted.
///
/// A labelled crossing takes the latest observation at or before its time, no older
/// than `tolerance`, with the same direction and relative position. Every
/// observation is used at most once.
///
/// # Parameters
/// * `crossings` - crossings of the site; those without a time are ignored;
/// * `observations` - observations sorted by time;
/// * `tolerance` - maximal age of the observation.
///
pub fn match_uncertain(
    crossings: &[Crossing],
    observations: &[Observation],
    tolerance: Duration,
) -> UncertainOutcome {
    let mut outcome = UncertainOutcome::default();

    let groups = crossings
        .iter()
        .filter_map(|c| c.crossing_time.map(|t| ((c.direction, t), c.clone())))
        .into_group_map();

    let mut labeled = Vec::new();
    for ((direction, time), group) in groups.into_iter().filter(|(_, g)| g.len() > 1) {
        match label_group(&group) {
            Some(members) => labeled.extend(members),
            None => {
                warn!(
                    "{} {} crossings share the time {}, relative positions cannot be assigned",
                    group.len(),
                    direction,
                    time
                );
                outcome.unsupported.extend(group);
            }
        }
    }
    labeled.sort_by(|l, r| {
        l.crossing
            .crossing_time
            .cmp(&r.crossing.crossing_time)
            .then_with(|| l.relative_position.cmp(&r.relative_position))
            .then_with(|| l.crossing.id.cmp(&r.crossing.id))
    });
    outcome.unsupported.sort_by_key(|c| (c.crossing_time, c.id));

    let times = observations
        .iter()
        .map(|o| o.observation_time)
        .collect::<Vec<Timestamp>>();
    let mut used = HashSet::new();

    for l in labeled {
        let direction: Direction = l.crossing.direction;
        let found = l.crossing.crossing_time.and_then(|t| {
            latest_at_or_before(&times, &t, tolerance, |i| {
                !used.contains(&i)
                    && observations[i].direction == direction
                    && observations[i].relative_position == Some(l.relative_position)
            })
        });
        match found {
            Some(i) => {
                used.insert(i);
                outcome.matched.push((i, l.crossing));
            }
            None => outcome.unmatched.push(l),
        }
    }

    debug!(
        "Simultaneous crossings: {} matched, {} unmatched, {} unsupported",
        outcome.matched.len(),
        outcome.unmatched.len(),
        outcome.unsupported.len()
    );
    outcome
}
