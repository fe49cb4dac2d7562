use crate::model::matched::Match;
use crate::model::{Direction, RelativePosition};
use chrono::Duration;
use itertools::Itertools;

/// Swaps the crossings of observations noted close together so that the user
/// marked `Front` gets the crossing nearest to the path edge.
///
/// Rows with a relative position are split by direction and bucketed into
/// `window`-long slots counted from the first of them. In every slot the
/// observations are sorted Front first and the crossings by lateral offset, both
/// stably, and then zipped back together. A row with no crossing or no offset
/// sorts at `placeholders.0` when it was Front and `placeholders.1` when it was Back.
///
pub fn reorder_by_relative_position(rows: &mut [Match], window: Duration, placeholders: (f64, f64)) {
    let window_ms = window.num_milliseconds().max(1);

    for direction in Direction::ALL {
        let members = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.observation.direction == direction && r.observation.relative_position.is_some()
            })
            .sorted_by_key(|(i, r)| (r.observation.observation_time, *i))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        let Some(first) = members.first() else {
            continue;
        };
        let anchor = rows[*first].observation.observation_time;

        let buckets = members
            .iter()
            .map(|i| {
                let elapsed = rows[*i].observation.observation_time - anchor;
                (elapsed.num_milliseconds() / window_ms, *i)
            })
            .into_group_map();

        for slot in buckets.into_values().filter(|s| s.len() > 1) {
            let observations = slot
                .iter()
                .map(|i| rows[*i].observation.clone())
                .sorted_by_key(|o| o.relative_position)
                .collect::<Vec<_>>();

            let crossings = slot
                .iter()
                .map(|i| {
                    let row = &rows[*i];
                    let key = row
                        .crossing
                        .as_ref()
                        .and_then(|c| c.lateral_offset)
                        .unwrap_or(match row.observation.relative_position {
                            Some(RelativePosition::Back) => placeholders.1,
                            _ => placeholders.0,
                        });
                    (key, row.crossing.clone())
                })
                .sorted_by(|l, r| l.0.total_cmp(&r.0))
                .map(|(_, c)| c)
                .collect::<Vec<_>>();

            for ((i, observation), crossing) in slot.iter().zip(observations).zip(crossings) {
                rows[*i] = Match {
                    observation,
                    crossing,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::matching::relative_position::reorder_by_relative_position;
    use crate::model::matched::{Match, MatchedCrossing};
    use crate::model::{Direction, RelativePosition};
    use crate::test_stuff::{at, observation_at_position};
    use crate::Timestamp;
    use chrono::Duration;

    fn row(
        time: Timestamp,
        direction: Direction,
        position: Option<RelativePosition>,
        crossing: Option<(u64, Option<f64>)>,
    ) -> Match {
        Match {
            observation: observation_at_position(time, direction, position),
            crossing: crossing.map(|(id, lateral_offset)| MatchedCrossing {
                id,
                crossing_time: time,
                lateral_offset,
            }),
        }
    }

    fn summary(rows: &[Match]) -> Vec<(Option<RelativePosition>, Option<u64>)> {
        rows.iter()
            .map(|r| (r.observation.relative_position, r.trajectory_id()))
            .collect()
    }

    const PLACEHOLDERS: (f64, f64) = (0.6, 1.6);

    #[test]
    fn front_gets_the_inner_crossing() {
        let mut rows = vec![
            row(at(1, 7, 0, 0, 100), Direction::Northbound, Some(RelativePosition::Back), Some((1, Some(0.5)))),
            row(at(1, 7, 0, 0, 300), Direction::Northbound, Some(RelativePosition::Front), Some((2, Some(1.9)))),
        ];
        reorder_by_relative_position(&mut rows, Duration::seconds(1), PLACEHOLDERS);
        assert_eq!(
            summary(&rows),
            vec![
                (Some(RelativePosition::Front), Some(1)),
                (Some(RelativePosition::Back), Some(2))
            ]
        );
        // observation times move with the observations
        assert_eq!(rows[0].observation.observation_time, at(1, 7, 0, 0, 300));
    }

    #[test]
    fn placeholders() {
        let mut rows = vec![
            row(at(1, 7, 0, 0, 100), Direction::Northbound, Some(RelativePosition::Back), None),
            row(at(1, 7, 0, 0, 200), Direction::Northbound, Some(RelativePosition::Front), Some((2, Some(2.0)))),
        ];
        reorder_by_relative_position(&mut rows, Duration::seconds(1), PLACEHOLDERS);
        assert_eq!(
            summary(&rows),
            vec![
                (Some(RelativePosition::Front), None),
                (Some(RelativePosition::Back), Some(2))
            ]
        );

        // the placeholder is never written to the crossing
        let mut rows = vec![
            row(at(1, 7, 0, 0, 100), Direction::Northbound, Some(RelativePosition::Back), Some((1, None))),
            row(at(1, 7, 0, 0, 200), Direction::Northbound, Some(RelativePosition::Front), Some((2, Some(1.0)))),
        ];
        reorder_by_relative_position(&mut rows, Duration::seconds(1), PLACEHOLDERS);
        assert_eq!(
            summary(&rows),
            vec![
                (Some(RelativePosition::Front), Some(2)),
                (Some(RelativePosition::Back), Some(1))
            ]
        );
        assert_eq!(rows[1].crossing.as_ref().unwrap().lateral_offset, None);
    }

    #[test]
    fn separate_windows_and_directions() {
        let mut rows = vec![
            row(at(1, 7, 0, 0, 100), Direction::Northbound, Some(RelativePosition::Back), Some((1, Some(0.5)))),
            row(at(1, 7, 0, 1, 200), Direction::Northbound, Some(RelativePosition::Front), Some((2, Some(1.9)))),
            row(at(1, 7, 0, 0, 150), Direction::Southbound, Some(RelativePosition::Front), Some((3, Some(1.9)))),
            row(at(1, 7, 0, 0, 200), Direction::Northbound, None, Some((4, Some(0.1)))),
        ];
        let before = rows.clone();
        reorder_by_relative_position(&mut rows, Duration::seconds(1), PLACEHOLDERS);
        assert_eq!(rows, before);
    }
}
