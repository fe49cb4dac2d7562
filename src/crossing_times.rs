use crate::geometry::{line_intersection_index, ReferenceLine};
use crate::model::crossing::{Crossing, CrossingRecord, TrajectoryPoint};
use crate::model::period::Period;
use crate::model::{Direction, Location};
use crate::Timestamp;
use anyhow::Result;
use itertools::Itertools;
use log::debug;
use rayon::prelude::*;

/// Selects which reference line a trajectory is tested against
///
#[derive(Debug, Clone)]
pub enum LinePlan {
    /// Every trajectory of the site crosses the same line
    Single(ReferenceLine),
    /// Northbound trajectories, and every trajectory recorded during one of the
    /// `northbound_periods`, use the northbound line; the rest use the southbound one
    SplitByDirection {
        northbound: ReferenceLine,
        southbound: ReferenceLine,
        northbound_periods: Vec<Period>,
    },
}

impl LinePlan {
    pub fn select(&self, direction: Direction, time: &Timestamp) -> &ReferenceLine {
        match self {
            LinePlan::Single(line) => line,
            LinePlan::SplitByDirection {
                northbound,
                southbound,
                northbound_periods,
            } => {
                if direction == Direction::Northbound
                    || northbound_periods.iter().any(|p| p.contains(time))
                {
                    northbound
                } else {
                    southbound
                }
            }
        }
    }
}

/// Trajectory points of one site
///
#[derive(Debug, Clone)]
pub struct SiteTrajectories {
    pub location: Location,
    pub points: Vec<TrajectoryPoint>,
}

fn trajectory_crossing(id: u64, mut points: Vec<&TrajectoryPoint>, plan: &LinePlan) -> Crossing {
    points.sort_by(|l, r| l.time.cmp(&r.time));
    // grouping never yields an empty trajectory
    let first = points[0];
    let line = plan.select(first.direction, &first.time);

    let coords = points.iter().map(|p| p.coord()).collect::<Vec<_>>();
    match line_intersection_index(&coords, line) {
        Some(i) => Crossing::new(
            id,
            first.direction,
            Some(points[i].time),
            points[i].dist_east(),
        ),
        None => Crossing::new(id, first.direction, None, None),
    }
}

/// Calculates the crossing of every trajectory in `points`.
///
/// The crossing time is the time of the point right before the intersection (it
/// is not interpolated). Trajectories that never intersect their line get a row
/// with empty time and offset.
///
/// The result is sorted by crossing time (rows without a time first) and ID.
///
pub fn calculate_crossing_times(points: &[TrajectoryPoint], plan: &LinePlan) -> Vec<Crossing> {
    let trajectories = points.iter().map(|p| (p.id, p)).into_group_map();

    let mut crossings = trajectories
        .into_par_iter()
        .map(|(id, points)| trajectory_crossing(id, points, plan))
        .collect::<Vec<_>>();

    crossings.sort_by(|l, r| {
        l.crossing_time
            .cmp(&r.crossing_time)
            .then_with(|| l.id.cmp(&r.id))
    });

    debug!(
        "Crossings found for {} of {} trajectories",
        crossings.iter().filter(|c| c.crossing_time.is_some()).count(),
        crossings.len()
    );
    crossings
}

/// Builds the crossing-times table for several sites.
///
/// `plan_for` provides the line plan of a site and fails for sites without one.
/// The table is sorted by location, crossing time and ID.
///
pub fn crossing_table<F>(sites: &[SiteTrajectories], plan_for: F) -> Result<Vec<CrossingRecord>>
where
    F: Fn(Location) -> Result<LinePlan>,
{
    let mut table = Vec::new();
    for site in sites {
        let plan = plan_for(site.location)?;
        table.extend(
            calculate_crossing_times(&site.points, &plan)
                .into_iter()
                .map(|crossing| CrossingRecord {
                    location: site.location,
                    crossing,
                }),
        );
    }
    table.sort_by(|l, r| {
        l.location
            .cmp(&r.location)
            .then_with(|| l.crossing.crossing_time.cmp(&r.crossing.crossing_time))
            .then_with(|| l.crossing.id.cmp(&r.crossing.id))
    });
    Ok(table)
}

#[cfg(test)]
mod tests {
    use crate::crossing_times::{calculate_crossing_times, crossing_table, LinePlan, SiteTrajectories};
    use crate::geometry::ReferenceLine;
    use crate::model::crossing::TrajectoryPoint;
    use crate::model::period::Period;
    use crate::model::{Direction, Location};
    use crate::test_stuff::at;
    use crate::Errors;

    fn point(id: u64, sec: u32, direction: Direction, x: f64) -> TrajectoryPoint {
        TrajectoryPoint {
            id,
            time: at(1, 7, 0, sec, 0),
            direction,
            x,
            y: 0.0,
            dist_right: Some(x + 10.0),
            dist_left: Some(-x),
        }
    }

    fn vertical_line(x: f64) -> ReferenceLine {
        ReferenceLine::new((x, -5.0), (x, 5.0))
    }

    #[test]
    fn crossing_time_and_offset() {
        let points = vec![
            // shuffled on purpose, the points are ordered by time internally
            point(1, 2, Direction::Northbound, 1.0),
            point(1, 0, Direction::Northbound, -1.0),
            point(1, 1, Direction::Northbound, -0.5),
            point(2, 5, Direction::Southbound, 2.0),
            point(2, 6, Direction::Southbound, 0.5),
            point(2, 7, Direction::Southbound, -1.0),
            point(3, 3, Direction::Northbound, 5.0),
            point(3, 4, Direction::Northbound, 6.0),
        ];
        let crossings = calculate_crossing_times(&points, &LinePlan::Single(vertical_line(0.0)));
        assert_eq!(crossings.len(), 3);

        // no crossing comes first
        assert_eq!(crossings[0].id, 3);
        assert_eq!(crossings[0].crossing_time, None);
        assert_eq!(crossings[0].lateral_offset, None);

        assert_eq!(crossings[1].id, 1);
        assert_eq!(crossings[1].crossing_time, Some(at(1, 7, 0, 1, 0)));
        assert_eq!(crossings[1].lateral_offset, Some(9.5));

        assert_eq!(crossings[2].id, 2);
        assert_eq!(crossings[2].direction, Direction::Southbound);
        assert_eq!(crossings[2].crossing_time, Some(at(1, 7, 0, 6, 0)));
        assert_eq!(crossings[2].lateral_offset, Some(-0.5));
    }

    #[test]
    fn split_plan() {
        let plan = LinePlan::SplitByDirection {
            northbound: vertical_line(0.0),
            southbound: vertical_line(3.0),
            northbound_periods: vec![Period::new(at(1, 11, 0, 0, 0), at(1, 12, 0, 0, 0))],
        };
        assert_eq!(
            plan.select(Direction::Southbound, &at(1, 7, 0, 0, 0)),
            &vertical_line(3.0)
        );
        assert_eq!(
            plan.select(Direction::Southbound, &at(1, 11, 10, 0, 0)),
            &vertical_line(0.0)
        );
        assert_eq!(
            plan.select(Direction::Northbound, &at(1, 7, 0, 0, 0)),
            &vertical_line(0.0)
        );

        let points = vec![
            point(7, 0, Direction::Southbound, 4.0),
            point(7, 1, Direction::Southbound, 2.0),
            point(7, 2, Direction::Southbound, -1.0),
        ];
        let crossings = calculate_crossing_times(&points, &plan);
        assert_eq!(crossings[0].crossing_time, Some(at(1, 7, 0, 0, 0)));
    }

    #[test]
    fn table_order_and_unsupported_site() {
        let sites = vec![
            SiteTrajectories {
                location: Location::RiddarholmsbronN,
                points: vec![
                    point(1, 0, Direction::Northbound, -1.0),
                    point(1, 1, Direction::Northbound, 1.0),
                ],
            },
            SiteTrajectories {
                location: Location::Riddarhuskajen,
                points: vec![
                    point(9, 3, Direction::Northbound, -1.0),
                    point(9, 4, Direction::Northbound, 1.0),
                    point(4, 3, Direction::Northbound, -1.0),
                    point(4, 4, Direction::Northbound, 1.0),
                ],
            },
        ];
        let table = crossing_table(&sites, |_| Ok(LinePlan::Single(vertical_line(0.0)))).unwrap();
        let keys = table
            .iter()
            .map(|r| (r.location, r.crossing.id))
            .collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![
                (Location::Riddarhuskajen, 4),
                (Location::Riddarhuskajen, 9),
                (Location::RiddarholmsbronN, 1)
            ]
        );

        let res = crossing_table(&sites, |l| Err(Errors::UnsupportedSite(l).into()));
        assert!(res.is_err());
    }
}
