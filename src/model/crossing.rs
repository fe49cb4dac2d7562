use crate::model::{Direction, Location};
use crate::Timestamp;
use geo::Coord;

/// One tracked point of a trajectory
///
#[derive(Debug, Clone)]
pub struct TrajectoryPoint {
    pub id: u64,
    pub time: Timestamp,
    pub direction: Direction,
    pub x: f64,
    pub y: f64,
    /// Distance to the right edge of the path
    pub dist_right: Option<f64>,
    /// Distance to the left edge of the path
    pub dist_left: Option<f64>,
}

impl TrajectoryPoint {
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }

    /// Distance to the east side of the path.
    ///
    /// Southbound users have the east side on their left, so the polarity flips
    /// and "east" means the same thing for both directions.
    ///
    pub fn dist_east(&self) -> Option<f64> {
        match self.direction {
            Direction::Southbound => self.dist_left,
            Direction::Northbound => self.dist_right,
        }
    }
}

/// The moment and place a trajectory passes the reference line of its site.
///
/// A trajectory that never intersects the line keeps `crossing_time == None`
/// and takes no part in matching.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Crossing {
    pub id: u64,
    pub direction: Direction,
    pub crossing_time: Option<Timestamp>,
    /// Signed distance from the east side of the path ("dist_east")
    pub lateral_offset: Option<f64>,
}

impl Crossing {
    pub fn new(
        id: u64,
        direction: Direction,
        crossing_time: Option<Timestamp>,
        lateral_offset: Option<f64>,
    ) -> Self {
        Self {
            id,
            direction,
            crossing_time,
            lateral_offset,
        }
    }
}

/// Row of the crossing-times table
///
#[derive(Debug, Clone, PartialEq)]
pub struct CrossingRecord {
    pub location: Location,
    pub crossing: Crossing,
}
