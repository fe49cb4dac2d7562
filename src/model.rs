use crate::Errors;
use std::fmt;
use std::str::FromStr;

/// Tracked trajectories split by reference line
pub mod crossing;

/// Manual observations and the store keeping them
pub mod observation;

/// Recording periods
pub mod period;

/// Matching results
pub mod matched;

/// Travel direction of a road user along the path
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Northbound,
    Southbound,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Northbound, Direction::Southbound];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Northbound => "Northbound",
            Direction::Southbound => "Southbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Errors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Northbound" | "N" | "NB" => Ok(Direction::Northbound),
            "Southbound" | "S" | "SB" => Ok(Direction::Southbound),
            other => Err(Errors::UnknownCategory {
                kind: "direction",
                label: other.to_string(),
            }),
        }
    }
}

/// Position of a road user relative to another one crossing at the same time.
///
/// The order matters: `Front < Back`, the user at the back rides farther from the
/// path edge.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelativePosition {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryType {
    Regular,
    Electric,
    Cargo,
    Folding,
    Moped,
    Scooter,
    Other,
    Pedestrian,
    Race,
}

impl FromStr for PrimaryType {
    type Err = Errors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Regular" => PrimaryType::Regular,
            "Electric" => PrimaryType::Electric,
            "Cargo" => PrimaryType::Cargo,
            "Folding" => PrimaryType::Folding,
            "Moped" => PrimaryType::Moped,
            "Scooter" => PrimaryType::Scooter,
            "Other" => PrimaryType::Other,
            "Pedestrian" => PrimaryType::Pedestrian,
            "Race" => PrimaryType::Race,
            other => {
                return Err(Errors::UnknownCategory {
                    kind: "primary type",
                    label: other.to_string(),
                })
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecondaryType {
    Pedal,
    Electric,
    WomensBicycle,
}

impl SecondaryType {
    /// Lenient parsing, the observer leaves the secondary type empty or free-form
    ///
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pedal" => Some(SecondaryType::Pedal),
            "Electric" => Some(SecondaryType::Electric),
            "Women's bicycle" => Some(SecondaryType::WomensBicycle),
            _ => None,
        }
    }
}

/// Recording sites
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    Riddarhuskajen,
    RiddarholmsbronN,
    RiddarholmsbronS,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Riddarhuskajen => "Riddarhuskajen",
            Location::RiddarholmsbronN => "Riddarholmsbron_n",
            Location::RiddarholmsbronS => "Riddarholmsbron_s",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
