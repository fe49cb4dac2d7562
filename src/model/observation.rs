use crate::model::period::Period;
use crate::model::{Direction, PrimaryType, RelativePosition, SecondaryType};
use crate::Timestamp;
use itertools::Itertools;

/// Manually logged sighting of a road user.
///
/// `observation_time` is taken from the observer's clock and is the only field
/// changed after cleaning (by skew correction).
///
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub observation_time: Timestamp,
    pub direction: Direction,
    pub primary_type: PrimaryType,
    pub secondary_type: Option<SecondaryType>,
    /// Comment tokens left after the known ones were turned into flags
    pub comments: String,
    pub rental: bool,
    pub uncertain: bool,
    pub relative_position: Option<RelativePosition>,
    pub carrying: bool,
}

const DIRECTION_TOKENS: [&str; 2] = ["N", "S"];
const RENTAL_TOKENS: [&str; 2] = ["Rental", "Private"];
const UNCERTAIN_TOKENS: [&str; 1] = ["U"];
const POSITION_TOKENS: [&str; 2] = ["Front", "Back"];
const CARRYING_TOKENS: [&str; 4] = ["Carrying", "bag", "bags", "tyres"];

/// Builder turning an observer's log line into an [Observation](Observation)
///
pub struct ObservationBuilder {
    observation_time: Timestamp,
    direction: Direction,
    primary_type: PrimaryType,
    secondary_type: Option<SecondaryType>,
    tokens: Vec<String>,
}

impl ObservationBuilder {
    pub fn new(observation_time: Timestamp, direction: Direction, primary_type: PrimaryType) -> Self {
        Self {
            observation_time,
            direction,
            primary_type,
            secondary_type: None,
            tokens: Vec::new(),
        }
    }

    pub fn secondary_type(mut self, secondary_type: SecondaryType) -> Self {
        self.secondary_type = Some(secondary_type);
        self
    }

    /// Free-text comment, split on whitespace. May be called several times.
    ///
    pub fn comment(mut self, comment: &str) -> Self {
        self.tokens
            .extend(comment.split_whitespace().map(str::to_string));
        self
    }

    fn has(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    pub fn build(self) -> Observation {
        let rental = match self.primary_type {
            PrimaryType::Electric => self.has("Rental"),
            PrimaryType::Scooter => !self.has("Private"),
            _ => false,
        };
        let uncertain = self.has("U");
        let relative_position = if self.has("Front") {
            Some(RelativePosition::Front)
        } else if self.has("Back") {
            Some(RelativePosition::Back)
        } else {
            None
        };
        let carrying = self.has("Carrying");

        let consumed = DIRECTION_TOKENS
            .iter()
            .chain(&RENTAL_TOKENS)
            .chain(&UNCERTAIN_TOKENS)
            .chain(&POSITION_TOKENS)
            .chain(&CARRYING_TOKENS)
            .copied()
            .collect::<Vec<_>>();

        let comments = self
            .tokens
            .iter()
            .filter(|t| !consumed.contains(&t.as_str()))
            .unique()
            .join(" ");

        Observation {
            observation_time: self.observation_time,
            direction: self.direction,
            primary_type: self.primary_type,
            secondary_type: self.secondary_type,
            comments,
            rental,
            uncertain,
            relative_position,
            carrying,
        }
    }
}

/// Time-ordered collection of cleaned observations
///
#[derive(Debug, Clone, Default)]
pub struct ObservationStore {
    observations: Vec<Observation>,
}

impl ObservationStore {
    pub fn new(mut observations: Vec<Observation>) -> Self {
        sort_by_time(&mut observations);
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Observations falling into any of the periods, time-ordered
    ///
    pub fn in_periods(&self, periods: &[Period], include_pedestrians: bool) -> Vec<Observation> {
        self.observations
            .iter()
            .filter(|o| include_pedestrians || o.primary_type != PrimaryType::Pedestrian)
            .filter(|o| periods.iter().any(|p| p.contains(&o.observation_time)))
            .cloned()
            .collect()
    }
}

pub(crate) fn sort_by_time(observations: &mut [Observation]) {
    observations.sort_by(|l, r| l.observation_time.cmp(&r.observation_time));
}

#[cfg(test)]
mod tests {
    use crate::model::observation::{ObservationBuilder, ObservationStore};
    use crate::model::period::Period;
    use crate::model::{Direction, PrimaryType, RelativePosition, SecondaryType};
    use crate::test_stuff::at;

    #[test]
    fn comment_flags() {
        let o = ObservationBuilder::new(at(1, 7, 0, 0, 0), Direction::Northbound, PrimaryType::Electric)
            .secondary_type(SecondaryType::Pedal)
            .comment("Rental Front U helmet")
            .comment("Carrying bags helmet")
            .build();
        assert!(o.rental);
        assert!(o.uncertain);
        assert!(o.carrying);
        assert_eq!(o.relative_position, Some(RelativePosition::Front));
        assert_eq!(o.secondary_type, Some(SecondaryType::Pedal));
        assert_eq!(o.comments, "helmet");
    }

    #[test]
    fn scooter_rental_by_default() {
        let rented =
            ObservationBuilder::new(at(1, 7, 0, 0, 0), Direction::Southbound, PrimaryType::Scooter)
                .comment("S Back")
                .build();
        assert!(rented.rental);
        assert_eq!(rented.relative_position, Some(RelativePosition::Back));
        assert_eq!(rented.comments, "");

        let private =
            ObservationBuilder::new(at(1, 7, 0, 0, 0), Direction::Southbound, PrimaryType::Scooter)
                .comment("Private")
                .build();
        assert!(!private.rental);

        let regular =
            ObservationBuilder::new(at(1, 7, 0, 0, 0), Direction::Southbound, PrimaryType::Regular)
                .comment("Rental")
                .build();
        assert!(!regular.rental);
        assert_eq!(regular.relative_position, None);
    }

    #[test]
    fn store_filters_periods_and_pedestrians() {
        let mk = |h, p| {
            ObservationBuilder::new(at(1, h, 30, 0, 0), Direction::Northbound, p).build()
        };
        let store = ObservationStore::new(vec![
            mk(16, PrimaryType::Regular),
            mk(7, PrimaryType::Regular),
            mk(7, PrimaryType::Pedestrian),
            mk(10, PrimaryType::Regular),
        ]);
        assert_eq!(store.observations()[0].observation_time, at(1, 7, 30, 0, 0));

        let periods = [Period::new(at(1, 6, 45, 0, 0), at(1, 9, 7, 30, 0))];
        assert_eq!(store.in_periods(&periods, false).len(), 1);
        assert_eq!(store.in_periods(&periods, true).len(), 2);
    }
}
