use crate::{Errors, Timestamp};
use chrono::{Datelike, Duration, Timelike};

/// Name of the recording session, derived from its start hour
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodName {
    /// Morning peak
    Am,
    /// Between the peaks
    OffPeak,
    /// Afternoon peak
    Pm,
}

/// Time window of one recording session. Both ends are inclusive.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Period {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        assert!(start <= end, "Period must not end before it starts");
        Self { start, end }
    }

    pub fn contains(&self, t: &Timestamp) -> bool {
        self.start <= *t && *t <= self.end
    }

    /// Membership test with the end of the window extended by `slack`
    ///
    pub fn contains_with_slack(&self, t: &Timestamp, slack: Duration) -> bool {
        self.start <= *t && *t <= self.end + slack
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Day of month the session was recorded on
    pub fn day(&self) -> u32 {
        self.start.day()
    }

    pub fn start_hour(&self) -> u32 {
        self.start.hour()
    }

    pub fn name(&self) -> anyhow::Result<PeriodName> {
        match self.start_hour() {
            6 => Ok(PeriodName::Am),
            11 | 12 => Ok(PeriodName::OffPeak),
            16 => Ok(PeriodName::Pm),
            h => Err(Errors::UnknownPeriodStart(h).into()),
        }
    }
}

/// Index of the first period containing `t`
///
pub fn period_of(periods: &[Period], t: &Timestamp) -> Option<usize> {
    periods.iter().position(|p| p.contains(t))
}

#[cfg(test)]
mod tests {
    use crate::model::period::{period_of, Period, PeriodName};
    use crate::test_stuff::at;
    use chrono::Duration;

    #[test]
    fn inclusive_bounds() {
        let p = Period::new(at(1, 16, 0, 0, 0), at(1, 18, 20, 0, 0));
        assert!(p.contains(&at(1, 16, 0, 0, 0)));
        assert!(p.contains(&at(1, 18, 20, 0, 0)));
        assert!(!p.contains(&at(1, 18, 20, 0, 1)));
        assert!(p.contains_with_slack(&at(1, 18, 20, 1, 0), Duration::seconds(2)));
        assert!(!p.contains_with_slack(&at(1, 18, 20, 3, 0), Duration::seconds(2)));
        assert_eq!(p.duration(), Duration::minutes(140));
    }

    #[test]
    fn names() {
        let am = Period::new(at(2, 6, 46, 0, 0), at(2, 9, 5, 0, 0));
        let op = Period::new(at(1, 11, 0, 0, 0), at(1, 12, 0, 0, 0));
        let odd = Period::new(at(1, 14, 0, 0, 0), at(1, 15, 0, 0, 0));
        assert_eq!(am.name().unwrap(), PeriodName::Am);
        assert_eq!(op.name().unwrap(), PeriodName::OffPeak);
        assert!(odd.name().is_err());
        assert_eq!(am.day(), 2);
    }

    #[test]
    fn lookup() {
        let periods = [
            Period::new(at(1, 6, 45, 0, 0), at(1, 9, 7, 30, 0)),
            Period::new(at(1, 11, 0, 0, 0), at(1, 12, 0, 0, 0)),
        ];
        assert_eq!(period_of(&periods, &at(1, 11, 30, 0, 0)), Some(1));
        assert_eq!(period_of(&periods, &at(1, 10, 0, 0, 0)), None);
    }
}
