use crate::matching::options::SkewOptions;
use crate::model::crossing::Crossing;
use crate::model::observation::{sort_by_time, Observation};
use crate::model::period::{period_of, Period};
use crate::model::Direction;
use crate::{Errors, Timestamp};
use anyhow::Result;
use chrono::Duration;
use itertools::Itertools;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

/// Identifies a period-direction combination in calibration data: day of month and
/// hour the period starts at.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalibrationKey {
    pub day: u32,
    pub hour: u32,
    pub direction: Direction,
}

impl CalibrationKey {
    pub fn new(day: u32, hour: u32, direction: Direction) -> Self {
        Self {
            day,
            hour,
            direction,
        }
    }

    pub fn of(period: &Period, direction: Direction) -> Self {
        Self::new(period.day(), period.start_hour(), direction)
    }
}

/// Observation and crossing times known to belong to the same road user
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePair {
    pub observation: Timestamp,
    pub crossing: Timestamp,
}

impl SamplePair {
    fn diff(&self) -> Duration {
        self.crossing - self.observation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionMode {
    /// One additive factor for the whole period
    Constant,
    /// Start offset plus a term growing linearly through the period
    LinearDrift,
}

/// Externally curated calibration data.
///
/// * manual sample pairs replace the sampled ones for period-direction
///   combinations whose first or last crossings are known to be wrong;
/// * linear drift keys select the combinations where the observer's clock drifted
///   during the session.
///
#[derive(Debug, Clone, Default)]
pub struct SkewCalibration {
    manual_samples: HashMap<CalibrationKey, Vec<SamplePair>>,
    linear_drift: HashSet<CalibrationKey>,
}

impl SkewCalibration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the manual samples. The first `samples_start` pairs describe the start of
    /// the period, the last `samples_end` pairs its end.
    ///
    pub fn manual_samples(mut self, key: CalibrationKey, pairs: Vec<SamplePair>) -> Self {
        self.manual_samples.insert(key, pairs);
        self
    }

    pub fn linear_drift(mut self, key: CalibrationKey) -> Self {
        self.linear_drift.insert(key);
        self
    }

    pub fn mode(&self, key: &CalibrationKey) -> CorrectionMode {
        if self.linear_drift.contains(key) {
            CorrectionMode::LinearDrift
        } else {
            CorrectionMode::Constant
        }
    }

    pub fn samples(&self, key: &CalibrationKey) -> Option<&[SamplePair]> {
        self.manual_samples
            .get(key)
            .filter(|pairs| !pairs.is_empty())
            .map(Vec::as_slice)
    }
}

/// Correction applied to one period-direction combination
///
#[derive(Debug, Clone, PartialEq)]
pub struct SkewAdjustment {
    pub period: Period,
    pub direction: Direction,
    pub mode: CorrectionMode,
    /// Whether manual samples were used
    pub manual: bool,
    /// Constant factor, or the start offset in the linear drift mode
    pub factor: Duration,
    /// Residual offset at the end of the period (linear drift mode only)
    pub end_offset: Option<Duration>,
    /// Number of observations shifted
    pub corrected: usize,
}

fn micros(d: Duration) -> i64 {
    d.num_microseconds()
        .unwrap_or_else(|| d.num_milliseconds().saturating_mul(1000))
}

fn mean_duration<I>(durations: I) -> Option<Duration>
where
    I: IntoIterator<Item = Duration>,
{
    let (sum, n) = durations
        .into_iter()
        .fold((0i128, 0i128), |(sum, n), d| (sum + micros(d) as i128, n + 1));
    if n == 0 {
        None
    } else {
        Some(Duration::microseconds((sum / n) as i64))
    }
}

fn head_tail<T: Copy>(sorted: &[T], head: usize, tail: usize) -> Vec<T> {
    let mut samples = sorted[..head.min(sorted.len())].to_vec();
    samples.extend_from_slice(&sorted[sorted.len().saturating_sub(tail)..]);
    samples
}

/// Aligns observation times to the crossing clock for every period and direction
///
#[derive(Debug, Clone, Default)]
pub struct SkewCorrector {
    options: SkewOptions,
    calibration: SkewCalibration,
}

impl SkewCorrector {
    pub fn new(options: SkewOptions, calibration: SkewCalibration) -> Self {
        Self {
            options,
            calibration,
        }
    }

    /// Corrects `observations` in place and sorts them by time.
    ///
    /// Period membership is decided before anything is shifted, so every
    /// observation is corrected at most once even when a correction moves it
    /// across a period boundary.
    ///
    /// # Errors
    /// [SampleCountMismatch](Errors::SampleCountMismatch) when the sampled observations
    /// and crossings of a combination cannot be paired.
    ///
    pub fn correct(
        &self,
        observations: &mut [Observation],
        crossings: &[Crossing],
        periods: &[Period],
    ) -> Result<Vec<SkewAdjustment>> {
        let members = observations
            .iter()
            .enumerate()
            .filter_map(|(i, o)| {
                period_of(periods, &o.observation_time).map(|p| ((p, o.direction), i))
            })
            .into_group_map();

        let mut report = Vec::with_capacity(periods.len() * Direction::ALL.len());
        for (period_index, period) in periods.iter().enumerate() {
            for direction in Direction::ALL {
                let members = members
                    .get(&(period_index, direction))
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                let adjustment =
                    self.correct_combination(observations, members, crossings, period, direction)?;
                debug!(
                    "Skew {:?} for {} starting {}: factor {} ms, end offset {:?} ms, {} observations",
                    adjustment.mode,
                    direction,
                    period.start,
                    adjustment.factor.num_milliseconds(),
                    adjustment.end_offset.map(|d| d.num_milliseconds()),
                    adjustment.corrected
                );
                report.push(adjustment);
            }
        }

        sort_by_time(observations);
        Ok(report)
    }

    fn correct_combination(
        &self,
        observations: &mut [Observation],
        members: &[usize],
        crossings: &[Crossing],
        period: &Period,
        direction: Direction,
    ) -> Result<SkewAdjustment> {
        let key = CalibrationKey::of(period, direction);
        let (samples, manual) = match self.calibration.samples(&key) {
            Some(pairs) => (pairs.to_vec(), true),
            None => (
                self.sample(observations, members, crossings, period, direction)?,
                false,
            ),
        };

        let mode = self.calibration.mode(&key);
        let (factor, end_offset) = match mode {
            CorrectionMode::Constant => {
                let factor = self.constant_factor(&samples, period, direction);
                for i in members {
                    observations[*i].observation_time += factor;
                }
                (factor, None)
            }
            CorrectionMode::LinearDrift => {
                let (start, end) = self.linear_factors(&samples);
                let total = micros(period.duration());
                for i in members {
                    let shifted = observations[*i].observation_time + start;
                    let elapsed = micros(shifted - period.start);
                    let fraction = if total == 0 {
                        0.0
                    } else {
                        elapsed as f64 / total as f64
                    };
                    let drift = Duration::microseconds((micros(end) as f64 * fraction).round() as i64);
                    observations[*i].observation_time = shifted + drift;
                }
                (start, Some(end))
            }
        };

        Ok(SkewAdjustment {
            period: *period,
            direction,
            mode,
            manual,
            factor,
            end_offset,
            corrected: members.len(),
        })
    }

    /// First and last observations and crossings of the combination, paired in time
    /// order.
    ///
    fn sample(
        &self,
        observations: &[Observation],
        members: &[usize],
        crossings: &[Crossing],
        period: &Period,
        direction: Direction,
    ) -> Result<Vec<SamplePair>> {
        let head = self.options.get_samples_start();
        let tail = self.options.get_samples_end();
        let slack = self.options.get_crossing_end_slack();

        let observation_times = members
            .iter()
            .map(|i| observations[*i].observation_time)
            .sorted()
            .collect::<Vec<_>>();
        let crossing_times = crossings
            .iter()
            .filter(|c| c.direction == direction)
            .filter_map(|c| c.crossing_time)
            .filter(|t| period.contains_with_slack(t, slack))
            .sorted()
            .collect::<Vec<_>>();

        let observation_samples = head_tail(&observation_times, head, tail);
        let crossing_samples = head_tail(&crossing_times, head, tail);

        if observation_samples.len() != crossing_samples.len() {
            return Err(Errors::SampleCountMismatch {
                period_start: period.start,
                direction,
                observations: observation_samples.len(),
                crossings: crossing_samples.len(),
            }
            .into());
        }

        Ok(observation_samples
            .into_iter()
            .zip(crossing_samples)
            .map(|(observation, crossing)| SamplePair {
                observation,
                crossing,
            })
            .collect())
    }

    /// Mean crossing-observation difference over the pairs that look like the same
    /// road user
    ///
    fn constant_factor(&self, samples: &[SamplePair], period: &Period, direction: Direction) -> Duration {
        let threshold = self.options.get_sanity_threshold();
        let factor = mean_duration(
            samples
                .iter()
                .map(SamplePair::diff)
                .filter(|d| d.abs() < threshold),
        );
        match factor {
            Some(f) => f,
            None => {
                if !samples.is_empty() {
                    warn!(
                        "No usable skew samples for {} starting {}, observations are left as is",
                        direction, period.start
                    );
                }
                Duration::zero()
            }
        }
    }

    /// Offset at the start of the period and the residual offset at its end, the
    /// latter measured after the start offset is applied.
    ///
    fn linear_factors(&self, samples: &[SamplePair]) -> (Duration, Duration) {
        let head = self.options.get_samples_start();
        let tail = self.options.get_samples_end();

        let start = mean_duration(samples.iter().take(head).map(SamplePair::diff))
            .unwrap_or_else(Duration::zero);
        let end = mean_duration(
            samples
                .iter()
                .rev()
                .take(tail)
                .map(|p| p.crossing - (p.observation + start)),
        )
        .unwrap_or_else(Duration::zero);
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use crate::matching::options::SkewOptions;
    use crate::matching::skew::{
        CalibrationKey, CorrectionMode, SamplePair, SkewCalibration, SkewCorrector,
    };
    use crate::model::crossing::Crossing;
    use crate::model::observation::Observation;
    use crate::model::period::Period;
    use crate::model::Direction;
    use crate::test_stuff::{at, crossing, observation};
    use crate::Errors;
    use chrono::Duration;

    fn pm_period() -> Period {
        Period::new(at(1, 16, 0, 0, 0), at(1, 18, 20, 0, 0))
    }

    /// One observation a minute and a crossing `offset(i)` later
    fn series<F>(n: u32, offset: F) -> (Vec<Observation>, Vec<Crossing>)
    where
        F: Fn(Duration) -> Duration,
    {
        let period = pm_period();
        let mut observations = Vec::new();
        let mut crossings = Vec::new();
        for i in 0..n {
            let t = period.start + Duration::seconds(60 * (i as i64 + 1));
            observations.push(observation(t, Direction::Northbound));
            crossings.push(crossing(
                i as u64,
                Direction::Northbound,
                t + offset(t - period.start),
                None,
            ));
        }
        (observations, crossings)
    }

    #[test]
    fn constant_factor() {
        let (mut observations, crossings) = series(20, |_| Duration::milliseconds(1500));
        let corrector = SkewCorrector::default();
        let report = corrector
            .correct(&mut observations, &crossings, &[pm_period()])
            .unwrap();

        let nb = &report[0];
        assert_eq!(nb.direction, Direction::Northbound);
        assert_eq!(nb.mode, CorrectionMode::Constant);
        assert!(!nb.manual);
        assert_eq!(nb.factor, Duration::milliseconds(1500));
        assert_eq!(nb.corrected, 20);

        // nothing in the other direction
        assert_eq!(report[1].corrected, 0);
        assert_eq!(report[1].factor, Duration::zero());

        for (o, c) in observations.iter().zip(crossings.iter()) {
            assert_eq!(Some(o.observation_time), c.crossing_time);
        }
    }

    #[test]
    fn second_pass_is_idle() {
        let (mut observations, crossings) = series(30, |_| Duration::milliseconds(-2300));
        let corrector = SkewCorrector::default();
        let first = corrector
            .correct(&mut observations, &crossings, &[pm_period()])
            .unwrap();
        let second = corrector
            .correct(&mut observations, &crossings, &[pm_period()])
            .unwrap();
        assert_eq!(first[0].factor, Duration::milliseconds(-2300));
        assert!(second[0].factor.num_milliseconds().abs() <= 1);
    }

    #[test]
    fn mismatched_pairs_are_ignored() {
        let (mut observations, mut crossings) = series(10, |_| Duration::seconds(1));
        // the last sampled crossing belongs to somebody else
        crossings[9].crossing_time = crossings[9]
            .crossing_time
            .map(|t| t + Duration::seconds(30));
        let report = SkewCorrector::default()
            .correct(&mut observations, &crossings, &[pm_period()])
            .unwrap();
        assert_eq!(report[0].factor, Duration::seconds(1));
    }

    #[test]
    fn sample_count_mismatch_fails() {
        let (mut observations, mut crossings) = series(3, |_| Duration::seconds(1));
        crossings.push(crossing(
            99,
            Direction::Northbound,
            at(1, 17, 0, 0, 0),
            None,
        ));
        let err = SkewCorrector::default()
            .correct(&mut observations, &crossings, &[pm_period()])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Errors>(),
            Some(Errors::SampleCountMismatch {
                observations: 6,
                crossings: 8,
                ..
            })
        ));
    }

    #[test]
    fn crossings_after_the_end_are_sampled() {
        let period = Period::new(at(1, 16, 0, 0, 0), at(1, 16, 10, 0, 0));
        let mut observations = vec![observation(at(1, 16, 9, 59, 0), Direction::Southbound)];
        let crossings = vec![crossing(
            1,
            Direction::Southbound,
            at(1, 16, 10, 1, 0),
            None,
        )];
        let report = SkewCorrector::default()
            .correct(&mut observations, &crossings, &[period])
            .unwrap();
        assert_eq!(report[1].factor, Duration::seconds(2));
        assert_eq!(observations[0].observation_time, at(1, 16, 10, 1, 0));
    }

    #[test]
    fn manual_samples_take_precedence() {
        let (mut observations, crossings) = series(10, |_| Duration::seconds(1));
        let period = pm_period();
        let key = CalibrationKey::of(&period, Direction::Northbound);
        let pairs = (0..4)
            .map(|i| SamplePair {
                observation: period.start + Duration::seconds(i),
                crossing: period.start + Duration::seconds(i) + Duration::seconds(3),
            })
            .collect();
        let corrector = SkewCorrector::new(
            SkewOptions::default(),
            SkewCalibration::new().manual_samples(key, pairs),
        );
        let report = corrector
            .correct(&mut observations, &crossings, &[period])
            .unwrap();
        assert!(report[0].manual);
        assert_eq!(report[0].factor, Duration::seconds(3));
    }

    #[test]
    fn linear_drift() {
        // the observer clock loses two seconds over the session
        let period = pm_period();
        let total = period.duration().num_milliseconds() as f64;
        let drift = |elapsed: Duration| {
            Duration::seconds(1)
                + Duration::milliseconds((2000.0 * elapsed.num_milliseconds() as f64 / total) as i64)
        };
        let (mut observations, crossings) = series(139, drift);
        let key = CalibrationKey::of(&period, Direction::Northbound);
        let corrector = SkewCorrector::new(
            SkewOptions::default(),
            SkewCalibration::new().linear_drift(key),
        );
        let report = corrector
            .correct(&mut observations, &crossings, &[period])
            .unwrap();
        assert_eq!(report[0].mode, CorrectionMode::LinearDrift);
        assert!(report[0].end_offset.unwrap() > Duration::milliseconds(1800));

        for (o, c) in observations.iter().zip(crossings.iter()) {
            let error = (c.crossing_time.unwrap() - o.observation_time).num_milliseconds();
            assert!(error.abs() <= 80, "error {} ms", error);
        }
    }

    #[test]
    fn each_observation_is_corrected_once() {
        // the correction pushes the observation of the first period into the
        // second one; it must not be shifted again
        let first = Period::new(at(1, 11, 59, 50, 0), at(1, 12, 0, 0, 0));
        let second = Period::new(at(1, 12, 0, 1, 0), at(1, 12, 0, 30, 0));
        let calibration = SkewCalibration::new().manual_samples(
            CalibrationKey::new(1, 12, Direction::Northbound),
            vec![SamplePair {
                observation: at(1, 12, 0, 20, 0),
                crossing: at(1, 12, 0, 21, 0),
            }],
        );
        let mut observations = vec![
            observation(at(1, 11, 59, 58, 0), Direction::Northbound),
            observation(at(1, 12, 0, 20, 0), Direction::Northbound),
        ];
        let crossings = vec![crossing(1, Direction::Northbound, at(1, 12, 0, 1, 0), None)];
        let report = SkewCorrector::new(SkewOptions::default(), calibration)
            .correct(&mut observations, &crossings, &[first, second])
            .unwrap();
        assert_eq!(report[0].factor, Duration::seconds(3));
        assert_eq!(report[2].factor, Duration::seconds(1));
        assert_eq!(observations[0].observation_time, at(1, 12, 0, 1, 0));
        assert_eq!(observations[1].observation_time, at(1, 12, 0, 21, 0));
    }
}
