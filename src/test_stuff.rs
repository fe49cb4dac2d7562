use crate::model::crossing::Crossing;
use crate::model::observation::{Observation, ObservationBuilder};
use crate::model::period::Period;
use crate::model::{Direction, PrimaryType, RelativePosition};
use crate::Timestamp;
use chrono::{Duration, FixedOffset, TimeZone};
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Time on the given day of October 2024 at the study's UTC offset
///
pub fn at(day: u32, h: u32, m: u32, s: u32, ms: u32) -> Timestamp {
    FixedOffset::east_opt(2 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 10, day, h, m, s)
        .unwrap()
        + Duration::milliseconds(ms as i64)
}

pub fn observation(time: Timestamp, direction: Direction) -> Observation {
    ObservationBuilder::new(time, direction, PrimaryType::Regular).build()
}

pub fn observation_at_position(
    time: Timestamp,
    direction: Direction,
    position: Option<RelativePosition>,
) -> Observation {
    let comment = match position {
        Some(RelativePosition::Front) => "Front",
        Some(RelativePosition::Back) => "Back",
        None => "",
    };
    ObservationBuilder::new(time, direction, PrimaryType::Regular)
        .comment(comment)
        .build()
}

pub fn crossing(id: u64, direction: Direction, time: Timestamp, offset: Option<f64>) -> Crossing {
    Crossing::new(id, direction, Some(time), offset)
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `n` sorted times spread uniformly over `[start, start + span)`
///
pub fn random_times(seed: u64, n: usize, start: Timestamp, span: Duration) -> Vec<Timestamp> {
    let mut rng = StdRng::seed_from_u64(seed);
    let offsets = Uniform::new(0, span.num_milliseconds().max(1));
    let mut times = (0..n)
        .map(|_| start + Duration::milliseconds(rng.sample(offsets)))
        .collect::<Vec<_>>();
    times.sort();
    times
}

fn direction(rng: &mut StdRng) -> Direction {
    if rng.gen_bool(0.5) {
        Direction::Northbound
    } else {
        Direction::Southbound
    }
}

pub fn random_crossings(seed: u64, n: usize, start: Timestamp, span: Duration) -> Vec<Crossing> {
    let mut rng = StdRng::seed_from_u64(seed);
    let offsets = Uniform::new(0.0, 3.0);
    random_times(seed, n, start, span)
        .into_iter()
        .enumerate()
        .map(|(i, t)| crossing(i as u64 + 1, direction(&mut rng), t, Some(rng.sample(offsets))))
        .collect()
}

pub fn random_observations(seed: u64, n: usize, start: Timestamp, span: Duration) -> Vec<Observation> {
    let mut rng = StdRng::seed_from_u64(seed);
    random_times(seed, n, start, span)
        .into_iter()
        .map(|t| observation(t, direction(&mut rng)))
        .collect()
}

/// Crossings of a period and the observations an observer with a skewed clock
/// would log for them.
///
/// Every crossing is observed with probability `observed`, at `crossing - skew`
/// plus a uniform error of up to `jitter_ms`. Some observations of road users
/// the cameras missed are added as well.
///
pub struct SyntheticPeriod {
    pub crossings: Vec<Crossing>,
    pub observations: Vec<Observation>,
}

impl SyntheticPeriod {
    pub fn new(
        seed: u64,
        period: &Period,
        crossings: usize,
        skew: Duration,
        jitter_ms: i64,
        observed: f64,
    ) -> Self {
        assert!((0.0..=1.0).contains(&observed));
        assert!(jitter_ms >= 0);

        let mut rng = StdRng::seed_from_u64(seed);
        let jitter = Uniform::new_inclusive(-jitter_ms, jitter_ms);
        let offsets = Uniform::new(0.0, 3.0);

        let crossings = random_times(seed, crossings, period.start, period.duration())
            .into_iter()
            .enumerate()
            .map(|(i, t)| crossing(i as u64 + 1, direction(&mut rng), t, Some(rng.sample(offsets))))
            .collect::<Vec<_>>();

        let mut observations = crossings
            .iter()
            .filter_map(|c| {
                if !rng.gen_bool(observed) {
                    return None;
                }
                c.crossing_time.map(|t| {
                    let logged = t - skew + Duration::milliseconds(rng.sample(jitter));
                    observation(logged, c.direction)
                })
            })
            .collect::<Vec<_>>();

        let missed = crossings.len() / 20;
        observations.extend(
            random_times(seed + 1, missed, period.start, period.duration())
                .into_iter()
                .map(|t| observation(t, direction(&mut rng))),
        );
        observations.sort_by_key(|o| o.observation_time);

        Self {
            crossings,
            observations,
        }
    }
}
