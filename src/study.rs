use crate::crossing_times::{crossing_table, LinePlan, SiteTrajectories};
use crate::geometry::ReferenceLine;
use crate::matching::options::MatchingOptions;
use crate::matching::orchestrator::{MatchOrchestrator, MatchStrategy, SiteDay};
use crate::matching::skew::{CalibrationKey, SamplePair, SkewCalibration};
use crate::model::crossing::CrossingRecord;
use crate::model::matched::MatchRecord;
use crate::model::observation::ObservationStore;
use crate::model::period::Period;
use crate::model::{Direction, Location};
use crate::{Errors, Timestamp};
use anyhow::Result;
use chrono::{DateTime, Datelike, FixedOffset, TimeZone};
use log::info;
use once_cell::sync::OnceCell;

pub const YEAR: i32 = 2024;
pub const MONTH: u32 = 10;
pub const DAYS: [u32; 3] = [1, 2, 3];

/// Central European Summer Time
const UTC_OFFSET_SECS: i32 = 2 * 3600;

/// Sites matched on each day, all with the assignment strategy
pub const SITE_DAYS: [(Location, u32); 3] = [
    (Location::Riddarhuskajen, 1),
    (Location::RiddarholmsbronN, 2),
    (Location::RiddarholmsbronN, 3),
];

pub fn local_time(day: u32, hour: u32, min: u32, sec: u32) -> Result<Timestamp> {
    FixedOffset::east_opt(UTC_OFFSET_SECS)
        .and_then(|tz| tz.with_ymd_and_hms(YEAR, MONTH, day, hour, min, sec).single())
        .ok_or_else(|| Errors::UnsupportedDay(day).into())
}

fn period(day: u32, start: (u32, u32, u32), end: (u32, u32, u32)) -> Result<Period> {
    Ok(Period::new(
        local_time(day, start.0, start.1, start.2)?,
        local_time(day, end.0, end.1, end.2)?,
    ))
}

pub fn am_peak(day: u32) -> Result<Period> {
    match day {
        1 => period(day, (6, 45, 0), (9, 7, 30)),
        2 | 3 => period(day, (6, 46, 0), (9, 5, 0)),
        _ => Err(Errors::UnsupportedDay(day).into()),
    }
}

pub fn off_peak(day: u32) -> Result<Period> {
    match day {
        1 => period(day, (11, 0, 0), (12, 0, 0)),
        2 | 3 => period(day, (12, 0, 0), (13, 0, 0)),
        _ => Err(Errors::UnsupportedDay(day).into()),
    }
}

pub fn pm_peak(day: u32) -> Result<Period> {
    match day {
        1..=3 => period(day, (16, 0, 0), (18, 20, 0)),
        _ => Err(Errors::UnsupportedDay(day).into()),
    }
}

/// Observation periods of a day in chronological order
///
pub fn periods(day: u32) -> Result<Vec<Period>> {
    Ok(vec![am_peak(day)?, off_peak(day)?, pm_peak(day)?])
}

pub fn riddarhuskajen_northbound_line() -> ReferenceLine {
    ReferenceLine::new(
        (-350.0 / 477.0, 7610.0 / 477.0),
        (620.0 / 477.0, 2290.0 / 159.0),
    )
}

pub fn riddarhuskajen_southbound_line() -> ReferenceLine {
    ReferenceLine::new(
        (-620.0 / 477.0, 8230.0 / 477.0),
        (1100.0 / 477.0, 750.0 / 53.0),
    )
}

pub fn riddarholmsbron_n_line() -> ReferenceLine {
    ReferenceLine::new(
        (-5900.0 / 941.0, -530.0 / 941.0),
        (-1950.0 / 941.0, -3730.0 / 941.0),
    )
}

/// Reference lines of a site.
///
/// At Riddarhuskajen the southbound line is only used outside of the off-peak
/// periods.
///
/// # Errors
/// [UnsupportedSite](Errors::UnsupportedSite) for Riddarholmsbron S, which has no line.
///
pub fn line_plan(location: Location) -> Result<LinePlan> {
    match location {
        Location::Riddarhuskajen => Ok(LinePlan::SplitByDirection {
            northbound: riddarhuskajen_northbound_line(),
            southbound: riddarhuskajen_southbound_line(),
            northbound_periods: DAYS.iter().map(|d| off_peak(*d)).collect::<Result<Vec<_>>>()?,
        }),
        Location::RiddarholmsbronN => Ok(LinePlan::Single(riddarholmsbron_n_line())),
        Location::RiddarholmsbronS => Err(Errors::UnsupportedSite(location).into()),
    }
}

type ManualSamples = (u32, u32, Direction, &'static [(&'static str, &'static str)]);

/// Observation and crossing times of the same road users, picked by hand where the
/// first or last crossings of a period are wrong
const MANUAL_SAMPLES: [ManualSamples; 5] = [
    (
        1,
        6,
        Direction::Southbound,
        &[
            ("2024-10-01T06:45:32.565+02:00", "2024-10-01T06:45:33.640+02:00"),
            ("2024-10-01T06:45:50.717+02:00", "2024-10-01T06:45:51.880+02:00"),
            ("2024-10-01T06:46:39.232+02:00", "2024-10-01T06:46:40.360+02:00"),
            ("2024-10-01T06:48:27.807+02:00", "2024-10-01T06:48:28.840+02:00"),
            ("2024-10-01T06:49:26.031+02:00", "2024-10-01T06:49:27.000+02:00"),
            ("2024-10-01T09:02:38.047+02:00", "2024-10-01T09:02:39.000+02:00"),
            ("2024-10-01T09:02:39.148+02:00", "2024-10-01T09:02:40.120+02:00"),
            ("2024-10-01T09:02:50.693+02:00", "2024-10-01T09:02:51.720+02:00"),
            ("2024-10-01T09:03:36.405+02:00", "2024-10-01T09:03:37.400+02:00"),
            ("2024-10-01T09:04:43.272+02:00", "2024-10-01T09:04:44.280+02:00"),
        ],
    ),
    (
        1,
        16,
        Direction::Southbound,
        &[
            ("2024-10-01T16:00:02.502+02:00", "2024-10-01T16:00:05.320+02:00"),
            ("2024-10-01T16:00:06.072+02:00", "2024-10-01T16:00:08.920+02:00"),
            ("2024-10-01T16:00:33.533+02:00", "2024-10-01T16:00:36.360+02:00"),
            ("2024-10-01T16:00:34.467+02:00", "2024-10-01T16:00:37.240+02:00"),
            ("2024-10-01T16:00:36.236+02:00", "2024-10-01T16:00:39.080+02:00"),
            ("2024-10-01T18:19:11.473+02:00", "2024-10-01T18:19:14.360+02:00"),
            ("2024-10-01T18:19:16.945+02:00", "2024-10-01T18:19:19.800+02:00"),
            ("2024-10-01T18:19:18.714+02:00", "2024-10-01T18:19:21.560+02:00"),
            ("2024-10-01T18:19:39.201+02:00", "2024-10-01T18:19:42.040+02:00"),
            ("2024-10-01T18:19:41.236+02:00", "2024-10-01T18:19:44.120+02:00"),
        ],
    ),
    (
        2,
        16,
        Direction::Northbound,
        &[
            ("2024-10-02T16:00:16.916+02:00", "2024-10-02T16:00:18.520+02:00"),
            ("2024-10-02T16:00:48.748+02:00", "2024-10-02T16:00:50.360+02:00"),
            ("2024-10-02T16:00:49.916+02:00", "2024-10-02T16:00:51.480+02:00"),
            ("2024-10-02T16:00:54.187+02:00", "2024-10-02T16:00:55.800+02:00"),
            ("2024-10-02T16:01:33.793+02:00", "2024-10-02T16:01:35.320+02:00"),
            ("2024-10-02T18:18:40.242+02:00", "2024-10-02T18:18:41.800+02:00"),
            ("2024-10-02T18:18:59.561+02:00", "2024-10-02T18:19:01.160+02:00"),
            ("2024-10-02T18:19:19.314+02:00", "2024-10-02T18:19:20.920+02:00"),
            ("2024-10-02T18:19:24.053+02:00", "2024-10-02T18:19:25.640+02:00"),
            ("2024-10-02T18:19:27.656+02:00", "2024-10-02T18:19:29.240+02:00"),
        ],
    ),
    (
        3,
        16,
        Direction::Northbound,
        &[
            ("2024-10-03T16:00:36.936+02:00", "2024-10-03T16:00:39.080+02:00"),
            ("2024-10-03T16:00:44.711+02:00", "2024-10-03T16:00:46.840+02:00"),
            ("2024-10-03T16:01:21.014+02:00", "2024-10-03T16:01:23.080+02:00"),
            ("2024-10-03T16:01:34.027+02:00", "2024-10-03T16:01:36.040+02:00"),
            ("2024-10-03T16:01:51.044+02:00", "2024-10-03T16:01:53.160+02:00"),
            ("2024-10-03T18:17:56.165+02:00", "2024-10-03T18:17:58.280+02:00"),
            ("2024-10-03T18:18:19.688+02:00", "2024-10-03T18:18:21.800+02:00"),
            ("2024-10-03T18:18:29.164+02:00", "2024-10-03T18:18:31.240+02:00"),
            ("2024-10-03T18:19:11.974+02:00", "2024-10-03T18:19:14.040+02:00"),
            ("2024-10-03T18:19:55.551+02:00", "2024-10-03T18:19:57.720+02:00"),
        ],
    ),
    (
        3,
        16,
        Direction::Southbound,
        &[
            ("2024-10-03T16:00:00.079+02:00", "2024-10-03T16:00:03.080+02:00"),
            ("2024-10-03T16:00:12.512+02:00", "2024-10-03T16:00:15.560+02:00"),
            ("2024-10-03T16:00:15.215+02:00", "2024-10-03T16:00:18.200+02:00"),
            ("2024-10-03T16:00:16.382+02:00", "2024-10-03T16:00:19.480+02:00"),
            ("2024-10-03T16:00:23.156+02:00", "2024-10-03T16:00:26.280+02:00"),
            ("2024-10-03T18:19:43.872+02:00", "2024-10-03T18:19:45.960+02:00"),
            ("2024-10-03T18:19:44.540+02:00", "2024-10-03T18:19:46.680+02:00"),
            ("2024-10-03T18:19:46.341+02:00", "2024-10-03T18:19:48.520+02:00"),
            ("2024-10-03T18:19:47.309+02:00", "2024-10-03T18:19:49.480+02:00"),
            ("2024-10-03T18:19:56.785+02:00", "2024-10-03T18:19:58.920+02:00"),
        ],
    ),
];

/// Sessions where the observer's clock drifted
const LINEAR_DRIFT: [(u32, u32, Direction); 3] = [
    (2, 6, Direction::Northbound),
    (3, 6, Direction::Northbound),
    (3, 16, Direction::Southbound),
];

static CALIBRATION: OnceCell<SkewCalibration> = OnceCell::new();

fn parse_time(s: &str) -> Result<Timestamp> {
    DateTime::parse_from_rfc3339(s)
        .map_err(|e| Errors::InvalidCalibration(format!("{}: {}", s, e)).into())
}

fn build_calibration() -> Result<SkewCalibration> {
    let mut calibration = SkewCalibration::new();
    for (day, hour, direction, pairs) in MANUAL_SAMPLES {
        let pairs = pairs
            .iter()
            .map(|(o, c)| {
                Ok(SamplePair {
                    observation: parse_time(o)?,
                    crossing: parse_time(c)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        calibration = calibration.manual_samples(CalibrationKey::new(day, hour, direction), pairs);
    }
    for (day, hour, direction) in LINEAR_DRIFT {
        calibration = calibration.linear_drift(CalibrationKey::new(day, hour, direction));
    }
    Ok(calibration)
}

/// Calibration data of the study, parsed on first use
///
pub fn calibration() -> Result<&'static SkewCalibration> {
    CALIBRATION.get_or_try_init(build_calibration)
}

/// Site-days of the study with the crossings recorded on that day
///
pub fn site_days(crossings: &[CrossingRecord]) -> Result<Vec<SiteDay>> {
    SITE_DAYS
        .iter()
        .map(|(location, day)| {
            Ok(SiteDay {
                location: *location,
                periods: periods(*day)?,
                crossings: crossings
                    .iter()
                    .filter(|r| r.location == *location)
                    .filter(|r| r.crossing.crossing_time.map(|t| t.day()) == Some(*day))
                    .map(|r| r.crossing.clone())
                    .collect(),
                strategy: MatchStrategy::Assignment,
            })
        })
        .collect()
}

/// Both output tables of a run
///
#[derive(Debug, Clone)]
pub struct StudyOutput {
    pub crossings: Vec<CrossingRecord>,
    pub matches: Vec<MatchRecord>,
}

/// Computes the crossing times of every site and matches the observations of
/// every site-day to them.
///
pub fn run(
    trajectories: &[SiteTrajectories],
    observations: &ObservationStore,
    options: MatchingOptions,
) -> Result<StudyOutput> {
    let crossings = crossing_table(trajectories, line_plan)?;
    let sites = site_days(&crossings)?;
    let orchestrator = MatchOrchestrator::new(options, calibration()?.clone());
    let matches = orchestrator.match_all(observations, &sites)?;

    info!(
        "{} crossings computed, {} of {} observations matched",
        crossings.len(),
        matches.iter().filter(|m| m.matched.crossing.is_some()).count(),
        matches.len()
    );

    Ok(StudyOutput { crossings, matches })
}
