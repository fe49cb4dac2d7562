use crate::matching::assignment::AssignmentMatcher;
use crate::matching::duplicates::{match_nearest, resolve_duplicates};
use crate::matching::options::MatchingOptions;
use crate::matching::relative_position::reorder_by_relative_position;
use crate::matching::skew::{SkewAdjustment, SkewCalibration, SkewCorrector};
use crate::matching::uncertain::{match_uncertain, UncertainOutcome};
use crate::model::crossing::Crossing;
use crate::model::matched::{Match, MatchRecord, MatchedCrossing};
use crate::model::observation::{Observation, ObservationStore};
use crate::model::period::Period;
use crate::model::Location;
use anyhow::Result;
use log::{debug, info};
use rayon::prelude::*;
use std::collections::HashSet;

/// How observations left after the simultaneous crossings stage are matched
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Optimal one-to-one assignment per period and direction
    Assignment,
    /// Nearest crossing in time followed by the duplicate resolution
    Nearest,
}

/// One recording site on one day
///
#[derive(Debug, Clone)]
pub struct SiteDay {
    pub location: Location,
    pub periods: Vec<Period>,
    pub crossings: Vec<Crossing>,
    pub strategy: MatchStrategy,
}

/// Matching result of a site-day with the diagnostics of every stage
///
#[derive(Debug, Clone)]
pub struct SiteOutcome {
    pub location: Location,
    pub records: Vec<MatchRecord>,
    pub adjustments: Vec<SkewAdjustment>,
    pub uncertain: UncertainOutcome,
    pub residual_duplicates: usize,
}

/// Runs the matching stages in order for every site-day
///
#[derive(Debug, Clone, Default)]
pub struct MatchOrchestrator {
    options: MatchingOptions,
    corrector: SkewCorrector,
}

impl MatchOrchestrator {
    pub fn new(options: MatchingOptions, calibration: SkewCalibration) -> Self {
        let corrector = SkewCorrector::new(options.get_skew().clone(), calibration);
        Self { options, corrector }
    }

    pub fn options(&self) -> &MatchingOptions {
        &self.options
    }

    /// Matches the observations recorded during the periods of `site`.
    ///
    /// Every observation of the site's periods ends up in exactly one row, including
    /// those that skew correction moved out of every period.
    ///
    pub fn match_site(&self, store: &ObservationStore, site: &SiteDay) -> Result<SiteOutcome> {
        let mut observations =
            store.in_periods(&site.periods, self.options.get_include_pedestrians());
        let adjustments = self
            .corrector
            .correct(&mut observations, &site.crossings, &site.periods)?;

        let uncertain = match_uncertain(
            &site.crossings,
            &observations,
            self.options.get_uncertain_tolerance(),
        );
        let taken_observations = uncertain.matched_observations();
        let taken_crossings = uncertain.matched_ids();

        let mut rows = uncertain
            .matched
            .iter()
            .map(|(i, c)| Match {
                observation: observations[*i].clone(),
                crossing: MatchedCrossing::from_crossing(c),
            })
            .collect::<Vec<_>>();

        let pool = observations
            .iter()
            .enumerate()
            .filter(|(i, _)| !taken_observations.contains(i))
            .map(|(_, o)| o.clone())
            .collect::<Vec<_>>();
        let crossings = site
            .crossings
            .iter()
            .filter(|c| !taken_crossings.contains(&c.id))
            .cloned()
            .collect::<Vec<_>>();

        let mut residual_duplicates = 0;
        match site.strategy {
            MatchStrategy::Assignment => {
                rows.extend(self.assignment(&pool, &crossings, &site.periods));
                if self.options.get_reorder_relative_positions() {
                    rows.sort_by_key(|r| r.observation.observation_time);
                    reorder_by_relative_position(
                        &mut rows,
                        self.options.get_relative_position_window(),
                        self.options.get_placeholder_offsets(),
                    );
                }
            }
            MatchStrategy::Nearest => {
                let nearest = match_nearest(&pool, &crossings, self.options.get_nearest_tolerance());
                let resolution =
                    resolve_duplicates(nearest, &crossings, self.options.get_duplicate_tolerance());
                residual_duplicates = resolution.residual_duplicates;
                rows.extend(resolution.matches);
            }
        }

        rows.sort_by_key(|r| (r.observation.observation_time, r.trajectory_id()));

        let matched = rows.iter().filter(|r| r.crossing.is_some()).count();
        info!(
            "{}: {} of {} observations matched to {} crossings ({} simultaneous)",
            site.location,
            matched,
            rows.len(),
            site.crossings.iter().filter(|c| c.crossing_time.is_some()).count(),
            uncertain.matched.len()
        );

        Ok(SiteOutcome {
            location: site.location,
            records: rows
                .into_iter()
                .map(|matched| MatchRecord {
                    location: site.location,
                    matched,
                })
                .collect(),
            adjustments,
            uncertain,
            residual_duplicates,
        })
    }

    fn assignment(&self, pool: &[Observation], crossings: &[Crossing], periods: &[Period]) -> Vec<Match> {
        let pairs = AssignmentMatcher::new(self.options.get_assignment_threshold())
            .match_periods(pool, crossings, periods);
        let paired = pairs.iter().map(|(o, _)| *o).collect::<HashSet<_>>();

        debug!(
            "Assignment matched {} of {} remaining observations",
            pairs.len(),
            pool.len()
        );

        pairs
            .into_iter()
            .map(|(o, c)| Match {
                observation: pool[o].clone(),
                crossing: MatchedCrossing::from_crossing(&crossings[c]),
            })
            .chain(
                pool.iter()
                    .enumerate()
                    .filter(|(i, _)| !paired.contains(i))
                    .map(|(_, o)| Match::unmatched(o.clone())),
            )
            .collect()
    }

    /// Matches all site-days in parallel and merges the rows.
    ///
    /// The result is sorted by observation time, location and trajectory ID.
    ///
    pub fn match_all(&self, store: &ObservationStore, sites: &[SiteDay]) -> Result<Vec<MatchRecord>> {
        let outcomes = sites
            .par_iter()
            .map(|site| self.match_site(store, site))
            .collect::<Result<Vec<_>>>()?;

        let mut records = outcomes
            .into_iter()
            .flat_map(|o| o.records)
            .collect::<Vec<_>>();
        records.sort_by(|l, r| {
            l.matched
                .observation
                .observation_time
                .cmp(&r.matched.observation.observation_time)
                .then_with(|| l.location.cmp(&r.location))
                .then_with(|| l.trajectory_id().cmp(&r.trajectory_id()))
        });
        Ok(records)
    }
}
