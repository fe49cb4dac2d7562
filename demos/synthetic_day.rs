use anyhow::Result;
use chrono::Duration;
use crossmatch::prelude::*;
use crossmatch::study;
use crossmatch::test_stuff::SyntheticPeriod;
use log::info;

fn main() -> Result<()> {
    env_logger::init();

    let day = 2;
    let periods = study::periods(day)?;
    let mut crossings = Vec::new();
    let mut observations = Vec::new();

    // the observer's clock is 1.5 s behind and the IDs of each period start over,
    // so they are shifted to stay unique for the day
    for (i, period) in periods.iter().enumerate() {
        let synthetic = SyntheticPeriod::new(i as u64, period, 400, Duration::milliseconds(1500), 400, 0.9);
        let base = (i as u64 + 1) * 10_000;
        crossings.extend(synthetic.crossings.into_iter().map(|mut c| {
            c.id += base;
            c
        }));
        observations.extend(synthetic.observations);
    }
    let store = ObservationStore::new(observations);

    for strategy in [MatchStrategy::Assignment, MatchStrategy::Nearest] {
        let site = SiteDay {
            location: Location::RiddarholmsbronN,
            periods: periods.clone(),
            crossings: crossings.clone(),
            strategy,
        };
        let outcome = MatchOrchestrator::default().match_site(&store, &site)?;

        for a in &outcome.adjustments {
            info!(
                "{:?} {}: {:?} factor {} ms",
                a.period.name()?,
                a.direction,
                a.mode,
                a.factor.num_milliseconds()
            );
        }

        let matched = outcome
            .records
            .iter()
            .filter(|r| r.matched.crossing.is_some())
            .collect::<Vec<_>>();
        let mean_distance = matched
            .iter()
            .filter_map(|r| r.matched.time_distance_ms())
            .sum::<i64>()
            / (matched.len().max(1) as i64);

        println!(
            "{:?}: {} of {} observations matched, mean distance {} ms, {} residual duplicates",
            strategy,
            matched.len(),
            outcome.records.len(),
            mean_distance,
            outcome.residual_duplicates
        );
    }
    Ok(())
}
