use crate::Timestamp;
use chrono::Duration;

/// Index of the time closest to `target` within `tolerance`.
///
/// `times` must be sorted. On equal distances the earlier time wins.
///
pub(crate) fn nearest_within(times: &[Timestamp], target: &Timestamp, tolerance: Duration) -> Option<usize> {
    let pos = times.partition_point(|t| t < target);
    let before = pos.checked_sub(1).map(|i| (i, *target - times[i]));
    let after = times.get(pos).map(|t| (pos, *t - *target));

    let best = match (before, after) {
        (Some(b), Some(a)) => {
            if a.1 < b.1 {
                a
            } else {
                b
            }
        }
        (Some(b), None) => b,
        (None, Some(a)) => a,
        (None, None) => return None,
    };

    if best.1 <= tolerance {
        Some(best.0)
    } else {
        None
    }
}

/// Index of the latest time at or before `target`, no older than `tolerance`,
/// that the `usable` predicate accepts.
///
/// `times` must be sorted. Among equal times the last one wins.
///
pub(crate) fn latest_at_or_before<F>(
    times: &[Timestamp],
    target: &Timestamp,
    tolerance: Duration,
    usable: F,
) -> Option<usize>
where
    F: Fn(usize) -> bool,
{
    let end = times.partition_point(|t| t <= target);
    (0..end)
        .rev()
        .take_while(|i| *target - times[*i] <= tolerance)
        .find(|i| usable(*i))
}
