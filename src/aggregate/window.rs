//! Fixed-size window timeline ending at the reference time.

use super::{chronological, mean_latency};
use crate::models::{Tick, TickStatus, Window, WindowStatus};

use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Bucket ticks into `window_count` contiguous windows of `window_size`,
/// the newest ending at `now`. Windows are returned oldest first.
///
/// Each window covers `[start, end)`, so a tick exactly on a boundary
/// belongs to the later window and a tick at `now` falls in none.
///
/// A non-positive `window_size` yields no windows. Windows that would start
/// before the earliest representable time are left out.
pub fn compute_windows(
    ticks: &[Tick],
    now: DateTime<Utc>,
    window_size: ChronoDuration,
    window_count: usize,
) -> Vec<Window> {
    if window_size <= ChronoDuration::zero() {
        return Vec::new();
    }

    let sorted = chronological(ticks);
    let mut windows = Vec::with_capacity(window_count);

    for i in (0..window_count).rev() {
        let Some((start, end)) = window_bounds(now, window_size, i) else {
            continue;
        };

        let lo = sorted.partition_point(|t| t.occurred_at < start);
        let hi = sorted.partition_point(|t| t.occurred_at < end);
        let selected = &sorted[lo..hi.max(lo)];

        windows.push(Window {
            start,
            end,
            status: resolve_status(selected),
            average_latency_ms: mean_latency(selected.iter().copied()),
            sample_count: selected.len(),
        });
    }

    windows
}

/// Bounds of the window `index` steps back from the newest one.
fn window_bounds(
    now: DateTime<Utc>,
    window_size: ChronoDuration,
    index: usize,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let offset = i32::try_from(index)
        .ok()
        .and_then(|i| window_size.checked_mul(i))?;
    let end = now.checked_sub_signed(offset)?;
    let start = end.checked_sub_signed(window_size)?;
    Some((start, end))
}

/// Worst case wins: one unhealthy sample marks the whole window down.
fn resolve_status(ticks: &[&Tick]) -> WindowStatus {
    if ticks.is_empty() {
        WindowStatus::NoData
    } else if ticks.iter().any(|t| t.status == TickStatus::Unhealthy) {
        WindowStatus::Down
    } else {
        WindowStatus::Up
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn tick(id: &str, offset_secs: i64, status: TickStatus, latency_ms: f64) -> Tick {
        Tick::new(id, base() + ChronoDuration::seconds(offset_secs), status, latency_ms)
    }

    fn three_minutes() -> ChronoDuration {
        ChronoDuration::minutes(3)
    }

    #[test]
    fn test_all_healthy_window_is_up() {
        let ticks = vec![
            tick("a", 0, TickStatus::Healthy, 100.0),
            tick("b", 60, TickStatus::Healthy, 120.0),
        ];
        let now = base() + three_minutes();

        let windows = compute_windows(&ticks, now, three_minutes(), 1);

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].status, WindowStatus::Up);
        assert_eq!(windows[0].average_latency_ms, 110.0);
        assert_eq!(windows[0].sample_count, 2);
    }

    #[test]
    fn test_single_unhealthy_tick_marks_window_down() {
        let ticks = vec![
            tick("a", 0, TickStatus::Unhealthy, 50.0),
            tick("b", 30, TickStatus::Healthy, 80.0),
        ];
        let now = base() + three_minutes();

        let windows = compute_windows(&ticks, now, three_minutes(), 1);

        assert_eq!(windows[0].status, WindowStatus::Down);
        assert_eq!(windows[0].average_latency_ms, 65.0);
        assert_eq!(windows[0].sample_count, 2);
    }

    #[test]
    fn test_down_regardless_of_healthy_majority() {
        let mut ticks: Vec<Tick> = (0..20)
            .map(|i| tick(&format!("ok{}", i), i * 5, TickStatus::Healthy, 10.0))
            .collect();
        ticks.push(tick("bad", 101, TickStatus::Unhealthy, 10.0));
        let now = base() + three_minutes();

        let windows = compute_windows(&ticks, now, three_minutes(), 1);
        assert_eq!(windows[0].status, WindowStatus::Down);
        assert_eq!(windows[0].sample_count, 21);
    }

    #[test]
    fn test_empty_history_yields_no_data_windows() {
        let windows = compute_windows(&[], base(), three_minutes(), 10);

        assert_eq!(windows.len(), 10);
        for w in &windows {
            assert_eq!(w.status, WindowStatus::NoData);
            assert_eq!(w.average_latency_ms, 0.0);
            assert_eq!(w.sample_count, 0);
        }
    }

    #[test]
    fn test_windows_are_contiguous_and_end_at_now() {
        let now = base();
        let windows = compute_windows(&[], now, three_minutes(), 10);

        assert_eq!(windows.last().unwrap().end, now);
        assert_eq!(windows[0].start, now - ChronoDuration::minutes(30));
        for w in &windows {
            assert_eq!(w.end - w.start, three_minutes());
        }
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_boundary_tick_belongs_to_later_window() {
        let now = base() + ChronoDuration::minutes(6);
        // Exactly on the boundary between the two windows.
        let ticks = vec![tick("edge", 180, TickStatus::Unhealthy, 10.0)];

        let windows = compute_windows(&ticks, now, three_minutes(), 2);

        assert_eq!(windows[0].status, WindowStatus::NoData);
        assert_eq!(windows[1].status, WindowStatus::Down);
        assert_eq!(windows[1].sample_count, 1);
    }

    #[test]
    fn test_ticks_outside_the_timeline_are_excluded() {
        let now = base() + three_minutes();
        let ticks = vec![
            tick("at-now", 180, TickStatus::Unhealthy, 10.0),
            tick("future", 500, TickStatus::Unhealthy, 10.0),
            tick("ancient", -1, TickStatus::Unhealthy, 10.0),
            tick("inside", 0, TickStatus::Healthy, 30.0),
        ];

        let windows = compute_windows(&ticks, now, three_minutes(), 1);

        assert_eq!(windows[0].status, WindowStatus::Up);
        assert_eq!(windows[0].sample_count, 1);
        assert_eq!(windows[0].average_latency_ms, 30.0);
    }

    #[test]
    fn test_unordered_input_is_bucketed_correctly() {
        let now = base() + ChronoDuration::minutes(6);
        let ticks = vec![
            tick("c", 300, TickStatus::Healthy, 30.0),
            tick("a", 10, TickStatus::Unhealthy, 10.0),
            tick("d", 200, TickStatus::Healthy, 50.0),
            tick("b", 20, TickStatus::Healthy, 20.0),
        ];

        let windows = compute_windows(&ticks, now, three_minutes(), 2);

        assert_eq!(windows[0].status, WindowStatus::Down);
        assert_eq!(windows[0].sample_count, 2);
        assert_eq!(windows[0].average_latency_ms, 15.0);
        assert_eq!(windows[1].status, WindowStatus::Up);
        assert_eq!(windows[1].average_latency_ms, 40.0);
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let ticks = vec![
            tick("a", 30, TickStatus::Healthy, 12.0),
            tick("b", 90, TickStatus::Unhealthy, 0.0),
        ];
        let now = base() + ChronoDuration::minutes(9);

        let first = compute_windows(&ticks, now, three_minutes(), 4);
        let second = compute_windows(&ticks, now, three_minutes(), 4);
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_window_count() {
        let ticks = vec![tick("a", 0, TickStatus::Healthy, 1.0)];
        assert!(compute_windows(&ticks, base(), three_minutes(), 0).is_empty());
    }

    #[test]
    fn test_non_positive_window_size_yields_nothing() {
        let ticks = vec![tick("a", 0, TickStatus::Healthy, 1.0)];
        assert!(compute_windows(&ticks, base(), ChronoDuration::zero(), 3).is_empty());
        assert!(compute_windows(&ticks, base(), ChronoDuration::seconds(-1), 3).is_empty());
    }

    #[test]
    fn test_unrepresentable_windows_are_left_out() {
        // A million days per window: only the newest ones fit before chrono's minimum date.
        let huge = ChronoDuration::days(1_000_000);
        let windows = compute_windows(&[], base(), huge, 100);

        assert!(!windows.is_empty());
        assert!(windows.len() < 100);
        assert_eq!(windows.last().unwrap().end, base());
        for w in &windows {
            assert!(w.start < w.end);
            assert_eq!(w.end - w.start, huge);
        }
    }
}
