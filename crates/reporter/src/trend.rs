//! Traffic trend deltas (§4.G step 4): for a metric and direction, find
//! the extreme value in a trailing window and compare it against the
//! average of whatever came after it in the series.
//!
//! Grounded on `domain_intel/reporter.py::Reporter.get_traffic_trends`
//! and `domain_intel/utils.py::get_epoch_ranges`. The averaging
//! denominator (`len - extreme_index + 1`, not the tail length) is an
//! off-by-one in the original; the design notes call for reproducing it
//! verbatim rather than correcting it.

use chrono::{Datelike, NaiveDate};

/// Which series a trend is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    PageViewsPerMillion,
    Rank,
}

/// Which extreme the delta measures toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Downtrend,
    Uptrend,
}

/// One day of a domain's traffic series, already parsed to numbers.
/// `None` means the field was empty in the source (not zero).
#[derive(Debug, Clone, Copy)]
pub struct TrafficPoint {
    pub ts: i64,
    pub page_views_per_million: Option<f64>,
    pub rank: Option<f64>,
}

impl TrafficPoint {
    fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::PageViewsPerMillion => self.page_views_per_million,
            Metric::Rank => self.rank,
        }
    }
}

/// `[start, end]` POSIX-second bounds for the month window ending the
/// last full calendar month before `today`, `months_back` months wide.
/// `months_back = 0` is the single prior month; `months_back = 2` is the
/// three-month window the reports call "3-month" (it spans the prior
/// month plus the two before it).
fn month_window(today: NaiveDate, months_back: u32) -> (i64, i64) {
    let first_of_this_month = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap();
    let end_month = first_of_this_month.pred_opt().unwrap();
    let start_month = floor_to_month_start(sub_months(end_month, months_back));
    (epoch_of(start_month), epoch_of(end_month))
}

fn sub_months(date: NaiveDate, months: u32) -> NaiveDate {
    let linear = date.year() as i64 * 12 + date.month0() as i64 - months as i64;
    let year = linear.div_euclid(12) as i32;
    let month0 = linear.rem_euclid(12) as u32;
    NaiveDate::from_ymd_opt(year, month0 + 1, date.day().min(28)).unwrap()
}

fn floor_to_month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap()
}

fn epoch_of(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp()
}

/// First occurrence of the max (or min) value, scanning in order — matches
/// Python's `max`/`min`, which keep the earliest element on a tie rather
/// than the last.
fn find_extreme(points: &[&TrafficPoint], metric: Metric, want_max: bool) -> (usize, f64) {
    let mut best_idx = 0;
    let mut best_val = points[0].value(metric).expect("pre-filtered to Some");
    for (i, p) in points.iter().enumerate().skip(1) {
        let v = p.value(metric).expect("pre-filtered to Some");
        if (want_max && v > best_val) || (!want_max && v < best_val) {
            best_idx = i;
            best_val = v;
        }
    }
    (best_idx, best_val)
}

/// The trend delta for `metric`/`direction` over the `months_back`
/// window ending the month before `today`. Points outside the window or
/// with no value for `metric` are dropped first; an empty result after
/// that yields `0.0`.
pub fn compute_delta(
    points: &[TrafficPoint],
    metric: Metric,
    direction: Direction,
    months_back: u32,
    today: NaiveDate,
) -> f64 {
    let (start, end) = month_window(today, months_back);

    let mut items: Vec<&TrafficPoint> = points
        .iter()
        .filter(|p| p.ts >= start && p.ts <= end)
        .filter(|p| p.value(metric).is_some())
        .collect();
    items.sort_by_key(|p| p.ts);

    if items.is_empty() {
        return 0.0;
    }

    // Page views trending down, or rank trending up (a rank going up
    // numerically means the site is doing worse), both look for the
    // maximum; the opposite pairing looks for the minimum.
    let want_max = matches!(
        (metric, direction),
        (Metric::PageViewsPerMillion, Direction::Downtrend) | (Metric::Rank, Direction::Uptrend)
    );
    let negator = if want_max { 1.0 } else { -1.0 };

    let (extreme_index, extreme_value) = find_extreme(&items, metric, want_max);

    let tail_total: f64 = items[extreme_index + 1..]
        .iter()
        .map(|p| p.value(metric).expect("pre-filtered to Some"))
        .sum();
    let denominator = (items.len() - extreme_index + 1) as f64;
    let average = tail_total / denominator;

    let delta = extreme_value - negator * average;
    (delta * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(ts: i64, page_views: f64, rank: f64) -> TrafficPoint {
        TrafficPoint { ts, page_views_per_million: Some(page_views), rank: Some(rank) }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_series_yields_zero() {
        let delta = compute_delta(&[], Metric::PageViewsPerMillion, Direction::Downtrend, 0, date(2017, 8, 4));
        assert_eq!(delta, 0.0);
    }

    #[test]
    fn month_window_zero_is_the_single_prior_month() {
        let (start, end) = month_window(date(2017, 8, 4), 0);
        assert_eq!(start, epoch_of(date(2017, 7, 1)));
        assert_eq!(end, epoch_of(date(2017, 7, 31)));
    }

    #[test]
    fn month_window_two_spans_three_months() {
        let (start, end) = month_window(date(2017, 8, 4), 2);
        assert_eq!(start, epoch_of(date(2017, 5, 1)));
        assert_eq!(end, epoch_of(date(2017, 7, 31)));
    }

    #[test]
    fn out_of_window_points_are_dropped() {
        let points = vec![
            day(epoch_of(date(2017, 1, 1)), 1000.0, 1.0),
            day(epoch_of(date(2017, 7, 10)), 10.0, 20.0),
            day(epoch_of(date(2017, 7, 20)), 5.0, 30.0),
        ];
        let delta = compute_delta(&points, Metric::PageViewsPerMillion, Direction::Downtrend, 0, date(2017, 8, 4));
        // extreme is the Jan point's neighbour is excluded; within-window max is 10.0 at idx 0,
        // tail = [5.0], denominator = 2 - 0 + 1 = 3, average = 5.0/3
        assert_eq!(delta, ((10.0_f64 - 5.0 / 3.0) * 100.0).round() / 100.0);
    }

    #[test]
    fn points_missing_the_metric_are_excluded() {
        let points = vec![
            TrafficPoint {
                ts: epoch_of(date(2017, 7, 10)),
                page_views_per_million: None,
                rank: Some(1.0),
            },
            day(epoch_of(date(2017, 7, 20)), 5.0, 30.0),
        ];
        let delta = compute_delta(&points, Metric::PageViewsPerMillion, Direction::Downtrend, 0, date(2017, 8, 4));
        assert_eq!(delta, 5.0);
    }
}
