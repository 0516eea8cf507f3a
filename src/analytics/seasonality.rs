//! Seasonal profiles and posting schedules

use chrono::{Datelike, NaiveDate};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

use super::trends::{window_dates, SeriesParams};
use crate::models::{PostingFrequency, PostingSchedule, SeasonalProfile};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Daily coefficient of variation below which daily posting is advised
const DAILY_POSTING_CV: f64 = 0.3;

pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("Unknown")
}

pub fn day_name(weekday: u32) -> &'static str {
    DAY_NAMES.get(weekday as usize).copied().unwrap_or("Unknown")
}

/// Seasonal profile of the synthetic signal over the `days` before `end`
pub fn detect_seasonality(
    keyword: &str,
    days: u32,
    end: NaiveDate,
    params: &SeriesParams,
) -> Option<SeasonalProfile> {
    let observations: Vec<(NaiveDate, f64)> = window_dates(days, end)
        .map(|date| (date, params.volume(date) as f64))
        .collect();

    profile_from_observations(keyword, &observations)
}

/// Group observations by month and weekday and derive the profile
///
/// Returns `None` when there are no observations.
pub fn profile_from_observations(
    keyword: &str,
    observations: &[(NaiveDate, f64)],
) -> Option<SeasonalProfile> {
    if observations.is_empty() {
        return None;
    }

    let monthly_pattern = group_mean(observations.iter().map(|(d, v)| (d.month(), *v)));
    let daily_pattern = group_mean(
        observations
            .iter()
            .map(|(d, v)| (d.weekday().num_days_from_monday(), *v)),
    );

    let monthly_values: Vec<f64> = monthly_pattern.values().copied().collect();
    let highest = monthly_values.iter().copied().fold(f64::MIN, f64::max);
    let lowest = monthly_values.iter().copied().fold(f64::MAX, f64::min);
    let mean = monthly_values.iter().mean();
    let seasonality_strength = if mean > 0.0 {
        (highest - lowest) / mean
    } else {
        0.0
    };

    let peak_months = ranked_keys(&monthly_pattern, true, 3);
    let low_months = ranked_keys(&monthly_pattern, false, 3);
    let recommendation = recommend_posting_schedule(&monthly_pattern, &daily_pattern);

    Some(SeasonalProfile {
        keyword: keyword.to_string(),
        monthly_pattern,
        daily_pattern,
        seasonality_strength,
        peak_months,
        low_months,
        recommendation,
    })
}

/// Best month and weekday, months to avoid, and posting cadence
pub fn recommend_posting_schedule(
    monthly: &BTreeMap<u32, f64>,
    daily: &BTreeMap<u32, f64>,
) -> PostingSchedule {
    let best_month = ranked_keys(monthly, true, 1).first().copied().unwrap_or(0);
    let best_day = ranked_keys(daily, true, 1).first().copied().unwrap_or(u32::MAX);
    let avoid_months = ranked_keys(monthly, false, 2)
        .into_iter()
        .map(|m| month_name(m).to_string())
        .collect();

    let daily_values: Vec<f64> = daily.values().copied().collect();
    let daily_mean = daily_values.iter().mean();
    // Fewer than two weekdays leaves the deviation undefined; NaN compares false.
    let daily_std = daily_values.iter().std_dev();
    let posting_frequency = if daily_std < daily_mean * DAILY_POSTING_CV {
        PostingFrequency::Daily
    } else {
        PostingFrequency::Regular
    };

    PostingSchedule {
        best_month: month_name(best_month).to_string(),
        best_day: day_name(best_day).to_string(),
        avoid_months,
        posting_frequency,
    }
}

fn group_mean(values: impl Iterator<Item = (u32, f64)>) -> BTreeMap<u32, f64> {
    let mut groups: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for (key, value) in values {
        let entry = groups.entry(key).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(key, (sum, count))| (key, sum / count as f64))
        .collect()
}

/// Keys ordered by value, ties kept in ascending key order
fn ranked_keys(pattern: &BTreeMap<u32, f64>, descending: bool, n: usize) -> Vec<u32> {
    let mut entries: Vec<(u32, f64)> = pattern.iter().map(|(k, v)| (*k, *v)).collect();
    entries.sort_by(|a, b| {
        let ord = a.1.total_cmp(&b.1);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
    entries.into_iter().take(n).map(|(k, _)| k).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    #[test]
    fn test_full_year_profile() {
        let profile = detect_seasonality("rust", 365, end(), &SeriesParams::default()).unwrap();

        assert_eq!(profile.monthly_pattern.len(), 12);
        assert_eq!(profile.daily_pattern.len(), 7);
        assert_eq!(profile.peak_months[0], 3);
        assert_eq!(profile.low_months[0], 9);
        assert_eq!(profile.peak_months.len(), 3);
        assert!(profile.seasonality_strength > 0.5 && profile.seasonality_strength < 0.7);

        let schedule = &profile.recommendation;
        assert_eq!(schedule.best_month, "Mar");
        assert_eq!(schedule.best_day, "Wednesday");
        assert_eq!(schedule.avoid_months[0], "Sep");
        assert_eq!(schedule.avoid_months.len(), 2);
        assert_eq!(schedule.posting_frequency, PostingFrequency::Daily);
    }

    #[test]
    fn test_strength_invariant_under_scaling() {
        let profile = detect_seasonality("rust", 365, end(), &SeriesParams::default()).unwrap();
        let observations: Vec<(NaiveDate, f64)> = window_dates(365, end())
            .map(|d| (d, SeriesParams::default().volume(d) as f64))
            .collect();

        for factor in [0.5, 3.0, 1000.0] {
            let scaled: Vec<_> = observations.iter().map(|(d, v)| (*d, v * factor)).collect();
            let scaled_profile = profile_from_observations("rust", &scaled).unwrap();
            assert!(
                (scaled_profile.seasonality_strength - profile.seasonality_strength).abs() < 1e-9
            );
            assert_eq!(scaled_profile.peak_months, profile.peak_months);
        }
    }

    #[test]
    fn test_flat_series_has_zero_strength() {
        let params = SeriesParams {
            base_volume: 50.0,
            monthly_amplitude: 0.0,
            weekday_amplitude: 0.0,
        };
        let profile = detect_seasonality("flat", 365, end(), &params).unwrap();
        assert_eq!(profile.seasonality_strength, 0.0);
        assert_eq!(profile.recommendation.best_month, "Jan");
        assert_eq!(profile.recommendation.posting_frequency, PostingFrequency::Daily);
    }

    #[test]
    fn test_empty_observations() {
        assert!(profile_from_observations("none", &[]).is_none());
        assert!(detect_seasonality("none", 0, end(), &SeriesParams::default()).is_none());
    }

    #[test]
    fn test_names() {
        assert_eq!(month_name(1), "Jan");
        assert_eq!(month_name(12), "Dec");
        assert_eq!(month_name(0), "Unknown");
        assert_eq!(day_name(6), "Sunday");
    }
}
