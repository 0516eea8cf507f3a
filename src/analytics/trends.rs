//! Synthetic daily series and trend analysis
//!
//! This module provides functionality for:
//! - Generating a smooth seasonal daily signal for a keyword
//! - Folding a series into a [`TrendSummary`]
//! - Computing trend direction and velocity with a least-squares slope

use chrono::{Datelike, Duration, NaiveDate};
use rand::Rng;
use statrs::distribution::Normal;
use statrs::statistics::Statistics;
use std::f64::consts::PI;

use crate::config::AnalysisConfig;
use crate::models::{PointDirection, TrendAnalysis, TrendDirection, TrendPoint, TrendSummary};

/// Shape of the synthetic seasonal signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesParams {
    pub base_volume: f64,
    pub monthly_amplitude: f64,
    pub weekday_amplitude: f64,
}

impl Default for SeriesParams {
    fn default() -> Self {
        Self {
            base_volume: 100.0,
            monthly_amplitude: 0.3,
            weekday_amplitude: 0.1,
        }
    }
}

impl From<&AnalysisConfig> for SeriesParams {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            base_volume: config.series_base_volume,
            monthly_amplitude: config.monthly_amplitude,
            weekday_amplitude: config.weekday_amplitude,
        }
    }
}

impl SeriesParams {
    /// Noise-free signal value on `date`
    pub fn signal(&self, date: NaiveDate) -> f64 {
        let month = f64::from(date.month());
        let weekday = f64::from(date.weekday().num_days_from_monday());

        let month_factor = 1.0 + self.monthly_amplitude * (2.0 * PI * month / 12.0).sin();
        let day_factor = 1.0 + self.weekday_amplitude * (2.0 * PI * weekday / 7.0).sin();

        (self.base_volume * month_factor * day_factor).max(0.0)
    }

    /// Integer volume on `date`, truncated like the persisted history
    pub fn volume(&self, date: NaiveDate) -> u64 {
        self.signal(date) as u64
    }
}

/// The `days` calendar dates ending the day before `end`
pub fn window_dates(days: u32, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (0..days).map(move |i| end - Duration::days(i64::from(days - i)))
}

/// Build `days` trend points walking backward from `end`
///
/// With `noise_ratio > 0` each point gets Gaussian noise with a standard
/// deviation of `noise_ratio` times its signal value.
pub fn generate_series<R: Rng + ?Sized>(
    days: u32,
    end: NaiveDate,
    params: &SeriesParams,
    noise_ratio: f64,
    rng: &mut R,
) -> Vec<TrendPoint> {
    let volumes: Vec<(NaiveDate, u64)> = window_dates(days, end)
        .map(|date| {
            let signal = params.signal(date);
            let noisy = match Normal::new(0.0, signal * noise_ratio) {
                Ok(normal) if noise_ratio > 0.0 && signal > 0.0 => {
                    signal + rng.sample(normal)
                }
                _ => signal,
            };
            (date, noisy.max(0.0) as u64)
        })
        .collect();

    points_from_volumes(&volumes)
}

/// Attach interest levels and day-over-day directions to raw volumes
///
/// Interest is the volume scaled to 0-100 against the window maximum.
pub fn points_from_volumes(volumes: &[(NaiveDate, u64)]) -> Vec<TrendPoint> {
    let peak = volumes.iter().map(|(_, v)| *v).fold(0, u64::max);

    let mut previous: Option<u64> = None;
    volumes
        .iter()
        .map(|&(date, search_volume)| {
            let interest_level = if peak == 0 {
                0
            } else {
                ((search_volume as f64 / peak as f64) * 100.0).round() as u8
            };
            let direction = match previous {
                Some(prev) if search_volume < prev => PointDirection::Down,
                _ => PointDirection::Up,
            };
            previous = Some(search_volume);

            TrendPoint {
                date,
                search_volume,
                interest_level,
                direction,
            }
        })
        .collect()
}

/// Fold a series into averages, extremes and volatility
///
/// Volatility is the sample standard deviation of volume over its mean.
pub fn summarize(points: &[TrendPoint]) -> TrendSummary {
    if points.is_empty() {
        return TrendSummary::default();
    }

    let volumes: Vec<f64> = points.iter().map(|p| p.search_volume as f64).collect();
    let interests: Vec<f64> = points.iter().map(|p| f64::from(p.interest_level)).collect();

    let average_volume = volumes.iter().mean();
    let peak_volume = volumes.iter().copied().fold(f64::MIN, f64::max);
    let min_volume = volumes.iter().copied().fold(f64::MAX, f64::min);
    let std_dev = if volumes.len() > 1 {
        volumes.iter().std_dev()
    } else {
        0.0
    };
    let volatility = if average_volume > 0.0 {
        std_dev / average_volume
    } else {
        0.0
    };

    TrendSummary {
        average_volume,
        peak_volume,
        min_volume,
        average_interest: interests.iter().mean(),
        volatility,
    }
}

/// Trend direction and velocity from a linear regression over the series
///
/// Velocity is the slope normalized by the mean and clamped to `[-1.0, 1.0]`.
/// Fewer than two points yield a stable zero velocity.
pub fn trend_direction(points: &[TrendPoint]) -> (TrendDirection, f64) {
    if points.len() < 2 {
        return (TrendDirection::Stable, 0.0);
    }

    let n = points.len() as f64;
    let xy: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.search_volume as f64))
        .collect();

    let sum_x: f64 = xy.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = xy.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = xy.iter().map(|(x, y)| x * y).sum();
    let sum_x2: f64 = xy.iter().map(|(x, _)| x * x).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return (TrendDirection::Stable, 0.0);
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denominator;

    let mean = sum_y / n;
    let velocity = if mean > 0.0 {
        (slope / mean).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    (TrendDirection::from_velocity(velocity), velocity)
}

/// Full trend analysis over an already generated series
pub fn analyze_series(keyword: &str, points: Vec<TrendPoint>) -> TrendAnalysis {
    let summary = summarize(&points);
    let (direction, velocity) = trend_direction(&points);
    let peak_date = points
        .iter()
        .fold(None::<&TrendPoint>, |best, p| match best {
            Some(b) if b.search_volume >= p.search_volume => Some(b),
            _ => Some(p),
        })
        .map(|p| p.date);

    TrendAnalysis {
        keyword: keyword.to_string(),
        days: points.len() as u32,
        points,
        summary,
        direction,
        velocity,
        peak_date,
    }
}
