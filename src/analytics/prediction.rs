//! Polynomial performance predictor
//!
//! Fits a low-order least-squares polynomial to a daily history and projects
//! it forward. Confidence is a signal-to-noise heuristic, not a p-value:
//! `100 - std(residuals) / mean(history) * 100`, clamped to `[0, 100]`.

use chrono::{Duration, NaiveDate};
use rand::Rng;
use statrs::distribution::Normal;
use statrs::statistics::Statistics;

use crate::models::{PredictedTrend, Prediction};

/// Default polynomial degree
pub const DEFAULT_DEGREE: usize = 2;

/// Least-squares polynomial over a normalised abscissa
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    /// Coefficients, lowest order first, in normalised units
    coefficients: Vec<f64>,
    shift: f64,
    scale: f64,
}

impl Polynomial {
    /// Fit a polynomial of `degree` through `(xs[i], ys[i])`
    ///
    /// Returns `None` when there are too few points or the system is singular.
    pub fn fit(xs: &[f64], ys: &[f64], degree: usize) -> Option<Self> {
        if xs.len() != ys.len() || xs.len() <= degree {
            return None;
        }

        let lo = xs.iter().copied().fold(f64::MAX, f64::min);
        let hi = xs.iter().copied().fold(f64::MIN, f64::max);
        let shift = (hi + lo) / 2.0;
        let scale = if hi > lo { (hi - lo) / 2.0 } else { 1.0 };

        let size = degree + 1;
        let mut matrix = vec![vec![0.0; size + 1]; size];
        for (&x, &y) in xs.iter().zip(ys) {
            let t = (x - shift) / scale;
            let powers: Vec<f64> = (0..=2 * degree).map(|p| t.powi(p as i32)).collect();
            for (row, line) in matrix.iter_mut().enumerate() {
                for col in 0..size {
                    line[col] += powers[row + col];
                }
                line[size] += y * powers[row];
            }
        }

        let coefficients = solve(matrix)?;
        Some(Self {
            coefficients,
            shift,
            scale,
        })
    }

    /// Evaluate at `x`
    pub fn eval(&self, x: f64) -> f64 {
        let t = (x - self.shift) / self.scale;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * t + c)
    }
}

/// Gaussian elimination with partial pivoting on an augmented matrix
fn solve(mut m: Vec<Vec<f64>>) -> Option<Vec<f64>> {
    let n = m.len();

    for col in 0..n {
        let pivot = (col..n).max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))?;
        if m[pivot][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            for k in col..=n {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| m[row][k] * solution[k]).sum();
        solution[row] = (m[row][n] - tail) / m[row][row];
    }

    Some(solution)
}

/// Synthetic daily history around `base` with Gaussian noise
///
/// Noise has a standard deviation of `noise_ratio * base`; values are floored
/// at zero and truncated to whole searches.
pub fn synthetic_history<R: Rng + ?Sized>(
    base: f64,
    days: usize,
    noise_ratio: f64,
    rng: &mut R,
) -> Vec<f64> {
    let normal = if base > 0.0 && noise_ratio > 0.0 {
        Normal::new(0.0, base * noise_ratio).ok()
    } else {
        None
    };

    (0..days)
        .map(|_| {
            let noise = normal.as_ref().map(|n| rng.sample(n)).unwrap_or(0.0);
            (base + noise).max(0.0).trunc()
        })
        .collect()
}

/// Project `history` forward `months * 30` days starting at `today`
///
/// Returns `None` if the history is too short for the fit.
pub fn predict_from_history(
    keyword: &str,
    history: &[f64],
    months: u32,
    degree: usize,
    today: NaiveDate,
) -> Option<Prediction> {
    let xs: Vec<f64> = (0..history.len()).map(|i| i as f64).collect();
    let polynomial = Polynomial::fit(&xs, history, degree)?;

    let horizon = months as usize * 30;
    let start = history.len();
    let predicted_volumes: Vec<f64> = (start..start + horizon)
        .map(|x| polynomial.eval(x as f64))
        .collect();

    let current_volume = history.last().copied().unwrap_or(0.0);
    let predicted_trend = match predicted_volumes.last() {
        Some(&last) if last > current_volume => PredictedTrend::Increasing,
        _ => PredictedTrend::Decreasing,
    };

    let residuals: Vec<f64> = xs
        .iter()
        .zip(history)
        .map(|(&x, &y)| y - polynomial.eval(x))
        .collect();

    let prediction_dates = (0..horizon)
        .map(|i| today + Duration::days(i as i64))
        .collect();

    Some(Prediction {
        keyword: keyword.to_string(),
        current_volume,
        predicted_volumes,
        predicted_trend,
        confidence: confidence(&residuals, history),
        prediction_dates,
    })
}

/// Bounded signal-to-noise confidence in `[0, 100]`
pub fn confidence(residuals: &[f64], history: &[f64]) -> f64 {
    if history.is_empty() {
        return 0.0;
    }

    let mean = history.iter().mean();
    if mean <= 0.0 {
        return 0.0;
    }

    let std_error = residuals.iter().population_std_dev();
    let value = 100.0 - std_error / mean * 100.0;
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
