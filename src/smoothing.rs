//! Score smoothing for the plotted event curve.
//!
//! Two strategies share one contract: output has the same length as the
//! input and is a pure function of `(values, window_size)`.
//!
//! - **Moving average**: plain mean over a window centred on each sample,
//!   shortened at the sequence boundaries (no padding)
//! - **Gaussian**: samples weighted towards the window centre. The weighted
//!   sum is divided by the sample count, not by the sum of weights, so the
//!   output is scaled down relative to a true weighted mean.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;

pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Peak position of the Gaussian kernel on the normalized window `[0, 1]`
const GAUSSIAN_PEAK: f64 = 0.5;
const GAUSSIAN_STD_DEV: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingStrategy {
    MovingAverage,
    #[default]
    Gaussian,
}

impl SmoothingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmoothingStrategy::MovingAverage => "moving_average",
            SmoothingStrategy::Gaussian => "gaussian",
        }
    }
}

impl fmt::Display for SmoothingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SmoothingStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "moving_average" => Ok(SmoothingStrategy::MovingAverage),
            "gaussian" => Ok(SmoothingStrategy::Gaussian),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default)]
    pub strategy: SmoothingStrategy,
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            strategy: SmoothingStrategy::default(),
        }
    }
}

impl SmoothingConfig {
    pub fn smooth(&self, values: &[f64]) -> Vec<f64> {
        smooth(values, self.window_size, self.strategy)
    }
}

/// Smooth `values` with the given strategy
pub fn smooth(values: &[f64], window_size: usize, strategy: SmoothingStrategy) -> Vec<f64> {
    match strategy {
        SmoothingStrategy::MovingAverage => moving_average(values, window_size),
        SmoothingStrategy::Gaussian => gaussian_smooth(values, window_size),
    }
}

/// Mean over `[i - w/2, i + w - w/2)` clipped to the sequence.
/// A zero window behaves like a window of one.
pub fn moving_average(values: &[f64], window_size: usize) -> Vec<f64> {
    let window = window_size.max(1);
    let before = window / 2;
    let after = window - before;

    let mut prefix = Vec::with_capacity(values.len() + 1);
    prefix.push(0.0);
    for value in values {
        prefix.push(prefix[prefix.len() - 1] + value);
    }

    (0..values.len())
        .map(|i| {
            let from = i.saturating_sub(before);
            let to = (i + after).min(values.len());
            (prefix[to] - prefix[from]) / (to - from) as f64
        })
        .collect()
}

/// Kernel weights for a window of `n` samples: sample `j` sits at `j / n`
pub fn gaussian_weights(n: usize) -> Vec<f64> {
    (0..n)
        .map(|j| {
            let x = j as f64 / n as f64;
            (-((x - GAUSSIAN_PEAK).powi(2)) / (2.0 * GAUSSIAN_STD_DEV.powi(2))).exp()
        })
        .collect()
}

/// Weighted sum of `window` divided by its length; 0 for an empty window
pub fn gaussian_average(window: &[f64]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let total: f64 = window
        .iter()
        .zip(gaussian_weights(window.len()))
        .map(|(value, weight)| value * weight)
        .sum();
    total / window.len() as f64
}

/// Gaussian average over `[i - w/2, i + w/2)` clipped to the sequence.
/// Windows narrower than one sample are widened to `[i, i + 1)`.
pub fn gaussian_smooth(values: &[f64], window_size: usize) -> Vec<f64> {
    let offset = window_size / 2;
    (0..values.len())
        .map(|i| {
            let from = i.saturating_sub(offset);
            let to = (i + offset).min(values.len()).max(i + 1);
            gaussian_average(&values[from..to])
        })
        .collect()
}
