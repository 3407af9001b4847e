//! Distribution volume over time.

use crate::analytics::PredictionConfig;
use crate::partition::Distribution;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Longest run of calendar days the daily series covers.
pub const TREND_WINDOW_DAYS: i64 = 366;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    /// One entry per calendar day up to the last distribution, covering at
    /// most [`TREND_WINDOW_DAYS`].
    pub daily: Vec<DailyVolume>,
    pub mean_daily: f64,
    /// Least-squares slope in units per day.
    pub slope: f64,
    pub direction: TrendDirection,
    /// Days whose volume sits `z_threshold` standard deviations above the mean.
    pub spikes: Vec<DailyVolume>,
}

/// Daily totals with empty days filled in. Days older than
/// [`TREND_WINDOW_DAYS`] before the last distribution are left out.
pub fn daily_volumes(distributions: &[Distribution]) -> Vec<DailyVolume> {
    let mut totals: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for d in distributions {
        *totals.entry(d.date).or_insert(0) += i64::from(d.quantity);
    }

    let (first, last) = match (totals.keys().next(), totals.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Vec::new(),
    };

    let window_start = last
        .checked_sub_signed(Duration::days(TREND_WINDOW_DAYS - 1))
        .unwrap_or(first);

    first
        .max(window_start)
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|date| DailyVolume {
            date,
            quantity: totals.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

pub fn analyze_trend(distributions: &[Distribution], config: &PredictionConfig) -> TrendAnalysis {
    let daily = daily_volumes(distributions);
    let values: Vec<f64> = daily.iter().map(|d| d.quantity as f64).collect();

    let mean_daily = mean(&values);
    let slope = slope(&values);

    let direction = if values.len() < 2 {
        TrendDirection::InsufficientData
    } else if mean_daily <= f64::EPSILON || (slope / mean_daily).abs() < config.stable_band {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };

    let sd = stddev_sample(&values, mean_daily);
    let spikes = if values.len() < 3 || sd <= f64::EPSILON {
        Vec::new()
    } else {
        daily
            .iter()
            .filter(|d| (d.quantity as f64 - mean_daily) / sd >= config.z_threshold)
            .cloned()
            .collect()
    };

    TrendAnalysis {
        daily,
        mean_daily,
        slope,
        direction,
        spikes,
    }
}

pub(crate) fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / (xs.len() as f64)
}

/// Sample standard deviation (n-1).
pub(crate) fn stddev_sample(xs: &[f64], mean: f64) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let var = xs
        .iter()
        .map(|x| {
            let d = x - mean;
            d * d
        })
        .sum::<f64>()
        / ((xs.len() - 1) as f64);
    var.sqrt()
}

/// Least-squares slope of `ys` against their index.
pub(crate) fn slope(ys: &[f64]) -> f64 {
    let n = ys.len();
    if n < 2 {
        return 0.0;
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(ys);

    let (num, den) = ys
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });

    if den <= f64::EPSILON {
        0.0
    } else {
        num / den
    }
}
