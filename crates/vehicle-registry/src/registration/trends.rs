use super::metrics::{round2, TimelineEntry};
use super::plate::month_name;
use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;

/// Relative change between first and last point that still counts as flat.
const STABLE_BAND_PCT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Increasing => "Increasing",
            Self::Decreasing => "Decreasing",
            Self::Stable => "Stable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub label: String,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub yearly: Vec<TrendPoint>,
    pub monthly: Vec<TrendPoint>,
    pub avg_yearly_growth_rate: Option<f64>,
    pub avg_monthly_growth_rate: Option<f64>,
    pub peak_year: Option<TrendPoint>,
    pub peak_month: Option<TrendPoint>,
    pub monthly_average: Option<f64>,
    pub trend_direction: TrendDirection,
    pub trend_direction_label: &'static str,
}

impl TrendSummary {
    /// `true` when the peak month is the given calendar month.
    pub fn is_peak_month(&self, year: i32, month: u32) -> bool {
        self.peak_month
            .as_ref()
            .is_some_and(|peak| peak.year == year && peak.month == Some(month))
    }
}

pub fn compute_trends(timeline: &[TimelineEntry]) -> TrendSummary {
    let mut by_year: BTreeMap<i32, usize> = BTreeMap::new();
    let mut by_month: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for entry in timeline {
        *by_year.entry(entry.at.year()).or_default() += 1;
        *by_month
            .entry((entry.at.year(), entry.at.month()))
            .or_default() += 1;
    }

    let yearly: Vec<TrendPoint> = year_span(&by_year)
        .map(|year| TrendPoint {
            label: year.to_string(),
            year,
            month: None,
            count: by_year.get(&year).copied().unwrap_or(0),
        })
        .collect();

    let monthly: Vec<TrendPoint> = month_span(&by_month)
        .map(|(year, month)| TrendPoint {
            label: format!("{} {year}", month_name(month)),
            year,
            month: Some(month),
            count: by_month.get(&(year, month)).copied().unwrap_or(0),
        })
        .collect();

    let yearly_counts = counts(&yearly);
    let monthly_counts = counts(&monthly);

    let monthly_average = if monthly_counts.is_empty() {
        None
    } else {
        let sum: usize = monthly_counts.iter().sum();
        Some((sum as f64 / monthly_counts.len() as f64).round())
    };

    let direction_series = if monthly_counts.len() >= 2 {
        &monthly_counts
    } else {
        &yearly_counts
    };
    let trend_direction = trend_direction(direction_series);

    TrendSummary {
        avg_yearly_growth_rate: average_growth_rate(&yearly_counts),
        avg_monthly_growth_rate: average_growth_rate(&monthly_counts),
        peak_year: peak(&yearly),
        peak_month: peak(&monthly),
        yearly,
        monthly,
        monthly_average,
        trend_direction,
        trend_direction_label: trend_direction.label(),
    }
}

/// Every year from the first to the last bucket, empty years included.
fn year_span(by_year: &BTreeMap<i32, usize>) -> impl Iterator<Item = i32> {
    let first = by_year.keys().next().copied();
    let last = by_year.keys().next_back().copied();
    first.zip(last).into_iter().flat_map(|(first, last)| first..=last)
}

/// Every calendar month from the first to the last bucket, empty months included.
fn month_span(by_month: &BTreeMap<(i32, u32), usize>) -> impl Iterator<Item = (i32, u32)> {
    let index = |(year, month): (i32, u32)| i64::from(year) * 12 + i64::from(month) - 1;
    let first = by_month.keys().next().copied().map(index);
    let last = by_month.keys().next_back().copied().map(index);
    first
        .zip(last)
        .into_iter()
        .flat_map(|(first, last)| first..=last)
        .filter_map(|slot| {
            let year = i32::try_from(slot.div_euclid(12)).ok()?;
            let month = u32::try_from(slot.rem_euclid(12)).ok()? + 1;
            Some((year, month))
        })
}

fn counts(points: &[TrendPoint]) -> Vec<usize> {
    points.iter().map(|point| point.count).collect()
}

/// Mean of pairwise growth; pairs starting from zero are left out entirely.
pub fn average_growth_rate(series: &[usize]) -> Option<f64> {
    let rates: Vec<f64> = series
        .windows(2)
        .filter_map(|pair| match pair {
            [prev, curr] if *prev > 0 => {
                Some((*curr as f64 - *prev as f64) / *prev as f64 * 100.0)
            }
            _ => None,
        })
        .collect();

    if rates.is_empty() {
        return None;
    }
    Some(round2(rates.iter().sum::<f64>() / rates.len() as f64))
}

/// First point carrying the maximum count.
fn peak(points: &[TrendPoint]) -> Option<TrendPoint> {
    points
        .iter()
        .fold(None::<&TrendPoint>, |best, point| match best {
            Some(current) if current.count >= point.count => Some(current),
            _ => Some(point),
        })
        .cloned()
}

pub fn trend_direction(series: &[usize]) -> TrendDirection {
    let (Some(&first), Some(&last)) = (series.first(), series.last()) else {
        return TrendDirection::Stable;
    };
    if series.len() < 2 || (first == 0 && last == 0) {
        return TrendDirection::Stable;
    }
    if first == 0 {
        return TrendDirection::Increasing;
    }

    let change = (last as f64 - first as f64) / first as f64 * 100.0;
    if change > STABLE_BAND_PCT {
        TrendDirection::Increasing
    } else if change < -STABLE_BAND_PCT {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}
