//! The three derived computations over normalized tables.
//!
//! All three are pure and null-tolerant. Null policy is deliberate and
//! per-operation: sums treat null values as zero, mean/stddev exclude null
//! populations entirely, and the join treats a null year as a non-match.

use std::collections::HashMap;

use itertools::Itertools;

use crate::{data::Value, table::Table};

/// Closed year window the population statistics are computed over.
pub const POPULATION_WINDOW: (i64, i64) = (2013, 2018);

#[derive(Debug, Clone, PartialEq)]
pub struct PopulationStats {
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BestYearRow {
    pub series_id: String,
    pub year: i64,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinedReportRow {
    pub series_id: String,
    pub year: Option<i64>,
    pub period: String,
    pub value: Option<f64>,
    pub population: Option<f64>,
}

/// Mean and population standard deviation (divisor = N, not N-1) of
/// `population` for rows whose year falls in the closed window. Rows with a
/// null year or null population are excluded. An empty subset yields
/// `None` for both statistics.
pub fn population_stats(population: &Table, window: (i64, i64)) -> PopulationStats {
    let (Some(year_idx), Some(pop_idx)) = (
        population.column_index("year"),
        population.column_index("population"),
    ) else {
        return PopulationStats {
            mean: None,
            std_dev: None,
        };
    };

    let values: Vec<f64> = population
        .rows()
        .iter()
        .filter(|row| {
            row.get(year_idx)
                .and_then(|c| c.as_ref())
                .and_then(Value::as_i64)
                .is_some_and(|year| year >= window.0 && year <= window.1)
        })
        .filter_map(|row| {
            row.get(pop_idx)
                .and_then(|c| c.as_ref())
                .and_then(Value::as_f64)
        })
        .collect();

    if values.is_empty() {
        return PopulationStats {
            mean: None,
            std_dev: None,
        };
    }
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / count;
    PopulationStats {
        mean: Some(mean),
        std_dev: Some(variance.max(0.0).sqrt()),
    }
}

/// For each series, the year with the largest summed value. Rows missing
/// `series_id` or `year` are dropped before grouping; null values count as
/// zero inside a group's sum. Exactly equal sums resolve toward the larger
/// year, reproducing the observed behavior of the system this replaces.
pub fn best_year_per_series(time_series: &Table) -> Vec<BestYearRow> {
    let (Some(series_idx), Some(year_idx), Some(value_idx)) = (
        time_series.column_index("series_id"),
        time_series.column_index("year"),
        time_series.column_index("value"),
    ) else {
        return Vec::new();
    };

    let grouped = time_series
        .rows()
        .iter()
        .filter_map(|row| {
            let series = row
                .get(series_idx)
                .and_then(|c| c.as_ref())
                .and_then(Value::as_str)?;
            let year = row
                .get(year_idx)
                .and_then(|c| c.as_ref())
                .and_then(Value::as_i64)?;
            let value = row
                .get(value_idx)
                .and_then(|c| c.as_ref())
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            Some(((series.to_string(), year), value))
        })
        .into_group_map();

    let mut totals: Vec<((String, i64), f64)> = grouped
        .into_iter()
        .map(|(key, values)| (key, values.into_iter().sum()))
        .collect();
    totals.sort_by(|a, b| a.0.cmp(&b.0));

    let mut best: Vec<BestYearRow> = Vec::new();
    for ((series_id, year), total_value) in totals {
        match best.last_mut() {
            Some(current) if current.series_id == series_id => {
                // Iterating years ascending, so on an exact tie the later
                // year replaces the earlier one.
                if total_value > current.total_value
                    || (total_value == current.total_value && year > current.year)
                {
                    current.year = year;
                    current.total_value = total_value;
                }
            }
            _ => best.push(BestYearRow {
                series_id,
                year,
                total_value,
            }),
        }
    }
    best
}

/// Left-joins the `(series_id, period)` slice of the time series against
/// population by year. Every matching time-series row is retained in input
/// order; population is null when no year matches. An empty slice yields an
/// empty report.
pub fn point_join_report(
    time_series: &Table,
    population: &Table,
    series_id: &str,
    period: &str,
) -> Vec<JoinedReportRow> {
    let (Some(series_idx), Some(year_idx), Some(period_idx), Some(value_idx)) = (
        time_series.column_index("series_id"),
        time_series.column_index("year"),
        time_series.column_index("period"),
        time_series.column_index("value"),
    ) else {
        return Vec::new();
    };

    let population_by_year = population_lookup(population);

    time_series
        .rows()
        .iter()
        .filter(|row| {
            let matches_series = row
                .get(series_idx)
                .and_then(|c| c.as_ref())
                .and_then(Value::as_str)
                .is_some_and(|s| s == series_id);
            let matches_period = row
                .get(period_idx)
                .and_then(|c| c.as_ref())
                .and_then(Value::as_str)
                .is_some_and(|p| p == period);
            matches_series && matches_period
        })
        .map(|row| {
            let year = row
                .get(year_idx)
                .and_then(|c| c.as_ref())
                .and_then(Value::as_i64);
            JoinedReportRow {
                series_id: series_id.to_string(),
                year,
                period: period.to_string(),
                value: row
                    .get(value_idx)
                    .and_then(|c| c.as_ref())
                    .and_then(Value::as_f64),
                population: year.and_then(|y| population_by_year.get(&y).copied()),
            }
        })
        .collect()
}

fn population_lookup(population: &Table) -> HashMap<i64, f64> {
    let (Some(year_idx), Some(pop_idx)) = (
        population.column_index("year"),
        population.column_index("population"),
    ) else {
        return HashMap::new();
    };
    let mut lookup = HashMap::new();
    for row in population.rows() {
        let Some(year) = row
            .get(year_idx)
            .and_then(|c| c.as_ref())
            .and_then(Value::as_i64)
        else {
            continue;
        };
        let Some(value) = row
            .get(pop_idx)
            .and_then(|c| c.as_ref())
            .and_then(Value::as_f64)
        else {
            continue;
        };
        lookup.entry(year).or_insert(value);
    }
    lookup
}
