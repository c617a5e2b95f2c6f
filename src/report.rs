//! Artifact serialization.
//!
//! The byte layout of each artifact is a compatibility contract with the
//! system this pipeline replaces: fixed headers, no index column, UTF-8,
//! floats written with a trailing `.0` when integral.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::aggregate::{BestYearRow, JoinedReportRow, PopulationStats};

pub const BEST_YEAR_ARTIFACT: &str = "best_year_per_series.csv";
pub const POPULATION_STATS_ARTIFACT: &str = "population_stats_2013_2018.txt";

pub fn joined_artifact_name(series_id: &str, period: &str) -> String {
    format!("{series_id}_{period}_joined.csv")
}

#[derive(Serialize)]
struct BestYearRecord<'a> {
    series_id: &'a str,
    year: i64,
    value: f64,
}

#[derive(Serialize)]
struct JoinedRecord<'a> {
    series_id: &'a str,
    year: Option<i64>,
    period: &'a str,
    value: Option<f64>,
    #[serde(rename = "Population")]
    population: Option<f64>,
}

pub fn best_year_csv(rows: &[BestYearRow]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        for row in rows {
            writer
                .serialize(BestYearRecord {
                    series_id: &row.series_id,
                    year: row.year,
                    value: row.total_value,
                })
                .context("Serializing best-year row")?;
        }
        writer.flush().context("Flushing best-year report")?;
    }
    Ok(or_header(buffer, "series_id,year,value\n"))
}

pub fn joined_report_csv(rows: &[JoinedReportRow]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        for row in rows {
            writer
                .serialize(JoinedRecord {
                    series_id: &row.series_id,
                    year: row.year,
                    period: &row.period,
                    value: row.value,
                    population: row.population,
                })
                .context("Serializing joined report row")?;
        }
        writer.flush().context("Flushing joined report")?;
    }
    Ok(or_header(buffer, "series_id,year,period,value,Population\n"))
}

pub fn population_stats_text(stats: &PopulationStats) -> Vec<u8> {
    format!(
        "Mean_population_2013_2018,{}\nStdDev_population_2013_2018,{}\n",
        format_stat(stats.mean),
        format_stat(stats.std_dev)
    )
    .into_bytes()
}

fn format_stat(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 && v.is_finite() => format!("{v:.1}"),
        Some(v) => v.to_string(),
        None => "NaN".to_string(),
    }
}

/// Serde-driven headers only appear once a row is written, so header-only
/// artifacts fall back to the literal header line.
fn or_header(bytes: Vec<u8>, header: &str) -> Vec<u8> {
    if bytes.is_empty() {
        header.as_bytes().to_vec()
    } else {
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_year_artifact_matches_contract() {
        let rows = vec![BestYearRow {
            series_id: "PRS30006011".to_string(),
            year: 2022,
            total_value: 20.5,
        }];
        let bytes = best_year_csv(&rows).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "series_id,year,value\nPRS30006011,2022,20.5\n"
        );
    }

    #[test]
    fn joined_artifact_writes_empty_cells_for_null_population() {
        let rows = vec![JoinedReportRow {
            series_id: "PRS30006032".to_string(),
            year: Some(2015),
            period: "Q01".to_string(),
            value: Some(3.2),
            population: None,
        }];
        let bytes = joined_report_csv(&rows).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "series_id,year,period,value,Population\nPRS30006032,2015,Q01,3.2,\n"
        );
    }

    #[test]
    fn empty_join_still_emits_the_header() {
        let bytes = joined_report_csv(&[]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "series_id,year,period,value,Population\n"
        );
    }

    #[test]
    fn stats_artifact_is_two_labelled_lines() {
        let stats = PopulationStats {
            mean: Some(317_437_383.0),
            std_dev: Some(4_257_089.541_529_413),
        };
        let text = String::from_utf8(population_stats_text(&stats)).unwrap();
        assert_eq!(
            text,
            "Mean_population_2013_2018,317437383.0\nStdDev_population_2013_2018,4257089.541529413\n"
        );
    }

    #[test]
    fn undefined_stats_render_as_nan() {
        let stats = PopulationStats {
            mean: None,
            std_dev: None,
        };
        let text = String::from_utf8(population_stats_text(&stats)).unwrap();
        assert!(text.starts_with("Mean_population_2013_2018,NaN\n"));
    }
}
