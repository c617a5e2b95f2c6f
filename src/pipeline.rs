//! End-to-end pipeline orchestration.
//!
//! A run is synchronous and all-or-nothing up to artifact emission: fetch
//! and parse failures abort immediately with context, while output-store
//! failures are demoted to warnings because the in-memory computation has
//! already succeeded and the local artifacts are already on disk.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    aggregate::{self, POPULATION_WINDOW},
    decode, normalize, report,
    sniff::{self, DelimitedMode},
    store::ObjectStore,
    table::Table,
};

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub bucket: String,
    pub time_series_key: String,
    pub population_key: String,
    pub results_prefix: String,
    pub series_id: String,
    pub period: String,
    /// Local directory artifacts are written to before being stored.
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub time_series_rows: usize,
    pub population_rows: usize,
    pub best_year_rows: usize,
    pub joined_rows: usize,
    pub stored_artifacts: Vec<String>,
}

pub fn execute(store: &dyn ObjectStore, config: &RunConfig) -> Result<RunSummary> {
    let time_series = load_time_series(store, config)?;
    let population = load_population(store, config)?;
    info!(
        "Normalized {} time-series row(s) and {} population row(s)",
        time_series.len(),
        population.len()
    );

    let stats = aggregate::population_stats(&population, POPULATION_WINDOW);
    let best_years = aggregate::best_year_per_series(&time_series);
    let joined = aggregate::point_join_report(
        &time_series,
        &population,
        &config.series_id,
        &config.period,
    );
    info!(
        "Computed best year for {} series and {} joined row(s) for {}/{}",
        best_years.len(),
        joined.len(),
        config.series_id,
        config.period
    );

    let artifacts = [
        (
            report::BEST_YEAR_ARTIFACT.to_string(),
            report::best_year_csv(&best_years)?,
        ),
        (
            report::POPULATION_STATS_ARTIFACT.to_string(),
            report::population_stats_text(&stats),
        ),
        (
            report::joined_artifact_name(&config.series_id, &config.period),
            report::joined_report_csv(&joined)?,
        ),
    ];

    if let Some(dir) = &config.output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Creating output directory {dir:?}"))?;
        for (name, bytes) in &artifacts {
            let path = dir.join(name);
            fs::write(&path, bytes).with_context(|| format!("Writing artifact {path:?}"))?;
            info!("Wrote local artifact {path:?}");
        }
    }

    let mut stored_artifacts = Vec::new();
    for (name, bytes) in &artifacts {
        let key = format!("{}{}", config.results_prefix, name);
        match store.store(&config.bucket, &key, bytes) {
            Ok(()) => {
                info!("Stored artifact '{}' in bucket '{}'", key, config.bucket);
                stored_artifacts.push(key);
            }
            // The computation already succeeded; a store failure must not
            // roll it back.
            Err(err) => warn!("Failed to store artifact '{key}': {err}"),
        }
    }

    Ok(RunSummary {
        time_series_rows: time_series.len(),
        population_rows: population.len(),
        best_year_rows: best_years.len(),
        joined_rows: joined.len(),
        stored_artifacts,
    })
}

fn load_time_series(store: &dyn ObjectStore, config: &RunConfig) -> Result<Table> {
    let bytes = store
        .fetch(&config.bucket, &config.time_series_key)
        .with_context(|| {
            format!(
                "Fetching time series '{}' from bucket '{}'",
                config.time_series_key, config.bucket
            )
        })?;
    let text = decode::decode_bytes(&bytes);
    let table = sniff::sniff(&text, DelimitedMode::DelimiterCandidates)
        .with_context(|| format!("Parsing time series '{}'", config.time_series_key))?;
    info!(
        "Sniffed time series '{}': {} row(s), columns {:?}",
        config.time_series_key,
        table.len(),
        table.columns()
    );
    normalize::normalize(table, &normalize::TIME_SERIES_SPEC, None)
        .with_context(|| format!("Normalizing time series '{}'", config.time_series_key))
}

fn load_population(store: &dyn ObjectStore, config: &RunConfig) -> Result<Table> {
    let bytes = store
        .fetch(&config.bucket, &config.population_key)
        .with_context(|| {
            format!(
                "Fetching population data '{}' from bucket '{}'",
                config.population_key, config.bucket
            )
        })?;
    let text = decode::decode_bytes(&bytes);
    let table = sniff::sniff(&text, DelimitedMode::GuardedComma)
        .with_context(|| format!("Parsing population data '{}'", config.population_key))?;
    let table = sniff::expand_embedded_rows(table);
    info!(
        "Sniffed population data '{}': {} row(s), columns {:?}",
        config.population_key,
        table.len(),
        table.columns()
    );
    let filter = normalize::nation_filter(&table);
    normalize::normalize(table, &normalize::POPULATION_SPEC, filter.as_ref())
        .with_context(|| format!("Normalizing population data '{}'", config.population_key))
}
