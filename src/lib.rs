pub mod aggregate;
pub mod cli;
pub mod data;
pub mod decode;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod sniff;
pub mod store;
pub mod table;

use std::{env, fs, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands, SniffProfile},
    sniff::DelimitedMode,
    store::FsStore,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("series_report", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Report(args) => handle_report(&args),
        Commands::Sniff(args) => handle_sniff(&args),
    }
}

fn handle_report(args: &cli::ReportArgs) -> Result<()> {
    info!(
        "Running report for bucket '{}' ({} + {})",
        args.bucket, args.time_series_key, args.population_key
    );
    let store = FsStore::new(&args.store_root);
    let config = pipeline::RunConfig {
        bucket: args.bucket.clone(),
        time_series_key: args.time_series_key.clone(),
        population_key: args.population_key.clone(),
        results_prefix: args.results_prefix.clone(),
        series_id: args.series_id.clone(),
        period: args.period.clone(),
        output_dir: args.output_dir.clone(),
    };
    let summary = pipeline::execute(&store, &config)
        .with_context(|| format!("Running pipeline for bucket '{}'", args.bucket))?;
    info!(
        "Run complete: {} time-series row(s), {} population row(s), {} artifact(s) stored",
        summary.time_series_rows,
        summary.population_rows,
        summary.stored_artifacts.len()
    );
    Ok(())
}

fn handle_sniff(args: &cli::SniffArgs) -> Result<()> {
    let bytes = fs::read(&args.input)
        .with_context(|| format!("Reading input file {:?}", args.input))?;
    let text = decode::decode_bytes(&bytes);
    let mode = match args.profile {
        SniffProfile::Series => DelimitedMode::DelimiterCandidates,
        SniffProfile::Population => DelimitedMode::GuardedComma,
    };
    let table = sniff::sniff(&text, mode)
        .with_context(|| format!("Sniffing {:?}", args.input))?;
    print!("{}", table::render_preview(&table, args.limit));
    info!(
        "Detected {} row(s) across {} column(s) in {:?}",
        table.len(),
        table.columns().len(),
        args.input
    );
    Ok(())
}
