use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about = "Ingest loosely-formatted tabular datasets and emit derived reports", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full pipeline: fetch, sniff, normalize, aggregate, emit
    Report(ReportArgs),
    /// Diagnose the format of a single local file and preview the parsed table
    Sniff(SniffArgs),
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Root directory of the filesystem-backed object store
    #[arg(long = "store-root", default_value = ".")]
    pub store_root: PathBuf,
    /// Bucket holding the source objects and the results prefix
    #[arg(short, long)]
    pub bucket: String,
    /// Key of the quarterly time-series source
    #[arg(long = "time-series-key", default_value = "pr.data.0.Current")]
    pub time_series_key: String,
    /// Key of the annual population source
    #[arg(long = "population-key", default_value = "us_population.json")]
    pub population_key: String,
    /// Key prefix output artifacts are stored under
    #[arg(long = "results-prefix", default_value = "results/")]
    pub results_prefix: String,
    /// Series identifier for the point join report
    #[arg(long = "series-id", default_value = "PRS30006032")]
    pub series_id: String,
    /// Period for the point join report
    #[arg(long, default_value = "Q01")]
    pub period: String,
    /// Also write artifacts to this local directory
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SniffProfile {
    /// Delimited-text fallback tries every candidate delimiter
    Series,
    /// Delimited-text fallback requires a uniform wide comma count
    Population,
}

#[derive(Debug, Args)]
pub struct SniffArgs {
    /// Local file to sniff
    #[arg(short, long)]
    pub input: PathBuf,
    /// Which source profile drives the delimited-text strategy
    #[arg(long, value_enum, default_value_t = SniffProfile::Series)]
    pub profile: SniffProfile,
    /// Number of preview rows to print
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}
