use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hr_metrics::cli::{self, commands, OutputFormat};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hr-metrics")]
#[command(author, version, about = "Heart-rate ingestion and per-minute query engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Config file (TOML)
    #[arg(short, long, global = true, env = "HR_METRICS_CONFIG")]
    config: Option<PathBuf>,

    /// Partition directory, overrides the config file
    #[arg(long, global = true, env = "HR_METRICS_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store one reading
    Ingest {
        /// Device identifier
        #[arg(long)]
        device: String,
        /// User identifier
        #[arg(long)]
        user: String,
        /// ISO 8601 timestamp with offset, e.g. 2024-01-15T10:00:00Z
        #[arg(long)]
        timestamp: String,
        /// Heart rate in bpm
        #[arg(long)]
        heart_rate: i64,
    },
    /// Store a JSON batch of readings
    IngestBatch {
        /// JSON file, or - for stdin
        source: String,
    },
    /// Store newline-delimited JSON readings from stdin until EOF or Ctrl-C
    Stream,
    /// Per-minute heart rate for a user
    Query {
        /// User identifier
        #[arg(long)]
        user: String,
        /// Range start (inclusive, ISO 8601)
        #[arg(long)]
        start: String,
        /// Range end (inclusive, ISO 8601)
        #[arg(long)]
        end: String,
        /// Only this device
        #[arg(long)]
        device: Option<String>,
    },
    /// List partition files
    Partitions {
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Last date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
}

#[tokio::main]
async fn main() -> hr_metrics::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli::load_config(cli.config, cli.data_dir) {
        Ok(config) => match cli.command {
            Commands::Ingest {
                device,
                user,
                timestamp,
                heart_rate,
            } => commands::ingest_one(config, device, user, timestamp, heart_rate).await,
            Commands::IngestBatch { source } => commands::ingest_batch(config, source).await,
            Commands::Stream => commands::ingest_stream(config).await,
            Commands::Query {
                user,
                start,
                end,
                device,
            } => commands::query(config, user, start, end, device, cli.format).await,
            Commands::Partitions { from, to } => commands::list_partitions(config, from, to).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
