use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use hospital_finder::config::FileConfig;
use hospital_finder::search::aggregator::summary_message;
use hospital_finder::search::{HospitalsResponse, SearchError};
use hospital_finder::{HospitalFinder, LocationQuery, logging, server};

/// Find hospitals, clinics and other healthcare facilities near a place,
/// using OpenStreetMap data
///
/// Examples:
///   # Search a neighborhood, widening to the district if it finds nothing
///   hospital-finder search -C Japan -s Tokyo -d Shibuya -a Ebisu
///
///   # Ask for at least 10 facilities, keep the nearest 20
///   hospital-finder search -C India -s Maharashtra -d Pune -a Kothrud --min-results 10 --max-results 20
///
///   # Serve the HTTP API on all interfaces
///   hospital-finder serve --host 0.0.0.0 --port 8080
#[derive(Parser, Debug)]
#[command(name = "hospital-finder")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches hospital-finder.toml if not provided)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also append logs to this file (e.g. hospital_finder.log)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search once and print the JSON result
    Search {
        #[arg(short = 'C', long)]
        country: String,

        #[arg(short, long)]
        state: String,

        #[arg(short, long)]
        district: String,

        #[arg(short, long)]
        area: String,

        /// Keep widening the search until at least this many facilities are found
        #[arg(long)]
        min_results: Option<usize>,

        /// Return at most this many facilities (nearest first)
        #[arg(long)]
        max_results: Option<usize>,

        /// Fill missing addresses by reverse geocoding each facility
        #[arg(long)]
        reverse_geocode: bool,
    },

    /// Serve the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard =
        logging::init(args.verbose, args.log_file.as_deref()).context("Failed to open log file")?;

    let mut config = match args.config {
        Some(ref path) => {
            if !path.exists() {
                bail!("Config file not found: {:?}", path);
            }
            FileConfig::from_path(path).context("Failed to load config file")?
        }
        None => FileConfig::load(),
    };

    match args.command {
        Command::Search {
            country,
            state,
            district,
            area,
            min_results,
            max_results,
            reverse_geocode,
        } => {
            if let Some(n) = min_results {
                config.search.min_results = n;
            }
            if max_results.is_some() {
                config.search.max_results = max_results;
            }
            config.search.reverse_geocode |= reverse_geocode;

            let query = LocationQuery::new(country, state, district, area);
            if query.is_empty() {
                bail!("At least one of --country, --state, --district or --area must be non-empty");
            }
            run_search(&config, &query)
        }
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let finder =
                HospitalFinder::from_config(&config).context("Failed to set up map data clients")?;
            let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
            runtime
                .block_on(server::start(finder, &config.server))
                .context("HTTP server failed")
        }
    }
}

fn run_search(config: &FileConfig, query: &LocationQuery) -> Result<()> {
    let finder =
        HospitalFinder::from_config(config).context("Failed to set up map data clients")?;

    let spinner = create_spinner(&format!("Searching near {}...", query.focus_name()));
    let outcome = finder.find(query);
    spinner.finish_and_clear();

    let response = match outcome {
        Ok(result) => HospitalsResponse::from(&result),
        Err(SearchError::NoLocationFound { .. }) => {
            HospitalsResponse::empty(summary_message(0, query.focus_name()))
        }
        Err(e) => return Err(e).context("Hospital search failed"),
    };

    let json = serde_json::to_string_pretty(&response).context("Failed to encode result")?;
    println!("{json}");
    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
