use clap::{Parser, Subcommand};
use log::{error, info};

use transit_datasets::config::Config;
use transit_datasets::error::Error;
use transit_datasets::gtfs::{shapes, stops, GtfsDir};
use transit_datasets::net::HttpClient;
use transit_datasets::patterns::{self, rtti::RttiClient};
use transit_datasets::sink::FileSink;
use transit_datasets::{dataset, snapshot};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Download the latest GTFS dataset and extract routes, shapes, and stops
    FetchDataset,
    /// Write a GeoJSON file for each shape
    BuildShapes,
    /// Write GeoJSON and CSV files containing all stops
    BuildStops,
    /// Write a GeoJSON file for each route pattern
    BuildRoutePatterns,
    /// Commit the generated datasets to git
    Snapshot,
    /// fetch-dataset, build-stops, build-shapes and build-route-patterns in a row
    RunAll,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = run(args.command, &args.config) {
        error!("{}", e);
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            error!("  caused by: {}", cause);
            source = std::error::Error::source(cause);
        }
        std::process::exit(1);
    }
}

fn run(command: Command, config: &Config) -> Result<(), Error> {
    let http = HttpClient::new(config)?;
    let gtfs = GtfsDir::new(&config.gtfs_dir);
    let sink = FileSink::new(&config.datasets_dir);

    match command {
        Command::FetchDataset => fetch_dataset(&http, config),
        Command::BuildShapes => build_shapes(&gtfs, &sink),
        Command::BuildStops => build_stops(&gtfs, &sink),
        Command::BuildRoutePatterns => build_route_patterns(&http, config, &gtfs, &sink),
        Command::Snapshot => {
            let failed = snapshot::snapshot(&config.datasets_dir)?;
            if failed > 0 {
                info!("{} git commands did not succeed", failed);
            }
            Ok(())
        }
        Command::RunAll => {
            fetch_dataset(&http, config)?;
            build_stops(&gtfs, &sink)?;
            build_shapes(&gtfs, &sink)?;
            build_route_patterns(&http, config, &gtfs, &sink)
        }
    }
}

fn fetch_dataset(http: &HttpClient, config: &Config) -> Result<(), Error> {
    let files = dataset::fetch_dataset(http, &config.gtfs_url, &config.gtfs_dir)?;
    info!("Extracted {} GTFS files", files.len());
    Ok(())
}

fn build_shapes(gtfs: &GtfsDir, sink: &FileSink) -> Result<(), Error> {
    let count = shapes::write_shapes(&gtfs.shapes, sink)?;
    info!("Wrote {} shapes", count);
    Ok(())
}

fn build_stops(gtfs: &GtfsDir, sink: &FileSink) -> Result<(), Error> {
    stops::write_stops(&gtfs.stops, sink)?;
    Ok(())
}

fn build_route_patterns(
    http: &HttpClient,
    config: &Config,
    gtfs: &GtfsDir,
    sink: &FileSink,
) -> Result<(), Error> {
    let api_key = config.api_key.as_deref().ok_or_else(|| {
        Error::Error("an RTTI API key is required, set TL_API_KEY or pass --api-key".to_owned())
    })?;
    let provider = RttiClient::new(http, &config.rtti_url, api_key)?;
    let summary = patterns::build_route_patterns(&gtfs.routes, &provider, http, sink)?;
    summary.print_stats();
    Ok(())
}
