//! `elevd`: elevation lookups over a directory of DEM tiles.

use clap::{ArgAction, Parser, Subcommand};
use elevd_cli::{commands, CliError, Config};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "elevd", version, about = "Elevation lookups over a directory of DEM tiles")]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding DEM tiles (overrides the config file).
    #[arg(short, long, global = true)]
    data_folder: Option<PathBuf>,

    /// Maximum number of decoded tiles kept in memory.
    #[arg(long, global = true)]
    open_handles: Option<usize>,

    /// Pixel value reported as no-data.
    #[arg(long, global = true, allow_hyphen_values = true)]
    no_data_value: Option<f64>,

    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the data folder and print the tiles found.
    Scan,
    /// Look up `lat,lng|lat,lng` locations (decimal or compact DMS such as 473000N).
    Lookup {
        #[arg(allow_hyphen_values = true)]
        locations: String,
    },
    /// Look up a `{"locations": [...]}` JSON request read from FILE or stdin.
    Batch { file: Option<PathBuf> },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Setup logging to stderr, leaving stdout for JSON.
fn setup_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(data_folder) = &cli.data_folder {
        config.data_folder = data_folder.clone();
    }
    if let Some(open_handles) = cli.open_handles {
        config.open_handles = open_handles;
    }
    if let Some(no_data_value) = cli.no_data_value {
        config.no_data_value = no_data_value;
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;
    let stdout = io::stdout().lock();

    match cli.command {
        Command::Scan => commands::write_json(stdout, &commands::scan(&config)?),
        Command::Lookup { locations } => {
            let requests = commands::parse_query(&locations);
            let engine = commands::build_engine(&config)?;
            commands::write_json(stdout, &commands::lookup(&engine, &requests))
        }
        Command::Batch { file } => {
            let requests = match file {
                Some(path) => commands::read_batch(BufReader::new(File::open(path)?))?,
                None => commands::read_batch(io::stdin().lock())?,
            };
            let engine = commands::build_engine(&config)?;
            commands::write_json(stdout, &commands::lookup(&engine, &requests))
        }
    }
}
