//! Hailcast command line.
//!
//! Reads forecast grids and drives the per-member patch classification
//! pipeline: sampling, training and daily forecasting.

mod commands;
mod config_loader;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "hailcast")]
#[command(about = "Storm hazard patch classification from forecast grids")]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        env = "HAILCAST_CONFIG",
        default_value = "config/hailcast.yaml"
    )]
    config: PathBuf,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw the class-balanced training sample (reused if already on disk)
    Sample {
        /// Ensemble member(s)
        #[arg(short, long, required = true)]
        member: Vec<String>,
    },

    /// Sample, standardize and fit a network per member
    Train {
        /// Ensemble member(s)
        #[arg(short, long, required = true)]
        member: Vec<String>,
    },

    /// Score every day of the forecast window with the trained network
    Forecast {
        /// Ensemble member(s)
        #[arg(short, long, required = true)]
        member: Vec<String>,

        /// Classes to summarize in the log
        #[arg(long, value_delimiter = ',', default_value = "2,3")]
        report: Vec<usize>,

        /// Write probability archives into this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Read one variable from a run's forecast files
    ReadGrid(ReadGridArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ReadGridArgs {
    /// Forecast files, one per time step in time order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Model run initialization time
    #[arg(long)]
    pub run_date: String,

    /// First valid time
    #[arg(long)]
    pub start: String,

    /// Last valid time (inclusive)
    #[arg(long)]
    pub end: String,

    /// Record number, name, or name_level
    #[arg(short, long)]
    pub variable: String,

    #[arg(short, long, default_value = "mem_1")]
    pub member: String,

    /// Time step such as 1H or 30min
    #[arg(long, default_value = "1H")]
    pub frequency: String,

    /// Root of the lightning count archives
    #[arg(long, default_value = model_grid::DEFAULT_LIGHTNING_ROOT)]
    pub lightning_root: PathBuf,

    /// Write the stacked grid to this Zarr path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(&args.log_level, args.json)?;
    info!("Starting hailcast");

    match args.command {
        Command::ReadGrid(read) => commands::read_grid(read).await,
        Command::Sample { member } => {
            let modeler = commands::modeler(&args.config)?;
            commands::sample(modeler, member).await
        }
        Command::Train { member } => {
            let modeler = commands::modeler(&args.config)?;
            commands::train(modeler, member).await
        }
        Command::Forecast {
            member,
            report,
            output,
        } => {
            let modeler = commands::modeler(&args.config)?;
            commands::forecast(modeler, member, report, output).await
        }
    }
}
