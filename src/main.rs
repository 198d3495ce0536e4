//! dutyc - vehicle import duty calculator
//!
//! ```bash
//! dutyc quote --price 25000 --currency EUR --volume 1998 --power 190 --produced 202106
//! dutyc quote --price 1000000 --volume 1500 --power 150 --age 4 --eur-rate 100 --json
//! dutyc convert 30000000 KRW
//! dutyc rates EUR USD KRW
//! dutyc age 202106
//! dutyc batch -f vehicles.csv > quotes.csv
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod config;
mod core;
mod rates;

#[derive(Parser, Debug)]
#[command(name = "dutyc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to dutyc.toml in the working directory if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate import charges for a vehicle
    Quote(cmd::quote::QuoteCommand),
    /// Convert an amount between currencies
    Convert(cmd::convert::ConvertCommand),
    /// List current currency rates
    Rates(cmd::rates::RatesCommand),
    /// Classify a YYYYMM production date
    Age(cmd::age::AgeCommand),
    /// Quote every vehicle in a CSV file, writing CSV to stdout
    Batch(cmd::batch::BatchCommand),
    /// Print the expected input formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = || config::Settings::load(cli.config.as_deref());
    match &cli.command {
        Command::Quote(quote) => quote.exec(&settings()?),
        Command::Convert(convert) => convert.exec(&settings()?),
        Command::Rates(rates) => rates.exec(&settings()?),
        Command::Batch(batch) => batch.exec(&settings()?),
        Command::Age(age) => age.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}

fn init_logging(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(log::LevelFilter::Warn);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    // -v wins over RUST_LOG for our own logs
    if verbose {
        builder.filter_module("dutyc", log::LevelFilter::Debug);
    }
    builder.init();
}
