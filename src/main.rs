//! Bookdex main entry point
//!
//! `bookdex` with no arguments runs one crawl with configured defaults;
//! `bookdex serve` starts the HTTP API over the persisted dataset.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bookdex::Settings;

/// Bookdex: book-catalog scraper and query API
#[derive(Parser, Debug)]
#[command(name = "bookdex")]
#[command(version)]
#[command(about = "Scrapes a book catalog into a CSV dataset and serves it over HTTP")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one full crawl and write the dataset snapshot (default)
    Scrape,

    /// Serve the dataset over the HTTP API
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    setup_logging(&settings.log_level, cli.verbose, cli.quiet);

    match cli.command.unwrap_or(Command::Scrape) {
        Command::Scrape => {
            let count = bookdex::crawler::scrape(settings).await?;
            tracing::info!("Scrape complete: {} records written", count);
        }
        Command::Serve => {
            bookdex::api::serve(settings).await?;
        }
    }

    Ok(())
}

/// Sets up the tracing subscriber from the configured level and the
/// CLI verbosity flags
fn setup_logging(base_level: &str, verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new(format!("bookdex={base_level},warn")),
            1 => EnvFilter::new("bookdex=debug,info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
