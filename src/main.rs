use anyhow::Result;
use clap::{Parser, Subcommand};
use seedlink::cli::{self, SearchArgs};

#[derive(Parser)]
#[command(name = "seedlink")]
#[command(version)]
#[command(about = "Seed, extend, link and rank nucleotide local alignments", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search nucleotide queries against a FASTA database
    Search(SearchArgs),
}

fn main() -> Result<()> {
    let opts = Cli::parse();

    let log_level = match opts.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_target(false)
        .init();

    match opts.command {
        Commands::Search(args) => {
            cli::run(args)?;
        }
    }
    Ok(())
}
