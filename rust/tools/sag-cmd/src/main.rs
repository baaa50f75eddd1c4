use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod utils;

use commands::{ReaderArgs, export::ExportFormat};

#[derive(Parser)]
#[command(name = "sag-cmd")]
#[command(about = "Command-line utility for reading SAG galaxy catalogues")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect a catalogue and display its metadata and columns
    Inspect {
        /// Increase verbosity (-v adds the group listing)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,

        #[command(flatten)]
        reader: ReaderArgs,

        /// Catalogue file to inspect
        file: String,
    },

    /// Check that every field of a mapping file resolves against a catalogue
    Validate {
        /// Column mapping file
        #[arg(short, long)]
        map: String,

        #[command(flatten)]
        reader: ReaderArgs,

        /// Catalogue file to validate against
        file: String,
    },

    /// Write the resolved rows of a catalogue
    Export {
        /// Column mapping file
        #[arg(short, long)]
        map: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = ExportFormat::Tsv)]
        format: ExportFormat,

        /// Stop after this many rows
        #[arg(long)]
        limit: Option<u64>,

        /// Output file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,

        #[command(flatten)]
        reader: ReaderArgs,

        /// Catalogue file to export
        file: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            verbose,
            reader,
            file,
        } => commands::inspect::run(verbose, reader, file),
        Commands::Validate { map, reader, file } => commands::validate::run(map, reader, file),
        Commands::Export {
            map,
            format,
            limit,
            output,
            reader,
            file,
        } => commands::export::run(map, format, limit, output, reader, file),
    }
}
