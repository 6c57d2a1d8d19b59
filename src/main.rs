//! schemamap: Find schema objects in source code and infer their relationships
//!
//! Usage:
//!   schemamap analyze <metadata.json> [path]   Report object relationships
//!   schemamap scan <metadata.json> [path]      List object mentions
//!   schemamap match <metadata.json> <text>     Find objects in a string

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use schemamap::cli::{
    analyze_command, match_command, scan_command, AnalyzeOptions, OutputFormat, WeightPreset,
};
use schemamap::proximity::ContextWeights;
use schemamap::scan::DEFAULT_CONTEXT_LINES;

#[derive(Parser)]
#[command(name = "schemamap")]
#[command(version)]
#[command(about = "Find database schema objects in source code and infer their relationships")]
#[command(after_help = "EXAMPLES:
    schemamap analyze tables_views.json ~/src/billing
    schemamap analyze tables_views.json --preset leading --top 5 --format json -o report.json
    schemamap analyze tables_views.json --min-cooccurrence 2 --min-strength 0.1
    schemamap scan tables_views.json . --format json
    schemamap match tables_views.json \"select * from employees\"")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a source tree and report relationships between schema objects
    Analyze {
        /// Catalog export: JSON array of {object_name, column_name}
        metadata: PathBuf,

        /// Source tree to scan
        #[arg(env = "SCHEMAMAP_ROOT", default_value = ".")]
        path: String,

        /// Mentions farther apart than this many characters are unrelated
        #[arg(long, default_value_t = 500)]
        max_distance: u64,

        /// Context weights as line,before,after (overrides --preset)
        #[arg(long)]
        weights: Option<ContextWeights>,

        /// Named context weighting scheme
        #[arg(long, value_enum, default_value_t = WeightPreset::Trailing)]
        preset: WeightPreset,

        /// Related objects and columns shown per object
        #[arg(long, default_value_t = 3)]
        top: usize,

        /// Drop relationships seen together fewer times than this
        #[arg(long, default_value_t = 1)]
        min_cooccurrence: u64,

        /// Drop relationships whose join strength is below this (0.0 to 1.0)
        #[arg(long, default_value_t = 0.0)]
        min_strength: f64,

        /// Lines of context kept around each mention
        #[arg(long, default_value_t = DEFAULT_CONTEXT_LINES)]
        context_lines: usize,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Match identifiers case-sensitively
        #[arg(long)]
        case_sensitive: bool,
    },

    /// List every mention of a schema object
    Scan {
        metadata: PathBuf,

        #[arg(env = "SCHEMAMAP_ROOT", default_value = ".")]
        path: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
    },

    /// Find schema objects in a string
    Match {
        metadata: PathBuf,

        text: String,

        #[arg(long)]
        case_sensitive: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Analyze {
            metadata,
            path,
            max_distance,
            weights,
            preset,
            top,
            min_cooccurrence,
            min_strength,
            context_lines,
            format,
            output,
            case_sensitive,
        } => {
            let options = AnalyzeOptions {
                metadata,
                root: path,
                max_distance,
                weights,
                preset,
                top_n: top,
                min_cooccurrence,
                min_strength,
                context_lines,
                format,
                output,
                case_sensitive,
            };
            analyze_command(&options)?;
        }
        Commands::Scan {
            metadata,
            path,
            format,
        } => {
            scan_command(&metadata, &path, format)?;
        }
        Commands::Match {
            metadata,
            text,
            case_sensitive,
        } => {
            match_command(&metadata, &text, case_sensitive)?;
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}
