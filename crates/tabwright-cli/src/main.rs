mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tabwright",
    version,
    about = "Find tables in PDF text and recover their rows, columns and headers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect tables in a PDF or a JSON word dump
    Extract {
        /// Path to PDF or JSON word dump
        input_file: PathBuf,

        /// Predefined config: default, snippet
        #[arg(short, long, default_value = "default")]
        preset: String,

        /// Custom JSON config file (overrides --preset)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output format: table (default), json or xml
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write the result to a JSON file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        /// Log candidate decisions to stderr
        #[arg(short, long)]
        verbose: bool,
    },
    /// Inspect and validate extractor configs
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// List predefined configs
    List,
    /// Print a predefined config as JSON
    Show {
        /// Preset name (e.g., "default")
        preset: String,
    },
    /// Print the config file format with field descriptions
    Schema,
    /// Validate a custom config file
    Validate {
        /// Path to JSON config file
        file: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "warn,tabwright_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Extract { verbose: true, .. });
    init_logging(verbose);

    let result = match cli.command {
        Commands::Extract {
            input_file,
            preset,
            config,
            output,
            out,
            verbose: _,
        } => commands::extract::run(input_file, &preset, config, &output, out),
        Commands::Config { action } => match action {
            ConfigAction::List => commands::config::list(),
            ConfigAction::Show { preset } => commands::config::show(&preset),
            ConfigAction::Schema => commands::config::schema(),
            ConfigAction::Validate { file } => commands::config::validate(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
