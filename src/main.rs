// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! bizagi-docs CLI - process documentation from Bizagi and BPMN diagrams

use anyhow::Result;
use bizagi_docs::commands::{self, Reporter};
use bizagi_docs::config;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bizagi-docs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "BIZAGI_DOCS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(
        long,
        env = "NO_COLOR",
        global = true,
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the BPMN document from a .bpm file
    Convert {
        /// Input .bpm (or .bpmn) file
        input: PathBuf,

        /// Output file (next to the input if not specified)
        #[arg(short, long, conflicts_with = "stdout")]
        output: Option<PathBuf>,

        /// Write the document to stdout
        #[arg(long)]
        stdout: bool,
    },

    /// Check that a diagram is BPMN 2.0 XML
    Validate {
        /// Diagram file (.bpmn or .bpm)
        input: PathBuf,
    },

    /// Print the structural parse of a diagram as JSON
    Parse {
        /// Diagram file (.bpmn or .bpm)
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build the per-element content file for the viewer
    Content {
        /// Diagram file (.bpmn or .bpm)
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the performers and lanes of a diagram
    Performers {
        /// Diagram file (.bpmn or .bpm)
        input: PathBuf,

        /// Print a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Index element descriptions for every .bpmn file under a directory
    Extract {
        /// Directory to walk
        dir: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "descriptions.flat.json")]
        output: PathBuf,
    },

    /// Show the effective configuration
    Config {
        /// Dotted key to print (e.g. archive.max_depth)
        key: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    // Initialize logging; RUST_LOG wins over flags and config
    let level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    let reporter = Reporter::new(!cli.no_color);

    // Execute command
    match cli.command {
        Commands::Convert { input, output, stdout } => {
            commands::convert::run(&config, reporter, &input, output, stdout)
        }
        Commands::Validate { input } => commands::validate::run(&config, reporter, &input),
        Commands::Parse { input, output } => {
            commands::parse::run(&config, reporter, &input, output)
        }
        Commands::Content { input, output } => {
            commands::content::run(&config, reporter, &input, output)
        }
        Commands::Performers { input, json } => {
            commands::performers::run(&config, reporter, &input, json)
        }
        Commands::Extract { dir, output } => commands::extract::run(&config, &dir, &output),
        Commands::Config { key } => commands::config::run(&config, key.as_deref()),
        Commands::Completions { shell } => {
            commands::completions::run(shell, &mut Cli::command())
        }
    }
}
