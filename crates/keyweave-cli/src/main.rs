//! Keyweave CLI - Command-line interface for Keyweave
//!
//! Loads a manifest of component groups into a key manager and answers
//! group, name, and sibling queries against it.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod manifest;

#[derive(Parser)]
#[command(name = "keyweave")]
#[command(author = "Keyweave Contributors")]
#[command(version)]
#[command(about = "Group, index, and query named components", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every group and component in a manifest
    Inspect {
        /// Manifest file
        manifest: PathBuf,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Show the members of a group
    Group {
        /// Manifest file
        manifest: PathBuf,

        /// Group id (g1, g2, ... unless the manifest sets a prefix)
        id: String,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Find components by name
    Find {
        /// Manifest file
        manifest: PathBuf,

        /// Component names
        #[arg(required = true)]
        names: Vec<String>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Show components sharing a name with a group member
    Siblings {
        /// Manifest file
        manifest: PathBuf,

        /// Group id
        group: String,

        /// Name of the member within the group
        name: String,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Export components and associations to JSON
    Export {
        /// Manifest file
        manifest: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "keyweave-export.json")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = match cli.command {
        Commands::Inspect { manifest, json } => commands::inspect(&manifest, json),
        Commands::Group { manifest, id, json } => commands::group(&manifest, &id, json),
        Commands::Find {
            manifest,
            names,
            json,
        } => commands::find(&manifest, &names, json),
        Commands::Siblings {
            manifest,
            group,
            name,
            json,
        } => commands::siblings(&manifest, &group, &name, json),
        Commands::Export { manifest, output } => commands::export(&manifest, &output),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
