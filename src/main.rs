//! prefshare CLI
//!
//! Entry point for the `prefshare` command-line tool.

use clap::{Parser, Subcommand};
use prefshare_manifest::{Pipeline, PipelineConfig};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "prefshare")]
#[command(about = "Merge app-data-sharing entries into an AndroidManifest.xml", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the sharing entries into the manifest and write it back
    Apply {
        /// Path to AndroidManifest.xml
        manifest: PathBuf,

        /// Path to config file (default: ./prefshare.toml when present)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Additional bundle id to share with (repeatable)
        #[arg(long = "bundle-id")]
        bundle_ids: Vec<String>,

        /// Print the merged manifest to stdout instead of writing it
        #[arg(long)]
        dry_run: bool,

        /// Output the summary in JSON format
        #[arg(long)]
        json: bool,

        /// Verbose progress on stderr
        #[arg(long, short = 'v')]
        verbose: bool,
    },

    /// Check whether the manifest already contains all sharing entries
    Check {
        /// Path to AndroidManifest.xml
        manifest: PathBuf,

        /// Path to config file (default: ./prefshare.toml when present)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Additional bundle id to share with (repeatable)
        #[arg(long = "bundle-id")]
        bundle_ids: Vec<String>,

        /// Output the report in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            manifest,
            config,
            bundle_ids,
            dry_run,
            json,
            verbose,
        } => {
            let mut pipeline_config = PipelineConfig::new(manifest);
            pipeline_config.config_path = config;
            pipeline_config.bundle_ids = bundle_ids;
            pipeline_config.dry_run = dry_run;
            pipeline_config.verbose = verbose;

            run_apply(pipeline_config, json);
        }
        Commands::Check {
            manifest,
            config,
            bundle_ids,
            json,
        } => {
            let mut pipeline_config = PipelineConfig::new(manifest);
            pipeline_config.config_path = config;
            pipeline_config.bundle_ids = bundle_ids;

            run_check(pipeline_config, json);
        }
    }
}

fn run_apply(config: PipelineConfig, json: bool) {
    let dry_run = config.dry_run;
    let pipeline = Pipeline::new(config);

    let outcome = match pipeline.run() {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    };

    if dry_run {
        print!("{}", outcome.rendered);
    }

    if json {
        match outcome.summary.to_json() {
            Ok(text) => eprintln_or_print(dry_run, &text),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        eprintln_or_print(dry_run, &outcome.summary.to_human());
    }
}

/// On dry runs stdout carries the manifest, so the summary moves to
/// stderr.
fn eprintln_or_print(dry_run: bool, text: &str) {
    if dry_run {
        eprintln!("{}", text);
    } else {
        println!("{}", text);
    }
}

fn run_check(config: PipelineConfig, json: bool) {
    let pipeline = Pipeline::new(config);

    let summary = match pipeline.check() {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    };

    if json {
        match summary.to_json() {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else if summary.changed() {
        println!("Manifest is missing sharing entries:");
        println!("{}", summary.to_human());
    } else {
        println!("Manifest is up to date: {}", summary.manifest_path);
    }

    if summary.changed() {
        process::exit(1);
    }
}
