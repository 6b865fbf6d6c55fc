//! privkg CLI - Command-line interface
//!
//! Usage:
//!   privkg build --model-dir <dir> -p phrase_map.yml -e entity_info.json <policy dir>...
//!
//! Each policy directory holds an annotated `document.json`; the graph is
//! written next to it as `graph.gml`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use privkg_core::{AppConfig, LoggingConfig};
use privkg_extractor::load_document;
use privkg_graph::{save_gml, trim_graph, GraphBuilder, NormalizationServices};

#[derive(Parser)]
#[command(name = "privkg")]
#[command(about = "Privacy-policy knowledge graph builder")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a knowledge graph for each policy directory
    Build(BuildArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Model directory (purpose classifier rules)
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Path to phrase_map.yml
    #[arg(short = 'p', long)]
    phrase_map: Option<PathBuf>,

    /// Path to entity_info.json
    #[arg(short = 'e', long)]
    entity_info: Option<PathBuf>,

    /// Output graph file name inside each directory
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// Also write the collection-centred subgraph under this file name
    #[arg(long)]
    trim: Option<String>,

    /// Input directories
    #[arg(required = true)]
    dirs: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => {
            let config = resolve_config(cli.config.as_deref(), &args)?;
            init_logging(&config.logging);

            let summary = run_build(&config, &args.dirs)?;
            println!(
                "Processed {} directories: {} succeeded, {} failed",
                summary.succeeded + summary.failed.len(),
                summary.succeeded,
                summary.failed.len()
            );
            for dir in &summary.failed {
                println!("  failed: {}", dir.display());
            }
        }
    }

    Ok(())
}

/// Defaults, then the config file, then the environment, then flags
fn resolve_config(path: Option<&Path>, args: &BuildArgs) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::default(),
    };
    let mut config = config.with_env_override()?;

    if let Some(phrase_map) = &args.phrase_map {
        config.resources.phrase_map = Some(phrase_map.clone());
    }
    if let Some(entity_info) = &args.entity_info {
        config.resources.entity_info = Some(entity_info.clone());
    }
    if let Some(model_dir) = &args.model_dir {
        config.resources.model_dir = Some(model_dir.clone());
    }
    if let Some(output) = &args.output {
        config.graph.output_file = output.clone();
    }
    if let Some(trim) = &args.trim {
        config.graph.trimmed_output_file = Some(trim.clone());
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Outcome of a build run
#[derive(Debug, Default)]
struct BuildSummary {
    succeeded: usize,
    failed: Vec<PathBuf>,
}

/// Load the services once, then process every directory in order
fn run_build(config: &AppConfig, dirs: &[PathBuf]) -> anyhow::Result<BuildSummary> {
    let services = NormalizationServices::rule_based(&config.resources)
        .context("Failed to load normalization resources")?;
    let builder =
        GraphBuilder::new(services).with_sentence_separator(config.graph.sentence_separator.clone());

    let mut summary = BuildSummary::default();
    for dir in dirs {
        info!(dir = %dir.display(), "Processing");

        match process_dir(&builder, config, dir) {
            Ok(()) => summary.succeeded += 1,
            Err(e) => {
                error!(dir = %dir.display(), error = format!("{e:#}"), "Failed to build graph");
                summary.failed.push(dir.clone());
            }
        }
    }

    Ok(summary)
}

fn process_dir(builder: &GraphBuilder, config: &AppConfig, dir: &Path) -> anyhow::Result<()> {
    let document = load_document(dir, &config.graph.document_file)
        .with_context(|| format!("Failed to load {}", dir.join(&config.graph.document_file).display()))?;

    let graph = builder
        .build_graph(&document)
        .with_context(|| format!("Failed to build graph for {}", document.id()))?;

    let output = dir.join(&config.graph.output_file);
    save_gml(&graph, &output).with_context(|| format!("Failed to write {}", output.display()))?;

    if let Some(name) = &config.graph.trimmed_output_file {
        let trimmed = trim_graph(&graph);
        let output = dir.join(name);
        save_gml(&trimmed, &output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
    }

    Ok(())
}
