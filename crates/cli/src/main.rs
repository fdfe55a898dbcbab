//! branchmirror command-line tool.
//!
//! Provides subcommands for running a mirroring pass, previewing how the
//! map expands against the filesystem, and generating / validating
//! configuration files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use branchmirror_core::config::MirrorConfig;
use branchmirror_core::directive::Directive;
use branchmirror_core::expand::PatternMatcher;
use branchmirror_core::sync_engine::SyncEngine;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// branchmirror command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "branchmirror",
    version,
    about = "Force-publish mapped directories as standalone Git branches"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "./branchmirror.toml")]
    config: PathBuf,

    /// Workspace root the mappings resolve against.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one mirroring pass over the configured mappings.
    Sync {
        /// Mapping line, overriding the config file (repeat for multiple
        /// directives).
        #[arg(long)]
        map: Vec<String>,

        /// Publish every mapping without probing for changes.
        #[arg(long)]
        skip_unchanged_check: bool,

        /// Render the command sequence instead of executing it.
        #[arg(long)]
        dry_run: bool,

        /// Print run statistics as JSON on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Resolve the map against the filesystem and print the concrete
    /// mappings, without touching git.
    Expand {
        /// Mapping line, overriding the config file (repeat for multiple
        /// directives).
        #[arg(long)]
        map: Vec<String>,

        /// Print the concrete mappings as JSON on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./branchmirror.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Sync {
            map,
            skip_unchanged_check,
            dry_run,
            json,
        } => cmd_sync(&cli.config, &cli.root, map, skip_unchanged_check, dry_run, json).await,
        Commands::Expand { map, json } => cmd_expand(&cli.config, &cli.root, map, json),
        Commands::Init { output } => cmd_init(&output),
        Commands::Validate => cmd_validate(&cli.config),
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// Load the config file when present; fall back to a pure environment
/// configuration otherwise (the usual shape inside a CI job).
fn load_config(path: &Path) -> Result<MirrorConfig> {
    if path.exists() {
        let mut config =
            MirrorConfig::load_from_file(path).context("failed to load configuration file")?;
        config
            .resolve_env_vars()
            .context("failed to resolve environment variables")?;
        Ok(config)
    } else {
        MirrorConfig::from_env().context("failed to build configuration from environment")
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_sync(
    config_path: &Path,
    root: &Path,
    map: Vec<String>,
    skip_unchanged_check: bool,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if !map.is_empty() {
        config.mirror.map = map.join("\n");
    }
    if skip_unchanged_check {
        config.mirror.skip_unchanged_check = true;
    }
    if dry_run {
        config.mirror.dry_run = true;
    }
    config
        .validate()
        .context("configuration is not valid for a sync run")?;

    let engine = SyncEngine::new(config, root);
    let stats = engine.run().await.context("mirroring run failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!();
        println!("Run summary:");
        println!("  Synced   : {}", stats.synced_count);
        println!("  Skipped  : {}", stats.skipped_count);
        println!("  Invalid  : {}", stats.invalid_count);
        println!("  Expanded : {}", stats.expanded_count);
    }
    Ok(())
}

fn cmd_expand(config_path: &Path, root: &Path, map: Vec<String>, json: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    if !map.is_empty() {
        config.mirror.map = map.join("\n");
    }
    if config.mirror.map.trim().is_empty() {
        anyhow::bail!("no mapping lines configured; pass --map or set [mirror].map");
    }

    let engine = SyncEngine::new(config, root);
    let mappings = engine.resolve_mappings().context("expansion failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&mappings)?);
        return Ok(());
    }
    for mapping in &mappings {
        println!("{} -> {}", mapping.source_dir, mapping.target_branch);
    }
    println!();
    println!("{} concrete mapping(s)", mappings.len());
    Ok(())
}

fn cmd_init(output: &Path) -> Result<()> {
    let default_config = r#"# branchmirror configuration

[mirror]
# One mapping per line: <sourcePattern> -> <targetBranchPattern>.
# `*` matches exactly one path segment, `**` matches zero or more.
map = """
/docs -> sync/docs
/packages/* -> sync/packages/*
"""
skip_unchanged_check = false
dry_run = false

[github]
# Empty values fall back to GITHUB_SERVER_URL / GITHUB_REPOSITORY /
# GITHUB_REF_NAME / GITHUB_SHA.
server_url = ""
repository = ""
ref_name = ""
sha = ""
token_env = "GITHUB_TOKEN"
"#;

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, default_config).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the map with your directory-to-branch lines");
    println!("  2. Set the push token variable (GITHUB_TOKEN by default)");
    println!(
        "  3. Validate with: branchmirror validate --config {}",
        output.display()
    );
    println!(
        "  4. Preview the expansion with: branchmirror expand --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        MirrorConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    match config.resolve_env_vars() {
        Ok(()) => println!("  [OK] Environment variable references processed"),
        Err(e) => {
            println!("  [FAIL] Environment resolution: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    match config.validate() {
        Ok(()) => println!("  [OK] All required fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    // Per-line map checks: parse every line and compile wildcard sources.
    let mut map_lines = 0usize;
    let mut invalid_lines = 0usize;
    for (idx, line) in config.mirror.map.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        map_lines += 1;
        let outcome = match Directive::parse(trimmed) {
            Ok(d) if d.has_wildcards() => PatternMatcher::compile(&d.source_pattern)
                .map(|_| ())
                .map_err(|e| e.to_string()),
            Ok(_) => Ok(()),
            Err(e) => Err(e.to_string()),
        };
        match outcome {
            Ok(()) => println!("  [OK] map line {}: {}", idx + 1, trimmed),
            Err(e) => {
                println!("  [FAIL] map line {}: {}", idx + 1, e);
                invalid_lines += 1;
            }
        }
    }

    println!();
    println!("Configuration summary:");
    println!("  Map lines   : {}", map_lines);
    println!("  Server URL  : {}", config.github.server_url);
    println!("  Repository  : {}", config.github.repository);
    println!("  Reference   : {}", config.github.ref_name);
    println!("  Revision    : {}", config.github.sha);
    println!(
        "  Push token  : {}",
        if config.github.token.is_some() {
            "set"
        } else {
            "NOT SET"
        }
    );
    println!("  Dry run     : {}", config.mirror.dry_run);
    println!("  Skip check  : {}", config.mirror.skip_unchanged_check);
    println!();

    if invalid_lines > 0 {
        anyhow::bail!("{} invalid mapping line(s)", invalid_lines);
    }
    println!("Configuration is valid.");

    Ok(())
}
