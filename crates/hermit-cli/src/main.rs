#![deny(unsafe_code)]

//! Hermit CLI: build, inspect, and delete images on the local daemon.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hermit_core::{BuildOptions, ImageDaemon};

/// Hermit: sandboxed images over the daemon's socket, no SDK required.
#[derive(Parser)]
#[command(name = "hermit", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "hermit.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an image from a context directory and/or a Dockerfile.
    Build(BuildArgs),

    /// Show an image's properties as JSON.
    Inspect {
        /// Image tag or id.
        reference: String,
    },

    /// Delete an image.
    Remove {
        /// Image id.
        id: String,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Build context directory.
    directory: Option<PathBuf>,

    /// Tag for the built image.
    #[arg(short, long)]
    tag: Option<String>,

    /// Path to a Dockerfile whose contents override any Dockerfile in
    /// the context.
    #[arg(short = 'f', long)]
    dockerfile: Option<PathBuf>,

    /// Build without the daemon's layer cache.
    #[arg(long)]
    no_cache: bool,

    /// Ask the daemon for quiet build output.
    #[arg(short, long)]
    quiet: bool,

    /// Do not print the daemon's build transcript.
    #[arg(long)]
    quiet_client: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing subscriber with verbosity level
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Build(args) => cmd_build(&cli.config, args).await?,
        Commands::Inspect { reference } => cmd_inspect(&cli.config, &reference).await?,
        Commands::Remove { id } => cmd_remove(&cli.config, &id).await?,
        Commands::Config { show } => cmd_config(&cli.config, show).await?,
    }

    Ok(())
}

async fn cmd_build(config_path: &Path, args: BuildArgs) -> Result<()> {
    let config = load_config(config_path).await?;
    let mut daemon = ImageDaemon::from_config(&config);

    let mut options = BuildOptions::new()
        .with_use_cache(!args.no_cache && config.build.use_cache)
        .with_quiet(args.quiet)
        .with_quiet_client(args.quiet_client || config.build.quiet_client);
    if let Some(dir) = args.directory {
        options = options.with_source_directory(dir);
    }
    if let Some(tag) = args.tag {
        options = options.with_tag(tag);
    }
    if let Some(path) = args.dockerfile {
        let contents = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read Dockerfile at {}", path.display()))?;
        options = options.with_dockerfile(contents);
    }

    let id = daemon.build(&options).await?;
    println!("{id}");
    Ok(())
}

async fn cmd_inspect(config_path: &Path, reference: &str) -> Result<()> {
    let config = load_config(config_path).await?;
    let mut daemon = ImageDaemon::from_config(&config);

    match daemon.image_properties(reference).await? {
        Some(properties) => {
            println!("{}", serde_json::to_string_pretty(&properties)?);
            Ok(())
        }
        None => bail!("no such image: {reference}"),
    }
}

async fn cmd_remove(config_path: &Path, id: &str) -> Result<()> {
    let config = load_config(config_path).await?;
    let mut daemon = ImageDaemon::from_config(&config);

    daemon.remove_image(id).await?;
    println!("Removed {id}");
    Ok(())
}

async fn cmd_config(config_path: &Path, show: bool) -> Result<()> {
    let config = load_config(config_path).await?;
    if show {
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

async fn load_config(path: &Path) -> Result<hermit_config::AppConfig> {
    if path.exists() {
        hermit_config::AppConfig::load(path)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        Ok(hermit_config::AppConfig::default())
    }
}
