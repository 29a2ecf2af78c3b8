//! ai-run - headless behaviour tree runner.
//!
//! - `ai-run run --config <file>` - tick the configured zones and serve the remote debugger
//! - `ai-run check --config <file>` - evaluate scripts and build trees, then exit

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use ai_debug::Server;
use ai_run::{RunConfig, World};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "ai-run")]
#[command(about = "Headless behaviour tree runner", version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tick the configured zones
    Run {
        /// Runner configuration (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Stop after this many ticks instead of running until killed
        #[arg(long)]
        ticks: Option<u64>,

        /// Override the configured tick length
        #[arg(long)]
        tick_millis: Option<i64>,

        /// Override the debug server port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Evaluate scripts and build trees without running
    Check {
        /// Runner configuration (YAML)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Run {
            config,
            ticks,
            tick_millis,
            port,
        } => {
            let mut config = load_config(&config)?;
            if let Some(tick_millis) = tick_millis {
                config.tick_millis = tick_millis;
            }
            if let Some(port) = port {
                config.debug.bind_address.set_port(port);
            }
            config.validate()?;
            run(&config, ticks)
        }
        Commands::Check { config } => check(&load_config(&config)?),
    }
}

fn load_config(path: &Path) -> Result<RunConfig> {
    let mut config = RunConfig::load(path)?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    config.validate()?;
    Ok(config)
}

fn run(config: &RunConfig, ticks: Option<u64>) -> Result<()> {
    let world = World::load(config)?;

    let mut server = Server::new(config.debug.clone());
    let addr = server.start().context("Failed to start the debug server")?;
    for zone in world.zones() {
        server.add_zone(zone.clone());
    }
    if let Some(zone) = world.zones().first() {
        server.set_debug(zone.name());
    }
    tracing::info!(
        %addr,
        zones = world.zones().len(),
        tick_millis = config.tick_millis,
        "Starting runner"
    );

    let tick = Duration::from_millis(config.tick_millis.unsigned_abs());
    let mut done = 0u64;
    while ticks.map_or(true, |limit| done < limit) {
        let started = Instant::now();
        world.update(config.tick_millis);
        server.update(config.tick_millis);
        done += 1;
        if let Some(rest) = tick.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    tracing::info!(ticks = done, "Runner stopped");
    Ok(())
}

fn check(config: &RunConfig) -> Result<()> {
    let world = World::load(config)?;

    println!("Scripts: {}", config.scripts.len());
    println!("Trees:");
    for name in world.tree_names() {
        println!("  - {name}");
    }
    println!("Zones:");
    for (spec, zone) in config.zones.iter().zip(world.zones()) {
        println!(
            "  - {} ({} threads, {} agents, tree: {})",
            zone.name(),
            spec.zone.threads,
            spec.agents,
            spec.tree
        );
    }
    Ok(())
}
