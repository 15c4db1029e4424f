//! # whoshomed — whoshome daemon
//!
//! Composition root that wires all adapters together and runs presence
//! cycles.
//!
//! ## Responsibilities
//! - Parse the CLI and load configuration (file, env overrides)
//! - Initialize tracing with the configured filter
//! - Validate raw section tables into runtime sections
//! - Construct the subprocess, JSON store, and cron adapters
//! - Construct the trigger engine, injecting adapters via port traits
//! - Run one cycle (`run`) or loop forever (`watch`)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use whoshome_adapter_cron::CronGate;
use whoshome_adapter_shell::{IpNeighSource, NslookupResolver, ProcessLauncher};
use whoshome_adapter_state_json::JsonStateStore;
use whoshome_app::TriggerEngine;

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(
    name = "whoshomed",
    about = "Fires commands when devices join or leave the local network",
    version
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Execute exactly one polling cycle.
    Run,
    /// Execute one polling cycle every `loop_every_sec` seconds.
    Watch,
    /// Load and validate the configuration, then print a summary.
    CheckConfig,
}

type Engine =
    TriggerEngine<IpNeighSource, NslookupResolver, ProcessLauncher, JsonStateStore, CronGate>;

fn build_engine(config: &Config) -> Engine {
    TriggerEngine::new(
        IpNeighSource::new(),
        NslookupResolver::new(),
        ProcessLauncher::new(),
        JsonStateStore::new(config.main.state_file.clone()),
        CronGate::new(),
    )
}

fn init_tracing(filter: &str) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(filter)?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.main.log_filter)?;

    let sections = config.sections()?;
    let machines = config.known_machines();

    match cli.command {
        CliCommand::CheckConfig => {
            println!("state file: {}", config.main.state_file.display());
            println!("loop period: {}s", config.main.loop_every_sec);
            match &machines {
                Some(table) => println!("machines: {} aliases", table.len()),
                None => println!("machines: no alias table"),
            }
            for section in &sections {
                println!(
                    "section {:?}: {}, threshold {}, device {}, cron {}",
                    section.name,
                    if section.enabled { "enabled" } else { "disabled" },
                    section.threshold,
                    section.device.as_deref().unwrap_or("all"),
                    section.cron.as_deref().unwrap_or("always"),
                );
            }
            Ok(())
        }
        CliCommand::Run => {
            let engine = build_engine(&config);
            let report = engine
                .run_cycle(&sections, machines.as_ref(), whoshome_domain::time::now())
                .await?;
            tracing::info!(
                sections = report.sections.len(),
                dispatched = report.dispatched(),
                "cycle complete"
            );
            Ok(())
        }
        CliCommand::Watch => {
            let engine = build_engine(&config);
            let period = Duration::from_secs(config.main.loop_every_sec.max(1));
            loop {
                match engine
                    .run_cycle(&sections, machines.as_ref(), whoshome_domain::time::now())
                    .await
                {
                    Ok(report) => tracing::info!(
                        sections = report.sections.len(),
                        dispatched = report.dispatched(),
                        "cycle complete"
                    ),
                    Err(err) => tracing::error!(error = %err, "cycle failed"),
                }
                tokio::time::sleep(period).await;
            }
        }
    }
}
