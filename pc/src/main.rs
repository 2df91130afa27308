//! pc - preemption-signal sidecar
//!
//! CLI entry point for watching, checking and acknowledging preemption.

use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{error, info};

use preemption::cli::{Cli, Command, OutputFormat};
use preemption::config::Config;
use preemption::master::{ControlPlane, HttpControlPlane};
use preemption::watcher::PreemptState;
use preemption::{LocalGroup, Preemption, PreemptionError, create_preemption};

fn setup_logging(verbose: bool) -> Result<()> {
    // Logs go to stderr so stdout stays parseable
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(
        "pc loaded config: master={}, allocation={}, mode={}",
        config.master.url, config.allocation_id, config.mode
    );

    match cli.command {
        Command::Watch { no_ack, interval } => cmd_watch(config, no_ack, interval).await,
        Command::Check { format } => cmd_check(&config, format).await,
        Command::Ack => cmd_ack(&config).await,
        Command::ShowConfig => cmd_show_config(&config),
    }
}

/// Poll until the master signals preemption or the user interrupts
async fn cmd_watch(mut config: Config, no_ack: bool, interval: Option<u64>) -> Result<()> {
    config.validate()?;
    if let Some(secs) = interval {
        config.check_interval_secs = secs;
    }

    // One-process group: this sidecar is its own chief, so a configured rank other than 0 is rejected
    let mut coordinator = match create_preemption(&config, Arc::new(LocalGroup::single())) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            report_failure(&e);
            return Err(e.into());
        }
    };
    coordinator.start()?;

    let outcome = tokio::select! {
        result = wait_for_preemption(coordinator.as_mut(), !no_ack, &config) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping watch");
            Ok(false)
        }
    };
    coordinator.close().await;

    match outcome {
        Ok(true) => {
            println!("{} allocation {}", "PREEMPTED".red().bold(), config.allocation_id);
            Ok(())
        }
        Ok(false) => Ok(()),
        Err(e) => {
            report_failure(&e);
            Err(e.into())
        }
    }
}

fn report_failure(e: &PreemptionError) {
    if e.is_misuse() {
        error!(error = %e, "Preemption misconfigured (check rank and mode)");
    } else {
        error!(error = %e, "Watch failed");
    }
}

async fn wait_for_preemption(
    coordinator: &mut dyn Preemption,
    auto_ack: bool,
    config: &Config,
) -> Result<bool, PreemptionError> {
    loop {
        if coordinator.should_preempt(auto_ack).await? {
            return Ok(true);
        }
        tokio::time::sleep(config.check_interval()).await;
    }
}

/// One zero-wait poll of the master
async fn cmd_check(config: &Config, format: OutputFormat) -> Result<()> {
    config.validate()?;
    let master = HttpControlPlane::from_config(&config.master)?;
    let preempt = master
        .get_preemption(&config.allocation_id, 0, config.watcher.request_timeout(0))
        .await
        .context("Failed to query preemption state")?;
    let state = PreemptState::from_signal(preempt);

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "allocation_id": config.allocation_id,
                "state": state,
                "preempt": preempt,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            let label = if preempt { state.to_string().red().bold() } else { state.to_string().green() };
            println!("{}: {}", config.allocation_id, label);
        }
    }
    Ok(())
}

async fn cmd_ack(config: &Config) -> Result<()> {
    config.validate()?;
    let master = HttpControlPlane::from_config(&config.master)?;
    master
        .ack_preemption(&config.allocation_id)
        .await
        .context("Failed to acknowledge preemption")?;
    println!("{} preemption for {}", "Acknowledged".green(), config.allocation_id);
    Ok(())
}

fn cmd_show_config(config: &Config) -> Result<()> {
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}
