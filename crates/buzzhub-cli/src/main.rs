//! Command-line host for the buzzer quiz game.

mod app;
mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use buzzhub_core::{Color, LedFrame, PressError};
use clap::{Parser, Subcommand};
use futures::future::try_join_all;
use tracing::{error, info, warn};

use crate::app::App;
use crate::config::AppConfig;

/// Buzzhub - buzzer quiz game host.
#[derive(Parser, Debug)]
#[command(name = "buzzhub")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Configuration file (JSON).
    #[arg(short, long, global = true, default_value = "backend-config.json")]
    config: PathBuf,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to the buzzers and serve the dashboard.
    Serve,
    /// Exercise every protocol verb once, then report the first press of
    /// a few rounds.
    Demo {
        /// Press rounds to run.
        #[arg(short, long, default_value_t = 3)]
        rounds: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = AppConfig::load(&args.config)?;

    match args.command {
        Command::Serve => run_server(config).await,
        Command::Demo { rounds } => run_demo(config, rounds).await,
    }
}

fn init_logging(verbose: bool) {
    // JSON logs for container environments
    let json_logging = std::env::var("BUZZHUB_LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_directive = if verbose { "buzzhub=debug" } else { "buzzhub=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    }
}

/// Serve the dashboard on every configured address. Losing the link is
/// fatal.
async fn run_server(config: AppConfig) -> Result<()> {
    let app = App::start(&config).await?;
    app.machine.enter_idle().await?;

    let presser = config
        .simulator
        .press_interval_secs
        .map(|secs| app.spawn_presser(Duration::from_secs(secs)));

    let state = app.server_state();
    let servers = config
        .webpage
        .bind
        .iter()
        .map(|bind| buzzhub_api::run(state.clone(), bind));

    let result = tokio::select! {
        served = try_join_all(servers) => served.map(|_| ()),
        _ = app.link_lost() => {
            error!("Link to the buzzers was lost");
            Err(anyhow::anyhow!("Link disconnected"))
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    };

    if let Some(presser) = presser {
        presser.abort();
    }
    result
}

/// Run each verb once against the connected buzzers and print the replies.
async fn run_demo(config: AppConfig, rounds: u32) -> Result<()> {
    let app = App::start(&config).await?;
    let commands = &app.commands;

    let synced = commands.auto_sync_clock(None).await?;
    println!("Clock sync acknowledged: {}", synced);

    let palette = [
        Color::new(15, 0, 0),
        Color::new(15, 15, 0),
        Color::new(0, 15, 0),
        Color::new(0, 15, 15),
        Color::new(0, 0, 15),
        Color::new(15, 0, 15),
    ];
    let frame = LedFrame::from_fn(config.game.led_count, |i| palette[i % palette.len()]);
    commands.set_leds(&frame, None).await?;

    for reading in commands.clock_readings(None).await? {
        println!("Clock of {}: {}", reading.address, reading.clock);
    }

    let addresses = commands.ping_addresses(None).await?;
    println!("Connected buzzers: {}", addresses.len());
    for address in &addresses {
        println!("  {}", address);
    }
    if let Some(first) = addresses.first() {
        let answered = commands.ping_addresses(Some(*first)).await?;
        println!("Targeted ping of {} answered: {}", first, !answered.is_empty());
    }

    let check = commands.check_led_count(config.game.led_count).await?;
    println!(
        "LED counts {:?}, expected {} ({})",
        check.reported,
        check.expected,
        if check.is_consistent() { "OK" } else { "MISMATCH" }
    );

    if addresses.is_empty() {
        bail!("No buzzer answered");
    }

    let presses = app.transport.presses();
    for round in 0..rounds {
        let address = addresses[round as usize % addresses.len()];
        let network = app.network.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            if let Err(e) = network.press(&address).await {
                warn!("Simulated press failed: {}", e);
            }
        });

        match presses.wait_for_next_press(Some(Duration::from_secs(5))).await {
            Ok(press) => println!("Round {}: first press {}", round + 1, press),
            Err(PressError::Timeout) => println!("Round {}: no press", round + 1),
            Err(e) => return Err(e.into()),
        }
    }

    commands.clear_leds(None).await?;
    Ok(())
}
