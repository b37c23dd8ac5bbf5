//! Live race monitor.
//!
//! Demonstrates:
//! - Starting a RaceClient against a race server
//! - Following every published snapshot
//! - Playing cues locally or on the server
//!
//! Usage:
//!   cargo run --example monitor
//!   cargo run --example monitor -- --url ws://raceserver.local:8383/sclx
//!   cargo run --example monitor -- --remote-audio
//!   cargo run --example monitor -- --player aplay
//!   cargo run --example monitor -- --debug

// ============================================================================
// Imports
// ============================================================================

use anyhow::{Context, Result};
use sclx_live::client::options::DEFAULT_URL;
use sclx_live::{
    CommandPlayer, ControllerId, RaceClient, RaceSnapshot, RaceState, format_clock,
    format_lap_time,
};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Args
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    url: String,
    debug: bool,
    remote_audio: bool,
    player: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .cloned()
        };

        Self {
            url: value_of("--url").unwrap_or_else(|| DEFAULT_URL.to_string()),
            debug: args.iter().any(|a| a == "--debug"),
            remote_audio: args.iter().any(|a| a == "--remote-audio"),
            player: value_of("--player"),
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "sclx_live=debug"
    } else {
        "sclx_live=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Race Monitor: {} ===\n", args.url);

    let mut builder = RaceClient::builder().url(&args.url);
    if args.remote_audio {
        builder = builder.remote_audio();
    } else if let Some(program) = &args.player {
        builder = builder.local_audio(CommandPlayer::new(program));
    }
    let client = builder.build().context("starting race client")?;

    let mut updates = client.subscribe();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let race = updates.borrow_and_update().clone();
                print_snapshot(&race);
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    client.shutdown().await;
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn print_snapshot(race: &RaceSnapshot) {
    if !race.connected {
        println!("[--:--:--] waiting for race server");
        return;
    }

    let clock = format_clock(race.clock);
    match race.state {
        RaceState::Countdown => println!("[{clock}] countdown {}", race.countdown),
        RaceState::Binding => println!(
            "[{clock}] binding controller {}",
            race.binding_target
                .map_or_else(|| "-".to_string(), |id| id.to_string())
        ),
        state => println!("[{clock}] {state:?}, {} laps", race.target_laps),
    }

    for car in &race.cars {
        if car.laps == 0 {
            continue;
        }
        let driver = ControllerId::new(car.id.get())
            .and_then(|slot| race.driver_for(slot))
            .map_or("?", |d| d.name.as_str());
        println!(
            "           car {} {:<12} lap {:>3}  last {:>8}  best {:>8}",
            car.id,
            driver,
            car.laps,
            format_lap_time(car.last_lap_time),
            format_lap_time(car.best_lap_time),
        );
    }

    if let Some(winner) = race.winner {
        println!("           winner: car {winner}");
    }
    if race.show_false_start
        && let Some(car) = race.false_start_car
    {
        println!("           FALSE START: car {car}");
    }
    if race.show_race_finished {
        println!("           race finished");
    }
    if race.show_laps_update {
        println!("           lap target changed to {}", race.target_laps);
    }
}
