//! VESEC cabinet controller node
//!
//! Composition root: builds the shared state, command bus, module bank,
//! contactor matrix and allocation engine, then spawns the single-writer
//! allocation service. An interactive shell plays the role of the telemetry
//! transport; `--simulate` adds a random demand/SOC feed.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rand::Rng;
use tokio::time::interval;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vesec_core::{
    AllocationEngine, AllocationService, CommandBus, ContactorMatrix, ModuleBank, ScoringPolicy,
    StationConfig, StationState, GUN_COUNT,
};

/// VESEC power cabinet controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the station configuration file
    #[arg(short, long, default_value = "vesec.json")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Feed simulated demand and SOC telemetry
    #[arg(long)]
    simulate: bool,
}

/// Shell input parsed on the stdin thread
enum ShellCommand {
    Publish { topic: String, payload: String },
    Alloc(u8),
    Status,
    MaxPower(u8, f64),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup logging
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("VESEC cabinet controller starting");

    // Explicit construction, wired at startup
    let config = StationConfig::load_or_create(&args.config);
    let (bus, mut command_rx) = CommandBus::channel();
    let state = StationState::shared();
    let bank = ModuleBank::new(bus.clone(), config.module_power());
    let matrix = ContactorMatrix::new(bus);
    let engine = AllocationEngine::new(config, ScoringPolicy::default(), state, bank, matrix)
        .with_config_path(&args.config);
    let handle = AllocationService::spawn(engine);

    // Hardware bridge: the opaque signaling layer hooks in here
    tokio::spawn(async move {
        while let Some(command) = command_rx.recv().await {
            match command.to_bytes() {
                Ok(frame) => info!("hw ← {}", String::from_utf8_lossy(&frame)),
                Err(e) => info!("hw ← {:?} (unencodable: {})", command, e),
            }
        }
    });

    // Simulated telemetry feed
    if args.simulate {
        let sim_handle = handle.clone();
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(3));
            loop {
                ticker.tick().await;
                let (gun, demand, soc) = {
                    let mut rng = rand::thread_rng();
                    (
                        rng.gen_range(1..=GUN_COUNT),
                        rng.gen_range(0..=7) as f64 * 40.0,
                        rng.gen_range(5.0..95.0_f64).round(),
                    )
                };
                sim_handle
                    .ingest(&format!("vesec/{}/soc/sim", gun), &soc.to_string())
                    .await;
                sim_handle
                    .ingest(&format!("vesec/{}/demand/sim", gun), &demand.to_string())
                    .await;
            }
        });
    }

    // Shell input on a blocking thread
    let (shell_tx, mut shell_rx) = tokio::sync::mpsc::channel::<ShellCommand>(16);
    std::thread::spawn(move || {
        println!("\nCommands:");
        println!("  demand <gun> <kw>        - Report power demand for a gun");
        println!("  soc <gun> <percent>      - Report battery SOC for a gun");
        println!("  vstatus <gun> <state>    - Report vehicle status for a gun");
        println!("  alloc <gun>              - Show a gun's allocation");
        println!("  status                   - Show all guns");
        println!("  maxpower <gun> <kw>      - Set a gun's power ceiling");
        println!("  quit                     - Exit\n");

        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let parts: Vec<&str> = line.trim().split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }

            let command = match parts[0] {
                "demand" | "soc" | "vstatus" if parts.len() == 3 => {
                    let kind = if parts[0] == "vstatus" { "vehicle_status" } else { parts[0] };
                    Some(ShellCommand::Publish {
                        topic: format!("vesec/{}/{}/shell", parts[1], kind),
                        payload: parts[2].to_string(),
                    })
                }
                "alloc" if parts.len() == 2 => match parts[1].parse() {
                    Ok(gun) => Some(ShellCommand::Alloc(gun)),
                    Err(_) => {
                        println!("Invalid gun id");
                        None
                    }
                },
                "status" => Some(ShellCommand::Status),
                "maxpower" if parts.len() == 3 => {
                    match (parts[1].parse(), parts[2].parse()) {
                        (Ok(gun), Ok(kw)) => Some(ShellCommand::MaxPower(gun, kw)),
                        _ => {
                            println!("Usage: maxpower <gun> <kw>");
                            None
                        }
                    }
                }
                "quit" | "exit" => std::process::exit(0),
                _ => {
                    println!("Unknown command. Try: demand <gun> <kw>");
                    None
                }
            };

            if let Some(command) = command {
                if shell_tx.blocking_send(command).is_err() {
                    break;
                }
            }
        }
    });

    // Main event loop
    while let Some(command) = shell_rx.recv().await {
        match command {
            ShellCommand::Publish { topic, payload } => {
                handle.ingest(&topic, &payload).await;
            }
            ShellCommand::Alloc(gun) => match handle.allocation(gun).await {
                Ok(allocation) => println!("{}", serde_json::to_string_pretty(&allocation)?),
                Err(e) => println!("error: {}", e),
            },
            ShellCommand::Status => match handle.snapshot().await {
                Ok(snapshot) => {
                    for gun in &snapshot.guns {
                        println!(
                            "gun {}: demand {:>6.1} kW  soc {:>5.1}%  {:<9}  modules {:?}",
                            gun.gun_id,
                            gun.demand_kw,
                            gun.soc_percent,
                            gun.vehicle_status.to_string(),
                            gun.modules_assigned.iter().map(|m| m.get()).collect::<Vec<_>>(),
                        );
                    }
                }
                Err(e) => println!("error: {}", e),
            },
            ShellCommand::MaxPower(gun, kw) => {
                if let Err(e) = handle.set_gun_max_power(gun, kw).await {
                    println!("error: {}", e);
                }
            }
        }
    }

    Ok(())
}
