// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! avdecc-node - IEEE 1722.1 endpoint on a UDP-tunnelled segment
//!
//! Runs one engine with a loopback data plane. Several nodes started on the
//! same group and port discover each other and accept connection commands.
//!
//! # Usage
//!
//! ```bash
//! # Two nodes on one host
//! avdecc-node --mac 02:00:00:00:00:01
//! avdecc-node --mac 02:00:00:00:00:02 --json
//!
//! # Using configuration file
//! avdecc-node --config node.toml
//!
//! # Write a template / check a file
//! avdecc-node gen-config --output node.toml
//! avdecc-node validate --config node.toml
//! ```

mod config;
mod loopback;
mod tunnel;

use avdecc::{AdvertiseState, Engine, Event, StatusCode, SystemClock};
use clap::{Parser, Subcommand};
use config::{NodeConfig, NodeError};
use loopback::{Completion, LoopbackDataPlane};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tunnel::UdpTunnel;

type NodeEngine = Engine<SystemClock, LoopbackDataPlane>;

/// IEEE 1722.1 endpoint
#[derive(Parser, Debug)]
#[command(name = "avdecc-node")]
#[command(about = "IEEE 1722.1 discovery and connection management endpoint")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local MAC address (overrides config)
    #[arg(long)]
    mac: Option<String>,

    /// Serial number folded into the entity GUID (overrides config)
    #[arg(long)]
    serial: Option<u16>,

    /// Tunnel multicast group (overrides config)
    #[arg(long)]
    group: Option<Ipv4Addr>,

    /// Tunnel UDP port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Periodic interval in ms (overrides config)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print events as JSON lines on stdout
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "avdecc-node.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Some(cmd) = args.command {
        return match cmd {
            Commands::GenConfig { output } => cmd_gen_config(output),
            Commands::Validate { config } => cmd_validate(config),
        };
    }

    let config = build_config(&args)?;
    run(&config, args.json)
}

fn build_config(args: &Args) -> Result<NodeConfig, NodeError> {
    let mut config = match args.config {
        Some(ref path) => NodeConfig::from_file(path)?,
        None => NodeConfig::default(),
    };

    if let Some(ref mac) = args.mac {
        config.node.mac = mac.clone();
    }
    if let Some(serial) = args.serial {
        config.node.serial = serial;
    }
    if let Some(group) = args.group {
        config.node.group = group;
    }
    if let Some(port) = args.port {
        config.node.port = port;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.node.interval_ms = interval_ms;
    }

    config.validate()?;
    Ok(config)
}

fn run(config: &NodeConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mac = config.node.mac_addr()?;
    let mut tunnel = UdpTunnel::open(config.node.group, config.node.port, mac)?;

    let data_plane = LoopbackDataPlane::new(
        usize::from(config.engine.max_listeners),
        usize::from(config.engine.max_talkers),
    );
    let mut engine = Engine::new(
        config.engine.clone(),
        mac,
        config.node.serial,
        SystemClock::new(),
        data_plane,
    )?;

    if let Some(dest) = config.node.talker_dest()? {
        for uid in 0..config.engine.max_talkers {
            engine.talker_set_mac_address(uid, dest)?;
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    tracing::info!(
        "avdecc-node v{} entity {} on {}:{}",
        env!("CARGO_PKG_VERSION"),
        engine.guid(),
        config.node.group,
        config.node.port
    );

    if config.node.announce {
        engine.sdp_announce();
    }
    engine.sdp_discover_all();

    let interval = Duration::from_millis(config.node.interval_ms);
    let mut departing = false;

    loop {
        if !departing && !running.load(Ordering::SeqCst) {
            tracing::info!("Departing...");
            engine.sdp_depart();
            departing = true;
        }

        loop {
            match tunnel.recv() {
                Ok(Some(frame)) => {
                    engine.process_packet(frame);
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("receive failed: {}", e);
                    break;
                }
            }
        }

        while let Some(event) = engine.periodic(&mut tunnel) {
            report(&event, json)?;
            complete(&mut engine, &mut tunnel, &event);
        }

        if departing && engine.advertise_state() == AdvertiseState::Idle {
            break;
        }
        std::thread::sleep(interval);
    }

    tracing::info!(
        "stopped after {} frames, {} known entities",
        engine.frames_sent(),
        engine.entities().len()
    );
    Ok(())
}

fn report(event: &Event, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else {
        tracing::info!("{:?}", event);
    }
    Ok(())
}

/// Answer data-plane requests; the loopback plane never fails
fn complete(engine: &mut NodeEngine, tunnel: &mut UdpTunnel, event: &Event) {
    match engine.data_plane_mut().apply(event) {
        Some(Completion::Talker) => {
            engine.scm_talker_connection_complete(StatusCode::Success, tunnel);
        }
        Some(Completion::Listener) => {
            engine.scm_listener_connection_complete(StatusCode::Success);
        }
        None => {}
    }
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = NodeConfig::default().to_toml()?;

    let content = format!(
        r#"# avdecc-node configuration
# Generated by avdecc-node gen-config
#
# [node]   mac, serial (GUID), tunnel group/port, periodic interval
# [engine] table capacities, advertised identity, TX command timeouts

{}
"#,
        toml_str
    );

    std::fs::write(&output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match NodeConfig::from_file(&config_path) {
        Ok(config) => {
            let mac = config.node.mac_addr()?;
            println!("Configuration valid!");
            println!();
            println!(
                "Entity:   {}",
                avdecc::Guid::from_mac(mac, config.node.serial)
            );
            println!("MAC:      {}", mac);
            println!("Segment:  {}:{}", config.node.group, config.node.port);
            println!(
                "Streams:  {} talker(s), {} listener(s)",
                config.engine.max_talkers, config.engine.max_listeners
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}
