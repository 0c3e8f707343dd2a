//! Wheel Relay - snapshot relay for attention wheel clients
//!
//! Accepts persistent TCP connections speaking newline-delimited JSON.
//! Each inbound message is acknowledged to its sender and, depending on the
//! configured mode, forwarded to every other client and retained for late
//! joiners.
//!
//! Config file (optional):
//! - Linux: ~/.config/attention_wheel/relay.json
//! - Windows: %APPDATA%\attention_wheel\relay.json
//! - MacOS: ~/Library/Application Support/attention_wheel/relay.json

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};

mod broadcaster;
mod config;
mod error;
mod health;
mod hub;
mod paths;
mod protocol;
mod server;

use broadcaster::StateBroadcaster;
use config::CliArgs;
use paths::AppPaths;

fn print_help() {
    println!("wheel_relay (attention wheel snapshot relay)");
    println!("usage: wheel_relay [--config path] [--addr host:port] [--mode echo|broadcast|replay] [--health host:port]");
    println!();
    println!("  --config   JSON config file (default: platform config dir, if present)");
    println!("  --addr     listen address (default {})", config::DEFAULT_LISTEN_ADDR);
    println!("  --mode     echo: ack only; broadcast: forward to others; replay: forward + retain latest");
    println!("  --health   serve a plain-text liveness check at http://host:port/health");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = CliArgs::parse(&args)?;
    if cli.help {
        print_help();
        return Ok(());
    }

    if let Ok(paths) = AppPaths::new() {
        info!("Config directory: {:?}", paths.config_dir());
    }
    let cfg = config::resolve(&cli)?;

    let (events, events_rx) = mpsc::unbounded_channel();
    tokio::spawn(hub::run(StateBroadcaster::new(cfg.mode), events_rx));

    if let Some(health_addr) = cfg.health_addr.clone() {
        let events = events.clone();
        tokio::spawn(async move {
            if let Err(e) = health::serve(&health_addr, events).await {
                error!("Health listener failed: {}", e);
            }
        });
    }

    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C: shutting down");
            std::process::exit(0);
        }
    });

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("Wheel relay listening on {} ({} mode)", cfg.listen_addr, cfg.mode);

    server::serve(listener, events).await?;
    Ok(())
}
