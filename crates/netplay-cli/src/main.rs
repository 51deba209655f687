//! netplay CLI: run a netplay server or client from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use netplay_session::setup::load_config;
use netplay_session::validate::{validate_address, validate_port};
use netplay_session::{Config, MachineLink, NullMachine, SessionManager, SessionOptions};
use netplay_types::{ControlChannel, ControlMask, SessionMode, Side};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "netplay",
    about = "Share an emulator session between two machines",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for a netplay client.
    Serve {
        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<String>,

        /// Local address to listen on (empty for all interfaces).
        #[arg(short, long)]
        bind: Option<String>,

        #[arg(short, long)]
        port: Option<i64>,

        /// Control spec "k,j1,j2,dev,rsrc" overriding the configured mask.
        #[arg(long)]
        control: Option<String>,

        /// File whose contents are sent to the client as the machine snapshot.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Connect to a netplay server.
    Connect {
        /// Server to connect to (defaults to the configured server name).
        host: Option<String>,

        #[arg(short, long)]
        port: Option<i64>,

        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<String>,

        /// Control spec "k,j1,j2,dev,rsrc" overriding the configured mask.
        #[arg(long)]
        control: Option<String>,

        /// File the received machine snapshot is written to.
        #[arg(long)]
        snapshot_out: Option<PathBuf>,
    },

    /// Decode a control spec and show which side drives each channel.
    Control {
        /// Control spec "k,j1,j2,dev,rsrc"; each digit 0 none, 1 server, 2 client, 3 both.
        spec: String,
    },
}

/// Machine state backed by a file on disk.
struct FileMachine {
    path: PathBuf,
}

#[async_trait]
impl MachineLink for FileMachine {
    async fn snapshot(&self) -> anyhow::Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("reading snapshot {}", self.path.display()))
    }

    async fn restore(&self, snapshot: Vec<u8>) -> anyhow::Result<()> {
        tokio::fs::write(&self.path, &snapshot)
            .await
            .with_context(|| format!("writing snapshot {}", self.path.display()))?;
        info!(path = %self.path.display(), size = snapshot.len(), "snapshot saved");
        Ok(())
    }
}

fn init_tracing(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.netplay.log_level)),
        )
        .init();
}

fn session_options(config: &Config, control: Option<&str>) -> anyhow::Result<SessionOptions> {
    let mut options = SessionOptions::from_config(config);
    if let Some(spec) = control {
        options.control = ControlMask::parse_spec(spec)?;
    }
    Ok(options)
}

fn machine(path: Option<PathBuf>) -> Arc<dyn MachineLink> {
    match path {
        Some(path) => Arc::new(FileMachine { path }),
        None => Arc::new(NullMachine),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            bind,
            port,
            control,
            snapshot,
        } => {
            let config = load_config(config.as_deref())?;
            init_tracing(&config);
            let bind = bind.unwrap_or_else(|| config.netplay.bind_address.clone());
            let port = validate_port(port.unwrap_or(i64::from(config.netplay.port)))?;
            let options = session_options(&config, control.as_deref())?;

            let manager = SessionManager::new(machine(snapshot), options);
            manager
                .start_server(&bind, port)
                .await
                .context("An error occurred starting the server.")?;
            run_session(&manager).await;
        }
        Commands::Connect {
            host,
            port,
            config,
            control,
            snapshot_out,
        } => {
            let config = load_config(config.as_deref())?;
            init_tracing(&config);
            let host = host.unwrap_or_else(|| config.netplay.server_name.clone());
            let host = validate_address(&host)?;
            let port = validate_port(port.unwrap_or(i64::from(config.netplay.port)))?;
            let options = session_options(&config, control.as_deref())?;

            let manager = SessionManager::new(machine(snapshot_out), options);
            manager
                .connect_client(host, port)
                .await
                .context("An error occurred connecting the client.")?;
            run_session(&manager).await;
        }
        Commands::Control { spec } => {
            let mask = ControlMask::parse_spec(&spec)?;
            println!("mask: {mask}");
            for channel in ControlChannel::ALL {
                let owner = match (
                    mask.permits(channel, Side::Server),
                    mask.permits(channel, Side::Client),
                ) {
                    (false, false) => "none",
                    (true, false) => "server",
                    (false, true) => "client",
                    (true, true) => "both",
                };
                println!("{:<10} {owner}", channel.label());
            }
        }
    }

    Ok(())
}

/// Report mode changes and remote events until ctrl-c or the session ends.
async fn run_session(manager: &SessionManager) {
    let mut modes = manager.subscribe();
    let Some(mut remote) = manager.take_remote_events() else {
        warn!("remote events already taken");
        return;
    };
    println!("status: {}", manager.mode());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, disconnecting");
                manager.disconnect();
                break;
            }
            changed = modes.changed() => {
                if changed.is_err() {
                    break;
                }
                let mode = *modes.borrow_and_update();
                println!("status: {mode}");
                if mode == SessionMode::Idle {
                    break;
                }
            }
            Some(event) = remote.recv() => {
                info!(?event, "remote event");
            }
        }
    }
}
