//! Virtual-host reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request     ┌────────┐   ┌────────┐   ┌──────────────────────────────┐
//!     ──────────────────▶│  net   │──▶│  http  │──▶│ routing                      │
//!                        │listener│   │ server │   │ vhost → rewrite → hooks      │
//!                        └────────┘   └───┬────┘   └──────────────┬───────────────┘
//!                                         │                       │
//!                                         │   Redirect / Handled / Error / Proxy
//!                                         ◀───────────────────────┘
//!                                         │
//!     Client Response                     ▼ (Proxy only)
//!     ◀───────────────────────────── backend host:port
//! ```

use arc_swap::ArcSwap;
use clap::{error::ErrorKind, ArgAction, CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use vhost_proxy::config::loader::load_routing;
use vhost_proxy::config::watcher::ConfigWatcher;
use vhost_proxy::lifecycle::{signals, Shutdown};
use vhost_proxy::net::listener::bind_all;
use vhost_proxy::observability::{logging, metrics};
use vhost_proxy::routing::HookRegistry;
use vhost_proxy::HttpServer;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "vhost-proxy", version, disable_help_flag = true)]
#[command(about = "Reverse HTTP proxy routing on the Host header, with rewrite rules and hooks")]
struct Cli {
    /// Use the specified config file.
    #[arg(long, default_value = "./rewrites.toml")]
    config: PathBuf,

    /// Override the port to listen upon from the config file.
    #[arg(long)]
    port: Option<u16>,

    /// Show debugging information whilst running.
    #[arg(long)]
    debug: bool,

    /// Dump the routing table, and exit.
    #[arg(long)]
    dump: bool,

    /// Reload the config file when it changes.
    #[arg(long)]
    watch: bool,

    /// Show this help.
    #[arg(long, action = ArgAction::SetTrue)]
    help: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.kind() == ErrorKind::DisplayVersion => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    if cli.help {
        println!("vhost-proxy - {}\n", VERSION);
        println!("{}", Cli::command().render_help());
        return ExitCode::FAILURE;
    }

    let registry = HookRegistry::new();
    let (config, table) = match load_routing(&cli.config, &registry) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.dump {
        print!("{}", table.dump());
        return ExitCode::SUCCESS;
    }

    logging::init_logging(&config.observability.log_level, cli.debug);

    tracing::info!("vhost-proxy v{} starting", VERSION);
    tracing::debug!(path = ?cli.config, vhosts = table.len(), "Configuration loaded");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let port = cli.port.unwrap_or(config.port);
    let listeners = match bind_all(&config.bind, port).await {
        Ok(listeners) => listeners,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let table = Arc::new(ArcSwap::from_pointee(table));
    let server = HttpServer::new(table, &config);

    // Dropping the watcher stops notifications, so it lives until main returns.
    let _watcher = if cli.watch {
        let (watcher, updates) = ConfigWatcher::new(&cli.config, registry.clone());
        server.watch_updates(updates);
        match watcher.run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::error!(error = %e, "Failed to watch config file");
                return ExitCode::FAILURE;
            }
        }
    } else {
        None
    };

    let shutdown = Shutdown::new();
    let tasks: Vec<_> = listeners
        .into_iter()
        .map(|listener| tokio::spawn(server.clone().run(listener, shutdown.subscribe())))
        .collect();

    tracing::info!("Awaiting requests ...");

    signals::wait_for_shutdown_signal().await;
    shutdown.trigger();

    let mut code = ExitCode::SUCCESS;
    for task in tasks {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Listener failed");
                code = ExitCode::FAILURE;
            }
            Err(e) => {
                tracing::error!(error = %e, "Listener task panicked");
                code = ExitCode::FAILURE;
            }
        }
    }

    tracing::info!("Shutdown complete");
    code
}
