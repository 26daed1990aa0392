use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::app::build_routes;
use crate::config::AppConfig;
use crate::controllers::CardController;
use crate::dispatcher::Dispatcher;
use crate::router::RouteTable;
use crate::server::{AppService, HttpServer};

/// Command-line interface for the Cardikit API server
#[derive(Parser)]
#[command(name = "cardikit")]
#[command(about = "Cardikit API server", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the card API over HTTP
    Serve {
        /// TOML configuration file
        #[arg(short, long, env = "CARDIKIT_CONFIG")]
        config: Option<PathBuf>,

        /// Address and port to bind, overrides `server.addr`
        #[arg(long)]
        addr: Option<String>,

        /// Worker thread count, overrides `server.workers`
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Print the route table
    Routes {
        /// TOML configuration file
        #[arg(short, long, env = "CARDIKIT_CONFIG")]
        config: Option<PathBuf>,
    },
}

/// Execute the command provided by the user.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, a route pattern
/// is malformed, or the server cannot bind its address.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve {
            config,
            addr,
            workers,
        } => {
            let mut config = AppConfig::load(config.as_deref()).context("Failed to load config")?;
            if let Some(addr) = addr {
                config.server.addr = addr;
            }
            if let Some(workers) = workers {
                config.server.workers = workers;
            }
            if config.security.api_tokens.is_empty() {
                info!("No API tokens configured, write routes will answer 401");
            }

            let cards = Arc::new(CardController::new());
            let table = build_routes(&config, &cards).context("Failed to build routes")?;
            let service = AppService::new(Arc::new(Dispatcher::new(table)));
            let handle = HttpServer::new(service)
                .workers(config.server.workers)
                .max_body_bytes(config.server.max_body_bytes)
                .start(config.server.addr.as_str())
                .with_context(|| format!("Failed to bind {}", config.server.addr))?;
            println!("🚀 Cardikit listening on http://{}", handle.addr());
            handle.join();
        }
        Commands::Routes { config } => {
            let config = AppConfig::load(config.as_deref()).context("Failed to load config")?;
            let table = build_routes(&config, &Arc::new(CardController::new()))
                .context("Failed to build routes")?;
            print!("{}", render_routes(&table));
        }
    }
    Ok(())
}

/// One line per route: method, pattern, then the gate chain in run order.
#[must_use]
pub fn render_routes(table: &RouteTable) -> String {
    let mut out = String::new();
    for route in table.iter() {
        let gates = route.gates.names();
        out.push_str(&format!(
            "{:<7} {:<40} {}\n",
            route.method.as_str(),
            route.pattern.as_str(),
            if gates.is_empty() {
                "-".to_string()
            } else {
                gates.join(" > ")
            }
        ));
    }
    out
}
