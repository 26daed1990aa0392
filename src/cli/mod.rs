//! # CLI Module
//!
//! Command-line entry points for the `cardikit` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Bind the card API and serve it until the process is stopped:
//!
//! ```bash
//! cardikit serve --config cardikit.toml --addr 0.0.0.0:8080
//! ```
//!
//! Options:
//! - `--config <FILE>` - TOML configuration (defaults apply when omitted)
//! - `--addr <ADDR>` - Overrides `server.addr`
//! - `--workers <N>` - Overrides `server.workers`
//!
//! ### `routes`
//!
//! Print the route table with each route's gate chain:
//!
//! ```bash
//! cardikit routes --config cardikit.toml
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use cardikit::cli::{run_cli, Cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse())?;
//! ```

mod commands;


pub use commands::{render_routes, run_cli, Cli, Commands};
