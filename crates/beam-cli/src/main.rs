//! Beam CLI - direct single-file transfer between two hosts
//!
//! One invocation moves one file. The side holding the file hosts a
//! listener that only accepts the named peer; the other side dials in.
//!
//! ## Quick Start
//!
//! ```bash
//! # Host a file for 192.168.1.42 to pick up
//! beam 192.168.1.42 ./document.pdf
//!
//! # On 192.168.1.42, fetch it from the host at 192.168.1.7
//! beam 192.168.1.7
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::Parser;

mod commands;
pub mod ui;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.file {
        Some(file) => commands::send::run(&cli.peer, file).await,
        None => commands::receive::run(&cli.peer).await,
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,beam=info,beam_core=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
