//! Send command: host a file for one whitelisted peer.

use std::path::PathBuf;

use anyhow::{Context, Result};

use beam_core::config::SenderConfig;
use beam_core::connection::parse_host_address;
use beam_core::file::format_size;
use beam_core::transfer::SendSession;

use crate::ui;

/// Host `file` and stream it to `peer` once it dials in.
pub async fn run(peer: &str, file: PathBuf) -> Result<()> {
    let peer_addr = parse_host_address(peer)?;

    // The port names the rendezvous on both ends: the peer dials it, we
    // bind it.
    let mut config = SenderConfig::new(peer_addr.ip());
    config.port = peer_addr.port();

    let session = SendSession::bind(config, file.clone())
        .await
        .with_context(|| format!("cannot host '{}'", file.display()))?;
    let local = session.local_addr()?;

    println!();
    println!("Beam v{}", beam_core::VERSION);
    println!(
        "  Hosting \"{}\" ({}) on port {}",
        session.file_name(),
        format_size(session.file_size()),
        local.port()
    );
    println!("  Waiting for {}...", peer_addr.ip());

    let progress_rx = session.progress();
    let progress_handle = tokio::spawn(async move {
        ui::display_progress(progress_rx, "sent").await;
    });

    let result = session.send().await;
    let _ = progress_handle.await;

    result.context("transfer failed")
}
