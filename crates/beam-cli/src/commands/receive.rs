//! Receive command: dial the hosting peer and take the file it offers.

use anyhow::{Context, Result};

use beam_core::config::ReceiverConfig;
use beam_core::connection::parse_host_address;
use beam_core::error::Error;
use beam_core::transfer::ReceiveSession;

use crate::ui;

/// Dial `peer` until the listener shows up and receive one file into
/// the current directory.
pub async fn run(peer: &str) -> Result<()> {
    let peer_addr = parse_host_address(peer)?;
    let config = ReceiverConfig::new(peer_addr);

    println!();
    println!("Beam v{}", beam_core::VERSION);
    println!("  Trying to connect to {peer_addr}...");

    let session = match ReceiveSession::connect(config).await {
        Ok(session) => session,
        Err(Error::ConnectionRejected) => {
            // Expected outcome, not a fault: report and exit cleanly
            println!("  Connection rejected. Perhaps your address was mistyped on the other end?");
            return Ok(());
        }
        Err(e) => return Err(e).context("could not reach the hosting peer"),
    };

    let progress_rx = session.progress();
    let progress_handle = tokio::spawn(async move {
        ui::display_progress(progress_rx, "received").await;
    });

    let result = session.receive().await;
    let _ = progress_handle.await;

    let path = result.context("transfer failed")?;
    println!("  Saved to {}", path.display());
    Ok(())
}
