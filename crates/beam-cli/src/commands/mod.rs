//! CLI argument definitions and command handlers.

use std::path::PathBuf;

use clap::Parser;

pub mod receive;
pub mod send;

/// Beam - direct single-file transfer between two hosts
///
/// With a file path, hosts that file and accepts only the given peer.
/// Without one, dials the given peer and receives whatever it offers.
#[derive(Parser)]
#[command(name = "beam")]
#[command(author, version, about)]
pub struct Cli {
    /// Peer address: the whitelisted dialer when sending, the host to
    /// dial when receiving. Accepts IP or IP:PORT.
    pub peer: String,

    /// File to send; omit to receive instead
    pub file: Option<PathBuf>,
}
