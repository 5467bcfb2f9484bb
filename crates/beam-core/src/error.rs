//! Error types for Beam.
//!
//! This module provides a unified error type for all Beam operations,
//! with specific error variants for different failure modes.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A specialized `Result` type for Beam operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Beam.
#[derive(Error, Debug)]
pub enum Error {
    /// The listener turned this connection away
    #[error("connection rejected by the remote host (was your address whitelisted on the other end?)")]
    ConnectionRejected,

    /// A signal byte was outside the accept/reject domain
    #[error("expected an accept (1) or reject (0) signal, got {0}")]
    UnexpectedSignal(u8),

    /// The remote host replied with a chunk size larger than we proposed
    #[error("remote host inflated the chunk size: proposed {proposed}, got back {returned}")]
    ChunkSizeRejected {
        /// Chunk size we proposed
        proposed: u64,
        /// Chunk size the remote host sent back
        returned: u64,
    },

    /// Remote peer aborted after chunk-size negotiation
    #[error("remote host declined the negotiated chunk size")]
    NegotiationDeclined,

    /// A wire field violated the protocol
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The received filename cannot be used as a destination name
    #[error("unusable filename from remote host: {0}")]
    InvalidFileName(String),

    /// Exclusive creation of the resolved destination lost a race
    #[error("destination '{}' already exists", .0.display())]
    DestinationExists(PathBuf),

    /// A peer address argument could not be parsed
    #[error("{0}")]
    InvalidAddress(String),

    /// A bounded dial policy ran out of attempts
    #[error("gave up connecting after {0} attempts")]
    RetriesExhausted(u32),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
