//! # Beam Core Library
//!
//! `beam-core` provides the core functionality for Beam, a direct
//! host-to-host single-file transfer tool.
//!
//! One peer hosts a listener on a fixed port and only accepts the one
//! whitelisted address it was given; the other peer dials that address
//! until the listener shows up. After a one-byte accept/reject handshake
//! the two sides agree on a chunk size and the file moves across the
//! wire in fixed-size chunks, arriving byte-identical and with the same
//! permission bits under a collision-free name.
//!
//! ## Modules
//!
//! - [`config`] - Session configuration (port, chunk size, retry policy)
//! - [`connection`] - Peer address parsing and whitelist matching
//! - [`mod@file`] - Destination naming, exclusive creation, permissions
//! - [`protocol`] - Wire codec, handshake signals, and transfer manifest
//! - [`transfer`] - Sender and receiver sessions driving the chunk loop
//!
//! ## Example
//!
//! ```rust,ignore
//! use beam_core::config::{ReceiverConfig, SenderConfig};
//! use beam_core::transfer::{ReceiveSession, SendSession};
//!
//! // Host the file and wait for the whitelisted peer
//! let session = SendSession::bind(config, "report.pdf".into()).await?;
//! session.send().await?;
//!
//! // On the other host, dial in and receive
//! let session = ReceiveSession::connect(config).await?;
//! let path = session.receive().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod connection;
pub mod error;
pub mod file;
pub mod protocol;
pub mod transfer;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default transfer port (TCP)
pub const DEFAULT_PORT: u16 = 1234;

/// Default chunk size for file transfers, in bytes
pub const DEFAULT_CHUNK_SIZE: u64 = 1024;

/// Default interval between connection attempts (milliseconds)
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 500;
