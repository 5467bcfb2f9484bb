//! Session configuration for Beam.
//!
//! There is no config file and no environment lookup: a Beam invocation
//! is fully described by the values passed to the session constructors.
//! The defaults here are the tool's well-known values; the peer address
//! is always explicit.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::{DEFAULT_CHUNK_SIZE, DEFAULT_PORT, DEFAULT_RETRY_INTERVAL_MS};

/// How the dialer retries its connection attempts.
///
/// The default policy retries forever on a fixed interval; tests cap
/// `max_attempts` so a missing listener fails fast instead of blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between connection attempts
    pub interval: Duration,
    /// Give up after this many attempts (None = retry forever)
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_RETRY_INTERVAL_MS),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// A policy that stops after `attempts` tries.
    #[must_use]
    pub fn bounded(attempts: u32, interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: Some(attempts),
        }
    }
}

/// Configuration for the hosting (sending) side.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Port the listener binds on
    pub port: u16,
    /// Preferred chunk size in bytes; the session uses the minimum of
    /// this and the receiver's proposal
    pub chunk_size: u64,
    /// The one peer address the listener will accept
    pub allowed_peer: IpAddr,
}

impl SenderConfig {
    /// Create a sender configuration for the given whitelisted peer,
    /// with default port and chunk size.
    #[must_use]
    pub fn new(allowed_peer: IpAddr) -> Self {
        Self {
            port: DEFAULT_PORT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            allowed_peer,
        }
    }
}

/// Configuration for the dialing (receiving) side.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Address of the hosting peer
    pub peer: SocketAddr,
    /// Chunk size proposed during negotiation
    pub chunk_size: u64,
    /// Connection retry behavior
    pub retry: RetryPolicy,
    /// Directory received files are written into
    pub output_dir: PathBuf,
}

impl ReceiverConfig {
    /// Create a receiver configuration dialing the given peer, with
    /// default chunk size and retry policy, writing into the current
    /// directory.
    #[must_use]
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry: RetryPolicy::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_default_is_unbounded() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(500));
        assert_eq!(policy.max_attempts, None);
    }

    #[test]
    fn test_retry_policy_bounded() {
        let policy = RetryPolicy::bounded(3, Duration::from_millis(10));
        assert_eq!(policy.max_attempts, Some(3));
    }

    #[test]
    fn test_sender_config_defaults() {
        let config = SenderConfig::new("192.168.1.7".parse().unwrap());
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_receiver_config_defaults() {
        let config = ReceiverConfig::new("192.168.1.7:1234".parse().unwrap());
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.output_dir, PathBuf::from("."));
    }
}
