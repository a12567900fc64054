//! Error types for hostsync
//!
//! Every fallible operation in the workspace returns [`Result`]. The
//! variants double as the escalation taxonomy: [`Error::is_fatal`] decides
//! whether the scheduler keeps ticking or the process stops.

use thiserror::Error;

/// Result type alias for hostsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure talking to the provider or the IP service
    #[error("Network error: {0}")]
    Network(String),

    /// Credentials rejected by the provider
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Provider answered, but not with a usable success
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// The provider has no zone with the configured name
    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    /// The provider returned more than one zone for the configured name
    #[error("Zone name {name} is ambiguous: provider returned {count} zones")]
    AmbiguousZone {
        /// Configured zone name
        name: String,
        /// Number of matches returned
        count: usize,
    },

    /// Host has no record in the current cache snapshot
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The IP discovery service returned something unusable
    #[error("IP discovery error: {0}")]
    IpDiscovery(String),

    /// A runtime invariant of hostsync itself was broken
    #[error("Internal error: {0}")]
    Internal(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a "zone not found" error
    pub fn zone_not_found(name: impl Into<String>) -> Self {
        Self::ZoneNotFound(name.into())
    }

    /// Create a "record not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an IP discovery error
    pub fn ip_discovery(msg: impl Into<String>) -> Self {
        Self::IpDiscovery(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error must stop the process.
    ///
    /// Bad credentials and an unresolvable zone cannot fix themselves on the
    /// next tick, so they escalate. Transport hiccups, provider 5xx, a host
    /// missing from the zone and a garbled IP response only affect the
    /// current pass (or host) and are retried by the next tick.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Authentication(_)
                | Self::ZoneNotFound(_)
                | Self::AmbiguousZone { .. }
                | Self::Internal(_)
        )
    }
}
