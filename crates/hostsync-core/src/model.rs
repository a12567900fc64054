//! Provider data model
//!
//! Field names follow the provider's JSON so these types double as the
//! wire representation.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// A DNS domain managed by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider-assigned zone identifier
    pub id: String,
    /// Domain name (e.g. "example.com")
    pub name: String,
}

/// A single DNS entry within a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Fully qualified record name (e.g. "a.example.com")
    pub name: String,
    /// Provider-assigned record identifier
    pub id: String,
    /// Record type ("A", "AAAA", "CNAME", ...)
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record value, the IP address for A/AAAA records
    pub content: String,
}

impl DnsRecord {
    /// Whether this record already points at `ip`.
    ///
    /// Contents are compared as addresses, so textual variants of the same
    /// IPv6 address match. Content that is not an address never matches.
    pub fn points_to(&self, ip: IpAddr) -> bool {
        self.content
            .trim()
            .parse::<IpAddr>()
            .is_ok_and(|current| current == ip)
    }

    /// Record type that holds an address of `ip`'s family
    pub fn type_for(ip: IpAddr) -> &'static str {
        match ip {
            IpAddr::V4(_) => "A",
            IpAddr::V6(_) => "AAAA",
        }
    }

    /// Whether this record is of `record_type`, ignoring case
    pub fn is_type(&self, record_type: &str) -> bool {
        self.record_type.eq_ignore_ascii_case(record_type)
    }

    /// Copy of this record with only the content replaced
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }
}
