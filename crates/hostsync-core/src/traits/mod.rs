//! Collaborator traits
//!
//! - [`DnsApi`]: raw provider API calls
//! - [`IpSource`]: public IP discovery

pub mod dns_api;
pub mod ip_source;

pub use dns_api::DnsApi;
pub use ip_source::IpSource;
