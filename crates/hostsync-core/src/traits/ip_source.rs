// # IP Source Trait
//
// Defines the interface for discovering the caller's public IP address.
//
// ## Implementations
//
// - HTTP echo service: `hostsync-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use hostsync_core::IpSource;
//
// async fn show(source: &dyn IpSource) -> hostsync_core::Result<()> {
//     let ip = source.current().await?;
//     println!("{} says we are {}", source.source_name(), ip);
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for IP source implementations
///
/// Sources are queried once per reconciliation pass and must not cache:
/// the pass relies on every call reflecting the address as of now.
/// Scheduling is owned by [`Scheduler`](crate::scheduler::Scheduler);
/// sources never poll on their own.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The observed address
    /// - `Err(Error)`: If the address could not be determined
    async fn current(&self) -> Result<IpAddr, crate::Error>;

    /// Short name for logs (e.g. "http")
    fn source_name(&self) -> &'static str;
}
