// # DNS API Trait
//
// The raw provider surface the provider client is built on: find a zone,
// list its records, replace one record.
//
// ## Implementations
//
// - Cloudflare v4 REST API: `hostsync-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use hostsync_core::DnsApi;
//
// async fn dump(api: &dyn DnsApi) -> hostsync_core::Result<()> {
//     for zone in api.find_zones("example.com").await? {
//         for record in api.list_records(&zone.id).await? {
//             println!("{} {} {}", record.name, record.record_type, record.content);
//         }
//     }
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::model::{DnsRecord, Zone};

/// Trait for DNS provider API implementations
///
/// Each method is a single request against the provider. Implementations
/// hold no state beyond their HTTP client and credentials: zone resolution
/// policy, caching and the decision to update all live in
/// [`ProviderClient`](crate::client::ProviderClient).
///
/// # Errors
///
/// Implementations map rejected credentials to
/// [`Error::Authentication`](crate::Error::Authentication), transport
/// failures to [`Error::Network`](crate::Error::Network) and any other
/// unsuccessful answer to [`Error::Provider`](crate::Error::Provider).
#[async_trait]
pub trait DnsApi: Send + Sync {
    /// List zones whose name equals `name`
    ///
    /// An empty list is a successful answer; interpreting it is up to the
    /// caller.
    async fn find_zones(&self, name: &str) -> Result<Vec<Zone>, crate::Error>;

    /// List every DNS record in a zone
    async fn list_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Replace a record (addressed by `record.id`) with `record`
    ///
    /// # Returns
    ///
    /// The record as stored by the provider after the update.
    async fn put_record(
        &self,
        zone_id: &str,
        record: &DnsRecord,
    ) -> Result<DnsRecord, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
