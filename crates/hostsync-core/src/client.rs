//! Provider client
//!
//! Sits between the reconciliation pass and a [`DnsApi`] implementation:
//!
//! - resolves the configured zone name to a provider zone
//! - lists its records and builds a fresh [`ZoneSnapshot`]
//! - updates a single host's record and folds the provider's answer back
//!   into the snapshot
//!
//! The client itself holds no zone or record state. Each refresh produces a
//! new snapshot that the caller owns, so a reconciliation pass never sees
//! leftovers from a previous one.

use chrono::{DateTime, Utc};
use std::net::IpAddr;
use tracing::debug;

use crate::cache::RecordCache;
use crate::config::ZoneMatch;
use crate::error::{Error, Result};
use crate::model::{DnsRecord, Zone};
use crate::traits::DnsApi;

/// Zone and record cache as of one refresh
#[derive(Debug, Clone)]
pub struct ZoneSnapshot {
    /// The resolved zone
    pub zone: Zone,
    /// Host → records mapping for the zone
    pub records: RecordCache,
    /// When the listing was fetched
    pub refreshed_at: DateTime<Utc>,
}

/// Client for one zone at one provider
pub struct ProviderClient<A> {
    api: A,
    zone_name: String,
    zone_match: ZoneMatch,
}

impl<A: DnsApi> ProviderClient<A> {
    /// Create a client for `zone_name` with the strict zone lookup policy
    pub fn new(api: A, zone_name: impl Into<String>) -> Self {
        Self {
            api,
            zone_name: zone_name.into(),
            zone_match: ZoneMatch::default(),
        }
    }

    /// Set the zone lookup policy
    pub fn with_zone_match(mut self, zone_match: ZoneMatch) -> Self {
        self.zone_match = zone_match;
        self
    }

    /// The configured zone name
    pub fn zone_name(&self) -> &str {
        &self.zone_name
    }

    /// The underlying API
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Resolve a zone by name
    ///
    /// # Errors
    ///
    /// - [`Error::ZoneNotFound`] if the provider has no zone by that name
    /// - [`Error::AmbiguousZone`] if it returns several and the policy is
    ///   [`ZoneMatch::Strict`]
    pub async fn resolve_zone(&self, name: &str) -> Result<Zone> {
        let mut zones = self.api.find_zones(name).await?;

        match (zones.len(), self.zone_match) {
            (0, _) => Err(Error::zone_not_found(name)),
            (1, _) | (_, ZoneMatch::First) => {
                let zone = zones.swap_remove(0);
                debug!("Resolved zone {} to id {}", zone.name, zone.id);
                Ok(zone)
            }
            (count, ZoneMatch::Strict) => Err(Error::AmbiguousZone {
                name: name.to_string(),
                count,
            }),
        }
    }

    /// Fetch every record under a zone
    pub async fn list_records(&self, zone: &Zone) -> Result<Vec<DnsRecord>> {
        let records = self.api.list_records(&zone.id).await?;
        debug!("Listed {} record(s) in zone {}", records.len(), zone.name);
        Ok(records)
    }

    /// Re-resolve the zone and rebuild the record cache from scratch
    ///
    /// Records are not listed when the zone cannot be resolved.
    pub async fn refresh_cache(&self) -> Result<ZoneSnapshot> {
        let zone = self.resolve_zone(&self.zone_name).await?;
        let records = RecordCache::from_records(self.list_records(&zone).await?);

        Ok(ZoneSnapshot {
            zone,
            records,
            refreshed_at: Utc::now(),
        })
    }

    /// Point `host`'s record for `ip`'s address family at `ip`
    ///
    /// Only the host's A record is touched for an IPv4 address, and only its
    /// AAAA record for IPv6. The cached record is sent back with only its
    /// content replaced. On success the snapshot entry is overwritten with
    /// the record returned by the provider, not the one sent.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the snapshot has no record of the matching
    ///   type for `host`; no request is made
    /// - whatever the API returns for the update request
    pub async fn update_record(
        &self,
        snapshot: &mut ZoneSnapshot,
        host: &str,
        ip: IpAddr,
    ) -> Result<DnsRecord> {
        let record_type = DnsRecord::type_for(ip);
        let desired = snapshot
            .records
            .get(host, record_type)
            .ok_or_else(|| {
                Error::not_found(format!(
                    "{} has no {} record in zone {}",
                    host, record_type, snapshot.zone.name
                ))
            })?
            .with_content(ip.to_string());

        debug!(
            "Updating {} record {} ({}) -> {}",
            desired.record_type, desired.name, desired.id, ip
        );

        let stored = self.api.put_record(&snapshot.zone.id, &desired).await?;
        if stored.name != host {
            debug!("Provider returned name {} for host {}", stored.name, host);
        }
        snapshot.records.replace(host, stored.clone());

        Ok(stored)
    }
}
