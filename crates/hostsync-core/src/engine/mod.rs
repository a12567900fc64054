//! Reconciliation pass
//!
//! One pass is: refresh the zone snapshot, observe the public IP, then walk
//! the configured hosts in order and update every record that does not
//! already point at that IP. Only the record matching the IP's family is
//! considered (A for IPv4, AAAA for IPv6); a host without one fails with
//! [`Error::NotFound`].
//!
//! ## Flow
//!
//! ```text
//! ┌────────────┐  refresh_cache()   ┌────────────────┐
//! │ Reconciler │ ─────────────────▶ │ ProviderClient │──▶ DnsApi
//! └────────────┘                    └────────────────┘
//!       │ current()
//!       ▼
//! ┌────────────┐
//! │  IpSource  │
//! └────────────┘
//!       │
//!       ▼
//!  per host: unchanged | update_record() | failed
//!       │
//!       ▼
//!  PassReport (one outcome per host, config order)
//! ```
//!
//! ## Failure handling
//!
//! A failure before the host loop (zone resolution, listing, IP discovery)
//! fails the whole pass. Inside the loop a failed host is recorded and the
//! next host is processed, unless the error is fatal (see
//! [`Error::is_fatal`]), in which case the pass stops and returns it.

use chrono::{DateTime, Utc};
use std::net::IpAddr;
use tracing::{debug, info, warn};

use crate::client::{ProviderClient, ZoneSnapshot};
use crate::error::{Error, Result};
use crate::model::DnsRecord;
use crate::traits::{DnsApi, IpSource};

/// What happened to one host during a pass
#[derive(Debug)]
pub enum HostStatus {
    /// Record already pointed at the observed IP; no request was made
    Unchanged {
        /// Current record content
        content: String,
    },

    /// Record was updated
    Updated {
        /// Content before the update
        previous: String,
        /// Record as returned by the provider
        record: DnsRecord,
    },

    /// Update could not be made
    Failed {
        /// Why
        error: Error,
    },
}

/// Outcome for a single configured host
#[derive(Debug)]
pub struct HostOutcome {
    /// Host name
    pub host: String,
    /// What happened
    pub status: HostStatus,
}

impl HostOutcome {
    /// Whether an update request succeeded for this host
    pub fn is_updated(&self) -> bool {
        matches!(self.status, HostStatus::Updated { .. })
    }

    /// Whether this host was left alone because it was already current
    pub fn is_unchanged(&self) -> bool {
        matches!(self.status, HostStatus::Unchanged { .. })
    }

    /// Whether this host failed
    pub fn is_failed(&self) -> bool {
        matches!(self.status, HostStatus::Failed { .. })
    }
}

/// Result of one reconciliation pass
#[derive(Debug)]
pub struct PassReport {
    /// The observed public IP
    pub ip: IpAddr,
    /// Zone and records after the pass, including applied updates
    pub snapshot: ZoneSnapshot,
    /// One entry per configured host, in configuration order
    pub outcomes: Vec<HostOutcome>,
    /// When the pass started
    pub started_at: DateTime<Utc>,
    /// When the pass finished
    pub finished_at: DateTime<Utc>,
}

impl PassReport {
    /// Number of hosts updated
    pub fn updated_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_updated()).count()
    }

    /// Number of hosts already current
    pub fn unchanged_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_unchanged()).count()
    }

    /// Number of hosts that failed
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    /// Consume the report, keeping the first host failure
    pub fn into_first_failure(self) -> Option<Error> {
        self.outcomes.into_iter().find_map(|o| match o.status {
            HostStatus::Failed { error } => Some(error),
            _ => None,
        })
    }
}

/// Runs reconciliation passes for a fixed list of hosts
pub struct Reconciler<A> {
    /// Provider client for the configured zone
    client: ProviderClient<A>,

    /// Public IP discovery
    ip_source: Box<dyn IpSource>,

    /// Hosts to keep current, in processing order
    hosts: Vec<String>,
}

impl<A: DnsApi> Reconciler<A> {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `client`: Provider client for the zone the hosts live in
    /// - `ip_source`: Public IP discovery
    /// - `hosts`: Host names to manage, processed in this order
    pub fn new(client: ProviderClient<A>, ip_source: Box<dyn IpSource>, hosts: Vec<String>) -> Self {
        Self {
            client,
            ip_source,
            hosts,
        }
    }

    /// Configured hosts
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// The provider client
    pub fn client(&self) -> &ProviderClient<A> {
        &self.client
    }

    /// Run one full pass: refresh, observe, reconcile
    ///
    /// # Returns
    ///
    /// - `Ok(PassReport)`: Every host was processed (some may have failed)
    /// - `Err(Error)`: The pass could not start, or a host hit a fatal error
    pub async fn run_pass(&self) -> Result<PassReport> {
        let started_at = Utc::now();

        // Always start from a fresh listing so earlier passes can't leak in
        let mut snapshot = self.client.refresh_cache().await?;
        debug!(
            "Zone {} refreshed: {} record(s)",
            snapshot.zone.name,
            snapshot.records.len()
        );

        let ip = self.ip_source.current().await?;
        debug!("{} reports public IP {}", self.ip_source.source_name(), ip);

        let outcomes = self.reconcile(&mut snapshot, ip).await?;

        Ok(PassReport {
            ip,
            snapshot,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Bring every configured host in `snapshot` to `ip`
    ///
    /// Hosts are processed sequentially. Non-fatal failures are recorded
    /// and processing continues; the first fatal error ends the walk.
    pub async fn reconcile(
        &self,
        snapshot: &mut ZoneSnapshot,
        ip: IpAddr,
    ) -> Result<Vec<HostOutcome>> {
        let record_type = DnsRecord::type_for(ip);
        let mut outcomes = Vec::with_capacity(self.hosts.len());

        for host in &self.hosts {
            let current = snapshot.records.get(host, record_type);

            if let Some(record) = current.filter(|r| r.points_to(ip)) {
                info!("No update required. Host: {}, IP: {}", host, ip);
                outcomes.push(HostOutcome {
                    host: host.clone(),
                    status: HostStatus::Unchanged {
                        content: record.content.clone(),
                    },
                });
                continue;
            }

            let previous = current.map(|r| r.content.clone()).unwrap_or_default();

            let status = match self.client.update_record(snapshot, host, ip).await {
                Ok(record) => {
                    info!("Updated {} with ip {} (was: {})", host, ip, previous);
                    HostStatus::Updated { previous, record }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Failed to update {}: {}", host, e);
                    HostStatus::Failed { error: e }
                }
            };

            outcomes.push(HostOutcome {
                host: host.clone(),
                status,
            });
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: HostStatus) -> HostOutcome {
        HostOutcome {
            host: "a.example.com".to_string(),
            status,
        }
    }

    #[test]
    fn test_outcome_predicates() {
        let unchanged = outcome(HostStatus::Unchanged {
            content: "1.1.1.1".to_string(),
        });
        assert!(unchanged.is_unchanged());
        assert!(!unchanged.is_updated());

        let failed = outcome(HostStatus::Failed {
            error: Error::not_found("a.example.com"),
        });
        assert!(failed.is_failed());
        assert!(!failed.is_unchanged());
    }
}
