// # hostsync-core
//
// Core library for the hostsync dynamic DNS reconciler.
//
// ## Architecture Overview
//
// - **DnsApi**: Trait for the raw provider API (zones, records, updates)
// - **IpSource**: Trait for discovering the public IP address
// - **ProviderClient**: Zone resolution, record cache refresh, single-host updates
// - **RecordCache**: Host → record snapshot, rebuilt on every refresh
// - **Reconciler**: One pass of refresh → observe IP → compare → update
// - **Scheduler**: Immediate pass, then one per interval tick, with a bounded tick queue
//
// ## Design Principles
//
// 1. **Fresh state per pass**: every pass starts from a new zone snapshot
// 2. **Idempotency**: no write is issued for a record that already points at the IP
// 3. **Provider is authoritative**: the cache stores what the provider returned
// 4. **Explicit escalation**: only fatal error kinds stop the process

pub mod cache;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod traits;

// Re-export core types for convenience
pub use cache::RecordCache;
pub use client::{ProviderClient, ZoneSnapshot};
pub use config::{FailurePolicy, HostsyncConfig, ZoneMatch};
pub use engine::{HostOutcome, HostStatus, PassReport, Reconciler};
pub use error::{Error, Result};
pub use model::{DnsRecord, Zone};
pub use scheduler::{Scheduler, TICK_BUFFER};
pub use traits::{DnsApi, IpSource};
