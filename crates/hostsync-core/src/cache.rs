// # Record Cache
//
// In-memory mapping from host name to the last-known record snapshots.
//
// ## Lifecycle
//
// - Built wholesale from a record listing on every refresh
// - Never merged with a previous snapshot: entries that vanished at the
//   provider vanish here too
// - Individual entries are overwritten only with records returned by the
//   provider after a successful update, matched by record id
//
// ## Consistency
//
// The cache reflects the provider as of its last refresh. Changes made to
// the zone by anyone else are only seen at the next refresh.

use std::collections::HashMap;

use crate::model::DnsRecord;

/// Host name → records mapping for one zone
///
/// A name can carry several records (an A and an AAAA for a dual-stack
/// host, for instance). All of them are kept in listing order, exactly as
/// the provider returned them; lookups pick one by record type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordCache {
    inner: HashMap<String, Vec<DnsRecord>>,
}

impl RecordCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache from a full record listing
    pub fn from_records(records: impl IntoIterator<Item = DnsRecord>) -> Self {
        let mut inner: HashMap<String, Vec<DnsRecord>> = HashMap::new();
        for record in records {
            inner.entry(record.name.clone()).or_default().push(record);
        }
        Self { inner }
    }

    /// Look up the record of `record_type` for a host
    ///
    /// Types compare case-insensitively. If the listing had several records
    /// of that type under one name, the first one listed is returned.
    pub fn get(&self, host: &str, record_type: &str) -> Option<&DnsRecord> {
        self.records(host).iter().find(|r| r.is_type(record_type))
    }

    /// Every cached record for a host, in listing order
    pub fn records(&self, host: &str) -> &[DnsRecord] {
        self.inner.get(host).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether the cache has any record for `host`
    pub fn contains(&self, host: &str) -> bool {
        self.inner.contains_key(host)
    }

    /// Store `record` under `host`, replacing the entry with the same id
    ///
    /// The record is kept as given, even if its own name differs from
    /// `host` (a provider may normalize names in its answer).
    ///
    /// # Returns
    ///
    /// The record previously cached under that host and id, if any.
    pub fn replace(&mut self, host: &str, record: DnsRecord) -> Option<DnsRecord> {
        let entries = self.inner.entry(host.to_string()).or_default();
        match entries.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => Some(std::mem::replace(slot, record)),
            None => {
                entries.push(record);
                None
            }
        }
    }

    /// Number of cached records
    pub fn len(&self) -> usize {
        self.inner.values().map(Vec::len).sum()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Cached host names, in no particular order
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }
}
