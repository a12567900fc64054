//! Test doubles and common utilities for contract tests
//!
//! The fakes share their state through `Arc`, so a test keeps a clone to
//! inspect call counts after handing the original to the code under test.

#![allow(dead_code)]

use hostsync_core::error::{Error, Result};
use hostsync_core::traits::{DnsApi, IpSource};
use hostsync_core::{DnsRecord, ProviderClient, Reconciler, Zone};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Kinds of failure a fake can be told to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Provider answered 5xx
    Transient,
    /// Credentials rejected
    Unauthorized,
    /// Transport failure
    Network,
}

impl Failure {
    fn to_error(self, what: &str) -> Error {
        match self {
            Failure::Transient => Error::provider("fake", format!("{}: 502 Bad Gateway", what)),
            Failure::Unauthorized => Error::auth(format!("{}: 401 Unauthorized", what)),
            Failure::Network => Error::network(format!("{}: connection reset", what)),
        }
    }
}

#[derive(Default)]
struct FakeState {
    zones: Mutex<Vec<Zone>>,
    records: Mutex<Vec<DnsRecord>>,
    find_failure: Mutex<Option<Failure>>,
    put_failures: Mutex<HashMap<String, Failure>>,
    find_calls: AtomicUsize,
    list_calls: AtomicUsize,
    puts: Mutex<Vec<(String, DnsRecord)>>,
}

/// An in-memory provider that records every call
#[derive(Clone, Default)]
pub struct FakeDnsApi {
    state: Arc<FakeState>,
}

impl FakeDnsApi {
    /// A provider hosting `zone` with id "zone-1" and the given records
    pub fn with_zone(zone: &str, records: Vec<DnsRecord>) -> Self {
        let api = Self::default();
        api.add_zone("zone-1", zone);
        *api.state.records.lock().unwrap() = records;
        api
    }

    pub fn add_zone(&self, id: &str, name: &str) {
        self.state.zones.lock().unwrap().push(Zone {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    /// Change a record behind the client's back
    pub fn set_content(&self, name: &str, content: &str) {
        for record in self.state.records.lock().unwrap().iter_mut() {
            if record.name == name {
                record.content = content.to_string();
            }
        }
    }

    pub fn fail_find(&self, failure: Failure) {
        *self.state.find_failure.lock().unwrap() = Some(failure);
    }

    pub fn fail_put_for(&self, host: &str, failure: Failure) {
        self.state
            .put_failures
            .lock()
            .unwrap()
            .insert(host.to_string(), failure);
    }

    pub fn find_calls(&self) -> usize {
        self.state.find_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }

    pub fn put_count(&self) -> usize {
        self.state.puts.lock().unwrap().len()
    }

    /// Records sent in update requests, in order
    pub fn puts(&self) -> Vec<DnsRecord> {
        self.state
            .puts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Names of hosts sent in update requests, in order
    pub fn put_hosts(&self) -> Vec<String> {
        self.puts().into_iter().map(|r| r.name).collect()
    }

    /// The provider's current copy of a record, looked up by id
    pub fn stored_by_id(&self, id: &str) -> Option<DnsRecord> {
        self.state
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// The provider's current copy of the first record with `name`
    pub fn stored(&self, name: &str) -> Option<DnsRecord> {
        self.state
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.name == name)
            .cloned()
    }
}

#[async_trait::async_trait]
impl DnsApi for FakeDnsApi {
    async fn find_zones(&self, name: &str) -> Result<Vec<Zone>> {
        self.state.find_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = *self.state.find_failure.lock().unwrap() {
            return Err(failure.to_error("find_zones"));
        }
        Ok(self
            .state
            .zones
            .lock()
            .unwrap()
            .iter()
            .filter(|z| z.name == name)
            .cloned()
            .collect())
    }

    async fn list_records(&self, _zone_id: &str) -> Result<Vec<DnsRecord>> {
        self.state.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.records.lock().unwrap().clone())
    }

    async fn put_record(&self, zone_id: &str, record: &DnsRecord) -> Result<DnsRecord> {
        self.state
            .puts
            .lock()
            .unwrap()
            .push((zone_id.to_string(), record.clone()));

        if let Some(failure) = self.state.put_failures.lock().unwrap().get(&record.name) {
            return Err(failure.to_error("put_record"));
        }

        let mut records = self.state.records.lock().unwrap();
        let stored = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| Error::provider("fake", "81044: Record does not exist"))?;
        stored.content = record.content.clone();
        Ok(stored.clone())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// An IP source returning a settable address
#[derive(Clone)]
pub struct FixedIpSource {
    ip: Arc<Mutex<IpAddr>>,
    failures_left: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl FixedIpSource {
    pub fn new(ip: &str) -> Self {
        Self {
            ip: Arc::new(Mutex::new(ip.parse().expect("valid test IP"))),
            failures_left: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set(&self, ip: &str) {
        *self.ip.lock().unwrap() = ip.parse().expect("valid test IP");
    }

    /// Make the next `n` calls fail with a network error
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for FixedIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::network("checkip: connection timed out"));
        }
        Ok(*self.ip.lock().unwrap())
    }

    fn source_name(&self) -> &'static str {
        "fixed"
    }
}

/// Build an A record with a predictable id
pub fn a_record(name: &str, content: &str) -> DnsRecord {
    DnsRecord {
        name: name.to_string(),
        id: format!("id-{}", name),
        record_type: "A".to_string(),
        content: content.to_string(),
    }
}

/// Build an AAAA record with a predictable id
pub fn aaaa_record(name: &str, content: &str) -> DnsRecord {
    DnsRecord {
        name: name.to_string(),
        id: format!("id6-{}", name),
        record_type: "AAAA".to_string(),
        content: content.to_string(),
    }
}

/// Build a CNAME record with a predictable id
pub fn cname_record(name: &str, target: &str) -> DnsRecord {
    DnsRecord {
        name: name.to_string(),
        id: format!("cname-{}", name),
        record_type: "CNAME".to_string(),
        content: target.to_string(),
    }
}

/// Build a reconciler for zone "example.com" over the given fakes
pub fn reconciler(api: &FakeDnsApi, ip: &FixedIpSource, hosts: &[&str]) -> Reconciler<FakeDnsApi> {
    Reconciler::new(
        ProviderClient::new(api.clone(), "example.com"),
        Box::new(ip.clone()),
        hosts.iter().map(|h| h.to_string()).collect(),
    )
}
