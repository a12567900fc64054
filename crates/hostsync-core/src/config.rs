//! Configuration for hostsync
//!
//! Configuration comes from environment variables (optionally seeded from a
//! `.env` file) and is immutable once loaded. Every key has a `DDNS_*` name;
//! the short legacy names (`CFKEY`, `CFZONE`, ...) are accepted as fallbacks
//! so existing `.env` files keep working.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default IP discovery endpoint (plain-text response)
pub const DEFAULT_IP_URL: &str = "http://checkip.amazonaws.com/";

/// Default Cloudflare API base URL
pub const DEFAULT_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// Environment variable naming an alternative `.env` file
pub const ENV_FILE_VAR: &str = "DDNS_ENV_FILE";

const API_TOKEN: (&str, Option<&str>) = ("DDNS_API_TOKEN", Some("CFKEY"));
const ACCOUNT: (&str, Option<&str>) = ("DDNS_ACCOUNT", Some("CFUSER"));
const ZONE: (&str, Option<&str>) = ("DDNS_ZONE", Some("CFZONE"));
const HOSTS: (&str, Option<&str>) = ("DDNS_HOSTS", Some("CFHOSTS"));
const INTERVAL: (&str, Option<&str>) = ("DDNS_INTERVAL", Some("TICKTIME"));
const IP_URL: (&str, Option<&str>) = ("DDNS_IP_URL", None);
const API_URL: (&str, Option<&str>) = ("DDNS_API_URL", None);
const ZONE_MATCH: (&str, Option<&str>) = ("DDNS_ZONE_MATCH", None);
const FAILURE_POLICY: (&str, Option<&str>) = ("DDNS_FAILURE_POLICY", None);
const LOG_LEVEL: (&str, Option<&str>) = ("DDNS_LOG_LEVEL", None);

/// How a zone lookup by name picks among the provider's matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoneMatch {
    /// Exactly one match is required
    #[default]
    Strict,
    /// Take the first match, whatever follows
    First,
}

impl FromStr for ZoneMatch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "first" => Ok(Self::First),
            other => Err(Error::config(format!(
                "{} '{}' is not valid. Valid values: strict, first",
                ZONE_MATCH.0, other
            ))),
        }
    }
}

/// Which failures stop the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Only errors classified fatal by [`Error::is_fatal`] stop the process;
    /// per-host failures are logged and the pass moves on
    #[default]
    Continue,
    /// Any failed pass or failed host stops the process
    FailFast,
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "fail-fast" | "failfast" => Ok(Self::FailFast),
            other => Err(Error::config(format!(
                "{} '{}' is not valid. Valid values: continue, fail-fast",
                FAILURE_POLICY.0, other
            ))),
        }
    }
}

/// Main hostsync configuration
#[derive(Clone, Serialize)]
pub struct HostsyncConfig {
    /// Provider API token
    #[serde(skip_serializing)]
    pub api_token: String,

    /// Provider account identity (informational)
    pub account: Option<String>,

    /// DNS zone to manage (e.g. "example.com")
    pub zone: String,

    /// Hosts to keep pointed at the public IP, in processing order
    pub hosts: Vec<String>,

    /// Time between reconciliation passes
    pub interval: Duration,

    /// IP discovery endpoint
    pub ip_url: String,

    /// Provider API base URL
    pub api_url: String,

    /// Zone lookup policy
    pub zone_match: ZoneMatch,

    /// Failure escalation policy
    pub failure_policy: FailurePolicy,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

// The token must never reach a log line
impl fmt::Debug for HostsyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostsyncConfig")
            .field("api_token", &"<REDACTED>")
            .field("account", &self.account)
            .field("zone", &self.zone)
            .field("hosts", &self.hosts)
            .field("interval", &self.interval)
            .field("ip_url", &self.ip_url)
            .field("api_url", &self.api_url)
            .field("zone_match", &self.zone_match)
            .field("failure_policy", &self.failure_policy)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl HostsyncConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Empty values count as unset. The result is validated.
    pub fn from_vars<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |(primary, legacy): (&str, Option<&str>)| {
            let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());
            non_empty(primary).or_else(|| legacy.and_then(non_empty))
        };
        let required = |key: (&str, Option<&str>)| {
            lookup(key).ok_or_else(|| match key.1 {
                Some(legacy) => Error::config(format!("{} (or {}) is required", key.0, legacy)),
                None => Error::config(format!("{} is required", key.0)),
            })
        };

        let interval_raw = required(INTERVAL)?;
        let interval = parse_interval(&interval_raw).map_err(|e| {
            Error::config(format!("{} '{}' is malformed: {}", INTERVAL.0, interval_raw, e))
        })?;

        let config = Self {
            api_token: required(API_TOKEN)?.trim().to_string(),
            account: lookup(ACCOUNT).map(|v| v.trim().to_string()),
            zone: normalize_name(&required(ZONE)?),
            hosts: required(HOSTS)?
                .split_whitespace()
                .map(normalize_name)
                .collect(),
            interval,
            ip_url: lookup(IP_URL).unwrap_or_else(|| DEFAULT_IP_URL.to_string()),
            api_url: lookup(API_URL)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            zone_match: lookup(ZONE_MATCH)
                .map(|v| v.parse::<ZoneMatch>())
                .transpose()?
                .unwrap_or_default(),
            failure_policy: lookup(FAILURE_POLICY)
                .map(|v| v.parse::<FailurePolicy>())
                .transpose()?
                .unwrap_or_default(),
            log_level: lookup(LOG_LEVEL).unwrap_or_else(|| "info".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_token.is_empty() {
            return Err(Error::config(format!("{} cannot be empty", API_TOKEN.0)));
        }

        validate_domain_name(&self.zone)?;

        if self.hosts.is_empty() {
            return Err(Error::config(format!(
                "{} must contain at least one host",
                HOSTS.0
            )));
        }

        for host in &self.hosts {
            validate_domain_name(host)?;
            if !in_zone(host, &self.zone) {
                return Err(Error::config(format!(
                    "Host {} is not inside zone {}",
                    host, self.zone
                )));
            }
        }

        if self.interval.is_zero() {
            return Err(Error::config(format!("{} must be positive", INTERVAL.0)));
        }

        for (key, url) in [(IP_URL.0, &self.ip_url), (API_URL.0, &self.api_url)] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(Error::config(format!(
                    "{} must use HTTP or HTTPS scheme. Got: {}",
                    key, url
                )));
            }
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(Error::config(format!(
                    "{} '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                    LOG_LEVEL.0, self.log_level
                )));
            }
        }

        Ok(())
    }
}

/// Load a `.env` file into the process environment
///
/// Variables already set in the environment win over the file. With no
/// explicit path, `.env` is searched for from the working directory upward.
///
/// # Returns
///
/// - `Ok(Some(path))`: The file that was loaded
/// - `Ok(None)`: No file was found
/// - `Err(Error)`: The file exists but could not be read or parsed
pub fn load_dotenv(path: Option<&Path>) -> Result<Option<PathBuf>> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };

    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(Error::config(format!("Failed to load env file: {}", e))),
    }
}

/// Parse a Go-style duration string ("90s", "5m", "1h30m", "1.5h")
///
/// Parsing is done by `humantime`; Go-only spellings are rewritten first
/// (see [`go_to_humantime`]). A bare "0" is accepted; negative durations
/// are not.
pub fn parse_interval(input: &str) -> Result<Duration> {
    let s = input.trim();
    let s = s.strip_prefix('+').unwrap_or(s);

    if s.is_empty() {
        return Err(Error::config("empty duration"));
    }

    let rewritten = go_to_humantime(s)
        .ok_or_else(|| Error::config(format!("invalid duration '{}'", input)))?;

    humantime::parse_duration(&rewritten)
        .map_err(|e| Error::config(format!("invalid duration '{}': {}", input, e)))
}

/// Rewrite a Go duration into a form `humantime` reads
///
/// Components are space-separated, `µs` becomes `us`, and a fractional
/// component such as `1.5h` is converted to whole nanoseconds. Returns
/// `None` when a fractional component cannot be converted.
fn go_to_humantime(input: &str) -> Option<String> {
    let input = input.replace(['µ', 'μ'], "u");
    let is_number = |c: char| c.is_ascii_digit() || c == '.';

    let mut components = Vec::new();
    let mut rest = input.as_str();
    while !rest.is_empty() {
        let number_len = rest.find(|c| !is_number(c)).unwrap_or(rest.len());
        let (number, after) = rest.split_at(number_len);
        let unit_len = after.find(is_number).unwrap_or(after.len());
        let (unit, next) = after.split_at(unit_len);

        if number.contains('.') {
            let value: f64 = number.parse().ok()?;
            let scale = humantime::parse_duration(&format!("1{}", unit)).ok()?;
            let nanos = (value * scale.as_nanos() as f64).round() as u128;
            components.push(format!("{}ns", nanos));
        } else {
            components.push(format!("{}{}", number, unit));
        }
        rest = next;
    }

    Some(components.join(" "))
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks: total length, label length, label characters.
pub fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        // Underscore shows up in service records (_acme-challenge)
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn in_zone(host: &str, zone: &str) -> bool {
    host == zone
        || host
            .strip_suffix(zone)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
