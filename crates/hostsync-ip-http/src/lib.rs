// # HTTP IP Source
//
// Discovers the public IP address by asking an HTTP echo service that
// answers with the caller's address as plain text, such as
// `http://checkip.amazonaws.com/` (the default).
//
// One GET per call, no caching: the reconciliation pass asks once per pass
// and expects the answer to be current.

use async_trait::async_trait;
use hostsync_core::config::DEFAULT_IP_URL;
use hostsync_core::{Error, IpSource, Result};
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

/// Default HTTP timeout for the echo service (10 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP echo-service IP source
#[derive(Debug)]
pub struct HttpIpSource {
    /// URL to fetch the IP from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a source for the default echo service
    pub fn new() -> Result<Self> {
        Self::with_url(DEFAULT_IP_URL)
    }

    /// Create a source for `url`
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the HTTP client cannot be built.
    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// The URL queried
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::network(format!("IP lookup at {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ip_discovery(format!(
                "{} answered {}",
                self.url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response from {}: {}", self.url, e)))?;

        let ip = parse_ip_body(&body)?;
        debug!("{} reports {}", self.url, ip);
        Ok(ip)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Parse an echo-service body into an address
///
/// Surrounding whitespace (usually a trailing newline) is ignored.
pub fn parse_ip_body(body: &str) -> Result<IpAddr> {
    let text = body.trim();
    if text.is_empty() {
        return Err(Error::ip_discovery("empty response body"));
    }

    text.parse()
        .map_err(|_| Error::ip_discovery(format!("not an IP address: {:?}", truncate(text))))
}

fn truncate(text: &str) -> String {
    text.chars().take(64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_newline_is_ignored() {
        assert_eq!(
            parse_ip_body("203.0.113.5\n").unwrap(),
            parse_ip_body("203.0.113.5").unwrap()
        );
        assert_eq!(
            parse_ip_body("  2001:db8::1\r\n").unwrap(),
            "2001:db8::1".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_invalid_bodies() {
        for body in ["", "\n", "not-an-ip", "203.0.113", "<html>captive portal</html>"] {
            let err = parse_ip_body(body).unwrap_err();
            assert!(matches!(err, Error::IpDiscovery(_)), "{:?} -> {:?}", body, err);
            assert!(!err.is_fatal());
        }
    }

    #[test]
    fn test_long_garbage_is_truncated_in_error() {
        let body = "x".repeat(1000);
        let err = parse_ip_body(&body).unwrap_err();
        assert!(err.to_string().len() < 200);
    }

    #[test]
    fn test_default_url() {
        let source = HttpIpSource::new().unwrap();
        assert_eq!(source.url(), "http://checkip.amazonaws.com/");
        assert_eq!(source.source_name(), "http");
    }
}
