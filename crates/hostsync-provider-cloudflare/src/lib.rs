// # Cloudflare DNS API
//
// [`DnsApi`] implementation over the Cloudflare v4 REST API.
//
// ## Endpoints
//
// - List zones: `GET /zones?name=...`
// - List records: `GET /zones/:zone_id/dns_records` (paged)
// - Replace record: `PUT /zones/:zone_id/dns_records/:record_id`
//
// Every answer is wrapped in the v4 envelope:
//
// ```json
// { "success": true, "errors": [], "messages": [], "result": ... }
// ```
//
// ## Error mapping
//
// | Answer                    | Error                  |
// |---------------------------|------------------------|
// | transport failure         | `Error::Network`       |
// | 401 / 403                 | `Error::Authentication`|
// | 429 / 5xx                 | `Error::Provider`      |
// | other non-2xx             | `Error::Provider`      |
// | `success: false`          | `Error::Provider`      |
// | body not an envelope      | `Error::Provider`      |
//
// Each method is one logical request. Retrying is the scheduler's job.
//
// ## Security
//
// The API token is only ever placed in the `Authorization` header. It does
// not appear in `Debug` output, logs or error messages.

use async_trait::async_trait;
use hostsync_core::config::DEFAULT_API_URL;
use hostsync_core::{DnsApi, DnsRecord, Error, Result, Zone};
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Name reported in provider errors and logs
const PROVIDER: &str = "cloudflare";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per page when listing a zone
const RECORDS_PER_PAGE: u32 = 100;

/// Cloudflare v4 API client
pub struct CloudflareApi {
    /// API token with Zone:Read and DNS:Edit permissions
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API root, without trailing slash
    base_url: String,

    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareApi")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareApi {
    /// Create a client for the public Cloudflare API
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the token is empty or the HTTP client cannot be
    /// built.
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_token, DEFAULT_API_URL)
    }

    /// Create a client for an API rooted at `base_url`
    ///
    /// Used to point the client at a proxy or a fake server.
    pub fn with_base_url(api_token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// The API root requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request and unwrap its envelope
    async fn call<T: DeserializeOwned>(&self, what: &str, request: RequestBuilder) -> Result<Envelope<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| Error::network(format!("{}: request failed: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("{}: failed to read response: {}", what, e)))?;

        debug!("{} -> {}", what, status);

        if !status.is_success() {
            return Err(status_error(what, status, &body));
        }

        decode_envelope(what, &body)
    }
}

#[async_trait]
impl DnsApi for CloudflareApi {
    async fn find_zones(&self, name: &str) -> Result<Vec<Zone>> {
        let request = self.client.get(self.url("/zones")).query(&[("name", name)]);
        let envelope: Envelope<Vec<Zone>> = self.call("List zones", request).await?;

        let zones = envelope.into_result("List zones")?;
        debug!("Zone lookup for {}: {} match(es)", name, zones.len());
        Ok(zones)
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        let url = self.url(&format!("/zones/{}/dns_records", zone_id));
        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            let request = self
                .client
                .get(&url)
                .query(&[("page", page), ("per_page", RECORDS_PER_PAGE)]);
            let envelope: Envelope<Vec<DnsRecord>> = self.call("List DNS records", request).await?;

            let total_pages = envelope.result_info.as_ref().map(|info| info.total_pages);
            records.extend(envelope.into_result("List DNS records")?);

            match total_pages {
                Some(total) if page < total => page += 1,
                _ => break,
            }
        }

        debug!("Listed {} record(s) in zone {}", records.len(), zone_id);
        Ok(records)
    }

    async fn put_record(&self, zone_id: &str, record: &DnsRecord) -> Result<DnsRecord> {
        let url = self.url(&format!("/zones/{}/dns_records/{}", zone_id, record.id));
        let request = self.client.put(url).json(record);

        let envelope: Envelope<DnsRecord> = self.call("Update DNS record", request).await?;
        envelope.into_result("Update DNS record")
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Cloudflare v4 response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

impl<T> Envelope<T> {
    fn into_result(self, what: &str) -> Result<T> {
        if !self.success {
            return Err(Error::provider(
                PROVIDER,
                format!("{} failed: {}", what, join_messages(&self.errors)),
            ));
        }

        self.result
            .ok_or_else(|| Error::provider(PROVIDER, format!("{}: response has no result", what)))
    }
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default = "one")]
    total_pages: u32,
}

fn one() -> u32 {
    1
}

fn join_messages(messages: &[ApiMessage]) -> String {
    if messages.is_empty() {
        return "no error details".to_string();
    }

    messages
        .iter()
        .map(|m| format!("{}: {}", m.code, m.message))
        .collect::<Vec<_>>()
        .join(", ")
}

fn decode_envelope<T: DeserializeOwned>(what: &str, body: &str) -> Result<Envelope<T>> {
    serde_json::from_str(body)
        .map_err(|e| Error::provider(PROVIDER, format!("{}: failed to parse response: {}", what, e)))
}

/// Map a non-2xx answer to an error
///
/// Uses the envelope's error list for the message when the body has one.
fn status_error(what: &str, status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<Envelope<serde_json::Value>>(body)
        .ok()
        .filter(|envelope| !envelope.errors.is_empty())
        .map(|envelope| join_messages(&envelope.errors))
        .unwrap_or_else(|| body.trim().chars().take(200).collect());

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: invalid API token or insufficient permissions ({}): {}",
            what, status, detail
        )),
        429 => Error::provider(
            PROVIDER,
            format!("{}: rate limit exceeded, will retry ({})", what, status),
        ),
        500..=599 => Error::provider(
            PROVIDER,
            format!("{}: server error, will retry ({}): {}", what, status, detail),
        ),
        _ => Error::provider(PROVIDER, format!("{}: {}: {}", what, status, detail)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_token_rejected() {
        let err = CloudflareApi::new("  ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let api = CloudflareApi::new("secret_token_12345").unwrap();

        let debug_str = format!("{:?}", api);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("CloudflareApi"));
        assert!(debug_str.contains("<REDACTED>"));
    }

    #[test]
    fn test_base_url() {
        let api = CloudflareApi::new("token").unwrap();
        assert_eq!(api.base_url(), "https://api.cloudflare.com/client/v4");

        let api = CloudflareApi::with_base_url("token", "http://127.0.0.1:8080/v4/").unwrap();
        assert_eq!(api.base_url(), "http://127.0.0.1:8080/v4");
        assert_eq!(api.url("/zones"), "http://127.0.0.1:8080/v4/zones");
    }

    #[test]
    fn test_provider_name() {
        let api = CloudflareApi::new("token").unwrap();
        assert_eq!(api.provider_name(), "cloudflare");
    }

    #[test]
    fn test_unauthorized_is_authentication_error() {
        let body = r#"{"success":false,"errors":[{"code":10000,"message":"Authentication error"}],"result":null}"#;

        for code in [401, 403] {
            let status = StatusCode::from_u16(code).unwrap();
            let err = status_error("List zones", status, body);
            assert!(matches!(err, Error::Authentication(_)), "{} -> {:?}", code, err);
            assert!(err.to_string().contains("10000: Authentication error"));
            assert!(err.is_fatal());
        }
    }

    #[test]
    fn test_transient_statuses_are_not_fatal() {
        for code in [429, 500, 502, 503] {
            let status = StatusCode::from_u16(code).unwrap();
            let err = status_error("Update DNS record", status, "<html>bad gateway</html>");
            assert!(matches!(err, Error::Provider { .. }), "{} -> {:?}", code, err);
            assert!(err.to_string().contains("will retry"));
            assert!(!err.is_fatal());
        }
    }

    #[test]
    fn test_other_status_keeps_body() {
        let err = status_error("List DNS records", StatusCode::NOT_FOUND, "no such zone\n");
        assert_eq!(
            err.to_string(),
            "Provider error (cloudflare): List DNS records: 404 Not Found: no such zone"
        );
    }

    #[test]
    fn test_decode_success() {
        let body = r#"{
            "success": true,
            "errors": [],
            "messages": [],
            "result": [{"id": "023e105f4ecef8ad9ca31a8372d0c353", "name": "example.com", "status": "active"}],
            "result_info": {"page": 1, "per_page": 20, "count": 1, "total_count": 1, "total_pages": 1}
        }"#;

        let envelope: Envelope<Vec<Zone>> = decode_envelope("List zones", body).unwrap();
        let zones = envelope.into_result("List zones").unwrap();
        assert_eq!(
            zones,
            vec![Zone {
                id: "023e105f4ecef8ad9ca31a8372d0c353".to_string(),
                name: "example.com".to_string(),
            }]
        );
    }

    #[test]
    fn test_decode_success_false_joins_errors() {
        let body = r#"{
            "success": false,
            "errors": [
                {"code": 1003, "message": "Invalid or missing zone id."},
                {"code": 7003, "message": "Could not route to /zones/x"}
            ],
            "result": null
        }"#;

        let envelope: Envelope<Vec<Zone>> = decode_envelope("List zones", body).unwrap();
        let err = envelope.into_result("List zones").unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
        assert!(err.to_string().contains(
            "1003: Invalid or missing zone id., 7003: Could not route to /zones/x"
        ));
    }

    #[test]
    fn test_decode_missing_result() {
        let envelope: Envelope<DnsRecord> =
            decode_envelope("Update DNS record", r#"{"success": true}"#).unwrap();
        let err = envelope.into_result("Update DNS record").unwrap_err();
        assert!(err.to_string().contains("no result"));
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode_envelope::<Vec<Zone>>("List zones", "<html>oops</html>").unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
        assert!(err.to_string().contains("failed to parse response"));
    }
}
