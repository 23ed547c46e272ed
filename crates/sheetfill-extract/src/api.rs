//! Contact extraction service client

use anyhow::Context;
use reqwest::Url;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use sheetfill_core::{http_client, send_blocking};

use crate::config::ApiConfig;
use crate::state::{Contact, FailureReason, RowOutcome};

/// Longest body excerpt kept in a rejection reason
const DETAIL_MAX_CHARS: usize = 200;

/// Looks up the contact behind one URL. Never fails: every problem is a
/// [`RowOutcome::Failed`] with its reason.
pub trait Extractor {
    fn extract(&self, url: &str) -> RowOutcome;
}

/// Classify a completed response.
///
/// Success requires status 200, a JSON body, `"success": true` and a `data`
/// object. Missing contact fields become empty strings.
pub fn classify_response(status: u16, body: &str) -> RowOutcome {
    if status != 200 {
        return RowOutcome::Failed(FailureReason::HttpStatus(status));
    }
    let body = body.trim();
    // Gateways and sleeping hosts answer with an HTML page
    if body.starts_with('<') {
        return RowOutcome::Failed(FailureReason::HtmlBody);
    }
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) => return RowOutcome::Failed(FailureReason::InvalidJson(e.to_string())),
    };

    match (json.get("success"), json.get("data")) {
        (Some(Value::Bool(true)), Some(Value::Object(data))) => RowOutcome::Extracted(Contact {
            name: text_field(data.get("name")),
            email: text_field(data.get("email")),
            phone: text_field(data.get("phone")),
        }),
        _ => RowOutcome::Failed(FailureReason::Rejected(rejection_detail(&json, body))),
    }
}

/// Strings as-is, numbers/booleans as their JSON text, anything else empty.
fn text_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// The service's `error` message if present, else a body excerpt.
fn rejection_detail(json: &Value, body: &str) -> String {
    if let Some(error) = json.get("error").and_then(Value::as_str) {
        return error.to_string();
    }
    match body.char_indices().nth(DETAIL_MAX_CHARS) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}

/// HTTP client for `GET {endpoint}?url=<target>`.
#[derive(Debug, Clone)]
pub struct HttpExtractor {
    endpoint: Url,
    timeout: std::time::Duration,
    headers: HeaderMap,
}

impl HttpExtractor {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid extraction endpoint: {}", config.endpoint))?;
        anyhow::ensure!(
            matches!(endpoint.scheme(), "http" | "https"),
            "Extraction endpoint must be http(s): {}",
            config.endpoint
        );

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid header name: {name}"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header {name}"))?;
            headers.insert(name, value);
        }

        Ok(Self {
            endpoint,
            timeout: config.timeout,
            headers,
        })
    }

    /// Endpoint with the target URL percent-encoded into the `url` parameter.
    pub fn request_url(&self, target: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("url", target);
        url
    }

    /// `GET {base}/health`, a sibling of the extraction path.
    pub fn health_url(&self) -> anyhow::Result<Url> {
        self.endpoint
            .join("health")
            .context("Cannot derive health URL from endpoint")
    }

    /// Call the service health endpoint and return its body.
    pub fn health(&self) -> anyhow::Result<String> {
        let url = self.health_url()?;
        log::debug!("Health check: {url}");
        let request = http_client()
            .get(url)
            .headers(self.headers.clone())
            .timeout(self.timeout);
        let response = send_blocking(request).context("Health check failed")?;
        anyhow::ensure!(
            response.status == 200,
            "Health check returned HTTP {}",
            response.status
        );
        Ok(response.body)
    }
}

impl Extractor for HttpExtractor {
    fn extract(&self, url: &str) -> RowOutcome {
        let request = http_client()
            .get(self.request_url(url))
            .headers(self.headers.clone())
            .timeout(self.timeout);
        match send_blocking(request) {
            Ok(response) => classify_response(response.status, &response.body),
            Err(e) => RowOutcome::Failed(FailureReason::Transport(e.to_string())),
        }
    }
}
