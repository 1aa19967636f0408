//! The transport seam and its reqwest-backed implementation.
//!
//! # Design
//! `PartnerCenterSell` only builds `HttpRequest` descriptors; everything that
//! touches the network lives behind `Transport`. `HttpTransport` applies the
//! authenticator, timeout and retry policy, and maps the exchange to either a
//! `DetailedResponse` or an `ApiError`. Tests substitute their own
//! `Transport` to observe descriptors without I/O.

use std::future::Future;
use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, instrument, warn, Span};
use url::Url;

use crate::auth::Authenticator;
use crate::config::ServiceOptions;
use crate::error::{is_retryable_status, ApiError};
use crate::http::{DetailedResponse, HttpMethod, HttpRequest};

/// Executes request descriptors.
pub trait Transport {
    /// Send one request. Implementations may retry internally; the caller
    /// sees a single outcome.
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<DetailedResponse, ApiError>> + Send;

    fn enable_retries(&mut self, policy: RetryPolicy);

    fn disable_retries(&mut self);
}

/// How a transport retries transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each further attempt.
    pub retry_interval: Duration,
    /// Upper bound for any single delay.
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            retry_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (zero based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.retry_interval
            .saturating_mul(factor)
            .min(self.max_interval)
    }
}

/// `Transport` over HTTPS using a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    authenticator: Authenticator,
    retry: Option<RetryPolicy>,
}

impl HttpTransport {
    pub fn new(options: ServiceOptions) -> Result<Self, ApiError> {
        let base_url = Url::parse(options.service_url.trim_end_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", options.service_url)))?;
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.disable_ssl_verification)
            .build()?;
        debug!(
            service = %options.service_name,
            url = %base_url,
            auth = options.authenticator.kind(),
            retries = options.retry.is_some(),
            "transport configured"
        );
        Ok(Self {
            client,
            base_url,
            authenticator: options.authenticator,
            retry: options.retry,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    /// Absolute URL for a descriptor: base URL, rendered path, query.
    pub fn url_for(&self, request: &HttpRequest) -> Result<Url, ApiError> {
        let joined = format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            request.render_path()
        );
        let mut url = Url::parse(&joined).map_err(|e| ApiError::InvalidUrl(format!("{joined}: {e}")))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }

    fn request_builder(&self, request: &HttpRequest, url: &Url) -> Result<reqwest::RequestBuilder, ApiError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        };
        let mut builder = self.client.request(method, url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }
        Ok(self.authenticator.apply(builder))
    }
}

impl Transport for HttpTransport {
    #[instrument(
        name = "api_request",
        skip(self, request),
        fields(
            operation = request.operation,
            http.method = %request.method,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
            otel.kind = "client",
        )
    )]
    async fn send(&self, request: HttpRequest) -> Result<DetailedResponse, ApiError> {
        let url = self.url_for(&request)?;
        Span::current().record("http.url", url.as_str());

        let mut attempt = 0u32;
        loop {
            let retries_left = self.retry.filter(|policy| attempt < policy.max_retries);
            let outcome = self.request_builder(&request, &url)?.send().await;

            match outcome {
                Ok(response) => {
                    let status = response.status().as_u16();
                    Span::current().record("http.status_code", status);
                    if let Some(policy) = retries_left.filter(|_| is_retryable_status(status)) {
                        let delay = retry_after(&response)
                            .map(|wait| wait.min(policy.max_interval))
                            .unwrap_or_else(|| policy.delay_for(attempt));
                        warn!(status, attempt = attempt + 1, ?delay, "retrying request");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return read_response(response).await;
                }
                Err(e) => {
                    if let Some(policy) = retries_left.filter(|_| e.is_connect() || e.is_timeout()) {
                        let delay = policy.delay_for(attempt);
                        warn!(error = %e, attempt = attempt + 1, ?delay, "retrying request");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(ApiError::Transport(e));
                }
            }
        }
    }

    fn enable_retries(&mut self, policy: RetryPolicy) {
        self.retry = Some(policy);
    }

    fn disable_retries(&mut self) {
        self.retry = None;
    }
}

/// `Retry-After` in whole seconds. HTTP-date values are ignored. Callers cap
/// the result at the policy's `max_interval`.
fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    let value = response.headers().get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse().ok().map(Duration::from_secs)
}

async fn read_response(response: reqwest::Response) -> Result<DetailedResponse, ApiError> {
    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();
    let bytes = response.bytes().await?;
    let result = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    if !status.is_success() {
        let message = error_message(&result)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown status").to_string());
        return Err(ApiError::Http {
            status: status.as_u16(),
            message,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    Ok(DetailedResponse {
        status: status.as_u16(),
        result,
        headers,
    })
}

/// Pull a human readable message out of an error body.
///
/// Understands `{"errors":[{"message":..}]}` as well as flat `error`,
/// `message` and `errorMessage` keys.
fn error_message(body: &Value) -> Option<String> {
    if let Some(message) = body
        .get("errors")
        .and_then(|errors| errors.get(0))
        .and_then(|first| first.get("message"))
        .and_then(Value::as_str)
    {
        return Some(message.to_string());
    }
    ["error", "message", "errorMessage"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transport(url: &str) -> HttpTransport {
        HttpTransport::new(ServiceOptions::new(url)).unwrap()
    }

    fn request(path: &'static str, params: &[(&str, &str)]) -> HttpRequest {
        HttpRequest {
            operation: "test",
            method: HttpMethod::Get,
            path,
            path_params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[test]
    fn delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            retry_interval: Duration::from_millis(100),
            max_interval: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for(40), Duration::from_millis(500));
    }

    #[test]
    fn url_keeps_base_path_prefix() {
        let t = transport("https://product-lifecycle.api.cloud.ibm.com/openapi/v1/");
        let url = t
            .url_for(&request("/products/{productId}", &[("productId", "P")]))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://product-lifecycle.api.cloud.ibm.com/openapi/v1/products/P"
        );
    }

    #[test]
    fn url_appends_query() {
        let t = transport("http://localhost:3000");
        let mut req = request("/products", &[]);
        req.query = vec![("limit".to_string(), "10".to_string())];
        let url = t.url_for(&req).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/products?limit=10");
    }

    #[test]
    fn backslash_in_path_value_stays_in_one_segment() {
        let t = transport("https://example.com/openapi/v1");
        let url = t
            .url_for(&request("/products/{productId}", &[("productId", r"abc\publish")]))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/openapi/v1/products/abc%5Cpublish"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpTransport::new(ServiceOptions::new("custom.com")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn retry_toggle() {
        let mut t = transport("http://localhost:3000");
        assert!(t.retry_policy().is_none());
        t.enable_retries(RetryPolicy::default());
        assert_eq!(t.retry_policy(), Some(&RetryPolicy::default()));
        t.disable_retries();
        assert!(t.retry_policy().is_none());
    }

    #[test]
    fn error_message_shapes() {
        assert_eq!(
            error_message(&json!({"errors": [{"code": "not_found", "message": "no such product"}]})),
            Some("no such product".to_string())
        );
        assert_eq!(
            error_message(&json!({"error": "bad things"})),
            Some("bad things".to_string())
        );
        assert_eq!(
            error_message(&json!({"errorMessage": "quota"})),
            Some("quota".to_string())
        );
        assert_eq!(error_message(&json!({"status": 500})), None);
        assert_eq!(error_message(&Value::Null), None);
    }
}
