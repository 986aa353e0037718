//! Minimal HTTP client for text endpoints with safe logging and optional retries.
//!
//! - Request options: headers, query params, timeout, retries
//! - Text GET and form-encoded POST helpers; bodies come back as `String`
//! - Non-success statuses surface as [`HttpError::Api`] with a truncated excerpt
//! - Optional *raw* request/response logging via `PLAYSCOUT_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), playscout_http::HttpError> {
//! let client = playscout_http::HttpClient::new("https://play.google.com")?;
//! let html = client
//!     .get_text("store/search", playscout_http::RequestOpts::default())
//!     .await?;
//! # let _ = html;
//! # Ok(()) }
//! ```
//!
//! Security: cookies and form fields that carry session tokens are redacted in
//! every log line, including the raw curl reproduction.
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), retries, final errors, and
//! (optionally) raw request/response lines (target `http.raw`).

pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode, Url};
use std::borrow::Cow;
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "PLAYSCOUT_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)

/// Upper bound (in chars) for body excerpts carried by errors and logs.
pub const EXCERPT_MAX_CHARS: usize = 500;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret_name(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "at" | "authorization"
            | "cookie"
            | "set-cookie"
            | "access_token"
            | "token"
            | "secret"
            | "api_key"
            | "key"
    )
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&[u8]>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    if let Some(bytes) = body {
        if let Ok(s) = std::str::from_utf8(bytes) {
            let s = truncate_chars(&redact_form(s), RAW_MAX_BODY);
            parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
        } else {
            parts.push(format!("--data-binary @- # ({} bytes)", bytes.len()));
        }
    }
    parts.push(format!("'{}'", url.as_str()));
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if is_secret_name(&key) {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

/// Redact secret fields of an `application/x-www-form-urlencoded` body.
fn redact_form(body: &str) -> String {
    body.split('&')
        .map(|pair| match pair.split_once('=') {
            Some((k, _)) if is_secret_name(k) => format!("{k}=<redacted>"),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

// ==============================
// Request Options
// ==============================

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use playscout_http::RequestOpts;
/// use std::borrow::Cow;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     query: Some(vec![("hl", Cow::Borrowed("en-US"))]),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert!(opts.retries.is_none());
/// assert!(opts.allow_absolute == false);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>, // e.g. [("q", "term".into())]
    /// If true and `path` is an absolute URL, use it as-is (ignore base).
    pub allow_absolute: bool,
}

// ==============================
// Client
// ==============================

/// Pooled client anchored to one base URL. Cloning shares the connection pool.
#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// Retries are off by default: callers talking to endpoints that may be
    /// deliberately throttling opt in per request or via [`HttpClient::with_retries`].
    ///
    /// ```no_run
    /// use playscout_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://play.google.com")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(30));
    /// assert_eq!(client.max_retries, 0);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(30),
            max_retries: 0,
        })
    }

    /// Override the default timeout returned by [`HttpClient::new`].
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// Override the default retry budget returned by [`HttpClient::new`].
    ///
    /// ```no_run
    /// use playscout_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new("https://play.google.com")?.with_retries(2);
    /// assert_eq!(client.max_retries, 2);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET a text body with per-request options.
    pub async fn get_text(&self, path: &str, opts: RequestOpts<'_>) -> Result<String, HttpError> {
        self.request_text_internal(Method::GET, path, None, opts)
            .await
    }

    /// POST an already-encoded `application/x-www-form-urlencoded` body and
    /// return the response text.
    pub async fn post_form(
        &self,
        path: &str,
        body: String,
        opts: RequestOpts<'_>,
    ) -> Result<String, HttpError> {
        self.request_text_internal(Method::POST, path, Some(body.into_bytes()), opts)
            .await
    }

    fn resolve(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        if allow_absolute {
            if let Ok(abs) = Url::parse(path) {
                return Ok(abs);
            }
        }
        self.base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    // ==============================
    // Core request implementation
    // ==============================

    fn build(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&[u8]>,
        opts: &RequestOpts<'_>,
        timeout: Duration,
    ) -> reqwest::RequestBuilder {
        let mut rb = self
            .inner
            .request(method.clone(), url.clone())
            .timeout(timeout);
        if let Some(q) = &opts.query {
            let pairs: Vec<(&str, &str)> = q.iter().map(|(k, v)| (*k, v.as_ref())).collect();
            rb = rb.query(&pairs);
        }
        if let Some(hdrs) = &opts.headers {
            rb = rb.headers(hdrs.clone());
        }
        if let Some(bytes) = body {
            rb = rb
                .header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
                .body(bytes.to_vec());
        }
        rb
    }

    async fn request_text_internal(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        opts: RequestOpts<'_>,
    ) -> Result<String, HttpError> {
        let url = self.resolve(path, opts.allow_absolute)?;
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let safe_query = redact_query(opts.query.as_deref());
        let call_id = next_call_id();
        let mut attempt = 0usize;

        loop {
            tracing::debug!(
                call_id,
                attempt = attempt + 1,
                max_retries,
                method = %method,
                endpoint = %format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
                query = ?safe_query,
                timeout_ms = timeout.as_millis() as u64,
                has_body = body.is_some(),
                "http.request.start"
            );
            if raw_enabled() {
                let mut shown = opts.headers.clone().unwrap_or_default();
                if body.is_some() {
                    shown.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
                }
                let curl = make_curl(&method, &url, &shown, body.as_deref());
                tracing::debug!(target: "http.raw", call_id, %curl, "request");
            }

            let started = std::time::Instant::now();
            let sent = self
                .build(&method, &url, body.as_deref(), &opts, timeout)
                .send()
                .await;
            let received = match sent {
                Ok(resp) => {
                    let status = resp.status();
                    let headers = resp.headers().clone();
                    resp.bytes().await.map(|b| (status, headers, b))
                }
                Err(err) => Err(err),
            };

            let (status, headers, bytes) = match received {
                Ok(parts) => parts,
                Err(err) if attempt < max_retries => {
                    attempt += 1;
                    let delay = backoff(attempt);
                    tracing::warn!(
                        call_id,
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        error = %err,
                        "http.retrying.network"
                    );
                    sleep(delay).await;
                    continue;
                }
                Err(err) => {
                    tracing::warn!(call_id, attempt, error = %err, "http.network_error");
                    return Err(HttpError::Network(err.to_string()));
                }
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;
            let upstream_id = upstream_request_id(&headers);

            tracing::debug!(
                call_id,
                %status,
                elapsed_ms,
                body_len = bytes.len(),
                upstream_id = %upstream_id,
                "http.response.headers"
            );
            if raw_enabled() {
                let shown = &bytes[..bytes.len().min(RAW_MAX_BODY)];
                tracing::info!(
                    target: "http.raw",
                    call_id,
                    %status,
                    elapsed_ms,
                    headers = ?redact_headers(&headers),
                    body = %String::from_utf8_lossy(shown),
                    truncated = bytes.len() > RAW_MAX_BODY,
                    "response"
                );
            }

            let text = String::from_utf8_lossy(&bytes).into_owned();
            if status.is_success() {
                return Ok(text);
            }

            let snippet = excerpt(&text);
            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < max_retries {
                attempt += 1;
                let delay = retry_after(&headers).unwrap_or_else(|| backoff(attempt));
                tracing::warn!(
                    call_id,
                    %status,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            tracing::warn!(call_id, %status, upstream_id = %upstream_id, body_snippet = %snippet, "http.error");
            return Err(HttpError::Api {
                status,
                message: snippet,
                request_id: upstream_id,
            });
        }
    }
}

// ==============================
// Helpers
// ==============================

fn backoff(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(10) as u32;
    Duration::from_millis(200u64 << shift)
}

/// `Retry-After` in its delta-seconds form.
fn retry_after(h: &HeaderMap) -> Option<Duration> {
    let secs: u64 = h.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Some(Duration::from_secs(secs))
}

fn upstream_request_id(h: &HeaderMap) -> String {
    ["x-request-id", "x-correlation-id"]
        .iter()
        .find_map(|name| h.get(*name).and_then(|v| v.to_str().ok()))
        .unwrap_or("-")
        .to_string()
}

fn redact_query(query: Option<&[(&str, Cow<'_, str>)]>) -> Vec<(String, String)> {
    query
        .unwrap_or_default()
        .iter()
        .map(|(k, v)| {
            let shown = if is_secret_name(k) { "<redacted>" } else { v.as_ref() };
            (k.to_string(), shown.to_string())
        })
        .collect()
}

/// Process-local sequence number tying log lines of one call together.
fn next_call_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

const ELLIPSIS: &str = "...";

/// At most `max` characters, ellipsis included.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.char_indices().nth(max).is_none() {
        return s.to_string();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    let cut = s.char_indices().nth(keep).map_or(s.len(), |(idx, _)| idx);
    format!("{}{ELLIPSIS}", &s[..cut])
}

/// Truncate a response body to at most [`EXCERPT_MAX_CHARS`] characters for diagnostics.
pub fn excerpt(body: &str) -> String {
    truncate_chars(body, EXCERPT_MAX_CHARS)
}
