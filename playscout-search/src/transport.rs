//! The raw HTTP seam between the gateway and the network.
use async_trait::async_trait;
use playscout_http::{HttpClient, HttpError, RequestOpts};
use std::borrow::Cow;

use crate::settings::StoreSettings;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_ANY: &str = "*/*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
}

/// One outbound call, already fully encoded.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub verb: Verb,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub headers: Vec<(&'static str, String)>,
    /// Form-encoded body; only meaningful for `Verb::Post`.
    pub body: Option<String>,
}

impl Outbound {
    pub fn get(path: impl Into<String>, query: Vec<(&'static str, String)>) -> Self {
        Self {
            verb: Verb::Get,
            path: path.into(),
            query,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, query: Vec<(&'static str, String)>, body: String) -> Self {
        Self {
            verb: Verb::Post,
            path: path.into(),
            query,
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_headers(mut self, headers: Vec<(&'static str, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Performs one HTTP exchange and hands back the body text.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Outbound) -> Result<String, HttpError>;
}

#[async_trait]
impl Transport for HttpClient {
    async fn execute(&self, request: Outbound) -> Result<String, HttpError> {
        let headers = reqwest_headers(&request.headers)?;
        let opts = RequestOpts {
            headers: Some(headers),
            query: Some(
                request
                    .query
                    .iter()
                    .map(|(k, v)| (*k, Cow::Borrowed(v.as_str())))
                    .collect(),
            ),
            ..Default::default()
        };
        match request.verb {
            Verb::Get => self.get_text(&request.path, opts).await,
            Verb::Post => {
                self.post_form(&request.path, request.body.unwrap_or_default(), opts)
                    .await
            }
        }
    }
}

fn reqwest_headers(
    pairs: &[(&'static str, String)],
) -> Result<playscout_http::HeaderMap, HttpError> {
    use playscout_http::{HeaderName, HeaderValue};
    let mut map = playscout_http::HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let value = HeaderValue::from_str(value)
            .map_err(|e| HttpError::Build(format!("invalid {name} header: {e}")))?;
        map.insert(HeaderName::from_static(name), value);
    }
    Ok(map)
}

/// Browser-like headers for the HTML search surface.
pub fn page_headers(settings: &StoreSettings) -> Vec<(&'static str, String)> {
    let mut headers = vec![
        ("user-agent", USER_AGENT.to_string()),
        ("accept", ACCEPT_HTML.to_string()),
        ("accept-language", accept_language(settings)),
    ];
    if let Some(cookie) = non_blank(settings.cookie.as_deref()) {
        headers.push(("cookie", cookie.to_string()));
    }
    headers
}

/// Headers for batch calls; the form content type is set by the transport.
pub fn batch_headers(settings: &StoreSettings) -> Vec<(&'static str, String)> {
    let mut headers = vec![
        ("user-agent", USER_AGENT.to_string()),
        ("accept", ACCEPT_ANY.to_string()),
        ("accept-language", accept_language(settings)),
    ];
    if let Some(cookie) = non_blank(settings.cookie.as_deref()) {
        headers.push(("cookie", cookie.to_string()));
    }
    headers
}

fn accept_language(settings: &StoreSettings) -> String {
    format!("{},{};q=0.9,en;q=0.8", settings.locale, settings.language())
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use playscout_common::AccessMode;

    #[test]
    fn cookie_only_when_configured() {
        let mut s = StoreSettings::for_mode(AccessMode::AuthenticatedRpc);
        assert!(page_headers(&s).iter().all(|(k, _)| *k != "cookie"));
        s.cookie = Some("   ".into());
        assert!(batch_headers(&s).iter().all(|(k, _)| *k != "cookie"));
        s.cookie = Some("SID=1".into());
        assert!(page_headers(&s).contains(&("cookie", "SID=1".to_string())));
    }

    #[test]
    fn accept_language_follows_locale() {
        let mut s = StoreSettings::default();
        s.locale = "uk-UA".into();
        let headers = page_headers(&s);
        assert!(headers.contains(&("accept-language", "uk-UA,uk;q=0.9,en;q=0.8".to_string())));
    }

    #[test]
    fn header_values_are_validated() {
        let err = reqwest_headers(&[("cookie", "bad\nvalue".to_string())]).unwrap_err();
        assert!(matches!(err, HttpError::Build(msg) if msg.contains("cookie")));
    }
}
