//! Session bootstrap: fetch the search surface once and scrape what the batch
//! endpoint needs to accept our calls.
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::error::{Result, SearchError};
use crate::query::{CountryCode, Keyword};
use crate::settings::{StoreSettings, Surface};
use crate::transport::{Outbound, Transport, page_headers};

/// Tokens scraped from the search surface. Reused for every page of a walk.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Authorization token sent as the `at` form field.
    pub at: String,
    /// Session id, sent as `f.sid` when present.
    pub f_sid: Option<String>,
    /// Build label seen on the page; the configured fallback applies when absent.
    pub build_label: Option<String>,
}

impl std::fmt::Debug for SessionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionInfo")
            .field("at", &"<redacted>")
            .field("f_sid", &self.f_sid)
            .field("build_label", &self.build_label)
            .finish()
    }
}

fn patterns(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|p| Regex::new(p).expect("session pattern"))
        .collect()
}

static WORK_TOKEN: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r#""SNlM0e"\s*:\s*"([^"]+)""#,
        r#"\["SNlM0e"\s*,\s*"([^"]+)"\]"#,
        r#"name="at"\s+value="([^"]+)""#,
    ])
});

static PUBLIC_TOKEN: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[r#""thykhd"\s*:\s*"([^"]+)""#, r#"'thykhd'\s*:\s*'([^']+)'"#])
});

static SESSION_ID: LazyLock<Vec<Regex>> =
    LazyLock::new(|| patterns(&[r"f\.sid=([0-9]+)", r#""FdrFJe"\s*:\s*"([0-9\-]+)""#]));

static BUILD_LABEL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r"(boq_playenterprisewebuiserver_[0-9]{8}\.[0-9]{2}_p0)",
        r"(boq_playuiserver_[0-9]{8}\.[0-9]{2}_p0)",
        r"bl=([a-zA-Z0-9_\.\-]+)",
    ])
});

/// First capture of the first pattern that matches.
fn first_capture(text: &str, patterns: &[Regex]) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// Pull session values out of a search surface page.
///
/// ```
/// use playscout_search::{Surface, session::extract_session};
///
/// let html = r#"<script>WIZ_global_data = {"FdrFJe":"-123","SNlM0e":"AJpMio:1700"};</script>"#;
/// let s = extract_session(html, Surface::Work, "/work/search").unwrap();
/// assert_eq!(s.at, "AJpMio:1700");
/// assert_eq!(s.f_sid.as_deref(), Some("-123"));
/// assert!(s.build_label.is_none());
/// ```
pub fn extract_session(html: &str, surface: Surface, source_path: &str) -> Result<SessionInfo> {
    let token_patterns: &[Regex] = match surface {
        Surface::Work => WORK_TOKEN.as_slice(),
        Surface::Public => PUBLIC_TOKEN.as_slice(),
    };
    let at = first_capture(html, token_patterns)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| SearchError::Session {
            key: surface.token_key(),
            surface: source_path.to_string(),
        })?;
    Ok(SessionInfo {
        at,
        f_sid: first_capture(html, &SESSION_ID),
        build_label: first_capture(html, &BUILD_LABEL),
    })
}

/// Fetches the search surface and extracts a [`SessionInfo`]. One GET, no retry.
#[derive(Clone)]
pub struct SessionBootstrap {
    transport: Arc<dyn Transport>,
    settings: Arc<StoreSettings>,
}

impl SessionBootstrap {
    pub fn new(transport: Arc<dyn Transport>, settings: Arc<StoreSettings>) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub async fn acquire(&self, keyword: &Keyword, country: &CountryCode) -> Result<SessionInfo> {
        let s = &*self.settings;
        let mut query = vec![
            ("q", keyword.as_str().to_string()),
            ("hl", s.locale.clone()),
            ("gl", country.as_str().to_string()),
        ];
        if s.wants_apps_category() {
            query.push(("c", "apps".to_string()));
        }
        let request = Outbound::get(s.source_path.clone(), query).with_headers(page_headers(s));

        tracing::info!(
            surface = %s.source_path,
            country = %country,
            "session.bootstrap.start"
        );
        let html = self.transport.execute(request).await?;

        match extract_session(&html, s.surface(), &s.source_path) {
            Ok(info) => {
                tracing::info!(
                    has_sid = info.f_sid.is_some(),
                    build_label = info.build_label.as_deref().unwrap_or("<fallback>"),
                    "session.bootstrap.ok"
                );
                Ok(info)
            }
            Err(err) => {
                tracing::warn!(
                    key = s.surface().token_key(),
                    body_len = html.len(),
                    "session.bootstrap.missing_token"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use playscout_common::AccessMode;
    use playscout_http::HttpError;
    use std::sync::Mutex;

    #[test]
    fn static_patterns_compile() {
        for set in [&WORK_TOKEN, &PUBLIC_TOKEN, &SESSION_ID, &BUILD_LABEL] {
            assert!(!LazyLock::force(set).is_empty());
        }
    }

    #[test]
    fn work_token_patterns_in_order() {
        let json_style = r#"{"SNlM0e" : "json-tok", "x":1} ["SNlM0e","pair-tok"]"#;
        let s = extract_session(json_style, Surface::Work, "/work/search").unwrap();
        assert_eq!(s.at, "json-tok");

        let pair = r#"data: [["SNlM0e","pair-tok"]]"#;
        assert_eq!(extract_session(pair, Surface::Work, "/work/search").unwrap().at, "pair-tok");

        let form = r#"<input type="hidden" name="at" value="form-tok">"#;
        assert_eq!(extract_session(form, Surface::Work, "/work/search").unwrap().at, "form-tok");
    }

    #[test]
    fn public_token_patterns() {
        let dq = r#"{"thykhd":"dq-tok"}"#;
        assert_eq!(extract_session(dq, Surface::Public, "/store/search").unwrap().at, "dq-tok");
        let sq = "{'thykhd': 'sq-tok'}";
        assert_eq!(extract_session(sq, Surface::Public, "/store/search").unwrap().at, "sq-tok");
    }

    #[test]
    fn surface_picks_the_key() {
        let html = r#"{"thykhd":"public-only"}"#;
        let err = extract_session(html, Surface::Work, "/work/search").unwrap_err();
        assert!(matches!(
            err,
            SearchError::Session { key: "SNlM0e", ref surface } if surface == "/work/search"
        ));
    }

    #[test]
    fn missing_token_names_key_and_surface() {
        let err = extract_session("<html>nothing here</html>", Surface::Public, "/store/search")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("thykhd"), "{msg}");
        assert!(msg.contains("/store/search"), "{msg}");
    }

    #[test]
    fn optional_values() {
        let html = r#""SNlM0e":"t" ... boq_playuiserver_20240101.07_p0 ... /x?f.sid=987&bl=other"#;
        let s = extract_session(html, Surface::Work, "/work/search").unwrap();
        assert_eq!(s.f_sid.as_deref(), Some("987"));
        assert_eq!(s.build_label.as_deref(), Some("boq_playuiserver_20240101.07_p0"));

        let only_bl = r#""SNlM0e":"t" src="/x?bl=boq_custom-1.2""#;
        let s = extract_session(only_bl, Surface::Work, "/work/search").unwrap();
        assert_eq!(s.build_label.as_deref(), Some("boq_custom-1.2"));
        assert_eq!(s.f_sid, None);
    }

    #[test]
    fn debug_hides_token() {
        let s = SessionInfo {
            at: "secret".into(),
            f_sid: None,
            build_label: None,
        };
        assert!(!format!("{s:?}").contains("secret"));
    }

    struct Recorder {
        seen: Mutex<Vec<Outbound>>,
        html: &'static str,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn execute(&self, request: Outbound) -> std::result::Result<String, HttpError> {
            self.seen.lock().unwrap().push(request);
            Ok(self.html.to_string())
        }
    }

    #[tokio::test]
    async fn acquire_builds_surface_request() {
        let transport = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            html: r#"{"thykhd":"tok"}"#,
        });
        let settings = Arc::new(StoreSettings::for_mode(AccessMode::PublicScrape));
        let boot = SessionBootstrap::new(transport.clone(), settings);

        let info = boot
            .acquire(&Keyword::parse("vpn").unwrap(), &CountryCode::parse("us").unwrap())
            .await
            .unwrap();
        assert_eq!(info.at, "tok");

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let req = &seen[0];
        assert_eq!(req.path, "/store/search");
        assert_eq!(req.query_value("q"), Some("vpn"));
        assert_eq!(req.query_value("gl"), Some("US"));
        assert_eq!(req.query_value("c"), Some("apps"));
        assert!(req.body.is_none());
    }

    #[tokio::test]
    async fn work_surface_skips_apps_category() {
        let transport = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            html: r#"["SNlM0e","tok"]"#,
        });
        let settings = Arc::new(StoreSettings::for_mode(AccessMode::AuthenticatedRpc));
        let boot = SessionBootstrap::new(transport.clone(), settings);
        boot.acquire(&Keyword::parse("notes").unwrap(), &CountryCode::parse("GB").unwrap())
            .await
            .unwrap();
        assert_eq!(transport.seen.lock().unwrap()[0].query_value("c"), None);
    }
}
