//! Batch-RPC request encoding.
//!
//! A page request is an inner payload (a per-operation template with the
//! keyword or continuation token substituted in) wrapped in the batch
//! envelope `[[[rpcid, inner, null, "generic"]]]`, form encoded under `f.req`.
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::query::{CountryCode, Keyword};
use crate::session::SessionInfo;
use crate::settings::StoreSettings;

/// The two remote procedures a walk uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcOp {
    FirstPage,
    NextPage,
}

impl RpcOp {
    pub fn rpc_id(&self) -> &'static str {
        match self {
            RpcOp::FirstPage => "lGYRle",
            RpcOp::NextPage => "qnKh0b",
        }
    }
}

/// Supplies the `_reqid` query value, a 5-digit number.
pub trait RequestIdSource: Send + Sync {
    fn next_id(&self) -> u32;
}

/// Uniformly random ids in `10000..100000`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomRequestIds;

impl RequestIdSource for RandomRequestIds {
    fn next_id(&self) -> u32 {
        rand::thread_rng().gen_range(10_000..100_000)
    }
}

/// Deterministic ids for tests and replayable runs.
#[derive(Debug)]
pub struct SequentialRequestIds {
    next: AtomicU32,
}

impl SequentialRequestIds {
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first),
        }
    }
}

impl RequestIdSource for SequentialRequestIds {
    fn next_id(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Escape a value for embedding between double quotes in a JSON template.
///
/// ```
/// use playscout_search::encoder::escape_json;
///
/// assert_eq!(escape_json(r#"say "hi" \o/"#), r#"say \"hi\" \\o/"#);
/// assert_eq!(escape_json("a\nb"), r"a\nb");
/// ```
pub fn escape_json(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\\' => out.push_str(r"\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str(r"\n"),
            '\r' => out.push_str(r"\r"),
            '\t' => out.push_str(r"\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// A fully encoded batch call: which operation, its URL query and its form body.
#[derive(Debug, Clone)]
pub struct EncodedRequest {
    pub op: RpcOp,
    pub query: Vec<(&'static str, String)>,
    pub body: String,
}

/// Builds batch requests for one storefront.
#[derive(Clone)]
pub struct RequestEncoder {
    settings: Arc<StoreSettings>,
    ids: Arc<dyn RequestIdSource>,
}

impl RequestEncoder {
    pub fn new(settings: Arc<StoreSettings>, ids: Arc<dyn RequestIdSource>) -> Self {
        Self { settings, ids }
    }

    pub fn encode_first(
        &self,
        keyword: &Keyword,
        country: &CountryCode,
        session: &SessionInfo,
    ) -> EncodedRequest {
        let inner = self
            .settings
            .first_template
            .replace("{keyword}", &escape_json(keyword.as_str()));
        self.encode(RpcOp::FirstPage, inner, country, session)
    }

    pub fn encode_next(
        &self,
        token: &str,
        country: &CountryCode,
        session: &SessionInfo,
    ) -> EncodedRequest {
        let inner = self
            .settings
            .next_template
            .replace("{token}", &escape_json(token));
        self.encode(RpcOp::NextPage, inner, country, session)
    }

    fn encode(
        &self,
        op: RpcOp,
        inner: String,
        country: &CountryCode,
        session: &SessionInfo,
    ) -> EncodedRequest {
        let envelope = json!([[[op.rpc_id(), inner, null, "generic"]]]).to_string();

        let mut form = url::form_urlencoded::Serializer::new(String::new());
        form.append_pair("f.req", &envelope);
        if self.settings.signs_requests() {
            form.append_pair("at", &session.at);
        }

        EncodedRequest {
            op,
            query: self.batch_query(op, country, session),
            body: form.finish(),
        }
    }

    fn batch_query(
        &self,
        op: RpcOp,
        country: &CountryCode,
        session: &SessionInfo,
    ) -> Vec<(&'static str, String)> {
        let s = &*self.settings;
        let mut query = vec![
            ("rpcids", op.rpc_id().to_string()),
            ("source-path", s.source_path.clone()),
        ];
        if let Some(sid) = session.f_sid.as_deref() {
            query.push(("f.sid", sid.to_string()));
        }
        query.extend([
            (
                "bl",
                session
                    .build_label
                    .clone()
                    .unwrap_or_else(|| s.fallback_build_label.clone()),
            ),
            ("hl", s.locale.clone()),
            ("gl", country.as_str().to_string()),
            ("authuser", s.auth_user.to_string()),
            ("_reqid", self.ids.next_id().to_string()),
            ("rt", s.rt.clone()),
        ]);
        query
    }
}
