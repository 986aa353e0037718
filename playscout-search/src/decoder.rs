//! Response decoding: raw batch text in, identifiers and continuation token out.
//!
//! Decoding never fails. The storefront's payload has no published schema, so
//! anything that cannot be understood contributes nothing to the page.
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

use crate::classify::{is_false_token, looks_like_package, looks_like_token};

/// Levels of JSON-inside-a-string the structural walk is willing to unwrap.
const MAX_NESTED_DEPTH: u8 = 4;

/// One decoded page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageResult {
    /// Identifiers in the order they appear; may repeat.
    pub ids: Vec<String>,
    /// `None` once the storefront has nothing more to give.
    pub token: Option<String>,
}

impl PageResult {
    pub fn new(ids: Vec<String>, token: Option<String>) -> Self {
        Self { ids, token }
    }

    /// No identifiers and no token.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.token.is_none()
    }
}

pub trait ResponseDecoder: Send + Sync {
    fn decode(&self, raw: &str) -> PageResult;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}

// ==============================
// Structural walk
// ==============================

/// Parses the bracketed payload and visits every string in it.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralDecoder;

impl StructuralDecoder {
    fn parse_roots(raw: &str) -> Vec<Value> {
        if let (Some(first), Some(last)) = (raw.find('['), raw.rfind(']')) {
            if last > first {
                if let Ok(v) = serde_json::from_str::<Value>(&raw[first..=last]) {
                    return vec![v];
                }
            }
        }
        // chunked framing: length lines interleaved with one JSON array per line
        raw.lines()
            .map(str::trim)
            .filter(|line| line.starts_with('['))
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .collect()
    }

    fn walk(value: &Value, nested: u8, page: &mut PageResult) {
        match value {
            Value::String(s) => Self::visit_string(s, nested, page),
            Value::Array(items) => {
                for item in items {
                    Self::walk(item, nested, page);
                }
            }
            Value::Object(map) => {
                for item in map.values() {
                    Self::walk(item, nested, page);
                }
            }
            _ => {}
        }
    }

    fn visit_string(s: &str, nested: u8, page: &mut PageResult) {
        let trimmed = s.trim_start();
        if nested < MAX_NESTED_DEPTH && (trimmed.starts_with('[') || trimmed.starts_with('{')) {
            if let Ok(inner) = serde_json::from_str::<Value>(s) {
                Self::walk(&inner, nested + 1, page);
                return;
            }
        }
        if looks_like_package(s) {
            page.ids.push(s.to_string());
        } else if page.token.is_none() && looks_like_token(s) {
            page.token = Some(s.to_string());
        }
    }
}

impl ResponseDecoder for StructuralDecoder {
    fn decode(&self, raw: &str) -> PageResult {
        let mut page = PageResult::default();
        for root in Self::parse_roots(raw) {
            Self::walk(&root, 0, &mut page);
        }
        page
    }

    fn name(&self) -> &'static str {
        "structural"
    }
}

// ==============================
// Pattern extraction
// ==============================

/// Segments after the prefix shorter than this disqualify the whole run.
const PACKAGE_SEGMENT_MIN_CHARS: usize = 3;

static PACKAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b((?:com|org|net)(?:\.[A-Za-z0-9_]+)+)").expect("package pattern")
});

static TOKEN_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"\[null,"([^"]+)"\]\s*,\s*true"#).expect("plain token pattern"),
        Regex::new(r#"\[null,\\"([^"\\]+)\\"\]\s*,\s*true"#).expect("escaped token pattern"),
    ]
});

/// Scans the raw text with regular expressions, ignoring its structure.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternDecoder;

impl PatternDecoder {
    /// A dotted run counts only as a whole, never as a shortened prefix of itself.
    fn full_segments(run: &str) -> bool {
        run.split('.')
            .skip(1)
            .all(|seg| seg.len() >= PACKAGE_SEGMENT_MIN_CHARS)
    }

    fn ids(raw: &str) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        PACKAGE_RE
            .captures_iter(raw)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|run| Self::full_segments(run))
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect()
    }

    fn token(raw: &str) -> Option<String> {
        TOKEN_RES.iter().find_map(|re| {
            re.captures_iter(raw)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str())
                .find(|candidate| !is_false_token(candidate))
                .map(str::to_string)
        })
    }
}

impl ResponseDecoder for PatternDecoder {
    fn decode(&self, raw: &str) -> PageResult {
        PageResult::new(Self::ids(raw), Self::token(raw))
    }

    fn name(&self) -> &'static str {
        "pattern"
    }
}

// ==============================
// Chain
// ==============================

/// Uses `primary`, and asks `secondary` only when `primary` found nothing at all.
pub struct FallbackDecoder {
    primary: Box<dyn ResponseDecoder>,
    secondary: Box<dyn ResponseDecoder>,
}

impl FallbackDecoder {
    pub fn new(primary: Box<dyn ResponseDecoder>, secondary: Box<dyn ResponseDecoder>) -> Self {
        Self { primary, secondary }
    }
}

impl ResponseDecoder for FallbackDecoder {
    fn decode(&self, raw: &str) -> PageResult {
        let page = self.primary.decode(raw);
        if !page.is_empty() {
            return page;
        }
        tracing::debug!(
            primary = self.primary.name(),
            secondary = self.secondary.name(),
            "decode.fallback"
        );
        self.secondary.decode(raw)
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}
