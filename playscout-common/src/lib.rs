//! Common types and utilities shared across Playscout crates.
//!
//! This crate holds the observability bootstrap and the handful of enums that
//! both the configuration layer and the search core need to agree on. It stays
//! dependency-light so every crate can pull it in.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`AccessMode`]: Which storefront surface a walk runs against
//! - [`OutputFormat`]: How the CLI renders collected identifiers
//!
//! # Examples
//!
//! ```rust
//! use playscout_common::AccessMode;
//!
//! let mode: AccessMode = "public".parse().unwrap();
//! assert_eq!(mode, AccessMode::PublicScrape);
//! assert_eq!(AccessMode::default(), AccessMode::AuthenticatedRpc);
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod observability;

/// Access mode for the storefront search.
///
/// `AuthenticatedRpc` bootstraps against the work (enterprise) surface and signs
/// every batch call with the session token. `PublicScrape` bootstraps against
/// the public store surface and relies on pattern extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    #[default]
    AuthenticatedRpc,
    PublicScrape,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::AuthenticatedRpc => "authenticated_rpc",
            AccessMode::PublicScrape => "public_scrape",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "authenticated_rpc" | "authenticated" | "enterprise" | "work" | "rpc" => {
                Ok(AccessMode::AuthenticatedRpc)
            }
            "public_scrape" | "public" | "store" | "scrape" => Ok(AccessMode::PublicScrape),
            _ => Err(ParseEnumError {
                kind: "access mode",
                input: s.to_string(),
            }),
        }
    }
}

/// Preferred rendering of the collected identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json, // pretty JSON array
    Lines, // one identifier per line
}

impl FromStr for OutputFormat {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "lines" | "text" | "plain" => Ok(OutputFormat::Lines),
            _ => Err(ParseEnumError {
                kind: "output format",
                input: s.to_string(),
            }),
        }
    }
}

/// Returned when a textual flag or config value names no known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {input:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub input: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_mode_accepts_aliases() {
        assert_eq!(
            "Enterprise".parse::<AccessMode>().unwrap(),
            AccessMode::AuthenticatedRpc
        );
        assert_eq!(
            "public-scrape".parse::<AccessMode>().unwrap(),
            AccessMode::PublicScrape
        );
        assert!("carrier-pigeon".parse::<AccessMode>().is_err());
    }

    #[test]
    fn access_mode_serde_uses_snake_case() {
        let json = serde_json::to_string(&AccessMode::PublicScrape).unwrap();
        assert_eq!(json, "\"public_scrape\"");
        let back: AccessMode = serde_json::from_str("\"authenticated_rpc\"").unwrap();
        assert_eq!(back, AccessMode::AuthenticatedRpc);
    }

    #[test]
    fn output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("lines".parse::<OutputFormat>().unwrap(), OutputFormat::Lines);
        let err = "xml".parse::<OutputFormat>().unwrap_err();
        assert_eq!(err.to_string(), "unknown output format: \"xml\"");
    }
}
