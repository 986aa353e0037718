//! Validated search inputs.
use serde::Serialize;
use std::fmt;

pub const KEYWORD_MAX_CHARS: usize = 200;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("keyword cannot be empty")]
    EmptyKeyword,
    #[error("keyword is too long ({len} chars, max {KEYWORD_MAX_CHARS})")]
    KeywordTooLong { len: usize },
    #[error("country must be 2 letters (e.g. US, UA), got {input:?}")]
    InvalidCountry { input: String },
}

/// Trimmed, non-empty search keyword of at most 200 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Keyword(String);

impl Keyword {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let v = input.trim();
        if v.is_empty() {
            return Err(ValidationError::EmptyKeyword);
        }
        let len = v.chars().count();
        if len > KEYWORD_MAX_CHARS {
            return Err(ValidationError::KeywordTooLong { len });
        }
        Ok(Self(v.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ISO 3166-1 alpha-2 style country code, always upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let v = input.trim().to_ascii_uppercase();
        if v.len() != 2 || !v.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCountry {
                input: input.to_string(),
            });
        }
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One search invocation: what to look for and in which storefront country.
///
/// ```
/// use playscout_search::SearchQuery;
///
/// let q = SearchQuery::parse("  vpn ", "us").unwrap();
/// assert_eq!(q.keyword.as_str(), "vpn");
/// assert_eq!(q.country.as_str(), "US");
/// assert!(SearchQuery::parse("", "US").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub keyword: Keyword,
    pub country: CountryCode,
}

impl SearchQuery {
    pub fn new(keyword: Keyword, country: CountryCode) -> Self {
        Self { keyword, country }
    }

    pub fn parse(keyword: &str, country: &str) -> Result<Self, ValidationError> {
        Ok(Self::new(Keyword::parse(keyword)?, CountryCode::parse(country)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_vpn_us() {
        let q = SearchQuery::parse("vpn", "us").unwrap();
        assert_eq!(q.keyword.as_str(), "vpn");
        assert_eq!(q.country.as_str(), "US");
    }

    #[test]
    fn country_accepts_any_case_two_letters() {
        for input in ["ua", "Ua", "uA", "UA", " ua ", "\tgb\n"] {
            let c = CountryCode::parse(input).unwrap();
            assert_eq!(c.as_str().len(), 2);
            assert!(c.as_str().bytes().all(|b| b.is_ascii_uppercase()));
        }
    }

    #[test]
    fn country_rejects_everything_else() {
        for input in ["", "U", "USA", "U1", "12", "ü1", "éé", "u s"] {
            let err = CountryCode::parse(input).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidCountry { .. }), "{input:?}");
        }
    }

    #[test]
    fn keyword_is_trimmed() {
        let k = Keyword::parse("  music player \n").unwrap();
        assert_eq!(k.as_str(), "music player");
    }

    #[test]
    fn keyword_length_bounds() {
        assert_eq!(Keyword::parse("   "), Err(ValidationError::EmptyKeyword));
        assert!(Keyword::parse(&"a".repeat(1)).is_ok());
        assert!(Keyword::parse(&"a".repeat(KEYWORD_MAX_CHARS)).is_ok());
        assert_eq!(
            Keyword::parse(&"a".repeat(KEYWORD_MAX_CHARS + 1)),
            Err(ValidationError::KeywordTooLong { len: 201 })
        );
        // multi-byte characters count once
        assert!(Keyword::parse(&"ж".repeat(KEYWORD_MAX_CHARS)).is_ok());
    }
}
