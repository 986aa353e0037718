//! String-shape predicates used by the decoders.
//!
//! Kept free of any tree or regex walking so the rules can be tuned on their
//! own when the storefront's payload drifts.

/// Top-level prefixes an application identifier may start with.
pub const PACKAGE_PREFIXES: [&str; 3] = ["com.", "org.", "net."];

const PACKAGE_MIN_CHARS: usize = 6;
const TOKEN_MIN_CHARS: usize = 20;
const TOKEN_MARKERS: [char; 3] = ['=', '%', '\\'];

/// Reverse-domain application identifier, e.g. `com.example.app`.
pub fn looks_like_package(s: &str) -> bool {
    s.chars().count() >= PACKAGE_MIN_CHARS
        && s.contains('.')
        && !s.chars().any(char::is_whitespace)
        && PACKAGE_PREFIXES.iter().any(|p| s.starts_with(p))
}

/// Opaque continuation token: long, unbroken, and carrying one of `= % \`.
pub fn looks_like_token(s: &str) -> bool {
    s.chars().count() >= TOKEN_MIN_CHARS
        && !s.chars().any(char::is_whitespace)
        && !looks_like_package(s)
        && !s.contains("com.")
        && s.contains(TOKEN_MARKERS)
}

/// Pattern-extracted token candidates that are really URLs or identifiers.
pub fn is_false_token(s: &str) -> bool {
    s.contains("http") || s.contains("com.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packages() {
        for ok in ["com.a.one", "org.telegram.messenger", "net.x.y", "com.abc"] {
            assert!(looks_like_package(ok), "{ok}");
        }
        for bad in [
            "com.a",
            "io.github.app",
            "com.with space",
            "comexample",
            "Com.example.app",
            "",
        ] {
            assert!(!looks_like_package(bad), "{bad}");
        }
    }

    #[test]
    fn tokens() {
        assert!(looks_like_token("abcDEF123ghiJKL456mno=="));
        assert!(looks_like_token("CgIIZBABGAMiAggB%3D%3D0000"));
        assert!(looks_like_token(r"Eg0KC1x1MDAzZAoK\u003d12"));
        // right length but no marker
        assert!(!looks_like_token("abcdefghijklmnopqrstuvwxyz"));
        // too short
        assert!(!looks_like_token("abc=="));
        // identifier-ish
        assert!(!looks_like_token("com.example.app.with.a.long.name=="));
        assert!(!looks_like_token("https://x.y/?q=com.abcdefghijk"));
        // whitespace
        assert!(!looks_like_token("abcDEF123 ghiJKL456mno=="));
    }

    #[test]
    fn false_tokens() {
        assert!(is_false_token("https://play.google.com/store"));
        assert!(is_false_token("com.example.app"));
        assert!(!is_false_token("abcDEF123ghiJKL456mno=="));
    }
}
