//! Storefront wiring and the per-mode profile derived from it.
use playscout_common::AccessMode;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://play.google.com";
pub const WORK_SEARCH_PATH: &str = "/work/search";
pub const STORE_SEARCH_PATH: &str = "/store/search";
pub const DEFAULT_BATCH_PATH: &str = "/_/PlayStoreUi/data/batchexecute";
pub const DEFAULT_BUILD_LABEL: &str = "boq_playenterprisewebuiserver_20251214.04_p0";

/// Inner payload for the first page. `{keyword}` is replaced by the escaped keyword.
pub const DEFAULT_FIRST_TEMPLATE: &str = r#"[[[null,null,null,null,[null,1]],[[10,[10,50]],null,null,[96,108,72,100,27,177,183,222,8,57,169,110,11,184,16,1,139,152,194,165,68,163,211,9,71,31,195,12,64,151,150,148,113,104,55,56,145,32,34,10,122]],["{keyword}"],4,null,null,null,[null,1]]]"#;

/// Inner payload for continuation pages. `{token}` is replaced by the escaped token.
pub const DEFAULT_NEXT_TEMPLATE: &str = r#"[[[10,[10,50]],null,[96,108,72,100,27,177,183,222,8,57,169,110,11,184,16,1,139,152,194,165,68,163,211,9,71,31,195,12,64,151,150,148,113,104,55,56,145,32,34,10,122],["{token}"]]]"#;

/// When a walk stops besides the page cap and cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationPolicy {
    /// Stop only when the server stops handing out continuation tokens.
    TokenExhaustion,
    /// Also stop as soon as a page contributes no new identifiers.
    StalePage,
}

/// Which HTML surface the session token is scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Work,
    Public,
}

impl Surface {
    /// Key under which the surface embeds the authorization token.
    pub fn token_key(&self) -> &'static str {
        match self {
            Surface::Work => "SNlM0e",
            Surface::Public => "thykhd",
        }
    }
}

/// Everything the gateway needs to talk to one storefront.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub mode: AccessMode,
    pub base_url: String,
    pub source_path: String,
    pub batch_path: String,
    pub fallback_build_label: String,
    pub locale: String,
    pub auth_user: u32,
    pub rt: String,
    pub timeout: Duration,
    pub cookie: Option<String>,
    pub first_template: String,
    pub next_template: String,
    pub termination: TerminationPolicy,
}

impl StoreSettings {
    /// Defaults for a mode.
    ///
    /// ```
    /// use playscout_common::AccessMode;
    /// use playscout_search::{StoreSettings, Surface, TerminationPolicy};
    ///
    /// let public = StoreSettings::for_mode(AccessMode::PublicScrape);
    /// assert_eq!(public.source_path, "/store/search");
    /// assert_eq!(public.surface(), Surface::Public);
    /// assert_eq!(public.termination, TerminationPolicy::StalePage);
    ///
    /// let work = StoreSettings::for_mode(AccessMode::AuthenticatedRpc);
    /// assert_eq!(work.surface().token_key(), "SNlM0e");
    /// assert!(work.signs_requests());
    /// ```
    pub fn for_mode(mode: AccessMode) -> Self {
        let (source_path, termination) = match mode {
            AccessMode::AuthenticatedRpc => (WORK_SEARCH_PATH, TerminationPolicy::TokenExhaustion),
            AccessMode::PublicScrape => (STORE_SEARCH_PATH, TerminationPolicy::StalePage),
        };
        Self {
            mode,
            base_url: DEFAULT_BASE_URL.to_string(),
            source_path: source_path.to_string(),
            batch_path: DEFAULT_BATCH_PATH.to_string(),
            fallback_build_label: DEFAULT_BUILD_LABEL.to_string(),
            locale: "en-US".to_string(),
            auth_user: 0,
            rt: "c".to_string(),
            timeout: Duration::from_secs(30),
            cookie: None,
            first_template: DEFAULT_FIRST_TEMPLATE.to_string(),
            next_template: DEFAULT_NEXT_TEMPLATE.to_string(),
            termination,
        }
    }

    /// The work surface is recognised by path so custom work paths keep working.
    pub fn surface(&self) -> Surface {
        if self
            .source_path
            .to_ascii_lowercase()
            .contains(WORK_SEARCH_PATH)
        {
            Surface::Work
        } else {
            Surface::Public
        }
    }

    /// Whether batch bodies carry the `at` field.
    pub fn signs_requests(&self) -> bool {
        self.mode == AccessMode::AuthenticatedRpc
    }

    /// The public store page only lists apps when asked to.
    pub fn wants_apps_category(&self) -> bool {
        self.source_path.eq_ignore_ascii_case(STORE_SEARCH_PATH)
    }

    /// Primary language tag, e.g. `en` for `en-US`.
    pub fn language(&self) -> &str {
        self.locale.split('-').next().unwrap_or(&self.locale)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::for_mode(AccessMode::default())
    }
}
