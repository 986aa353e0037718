//! Maps loaded configuration onto the search core and the logger.
use anyhow::Result;
use playscout_common::AccessMode;
use playscout_common::observability::{LogConfig, LogFormat};
use playscout_config::{LogSection, StoreConfig};
use playscout_search::{StoreSettings, TerminationPolicy};
use std::path::PathBuf;
use std::time::Duration;

/// Mode defaults first, then every configured override. `mode` wins over `store.mode`.
pub fn store_settings(cfg: &StoreConfig, mode: Option<AccessMode>) -> StoreSettings {
    let mut s = StoreSettings::for_mode(mode.unwrap_or(cfg.mode));
    if let Some(v) = &cfg.base_url {
        s.base_url = v.clone();
    }
    if let Some(v) = &cfg.source_path {
        s.source_path = v.clone();
    }
    if let Some(v) = &cfg.batch_path {
        s.batch_path = v.clone();
    }
    if let Some(v) = &cfg.build_label {
        s.fallback_build_label = v.clone();
    }
    if let Some(v) = &cfg.locale {
        s.locale = v.clone();
    }
    if let Some(v) = cfg.auth_user {
        s.auth_user = v;
    }
    if let Some(v) = &cfg.rt {
        s.rt = v.clone();
    }
    if let Some(v) = cfg.timeout_secs {
        s.timeout = Duration::from_secs(v.max(1));
    }
    if let Some(v) = &cfg.first_template {
        s.first_template = v.clone();
    }
    if let Some(v) = &cfg.next_template {
        s.next_template = v.clone();
    }
    s.cookie = cfg.cookie.clone().filter(|c| !c.trim().is_empty());
    if let Some(stale) = cfg.stop_on_stale_page {
        s.termination = if stale {
            TerminationPolicy::StalePage
        } else {
            TerminationPolicy::TokenExhaustion
        };
    }
    s
}

pub fn log_config(section: &LogSection) -> Result<LogConfig> {
    let format: LogFormat = section.format.parse()?;
    Ok(LogConfig {
        app_name: "playscout",
        log_dir: section.dir.as_ref().map(PathBuf::from),
        emit_stderr: section.stderr,
        format,
        default_filter: section.filter.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use playscout_search::Surface;

    #[test]
    fn empty_config_keeps_mode_defaults() {
        let s = store_settings(&StoreConfig::default(), None);
        assert_eq!(s.mode, AccessMode::AuthenticatedRpc);
        assert_eq!(s.source_path, "/work/search");
        assert_eq!(s.termination, TerminationPolicy::TokenExhaustion);
        assert!(s.cookie.is_none());
    }

    #[test]
    fn flag_mode_beats_configured_mode() {
        let cfg = StoreConfig {
            mode: AccessMode::AuthenticatedRpc,
            ..Default::default()
        };
        let s = store_settings(&cfg, Some(AccessMode::PublicScrape));
        assert_eq!(s.surface(), Surface::Public);
        assert_eq!(s.termination, TerminationPolicy::StalePage);
    }

    #[test]
    fn overrides_apply() {
        let cfg = StoreConfig {
            mode: AccessMode::PublicScrape,
            base_url: Some("http://127.0.0.1:9".into()),
            locale: Some("uk-UA".into()),
            auth_user: Some(2),
            timeout_secs: Some(0),
            cookie: Some("  ".into()),
            stop_on_stale_page: Some(false),
            ..Default::default()
        };
        let s = store_settings(&cfg, None);
        assert_eq!(s.base_url, "http://127.0.0.1:9");
        assert_eq!(s.locale, "uk-UA");
        assert_eq!(s.auth_user, 2);
        assert_eq!(s.timeout, Duration::from_secs(1));
        assert!(s.cookie.is_none());
        assert_eq!(s.termination, TerminationPolicy::TokenExhaustion);
    }

    #[test]
    fn log_section_maps_and_rejects_unknown_format() {
        let mut section = LogSection::default();
        section.format = "json".into();
        section.dir = Some("/tmp/playscout-logs".into());
        let cfg = log_config(&section).unwrap();
        assert_eq!(cfg.format, LogFormat::Json);
        assert_eq!(cfg.log_dir, Some(PathBuf::from("/tmp/playscout-logs")));

        section.format = "xml".into();
        assert!(log_config(&section).is_err());
    }
}
