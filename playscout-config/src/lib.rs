//! Loader for Playscout configuration with YAML + environment overlays.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. an optional or required YAML/TOML/JSON file (`playscout.yaml` by convention),
//! 2. inline YAML snippets (tests, CLI),
//! 3. `PLAYSCOUT__SECTION__KEY` environment variables (e.g. `PLAYSCOUT__STORE__COOKIE`).
//!
//! After merging, every string value goes through `${VAR}` expansion so secrets
//! such as the storefront cookie can live in the environment while the file
//! only references them.
//!
//! Store fields left unset fall back to the search core's defaults for the
//! selected access mode; nothing here knows about the wire format.
use config::{Config, Environment, File};
use playscout_common::AccessMode;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "PLAYSCOUT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("configuration source error: {0}")]
    Source(#[from] config::ConfigError),
    #[error("configuration shape error: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlayscoutConfig {
    pub version: Option<String>,
    pub store: StoreConfig,
    pub cli: CliConfig,
    pub log: LogSection,
}

/// Storefront wiring. `None` means "use the mode's default".
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub mode: AccessMode,
    pub base_url: Option<String>,
    pub source_path: Option<String>,
    pub batch_path: Option<String>,
    pub build_label: Option<String>,
    pub locale: Option<String>,
    pub auth_user: Option<u32>,
    pub rt: Option<String>,
    pub timeout_secs: Option<u64>,
    pub cookie: Option<String>,
    pub first_template: Option<String>,
    pub next_template: Option<String>,
    /// Override the mode's termination policy: stop as soon as a page adds nothing new.
    pub stop_on_stale_page: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub default_country: String,
    pub default_max_pages: u32,
    pub request_timeout_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            default_country: "US".into(),
            default_max_pages: 50,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// `text` or `json`
    pub format: String,
    pub stderr: bool,
    pub dir: Option<String>,
    pub filter: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            format: "text".into(),
            stderr: false,
            dir: None,
            filter: "info".into(),
        }
    }
}

impl PlayscoutConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.cli.request_timeout_secs == 0 {
            return Err(ConfigLoadError::Invalid(
                "cli.request_timeout_secs must be greater than zero".into(),
            ));
        }
        if let Some(path) = &self.store.source_path {
            if !path.starts_with('/') {
                return Err(ConfigLoadError::Invalid(format!(
                    "store.source_path must start with '/': {path}"
                )));
            }
        }
        for (name, tpl, placeholder) in [
            ("store.first_template", &self.store.first_template, "{keyword}"),
            ("store.next_template", &self.store.next_template, "{token}"),
        ] {
            if let Some(t) = tpl {
                if !t.contains(placeholder) {
                    return Err(ConfigLoadError::Invalid(format!(
                        "{name} must contain the {placeholder} placeholder"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (files + env overrides).
pub struct PlayscoutConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    sources: usize,
}

impl Default for PlayscoutConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayscoutConfigLoader {
    /// Start with no files; only built-in defaults.
    ///
    /// ```
    /// use playscout_config::PlayscoutConfigLoader;
    ///
    /// let cfg = PlayscoutConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(cfg.cli.default_country, "US");
    /// assert_eq!(cfg.cli.default_max_pages, 50);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            sources: 0,
        }
    }

    /// Attach a file that must exist; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self.sources += 1;
        self
    }

    /// Attach a file that is merged only when present.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self.sources += 1;
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use playscout_common::AccessMode;
    /// use playscout_config::PlayscoutConfigLoader;
    ///
    /// let cfg = PlayscoutConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// store:
    ///   mode: public_scrape
    ///   locale: uk-UA
    /// cli:
    ///   default_max_pages: 5
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.store.mode, AccessMode::PublicScrape);
    /// assert_eq!(cfg.store.locale.as_deref(), Some("uk-UA"));
    /// assert_eq!(cfg.cli.default_max_pages, 5);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self.sources += 1;
        self
    }

    /// Consume the builder and deserialize the merged sources into typed config.
    ///
    /// Environment variables are layered last, then `${VAR}` placeholders are
    /// expanded and the result is validated.
    pub fn load(self) -> Result<PlayscoutConfig, ConfigLoadError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: PlayscoutConfig = serde_json::from_value(v)?;
        typed.validate()?;
        Ok(typed)
    }

    /// Number of file/inline sources attached so far (environment excluded).
    pub fn source_count(&self) -> usize {
        self.sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("PS_COOKIE", Some("SID=abc"), || {
            let mut v = json!("prefix-${PS_COOKIE}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-SID=abc-suffix"));
        });
    }

    #[test]
    fn expands_in_nested_sections() {
        temp_env::with_vars([("LOC", Some("en-GB")), ("CC", Some("GB"))], || {
            let mut v = json!({
                "store": { "locale": "${LOC}", "auth_user": 1 },
                "cli": { "default_country": "$CC" },
                "list": ["${LOC}", null, true]
            });
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!({
                    "store": { "locale": "en-GB", "auth_user": 1 },
                    "cli": { "default_country": "GB" },
                    "list": ["en-GB", null, true]
                })
            );
        });
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${PLAYSCOUT_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${PLAYSCOUT_DOES_NOT_EXIST}"));
    }

    #[test]
    fn rejects_template_without_placeholder() {
        let err = PlayscoutConfigLoader::new()
            .with_yaml_str("store:\n  next_template: '[[1]]'\n")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Invalid(msg) if msg.contains("{token}")));
    }

    #[test]
    fn rejects_relative_source_path() {
        let err = PlayscoutConfigLoader::new()
            .with_yaml_str("store:\n  source_path: work/search\n")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Invalid(_)));
    }

    #[test]
    fn counts_sources() {
        let loader = PlayscoutConfigLoader::new()
            .with_yaml_str("version: '1'")
            .with_optional_file("/definitely/not/here.yaml");
        assert_eq!(loader.source_count(), 2);
    }
}
