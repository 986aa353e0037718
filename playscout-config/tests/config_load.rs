use playscout_common::AccessMode;
use playscout_config::PlayscoutConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
version: "0.1"
store:
  mode: authenticated_rpc
  locale: en-US
  auth_user: 2
  cookie: "${PLAYSCOUT_TEST_COOKIE}"
cli:
  default_country: UA
  default_max_pages: 10
log:
  format: json
  stderr: true
  "#;
    let p = write_yaml(&tmp, "playscout.yaml", file_yaml);

    temp_env::with_var("PLAYSCOUT_TEST_COOKIE", Some("SID=xyz; HSID=abc"), || {
        let config = PlayscoutConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load system config");

        assert_eq!(config.version.as_deref(), Some("0.1"));
        assert_eq!(config.store.mode, AccessMode::AuthenticatedRpc);
        assert_eq!(config.store.auth_user, Some(2));
        assert_eq!(config.store.cookie.as_deref(), Some("SID=xyz; HSID=abc"));
        assert_eq!(config.cli.default_country, "UA");
        assert_eq!(config.cli.default_max_pages, 10);
        assert_eq!(config.cli.request_timeout_secs, 60);
        assert_eq!(config.log.format, "json");
        assert!(config.log.stderr);
    });
}

#[test]
#[serial]
fn environment_overrides_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(
        &tmp,
        "playscout.yaml",
        "store:\n  mode: authenticated_rpc\ncli:\n  default_max_pages: 10\n",
    );

    temp_env::with_vars(
        [
            ("PLAYSCOUT__STORE__MODE", Some("public_scrape")),
            ("PLAYSCOUT__CLI__DEFAULT_MAX_PAGES", Some("3")),
        ],
        || {
            let config = PlayscoutConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load with env overrides");
            assert_eq!(config.store.mode, AccessMode::PublicScrape);
            assert_eq!(config.cli.default_max_pages, 3);
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = PlayscoutConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("optional file may be absent");
    assert_eq!(config.store.mode, AccessMode::AuthenticatedRpc);
    assert!(config.store.cookie.is_none());
    assert_eq!(config.cli.default_max_pages, 50);
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let res = PlayscoutConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(res.is_err());
}
