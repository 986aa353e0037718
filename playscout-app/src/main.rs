use anyhow::{Context, Result};
use clap::Parser;
use playscout_common::OutputFormat;
use playscout_common::observability::init_logging;
use playscout_config::{PlayscoutConfig, PlayscoutConfigLoader};
use playscout_http::HttpClient;
use playscout_runtime::PlayscoutRuntime;
use playscout_search::{BatchGateway, SearchQuery, SearchWalker};
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

mod cli;
mod wiring;

use cli::{Cli, resolve_inputs};

const DEFAULT_CONFIG_FILE: &str = "playscout.yaml";

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<PlayscoutConfig> {
    let loader = match explicit {
        Some(path) => PlayscoutConfigLoader::new().with_file(path),
        None => PlayscoutConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    loader.load().context("loading configuration")
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    let log_path = init_logging(wiring::log_config(&cfg.log)?)?;

    let inputs = {
        let stdin = std::io::stdin();
        resolve_inputs(&cli, &cfg.cli, &mut stdin.lock(), &mut std::io::stderr())?
    };
    // validation happens before any network or runtime setup
    let query = SearchQuery::parse(&inputs.keyword, &inputs.country)?;

    let settings = wiring::store_settings(&cfg.store, cli.mode);
    let deadline = Duration::from_secs(
        cli.timeout_secs
            .unwrap_or(cfg.cli.request_timeout_secs)
            .max(1),
    );
    tracing::info!(
        mode = %settings.mode,
        keyword = %query.keyword,
        country = %query.country,
        max_pages = inputs.max_pages,
        deadline_secs = deadline.as_secs(),
        log = %log_path.display(),
        "app.start"
    );

    let client = HttpClient::new(&settings.base_url)?.with_timeout(settings.timeout);
    let walker = SearchWalker::new(BatchGateway::new(Arc::new(client), settings));

    let runtime = PlayscoutRuntime::build("playscout", None)?;
    let handle = runtime.handle();
    let scope = handle.deadline_scope(deadline);
    scope.cancel_on_ctrl_c(&handle);
    let cancel = scope.token();

    let outcome = runtime.block_on(async { walker.walk(&query, inputs.max_pages, &cancel).await });
    drop(scope);
    runtime.shutdown(Duration::from_millis(200));

    let ids = outcome.inspect_err(|err| {
        tracing::error!(error = %err, "app.failed");
    })?;
    tracing::info!(count = ids.len(), "app.done");
    write_ids(&mut std::io::stdout().lock(), &ids, cli.format)
}

fn write_ids<W: Write>(out: &mut W, ids: &[String], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, ids)?;
            writeln!(out)?;
        }
        OutputFormat::Lines => {
            for id in ids {
                writeln!(out, "{id}")?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_output_is_a_pretty_array() {
        let mut out = Vec::new();
        let ids = vec!["com.a.one".to_string(), "com.b.two".to_string()];
        write_ids(&mut out, &ids, OutputFormat::Json).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "[\n  \"com.a.one\",\n  \"com.b.two\"\n]\n");
    }

    #[test]
    fn lines_output_and_empty_result() {
        let mut out = Vec::new();
        write_ids(&mut out, &["com.a.one".to_string()], OutputFormat::Lines).unwrap();
        assert_eq!(out, b"com.a.one\n");

        let mut out = Vec::new();
        write_ids(&mut out, &[], OutputFormat::Json).unwrap();
        assert_eq!(out, b"[]\n");
    }

    #[test]
    fn explicit_missing_config_file_fails() {
        assert!(load_config(Some(Path::new("/definitely/not/here.yaml"))).is_err());
    }
}
