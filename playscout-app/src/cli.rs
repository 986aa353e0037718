use anyhow::{Result, bail};
use clap::Parser;
use playscout_common::{AccessMode, OutputFormat};
use playscout_config::CliConfig;
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "playscout",
    about = "List Play Store application ids returned for a keyword search",
    version
)]
pub struct Cli {
    /// Search keyword. Asked for interactively when omitted.
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Two-letter storefront country, e.g. US or UA.
    #[arg(short, long)]
    pub country: Option<String>,

    /// Upper bound on page requests; zero or less means one page.
    #[arg(short = 'p', long, allow_negative_numbers = true)]
    pub max_pages: Option<i64>,

    /// authenticated_rpc | public_scrape (overrides store.mode).
    #[arg(short, long)]
    pub mode: Option<AccessMode>,

    /// Configuration file; `playscout.yaml` is read when present.
    #[arg(long, env = "PLAYSCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Deadline for the whole walk (overrides cli.request_timeout_secs).
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// json | lines
    #[arg(short, long, default_value = "json")]
    pub format: OutputFormat,
}

/// Inputs after flags, prompts and configured defaults have been merged.
#[derive(Debug, PartialEq, Eq)]
pub struct Inputs {
    pub keyword: String,
    pub country: String,
    pub max_pages: i64,
}

/// Print `label` and read one trimmed line. `None` on end of input.
fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> Result<Option<String>> {
    write!(output, "{label}")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Fill in whatever the flags left out, asking on `output` and reading from `input`.
pub fn resolve_inputs<R: BufRead, W: Write>(
    cli: &Cli,
    defaults: &CliConfig,
    input: &mut R,
    output: &mut W,
) -> Result<Inputs> {
    let keyword = match &cli.keyword {
        Some(k) => k.clone(),
        None => prompt(input, output, "Keyword: ")?.unwrap_or_default(),
    };

    let country = match &cli.country {
        Some(c) => c.clone(),
        None => {
            let label = format!("Country [{}]: ", defaults.default_country);
            prompt(input, output, &label)?
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| defaults.default_country.clone())
        }
    };

    let max_pages = match cli.max_pages {
        Some(n) => n,
        None => {
            let label = format!("Max pages [{}]: ", defaults.default_max_pages);
            match prompt(input, output, &label)?.filter(|p| !p.is_empty()) {
                None => i64::from(defaults.default_max_pages),
                Some(raw) => match raw.parse::<i64>() {
                    Ok(n) if n > 0 => n,
                    _ => bail!("max pages must be a positive integer, got {raw:?}"),
                },
            }
        }
    };

    Ok(Inputs {
        keyword,
        country,
        max_pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("playscout").chain(args.iter().copied())).unwrap()
    }

    fn resolve(cli: &Cli, typed: &str) -> (Result<Inputs>, String) {
        let mut input = Cursor::new(typed.as_bytes().to_vec());
        let mut output = Vec::new();
        let res = resolve_inputs(cli, &CliConfig::default(), &mut input, &mut output);
        (res, String::from_utf8(output).unwrap())
    }

    #[test]
    fn flags_skip_prompts() {
        let cli = parse(&["-k", "vpn", "-c", "ua", "-p", "-2", "--mode", "public", "-f", "lines"]);
        assert_eq!(cli.mode, Some(AccessMode::PublicScrape));
        assert_eq!(cli.format, OutputFormat::Lines);
        let (res, asked) = resolve(&cli, "");
        assert_eq!(
            res.unwrap(),
            Inputs {
                keyword: "vpn".into(),
                country: "ua".into(),
                max_pages: -2,
            }
        );
        assert!(asked.is_empty());
    }

    #[test]
    fn prompts_fall_back_to_configured_defaults() {
        let cli = parse(&[]);
        let (res, asked) = resolve(&cli, "music player\n\n\n");
        let inputs = res.unwrap();
        assert_eq!(inputs.keyword, "music player");
        assert_eq!(inputs.country, "US");
        assert_eq!(inputs.max_pages, 50);
        assert!(asked.contains("Keyword: "));
        assert!(asked.contains("Country [US]: "));
        assert!(asked.contains("Max pages [50]: "));
    }

    #[test]
    fn prompted_page_count_must_be_positive() {
        let cli = parse(&["-k", "vpn", "-c", "US"]);
        for typed in ["0\n", "-1\n", "many\n"] {
            let (res, _) = resolve(&cli, typed);
            assert!(res.is_err(), "{typed:?}");
        }
        let (res, _) = resolve(&cli, "3\n");
        assert_eq!(res.unwrap().max_pages, 3);
    }

    #[test]
    fn closed_stdin_leaves_keyword_empty() {
        let cli = parse(&[]);
        let (res, _) = resolve(&cli, "");
        let inputs = res.unwrap();
        assert!(inputs.keyword.is_empty());
        assert_eq!(inputs.country, "US");
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = Cli::try_parse_from(["playscout", "--mode", "carrier-pigeon"]).unwrap_err();
        assert!(err.to_string().contains("carrier-pigeon"));
    }
}
