use anyhow::{Context, Result};
use std::fs;
use std::io;
use time::UtcOffset;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Filter used when `RUST_LOG` is unset.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "info"
    } else {
        "warn"
    }
}

pub fn setup_logging(verbose: bool, log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    // Resolve the offset once, before any other thread exists.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(offset, log.timestamp.clone());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_writer(io::stderr)
        .init();
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if args.top == 0 {
        anyhow::bail!("--top must be greater than 0");
    }

    if args.limit == 0 {
        anyhow::bail!("--limit must be greater than 0");
    }

    if args.periods.iter().any(|days| *days == 0) {
        anyhow::bail!("--periods must all be greater than 0");
    }

    Ok(())
}

/// Drops repeated periods, keeping the first occurrence.
pub fn normalize_periods(periods: &[u32]) -> Vec<u32> {
    let mut seen = Vec::with_capacity(periods.len());
    for days in periods {
        if !seen.contains(days) {
            seen.push(*days);
        }
    }
    seen
}

/// Replaces every `@path` argument with the IOCs listed in that file, one
/// per line. Blank lines and `#` comments are ignored.
pub fn expand_ioc_args(raw: &[String]) -> Result<Vec<String>> {
    let mut iocs = Vec::new();

    for arg in raw {
        match arg.strip_prefix('@') {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read IOC file {:?}", path))?;
                iocs.extend(
                    content
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty() && !line.starts_with('#'))
                        .map(str::to_string),
                );
            }
            None => iocs.push(arg.trim().to_string()),
        }
    }

    Ok(iocs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Args;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn quiet_runs_still_show_warnings() {
        assert_eq!(default_filter(false), "warn");
        assert_eq!(default_filter(true), "info");
    }

    #[test]
    fn periods_keep_first_occurrence() {
        assert_eq!(normalize_periods(&[7, 90, 7, 30, 90]), vec![7, 90, 30]);
    }

    #[test]
    fn defaults_pass_validation() {
        let args = Args::parse_from(["pdns-tld", "8.8.8.8"]);
        assert_eq!(args.periods, vec![7, 90]);
        assert_eq!(args.top, 10);
        assert_eq!(args.limit, 4_000_000);
        assert!(!args.no_excel);
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn zero_values_are_rejected() {
        for argv in [
            vec!["pdns-tld", "8.8.8.8", "-t", "0"],
            vec!["pdns-tld", "8.8.8.8", "-l", "0"],
            vec!["pdns-tld", "8.8.8.8", "-d", "7", "0"],
        ] {
            let args = Args::parse_from(argv);
            assert!(validate_args(&args).is_err());
        }
    }

    #[test]
    fn ioc_files_are_expanded_in_place() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# seen in phishing kit\n198.57.247.217\n\n  example.com  ").unwrap();
        file.flush().unwrap();

        let raw = vec![
            "8.8.8.8".to_string(),
            format!("@{}", file.path().display()),
            "1.1.1.1".to_string(),
        ];
        let iocs = expand_ioc_args(&raw).unwrap();
        assert_eq!(iocs, ["8.8.8.8", "198.57.247.217", "example.com", "1.1.1.1"]);

        assert!(expand_ioc_args(&["@/nonexistent/iocs.txt".to_string()]).is_err());
    }
}
