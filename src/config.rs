use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use time::format_description::{self, OwnedFormatItem};
use url::Url;

pub const API_KEY_ENV: &str = "FARSIGHT_API_KEY";

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_LOG_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    farsight: RawFarsight,
    #[serde(default)]
    log: RawLog,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFarsight {
    #[serde(default)]
    key: String,
    url: String,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLog {
    format: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FarsightConfig {
    pub key: String,
    pub url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Source text of the timestamp format, logged once at startup.
    pub format: String,
    pub timestamp: OwnedFormatItem,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub farsight: FarsightConfig,
    pub log: LogConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Config file not found: {:?}", path);
        }

        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        Self::parse(&content, env::var(API_KEY_ENV).ok())
            .with_context(|| format!("Invalid configuration in {:?}", path))
    }

    /// Parses and validates TOML text. `key_override` replaces `farsight.key`
    /// when present and non-empty.
    pub fn parse(content: &str, key_override: Option<String>) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;

        let key = key_override
            .filter(|key| !key.trim().is_empty())
            .unwrap_or(raw.farsight.key)
            .trim()
            .to_string();
        if key.is_empty() {
            bail!("farsight.key must be set (or provide {})", API_KEY_ENV);
        }

        let url = Url::parse(raw.farsight.url.trim())
            .with_context(|| format!("farsight.url is not a valid URL: {}", raw.farsight.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("farsight.url must use http or https, got {}", url.scheme());
        }

        let timeout_secs = raw.farsight.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            bail!("farsight.timeout_secs must be greater than 0");
        }

        let format = raw.log.format.unwrap_or_else(|| DEFAULT_LOG_FORMAT.to_string());
        let timestamp = format_description::parse_owned::<2>(&format)
            .with_context(|| format!("log.format is not a valid time format: {}", format))?;

        Ok(Config {
            farsight: FarsightConfig {
                key,
                url,
                timeout: Duration::from_secs(timeout_secs),
            },
            log: LogConfig { format, timestamp },
        })
    }
}
