use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::FarsightConfig;
use crate::domain::IocKind;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// One resolution as returned by the provider. Only the owner name is
/// interpreted; everything else is carried along untouched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResolutionRecord {
    pub rrname: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ResolutionRecord {
    pub fn named(rrname: &str) -> Self {
        Self {
            rrname: rrname.to_string(),
            fields: serde_json::Map::new(),
        }
    }
}

/// Failures that leave nothing to show for a lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("cannot append lookup path to base URL {base}")]
    InvalidUrl { base: String },

    #[error("request to passive DNS provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("passive DNS provider answered with unexpected HTTP status {status}")]
    UnexpectedStatus { status: u16 },

    #[error("malformed record on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// What a lookup produced when the provider could be reached.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Records(Vec<ResolutionRecord>),
    /// Known error status, already rendered as `"<reason> (<days> Days)"`.
    Refused(String),
}

/// The two DNSDB lookups the pipeline needs.
pub trait PassiveDns {
    /// Inverse lookup on the rdata index: owner names whose value matches `ioc`.
    fn rdata(&self, ioc: &str, kind: IocKind, days: u32, limit: u64)
        -> Result<Lookup, LookupError>;

    /// Forward lookup on the rrset index for the owner name `ioc`.
    fn rrset(&self, ioc: &str, days: u32) -> Result<Lookup, LookupError>;
}

pub fn status_reason(status: u16) -> Option<&'static str> {
    match status {
        400 => Some("URL is formatted incorrectly"),
        403 => Some("X-API-Key header is not present, or the provided API key is not valid"),
        404 => Some("No records found for the given lookup"),
        429 => Some("API key daily quota limit is exceeded"),
        500 => Some("Error processing the request"),
        503 => Some("The limit of number of concurrent connections is exceeded"),
        _ => None,
    }
}

pub fn time_last_after(days: u32) -> i64 {
    -(i64::from(days) * SECONDS_PER_DAY)
}

pub fn lookup_url(
    base: &Url,
    segments: &[&str],
    days: u32,
    limit: Option<u64>,
) -> Result<Url, LookupError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| LookupError::InvalidUrl {
            base: base.to_string(),
        })?
        .pop_if_empty()
        .extend(segments);

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("time_last_after", &time_last_after(days).to_string());
        if let Some(limit) = limit {
            query.append_pair("limit", &limit.to_string());
        }
    }

    Ok(url)
}

/// Newline delimited JSON, blank lines ignored.
pub fn parse_records(body: &str) -> Result<Vec<ResolutionRecord>, LookupError> {
    body.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| LookupError::Decode {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

pub fn interpret_response(status: u16, body: &str, days: u32) -> Result<Lookup, LookupError> {
    if (200..300).contains(&status) {
        return parse_records(body).map(Lookup::Records);
    }

    match status_reason(status) {
        Some(reason) => Ok(Lookup::Refused(format!("{} ({} Days)", reason, days))),
        None => Err(LookupError::UnexpectedStatus { status }),
    }
}

pub struct FarsightClient {
    key: String,
    base: Url,
    http: Client,
}

impl FarsightClient {
    pub fn new(config: &FarsightConfig) -> Result<Self, LookupError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            key: config.key.clone(),
            base: config.url.clone(),
            http,
        })
    }

    fn get(&self, url: Url, ioc: &str, days: u32) -> Result<Lookup, LookupError> {
        let start_time = Instant::now();
        debug!(action = "request", component = "farsight_client", url = %url, "Sending lookup");

        let response = self
            .http
            .get(url)
            .header("X-API-Key", self.key.as_str())
            .header(ACCEPT, "application/json")
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;

        debug!(
            action = "response",
            component = "farsight_client",
            ioc,
            status,
            bytes = body.len(),
            duration_ms = start_time.elapsed().as_millis(),
            "Lookup answered"
        );

        let lookup = interpret_response(status, &body, days)?;
        if let Lookup::Refused(reason) = &lookup {
            debug!(action = "refused", component = "farsight_client", ioc, reason = %reason, "No results found");
        }
        Ok(lookup)
    }
}

impl PassiveDns for FarsightClient {
    fn rdata(
        &self,
        ioc: &str,
        kind: IocKind,
        days: u32,
        limit: u64,
    ) -> Result<Lookup, LookupError> {
        let url = lookup_url(
            &self.base,
            &["lookup", "rdata", kind.rdata_type(), ioc],
            days,
            Some(limit),
        )?;
        self.get(url, ioc, days)
    }

    fn rrset(&self, ioc: &str, days: u32) -> Result<Lookup, LookupError> {
        let url = lookup_url(&self.base, &["lookup", "rrset", "name", ioc], days, None)?;
        self.get(url, ioc, days)
    }
}
