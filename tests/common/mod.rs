//! Shared helpers for tests that talk to a mock provider.

use std::time::Duration;

use mockito::{Matcher, ServerGuard};
use pdns_tld::config::FarsightConfig;
use url::Url;

pub const API_KEY: &str = "test-key";

pub fn config(server: &ServerGuard) -> FarsightConfig {
    FarsightConfig {
        key: API_KEY.to_string(),
        url: Url::parse(&server.url()).unwrap(),
        timeout: Duration::from_secs(5),
    }
}

/// Query matcher for a lookup window. Without a limit the query must hold
/// nothing but the window.
pub fn window(days: u32, limit: Option<u32>) -> Matcher {
    let after = format!("-{}", u64::from(days) * 86_400);
    match limit {
        Some(limit) => Matcher::AllOf(vec![
            Matcher::UrlEncoded("time_last_after".into(), after),
            Matcher::UrlEncoded("limit".into(), limit.to_string()),
        ]),
        None => Matcher::Regex(format!("^time_last_after={after}$")),
    }
}

pub fn ndjson(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| format!("{{\"rrname\":\"{}\",\"rrtype\":\"A\",\"rdata\":\"8.8.8.8\"}}\n", name))
        .collect()
}
