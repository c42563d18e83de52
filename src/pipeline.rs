use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::client::{Lookup, LookupError, PassiveDns};
use crate::domain::{self, IocKind};
use crate::stats::{IocReport, IocResult, PeriodResult, RunResult};

/// Knobs for one run over a list of IOCs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub periods: Vec<u32>,
    pub limit: u64,
}

/// Looks every IOC up for every period, one request at a time.
///
/// IOCs that are neither a public IP nor a valid domain are skipped, as are
/// periods whose lookup fails outright. Refusals from the provider are kept so
/// they show up in the report.
pub fn run<S: PassiveDns>(source: &S, iocs: &[String], options: &RunOptions) -> RunResult {
    let total_start_time = Instant::now();
    info!(
        action = "start",
        component = "pipeline",
        ioc_count = iocs.len(),
        periods = ?options.periods,
        "Running passive DNS lookups"
    );

    let mut result = RunResult::default();

    for ioc in iocs {
        let Some(kind) = domain::classify(ioc) else {
            error!(action = "classify", component = "pipeline", ioc = %ioc, "Not a valid public IP or domain");
            continue;
        };

        let mut periods = BTreeMap::new();
        for &days in &options.periods {
            match lookup_period(source, ioc, kind, days, options.limit) {
                Ok(Lookup::Records(records)) => {
                    debug!(action = "resolved", component = "pipeline", ioc = %ioc, days, records = records.len(), "Resolved");
                    periods.insert(days, PeriodResult::Resolved(IocReport::from_records(records)));
                }
                Ok(Lookup::Refused(reason)) => {
                    periods.insert(days, PeriodResult::Failed(reason));
                }
                Err(e) => {
                    error!(action = "lookup", component = "pipeline", ioc = %ioc, days, error = %e, "No data due to error");
                }
            }
        }

        result.iocs.push(IocResult {
            ioc: ioc.clone(),
            kind,
            periods,
        });
    }

    info!(
        action = "complete",
        component = "pipeline",
        reported = result.iocs.len(),
        duration_ms = total_start_time.elapsed().as_millis(),
        "Done"
    );
    result
}

fn lookup_period<S: PassiveDns>(
    source: &S,
    ioc: &str,
    kind: IocKind,
    days: u32,
    limit: u64,
) -> Result<Lookup, LookupError> {
    if kind == IocKind::Domain {
        // The rdata index lacks bailiwick data; DNSDB expects the rrset for
        // the owner name to be fetched alongside it.
        source.rrset(ioc, days)?;
    }
    source.rdata(ioc, kind, days, limit)
}

/// Plain text breakdown printed once the run is finished.
pub fn summary(result: &RunResult, limit: u64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Max Resolutions: {}\n", limit);

    for ioc in &result.iocs {
        let heading = format!("{} - {}", ioc.kind, ioc.ioc);
        let _ = writeln!(out, "{}", heading);
        let _ = writeln!(out, "{}", "-".repeat(heading.chars().count()));

        for (days, period) in &ioc.periods {
            match period {
                PeriodResult::Resolved(report) => {
                    let top_tld = report.top_level.most_common().unwrap_or_default();
                    let _ = writeln!(
                        out,
                        "{}\tDays: {} Resolutions, {} Unique TLDs, Most Common \".{}\"",
                        days,
                        report.resolutions(),
                        report.top_level.len(),
                        top_tld
                    );
                }
                PeriodResult::Failed(reason) => {
                    let _ = writeln!(out, "{}\tDays: {}", days, reason);
                }
            }
        }

        out.push('\n');
    }

    out
}
