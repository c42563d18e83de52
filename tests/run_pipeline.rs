mod common;

use common::{config, ndjson, window};
use pdns_tld::{pipeline, report, FarsightClient, PeriodResult, RunOptions};

#[test]
fn end_to_end_run_and_report() {
    let mut server = mockito::Server::new();
    let ip = server
        .mock("GET", "/lookup/rdata/ip/8.8.8.8")
        .match_query(window(7, Some(500)))
        .with_status(200)
        .with_body(ndjson(&["a.example.com.", "b.example.com.", "x.sample.co.uk."]))
        .create();
    let rrset = server
        .mock("GET", "/lookup/rrset/name/example.com")
        .match_query(window(7, None))
        .with_status(200)
        .with_body(ndjson(&["example.com."]))
        .create();
    let name = server
        .mock("GET", "/lookup/rdata/name/example.com")
        .match_query(window(7, Some(500)))
        .with_status(404)
        .create();
    let client = FarsightClient::new(&config(&server)).unwrap();
    let iocs = vec![
        "8.8.8.8".to_string(),
        "not-an-ip-or-domain".to_string(),
        "example.com".to_string(),
    ];
    let options = RunOptions {
        periods: vec![7],
        limit: 500,
    };

    let result = pipeline::run(&client, &iocs, &options);
    ip.assert();
    rrset.assert();
    name.assert();

    let reported: Vec<&str> = result.iocs.iter().map(|ioc| ioc.ioc.as_str()).collect();
    assert_eq!(reported, ["8.8.8.8", "example.com"]);

    match &result.iocs[0].periods[&7] {
        PeriodResult::Resolved(report) => {
            assert_eq!(report.resolutions(), 3);
            assert_eq!(report.top_level.get("com"), 2);
            assert_eq!(report.top_level.get("co.uk"), 1);
            assert_eq!(report.second_level.get("sample.co.uk"), 1);
        }
        other => panic!("expected resolved period, got {other:?}"),
    }
    match &result.iocs[1].periods[&7] {
        PeriodResult::Failed(reason) => {
            assert_eq!(reason, "No records found for the given lookup (7 Days)")
        }
        other => panic!("expected refusal, got {other:?}"),
    }

    let summary = pipeline::summary(&result, options.limit);
    assert!(summary.contains("7\tDays: 3 Resolutions, 2 Unique TLDs, Most Common \".com\""));

    let out_dir = tempfile::tempdir().unwrap();
    let saved = report::render(&result, &options.periods, 10, &out_dir.path().join("analysis")).unwrap();
    assert!(saved.exists());
}
