// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use flipdeck_api::{Client, ReportRequest};
use flipdeck_app::ResultKind;
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};

fn json_response(body: &str, status: u16) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
}

#[test]
fn connection_error_contains_actionable_remediation() {
    let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))
        .expect("client should initialize");

    let error = client
        .health()
        .expect_err("health should fail for unreachable endpoint");
    assert!(error.to_string().contains("is the report server running?"));
}

#[test]
fn health_succeeds_against_mock_server() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/health");
        request
            .respond(json_response(r#"{"ok":true}"#, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    client.health()?;

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn run_report_surfaces_server_error_and_stdout_tail() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/run-report");
        let body = r#"{"ok":false,"error":"analysis failed: OpenAI quota exceeded","stdout_tail":"scanning page 3 of 3\nrate limited"}"#;
        request
            .respond(json_response(body, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .run_report(&ReportRequest::default())
        .expect_err("ok:false should be an error");
    let message = error.to_string();
    assert!(message.contains("OpenAI quota exceeded"));
    assert!(message.contains("rate limited"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn run_report_returns_files_on_success() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let body = r#"{"ok":true,"run_id":"2026-08-28_143000","stdout_tail":"done","files":{"passed":"data/reports/passed-2026-08-28.csv","nearmiss":"data/reports/nearmiss-2026-08-28.csv","all":"data/reports/all-2026-08-28.csv"}}"#;
        request
            .respond(json_response(body, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let outcome = client.run_report(&ReportRequest::default())?;
    assert_eq!(outcome.files.len(), 3);
    assert_eq!(
        outcome.files.get("passed").map(String::as_str),
        Some("data/reports/passed-2026-08-28.csv")
    );
    assert_eq!(outcome.stdout_tail.as_deref(), Some("done"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn latest_missing_report_is_an_empty_list() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/latest?type=nearmiss");
        request
            .respond(json_response(r#"{"detail":"no report found"}"#, 404))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let report = client.latest(ResultKind::NearMiss)?;
    assert!(report.records.is_empty());
    assert_eq!(report.file, None);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn latest_items_canonicalize_through_the_alias_table() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/latest?type=passed");
        let body = r#"{"file":"data/reports/passed-2026-08-28.csv","items":[{"title":"Drill","woot_price":49.99,"net_profit":18.1,"net_roi":0.38,"woot_url":"https://woot/drill"}]}"#;
        request
            .respond(json_response(body, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let report = client.latest(ResultKind::Passed)?;
    assert_eq!(report.file.as_deref(), Some("data/reports/passed-2026-08-28.csv"));
    let records = &report.records;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title.as_deref(), Some("Drill"));
    assert_eq!(records[0].buy_price.as_deref(), Some("49.99"));
    assert_eq!(records[0].profit.as_deref(), Some("18.1"));
    assert_eq!(records[0].roi.as_deref(), Some("0.38"));
    assert_eq!(records[0].url_source.as_deref(), Some("https://woot/drill"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn fetch_all_latest_joins_three_kinds() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        for _ in 0..3 {
            let request = server.recv().expect("request expected");
            let kind = request
                .url()
                .rsplit_once("type=")
                .map(|(_, kind)| kind.to_owned())
                .expect("kind query expected");
            let body = format!(
                r#"{{"file":"data/reports/{kind}-2026-08-28.csv","items":[{{"title":"{kind}"}}]}}"#
            );
            request
                .respond(json_response(&body, 200))
                .expect("response should succeed");
        }
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let batch = client.fetch_all_latest()?;
    assert_eq!(batch.passed[0].title.as_deref(), Some("passed"));
    assert_eq!(batch.nearmiss[0].title.as_deref(), Some("nearmiss"));
    assert_eq!(batch.all[0].title.as_deref(), Some("all"));
    assert_eq!(batch.source.as_deref(), Some("passed-2026-08-28.csv"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn analyze_upload_returns_the_run_envelope() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/analyze-upload");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("read multipart body");
        assert!(body.contains("Drill"));
        let response = r#"{"ok":true,"run_id":"2026-08-28_150000","stdout_tail":"done","files":{"passed":"data/reports/passed-2026-08-28.csv","nearmiss":"data/reports/nearmiss-2026-08-28.csv","all":"data/reports/all-2026-08-28.csv"}}"#;
        request
            .respond(json_response(response, 200))
            .expect("response should succeed");
    });

    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("upload.csv");
    std::fs::write(&path, "Product,Woot_Price\nDrill,50\n")?;

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let outcome = client.analyze_upload(&path)?;
    assert_eq!(outcome.stdout_tail.as_deref(), Some("done"));
    assert_eq!(outcome.files.len(), 3);
    assert_eq!(
        outcome.files.get("passed").map(String::as_str),
        Some("data/reports/passed-2026-08-28.csv")
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn analyze_upload_surfaces_server_error_text() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let body = r#"{"ok":false,"error":"no file provided"}"#;
        request
            .respond(json_response(body, 400))
            .expect("response should succeed");
    });

    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("upload.csv");
    std::fs::write(&path, "Product\nDrill\n")?;

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .analyze_upload(&path)
        .expect_err("ok:false should be an error");
    assert!(error.to_string().contains("no file provided"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn fetch_all_latest_fails_wholesale_when_one_response_is_malformed() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        for _ in 0..3 {
            let request = server.recv().expect("request expected");
            let body = if request.url().ends_with("type=nearmiss") {
                "not json at all".to_owned()
            } else {
                let kind = request
                    .url()
                    .rsplit_once("type=")
                    .map(|(_, kind)| kind.to_owned())
                    .expect("kind query expected");
                format!(r#"{{"file":null,"items":[{{"title":"{kind}"}}]}}"#)
            };
            request
                .respond(json_response(&body, 200))
                .expect("response should succeed");
        }
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .fetch_all_latest()
        .expect_err("one bad response should fail the whole batch");
    assert!(error.to_string().contains("decode latest response"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn server_error_body_is_cleaned_up() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(r#"{"detail":"scan already running"}"#, 409))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .run_report(&ReportRequest::default())
        .expect_err("conflict should be an error");
    assert_eq!(error.to_string(), "server error (409): scan already running");

    handle.join().expect("server thread should join");
    Ok(())
}
