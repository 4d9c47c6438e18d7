// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use flipdeck_api::{Client, ReportRequest, RunOutcome};
use flipdeck_app::{ResultBatch, ResultKind};
use flipdeck_tui::{AppRuntime, InternalEvent, LoadEvent, LoadRequest};
use std::path::Path;
use std::sync::mpsc::Sender;
use std::thread;

/// Runtime backed by the report server. Loads run on their own thread so
/// the UI keeps drawing while the scanner works.
pub struct ApiRuntime {
    client: Client,
    report: ReportRequest,
}

impl ApiRuntime {
    pub fn new(client: Client, report: ReportRequest) -> Self {
        Self { client, report }
    }
}

impl AppRuntime for ApiRuntime {
    fn run_load(&mut self, request: &LoadRequest) -> Result<ResultBatch> {
        run_load_with(&self.client, &self.report, request)
    }

    fn spawn_load(
        &mut self,
        request_id: u64,
        request: LoadRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        let report = self.report.clone();
        thread::spawn(move || {
            let event = match run_load_with(&client, &report, &request) {
                Ok(batch) => InternalEvent::Load(LoadEvent::Completed { request_id, batch }),
                Err(error) => InternalEvent::Load(LoadEvent::Failed {
                    request_id,
                    error: error.to_string(),
                }),
            };
            let _ = tx.send(event);
        });
        Ok(())
    }
}

fn run_load_with(client: &Client, report: &ReportRequest, request: &LoadRequest) -> Result<ResultBatch> {
    match request {
        LoadRequest::Latest => client.fetch_all_latest(),
        LoadRequest::Scan => {
            let outcome = client.run_report(report)?;
            refetch_after_run(client, &outcome)
        }
        LoadRequest::OpenCsv(path) => load_local_report(path),
        LoadRequest::Upload(path) => {
            let outcome = client.analyze_upload(path)?;
            refetch_after_run(client, &outcome)
        }
    }
}

/// A finished run has written fresh report files server-side; the dashboard
/// contents always come from the stored reports, never from the run
/// response itself. The run's own file map names the source when the latest
/// fetch cannot.
fn refetch_after_run(client: &Client, outcome: &RunOutcome) -> Result<ResultBatch> {
    let mut batch = client.fetch_all_latest()?;
    if batch.source.is_none() {
        batch.source = run_source(outcome);
    }
    Ok(batch)
}

fn run_source(outcome: &RunOutcome) -> Option<String> {
    ["passed", "all", "nearmiss"]
        .into_iter()
        .find_map(|kind| outcome.files.get(kind))
        .map(|path| report_file_name(path))
}

fn report_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map_or_else(|| path.to_owned(), |name| name.to_string_lossy().into_owned())
}

/// Load one report file from disk. Report files are named after the result
/// set they hold (`passed-*.csv` and friends); anything unrecognizable is
/// treated as an all-scanned list.
fn load_local_report(path: &Path) -> Result<ResultBatch> {
    let load = flipdeck_ingest::load_csv(path)?;
    let kind = kind_from_file_name(load.source.as_deref().unwrap_or_default());

    let mut batch = ResultBatch {
        source: load.source.clone(),
        ..ResultBatch::default()
    };
    match kind {
        ResultKind::Passed => {
            batch.all = load.records.clone();
            batch.passed = load.records;
        }
        ResultKind::NearMiss => {
            batch.all = load.records.clone();
            batch.nearmiss = load.records;
        }
        ResultKind::All => batch.all = load.records,
    }
    Ok(batch)
}

fn kind_from_file_name(name: &str) -> ResultKind {
    let lowered = name.to_lowercase();
    for kind in [ResultKind::Passed, ResultKind::NearMiss] {
        if lowered.starts_with(kind.as_str()) {
            return kind;
        }
    }
    ResultKind::All
}

/// Offline runtime for `--demo`: every load answers from the deterministic
/// sample generator, except local files which still load for real.
pub struct DemoRuntime {
    seed: u64,
}

impl DemoRuntime {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl AppRuntime for DemoRuntime {
    fn run_load(&mut self, request: &LoadRequest) -> Result<ResultBatch> {
        match request {
            LoadRequest::OpenCsv(path) => load_local_report(path),
            _ => {
                self.seed = self.seed.wrapping_add(1);
                Ok(flipdeck_testkit::sample_batch(self.seed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiRuntime, DemoRuntime, kind_from_file_name, load_local_report};
    use anyhow::{Result, anyhow};
    use flipdeck_api::{Client, ReportRequest};
    use flipdeck_app::ResultKind;
    use flipdeck_tui::{AppRuntime, LoadRequest};
    use std::thread;
    use std::time::Duration;
    use tiny_http::{Header, Response, Server};

    fn json_response(body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
        Response::from_string(body).with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
    }

    fn latest_body(url: &str, with_file: bool) -> String {
        let kind = url
            .rsplit_once("type=")
            .map(|(_, kind)| kind.to_owned())
            .expect("kind query expected");
        if with_file {
            format!(r#"{{"file":"data/reports/{kind}-2026-08-28.csv","items":[{{"title":"{kind}"}}]}}"#)
        } else {
            format!(r#"{{"file":null,"items":[{{"title":"{kind}"}}]}}"#)
        }
    }

    const RUN_BODY: &str = r#"{"ok":true,"run_id":"2026-08-28_150000","stdout_tail":"done","files":{"passed":"data/reports/passed-2026-08-28.csv","nearmiss":"data/reports/nearmiss-2026-08-28.csv","all":"data/reports/all-2026-08-28.csv"}}"#;

    #[test]
    fn file_name_prefix_selects_the_result_set() {
        assert_eq!(kind_from_file_name("passed-2026-08-28.csv"), ResultKind::Passed);
        assert_eq!(kind_from_file_name("nearmiss-2026-08-28.csv"), ResultKind::NearMiss);
        assert_eq!(kind_from_file_name("all-2026-08-28.csv"), ResultKind::All);
        assert_eq!(kind_from_file_name("whatever.csv"), ResultKind::All);
    }

    #[test]
    fn local_passed_report_lands_in_passed_and_all() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("passed-2026-08-28.csv");
        std::fs::write(&path, "title,cost\nDrill,50\n")?;

        let batch = load_local_report(&path)?;
        assert_eq!(batch.passed.len(), 1);
        assert_eq!(batch.all.len(), 1);
        assert!(batch.nearmiss.is_empty());
        assert_eq!(batch.source.as_deref(), Some("passed-2026-08-28.csv"));
        Ok(())
    }

    #[test]
    fn unprefixed_report_only_fills_the_all_set() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("export.csv");
        std::fs::write(&path, "title,cost\nDrill,50\n")?;

        let batch = load_local_report(&path)?;
        assert!(batch.passed.is_empty());
        assert_eq!(batch.all.len(), 1);
        Ok(())
    }

    #[test]
    fn upload_flow_refetches_the_latest_reports() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());

        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..4 {
                let request = server.recv().expect("request expected");
                seen.push(request.url().to_owned());
                let body = if request.url() == "/api/analyze-upload" {
                    RUN_BODY.to_owned()
                } else {
                    latest_body(request.url(), true)
                };
                request
                    .respond(json_response(&body))
                    .expect("response should succeed");
            }
            seen
        });

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("upload.csv");
        std::fs::write(&path, "Product,Woot_Price\nDrill,50\n")?;

        let client = Client::new(&addr, Duration::from_secs(1))?;
        let mut runtime = ApiRuntime::new(client, ReportRequest::default());
        let batch = runtime.run_load(&LoadRequest::Upload(path))?;
        assert_eq!(batch.passed[0].title.as_deref(), Some("passed"));
        assert_eq!(batch.nearmiss[0].title.as_deref(), Some("nearmiss"));
        assert_eq!(batch.all[0].title.as_deref(), Some("all"));
        assert_eq!(batch.source.as_deref(), Some("passed-2026-08-28.csv"));

        let seen = handle.join().expect("server thread should join");
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], "/api/analyze-upload");
        assert!(seen[1..].iter().all(|url| url.starts_with("/api/latest?type=")));
        Ok(())
    }

    #[test]
    fn scan_source_falls_back_to_the_run_file_map() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());

        let handle = thread::spawn(move || {
            for _ in 0..4 {
                let request = server.recv().expect("request expected");
                let body = if request.url() == "/api/run-report" {
                    RUN_BODY.to_owned()
                } else {
                    latest_body(request.url(), false)
                };
                request
                    .respond(json_response(&body))
                    .expect("response should succeed");
            }
        });

        let client = Client::new(&addr, Duration::from_secs(1))?;
        let mut runtime = ApiRuntime::new(client, ReportRequest::default());
        let batch = runtime.run_load(&LoadRequest::Scan)?;
        assert_eq!(batch.source.as_deref(), Some("passed-2026-08-28.csv"));

        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn demo_runtime_answers_without_a_server() -> anyhow::Result<()> {
        let mut runtime = DemoRuntime::new(1);
        let batch = runtime.run_load(&LoadRequest::Latest)?;
        assert!(!batch.passed.is_empty());
        assert!(!batch.all.is_empty());
        Ok(())
    }
}
