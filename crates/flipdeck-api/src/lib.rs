// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use reqwest::blocking::multipart::Form;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use flipdeck_app::{DealRecord, RawRow, ResultBatch, ResultKind};

/// How much of the scanner's captured stdout to surface when a run fails.
const STDOUT_TAIL_LIMIT: usize = 400;

/// Parameters for a server-side scan run. The defaults mirror what the
/// report server itself assumes when a field is omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRequest {
    pub mode: String,
    pub category: String,
    pub limit: u32,
    pub shipping_flat: f64,
    pub outdir: String,
    pub brands: Option<String>,
}

impl Default for ReportRequest {
    fn default() -> Self {
        Self {
            mode: "highticket".to_owned(),
            category: "Tools,Electronics".to_owned(),
            limit: 120,
            shipping_flat: 14.99,
            outdir: "data/reports".to_owned(),
            brands: None,
        }
    }
}

/// What a successful scan run reports back. `files` maps result kind names
/// to the report paths the server wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub stdout_tail: Option<String>,
    pub files: BTreeMap<String, String>,
}

/// One stored report: the server-side file it came from plus its rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LatestReport {
    pub file: Option<String>,
    pub records: Vec<DealRecord>,
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("server.base_url must not be empty");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn health(&self) -> Result<()> {
        let response = self
            .http
            .get(format!("{}/api/health", self.base_url))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(())
    }

    /// Kick off a scan on the server and wait for it to finish. A response
    /// with `ok: false` is a failed run regardless of HTTP status; the
    /// server's own error text plus a slice of scanner stdout become the
    /// error message.
    pub fn run_report(&self, request: &ReportRequest) -> Result<RunOutcome> {
        let response = self
            .http
            .post(format!("{}/api/run-report", self.base_url))
            .json(request)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        let body = response.text().unwrap_or_default();
        run_outcome_from(status, &body, "scan failed")
    }

    /// Upload a local CSV for server-side analysis. The server runs the
    /// full arbitrage pass over it and writes fresh report files; the
    /// success response is the same run envelope a scan produces, and the
    /// results themselves come from a follow-up [`Self::fetch_all_latest`].
    pub fn analyze_upload(&self, path: &Path) -> Result<RunOutcome> {
        let form = Form::new()
            .file("file", path)
            .with_context(|| format!("failed to read upload file {}", path.display()))?;
        let response = self
            .http
            .post(format!("{}/api/analyze-upload", self.base_url))
            .multipart(form)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        let body = response.text().unwrap_or_default();
        run_outcome_from(status, &body, "analysis failed")
    }

    /// Latest stored report for one result kind. A non-2xx here means the
    /// server has no report of that kind yet, which is an empty report
    /// rather than an error; only transport failures propagate.
    pub fn latest(&self, kind: ResultKind) -> Result<LatestReport> {
        let response = self
            .http
            .get(format!(
                "{}/api/latest?type={}",
                self.base_url,
                kind.as_str()
            ))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        if !response.status().is_success() {
            return Ok(LatestReport::default());
        }

        let parsed: LatestResponse = response.json().context("decode latest response")?;
        Ok(LatestReport {
            file: parsed.file,
            records: canonicalize(parsed.items),
        })
    }

    /// Fetch all three latest reports concurrently and join them into one
    /// batch. Any single fetch failing fails the whole batch, so a partial
    /// load can never land.
    pub fn fetch_all_latest(&self) -> Result<ResultBatch> {
        let (passed, nearmiss, all) = thread::scope(|scope| {
            let passed = scope.spawn(|| self.latest(ResultKind::Passed));
            let nearmiss = scope.spawn(|| self.latest(ResultKind::NearMiss));
            let all = scope.spawn(|| self.latest(ResultKind::All));
            (join(passed), join(nearmiss), join(all))
        });
        let passed = passed?;
        let nearmiss = nearmiss?;
        let all = all?;
        let source = [&passed.file, &all.file, &nearmiss.file]
            .into_iter()
            .find_map(|file| file.as_deref())
            .map(base_name);
        Ok(ResultBatch {
            passed: passed.records,
            nearmiss: nearmiss.records,
            all: all.records,
            source,
        })
    }
}

/// Scan and upload runs answer with the same envelope; `ok: false` is a
/// failed run regardless of HTTP status, carrying the server's own error
/// text plus a slice of scanner stdout.
fn run_outcome_from(status: StatusCode, body: &str, default_reason: &str) -> Result<RunOutcome> {
    match serde_json::from_str::<RunResponse>(body) {
        Ok(parsed) if parsed.ok && status.is_success() => Ok(RunOutcome {
            stdout_tail: parsed.stdout_tail,
            files: parsed.files.unwrap_or_default(),
        }),
        Ok(parsed) => {
            let reason = parsed
                .error
                .filter(|error| !error.is_empty())
                .unwrap_or_else(|| default_reason.to_owned());
            match parsed.stdout_tail.as_deref().map(truncate_tail) {
                Some(tail) if !tail.is_empty() => bail!("{reason}\n{tail}"),
                _ => bail!("{reason}"),
            }
        }
        Err(_) if !status.is_success() => Err(clean_error_response(status, body)),
        Err(error) => Err(error).context("decode report server response"),
    }
}

fn canonicalize(items: Vec<serde_json::Map<String, Value>>) -> Vec<DealRecord> {
    items
        .into_iter()
        .map(|item| DealRecord::from_keyed(item_to_row(item)))
        .collect()
}

fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map_or_else(|| path.to_owned(), |name| name.to_string_lossy().into_owned())
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, Result<T>>) -> Result<T> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("latest-report fetch thread panicked")),
    }
}

fn truncate_tail(tail: &str) -> String {
    let trimmed = tail.trim();
    if trimmed.len() <= STDOUT_TAIL_LIMIT {
        return trimmed.to_owned();
    }
    let start = trimmed.len() - STDOUT_TAIL_LIMIT;
    let mut cut = start;
    while !trimmed.is_char_boundary(cut) {
        cut += 1;
    }
    trimmed[cut..].to_owned()
}

/// Flatten one JSON result item into ordered string pairs for the alias
/// walk. Scalars keep their JSON text; null becomes the empty string, which
/// canonicalization already treats as absent.
fn item_to_row(item: serde_json::Map<String, Value>) -> RawRow {
    item.into_iter()
        .map(|(name, value)| {
            let text = match value {
                Value::Null => String::new(),
                Value::String(text) => text,
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                other => other.to_string(),
            };
            (name, text)
        })
        .collect()
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- is the report server running? ({} )",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorEnvelope>(body) {
        if let Some(error) = parsed.error
            && !error.is_empty()
        {
            return anyhow!("server error ({}): {}", status.as_u16(), error);
        }
        if let Some(detail) = parsed.detail
            && !detail.is_empty()
        {
            return anyhow!("server error ({}): {}", status.as_u16(), detail);
        }
    }

    if body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body);
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    ok: bool,
    error: Option<String>,
    stdout_tail: Option<String>,
    files: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    file: Option<String>,
    #[serde(default)]
    items: Vec<serde_json::Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: Option<String>,
    detail: Option<String>,
}
