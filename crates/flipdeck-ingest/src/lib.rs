// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::path::Path;

use anyhow::{Context, Result, bail};
use flipdeck_app::{ColumnMap, CsvLoad, LoadSummary};

/// Upper bound on accepted rows per file. Reports past this size are
/// truncated rather than rejected; the summary flags the truncation.
pub const MAX_ROWS: usize = 200;

/// Load a local CSV report. A missing or empty header row is the only fatal
/// case; malformed and all-empty data rows are counted and skipped.
pub fn load_csv(path: &Path) -> Result<CsvLoad> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open report file {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("failed to read header row from {}", path.display()))?
        .iter()
        .map(str::to_owned)
        .collect();
    if headers.iter().all(|name| name.trim().is_empty()) {
        bail!("report file {} has no header row", path.display());
    }

    // One alias resolution per file, not per row.
    let map = ColumnMap::resolve(&headers);

    let mut records = Vec::new();
    let mut summary = LoadSummary::default();
    for row in reader.records() {
        if records.len() >= MAX_ROWS {
            summary.capped = true;
            break;
        }
        summary.rows_read += 1;
        let row = match row {
            Ok(row) => row,
            Err(_) => {
                summary.skipped_malformed += 1;
                continue;
            }
        };
        if row.iter().all(|value| value.trim().is_empty()) {
            summary.skipped_empty += 1;
            continue;
        }
        let values: Vec<String> = row.iter().map(str::to_owned).collect();
        records.push(map.record(&headers, &values));
        summary.accepted += 1;
    }

    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    Ok(CsvLoad {
        records,
        summary,
        source,
    })
}
