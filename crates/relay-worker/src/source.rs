//! Delimited-file source adapter
//!
//! Reads a header + rows text file, infers a schema from the leading
//! sample, validates and converts every row, and publishes the survivors
//! into the MessageBox. A row with any invalid field is rejected whole —
//! never partially published — and reported in the run summary.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

use relay_broker::message_box::MessageBox;
use relay_common::typing::{infer_schema, RecordPayload};
use relay_common::AdapterIdentity;

/// Default field delimiter
const DEFAULT_DELIMITER: char = ',';

/// Default number of rows sampled for type inference
const DEFAULT_SAMPLE_ROWS: usize = 100;

/// Resolved settings of the delimited-file source
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub input_path: PathBuf,
    pub delimiter: char,
    pub sample_rows: usize,
}

impl SourceSettings {
    /// Build from the generic settings bag
    pub fn from_map(settings: &HashMap<String, String>) -> Result<Self> {
        let input_path = settings
            .get("input_path")
            .context("Missing required setting 'input_path'")?;

        let delimiter = match settings.get("delimiter") {
            None => DEFAULT_DELIMITER,
            Some(raw) => {
                let mut chars = raw.chars();
                let first = chars.next().context("Setting 'delimiter' is empty")?;
                anyhow::ensure!(chars.next().is_none(), "Setting 'delimiter' must be one character");
                first
            },
        };

        let sample_rows = match settings.get("sample_rows") {
            None => DEFAULT_SAMPLE_ROWS,
            Some(raw) => raw
                .parse()
                .context("Setting 'sample_rows' must be a positive integer")?,
        };

        Ok(Self {
            input_path: PathBuf::from(input_path),
            delimiter,
            sample_rows,
        })
    }
}

/// Summary of one source pass
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceRunReport {
    pub published: usize,
    /// Rows that failed validation and were dropped before publish
    pub rejected: usize,
    /// Rows that validated but failed to publish
    pub failed: usize,
}

/// One pass over the input file: read, infer, validate, publish.
///
/// Validation errors are local to their row and synchronous: the row is
/// counted and skipped. Publish failures are likewise per-row — one bad
/// insert does not abort the rest of the file.
pub async fn run(
    message_box: &MessageBox,
    identity: &AdapterIdentity,
    settings: &SourceSettings,
) -> Result<SourceRunReport> {
    let raw = tokio::fs::read_to_string(&settings.input_path)
        .await
        .with_context(|| format!("Failed to read {}", settings.input_path.display()))?;

    let (header, rows) = parse_delimited(&raw, settings.delimiter)?;
    let schema = infer_schema(&header, &rows, settings.sample_rows);

    info!(
        interface = %identity.interface_name,
        columns = schema.len(),
        rows = rows.len(),
        "Source pass started"
    );

    let mut report = SourceRunReport::default();
    for (idx, row) in rows.iter().enumerate() {
        // Header is line 1, first data row line 2
        let line = idx + 2;

        let payload = match RecordPayload::from_row(&schema, row) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(line, error = %e, "Row rejected");
                report.rejected += 1;
                continue;
            },
        };

        match message_box.publish_record(identity, &payload).await {
            Ok(_) => report.published += 1,
            Err(e) => {
                warn!(line, error = %e, "Row failed to publish");
                report.failed += 1;
            },
        }
    }

    info!(
        published = report.published,
        rejected = report.rejected,
        failed = report.failed,
        "Source pass completed"
    );

    Ok(report)
}

/// Split raw text into a header and data rows. Blank lines are skipped.
fn parse_delimited(raw: &str, delimiter: char) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut lines = raw.lines().filter(|line| !line.trim().is_empty());

    let header: Vec<String> = lines
        .next()
        .context("Input file has no header row")?
        .split(delimiter)
        .map(|field| field.trim().to_string())
        .collect();

    let rows: Vec<Vec<String>> = lines
        .map(|line| {
            line.split(delimiter)
                .map(|field| field.to_string())
                .collect()
        })
        .collect();

    Ok((header, rows))
}
