//! JSON-lines export of recorded history.
//!
//! One [`MetricRecord`] per line, in step order. The format reloads with
//! [`read_jsonl`] into an identical record sequence.

use std::io::{BufRead, Write};

use cogmetrics_types::MetricRecord;

/// Errors that can occur while exporting or importing history.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Writing to or reading from the underlying stream failed.
    #[error("export I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A record could not be encoded or decoded.
    #[error("export JSON error at line {line}: {source}")]
    Json {
        /// One-based line number of the offending record.
        line: usize,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// Write every record as one JSON object per line. Returns the number of
/// records written.
pub fn write_jsonl<'a, W, I>(writer: &mut W, records: I) -> Result<usize, ExportError>
where
    W: Write,
    I: IntoIterator<Item = &'a MetricRecord>,
{
    let mut written: usize = 0;
    for record in records {
        let line = written.saturating_add(1);
        serde_json::to_writer(&mut *writer, record)
            .map_err(|source| ExportError::Json { line, source })?;
        writer.write_all(b"\n")?;
        written = line;
    }
    writer.flush()?;
    Ok(written)
}

/// Read records written by [`write_jsonl`]. Blank lines are skipped.
pub fn read_jsonl<R: BufRead>(reader: R) -> Result<Vec<MetricRecord>, ExportError> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_text = line?;
        if line_text.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line_text).map_err(|source| ExportError::Json {
            line: idx.saturating_add(1),
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}
