//! Plain-text result table serialization and the tolerant re-loader.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use fg_types::{
    internal_error, CacheFingerprint, DataError, FgResult, OutputSchema, ResultTable,
};

/// Provenance stamped into every output file header.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub tool: String,
    pub version: String,
    pub run_id: Uuid,
    pub date: DateTime<Utc>,
}

impl Provenance {
    pub fn new(tool: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            version: version.into(),
            run_id: Uuid::new_v4(),
            date: Utc::now(),
        }
    }

    /// Header lines, without the leading comment marker. These use `:` as
    /// separator so the loader can tell them apart from the ` = `
    /// fingerprint lines.
    pub fn header_lines(&self) -> Vec<String> {
        vec![
            format!("tool: {} {}", self.tool, self.version),
            format!("date: {}", self.date.to_rfc3339()),
            format!("run-id: {}", self.run_id),
        ]
    }
}

/// Replace non-finite values with bounded numeric stand-ins so the output
/// file stays strictly numeric and re-loadable.
fn sanitize(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else if value == f64::INFINITY {
        f64::MAX
    } else if value == f64::NEG_INFINITY {
        f64::MIN
    } else {
        value
    }
}

/// Save a result table to a txt file, single-shot.
///
/// The header carries the provenance lines, the fingerprint as `key = value`
/// lines, and the column-name line; each column is rendered with its
/// schema format.
pub fn save_table(
    path: &Path,
    table: &ResultTable,
    schema: &OutputSchema,
    fingerprint: &CacheFingerprint,
    provenance: &Provenance,
) -> FgResult<()> {
    if schema.len() != table.columns.len() {
        return Err(internal_error!(
            "Lengths of data rows ({}) and output format ({}) do not match",
            table.columns.len(),
            schema.len()
        ));
    }
    tracing::info!("Saving data to {}", path.display());

    let mut out = String::new();
    for line in provenance.header_lines() {
        out.push_str("# ");
        out.push_str(&line);
        out.push('\n');
    }
    for line in fingerprint.lines() {
        out.push_str("# ");
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("# ");
    out.push_str(&table.columns.join(" "));
    out.push('\n');

    for row in &table.rows {
        let rendered: Vec<String> = schema
            .iter()
            .zip(row.iter())
            .map(|((_, fmt), value)| fmt.render(sanitize(*value)))
            .collect();
        out.push_str(&rendered.join(" "));
        out.push('\n');
    }

    fs::write(path, out)?;
    Ok(())
}

/// A re-loaded result file: the table plus the fingerprint found in its
/// header.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: ResultTable,
    pub fingerprint: CacheFingerprint,
}

/// Tolerant re-loader for files written by [`save_table`].
///
/// Comment lines containing ` = ` are fingerprint lines; the last comment
/// line before structured data is the column-name line; other comment lines
/// (provenance) are skipped.
pub fn load_table(path: &Path) -> FgResult<LoadedTable> {
    let content = fs::read_to_string(path)?;
    let path_str = path.display().to_string();

    let mut fingerprint_lines: Vec<String> = Vec::new();
    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            let comment = comment.trim();
            if comment.contains(" = ") {
                fingerprint_lines.push(comment.to_string());
            } else if !comment.contains(':') {
                columns = comment.split_whitespace().map(str::to_string).collect();
            }
            continue;
        }
        let row: Vec<f64> = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>().map_err(|e| DataError::ParseError {
                    path: path_str.clone(),
                    line: lineno + 1,
                    message: e.to_string(),
                })
            })
            .collect::<Result<_, _>>()?;
        if !columns.is_empty() && row.len() != columns.len() {
            return Err(DataError::RowLengthMismatch {
                expected: columns.len(),
                actual: row.len(),
            }
            .into());
        }
        rows.push(row);
    }

    Ok(LoadedTable {
        table: ResultTable { columns, rows },
        fingerprint: CacheFingerprint::from_lines(fingerprint_lines),
    })
}
