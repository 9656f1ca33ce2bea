//! Loading of externally generated grid files.
//!
//! Such files can be produced for example by lalapps_ComputeFstatistic_v2
//! with `--outputGrid`: whitespace-separated columns, an optional block of
//! `%%`-prefixed header lines whose last line names the columns in the CFSv2
//! convention (`freq alpha delta f1dot ...`).

use std::fs;
use std::path::Path;

use fg_types::{DataError, FgResult, InputTable};

/// Maximum spin-down order recognized when translating column names.
const MAX_SPINDOWN_ORDER: usize = 6;

/// Default CFSv2 column order for headerless files.
const DEFAULT_COLUMNS: [&str; 6] = ["freq", "alpha", "delta", "f1dot", "f2dot", "f3dot"];

/// An externally supplied grid, loaded verbatim with translated column names.
#[derive(Debug, Clone)]
pub struct GridFile {
    pub table: InputTable,
}

impl GridFile {
    /// Per-column (min, max) spans of the loaded grid, used as the default
    /// search ranges for evaluator setup when not explicitly overridden.
    pub fn search_ranges(&self) -> Vec<(String, (f64, f64))> {
        self.table.ranges()
    }
}

/// Convert grid column heading keys from the CFSv2 convention into ours:
/// `freq -> F0`, `alpha -> Alpha`, `delta -> Delta`, `f{k}dot -> F{k}`.
/// Unrecognized columns pass through unchanged.
fn translate_key(key: &str) -> String {
    match key {
        "freq" => "F0".to_string(),
        "alpha" => "Alpha".to_string(),
        "delta" => "Delta".to_string(),
        other => {
            for k in 1..=MAX_SPINDOWN_ORDER {
                if other == format!("f{k}dot") {
                    return format!("F{k}");
                }
            }
            other.to_string()
        }
    }
}

/// Load an external grid file into an input table.
///
/// Header lines are skipped by counting the leading run of `%%`-prefixed
/// lines; the last of those is taken as the column-name line. A zero-row
/// file is a fatal configuration error.
pub fn load_grid_file(path: &Path) -> FgResult<GridFile> {
    tracing::info!("Loading grid from file: {}", path.display());
    let content = fs::read_to_string(path)?;
    let path_str = path.display().to_string();

    let mut header_line: Option<&str> = None;
    let mut in_header = true;
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if in_header && line.starts_with("%%") {
            header_line = Some(line);
            continue;
        }
        in_header = false;
        if line.is_empty() || line.starts_with('%') {
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
        if let Some(first) = rows.first() {
            if row.len() != first.len() {
                return Err(DataError::RowLengthMismatch {
                    expected: first.len(),
                    actual: row.len(),
                }
                .into());
            }
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(DataError::EmptyGrid { path: path_str }.into());
    }
    let width = rows[0].len();

    let keys: Vec<String> = match header_line {
        Some(line) => line
            .trim_start_matches('%')
            .trim()
            .split_whitespace()
            .map(translate_key)
            .collect(),
        None => {
            if width > DEFAULT_COLUMNS.len() {
                return Err(DataError::RowLengthMismatch {
                    expected: DEFAULT_COLUMNS.len(),
                    actual: width,
                }
                .into());
            }
            DEFAULT_COLUMNS[..width].iter().map(|k| translate_key(k)).collect()
        }
    };
    if keys.len() != width {
        return Err(DataError::RowLengthMismatch {
            expected: keys.len(),
            actual: width,
        }
        .into());
    }

    tracing::info!(
        "Successfully loaded grid of size {}x{} with columns {:?}",
        rows.len(),
        width,
        keys
    );
    Ok(GridFile {
        table: InputTable { keys, rows },
    })
}
