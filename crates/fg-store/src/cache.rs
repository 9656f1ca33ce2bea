//! Validation of previously written output files against a new search setup.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use fg_types::{
    allclose, CacheFingerprint, FgResult, InputTable, OutputSchema, ResultTable,
};

/// Check whether an existing output file matches this search and can be
/// reused instead of re-running.
///
/// Results are reusable if all of the following checks pass; the first
/// failing check logs its reason and the whole run falls through to a full
/// computation (cache misses are informational, never errors):
///
/// 1. the output file exists;
/// 2. it is not older than the oldest referenced source data file;
/// 3. the parameter fingerprint in its header is set-equal to the current
///    one;
/// 4. the stored table has the same number of rows as the current grid;
/// 5. it has at least as many columns as the input grid (extra
///    detection-statistic columns are allowed and ignored here);
/// 6. every input column matches the current grid within the tolerance
///    derived from that column's output format.
///
/// On success the previously stored table is returned as-is and the caller
/// must consider the run complete.
pub fn check_cache(
    path: &Path,
    fingerprint: &CacheFingerprint,
    input: &InputTable,
    schema: &OutputSchema,
    source_files: &[PathBuf],
    clean: bool,
) -> FgResult<Option<ResultTable>> {
    if clean {
        tracing::debug!("Clean run requested, ignoring any existing output file.");
        return Ok(None);
    }
    if !path.is_file() {
        tracing::info!(
            "No old output file '{}' found, continuing with grid search.",
            path.display()
        );
        return Ok(None);
    }
    if !source_files.is_empty() {
        let out_mtime = mtime(path)?;
        let mut oldest_source: Option<SystemTime> = None;
        for source in source_files {
            let t = mtime(source)?;
            oldest_source = Some(match oldest_source {
                Some(current) => current.min(t),
                None => t,
            });
        }
        if matches!(oldest_source, Some(oldest) if out_mtime < oldest) {
            tracing::info!("Search output data outdates source files, continuing with grid search.");
            return Ok(None);
        }
    }

    tracing::info!("Checking header of '{}'", path.display());
    let loaded = match crate::result_file::load_table(path) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::warn!(
                "Could not load old output file '{}' ({}), continuing with grid search.",
                path.display(),
                e
            );
            return Ok(None);
        }
    };

    if !loaded.fingerprint.matches(fingerprint) {
        tracing::info!(
            "Parameters string in file header does not match current search setup \
             (unmatched: {:?}), continuing with grid search.",
            loaded.fingerprint.unmatched(fingerprint)
        );
        return Ok(None);
    }
    tracing::info!("Parameters string in file header matches current search setup.");

    if loaded.table.len() != input.len() {
        tracing::info!(
            "Old data found in '{}', but differs in length ({} points in file, {} points \
             requested); continuing with grid search.",
            path.display(),
            loaded.table.len(),
            input.len()
        );
        return Ok(None);
    }
    // The stored file may legitimately carry more columns than the input
    // grid (detection statistics and post-processing quantities); only
    // fewer columns is disqualifying.
    if loaded.table.columns.len() < input.keys.len() {
        tracing::info!(
            "Old data found in '{}', but has less columns ({}) than new input parameters \
             grid ({}); continuing with grid search.",
            path.display(),
            loaded.table.columns.len(),
            input.keys.len()
        );
        return Ok(None);
    }

    for key in &input.keys {
        let stored = match loaded.table.column(key) {
            Ok(stored) => stored,
            Err(_) => {
                tracing::info!(
                    "Old data found in '{}', but input column '{}' is missing; continuing \
                     with grid search.",
                    path.display(),
                    key
                );
                return Ok(None);
            }
        };
        let current = input.column(key)?;
        let (rtol, atol) = match schema.format_for(key) {
            Some(fmt) => fmt.tolerance(),
            None => (0.0, 0.0),
        };
        if !allclose(&stored, &current, rtol, atol) {
            tracing::info!(
                "Old data found in '{}', input parameters grid differs in column '{}'; \
                 continuing with grid search.",
                path.display(),
                key
            );
            return Ok(None);
        }
    }

    tracing::info!(
        "Old data found in '{}' with matching input parameters grid, no search performed. \
         Data grid size: {}x{}",
        path.display(),
        loaded.table.len(),
        loaded.table.columns.len()
    );
    Ok(Some(loaded.table))
}

fn mtime(path: &Path) -> FgResult<SystemTime> {
    Ok(std::fs::metadata(path)?.modified()?)
}
