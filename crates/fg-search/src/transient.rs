//! Per-point transient F-stat map side files.
//!
//! When map persistence is enabled, every grid point writes one side file
//! holding the full (t0, tau) statistic surface. The filename is derived
//! from five frequency-evolution values at fixed high precision, so it acts
//! as a key content-addressed by parameters: two runs collide only when
//! they target numerically identical points.

use std::fs;
use std::path::{Path, PathBuf};

use fg_store::Provenance;
use fg_types::{
    internal_error, CacheFingerprint, FgResult, FormatSpec, TransientFstatMap,
};

use crate::evaluator::ParamPoint;

/// The frequency-evolution fields entering the side-file name, in order.
const FILENAME_KEYS: [&str; 5] = ["F0", "Alpha", "Delta", "F1", "F2"];

/// Filename for the map of one grid point:
/// `<base><F0>_<Alpha>_<Delta>_<F1>_<F2>.dat`, all at `%.16g`.
pub fn map_filename(base: &Path, point: &ParamPoint) -> FgResult<PathBuf> {
    let fmt = FormatSpec::Sig(16);
    let parts = FILENAME_KEYS
        .iter()
        .map(|key| {
            point
                .get(*key)
                .map(|v| fmt.render(*v))
                .ok_or_else(|| internal_error!("Transient map filename requires the '{key}' field"))
        })
        .collect::<FgResult<Vec<String>>>()?;
    let mut name = base.as_os_str().to_os_string();
    name.push(parts.join("_"));
    name.push(".dat");
    Ok(PathBuf::from(name))
}

/// Write the full (t0, tau) -> 2F surface with the run's provenance header.
///
/// Side files are written incrementally during the run and are therefore
/// not transactional: a crash mid-run can leave some of them behind with no
/// main result file.
pub fn write_map_file(
    path: &Path,
    map: &TransientFstatMap,
    fingerprint: &CacheFingerprint,
    provenance: &Provenance,
) -> FgResult<()> {
    let time_fmt = FormatSpec::Integer;
    let stat_fmt = FormatSpec::Sig(9);

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
    out.push_str("# t0 tau twoF\n");

    let window = &map.window;
    for (i, row) in map.values.iter().enumerate() {
        let t0 = window.t0 + i as f64 * window.dt0;
        for (j, value) in row.iter().enumerate() {
            let tau = window.tau + j as f64 * window.dtau;
            out.push_str(&time_fmt.render(t0));
            out.push(' ');
            out.push_str(&time_fmt.render(tau));
            out.push(' ');
            out.push_str(&stat_fmt.render(*value));
            out.push('\n');
        }
    }

    fs::write(path, out)?;
    Ok(())
}
