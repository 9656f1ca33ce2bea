//! Validated search configuration.
//!
//! All options are carried by an explicit configuration struct; defaults and
//! cross-field validation happen once, at runner construction, never
//! implicitly.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use fg_types::{
    config_error, CacheFingerprint, FgResult, GridSpec, SearchError, TransientWindowType,
};

use crate::strategy::PointStrategy;

/// Transient-window sub-search options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransientConfig {
    pub window_type: TransientWindowType,
    /// Search band for the transient start time, from the observation start.
    pub t0_band: f64,
    /// Search band for the transient duration.
    pub tau_band: f64,
    /// Minimum transient duration to cover.
    pub tau_min: Option<f64>,
    /// Grid resolution in transient start-time.
    pub dt0: f64,
    /// Grid resolution in transient duration.
    pub dtau: f64,
    /// Write one (t0, tau) F-stat map side file per grid point.
    pub output_maps: bool,
    /// Write F-stat atoms incrementally alongside the main output.
    pub output_atoms: bool,
}

impl TransientConfig {
    pub fn new(window_type: TransientWindowType, t0_band: f64, tau_band: f64) -> Self {
        Self {
            window_type,
            t0_band,
            tau_band,
            tau_min: None,
            dt0: 1800.0,
            dtau: 1800.0,
            output_maps: false,
            output_atoms: false,
        }
    }

    pub fn with_resolution(mut self, dt0: f64, dtau: f64) -> Self {
        self.dt0 = dt0;
        self.dtau = dtau;
        self
    }

    pub fn with_tau_min(mut self, tau_min: f64) -> Self {
        self.tau_min = Some(tau_min);
        self
    }

    pub fn with_output_maps(mut self, output_maps: bool) -> Self {
        self.output_maps = output_maps;
        self
    }

    pub fn with_output_atoms(mut self, output_atoms: bool) -> Self {
        self.output_atoms = output_atoms;
        self
    }
}

/// Full configuration for one grid search run.
///
/// The serde rendering of this struct is also the cache fingerprint: any
/// field change invalidates previously written output files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchConfig {
    /// Output filenames are constructed using this label.
    pub label: String,
    pub outdir: PathBuf,
    /// The parameter grid (ignored when `grid_file` is set).
    pub grid: GridSpec,
    /// Externally generated grid to search over verbatim.
    pub grid_file: Option<PathBuf>,
    /// Source data files gating cache staleness.
    pub source_files: Vec<PathBuf>,
    pub detectors: Vec<String>,
    pub t_ref: Option<i64>,
    pub min_start_time: Option<i64>,
    pub max_start_time: Option<i64>,
    /// Number of segments; `nsegs > 1` selects the semi-coherent variant.
    pub nsegs: usize,
    /// Also record per-detector statistics.
    pub single_fstats: bool,
    /// Use the line-robust log10(BSGL) statistic.
    pub bsgl: bool,
    /// Use the transient Bayes factor ln(BtSG) statistic.
    pub btsg: bool,
    /// Use the glitch-model variant (requires a `tglitch` axis).
    pub glitch: bool,
    pub transient: Option<TransientConfig>,
    /// Ignore existing output data and overwrite.
    pub clean: bool,
}

impl GridSearchConfig {
    pub fn new(label: impl Into<String>, outdir: impl Into<PathBuf>, grid: GridSpec) -> Self {
        Self {
            label: label.into(),
            outdir: outdir.into(),
            grid,
            grid_file: None,
            source_files: Vec::new(),
            detectors: Vec::new(),
            t_ref: None,
            min_start_time: None,
            max_start_time: None,
            nsegs: 1,
            single_fstats: false,
            bsgl: false,
            btsg: false,
            glitch: false,
            transient: None,
            clean: false,
        }
    }

    pub fn with_grid_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.grid_file = Some(path.into());
        self
    }

    pub fn with_source_files(mut self, files: Vec<PathBuf>) -> Self {
        self.source_files = files;
        self
    }

    pub fn with_detectors(mut self, detectors: Vec<String>) -> Self {
        self.detectors = detectors;
        self
    }

    pub fn with_times(
        mut self,
        t_ref: Option<i64>,
        min_start_time: Option<i64>,
        max_start_time: Option<i64>,
    ) -> Self {
        self.t_ref = t_ref;
        self.min_start_time = min_start_time;
        self.max_start_time = max_start_time;
        self
    }

    pub fn with_nsegs(mut self, nsegs: usize) -> Self {
        self.nsegs = nsegs;
        self
    }

    pub fn with_single_fstats(mut self, single_fstats: bool) -> Self {
        self.single_fstats = single_fstats;
        self
    }

    pub fn with_bsgl(mut self, bsgl: bool) -> Self {
        self.bsgl = bsgl;
        self
    }

    pub fn with_btsg(mut self, btsg: bool) -> Self {
        self.btsg = btsg;
        self
    }

    pub fn with_glitch(mut self, glitch: bool) -> Self {
        self.glitch = glitch;
        self
    }

    pub fn with_transient(mut self, transient: TransientConfig) -> Self {
        self.transient = Some(transient);
        self
    }

    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Cross-field validation, run once at runner construction.
    pub fn validate(&self) -> FgResult<()> {
        if self.label.is_empty() {
            return Err(config_error!("label must not be empty"));
        }
        if self.nsegs == 0 {
            return Err(config_error!("nsegs must be at least 1"));
        }
        if self.bsgl && self.btsg {
            return Err(SearchError::IncompatibleStatistics {
                first: "BSGL".to_string(),
                second: "BtSG".to_string(),
            }
            .into());
        }
        if self.btsg && self.transient.is_none() {
            return Err(config_error!(
                "BtSG is a transient statistic and requires transient window options"
            ));
        }
        if self.nsegs > 1 && self.transient.is_some() {
            return Err(config_error!(
                "nsegs={} is incompatible with transient options",
                self.nsegs
            ));
        }
        if self.glitch {
            if self.transient.is_some() {
                return Err(config_error!(
                    "the glitch-model variant is incompatible with transient options"
                ));
            }
            if self.bsgl || self.btsg {
                return Err(config_error!(
                    "the glitch-model variant only supports the twoF statistic"
                ));
            }
            if self.grid_file.is_some() {
                return Err(config_error!(
                    "the glitch-model variant does not support external grid files"
                ));
            }
            if self.grid.axis("tglitch").is_none() {
                return Err(SearchError::MissingAxis {
                    name: "tglitch".to_string(),
                }
                .into());
            }
        }
        if self.grid_file.is_none() && self.grid.axes.is_empty() {
            return Err(config_error!("no grid axes and no grid file specified"));
        }
        Ok(())
    }

    /// The per-row evaluation strategy selected by this configuration.
    pub fn strategy(&self) -> PointStrategy {
        if self.glitch {
            PointStrategy::Glitch
        } else if self.transient.is_some() {
            PointStrategy::Transient
        } else if self.nsegs > 1 {
            PointStrategy::SemiCoherent { nsegs: self.nsegs }
        } else {
            PointStrategy::Plain
        }
    }

    /// Name of the primary detection statistic for this run.
    pub fn detection_statistic(&self) -> &'static str {
        if self.bsgl {
            "log10BSGL"
        } else if self.btsg {
            "lnBtSG"
        } else if self.transient.is_some() {
            "maxTwoF"
        } else {
            "twoF"
        }
    }

    /// Search kind tag used in the output filename.
    pub fn search_kind(&self) -> &'static str {
        if self.grid_file.is_some() {
            "SearchOverGridFile"
        } else if self.glitch {
            "GridGlitchSearch"
        } else if self.transient.is_some() {
            "TransientGridSearch"
        } else {
            "GridSearch"
        }
    }

    /// Path of the main output file:
    /// `<outdir>/<label>_<detectors>_<kind>[_<extra>].txt`.
    pub fn out_file(&self, extra_label: Option<&str>) -> PathBuf {
        let dets = if self.detectors.is_empty() {
            "NA".to_string()
        } else {
            self.detectors.join("")
        };
        let name = match extra_label {
            Some(extra) => format!("{}_{}_{}_{}.txt", self.label, dets, self.search_kind(), extra),
            None => format!("{}_{}_{}.txt", self.label, dets, self.search_kind()),
        };
        self.outdir.join(name)
    }

    /// Base path for per-point transient map side files.
    pub fn transient_map_basename(&self) -> PathBuf {
        let out = self.out_file(None);
        let stem = out
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.label);
        self.outdir.join(format!("{stem}_tCW_"))
    }

    pub fn fingerprint(&self) -> FgResult<CacheFingerprint> {
        CacheFingerprint::from_config(self)
    }
}
