//! Transient-window types and the per-point (t0, tau) statistic surface.

use serde::{Deserialize, Serialize};

use crate::errors::FgResult;
use crate::internal_error;

/// Time-domain weighting of the signal model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransientWindowType {
    /// Persistent signal; when configured explicitly, still drives the
    /// windowed code path over the full observation span (debug use).
    None,
    /// Constant amplitude within `[t0, t0+tau]`, zero outside.
    Rect,
    /// Exponential decay over `[t0, t0+3*tau]`, zero outside.
    Exp,
}

impl std::fmt::Display for TransientWindowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Rect => write!(f, "rect"),
            Self::Exp => write!(f, "exp"),
        }
    }
}

/// The 2D sub-grid in transient start-time and duration.
///
/// Constructed once per parent search point when transient search is
/// enabled, consumed by the map extension, then discarded (or persisted as
/// a side artifact).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransientWindowRange {
    pub window_type: TransientWindowType,
    /// Start-time grid origin.
    pub t0: f64,
    /// Start-time grid step.
    pub dt0: f64,
    pub n_t0: usize,
    /// Duration grid origin.
    pub tau: f64,
    /// Duration grid step.
    pub dtau: f64,
    pub n_tau: usize,
}

/// The F-statistic surface over the (t0, tau) sub-grid of one search point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransientFstatMap {
    pub window: TransientWindowRange,
    /// `n_t0` rows of `n_tau` 2F values each.
    pub values: Vec<Vec<f64>>,
}

impl TransientFstatMap {
    pub fn new(window: TransientWindowRange, values: Vec<Vec<f64>>) -> FgResult<Self> {
        if values.len() != window.n_t0 || values.iter().any(|row| row.len() != window.n_tau) {
            return Err(internal_error!(
                "Transient map dimensions do not match window range ({}x{})",
                window.n_t0,
                window.n_tau
            ));
        }
        Ok(Self { window, values })
    }

    /// Index (i, j) of the maximizing cell, first in row-major order on ties.
    pub fn max_index(&self) -> (usize, usize) {
        let mut best = (0, 0);
        let mut best_val = f64::NEG_INFINITY;
        for (i, row) in self.values.iter().enumerate() {
            for (j, val) in row.iter().enumerate() {
                if *val > best_val {
                    best_val = *val;
                    best = (i, j);
                }
            }
        }
        best
    }

    pub fn max_value(&self) -> f64 {
        let (i, j) = self.max_index();
        self.values[i][j]
    }

    /// Maximum-likelihood estimates `(t0_ML, tau_ML)` from the maximizing
    /// cell: `t0 + i*dt0`, `tau + j*dtau`.
    pub fn ml_estimate(&self) -> (f64, f64) {
        let (i, j) = self.max_index();
        (
            self.window.t0 + i as f64 * self.window.dt0,
            self.window.tau + j as f64 * self.window.dtau,
        )
    }
}
