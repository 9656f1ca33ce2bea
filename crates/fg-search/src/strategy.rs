//! Per-row evaluation strategies.
//!
//! A small closed set of variants shares the iteration/caching/
//! serialization scaffolding; strategies only decide the output column set
//! and how one evaluation is merged into one row.

use std::collections::HashMap;

use fg_types::{
    internal_error, FgResult, OutputSchema, SearchError, DETSTAT_FORMAT, DOPPLER_FORMAT,
    INTEGER_FORMAT,
};

use crate::config::GridSearchConfig;
use crate::evaluator::PointEvaluation;

/// The per-point evaluation variant, selected at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointStrategy {
    /// Statistic = evaluator's scalar result.
    Plain,
    /// The evaluator encapsulates multi-segment combination; the executor
    /// only knows the segment count from construction-time wiring.
    SemiCoherent { nsegs: usize },
    /// Adds the (t0, tau) sub-search columns per point.
    Transient,
    /// Glitch-model axes; the legacy positional calling convention is
    /// handled by the evaluator adapter, not here.
    Glitch,
}

impl PointStrategy {
    /// Compute the full output column list with per-column formats.
    ///
    /// Called once before execution begins; the resulting schema is
    /// immutable for the whole run.
    pub fn output_schema(
        &self,
        config: &GridSearchConfig,
        search_keys: &[String],
        detector_names: &[String],
    ) -> FgResult<OutputSchema> {
        let mut schema = OutputSchema::new();
        for key in search_keys {
            let fmt = if key == "tglitch" {
                INTEGER_FORMAT
            } else {
                DOPPLER_FORMAT
            };
            schema.push(key.clone(), fmt)?;
        }
        schema.push("twoF", DETSTAT_FORMAT)?;
        if config.single_fstats {
            for ifo in detector_names {
                schema.push(format!("twoF{ifo}"), DETSTAT_FORMAT)?;
            }
        }
        match self {
            Self::Plain | Self::SemiCoherent { .. } => {
                if config.bsgl {
                    schema.push("log10BSGL", DETSTAT_FORMAT)?;
                }
            }
            Self::Glitch => {}
            Self::Transient => {
                schema.push("maxTwoF", DETSTAT_FORMAT)?;
                if config.bsgl {
                    schema.push("log10BSGL", DETSTAT_FORMAT)?;
                } else if config.btsg {
                    schema.push("lnBtSG", DETSTAT_FORMAT)?;
                }
                // For consistency, t0/tau come after the detection
                // statistic; the main grid does not loop over them.
                schema.push("t0_ML", INTEGER_FORMAT)?;
                schema.push("tau_ML", INTEGER_FORMAT)?;
                if config.btsg {
                    schema.push("t0_MP", INTEGER_FORMAT)?;
                    schema.push("tau_MP", INTEGER_FORMAT)?;
                }
            }
        }
        Ok(schema)
    }

    /// Merge one evaluation into one output row, ordered by `schema`.
    ///
    /// A declared output column that cannot be populated from the
    /// evaluation is an internal schema/evaluator mismatch and fails the
    /// run.
    pub fn populate_row(
        &self,
        config: &GridSearchConfig,
        search_keys: &[String],
        detector_names: &[String],
        schema: &OutputSchema,
        values: &[f64],
        eval: &PointEvaluation,
    ) -> FgResult<Vec<f64>> {
        let mut candidate: HashMap<String, f64> = search_keys
            .iter()
            .cloned()
            .zip(values.iter().copied())
            .collect();
        candidate.insert("twoF".to_string(), eval.two_f);

        if config.single_fstats {
            let single = eval.single_fstats.as_ref().ok_or_else(|| {
                internal_error!("Per-detector statistics requested but not returned by evaluator")
            })?;
            if single.len() != detector_names.len() {
                return Err(internal_error!(
                    "Evaluator returned {} per-detector statistics for {} detectors",
                    single.len(),
                    detector_names.len()
                ));
            }
            for (ifo, value) in detector_names.iter().zip(single.iter()) {
                candidate.insert(format!("twoF{ifo}"), *value);
            }
        }

        match self {
            Self::Plain | Self::SemiCoherent { .. } => {
                if config.bsgl {
                    candidate.insert("log10BSGL".to_string(), eval.detstat);
                }
            }
            Self::Glitch => {}
            Self::Transient => {
                let transient = eval.transient.as_ref().ok_or_else(|| {
                    internal_error!(
                        "Since a transient window is configured, we expected an F-stat map"
                    )
                })?;
                candidate.insert("maxTwoF".to_string(), transient.map.max_value());
                if config.bsgl {
                    candidate.insert("log10BSGL".to_string(), eval.detstat);
                } else if config.btsg {
                    candidate.insert("lnBtSG".to_string(), eval.detstat);
                }
                let (t0_ml, tau_ml) = transient.map.ml_estimate();
                candidate.insert("t0_ML".to_string(), t0_ml);
                candidate.insert("tau_ML".to_string(), tau_ml);
                if config.btsg {
                    let (t0_mp, tau_mp) = transient.max_posterior.ok_or_else(|| {
                        internal_error!(
                            "BtSG requested but evaluator returned no maximum-posterior estimate"
                        )
                    })?;
                    candidate.insert("t0_MP".to_string(), t0_mp);
                    candidate.insert("tau_MP".to_string(), tau_mp);
                }
            }
        }

        schema
            .iter()
            .map(|(column, _)| {
                candidate
                    .get(column)
                    .copied()
                    .ok_or_else(|| {
                        SearchError::SchemaMismatch {
                            column: column.clone(),
                        }
                        .into()
                    })
            })
            .collect()
    }

    /// Whether this strategy expects transient by-products per point.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient)
    }
}
