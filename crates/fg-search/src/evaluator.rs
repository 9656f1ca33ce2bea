//! The detection-statistic evaluator boundary.
//!
//! The evaluator itself is an external collaborator: an opaque function
//! mapping a named parameter point to a scalar statistic plus optional
//! by-products. The executor only sees these traits.

use std::collections::HashMap;

use fg_types::{FgResult, SearchError, TransientFstatMap};

/// A fully specified combination of search parameters, keyed by name.
pub type ParamPoint = HashMap<String, f64>;

/// Transient by-products of one evaluation.
#[derive(Debug, Clone)]
pub struct TransientEvaluation {
    /// The (t0, tau) F-statistic surface for this point.
    pub map: TransientFstatMap,
    /// Maximum-a-posteriori `(t0_MP, tau_MP)` estimate, present when the
    /// Bayes-factor statistic is computed.
    pub max_posterior: Option<(f64, f64)>,
}

/// Everything an evaluator reports for one grid point.
#[derive(Debug, Clone)]
pub struct PointEvaluation {
    /// The primary detection statistic for the configured kind.
    pub detstat: f64,
    /// The (possibly semi-coherent) 2F value.
    pub two_f: f64,
    /// Per-detector 2F values, ordered like `detector_names()`.
    pub single_fstats: Option<Vec<f64>>,
    pub transient: Option<TransientEvaluation>,
    /// F-stat atoms for side-file dumping, when enabled.
    pub atoms: Option<Vec<f64>>,
}

impl PointEvaluation {
    pub fn new(two_f: f64) -> Self {
        Self {
            detstat: two_f,
            two_f,
            single_fstats: None,
            transient: None,
            atoms: None,
        }
    }

    pub fn with_detstat(mut self, detstat: f64) -> Self {
        self.detstat = detstat;
        self
    }

    pub fn with_single_fstats(mut self, single_fstats: Vec<f64>) -> Self {
        self.single_fstats = Some(single_fstats);
        self
    }

    pub fn with_transient(mut self, transient: TransientEvaluation) -> Self {
        self.transient = Some(transient);
        self
    }

    pub fn with_atoms(mut self, atoms: Vec<f64>) -> Self {
        self.atoms = Some(atoms);
        self
    }
}

/// An opaque per-point detection-statistic evaluator.
///
/// Every call may be long-running; the executor issues calls strictly one
/// at a time, in input-table order, and never catches or retries evaluator
/// failures.
pub trait DetectionStatEvaluator {
    fn evaluate(&mut self, point: &ParamPoint) -> FgResult<PointEvaluation>;

    fn detector_names(&self) -> &[String];
}

/// Legacy evaluator interface of the glitch-model variant, invoked
/// positionally rather than by named point.
pub trait GlitchEvaluator {
    fn evaluate_positional(&mut self, values: &[f64]) -> FgResult<PointEvaluation>;

    fn detector_names(&self) -> &[String];
}

/// Adapter normalizing a [`GlitchEvaluator`] onto the named-point calling
/// convention, so the positional path never leaks into the generic executor.
pub struct GlitchAdapter<E> {
    inner: E,
    keys: Vec<String>,
}

impl<E: GlitchEvaluator> GlitchAdapter<E> {
    /// `keys` fixes the positional argument order.
    pub fn new(inner: E, keys: Vec<String>) -> Self {
        Self { inner, keys }
    }
}

impl<E: GlitchEvaluator> DetectionStatEvaluator for GlitchAdapter<E> {
    fn evaluate(&mut self, point: &ParamPoint) -> FgResult<PointEvaluation> {
        let values = self
            .keys
            .iter()
            .map(|key| {
                point.get(key).copied().ok_or_else(|| {
                    SearchError::SchemaMismatch {
                        column: key.clone(),
                    }
                    .into()
                })
            })
            .collect::<FgResult<Vec<f64>>>()?;
        self.inner.evaluate_positional(&values)
    }

    fn detector_names(&self) -> &[String] {
        self.inner.detector_names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingGlitchEvaluator {
        detectors: Vec<String>,
        last_call: Vec<f64>,
    }

    impl GlitchEvaluator for RecordingGlitchEvaluator {
        fn evaluate_positional(&mut self, values: &[f64]) -> FgResult<PointEvaluation> {
            self.last_call = values.to_vec();
            Ok(PointEvaluation::new(values.iter().sum()))
        }

        fn detector_names(&self) -> &[String] {
            &self.detectors
        }
    }

    #[test]
    fn adapter_orders_positional_arguments_by_key() {
        let mut adapter = GlitchAdapter::new(
            RecordingGlitchEvaluator {
                detectors: vec!["H1".to_string()],
                last_call: Vec::new(),
            },
            vec!["F0".to_string(), "tglitch".to_string(), "delta_F0".to_string()],
        );
        let mut point = ParamPoint::new();
        point.insert("delta_F0".to_string(), 3.0);
        point.insert("F0".to_string(), 1.0);
        point.insert("tglitch".to_string(), 2.0);

        let eval = adapter.evaluate(&point).unwrap();
        assert_eq!(adapter.inner.last_call, vec![1.0, 2.0, 3.0]);
        assert_eq!(eval.two_f, 6.0);
    }

    #[test]
    fn adapter_rejects_missing_key() {
        let mut adapter = GlitchAdapter::new(
            RecordingGlitchEvaluator {
                detectors: Vec::new(),
                last_call: Vec::new(),
            },
            vec!["F0".to_string(), "tglitch".to_string()],
        );
        let mut point = ParamPoint::new();
        point.insert("F0".to_string(), 1.0);
        assert!(adapter.evaluate(&point).is_err());
    }

    #[test]
    fn point_evaluation_builders() {
        let eval = PointEvaluation::new(4.0)
            .with_detstat(1.5)
            .with_single_fstats(vec![2.0, 2.5]);
        assert_eq!(eval.two_f, 4.0);
        assert_eq!(eval.detstat, 1.5);
        assert_eq!(eval.single_fstats, Some(vec![2.0, 2.5]));
    }
}
