//! # fg-search
//!
//! Grid search execution for fstat-grid.
//!
//! Provides the search configuration surface, the point strategies (fully
//! coherent, semi-coherent, transient, glitch), the evaluator boundary the
//! detection-statistic backend plugs into, and the runner that drives the
//! sweep with output caching.

mod config;
mod evaluator;
mod resource;
mod runner;
mod strategy;
pub mod transient;

pub use config::{GridSearchConfig, TransientConfig};
pub use evaluator::{
    DetectionStatEvaluator, GlitchAdapter, GlitchEvaluator, ParamPoint, PointEvaluation,
    TransientEvaluation,
};
pub use resource::DeviceLease;
pub use runner::GridSearchRunner;
pub use strategy::PointStrategy;
