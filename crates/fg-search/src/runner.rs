//! The grid search runner: shared iteration, caching and serialization
//! scaffolding for all point strategies.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fg_store::{check_cache, load_grid_file, save_table, Provenance};
use fg_types::{CacheFingerprint, FgResult, InputTable, OutputSchema, ResultTable};

use crate::config::GridSearchConfig;
use crate::evaluator::{DetectionStatEvaluator, ParamPoint};
use crate::strategy::PointStrategy;
use crate::transient;

/// Executes a search over the full parameter grid.
///
/// Iteration is strictly sequential and in input-table order, which the
/// cache round-trip relies on. The main output file is written once, at the
/// end; only per-point side artifacts (transient maps, atom dumps) are
/// written incrementally.
pub struct GridSearchRunner {
    config: GridSearchConfig,
    strategy: PointStrategy,
    search_keys: Vec<String>,
    input: InputTable,
    schema: OutputSchema,
    fingerprint: CacheFingerprint,
    evaluator: Box<dyn DetectionStatEvaluator>,
    out_file: PathBuf,
    provenance: Provenance,
    data: Option<ResultTable>,
}

impl GridSearchRunner {
    /// Validate the configuration and precompute the input table, output
    /// schema and fingerprint. Construction fails on any configuration
    /// error; nothing is evaluated yet.
    pub fn new(
        config: GridSearchConfig,
        evaluator: Box<dyn DetectionStatEvaluator>,
    ) -> FgResult<Self> {
        config.validate()?;
        fs::create_dir_all(&config.outdir)?;
        tracing::info!(
            "Detection statistic set to {}.",
            config.detection_statistic()
        );

        let input = match &config.grid_file {
            Some(path) => {
                let grid = load_grid_file(path)?;
                tracing::info!("Search ranges span: {:?}", grid.search_ranges());
                grid.table
            }
            None => config.grid.build_input_table(),
        };
        let search_keys = input.keys.clone();
        let strategy = config.strategy();
        let schema = strategy.output_schema(&config, &search_keys, evaluator.detector_names())?;
        let fingerprint = config.fingerprint()?;
        let out_file = config.out_file(None);
        if config
            .transient
            .as_ref()
            .is_some_and(|t| t.output_maps)
        {
            tracing::info!(
                "Will save per-point F-stat map results to {}*.dat",
                config.transient_map_basename().display()
            );
        }

        Ok(Self {
            config,
            strategy,
            search_keys,
            input,
            schema,
            fingerprint,
            evaluator,
            out_file,
            provenance: Provenance::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            data: None,
        })
    }

    /// Execute the search over the full grid.
    ///
    /// If a previous output file passes cache validation, its table is
    /// adopted with zero evaluator calls and the run is complete. Any
    /// evaluator failure aborts the whole run: the output schema assumes a
    /// fully populated table, so M of N points is not a usable result.
    pub fn run(&mut self) -> FgResult<()> {
        if let Some(old_data) = check_cache(
            &self.out_file,
            &self.fingerprint,
            &self.input,
            &self.schema,
            &self.config.source_files,
            self.config.clean,
        )? {
            self.data = Some(old_data);
            return Ok(());
        }

        let total = self.input.len();
        tracing::info!("Running search over a total of {total} grid points...");
        let progress_interval = (total / 20).max(1);
        let detector_names: Vec<String> = self.evaluator.detector_names().to_vec();
        let map_basename = self.config.transient_map_basename();
        let mut atoms_file = self.open_atoms_file()?;

        let mut table = ResultTable::new(self.schema.columns());
        let mut map_time = Duration::ZERO;

        for (n, values) in self.input.rows.iter().enumerate() {
            if n % progress_interval == 0 {
                tracing::info!("Grid point {}/{total}", n + 1);
            }
            let point: ParamPoint = self
                .search_keys
                .iter()
                .cloned()
                .zip(values.iter().copied())
                .collect();

            let started = Instant::now();
            let eval = self.evaluator.evaluate(&point)?;
            if self.strategy.is_transient() {
                map_time += started.elapsed();
            }

            let row = self.strategy.populate_row(
                &self.config,
                &self.search_keys,
                &detector_names,
                &self.schema,
                values,
                &eval,
            )?;
            table.rows.push(row);

            if let (Some(transient_config), Some(transient_eval)) =
                (&self.config.transient, eval.transient.as_ref())
            {
                if transient_config.output_maps {
                    let path = transient::map_filename(&map_basename, &point)?;
                    transient::write_map_file(
                        &path,
                        &transient_eval.map,
                        &self.fingerprint,
                        &self.provenance,
                    )?;
                }
            }
            if let (Some(file), Some(atoms)) = (atoms_file.as_mut(), eval.atoms.as_ref()) {
                write_atoms_row(file, atoms)?;
            }
        }

        if self.strategy.is_transient() {
            tracing::info!(
                "Total time spent computing transient F-stat maps: {:.2}s",
                map_time.as_secs_f64()
            );
        }

        save_table(
            &self.out_file,
            &table,
            &self.schema,
            &self.fingerprint,
            &self.provenance,
        )?;
        self.data = Some(table);
        Ok(())
    }

    /// The inputs+outputs table of the completed run.
    pub fn table(&self) -> Option<&ResultTable> {
        self.data.as_ref()
    }

    pub fn out_file(&self) -> &Path {
        &self.out_file
    }

    pub fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    pub fn input(&self) -> &InputTable {
        &self.input
    }

    /// Parameters and statistics at the maximum of the primary detection
    /// statistic; the first maximizing point in iteration order on ties.
    /// Requires `run()` to have completed.
    pub fn max_point(&self) -> FgResult<Option<HashMap<String, f64>>> {
        match &self.data {
            Some(table) => Ok(table
                .max_over(self.config.detection_statistic())?
                .map(|(_, point)| point)),
            None => Ok(None),
        }
    }

    /// Log the maximum detection-statistic point.
    pub fn log_max_point(&self) -> FgResult<()> {
        if let Some(point) = self.max_point()? {
            tracing::info!(
                "Grid point with max({}) for {}:",
                self.config.detection_statistic(),
                self.config.label
            );
            let mut entries: Vec<_> = point.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (key, value) in entries {
                tracing::info!("  {key}={value}");
            }
        }
        Ok(())
    }

    fn open_atoms_file(&self) -> FgResult<Option<fs::File>> {
        let wants_atoms = self
            .config
            .transient
            .as_ref()
            .is_some_and(|t| t.output_atoms);
        if !wants_atoms {
            return Ok(None);
        }
        let stem = self
            .out_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.config.label);
        let path = self.config.outdir.join(format!("{stem}_Fstatatoms.dat"));
        let mut file = fs::File::create(&path)?;
        for line in self.provenance.header_lines() {
            writeln!(file, "# {line}")?;
        }
        Ok(Some(file))
    }
}

fn write_atoms_row(file: &mut fs::File, atoms: &[f64]) -> FgResult<()> {
    let rendered: Vec<String> = atoms
        .iter()
        .map(|v| fg_types::FormatSpec::Sig(9).render(*v))
        .collect();
    writeln!(file, "{}", rendered.join(" "))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransientConfig;
    use crate::evaluator::{PointEvaluation, TransientEvaluation};
    use fg_types::{
        GridSpec, TransientFstatMap, TransientWindowRange, TransientWindowType,
    };
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::tempdir;

    fn init_logs() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("info")
            .with_test_writer()
            .try_init();
    }

    /// An evaluator returning a fixed statistic and counting its calls.
    struct ConstantEvaluator {
        statistic: f64,
        detectors: Vec<String>,
        calls: Rc<Cell<usize>>,
    }

    impl ConstantEvaluator {
        fn new(statistic: f64) -> (Self, Rc<Cell<usize>>) {
            let calls = Rc::new(Cell::new(0));
            (
                Self {
                    statistic,
                    detectors: vec!["H1".to_string()],
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl DetectionStatEvaluator for ConstantEvaluator {
        fn evaluate(&mut self, _point: &ParamPoint) -> FgResult<PointEvaluation> {
            self.calls.set(self.calls.get() + 1);
            Ok(PointEvaluation::new(self.statistic))
        }

        fn detector_names(&self) -> &[String] {
            &self.detectors
        }
    }

    fn sample_config(outdir: &Path) -> GridSearchConfig {
        let grid = GridSpec::new()
            .add_range("F0", 10.0, 10.002, 0.001)
            .add_values("Alpha", vec![0.5]);
        GridSearchConfig::new("test", outdir, grid).with_detectors(vec!["H1".to_string()])
    }

    #[test]
    fn end_to_end_grid_run_and_cache_hit() {
        init_logs();
        let dir = tempdir().unwrap();
        let config = sample_config(dir.path());

        let (evaluator, calls) = ConstantEvaluator::new(1.0);
        let mut runner = GridSearchRunner::new(config.clone(), Box::new(evaluator)).unwrap();
        runner.run().unwrap();

        assert_eq!(calls.get(), 3);
        let table = runner.table().unwrap().clone();
        assert_eq!(table.len(), 3);
        assert_eq!(table.columns, vec!["F0", "Alpha", "twoF"]);
        let f0s = table.column("F0").unwrap();
        assert!((f0s[0] - 10.0).abs() < 1e-12);
        assert!((f0s[1] - 10.001).abs() < 1e-12);
        assert!((f0s[2] - 10.002).abs() < 1e-12);
        assert!(table.column("twoF").unwrap().iter().all(|&v| v == 1.0));
        assert!(runner.out_file().is_file());

        // Second run with the same setup: full cache hit, zero evaluator
        // calls, identical table.
        let (evaluator, second_calls) = ConstantEvaluator::new(1.0);
        let mut rerun = GridSearchRunner::new(config, Box::new(evaluator)).unwrap();
        rerun.run().unwrap();
        assert_eq!(second_calls.get(), 0);
        let cached = rerun.table().unwrap();
        assert_eq!(cached.columns, table.columns);
        assert_eq!(cached.len(), table.len());
        for (a, b) in cached.rows.iter().zip(table.rows.iter()) {
            for (x, y) in a.iter().zip(b.iter()) {
                assert!((x - y).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn clean_run_ignores_existing_output() {
        let dir = tempdir().unwrap();
        let config = sample_config(dir.path());

        let (evaluator, _) = ConstantEvaluator::new(1.0);
        let mut runner = GridSearchRunner::new(config.clone(), Box::new(evaluator)).unwrap();
        runner.run().unwrap();

        let (evaluator, calls) = ConstantEvaluator::new(1.0);
        let mut rerun =
            GridSearchRunner::new(config.with_clean(true), Box::new(evaluator)).unwrap();
        rerun.run().unwrap();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn changed_grid_defeats_cache() {
        let dir = tempdir().unwrap();
        let config = sample_config(dir.path());
        let (evaluator, _) = ConstantEvaluator::new(1.0);
        let mut runner = GridSearchRunner::new(config, Box::new(evaluator)).unwrap();
        runner.run().unwrap();

        let grid = GridSpec::new()
            .add_range("F0", 10.0, 10.002, 0.001)
            .add_values("Alpha", vec![0.6]);
        let changed = GridSearchConfig::new("test", dir.path(), grid)
            .with_detectors(vec!["H1".to_string()]);
        let (evaluator, calls) = ConstantEvaluator::new(1.0);
        let mut rerun = GridSearchRunner::new(changed, Box::new(evaluator)).unwrap();
        rerun.run().unwrap();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn max_point_returns_first_maximizer() {
        // An evaluator with a tie: points 1 and 2 share the maximum.
        struct TiedEvaluator {
            n: usize,
            detectors: Vec<String>,
        }
        impl DetectionStatEvaluator for TiedEvaluator {
            fn evaluate(&mut self, _point: &ParamPoint) -> FgResult<PointEvaluation> {
                let stat = [1.0, 8.0, 8.0][self.n.min(2)];
                self.n += 1;
                Ok(PointEvaluation::new(stat))
            }
            fn detector_names(&self) -> &[String] {
                &self.detectors
            }
        }

        let dir = tempdir().unwrap();
        let config = sample_config(dir.path());
        let mut runner = GridSearchRunner::new(
            config,
            Box::new(TiedEvaluator {
                n: 0,
                detectors: vec!["H1".to_string()],
            }),
        )
        .unwrap();
        runner.run().unwrap();
        let max = runner.max_point().unwrap().unwrap();
        assert_eq!(max["twoF"], 8.0);
        assert!((max["F0"] - 10.001).abs() < 1e-12);
        runner.log_max_point().unwrap();
    }

    #[test]
    fn evaluator_failure_aborts_without_output() {
        struct FailingEvaluator {
            detectors: Vec<String>,
        }
        impl DetectionStatEvaluator for FailingEvaluator {
            fn evaluate(&mut self, _point: &ParamPoint) -> FgResult<PointEvaluation> {
                Err(fg_types::SearchError::EvaluatorFailed {
                    message: "no data".to_string(),
                }
                .into())
            }
            fn detector_names(&self) -> &[String] {
                &self.detectors
            }
        }

        let dir = tempdir().unwrap();
        let config = sample_config(dir.path());
        let mut runner = GridSearchRunner::new(
            config,
            Box::new(FailingEvaluator {
                detectors: Vec::new(),
            }),
        )
        .unwrap();
        assert!(runner.run().is_err());
        assert!(!runner.out_file().exists());
        assert!(runner.table().is_none());
    }

    /// Transient evaluator with a known surface peaked at (i=2, j=1).
    struct TransientEvaluatorStub {
        detectors: Vec<String>,
    }

    impl DetectionStatEvaluator for TransientEvaluatorStub {
        fn evaluate(&mut self, _point: &ParamPoint) -> FgResult<PointEvaluation> {
            let window = TransientWindowRange {
                window_type: TransientWindowType::Rect,
                t0: 1000000000.0,
                dt0: 1800.0,
                n_t0: 3,
                tau: 3600.0,
                dtau: 1800.0,
                n_tau: 2,
            };
            let map = TransientFstatMap::new(
                window,
                vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 42.0]],
            )?;
            Ok(PointEvaluation::new(4.0).with_transient(TransientEvaluation {
                map,
                max_posterior: None,
            }))
        }

        fn detector_names(&self) -> &[String] {
            &self.detectors
        }
    }

    #[test]
    fn transient_run_emits_ml_columns_and_side_files() {
        let dir = tempdir().unwrap();
        let grid = GridSpec::new()
            .add_values("F0", vec![30.0])
            .add_fixed("Alpha", 1.2)
            .add_fixed("Delta", -0.5)
            .add_fixed("F1", 0.0)
            .add_fixed("F2", 0.0);
        let config = GridSearchConfig::new("trans", dir.path(), grid).with_transient(
            TransientConfig::new(TransientWindowType::Rect, 86400.0, 86400.0)
                .with_output_maps(true),
        );

        let mut runner = GridSearchRunner::new(
            config,
            Box::new(TransientEvaluatorStub {
                detectors: vec!["H1".to_string()],
            }),
        )
        .unwrap();
        runner.run().unwrap();

        let table = runner.table().unwrap();
        assert_eq!(
            table.columns,
            vec!["F0", "Alpha", "Delta", "F1", "F2", "twoF", "maxTwoF", "t0_ML", "tau_ML"]
        );
        assert_eq!(table.value(0, "maxTwoF").unwrap(), 42.0);
        assert_eq!(table.value(0, "t0_ML").unwrap(), 1000003600.0);
        assert_eq!(table.value(0, "tau_ML").unwrap(), 5400.0);

        let side_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.contains("_tCW_") && name.ends_with(".dat"))
            .collect();
        assert_eq!(side_files.len(), 1);
        assert!(side_files[0].starts_with("trans_NA_TransientGridSearch_tCW_30"));
    }

    #[test]
    fn grid_file_mode_uses_loaded_table() {
        let dir = tempdir().unwrap();
        let grid_path = dir.path().join("grid.txt");
        fs::write(
            &grid_path,
            "%% freq alpha delta\n30.0 1.2 -0.5\n30.1 1.2 -0.5\n30.2 1.2 -0.5\n",
        )
        .unwrap();

        let config = GridSearchConfig::new("ext", dir.path(), GridSpec::new())
            .with_grid_file(&grid_path);
        let (evaluator, calls) = ConstantEvaluator::new(2.5);
        let mut runner = GridSearchRunner::new(config, Box::new(evaluator)).unwrap();
        runner.run().unwrap();

        assert_eq!(calls.get(), 3);
        let table = runner.table().unwrap();
        assert_eq!(table.columns, vec!["F0", "Alpha", "Delta", "twoF"]);
        assert_eq!(table.len(), 3);
        assert!(runner
            .out_file()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .contains("SearchOverGridFile"));
    }
}
