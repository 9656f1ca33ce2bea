//! Named-column row tables for grid inputs and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::{DataError, FgResult};

/// The ordered sequence of search points, one per grid combination.
///
/// Column order and names are stable and match the grid specification (or
/// the translated header of a loaded grid file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputTable {
    pub keys: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl InputTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == name)
    }

    pub fn column(&self, name: &str) -> FgResult<Vec<f64>> {
        let idx = self.column_index(name).ok_or(DataError::MissingColumn {
            column: name.to_string(),
        })?;
        Ok(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Per-column (min, max) over the table, in key order.
    pub fn ranges(&self) -> Vec<(String, (f64, f64))> {
        self.keys
            .iter()
            .enumerate()
            .map(|(idx, key)| {
                let mut min = f64::INFINITY;
                let mut max = f64::NEG_INFINITY;
                for row in &self.rows {
                    min = min.min(row[idx]);
                    max = max.max(row[idx]);
                }
                (key.clone(), (min, max))
            })
            .collect()
    }
}

/// The inputs+outputs result table, one row per input point, same ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl ResultTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> FgResult<Vec<f64>> {
        let idx = self.column_index(name).ok_or(DataError::MissingColumn {
            column: name.to_string(),
        })?;
        Ok(self.rows.iter().map(|row| row[idx]).collect())
    }

    pub fn value(&self, row: usize, name: &str) -> FgResult<f64> {
        let idx = self.column_index(name).ok_or(DataError::MissingColumn {
            column: name.to_string(),
        })?;
        Ok(self.rows[row][idx])
    }

    /// Row index and full named row at the maximum of `statistic`.
    ///
    /// Returns the first maximizing row in iteration order on ties, or
    /// `None` for an empty table.
    pub fn max_over(&self, statistic: &str) -> FgResult<Option<(usize, HashMap<String, f64>)>> {
        let idx = self
            .column_index(statistic)
            .ok_or(DataError::MissingColumn {
                column: statistic.to_string(),
            })?;
        if self.rows.is_empty() {
            return Ok(None);
        }
        let mut best = 0;
        for (n, row) in self.rows.iter().enumerate().skip(1) {
            if row[idx] > self.rows[best][idx] {
                best = n;
            }
        }
        let named = self
            .columns
            .iter()
            .cloned()
            .zip(self.rows[best].iter().copied())
            .collect();
        Ok(Some((best, named)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ResultTable {
        ResultTable {
            columns: vec!["F0".to_string(), "twoF".to_string()],
            rows: vec![
                vec![10.0, 4.0],
                vec![10.001, 7.5],
                vec![10.002, 7.5],
                vec![10.003, 2.0],
            ],
        }
    }

    #[test]
    fn max_over_returns_first_maximizer_on_ties() {
        let table = sample_table();
        let (idx, point) = table.max_over("twoF").unwrap().unwrap();
        assert_eq!(idx, 1);
        assert_eq!(point["F0"], 10.001);
        assert_eq!(point["twoF"], 7.5);
    }

    #[test]
    fn max_over_unknown_column_is_an_error() {
        let table = sample_table();
        assert!(table.max_over("log10BSGL").is_err());
    }

    #[test]
    fn input_table_ranges() {
        let table = InputTable {
            keys: vec!["F0".to_string(), "Alpha".to_string()],
            rows: vec![vec![10.0, 0.5], vec![10.5, 0.5], vec![10.2, 0.5]],
        };
        let ranges = table.ranges();
        assert_eq!(ranges[0], ("F0".to_string(), (10.0, 10.5)));
        assert_eq!(ranges[1], ("Alpha".to_string(), (0.5, 0.5)));
    }

    #[test]
    fn column_extraction() {
        let table = sample_table();
        assert_eq!(table.column("twoF").unwrap(), vec![4.0, 7.5, 7.5, 2.0]);
        assert!(table.column("missing").is_err());
    }
}
