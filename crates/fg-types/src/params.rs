//! Parameter axes and the Cartesian-product search grid.

use serde::{Deserialize, Serialize};

use crate::table::InputTable;

/// One dimension of the parameter space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterAxis {
    /// A single held-fixed value.
    Fixed(f64),
    /// An inclusive [min, max] range walked with approximate spacing `step`.
    Range { min: f64, max: f64, step: f64 },
    /// An explicit, ordered list of coordinates used verbatim.
    Values(Vec<f64>),
}

impl ParameterAxis {
    /// Expand the axis into its coordinate array.
    ///
    /// Ranges are expanded as an evenly spaced array from `min` to `max`
    /// inclusive with `round((max-min)/step) + 1` points. A plain
    /// fixed-step walk would be numerically unstable for non-integer steps
    /// and may inconsistently include the endpoint.
    pub fn expand(&self) -> Vec<f64> {
        match self {
            Self::Fixed(value) => vec![*value],
            Self::Range { min, max, step } => {
                let n = ((max - min) / step).round() as usize + 1;
                if n <= 1 {
                    return vec![*min];
                }
                (0..n)
                    .map(|i| min + (max - min) * i as f64 / (n - 1) as f64)
                    .collect()
            }
            Self::Values(values) => {
                tracing::info!("Using explicit array of length {} as is.", values.len());
                values.clone()
            }
        }
    }

    /// Number of grid points this axis contributes.
    pub fn len(&self) -> usize {
        match self {
            Self::Fixed(_) => 1,
            Self::Range { min, max, step } => (((max - min) / step).round() as usize + 1).max(1),
            Self::Values(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named axis within a grid specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisDef {
    pub name: String,
    pub axis: ParameterAxis,
}

/// The full search grid: an ordered list of named parameter axes.
///
/// The product grid is the Cartesian product of the per-axis coordinate
/// arrays, iterated in the fixed axis order given here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub axes: Vec<AxisDef>,
}

impl GridSpec {
    pub fn new() -> Self {
        Self { axes: Vec::new() }
    }

    pub fn add_fixed(mut self, name: impl Into<String>, value: f64) -> Self {
        self.axes.push(AxisDef {
            name: name.into(),
            axis: ParameterAxis::Fixed(value),
        });
        self
    }

    pub fn add_range(mut self, name: impl Into<String>, min: f64, max: f64, step: f64) -> Self {
        self.axes.push(AxisDef {
            name: name.into(),
            axis: ParameterAxis::Range { min, max, step },
        });
        self
    }

    pub fn add_values(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.axes.push(AxisDef {
            name: name.into(),
            axis: ParameterAxis::Values(values),
        });
        self
    }

    /// Ordered parameter names, matching the input table column order.
    pub fn keys(&self) -> Vec<String> {
        self.axes.iter().map(|a| a.name.clone()).collect()
    }

    pub fn axis(&self, name: &str) -> Option<&ParameterAxis> {
        self.axes.iter().find(|a| a.name == name).map(|a| &a.axis)
    }

    /// Total number of points in the product grid, computed before iteration.
    pub fn total_points(&self) -> usize {
        self.axes.iter().map(|a| a.axis.len()).product()
    }

    /// Build the Cartesian-product input table over all axes.
    pub fn build_input_table(&self) -> InputTable {
        tracing::info!("Generating input data array");
        let coord_arrays: Vec<Vec<f64>> = self.axes.iter().map(|a| a.axis.expand()).collect();
        let total = self.total_points();

        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(total);
        rows.push(Vec::new());
        for axis in &coord_arrays {
            let mut next = Vec::with_capacity(rows.len() * axis.len());
            for existing in &rows {
                for value in axis {
                    let mut row = existing.clone();
                    row.push(*value);
                    next.push(row);
                }
            }
            rows = next;
        }

        InputTable {
            keys: self.keys(),
            rows,
        }
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::new()
    }
}
