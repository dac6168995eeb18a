//! Dense feature matrix with named columns
//!
//! The elimination loop and the estimators work on a row-major view of the
//! numeric features. Values live in a faer `Mat<f64>`; missing cells are `NaN`.

use std::collections::HashSet;

use faer::Mat;
use polars::prelude::*;

use crate::error::{Result, RfeError};

/// Named numeric feature matrix (rows = samples, columns = features)
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    names: Vec<String>,
    values: Mat<f64>,
}

impl FeatureMatrix {
    /// Wrap an existing matrix. Column names must be unique and match the column count.
    pub fn new(names: Vec<String>, values: Mat<f64>) -> Result<Self> {
        if names.len() != values.ncols() {
            return Err(RfeError::InvalidInput(format!(
                "{} feature names given for a matrix with {} columns",
                names.len(),
                values.ncols()
            )));
        }

        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(RfeError::InvalidInput(format!(
                    "Duplicate feature name '{}'",
                    name
                )));
            }
        }

        Ok(Self { names, values })
    }

    /// Build from literal rows, mostly useful for small fixtures.
    pub fn from_rows<S: AsRef<str>>(names: &[S], rows: &[Vec<f64>]) -> Result<Self> {
        let n_features = names.len();
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_features) {
            return Err(RfeError::InvalidInput(format!(
                "Row {} has {} values, expected {}",
                idx,
                row.len(),
                n_features
            )));
        }

        let values = Mat::from_fn(rows.len(), n_features, |i, j| rows[i][j]);
        Self::new(names.iter().map(|s| s.as_ref().to_string()).collect(), values)
    }

    /// Build from the given columns of a DataFrame.
    ///
    /// Numeric and boolean columns are cast to Float64; nulls become `NaN`.
    /// Any other dtype is rejected.
    pub fn from_frame(df: &DataFrame, features: &[String]) -> Result<Self> {
        let n_rows = df.height();
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(features.len());

        for name in features {
            let column = df.column(name)?;
            if !is_supported_dtype(column.dtype()) {
                return Err(RfeError::InvalidInput(format!(
                    "Feature '{}' has non-numeric dtype {}",
                    name,
                    column.dtype()
                )));
            }

            let float_col = column.cast(&DataType::Float64)?;
            let values: Vec<f64> = float_col
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            columns.push(values);
        }

        let values = Mat::from_fn(n_rows, features.len(), |i, j| columns[j][i]);
        Self::new(features.to_vec(), values)
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &Mat<f64> {
        &self.values
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[(row, col)]
    }

    /// Copy one sample out as a contiguous slice of feature values
    pub fn row(&self, row: usize) -> Vec<f64> {
        (0..self.n_features()).map(|j| self.values[(row, j)]).collect()
    }

    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.n_rows()).map(|i| self.values[(i, col)]).collect()
    }

    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Subset of rows, in the order given
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        let values = Mat::from_fn(rows.len(), self.n_features(), |i, j| {
            self.values[(rows[i], j)]
        });
        Self {
            names: self.names.clone(),
            values,
        }
    }

    /// Subset of columns, in the order given
    pub fn select_features<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let indices: Vec<usize> = names
            .iter()
            .map(|name| {
                self.feature_index(name.as_ref()).ok_or_else(|| {
                    RfeError::InvalidInput(format!("Unknown feature '{}'", name.as_ref()))
                })
            })
            .collect::<Result<_>>()?;

        let values = Mat::from_fn(self.n_rows(), indices.len(), |i, j| {
            self.values[(i, indices[j])]
        });
        Self::new(
            names.iter().map(|s| s.as_ref().to_string()).collect(),
            values,
        )
    }

    pub fn has_missing(&self) -> bool {
        (0..self.n_rows()).any(|i| (0..self.n_features()).any(|j| self.values[(i, j)].is_nan()))
    }
}

fn is_supported_dtype(dtype: &DataType) -> bool {
    dtype.is_primitive_numeric() || matches!(dtype, DataType::Boolean)
}

/// Split DataFrame columns into usable numeric features and skipped columns.
///
/// Columns listed in `exclude` (target, dropped columns) are ignored entirely.
pub fn partition_feature_columns(df: &DataFrame, exclude: &[&str]) -> (Vec<String>, Vec<String>) {
    let mut features = Vec::new();
    let mut skipped = Vec::new();

    for column in df.get_columns() {
        let name = column.name().to_string();
        if exclude.contains(&name.as_str()) {
            continue;
        }
        if is_supported_dtype(column.dtype()) {
            features.push(name);
        } else {
            skipped.push(name);
        }
    }

    (features, skipped)
}
