// src/processing/normalize.rs
//! Per-column z-score normalization

use crate::config::constants::sensor::ZERO_VARIANCE_EPSILON;
use ndarray::{Array2, ArrayView2, Axis};

/// A feature matrix whose columns are each zero-mean, unit-variance
/// (or all zero when the source column was constant).
///
/// Live windows are normalized with their own statistics, templates were
/// normalized the same way when built. Nothing outside this module can
/// produce one from raw data without going through [`standardize`] except
/// [`NormalizedMatrix::from_stored`], used for matrices read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMatrix(Array2<f64>);

impl NormalizedMatrix {
    /// Wrap a matrix that was normalized before being persisted
    pub fn from_stored(matrix: Array2<f64>) -> Self {
        Self(matrix)
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.0.view()
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.0
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.0
    }

    pub fn rows(&self) -> usize {
        self.0.nrows()
    }

    pub fn cols(&self) -> usize {
        self.0.ncols()
    }
}

/// Subtract each column's mean and divide by its population std (ddof = 0).
/// Constant columns come out as zeros instead of NaN.
pub fn standardize(matrix: &Array2<f64>) -> NormalizedMatrix {
    let mut output = matrix.clone();
    if matrix.nrows() == 0 {
        return NormalizedMatrix(output);
    }

    for mut column in output.axis_iter_mut(Axis(1)) {
        let n = column.len() as f64;
        let mean = column.sum() / n;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();

        if std <= ZERO_VARIANCE_EPSILON {
            column.fill(0.0);
        } else {
            column.mapv_inplace(|v| (v - mean) / std);
        }
    }
    NormalizedMatrix(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_columns_have_zero_mean_unit_std() {
        let matrix = array![[1.0, 10.0], [2.0, 20.0], [3.0, 60.0], [6.0, 10.0]];
        let normalized = standardize(&matrix);

        for column in normalized.as_array().axis_iter(Axis(1)) {
            let n = column.len() as f64;
            let mean = column.sum() / n;
            let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            assert_close(mean, 0.0);
            assert_close(var, 1.0);
        }
    }

    #[test]
    fn test_population_std_is_used() {
        // [0, 2]: mean 1, population std 1
        let normalized = standardize(&array![[0.0], [2.0]]);
        assert_close(normalized.as_array()[[0, 0]], -1.0);
        assert_close(normalized.as_array()[[1, 0]], 1.0);
    }

    #[test]
    fn test_constant_column_becomes_zero() {
        let normalized = standardize(&array![[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]]);
        let first: Vec<f64> = normalized.as_array().column(0).to_vec();
        assert_eq!(first, vec![0.0, 0.0, 0.0]);
        assert!(normalized.as_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_shape_preserved() {
        let matrix = Array2::<f64>::zeros((7, 8));
        let normalized = standardize(&matrix);
        assert_eq!((normalized.rows(), normalized.cols()), (7, 8));
    }
}
