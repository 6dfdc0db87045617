// src/processing/dtw.rs
//! Dynamic time warping distance and per-gesture template matching

use crate::processing::normalize::NormalizedMatrix;
use crate::processing::ProcessingError;
use crate::templates::{GestureTemplate, TemplateSet};
use ndarray::{Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;
use serde::Serialize;

/// Classic O(n*m) DTW over rows with a euclidean step cost.
///
/// Symmetric and zero on identical inputs, but not a metric. Both operands
/// must be non-empty and have the same number of columns.
pub fn dtw_distance(a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> Result<f64, ProcessingError> {
    let (n, m) = (a.nrows(), b.nrows());
    if n == 0 || m == 0 {
        return Err(ProcessingError::EmptyInput);
    }
    if a.ncols() != b.ncols() {
        return Err(ProcessingError::ColumnMismatch {
            left: a.ncols(),
            right: b.ncols(),
        });
    }

    let mut cost = Array2::from_elem((n + 1, m + 1), f64::INFINITY);
    cost[[0, 0]] = 0.0;

    for i in 1..=n {
        let row_a = a.row(i - 1);
        for j in 1..=m {
            let step = euclidean(row_a, b.row(j - 1));
            let previous = cost[[i - 1, j]]
                .min(cost[[i, j - 1]])
                .min(cost[[i - 1, j - 1]]);
            cost[[i, j]] = step + previous;
        }
    }

    Ok(cost[[n, m]])
}

fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Best distance of one gesture over all of its variants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GestureDistance {
    pub gesture: String,
    pub distance: f64,
}

/// Per-gesture distances, closest first; equal distances keep name order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    distances: Vec<GestureDistance>,
}

impl MatchReport {
    pub fn from_distances(mut distances: Vec<GestureDistance>) -> Self {
        distances.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.gesture.cmp(&b.gesture))
        });
        Self { distances }
    }

    pub fn best(&self) -> Option<&GestureDistance> {
        self.distances.first()
    }

    pub fn runner_up(&self) -> Option<&GestureDistance> {
        self.distances.get(1)
    }

    pub fn best_distance(&self) -> f64 {
        self.best().map_or(f64::INFINITY, |d| d.distance)
    }

    /// `+inf` when fewer than two gestures were compared
    pub fn second_best_distance(&self) -> f64 {
        self.runner_up().map_or(f64::INFINITY, |d| d.distance)
    }

    pub fn distances(&self) -> &[GestureDistance] {
        &self.distances
    }

    pub fn into_distances(self) -> Vec<GestureDistance> {
        self.distances
    }
}

/// Compares a normalized live window against every template in a set
#[derive(Debug, Clone, Copy, Default)]
pub struct DtwMatcher {
    sequential: bool,
}

impl DtwMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable the rayon fan-out (benches and single-core targets)
    pub fn sequential(mut self) -> Self {
        self.sequential = true;
        self
    }

    pub fn gesture_distance(
        &self,
        live: &NormalizedMatrix,
        template: &GestureTemplate,
    ) -> Result<GestureDistance, ProcessingError> {
        let mut best = f64::INFINITY;
        for (variant, matrix) in template.variants().iter().enumerate() {
            let distance = dtw_distance(live.view(), matrix.view()).map_err(|source| {
                ProcessingError::Matching {
                    gesture: template.name().to_string(),
                    variant,
                    source: Box::new(source),
                }
            })?;
            best = best.min(distance);
        }
        Ok(GestureDistance {
            gesture: template.name().to_string(),
            distance: best,
        })
    }

    pub fn match_window(
        &self,
        live: &NormalizedMatrix,
        templates: &TemplateSet,
    ) -> Result<MatchReport, ProcessingError> {
        if templates.is_empty() {
            return Err(ProcessingError::NoTemplates);
        }

        let gestures: Vec<&GestureTemplate> = templates.iter().collect();
        let distances = if self.sequential || gestures.len() == 1 {
            gestures
                .iter()
                .map(|template| self.gesture_distance(live, template))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            gestures
                .par_iter()
                .map(|template| self.gesture_distance(live, template))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(MatchReport::from_distances(distances))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{GestureTemplate, TemplateMetadata};
    use ndarray::array;

    fn template(name: &str, variants: Vec<Array2<f64>>) -> GestureTemplate {
        let length = variants[0].nrows();
        GestureTemplate::new(
            name,
            length,
            variants.into_iter().map(NormalizedMatrix::from_stored).collect(),
            TemplateMetadata::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_identical_sequences_have_zero_distance() {
        let a = array![[0.0, 1.0], [1.0, 0.0], [2.0, 2.0]];
        assert_eq!(dtw_distance(a.view(), a.view()).unwrap(), 0.0);
    }

    #[test]
    fn test_hand_computed_distance() {
        // one-column sequences [0, 1] vs [0, 2, 1]
        let a = array![[0.0], [1.0]];
        let b = array![[0.0], [2.0], [1.0]];
        // best path: (0,0)=0, (1,1)=1, (1,2)=0 -> 1
        assert!((dtw_distance(a.view(), b.view()).unwrap() - 1.0).abs() < 1e-12);
        assert!((dtw_distance(b.view(), a.view()).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_time_shift_is_absorbed() {
        let a = array![[0.0], [0.0], [1.0], [0.0]];
        let b = array![[0.0], [1.0], [0.0], [0.0]];
        assert_eq!(dtw_distance(a.view(), b.view()).unwrap(), 0.0);
    }

    #[test]
    fn test_empty_and_mismatched_inputs() {
        let empty = Array2::<f64>::zeros((0, 2));
        let a = array![[0.0, 1.0]];
        let b = array![[0.0, 1.0, 2.0]];
        assert_eq!(dtw_distance(empty.view(), a.view()), Err(ProcessingError::EmptyInput));
        assert_eq!(
            dtw_distance(a.view(), b.view()),
            Err(ProcessingError::ColumnMismatch { left: 2, right: 3 })
        );
    }

    #[test]
    fn test_gesture_uses_closest_variant() {
        let live = NormalizedMatrix::from_stored(array![[1.0], [2.0]]);
        let gesture = template("wave", vec![array![[5.0], [5.0]], array![[1.0], [2.0]]]);
        let distance = DtwMatcher::new().gesture_distance(&live, &gesture).unwrap();
        assert_eq!(distance.distance, 0.0);
    }

    #[test]
    fn test_report_ordering_and_ties() {
        let live = NormalizedMatrix::from_stored(array![[0.0], [0.0]]);
        let set = TemplateSet::new(vec![
            template("zeta", vec![array![[1.0], [1.0]]]),
            template("alpha", vec![array![[1.0], [1.0]]]),
            template("mid", vec![array![[0.0], [0.5]]]),
        ])
        .unwrap();

        let report = DtwMatcher::new().match_window(&live, &set).unwrap();
        let order: Vec<&str> = report.distances().iter().map(|d| d.gesture.as_str()).collect();
        assert_eq!(order, vec!["mid", "alpha", "zeta"]);
        assert_eq!(report.best_distance(), 0.5);
        assert_eq!(report.second_best_distance(), 2.0);

        let sequential = DtwMatcher::new().sequential().match_window(&live, &set).unwrap();
        assert_eq!(sequential, report);
    }

    #[test]
    fn test_single_gesture_has_infinite_runner_up() {
        let live = NormalizedMatrix::from_stored(array![[0.0]]);
        let set = TemplateSet::new(vec![template("only", vec![array![[3.0]]])]).unwrap();
        let report = DtwMatcher::new().match_window(&live, &set).unwrap();
        assert_eq!(report.best_distance(), 3.0);
        assert!(report.runner_up().is_none());
        assert_eq!(report.second_best_distance(), f64::INFINITY);
    }

    #[test]
    fn test_matching_error_carries_gesture() {
        let live = NormalizedMatrix::from_stored(array![[0.0, 1.0]]);
        let set = TemplateSet::new(vec![template("bad", vec![array![[3.0]]])]).unwrap();
        match DtwMatcher::new().match_window(&live, &set) {
            Err(ProcessingError::Matching { gesture, variant, .. }) => {
                assert_eq!(gesture, "bad");
                assert_eq!(variant, 0);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
