//! This module implements the math used by the boosting process and the
//! regression metrics reported after evaluation.

use crate::decision_tree::{DataVec, PredVec, ValueType};
use serde_derive::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Comparing two number with a costomized floating error threshold.
///
/// # Example
/// ```rust
/// use taxi_fare::fitness::almost_equal_thrs;
/// assert_eq!(true, almost_equal_thrs(1.0, 0.998, 0.01));
/// ```
pub fn almost_equal_thrs(a: ValueType, b: ValueType, thrs: f64) -> bool {
    f64::from((a - b).abs()) < thrs
}

/// Comparing two number with default floating error threshold.
///
/// # Example
/// ```rust
/// use taxi_fare::fitness::almost_equal;
/// assert_eq!(false, almost_equal(1.0, 0.998));
/// assert_eq!(true, almost_equal(1.0, 0.999998));
/// ```
pub fn almost_equal(a: ValueType, b: ValueType) -> bool {
    f64::from((a - b).abs()) < 1.0e-5
}

/// Return the weighted label average of the data vector.
///
/// # Example
/// ```rust
/// use taxi_fare::decision_tree::{Data, DataVec};
/// use taxi_fare::fitness::{label_average, almost_equal};
/// let dv: DataVec = vec![
///     Data::new_training_data(Vec::new(), 0.1, 1.0),
///     Data::new_training_data(Vec::new(), 0.2, 0.0),
///     Data::new_training_data(Vec::new(), 0.3, 1.0),
///     Data::new_training_data(Vec::new(), 0.4, 0.0),
/// ];
/// assert!(almost_equal(0.4, label_average(&dv)));
/// ```
pub fn label_average(dv: &DataVec) -> ValueType {
    let mut s: f64 = 0.0;
    let mut c: f64 = 0.0;
    for d in dv {
        s += f64::from(d.label * d.weight);
        c += f64::from(d.weight);
    }
    if c.abs() < 1e-10 {
        0.0
    } else {
        (s / c) as ValueType
    }
}

/// Return the weighted label median of the data vector.
///
/// # Example
/// ```rust
/// use taxi_fare::decision_tree::{Data, DataVec};
/// use taxi_fare::fitness::{weighted_label_median, almost_equal};
/// let dv: DataVec = vec![
///     Data::new_training_data(Vec::new(), 1.0, 7.0),
///     Data::new_training_data(Vec::new(), 1.0, 2.0),
///     Data::new_training_data(Vec::new(), 3.0, 5.0),
/// ];
/// assert!(almost_equal(5.0, weighted_label_median(&dv)));
/// ```
pub fn weighted_label_median(dv: &DataVec) -> ValueType {
    let mut sorted: Vec<(ValueType, ValueType)> = dv.iter().map(|d| (d.label, d.weight)).collect();
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    let all_weight: ValueType = sorted.iter().map(|x| x.1).sum();

    let mut weight: ValueType = 0.0;
    for (i, &(label, w)) in sorted.iter().enumerate() {
        weight += w;
        if weight * 2.0 > all_weight {
            return label;
        }
        if almost_equal(weight * 2.0, all_weight) && i + 1 < sorted.len() {
            return (label + sorted[i + 1].0) / 2.0;
        }
    }
    0.0
}

/// LAD loss function.
pub fn lad_loss(y: ValueType, f: ValueType) -> ValueType {
    (y - f).abs()
}

/// LAD gradient calculation.
pub fn lad_loss_gradient(y: ValueType, f: ValueType) -> ValueType {
    if y - f > 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Squared loss function.
pub fn squared_loss(y: ValueType, f: ValueType) -> ValueType {
    (y - f) * (y - f)
}

/// Weighted mean squared error between labels and predictions.
/// See [wikipedia](https://en.wikipedia.org/wiki/Mean_squared_error).
#[allow(non_snake_case)]
pub fn MSE(dv: &DataVec, predict: &PredVec) -> ValueType {
    weighted_mean(dv, predict, squared_loss)
}

/// Weighted mean absolute error between labels and predictions.
/// See [wikipedia](https://en.wikipedia.org/wiki/Mean_absolute_error).
#[allow(non_snake_case)]
pub fn MAE(dv: &DataVec, predict: &PredVec) -> ValueType {
    weighted_mean(dv, predict, lad_loss)
}

fn weighted_mean<F>(dv: &DataVec, predict: &PredVec, loss: F) -> ValueType
where
    F: Fn(ValueType, ValueType) -> ValueType,
{
    assert_eq!(dv.len(), predict.len());
    let mut s: f64 = 0.0;
    let mut c: f64 = 0.0;
    for (d, p) in dv.iter().zip(predict.iter()) {
        s += f64::from(loss(d.label, *p) * d.weight);
        c += f64::from(d.weight);
    }
    if c.abs() < 1e-10 {
        0.0
    } else {
        (s / c) as ValueType
    }
}

/// Regression quality of a set of predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean of the squared loss, the loss optimized by training.
    pub loss: f64,
    /// Coefficient of determination.
    pub r_squared: f64,
    pub mean_absolute_error: f64,
    pub mean_squared_error: f64,
    pub root_mean_squared_error: f64,
}

impl RegressionMetrics {
    /// Compute the metrics of `predicted` against `actual`.
    ///
    /// R² is 0 when the actual values have no variance. Return `None` on
    /// empty input.
    ///
    /// # Example
    /// ```rust
    /// use taxi_fare::fitness::RegressionMetrics;
    /// let m = RegressionMetrics::compute(&[1.0, 2.0, 3.0], &[1.0, 2.0, 5.0]).unwrap();
    /// assert!((m.mean_absolute_error - 2.0 / 3.0).abs() < 1e-9);
    /// assert!((m.mean_squared_error - 4.0 / 3.0).abs() < 1e-9);
    /// assert!((m.r_squared + 1.0).abs() < 1e-9);
    /// ```
    pub fn compute(actual: &[ValueType], predicted: &[ValueType]) -> Option<RegressionMetrics> {
        assert_eq!(actual.len(), predicted.len());
        if actual.is_empty() {
            return None;
        }
        let n = actual.len() as f64;
        let mean = actual.iter().map(|y| f64::from(*y)).sum::<f64>() / n;

        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        let mut total_sum = 0.0;
        for (y, f) in actual.iter().zip(predicted.iter()) {
            let y = f64::from(*y);
            let diff = y - f64::from(*f);
            abs_sum += diff.abs();
            sq_sum += diff * diff;
            total_sum += (y - mean) * (y - mean);
        }

        let mse = sq_sum / n;
        let r_squared = if total_sum > 0.0 {
            1.0 - sq_sum / total_sum
        } else {
            0.0
        };
        Some(RegressionMetrics {
            loss: mse,
            r_squared,
            mean_absolute_error: abs_sum / n,
            mean_squared_error: mse,
            root_mean_squared_error: mse.sqrt(),
        })
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "LossFn:        {:.2}", self.loss)?;
        writeln!(f, "R2 Score:      {:.2}", self.r_squared)?;
        writeln!(f, "Absolute loss: {}", self.mean_absolute_error)?;
        writeln!(f, "Squared loss:  {}", self.mean_squared_error)?;
        write!(f, "RMS loss:      {}", self.root_mean_squared_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision_tree::Data;

    #[test]
    fn perfect_prediction() {
        let m = RegressionMetrics::compute(&[3.0, 4.0, 8.0], &[3.0, 4.0, 8.0]).unwrap();
        assert_eq!(m.loss, 0.0);
        assert_eq!(m.mean_absolute_error, 0.0);
        assert_eq!(m.root_mean_squared_error, 0.0);
        assert!((m.r_squared - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mean_prediction_has_zero_r_squared() {
        let m = RegressionMetrics::compute(&[2.0, 4.0], &[3.0, 3.0]).unwrap();
        assert!(m.r_squared.abs() < 1e-12);
        assert!((m.mean_squared_error - 1.0).abs() < 1e-12);
        assert!((m.root_mean_squared_error - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_actuals() {
        let m = RegressionMetrics::compute(&[5.0, 5.0], &[4.0, 6.0]).unwrap();
        assert_eq!(m.r_squared, 0.0);
        assert!(RegressionMetrics::compute(&[], &[]).is_none());
    }

    #[test]
    fn display_rounds_loss_and_r_squared() {
        let m = RegressionMetrics {
            loss: 1.23456,
            r_squared: 0.98765,
            mean_absolute_error: 0.5,
            mean_squared_error: 1.23456,
            root_mean_squared_error: 1.111,
        };
        let s = m.to_string();
        assert!(s.contains("LossFn:        1.23\n"));
        assert!(s.contains("R2 Score:      0.99\n"));
        assert!(s.ends_with("RMS loss:      1.111"));
    }

    #[test]
    fn weighted_errors() {
        let dv: DataVec = vec![
            Data::new_training_data(Vec::new(), 1.0, 1.0),
            Data::new_training_data(Vec::new(), 3.0, 3.0),
        ];
        let predicted: PredVec = vec![2.0, 3.0];
        assert!(almost_equal(0.25, MSE(&dv, &predicted)));
        assert!(almost_equal(0.25, MAE(&dv, &predicted)));
    }

    #[test]
    fn median_between_two_samples() {
        let dv: DataVec = vec![
            Data::new_training_data(Vec::new(), 1.0, 2.0),
            Data::new_training_data(Vec::new(), 1.0, 4.0),
        ];
        assert!(almost_equal(3.0, weighted_label_median(&dv)));
        assert_eq!(lad_loss_gradient(2.0, 3.0), -1.0);
    }
}
