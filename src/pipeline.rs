//! Row filtering and feature extraction.
//!
//! Every feature stage is fit on the training split first
//! ([FeatureStage::fit](enum.FeatureStage.html#method.fit)), and the
//! resulting [FittedStage](enum.FittedStage.html) is then applied unchanged
//! to the training split, the test split and single predictions.
//!
//! # Example
//! ```rust
//! use taxi_fare::pipeline::FeaturePipeline;
//! use taxi_fare::record::sample_trip;
//! let records = vec![sample_trip()];
//! let fitted = FeaturePipeline::taxi().fit(&records).unwrap();
//! // VTS, CRD and three scalars.
//! assert_eq!(fitted.feature_size(), 5);
//! assert_eq!(fitted.transform(&records[0]), vec![1.0, 1.0, 0.0, 0.0, 0.0]);
//! ```

use crate::config::AppConfig;
use crate::decision_tree::{Data, DataVec, ValueType, VALUE_TYPE_UNKNOWN};
use crate::errors::{FareError, Result};
use crate::record::{field, FieldKind, FieldSpec, FieldValue, TripRecord};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

pub type FeatureVector = Vec<ValueType>;

/// Drop the records that should not be trained on, and shuffle the rest.
///
/// In order: records paying with `cfg.unknown_payment_type` are dropped,
/// the remainder is shuffled with `cfg.seed`, then only fares within
/// `[cfg.min_fare, cfg.max_fare]` and passenger counts of at least
/// `cfg.min_passenger_count` are kept. Missing fares and passenger counts
/// never pass.
pub fn filter_rows(dataset: Vec<TripRecord>, cfg: &AppConfig) -> Vec<TripRecord> {
    let loaded = dataset.len();
    let mut rows: Vec<TripRecord> = dataset
        .into_iter()
        .filter(|r| r.payment_type != cfg.unknown_payment_type)
        .collect();

    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    rows.shuffle(&mut rng);

    rows.retain(|r| r.fare_amount >= cfg.min_fare && r.fare_amount <= cfg.max_fare);
    rows.retain(|r| r.passenger_count >= cfg.min_passenger_count);

    info!(loaded, kept = rows.len(), "Filtered records");
    rows
}

/// An unfitted transformation of one field into feature columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureStage {
    /// One column per category of a text field.
    OneHot(String),
    /// A numeric field shifted to zero mean and scaled to unit variance.
    MeanVariance(String),
}

impl FeatureStage {
    fn field_name(&self) -> &str {
        match self {
            FeatureStage::OneHot(name) | FeatureStage::MeanVariance(name) => name,
        }
    }

    /// Learn the parameters of the stage from `records`.
    ///
    /// # Error
    /// Raise error if the field doesn't exist or has the wrong kind for the
    /// stage.
    pub fn fit(&self, records: &[TripRecord]) -> Result<FittedStage> {
        let name = self.field_name();
        let spec = field(name).ok_or_else(|| FareError::UnknownField(name.to_string()))?;
        match self {
            FeatureStage::OneHot(_) => {
                check_kind(spec, FieldKind::Text)?;
                let categories: BTreeSet<String> = records
                    .iter()
                    .map(|r| spec.value(r))
                    .filter(|v| !v.is_missing())
                    .map(|v| v.key())
                    .collect();
                Ok(FittedStage::OneHot {
                    field: name.to_string(),
                    categories: categories.into_iter().collect(),
                })
            }
            FeatureStage::MeanVariance(_) => {
                check_kind(spec, FieldKind::Number)?;
                let values: Vec<f64> = records
                    .iter()
                    .filter_map(|r| match spec.value(r) {
                        FieldValue::Number(n) if !n.is_nan() => Some(f64::from(n)),
                        _ => None,
                    })
                    .collect();
                let (mean, std_dev) = mean_std(&values);
                Ok(FittedStage::MeanVariance {
                    field: name.to_string(),
                    mean,
                    std_dev,
                })
            }
        }
    }
}

fn check_kind(spec: &FieldSpec, kind: FieldKind) -> Result<()> {
    if spec.kind == kind {
        Ok(())
    } else {
        Err(FareError::UnknownField(format!(
            "{} is not a {:?} field",
            spec.name, kind
        )))
    }
}

/// Population mean and standard deviation. (0, 0) for an empty slice.
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// A feature stage with its learned parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FittedStage {
    OneHot {
        field: String,
        /// Sorted. Values not in the list encode as all zeros.
        categories: Vec<String>,
    },
    MeanVariance {
        field: String,
        mean: f64,
        /// A zero deviation scales by 1.
        std_dev: f64,
    },
}

impl FittedStage {
    /// Number of feature columns produced.
    pub fn width(&self) -> usize {
        match self {
            FittedStage::OneHot { categories, .. } => categories.len(),
            FittedStage::MeanVariance { .. } => 1,
        }
    }

    /// Append the feature columns of `record` to `out`.
    pub fn apply(&self, record: &TripRecord, out: &mut FeatureVector) {
        match self {
            FittedStage::OneHot { field: name, categories } => {
                let key = field(name).map(|spec| spec.value(record).key());
                for c in categories.iter() {
                    let hot = key.as_ref().map_or(false, |k| k == c);
                    out.push(if hot { 1.0 } else { 0.0 });
                }
            }
            FittedStage::MeanVariance {
                field: name,
                mean,
                std_dev,
            } => {
                let value = match field(name).map(|spec| spec.value(record)) {
                    Some(FieldValue::Number(n)) if !n.is_nan() => n,
                    _ => {
                        out.push(VALUE_TYPE_UNKNOWN);
                        return;
                    }
                };
                let scale = if *std_dev > 0.0 { *std_dev } else { 1.0 };
                out.push(((f64::from(value) - mean) / scale) as ValueType);
            }
        }
    }
}

/// The ordered list of feature stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePipeline {
    pub stages: Vec<FeatureStage>,
}

impl FeaturePipeline {
    /// Vendor and payment type one-hot, then the normalized passenger count,
    /// trip time and trip distance. The rate code is not used.
    pub fn taxi() -> FeaturePipeline {
        FeaturePipeline {
            stages: vec![
                FeatureStage::OneHot(String::from("VendorId")),
                FeatureStage::OneHot(String::from("PaymentType")),
                FeatureStage::MeanVariance(String::from("PassengerCount")),
                FeatureStage::MeanVariance(String::from("TripTime")),
                FeatureStage::MeanVariance(String::from("TripDistance")),
            ],
        }
    }

    pub fn fit(&self, records: &[TripRecord]) -> Result<FittedPipeline> {
        let stages = self
            .stages
            .iter()
            .map(|s| s.fit(records))
            .collect::<Result<Vec<FittedStage>>>()?;
        Ok(FittedPipeline { stages })
    }
}

impl Default for FeaturePipeline {
    fn default() -> Self {
        FeaturePipeline::taxi()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    pub stages: Vec<FittedStage>,
}

impl FittedPipeline {
    pub fn feature_size(&self) -> usize {
        self.stages.iter().map(|s| s.width()).sum()
    }

    pub fn transform(&self, record: &TripRecord) -> FeatureVector {
        let mut out = Vec::with_capacity(self.feature_size());
        for stage in self.stages.iter() {
            stage.apply(record, &mut out);
        }
        out
    }

    /// Training samples labelled with the fare, all weighted 1.
    pub fn to_training_data(&self, records: &[TripRecord]) -> DataVec {
        records
            .iter()
            .map(|r| Data::new_training_data(self.transform(r), 1.0, r.fare_amount))
            .collect()
    }

    /// Unlabelled samples.
    pub fn to_test_data(&self, records: &[TripRecord]) -> DataVec {
        records
            .iter()
            .map(|r| Data::new_test_data(self.transform(r), None))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::almost_equal;
    use crate::record::sample_trip;

    fn trip(vendor: &str, payment: &str, passengers: f32, fare: f32) -> TripRecord {
        TripRecord {
            vendor_id: vendor.to_string(),
            payment_type: payment.to_string(),
            passenger_count: passengers,
            fare_amount: fare,
            ..sample_trip()
        }
    }

    #[test]
    fn filter_drops_unknown_payment_and_out_of_range() {
        let rows = vec![
            trip("VTS", "CRD", 1.0, 10.0),
            trip("VTS", "UNK", 1.0, 10.0),
            trip("VTS", "CSH", 1.0, 500.0),
            trip("VTS", "CSH", 0.0, 10.0),
            trip("VTS", "CSH", f32::NAN, 10.0),
            trip("VTS", "CSH", 2.0, f32::NAN),
            trip("CMT", "CSH", 2.0, 150.0),
            trip("CMT", "CSH", 3.0, 1.0),
            trip("CMT", "CSH", 3.0, 0.5),
        ];
        let kept = filter_rows(rows, &AppConfig::default());
        assert_eq!(kept.len(), 3);
        for r in kept.iter() {
            assert_ne!(r.payment_type, "UNK");
            assert!(r.fare_amount >= 1.0 && r.fare_amount <= 150.0);
            assert!(r.passenger_count >= 1.0);
        }
    }

    #[test]
    fn filter_shuffle_is_seeded() {
        let rows: Vec<TripRecord> = (1..50).map(|i| trip("VTS", "CRD", 1.0, i as f32)).collect();
        let cfg = AppConfig::default();
        let a = filter_rows(rows.clone(), &cfg);
        let b = filter_rows(rows.clone(), &cfg);
        assert_eq!(a, b);

        let mut other = AppConfig::default();
        other.seed = 7;
        assert_ne!(a, filter_rows(rows, &other));
    }

    #[test]
    fn one_hot_sorts_categories_and_ignores_unseen() {
        let records = vec![trip("VTS", "CSH", 1.0, 5.0), trip("CMT", "CRD", 1.0, 5.0)];
        let stage = FeatureStage::OneHot(String::from("VendorId")).fit(&records).unwrap();
        match &stage {
            FittedStage::OneHot { categories, .. } => assert_eq!(categories, &vec!["CMT", "VTS"]),
            other => panic!("unexpected stage: {:?}", other),
        }

        let mut out = Vec::new();
        stage.apply(&trip("DDS", "CSH", 1.0, 5.0), &mut out);
        assert_eq!(out, vec![0.0, 0.0]);
        out.clear();
        stage.apply(&records[0], &mut out);
        assert_eq!(out, vec![0.0, 1.0]);
    }

    #[test]
    fn mean_variance_normalizes() {
        let records = vec![
            trip("VTS", "CRD", 1.0, 5.0),
            trip("VTS", "CRD", 3.0, 5.0),
            trip("VTS", "CRD", f32::NAN, 5.0),
        ];
        let stage = FeatureStage::MeanVariance(String::from("PassengerCount"))
            .fit(&records)
            .unwrap();
        let mut out = Vec::new();
        for r in records.iter() {
            stage.apply(r, &mut out);
        }
        assert!(almost_equal(out[0], -1.0));
        assert!(almost_equal(out[1], 1.0));
        assert_eq!(out[2], VALUE_TYPE_UNKNOWN);
    }

    #[test]
    fn zero_variance_divides_by_one() {
        let records = vec![trip("VTS", "CRD", 2.0, 5.0), trip("VTS", "CRD", 2.0, 5.0)];
        let stage = FeatureStage::MeanVariance(String::from("PassengerCount"))
            .fit(&records)
            .unwrap();
        let mut out = Vec::new();
        stage.apply(&trip("VTS", "CRD", 5.0, 5.0), &mut out);
        assert!(almost_equal(out[0], 3.0));
    }

    #[test]
    fn wrong_fields_are_rejected() {
        let records = vec![sample_trip()];
        assert!(FeatureStage::OneHot(String::from("TripTime")).fit(&records).is_err());
        assert!(FeatureStage::MeanVariance(String::from("Tip")).fit(&records).is_err());
    }

    #[test]
    fn pipeline_layout() {
        let records = vec![
            trip("VTS", "CRD", 1.0, 10.0),
            trip("CMT", "CSH", 2.0, 20.0),
            trip("VTS", "NOC", 3.0, 30.0),
        ];
        let fitted = FeaturePipeline::taxi().fit(&records).unwrap();
        // 2 vendors, 3 payment types, 3 scalars.
        assert_eq!(fitted.feature_size(), 8);

        let v = fitted.transform(&records[1]);
        assert_eq!(v.len(), 8);
        assert_eq!(&v[..5], &[1.0, 0.0, 0.0, 1.0, 0.0]);
        assert!(almost_equal(v[5], 0.0));

        let dv = fitted.to_training_data(&records);
        assert_eq!(dv[2].label, 30.0);
        assert_eq!(dv[2].feature, fitted.transform(&records[2]));
        assert_eq!(fitted.to_test_data(&records).len(), 3);
    }
}
