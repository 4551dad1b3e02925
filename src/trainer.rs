//! Splitting, training and evaluation.

use crate::config::BoostConfig;
use crate::decision_tree::ValueType;
use crate::errors::{FareError, Result};
use crate::fitness::RegressionMetrics;
use crate::gradient_boost::GBDT;
use crate::model::TrainedModel;
use crate::pipeline::FeaturePipeline;
use crate::record::TripRecord;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

/// Shuffle `dataset` with `seed` and hold out `round(n * test_fraction)`
/// records for testing. Return `(train, test)`.
///
/// # Example
/// ```rust
/// use taxi_fare::record::sample_trip;
/// use taxi_fare::trainer::train_test_split;
/// let (train, test) = train_test_split(vec![sample_trip(); 10], 0.2, 1);
/// assert_eq!((train.len(), test.len()), (8, 2));
/// ```
pub fn train_test_split(
    mut dataset: Vec<TripRecord>,
    test_fraction: f64,
    seed: u64,
) -> (Vec<TripRecord>, Vec<TripRecord>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    dataset.shuffle(&mut rng);

    let fraction = test_fraction.max(0.0).min(1.0);
    let test_size = ((dataset.len() as f64) * fraction).round() as usize;
    let test = dataset.split_off(dataset.len() - test_size);
    info!(train = dataset.len(), test = test.len(), "Split dataset");
    (dataset, test)
}

/// Fit the feature pipeline and the boosted trees on `train`, with the fare
/// as label.
///
/// # Error
/// Raise error if `train` is empty.
pub fn train(config: &BoostConfig, train: &[TripRecord]) -> Result<TrainedModel> {
    if train.is_empty() {
        return Err(FareError::EmptyDataset("training split"));
    }
    let pipeline = FeaturePipeline::taxi().fit(train)?;

    let mut conf = config.clone();
    conf.set_feature_size(pipeline.feature_size());
    info!(
        records = train.len(),
        features = conf.feature_size,
        iterations = conf.iterations,
        "Training"
    );

    let mut gbdt = GBDT::new(&conf);
    gbdt.fit(&pipeline.to_training_data(train));
    Ok(TrainedModel::new(pipeline, gbdt))
}

/// Score `model` on `test`.
///
/// # Error
/// Raise error if `test` is empty.
pub fn evaluate(model: &TrainedModel, test: &[TripRecord]) -> Result<RegressionMetrics> {
    let predicted = model.predict(test);
    let actual: Vec<ValueType> = test.iter().map(|r| r.fare_amount).collect();
    let metrics = RegressionMetrics::compute(&actual, &predicted)
        .ok_or(FareError::EmptyDataset("test split"))?;
    info!(
        records = test.len(),
        r_squared = metrics.r_squared,
        rmse = metrics.root_mean_squared_error,
        "Evaluated model"
    );
    Ok(metrics)
}
