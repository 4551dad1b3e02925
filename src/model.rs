//! The trained artifact: the fitted feature pipeline and the boosted trees,
//! tagged with the record schema they were trained on.

use crate::decision_tree::{PredVec, ValueType};
use crate::errors::{FareError, Result};
use crate::gradient_boost::GBDT;
use crate::pipeline::FittedPipeline;
use crate::record::{Schema, TripRecord};
use serde_derive::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    schema: Schema,
    pipeline: FittedPipeline,
    gbdt: GBDT,
}

impl TrainedModel {
    pub fn new(pipeline: FittedPipeline, gbdt: GBDT) -> TrainedModel {
        TrainedModel {
            schema: Schema::trip(),
            pipeline,
            gbdt,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn pipeline(&self) -> &FittedPipeline {
        &self.pipeline
    }

    pub fn gbdt(&self) -> &GBDT {
        &self.gbdt
    }

    /// Predict the fare of every record.
    pub fn predict(&self, records: &[TripRecord]) -> PredVec {
        self.gbdt.predict(&self.pipeline.to_test_data(records))
    }

    /// Predict the fare of one trip.
    pub fn predict_one(&self, record: &TripRecord) -> ValueType {
        self.predict(std::slice::from_ref(record))
            .first()
            .copied()
            .unwrap_or(0.0)
    }

    /// Write the model to `path` in bincode format. Missing parent
    /// directories are created.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let bytes = bincode::serialize(self)?;
        let mut file = File::create(path)?;
        file.write_all(&bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "Saved model");
        Ok(())
    }

    /// Read a model written by [save](#method.save).
    ///
    /// # Error
    /// Raise error if the file cannot be read or decoded, or if the model
    /// was trained on a different record schema.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<TrainedModel> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let model: TrainedModel = bincode::deserialize(&bytes)?;
        let expected = Schema::trip();
        if model.schema != expected {
            return Err(FareError::SchemaMismatch {
                expected: expected.to_string(),
                found: model.schema.to_string(),
            });
        }
        info!(path = %path.display(), trees = model.gbdt.len(), "Loaded model");
        Ok(model)
    }
}
