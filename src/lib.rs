//Copyright (C) 2017-2018 Baidu, Inc. All Rights Reserved.
//
//Redistribution and use in source and binary forms, with or without
//modification, are permitted provided that the following conditions
//are met:
//
// * Redistributions of source code must retain the above copyright
//   notice, this list of conditions and the following disclaimer.
//
// * Redistributions in binary form must reproduce the above copyright
//   notice, this list of conditions and the following disclaimer in
//   the documentation and/or other materials provided with the
//   distribution.
//
// * Neither the name of Baidu, Inc., nor the names of its
//   contributors may be used to endorse or promote products derived
//   from this software without specific prior written permission.
//
//THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
//"AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
//LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
//A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
//OWNER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
//SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
//LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; Loss OF USE,
//DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
//THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
//(INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
//OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Taxi fare prediction with gradient boosted regression trees.
//!
//! The batch run cleans and loads a trip CSV ([input](input/index.html)),
//! prints dataset statistics ([report](report/index.html)), filters rows and
//! fits the features ([pipeline](pipeline/index.html)), then trains,
//! evaluates and persists a model ([trainer](trainer/index.html),
//! [model](model/index.html)).

#![allow(clippy::ptr_arg)]
#![allow(clippy::type_complexity)]

pub mod binary_tree;
pub mod config;
pub mod decision_tree;
pub mod errors;
pub mod fitness;
pub mod gradient_boost;
pub mod input;
pub mod model;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod trainer;

#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::input::{self, InputFormat};
    use crate::model::TrainedModel;
    use crate::pipeline::filter_rows;
    use crate::record::{sample_trip, TripRecord};
    use crate::report;
    use crate::trainer::{evaluate, train, train_test_split};
    use std::fs;
    use std::path::Path;

    const FIXTURE: &str = "dataset/taxi-fare/fixture.csv";

    fn load_fixture(dir: &Path) -> Vec<TripRecord> {
        let fmt = InputFormat::csv_format();
        let cleaned = dir.join("fixture-clean.csv");
        assert_eq!(input::clean_csv(FIXTURE, &cleaned, &fmt).unwrap(), 10);
        input::load_records(&cleaned, &fmt).unwrap()
    }

    #[test]
    fn fixture_reports() {
        let dir = tempfile::tempdir().unwrap();
        let records = load_fixture(dir.path());
        assert_eq!(records.len(), 10);

        let missing = report::missing_values(&records);
        assert_eq!(missing.counts[1], ("RateCode", 1));
        assert_eq!(missing.counts.iter().map(|c| c.1).sum::<usize>(), 1);

        let distinct = report::distinct_values(&records);
        assert_eq!(distinct.fields[5].values, vec!["CRD", "CSH", "UNK"]);

        let freq = report::frequencies(&records, "PaymentType").unwrap();
        assert_eq!(freq.total, 9);
        let sum: f64 = freq.rows.iter().map(|r| r.percent).sum();
        assert!((sum - 100.0).abs() < 1e-6);
    }

    #[test]
    fn fixture_filters_to_eight() {
        let dir = tempfile::tempdir().unwrap();
        let kept = filter_rows(load_fixture(dir.path()), &AppConfig::default());
        assert_eq!(kept.len(), 8);
        assert!(kept.iter().all(|r| r.payment_type != "UNK" && r.fare_amount < 500.0));
    }

    #[test]
    fn end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.model_path = dir.path().join("models").join("taxi-fare-model.bin");
        cfg.boost.set_min_leaf_size(1);
        cfg.boost.set_iterations(20);

        let rows = filter_rows(load_fixture(dir.path()), &cfg);
        let (train_set, test_set) = train_test_split(rows, cfg.test_fraction, cfg.seed);
        assert_eq!((train_set.len(), test_set.len()), (6, 2));

        let model = train(&cfg.boost, &train_set).unwrap();
        let metrics = evaluate(&model, &test_set).unwrap();
        assert!(metrics.mean_squared_error >= 0.0);

        model.save(&cfg.model_path).unwrap();
        assert!(fs::metadata(&cfg.model_path).unwrap().len() > 0);

        let reloaded = TrainedModel::load(&cfg.model_path).unwrap();
        let fare = reloaded.predict_one(&sample_trip());
        assert!(fare.is_finite());
        assert!(fare >= 0.0);
        assert_eq!(fare, model.predict_one(&sample_trip()));
    }
}
