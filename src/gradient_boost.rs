//! Gradient boosting over regression trees.
//!
//! Each iteration fits one [DecisionTree](../decision_tree/struct.DecisionTree.html)
//! on the negative gradient of the loss and adds its shrunk prediction to the
//! running model. All randomness (row and feature sampling) comes from a
//! generator seeded with `BoostConfig::seed`, so a fit is reproducible.

use crate::config::{BoostConfig, Loss};
use crate::decision_tree::{DataVec, DecisionTree, PredVec, TrainingCache, ValueType};
use crate::fitness::{label_average, lad_loss_gradient, weighted_label_median, MAE, MSE};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GBDT {
    conf: BoostConfig,
    trees: Vec<DecisionTree>,
    bias: ValueType,
}

impl GBDT {
    pub fn new(conf: &BoostConfig) -> GBDT {
        GBDT {
            conf: conf.clone(),
            trees: Vec::new(),
            bias: 0.0,
        }
    }

    pub fn config(&self) -> &BoostConfig {
        &self.conf
    }

    /// Number of fitted trees.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    fn init(&mut self, dv: &DataVec) {
        self.bias = match self.conf.loss {
            Loss::SquaredError => label_average(dv),
            Loss::LAD => weighted_label_median(dv),
        }
    }

    pub fn fit(&mut self, train_data: &DataVec) {
        self.trees = Vec::with_capacity(self.conf.iterations);
        if train_data.is_empty() {
            warn!("No training data, the model predicts 0");
            self.bias = 0.0;
            return;
        }
        self.init(train_data);

        let nr_samples: usize = if self.conf.data_sample_ratio < 1.0 {
            (((train_data.len() as f64) * self.conf.data_sample_ratio) as usize).max(1)
        } else {
            train_data.len()
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.conf.seed);
        let mut dv = train_data.to_vec();
        let mut cache = TrainingCache::get_cache(self.conf.feature_size, &dv);
        let mut subset: Vec<usize> = (0..dv.len()).collect();
        let mut predicted: PredVec = vec![self.bias; dv.len()];

        for i in 0..self.conf.iterations {
            match self.conf.loss {
                Loss::SquaredError => self.square_loss_process(&mut dv, &predicted, i),
                Loss::LAD => self.lad_loss_process(&mut dv, &predicted, i),
            }

            if nr_samples < dv.len() {
                subset.shuffle(&mut rng);
            }

            let mut tree = DecisionTree::new();
            tree.set_feature_size(self.conf.feature_size);
            tree.set_max_depth(self.conf.max_depth);
            tree.set_min_leaf_size(self.conf.min_leaf_size);
            tree.set_loss(self.conf.loss.clone());
            tree.set_feature_sample_ratio(self.conf.feature_sample_ratio);
            tree.fit_n(&dv, &subset[..nr_samples], &mut cache, &mut rng);

            for (p, v) in predicted.iter_mut().zip(tree.predict(&dv).iter()) {
                *p += self.conf.shrinkage * v;
            }
            self.trees.push(tree);
        }

        if self.conf.debug {
            self.print_trees();
        }
    }

    /// Predict with the first `iters` trees only.
    pub fn predict_n(&self, test_data: &DataVec, iters: usize) -> PredVec {
        let mut predicted: PredVec = vec![self.bias; test_data.len()];
        for tree in self.trees.iter().take(iters) {
            let v: PredVec = tree.predict(test_data);
            for (p, d) in predicted.iter_mut().zip(v.iter()) {
                *p += self.conf.shrinkage * d;
            }
        }
        predicted
    }

    pub fn predict(&self, test_data: &DataVec) -> PredVec {
        self.predict_n(test_data, self.trees.len())
    }

    pub fn print_trees(&self) {
        for tree in self.trees.iter() {
            tree.print();
        }
    }

    fn square_loss_process(&self, dv: &mut DataVec, predicted: &PredVec, iters: usize) {
        for (d, p) in dv.iter_mut().zip(predicted.iter()) {
            d.target = d.label - p;
        }
        if self.conf.debug {
            debug!(iteration = iters, mse = MSE(dv, predicted), "Boosting");
        }
    }

    fn lad_loss_process(&self, dv: &mut DataVec, predicted: &PredVec, iters: usize) {
        for (d, p) in dv.iter_mut().zip(predicted.iter()) {
            d.residual = d.label - p;
            d.target = lad_loss_gradient(d.label, *p);
        }
        if self.conf.debug {
            debug!(iteration = iters, mae = MAE(dv, predicted), "Boosting");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision_tree::Data;
    use crate::fitness::almost_equal_thrs;

    fn linear_data() -> DataVec {
        (0..40)
            .map(|i| {
                let x = i as ValueType;
                Data::new_training_data(vec![x, (i % 3) as ValueType], 1.0, 2.0 * x + 1.0)
            })
            .collect()
    }

    fn config(loss: &str, max_depth: u32) -> BoostConfig {
        let mut cfg = BoostConfig::new();
        cfg.set_feature_size(2);
        cfg.set_max_depth(max_depth);
        cfg.set_iterations(50);
        cfg.set_shrinkage(0.3);
        cfg.set_min_leaf_size(1);
        cfg.set_loss(loss);
        cfg
    }

    #[test]
    fn fits_a_line() {
        let dv = linear_data();
        let mut gbdt = GBDT::new(&config("SquaredError", 6));
        gbdt.fit(&dv);
        assert_eq!(gbdt.len(), 50);

        let predicted = gbdt.predict(&dv);
        assert_eq!(predicted.len(), dv.len());
        for (d, p) in dv.iter().zip(predicted.iter()) {
            assert!(almost_equal_thrs(d.label, *p, 1.0), "{} vs {}", d.label, p);
        }
        assert!(MSE(&dv, &predicted) < MSE(&dv, &gbdt.predict_n(&dv, 1)));
    }

    #[test]
    fn lad_is_robust_to_an_outlier() {
        let mut dv = linear_data();
        dv[10].label = 10_000.0;
        let mut gbdt = GBDT::new(&config("LAD", 4));
        gbdt.fit(&dv);
        let predicted = gbdt.predict(&dv);
        assert!(predicted[20] < 100.0);
    }

    #[test]
    fn same_seed_same_model() {
        let dv = linear_data();
        let mut cfg = config("SquaredError", 4);
        cfg.set_data_sample_ratio(0.5);
        cfg.set_feature_sample_ratio(0.5);

        let mut a = GBDT::new(&cfg);
        a.fit(&dv);
        let mut b = GBDT::new(&cfg);
        b.fit(&dv);
        assert_eq!(a.predict(&dv), b.predict(&dv));
    }

    #[test]
    fn zero_iterations_predict_the_mean() {
        let dv = linear_data();
        let mut cfg = config("SquaredError", 4);
        cfg.set_iterations(0);
        let mut gbdt = GBDT::new(&cfg);
        gbdt.fit(&dv);
        assert!(gbdt.is_empty());
        assert!(almost_equal_thrs(40.0, gbdt.predict(&dv)[0], 1e-3));
    }

    #[test]
    fn debug_fit_dumps_the_trees() {
        let dv = linear_data();
        let mut cfg = config("SquaredError", 2);
        cfg.set_iterations(3);
        cfg.set_debug(true);
        let mut gbdt = GBDT::new(&cfg);
        gbdt.fit(&dv);
        assert_eq!(gbdt.len(), 3);
        for tree in gbdt.trees.iter() {
            assert!(!tree.is_empty());
            assert!(!tree.dump().is_empty());
        }
        gbdt.print_trees();
    }

    #[test]
    fn empty_training_set() {
        let mut gbdt = GBDT::new(&config("SquaredError", 4));
        gbdt.fit(&Vec::new());
        let sample = vec![Data::new_test_data(vec![1.0, 1.0], None)];
        assert_eq!(gbdt.predict(&sample), vec![0.0]);
    }
}
