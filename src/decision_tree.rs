//! This module implements the regression tree that the boosting process
//! stacks up.
//!
//! Training works on a [TrainingCache](struct.TrainingCache.html): every
//! feature column of the training set is sorted once, and each node scans the
//! sorted columns restricted to its own samples to find the split that
//! minimizes the sum of squared deviations of the targets.
//!
//! # Example
//! ```rust
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use taxi_fare::config::Loss;
//! use taxi_fare::decision_tree::{Data, DecisionTree, TrainingCache};
//!
//! let dv = vec![
//!     Data::new_training_data(vec![1.0, 2.0], 1.0, 2.0),
//!     Data::new_training_data(vec![1.1, 2.1], 1.0, 1.0),
//!     Data::new_training_data(vec![2.0, 2.0], 1.0, 0.5),
//!     Data::new_training_data(vec![2.0, 2.3], 1.0, 3.0),
//! ];
//!
//! let mut tree = DecisionTree::new();
//! tree.set_feature_size(2);
//! tree.set_max_depth(2);
//! tree.set_min_leaf_size(1);
//! tree.set_loss(Loss::SquaredError);
//!
//! let mut cache = TrainingCache::get_cache(2, &dv);
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! tree.fit(&dv, &mut cache, &mut rng);
//! assert_eq!(tree.predict(&dv).len(), 4);
//! ```

use crate::binary_tree::{BinaryTree, BinaryTreeNode, TreeIndex};
use crate::config::Loss;
use crate::fitness::almost_equal;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use std::cmp::Ordering;

macro_rules! def_value_type {
    ($t: tt) => {
        pub type ValueType = $t;
        pub const VALUE_TYPE_MAX: ValueType = std::$t::MAX;
        pub const VALUE_TYPE_MIN: ValueType = std::$t::MIN;
        /// Marks a feature value that is missing. Sorts before every real value.
        pub const VALUE_TYPE_UNKNOWN: ValueType = VALUE_TYPE_MIN;
    };
}

def_value_type!(f32);

/// One sample fed to a tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Data {
    /// the vector of features
    pub feature: Vec<ValueType>,
    /// the value fit by the next tree. The boosting process sets it from the
    /// current residuals.
    pub target: ValueType,
    /// sample's weight
    pub weight: ValueType,
    /// the actual value of the sample
    pub label: ValueType,
    /// `label` minus the current prediction. Used by the LAD loss.
    pub residual: ValueType,
}

impl Data {
    /// Build a training sample. `target` and `residual` start as the label.
    pub fn new_training_data(feature: Vec<ValueType>, weight: ValueType, label: ValueType) -> Self {
        Data {
            feature,
            target: label,
            weight,
            label,
            residual: label,
        }
    }

    /// Build a sample to predict. The label is optional.
    pub fn new_test_data(feature: Vec<ValueType>, label: Option<ValueType>) -> Self {
        Data {
            feature,
            target: 0.0,
            weight: 1.0,
            label: label.unwrap_or(0.0),
            residual: 0.0,
        }
    }
}

pub type DataVec = Vec<Data>;
pub type PredVec = Vec<ValueType>;

struct ImpurityCache {
    /// sum of target * weight
    sum_s: f64,
    /// sum of target * target * weight
    sum_ss: f64,
    /// sum of weight
    sum_c: f64,
    cached: bool,
    /// whether a sample belongs to the current node
    bool_vec: Vec<bool>,
}

impl ImpurityCache {
    fn new(sample_size: usize, train_data: &[usize]) -> Self {
        let mut bool_vec: Vec<bool> = vec![false; sample_size];
        for index in train_data.iter() {
            bool_vec[*index] = true;
        }
        ImpurityCache {
            sum_s: 0.0,
            sum_ss: 0.0,
            sum_c: 0.0,
            cached: false,
            bool_vec,
        }
    }
}

struct CacheValue {
    /// target * weight
    s: f64,
    /// target * target * weight
    ss: f64,
    /// weight
    c: f64,
}

/// State shared by every tree trained on the same data set.
pub struct TrainingCache {
    /// ordered_features[i] holds (sample index, value of feature i) sorted by value.
    ordered_features: Vec<Vec<(usize, ValueType)>>,
    cache_value: Vec<CacheValue>,
    cache_target: Vec<ValueType>,
    cache_residual: Vec<ValueType>,
    sample_size: usize,
    feature_size: usize,
    /// Prediction of the last fitted tree for every training sample.
    preds: Vec<ValueType>,
}

impl TrainingCache {
    /// Sort every feature column of `data`. Do this once per training set.
    pub fn get_cache(feature_size: usize, data: &DataVec) -> Self {
        let sample_size = data.len();
        let cache_value = data
            .iter()
            .map(|elem| CacheValue {
                s: 0.0,
                ss: 0.0,
                c: f64::from(elem.weight),
            })
            .collect();

        TrainingCache {
            ordered_features: TrainingCache::cache_features(data, feature_size),
            cache_value,
            cache_target: vec![0.0; sample_size],
            cache_residual: vec![0.0; sample_size],
            sample_size,
            feature_size,
            preds: vec![VALUE_TYPE_UNKNOWN; sample_size],
        }
    }

    /// Predictions computed for the training samples while fitting the last tree.
    /// Samples outside the fitted subset keep `VALUE_TYPE_UNKNOWN`.
    pub fn get_preds(&self) -> Vec<ValueType> {
        self.preds.to_vec()
    }

    fn init_one_iteration(&mut self, whole_data: &[Data]) {
        for (index, data) in whole_data.iter().enumerate() {
            self.cache_target[index] = data.target;
            self.cache_residual[index] = data.residual;
            let weight = f64::from(data.weight);
            let target = f64::from(data.target);
            let s = target * weight;
            self.cache_value[index].s = s;
            self.cache_value[index].ss = target * s;
            self.cache_value[index].c = weight;
        }
        for pred in self.preds.iter_mut() {
            *pred = VALUE_TYPE_UNKNOWN;
        }
    }

    fn cache_features(whole_data: &[Data], feature_size: usize) -> Vec<Vec<(usize, ValueType)>> {
        let mut ordered_features: Vec<Vec<(usize, ValueType)>> = (0..feature_size)
            .map(|_| Vec::with_capacity(whole_data.len()))
            .collect();

        for (i, item) in whole_data.iter().enumerate() {
            for (index, ordered_item) in ordered_features.iter_mut().enumerate() {
                ordered_item.push((i, item.feature[index]));
            }
        }

        for item in ordered_features.iter_mut() {
            item.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        }
        ordered_features
    }

    /// The sorted column of `feature_index`, restricted to the samples flagged in `in_node`.
    fn sorted_subset(
        &self,
        feature_index: usize,
        in_node: &[bool],
        node_size: usize,
    ) -> Vec<(usize, ValueType)> {
        let column = &self.ordered_features[feature_index];
        if column.len() == node_size {
            return column.to_vec();
        }
        let mut ret = Vec::with_capacity(node_size);
        for &(index, value) in column.iter() {
            if in_node[index] {
                ret.push((index, value));
            }
        }
        ret
    }
}

fn calculate_pred(data: &[usize], loss: &Loss, cache: &TrainingCache) -> ValueType {
    match loss {
        Loss::SquaredError => average(data, cache),
        Loss::LAD => lad_optimal_value(data, cache),
    }
}

fn average(data: &[usize], cache: &TrainingCache) -> ValueType {
    let mut sum: f64 = 0.0;
    let mut weight: f64 = 0.0;
    for index in data.iter() {
        let cv: &CacheValue = &cache.cache_value[*index];
        sum += cv.s;
        weight += cv.c;
    }
    if weight.abs() < 1e-10 {
        0.0
    } else {
        (sum / weight) as ValueType
    }
}

// weighted median of the residuals
fn lad_optimal_value(data: &[usize], cache: &TrainingCache) -> ValueType {
    let mut sorted: Vec<(ValueType, f64)> = data
        .iter()
        .map(|index| (cache.cache_residual[*index], cache.cache_value[*index].c))
        .collect();
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let all_weight: f64 = sorted.iter().map(|x| x.1).sum();
    let mut weight: f64 = 0.0;
    for (i, &(residual, w)) in sorted.iter().enumerate() {
        weight += w;
        if weight * 2.0 > all_weight {
            return residual;
        }
        // the median sits between two samples
        if (weight * 2.0 - all_weight).abs() < 1e-10 && i + 1 < sorted.len() {
            return (residual + sorted[i + 1].0) / 2.0;
        }
    }
    0.0
}

fn same(iv: &[usize], cache: &TrainingCache) -> bool {
    if iv.is_empty() {
        return false;
    }
    let t: ValueType = cache.cache_target[iv[0]];
    iv.iter()
        .skip(1)
        .all(|i| almost_equal(t, cache.cache_target[*i]))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DTNode {
    feature_index: usize,
    feature_value: ValueType,
    /// Returned for leaves, and for samples whose split feature is unknown.
    pred: ValueType,
    is_leaf: bool,
}

impl DTNode {
    fn new() -> Self {
        DTNode {
            feature_index: 0,
            feature_value: 0.0,
            pred: 0.0,
            is_leaf: false,
        }
    }
}

/// A regression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    tree: BinaryTree<DTNode>,
    feature_size: usize,
    max_depth: u32,
    min_leaf_size: usize,
    loss: Loss,
    feature_sample_ratio: f64,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        DecisionTree {
            tree: BinaryTree::new(),
            feature_size: 1,
            max_depth: 2,
            min_leaf_size: 1,
            loss: Loss::SquaredError,
            feature_sample_ratio: 1.0,
        }
    }

    pub fn set_feature_size(&mut self, size: usize) {
        self.feature_size = size;
    }

    pub fn set_max_depth(&mut self, max_depth: u32) {
        self.max_depth = max_depth;
    }

    pub fn set_min_leaf_size(&mut self, min_leaf_size: usize) {
        self.min_leaf_size = min_leaf_size;
    }

    pub fn set_loss(&mut self, loss: Loss) {
        self.loss = loss;
    }

    pub fn set_feature_sample_ratio(&mut self, feature_sample_ratio: f64) {
        self.feature_sample_ratio = feature_sample_ratio;
    }

    /// Fit the tree on the samples of `train_data` listed in `subset`.
    ///
    /// `cache` must have been built from `train_data`.
    pub fn fit_n<R: Rng>(
        &mut self,
        train_data: &DataVec,
        subset: &[usize],
        cache: &mut TrainingCache,
        rng: &mut R,
    ) {
        assert!(
            self.feature_size == cache.feature_size,
            "Decision_tree and TrainingCache should have same feature size"
        );
        cache.init_one_iteration(train_data);

        self.tree = BinaryTree::new();
        let root_index = self.tree.add_root(BinaryTreeNode::new(DTNode::new()));
        self.fit_node(root_index, 0, subset, cache, rng);
    }

    /// Fit the tree on the whole `train_data`.
    pub fn fit<R: Rng>(&mut self, train_data: &DataVec, cache: &mut TrainingCache, rng: &mut R) {
        let data_collection: Vec<usize> = (0..train_data.len()).collect();
        self.fit_n(train_data, &data_collection, cache, rng);
    }

    fn fit_node<R: Rng>(
        &mut self,
        node: TreeIndex,
        depth: u32,
        train_data: &[usize],
        cache: &mut TrainingCache,
        rng: &mut R,
    ) {
        let pred = calculate_pred(train_data, &self.loss, cache);
        let stop = (depth >= self.max_depth)
            || same(train_data, cache)
            || (train_data.len() <= self.min_leaf_size);

        let splited_data = if stop {
            None
        } else {
            DecisionTree::split(
                train_data,
                self.feature_size,
                self.feature_sample_ratio,
                cache,
                rng,
            )
        };

        for index in train_data.iter() {
            cache.preds[*index] = pred;
        }

        let (left_data, right_data, feature_index, feature_value) = match splited_data {
            Some(split) => split,
            None => {
                if let Some(node_ref) = self.tree.get_node_mut(node) {
                    node_ref.value.pred = pred;
                    node_ref.value.is_leaf = true;
                }
                return;
            }
        };

        if let Some(node_ref) = self.tree.get_node_mut(node) {
            node_ref.value.pred = pred;
            node_ref.value.feature_index = feature_index;
            node_ref.value.feature_value = feature_value;
        }

        let left_index = self
            .tree
            .add_left_node(node, BinaryTreeNode::new(DTNode::new()));
        self.fit_node(left_index, depth + 1, &left_data, cache, rng);
        let right_index = self
            .tree
            .add_right_node(node, BinaryTreeNode::new(DTNode::new()));
        self.fit_node(right_index, depth + 1, &right_data, cache, rng);
    }

    /// Predict the samples of `test_data` listed in `subset`. Other positions are 0.
    pub fn predict_n(&self, test_data: &DataVec, subset: &[usize]) -> PredVec {
        let mut ret = vec![0.0; test_data.len()];
        for index in subset {
            ret[*index] = self.predict_one(&test_data[*index]);
        }
        ret
    }

    pub fn predict(&self, test_data: &DataVec) -> PredVec {
        test_data.iter().map(|x| self.predict_one(x)).collect()
    }

    /// Walk from the root down to a leaf. A sample whose split feature is
    /// unknown stops at the current node.
    pub fn predict_one(&self, sample: &Data) -> ValueType {
        let mut node = match self.tree.get_root() {
            Some(root) => root,
            None => return 0.0,
        };
        loop {
            if node.value.is_leaf {
                return node.value.pred;
            }
            let value = match sample.feature.get(node.value.feature_index) {
                Some(v) => *v,
                None => return node.value.pred,
            };
            let next = if value == VALUE_TYPE_UNKNOWN {
                None
            } else if value < node.value.feature_value {
                self.tree.get_left_child(node)
            } else {
                self.tree.get_right_child(node)
            };
            match next {
                Some(child) => node = child,
                None => return node.value.pred,
            }
        }
    }

    /// Find the best (feature, threshold) for the node holding `train_data`.
    ///
    /// Return the left samples, the right samples, the feature index and the
    /// threshold. Samples with an unknown value go to neither side.
    fn split<R: Rng>(
        train_data: &[usize],
        feature_size: usize,
        feature_sample_ratio: f64,
        cache: &TrainingCache,
        rng: &mut R,
    ) -> Option<(Vec<usize>, Vec<usize>, usize, ValueType)> {
        let mut fs = feature_size;
        let mut fv: Vec<usize> = (0..feature_size).collect();
        if feature_sample_ratio < 1.0 {
            fs = ((feature_sample_ratio * (feature_size as f64)) as usize).max(1);
            fv.shuffle(rng);
        }

        let mut impurity_cache = ImpurityCache::new(cache.sample_size, train_data);
        let mut best_fitness: f64 = std::f64::MAX;
        let mut best: Option<(usize, ValueType, Vec<(usize, ValueType)>)> = None;

        for i in fv.iter().take(fs) {
            let (impurity, value, sorted_data) =
                DecisionTree::get_impurity(train_data, *i, cache, &mut impurity_cache);
            if best_fitness > impurity {
                best_fitness = impurity;
                best = Some((*i, value, sorted_data));
            }
        }

        let (index, value, data_to_split) = best?;
        let mut left: Vec<usize> = Vec::new();
        let mut right: Vec<usize> = Vec::new();
        for &(item_index, feature_value) in data_to_split.iter() {
            if feature_value == VALUE_TYPE_UNKNOWN {
                continue;
            } else if feature_value < value {
                left.push(item_index);
            } else {
                right.push(item_index);
            }
        }
        if left.is_empty() || right.is_empty() {
            None
        } else {
            Some((left, right, index, value))
        }
    }

    /// Scan one sorted feature column and return (impurity, threshold, column).
    /// The impurity is `f64::MAX` when the column cannot be split.
    fn get_impurity(
        train_data: &[usize],
        feature_index: usize,
        cache: &TrainingCache,
        impurity_cache: &mut ImpurityCache,
    ) -> (f64, ValueType, Vec<(usize, ValueType)>) {
        let mut impurity = std::f64::MAX;
        let mut threshold = VALUE_TYPE_UNKNOWN;
        let sorted_data =
            cache.sorted_subset(feature_index, &impurity_cache.bool_vec, train_data.len());

        // unknown values sort first
        let mut unknown: usize = 0;
        let mut s: f64 = 0.0;
        let mut ss: f64 = 0.0;
        let mut c: f64 = 0.0;
        for &(index, feature_value) in sorted_data.iter() {
            if feature_value != VALUE_TYPE_UNKNOWN {
                break;
            }
            let cv: &CacheValue = &cache.cache_value[index];
            s += cv.s;
            ss += cv.ss;
            c += cv.c;
            unknown += 1;
        }

        if unknown == sorted_data.len() {
            return (impurity, threshold, sorted_data);
        }

        let fitness0 = if c > 1.0 { (ss - s * s / c).max(0.0) } else { 0.0 };

        if !impurity_cache.cached {
            impurity_cache.sum_s = 0.0;
            impurity_cache.sum_ss = 0.0;
            impurity_cache.sum_c = 0.0;
            for index in train_data.iter() {
                let cv: &CacheValue = &cache.cache_value[*index];
                impurity_cache.sum_s += cv.s;
                impurity_cache.sum_ss += cv.ss;
                impurity_cache.sum_c += cv.c;
            }
            impurity_cache.cached = true;
        }

        let mut ls: f64 = 0.0;
        let mut lss: f64 = 0.0;
        let mut lc: f64 = 0.0;
        let mut rs: f64 = impurity_cache.sum_s - s;
        let mut rss: f64 = impurity_cache.sum_ss - ss;
        let mut rc: f64 = impurity_cache.sum_c - c;

        for i in unknown..(sorted_data.len() - 1) {
            let (index, f1) = sorted_data[i];
            let (_, f2) = sorted_data[i + 1];
            let cv: &CacheValue = &cache.cache_value[index];

            ls += cv.s;
            lss += cv.ss;
            lc += cv.c;

            rs -= cv.s;
            rss -= cv.ss;
            rc -= cv.c;

            if almost_equal(f1, f2) {
                continue;
            }

            let fitness1 = if lc > 1.0 { (lss - ls * ls / lc).max(0.0) } else { 0.0 };
            let fitness2 = if rc > 1.0 { (rss - rs * rs / rc).max(0.0) } else { 0.0 };
            let fitness = fitness0 + fitness1 + fitness2;

            if impurity > fitness {
                impurity = fitness;
                threshold = (f1 + f2) / 2.0;
            }
        }

        (impurity, threshold, sorted_data)
    }

    /// Render the nodes of the tree, see
    /// [BinaryTree::dump](../binary_tree/struct.BinaryTree.html#method.dump).
    pub fn dump(&self) -> String {
        self.tree.dump()
    }

    pub fn print(&self) {
        self.tree.print();
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
