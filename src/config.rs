//! This module implements the configuration of the fare predictor: the
//! boosting parameters and the application settings (paths, split, filters).
//!
//! The configuration is built once at startup and handed to every stage.

use crate::decision_tree::ValueType;
use crate::errors::Result;
use serde_derive::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Loss minimized by the boosting process.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Loss {
    /// Leaves predict the mean residual.
    SquaredError,
    /// Least absolute deviation. Leaves predict the weighted median residual.
    LAD,
}

impl Default for Loss {
    fn default() -> Self {
        Loss::SquaredError
    }
}

pub fn string2loss(s: &str) -> Loss {
    match s {
        "SquaredError" => Loss::SquaredError,
        "LAD" => Loss::LAD,
        _ => Loss::SquaredError,
    }
}

pub fn loss2string(l: &Loss) -> String {
    match l {
        Loss::SquaredError => String::from("SquaredError"),
        Loss::LAD => String::from("LAD"),
    }
}

/// Parameters of the gradient boosted regression trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostConfig {
    /// Width of the feature vector. Set by the trainer once the pipeline is fit.
    pub feature_size: usize,
    pub max_depth: u32,
    pub iterations: usize,
    pub shrinkage: ValueType,
    pub feature_sample_ratio: f64,
    pub data_sample_ratio: f64,
    pub min_leaf_size: usize,
    pub loss: Loss,
    pub debug: bool,
    pub seed: u64,
}

impl Default for BoostConfig {
    fn default() -> Self {
        BoostConfig {
            feature_size: 0,
            max_depth: 5,
            iterations: 100,
            shrinkage: 0.2,
            feature_sample_ratio: 1.0,
            data_sample_ratio: 1.0,
            min_leaf_size: 10,
            loss: Loss::SquaredError,
            debug: false,
            seed: 1,
        }
    }
}

impl BoostConfig {
    pub fn new() -> BoostConfig {
        BoostConfig::default()
    }

    pub fn set_feature_size(&mut self, n: usize) {
        self.feature_size = n;
    }

    pub fn set_max_depth(&mut self, n: u32) {
        self.max_depth = n;
    }

    pub fn set_iterations(&mut self, n: usize) {
        self.iterations = n;
    }

    pub fn set_shrinkage(&mut self, n: ValueType) {
        self.shrinkage = n;
    }

    pub fn set_feature_sample_ratio(&mut self, n: f64) {
        self.feature_sample_ratio = n;
    }

    pub fn set_data_sample_ratio(&mut self, n: f64) {
        self.data_sample_ratio = n;
    }

    pub fn set_min_leaf_size(&mut self, n: usize) {
        self.min_leaf_size = n;
    }

    pub fn set_loss(&mut self, l: &str) {
        self.loss = string2loss(l);
    }

    pub fn set_debug(&mut self, option: bool) {
        self.debug = option;
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    pub fn to_string(&self) -> String {
        let mut s = String::from("");
        s.push_str(&format!("number of features = {}\n", self.feature_size));
        s.push_str(&format!("min leaf size = {}\n", self.min_leaf_size));
        s.push_str(&format!("maximum depth = {}\n", self.max_depth));
        s.push_str(&format!("iterations = {}\n", self.iterations));
        s.push_str(&format!("shrinkage = {}\n", self.shrinkage));
        s.push_str(&format!(
            "feature sample ratio = {}\n",
            self.feature_sample_ratio
        ));
        s.push_str(&format!("data sample ratio = {}\n", self.data_sample_ratio));
        s.push_str(&format!("debug enabled = {}\n", self.debug));
        s.push_str(&format!("loss type = {}\n", loss2string(&self.loss)));
        s.push_str(&format!("seed = {}\n", self.seed));
        s
    }
}

/// Settings of the whole batch run.
///
/// Relative paths are resolved against a base directory with
/// [resolve](struct.AppConfig.html#method.resolve).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Raw training data.
    pub data_path: PathBuf,
    /// Where the cleaned copy of `data_path` is written.
    pub cleaned_path: PathBuf,
    pub model_path: PathBuf,
    /// Fraction of the filtered records held out for evaluation.
    pub test_fraction: f64,
    /// Seed for the shuffle and the train/test split.
    pub seed: u64,
    /// Payment type marking records that are dropped before training.
    pub unknown_payment_type: String,
    pub min_fare: f32,
    pub max_fare: f32,
    pub min_passenger_count: f32,
    /// Field used by the frequency report.
    pub frequency_field: String,
    pub boost: BoostConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_path: PathBuf::from("data/taxi-fare-train.csv"),
            cleaned_path: PathBuf::from("data/taxi-fare-train-clean.csv"),
            model_path: PathBuf::from("models/taxi-fare-model.bin"),
            test_fraction: 0.2,
            seed: 1,
            unknown_payment_type: String::from("UNK"),
            min_fare: 1.0,
            max_fare: 150.0,
            min_passenger_count: 1.0,
            frequency_field: String::from("PaymentType"),
            boost: BoostConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read the configuration from a JSON file. Missing keys take their
    /// default value. If the file doesn't exist the default configuration is
    /// returned.
    ///
    /// # Example
    /// ```rust
    /// use taxi_fare::config::AppConfig;
    /// let cfg = AppConfig::load_or_default("no/such/taxi-fare.json").unwrap();
    /// assert_eq!(cfg, AppConfig::default());
    /// ```
    ///
    /// # Error
    /// Raise error if the file exists but cannot be read or parsed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        info!(path = %path.display(), "Loading configuration");
        let content = fs::read_to_string(path)?;
        let cfg: AppConfig = serde_json::from_str(&content)?;
        Ok(cfg)
    }

    /// Make every relative path absolute with respect to `base`.
    pub fn resolve<P: AsRef<Path>>(mut self, base: P) -> AppConfig {
        let base = base.as_ref();
        rebase(base, &mut self.data_path);
        rebase(base, &mut self.cleaned_path);
        rebase(base, &mut self.model_path);
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn rebase(base: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        *path = base.join(path.as_path());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loss_type() {
        assert_eq!(string2loss("SquaredError"), Loss::SquaredError);
        assert_eq!(string2loss("LAD"), Loss::LAD);
        assert_eq!(string2loss("whatever"), Loss::SquaredError);

        assert_eq!(loss2string(&Loss::SquaredError), "SquaredError");
        assert_eq!(loss2string(&Loss::LAD), "LAD");
    }

    #[test]
    fn boost_config_to_string() {
        let mut cfg = BoostConfig::new();
        cfg.set_feature_size(7);
        cfg.set_loss("LAD");
        let s = cfg.to_string();
        assert!(s.contains("number of features = 7\n"));
        assert!(s.contains("loss type = LAD\n"));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .unwrap();
        writeln!(file, r#"{{"seed": 42, "boost": {{"iterations": 5}}}}"#).unwrap();

        let cfg = AppConfig::load_or_default(file.path()).unwrap();
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.boost.iterations, 5);
        assert_eq!(cfg.boost.max_depth, BoostConfig::default().max_depth);
        assert_eq!(cfg.unknown_payment_type, "UNK");
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();
        assert!(AppConfig::load_or_default(file.path()).is_err());
    }

    #[test]
    fn resolve_only_touches_relative_paths() {
        let mut cfg = AppConfig::default();
        cfg.model_path = PathBuf::from("/tmp/model.bin");
        let cfg = cfg.resolve("/opt/taxi");
        assert_eq!(
            cfg.data_path,
            PathBuf::from("/opt/taxi/data/taxi-fare-train.csv")
        );
        assert_eq!(cfg.model_path, PathBuf::from("/tmp/model.bin"));
    }

    #[test]
    fn json_round_trip() {
        let cfg = AppConfig::default();
        let json = cfg.to_json().unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
