//! # lmfold
//!
//! 数値データ上の複数の線形回帰モデルを、k分割交差検証のRMSEで比較する。
//! 全データで推定したAIC/BICも併せて得られる。
//!
//! ```rust
//! use lmfold::{cross_validate, DataFrame, ModelSpec};
//!
//! let temp: Vec<f64> = (0..30).map(|i| 10.0 + (i % 7) as f64).collect();
//! let depth: Vec<f64> = (0..30).map(|i| (i * 10) as f64).collect();
//! let o2sat: Vec<f64> = temp
//!     .iter()
//!     .zip(&depth)
//!     .map(|(t, d)| 120.0 - 1.5 * t - 0.05 * d)
//!     .collect();
//! let df = DataFrame::from_columns(vec![("temp", temp), ("depth", depth), ("o2sat", o2sat)]).unwrap();
//!
//! let specs = vec![
//!     ModelSpec::from_formula("temp_only", "o2sat ~ temp").unwrap(),
//!     ModelSpec::from_formula("temp_depth", "o2sat ~ temp + depth").unwrap(),
//! ];
//! let result = cross_validate(&df, 10, 2021, &specs).unwrap();
//! for (name, rmse) in result.mean_scores() {
//!     println!("{}: {:.3}", name, rmse);
//! }
//! ```

pub mod config;
pub mod dataframe;
pub mod error;
pub mod io;
pub mod ml;
pub mod stats;

// よく使う型の再エクスポート
pub use config::{CrossValidationConfig, CrossValidationConfigBuilder, ExperimentConfig};
pub use dataframe::DataFrame;
pub use error::{Error, Result};
pub use ml::model_selection::{
    compare_models, cross_validate, evaluate_fold, CrossValidationResult, CrossValidator,
    ModelSpec,
};
pub use stats::sampling::{assign_folds, FoldAssignment};

// バージョン情報
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
