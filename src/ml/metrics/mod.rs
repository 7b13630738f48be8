//! 回帰モデル評価のためのメトリクス

pub mod regression;

pub use regression::{mean_squared_error, root_mean_squared_error};
