//! 統計モジュール
//!
//! 最小二乗回帰と、交差検証で使う無作為な分割割り当てを提供する。

pub mod regression;
pub mod sampling;

use crate::dataframe::DataFrame;
use crate::error::Result;

pub use regression::LinearRegressionResult;
pub use sampling::{assign_folds, FoldAssignment};

/// `y_column` を `x_columns` に線形回帰する
///
/// # Example
/// ```rust
/// use lmfold::dataframe::DataFrame;
/// use lmfold::stats;
///
/// let df = DataFrame::from_columns(vec![
///     ("x1", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
///     ("x2", vec![2.0, 1.0, 4.0, 3.0, 6.0]),
///     ("y", vec![3.0, 5.0, 7.0, 9.0, 11.0]),
/// ])
/// .unwrap();
///
/// let model = stats::linear_regression(&df, "y", &["x1", "x2"]).unwrap();
/// println!("intercept: {}", model.intercept);
/// println!("coefficients: {:?}", model.coefficients);
/// println!("AIC: {}", model.aic());
/// ```
pub fn linear_regression<S: AsRef<str>>(
    df: &DataFrame,
    y_column: &str,
    x_columns: &[S],
) -> Result<LinearRegressionResult> {
    regression::linear_regression(df, y_column, x_columns)
}
