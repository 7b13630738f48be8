//! 回帰予測の誤差指標

use crate::error::{Error, Result};

/// 予測値と観測値の平均二乗誤差（Mean Squared Error）
///
/// # Arguments
/// * `predicted` - 予測値
/// * `actual` - 観測値（`predicted` と同じ順序）
///
/// # Errors
/// 長さが異なれば `LengthMismatch`、空なら `EmptyInput`。
pub fn mean_squared_error(predicted: &[f64], actual: &[f64]) -> Result<f64> {
    if predicted.len() != actual.len() {
        return Err(Error::LengthMismatch {
            expected: predicted.len(),
            actual: actual.len(),
        });
    }

    if predicted.is_empty() {
        return Err(Error::EmptyInput(
            "cannot compute an error metric over zero observations".to_string(),
        ));
    }

    let sum_squared_error = predicted
        .iter()
        .zip(actual)
        .map(|(&p, &a)| {
            let error = p - a;
            error * error
        })
        .sum::<f64>();

    Ok(sum_squared_error / predicted.len() as f64)
}

/// 二乗平均平方根誤差 `sqrt(mean((predicted - actual)^2))`
///
/// 入力の検証は [`mean_squared_error`] と同じ。
pub fn root_mean_squared_error(predicted: &[f64], actual: &[f64]) -> Result<f64> {
    let mse = mean_squared_error(predicted, actual)?;
    Ok(mse.sqrt())
}
