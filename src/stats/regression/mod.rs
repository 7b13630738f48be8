//! 最小二乗法による線形回帰
//!
//! 正規方程式 `(X^T X)^-1 X^T y` で `y = b0 + b1*x1 + ... + bp*xp` を推定する。
//! `X^T X` の逆行列は部分ピボット選択付きのガウス・ジョルダン法で求める。

use crate::dataframe::DataFrame;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 対角スケーリング後のピボットがこの値以下なら特異とみなす
const SINGULAR_TOLERANCE: f64 = 1e-10;

/// 線形回帰の結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressionResult {
    /// 目的変数の列名
    pub response: String,
    /// 説明変数の列名（係数と同じ順序）
    pub predictors: Vec<String>,
    /// 切片
    pub intercept: f64,
    /// 各説明変数の係数
    pub coefficients: Vec<f64>,
    /// 標準誤差（切片が先頭）。残差自由度がない場合は `None`
    pub std_errors: Option<Vec<f64>>,
    /// 決定係数
    pub r_squared: f64,
    /// 自由度調整済み決定係数。残差自由度がない場合は NaN
    pub adj_r_squared: f64,
    /// 残差平方和
    pub rss: f64,
    /// 推定に使った観測数
    pub n_obs: usize,
    /// 学習行での予測値
    pub fitted_values: Vec<f64>,
    /// 学習行での残差
    pub residuals: Vec<f64>,
}

impl LinearRegressionResult {
    /// 推定パラメータ数（切片と誤差分散を含む）
    pub fn n_params(&self) -> usize {
        self.coefficients.len() + 2
    }

    /// 誤差分散の最尤推定値における正規対数尤度
    pub fn log_likelihood(&self) -> f64 {
        let n = self.n_obs as f64;
        -0.5 * n * ((2.0 * PI).ln() + (self.rss / n).ln() + 1.0)
    }

    /// 赤池情報量規準（AIC）
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.n_params() as f64
    }

    /// ベイズ情報量規準（BIC）
    pub fn bic(&self) -> f64 {
        -2.0 * self.log_likelihood() + (self.n_obs as f64).ln() * self.n_params() as f64
    }

    /// 指定した行の目的変数を予測する
    pub fn predict_rows(&self, df: &DataFrame, rows: &[usize]) -> Result<Vec<f64>> {
        let columns = predictor_columns(df, &self.predictors)?;

        rows.iter()
            .map(|&row| {
                let mut pred = self.intercept;
                for ((name, col), coef) in self.predictors.iter().zip(&columns).zip(&self.coefficients) {
                    let x = value_at(col, name, row)?;
                    pred += coef * x;
                }
                Ok(pred)
            })
            .collect()
    }
}

/// `df` の全行を使って `y_column` を `x_columns` に回帰する
pub fn linear_regression<S: AsRef<str>>(
    df: &DataFrame,
    y_column: &str,
    x_columns: &[S],
) -> Result<LinearRegressionResult> {
    let rows: Vec<usize> = (0..df.nrows()).collect();
    linear_regression_rows(df, y_column, x_columns, &rows)
}

/// `df` の指定した行だけを使って線形回帰を行う
pub fn linear_regression_rows<S: AsRef<str>>(
    df: &DataFrame,
    y_column: &str,
    x_columns: &[S],
    rows: &[usize],
) -> Result<LinearRegressionResult> {
    if x_columns.is_empty() {
        return Err(Error::InvalidInput(
            "regression needs at least one predictor".into(),
        ));
    }

    let predictors: Vec<String> = x_columns.iter().map(|s| s.as_ref().to_string()).collect();
    let y_source = df.column(y_column)?;
    let x_sources = predictor_columns(df, &predictors)?;

    let n = rows.len();
    let p = predictors.len();
    if n < p + 1 {
        return Err(Error::SingularDesign(format!(
            "{} observations cannot determine {} coefficients",
            n,
            p + 1
        )));
    }

    let y_values = rows
        .iter()
        .map(|&row| value_at(y_source, y_column, row))
        .collect::<Result<Vec<f64>>>()?;

    // 列優先の計画行列（先頭は切片用の列）
    let mut x_matrix: Vec<Vec<f64>> = Vec::with_capacity(p + 1);
    x_matrix.push(vec![1.0; n]);
    for (name, col) in predictors.iter().zip(&x_sources) {
        let values = rows
            .iter()
            .map(|&row| value_at(col, name, row))
            .collect::<Result<Vec<f64>>>()?;
        x_matrix.push(values);
    }

    let xt_x = matrix_multiply_transpose(&x_matrix, &x_matrix);
    let xt_x_inv = matrix_inverse(&xt_x)?;
    let xt_y = vec_multiply_transpose(&x_matrix, &y_values);

    let beta: Vec<f64> = xt_x_inv
        .iter()
        .map(|row| row.iter().zip(&xt_y).map(|(a, b)| a * b).sum::<f64>())
        .collect();

    let intercept = beta[0];
    let coefficients = beta[1..].to_vec();

    let fitted_values: Vec<f64> = (0..n)
        .map(|i| {
            intercept
                + coefficients
                    .iter()
                    .zip(&x_matrix[1..])
                    .map(|(b, col)| b * col[i])
                    .sum::<f64>()
        })
        .collect();

    let residuals: Vec<f64> = y_values
        .iter()
        .zip(&fitted_values)
        .map(|(&y, &y_hat)| y - y_hat)
        .collect();

    let y_mean = y_values.iter().sum::<f64>() / n as f64;
    let ss_total: f64 = y_values.iter().map(|&y| (y - y_mean).powi(2)).sum();
    let rss: f64 = residuals.iter().map(|r| r * r).sum();

    let r_squared = if ss_total == 0.0 {
        if rss == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - rss / ss_total
    };

    let df_resid = n - p - 1;
    let (adj_r_squared, std_errors) = if df_resid > 0 {
        let adj = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df_resid as f64;
        (adj, Some(calculate_std_errors(&xt_x_inv, rss, df_resid)))
    } else {
        (f64::NAN, None)
    };

    log::debug!(
        "OLS fit of '{}' on {:?}: n={}, rss={:.6}, r2={:.4}",
        y_column,
        predictors,
        n,
        rss,
        r_squared
    );

    Ok(LinearRegressionResult {
        response: y_column.to_string(),
        predictors,
        intercept,
        coefficients,
        std_errors,
        r_squared,
        adj_r_squared,
        rss,
        n_obs: n,
        fitted_values,
        residuals,
    })
}

fn predictor_columns<'a>(df: &'a DataFrame, names: &[String]) -> Result<Vec<&'a [f64]>> {
    names.iter().map(|name| df.column(name)).collect()
}

fn value_at(col: &[f64], name: &str, row: usize) -> Result<f64> {
    match col.get(row) {
        Some(v) if v.is_nan() => Err(Error::MissingValue {
            column: name.to_string(),
            row,
        }),
        Some(&v) => Ok(v),
        None => Err(Error::InvalidInput(format!(
            "row index {} out of bounds for {} rows",
            row,
            col.len()
        ))),
    }
}

/// 列優先行列の A^T * B
fn matrix_multiply_transpose(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    a.iter()
        .map(|ai| {
            b.iter()
                .map(|bj| ai.iter().zip(bj).map(|(x, y)| x * y).sum::<f64>())
                .collect()
        })
        .collect()
}

/// 列優先行列の A^T * y
fn vec_multiply_transpose(a: &[Vec<f64>], y: &[f64]) -> Vec<f64> {
    a.iter()
        .map(|ai| ai.iter().zip(y).map(|(x, v)| x * v).sum::<f64>())
        .collect()
}

/// ガウス・ジョルダン法による対称正定値行列の逆行列
///
/// `D = sqrt(diag(A))` として `D^-1 A D^-1` を反転し、最後にスケールを戻す。
/// 説明変数の桁が大きく異なっても、ピボットの判定は各列の大きさに依存しない。
fn matrix_inverse(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let n = matrix.len();

    if n == 0 {
        return Err(Error::InvalidInput("matrix is empty".into()));
    }
    if matrix.iter().any(|row| row.len() != n) {
        return Err(Error::InvalidInput("matrix must be square".into()));
    }

    let scale: Vec<f64> = matrix.iter().enumerate().map(|(i, row)| row[i].sqrt()).collect();
    if let Some(col) = scale.iter().position(|d| !(*d > 0.0) || !d.is_finite()) {
        return Err(Error::SingularDesign(format!(
            "X^T X is rank deficient (column {} has no variation from zero)",
            col
        )));
    }

    // 拡大行列 [D^-1 A D^-1 | I]
    let mut augmented: Vec<Vec<f64>> = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut aug = Vec::with_capacity(2 * n);
            aug.extend(row.iter().zip(&scale).map(|(v, dj)| v / (scale[i] * dj)));
            aug.extend((0..n).map(|j| if i == j { 1.0 } else { 0.0 }));
            aug
        })
        .collect();

    for i in 0..n {
        // 部分ピボット選択
        let (max_row, max_val) = (i..n)
            .map(|r| (r, augmented[r][i].abs()))
            .fold((i, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });

        if !(max_val > SINGULAR_TOLERANCE) {
            return Err(Error::SingularDesign(format!(
                "X^T X is rank deficient (scaled pivot {:e} at column {})",
                max_val, i
            )));
        }

        augmented.swap(i, max_row);

        let pivot = augmented[i][i];
        for v in augmented[i].iter_mut() {
            *v /= pivot;
        }

        let pivot_row = augmented[i].clone();
        for (j, row) in augmented.iter_mut().enumerate() {
            if j != i {
                let factor = row[i];
                if factor != 0.0 {
                    for (v, pv) in row.iter_mut().zip(&pivot_row) {
                        *v -= factor * pv;
                    }
                }
            }
        }
    }

    Ok(augmented
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            row[n..]
                .iter()
                .zip(&scale)
                .map(|(v, dj)| v / (scale[i] * dj))
                .collect()
        })
        .collect())
}

/// 係数の標準誤差（切片が先頭）
fn calculate_std_errors(xt_x_inv: &[Vec<f64>], rss: f64, df_resid: usize) -> Vec<f64> {
    let sigma2 = rss / df_resid as f64;
    xt_x_inv
        .iter()
        .enumerate()
        .map(|(i, row)| (sigma2 * row[i]).sqrt())
        .collect()
}
