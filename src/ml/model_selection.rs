//! k分割交差検証によるモデル選択
//!
//! 各候補 [`ModelSpec`] を分割ごとの学習データで再推定し、検証データに
//! 対する予測のRMSEで評価する。候補の順位は分割平均のRMSEで決まる。
//! [`compare_models`] は同じ候補を全データのAIC/BICで比較する。

use crate::config::CrossValidationConfig;
use crate::dataframe::DataFrame;
use crate::error::{Error, Partition, Result};
use crate::ml::metrics::root_mean_squared_error;
use crate::stats::regression::{linear_regression, linear_regression_rows};
use crate::stats::sampling::{assign_folds, FoldAssignment};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// 式の項に含まれると列名として扱えない文字
const UNSUPPORTED_TERM_CHARS: &[char] = &['*', ':', '^', '(', ')', '|', '~'];

/// 名前付きの線形モデル（目的変数1つと順序付きの説明変数）
///
/// 切片は常に含まれ、説明変数の一覧には現れない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSpec {
    name: String,
    response: String,
    predictors: Vec<String>,
}

impl ModelSpec {
    /// モデルを作成する。空・重複・目的変数と同じ説明変数はエラー
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        response: impl Into<String>,
        predictors: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let name = name.into();
        let response = response.into();
        let predictors: Vec<String> = predictors.into_iter().map(Into::into).collect();

        if name.trim().is_empty() {
            return Err(Error::InvalidInput("model name must not be empty".into()));
        }
        if response.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "model '{}' has an empty response",
                name
            )));
        }
        if predictors.is_empty() {
            return Err(Error::InvalidInput(format!(
                "model '{}' needs at least one predictor",
                name
            )));
        }

        let mut seen = HashSet::new();
        for predictor in &predictors {
            if predictor.trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "model '{}' has an empty predictor",
                    name
                )));
            }
            if *predictor == response {
                return Err(Error::InvalidInput(format!(
                    "model '{}' uses its response '{}' as a predictor",
                    name, response
                )));
            }
            if !seen.insert(predictor.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "model '{}' lists predictor '{}' twice",
                    name, predictor
                )));
            }
        }

        Ok(ModelSpec {
            name,
            response,
            predictors,
        })
    }

    /// `response ~ x1 + x2 + ...` 形式の式を解析
    pub fn from_formula(name: impl Into<String>, formula: &str) -> Result<Self> {
        let (lhs, rhs) = formula.split_once('~').ok_or_else(|| {
            Error::InvalidInput(format!("formula '{}' has no '~'", formula))
        })?;

        let mut terms = Vec::new();
        for term in std::iter::once(lhs).chain(rhs.split('+')) {
            let term = term.trim();
            if term.is_empty()
                || term.contains(char::is_whitespace)
                || term.contains(UNSUPPORTED_TERM_CHARS)
            {
                return Err(Error::InvalidInput(format!(
                    "unsupported term '{}' in formula '{}'",
                    term, formula
                )));
            }
            terms.push(term);
        }

        let response = terms.remove(0);
        ModelSpec::new(name, response, terms)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn predictors(&self) -> &[String] {
        &self.predictors
    }

    /// モデルを式として表した文字列
    pub fn formula(&self) -> String {
        format!("{} ~ {}", self.response, self.predictors.join(" + "))
    }

    /// モデルが参照する全列（目的変数が先頭）
    pub fn fields(&self) -> Vec<&str> {
        std::iter::once(self.response.as_str())
            .chain(self.predictors.iter().map(String::as_str))
            .collect()
    }

    /// 全列が `df` に存在し、欠損値を含まないことを確認
    pub fn validate_against(&self, df: &DataFrame) -> Result<()> {
        let fields = self.fields();
        df.schema().resolve(&fields)?;
        df.ensure_complete(&fields)
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.formula())
    }
}

impl FromStr for ModelSpec {
    type Err = Error;

    /// `name: response ~ x1 + x2` を解析する。名前がなければ式そのものを名前にする
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((name, formula)) => ModelSpec::from_formula(name.trim(), formula),
            None => ModelSpec::from_formula(s.trim(), s),
        }
    }
}

/// `fold` 以外の行で `spec` を推定し、`fold` の行でのRMSEを返す
pub fn evaluate_fold(
    df: &DataFrame,
    assignment: &FoldAssignment,
    fold: usize,
    spec: &ModelSpec,
) -> Result<f64> {
    if assignment.len() != df.nrows() {
        return Err(Error::LengthMismatch {
            expected: df.nrows(),
            actual: assignment.len(),
        });
    }

    let (train, test) = assignment.split(fold)?;
    if train.is_empty() {
        return Err(Error::EmptyFold {
            fold,
            partition: Partition::Train,
        });
    }
    if test.is_empty() {
        return Err(Error::EmptyFold {
            fold,
            partition: Partition::Test,
        });
    }

    let fit = linear_regression_rows(df, spec.response(), spec.predictors(), &train)?;
    let predicted = fit.predict_rows(df, &test)?;

    let response = df.column(spec.response())?;
    let actual: Vec<f64> = test.iter().map(|&row| response[row]).collect();

    let rmse = root_mean_squared_error(&predicted, &actual)?;
    log::debug!(
        "Model '{}' fold {}: train={} test={} rmse={:.6}",
        spec.name(),
        fold,
        train.len(),
        test.len(),
        rmse
    );
    Ok(rmse)
}

/// 1モデル分の交差検証スコア
#[derive(Debug, Clone, Serialize)]
pub struct ModelScore {
    /// モデル名
    pub name: String,
    /// モデル式
    pub formula: String,
    /// 分割ごとのRMSE（添字0が分割1）
    pub fold_scores: Vec<f64>,
    /// `fold_scores` の平均
    pub mean_rmse: f64,
}

impl ModelScore {
    fn new(spec: &ModelSpec, fold_scores: Vec<f64>) -> Self {
        let mean_rmse = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
        ModelScore {
            name: spec.name().to_string(),
            formula: spec.formula(),
            fold_scores,
            mean_rmse,
        }
    }

    /// 分割RMSEの標本標準偏差
    pub fn std_rmse(&self) -> f64 {
        let k = self.fold_scores.len();
        if k < 2 {
            return 0.0;
        }
        let var = self
            .fold_scores
            .iter()
            .map(|s| (s - self.mean_rmse).powi(2))
            .sum::<f64>()
            / (k - 1) as f64;
        var.sqrt()
    }
}

/// 交差検証の結果（入力順にモデルごとのスコア）
#[derive(Debug, Clone, Serialize)]
pub struct CrossValidationResult {
    pub folds: usize,
    pub seed: u64,
    pub scores: Vec<ModelScore>,
}

impl CrossValidationResult {
    /// モデル名から平均RMSEへの対応
    pub fn mean_scores(&self) -> BTreeMap<String, f64> {
        self.scores
            .iter()
            .map(|s| (s.name.clone(), s.mean_rmse))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&ModelScore> {
        self.scores.iter().find(|s| s.name == name)
    }

    /// 平均RMSEが最小のモデル。同値なら先のモデル
    pub fn best(&self) -> Option<&ModelScore> {
        self.scores.iter().fold(None, |best: Option<&ModelScore>, s| match best {
            Some(b) if b.mean_rmse <= s.mean_rmse => Some(b),
            _ => Some(s),
        })
    }

    /// 平均RMSEの昇順に並べたスコア
    pub fn ranked(&self) -> Vec<&ModelScore> {
        let mut ranked: Vec<&ModelScore> = self.scores.iter().collect();
        ranked.sort_by(|a, b| a.mean_rmse.total_cmp(&b.mean_rmse));
        ranked
    }

    /// 分割スコアを含む結果全体を整形済みJSONにする
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 分割ごとの表を `model,fold,rmse` 形式のCSVに書き出す
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_csv_to_writer(file)
    }

    pub fn write_csv_to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(["model", "fold", "rmse"])?;
        for score in &self.scores {
            for (i, rmse) in score.fold_scores.iter().enumerate() {
                wtr.write_record([score.name.clone(), (i + 1).to_string(), rmse.to_string()])?;
            }
        }
        wtr.flush()?;
        Ok(())
    }
}

/// 候補モデル群のk分割交差検証を実行する
#[derive(Debug, Clone, Default)]
pub struct CrossValidator {
    config: CrossValidationConfig,
}

impl CrossValidator {
    pub fn new(config: CrossValidationConfig) -> Self {
        CrossValidator { config }
    }

    pub fn config(&self) -> &CrossValidationConfig {
        &self.config
    }

    /// `n` 行のデータに対してこの検証器が使う分割割り当て
    pub fn assignment(&self, n: usize) -> Result<FoldAssignment> {
        assign_folds(n, self.config.folds, self.config.seed)
    }

    /// 分割を一度だけ割り当て、全モデルを全分割で評価する
    pub fn evaluate(&self, df: &DataFrame, specs: &[ModelSpec]) -> Result<CrossValidationResult> {
        let assignment = self.assignment(df.nrows())?;
        self.evaluate_with_assignment(df, &assignment, specs)
    }

    /// 既存の割り当ての全分割で全モデルを評価する
    pub fn evaluate_with_assignment(
        &self,
        df: &DataFrame,
        assignment: &FoldAssignment,
        specs: &[ModelSpec],
    ) -> Result<CrossValidationResult> {
        check_specs(df, specs)?;
        if assignment.len() != df.nrows() {
            return Err(Error::LengthMismatch {
                expected: df.nrows(),
                actual: assignment.len(),
            });
        }

        let k = assignment.folds();
        let jobs: Vec<(&ModelSpec, usize)> = specs
            .iter()
            .flat_map(|spec| (1..=k).map(move |fold| (spec, fold)))
            .collect();

        let run = |&(spec, fold): &(&ModelSpec, usize)| {
            evaluate_fold(df, assignment, fold, spec).map_err(|e| e.in_fold(spec.name(), fold))
        };

        let fold_scores: Vec<f64> = if self.config.parallel {
            jobs.par_iter().map(run).collect::<Result<_>>()?
        } else {
            jobs.iter().map(run).collect::<Result<_>>()?
        };

        let scores: Vec<ModelScore> = specs
            .iter()
            .zip(fold_scores.chunks(k))
            .map(|(spec, chunk)| ModelScore::new(spec, chunk.to_vec()))
            .collect();

        for score in &scores {
            log::info!(
                "Model '{}' ({}): mean RMSE {:.6} over {} folds",
                score.name,
                score.formula,
                score.mean_rmse,
                k
            );
        }

        Ok(CrossValidationResult {
            folds: k,
            seed: self.config.seed,
            scores,
        })
    }
}

/// シード付きの分割割り当てで `df` 上の `specs` をk分割交差検証する
///
/// # Example
/// ```rust
/// use lmfold::dataframe::DataFrame;
/// use lmfold::ml::model_selection::{cross_validate, ModelSpec};
///
/// let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
/// let z: Vec<f64> = (0..20).map(|i| ((i * 7) % 5) as f64).collect();
/// let y: Vec<f64> = x.iter().zip(&z).map(|(a, b)| 1.0 + 2.0 * a - b).collect();
/// let df = DataFrame::from_columns(vec![("x", x), ("z", z), ("y", y)]).unwrap();
///
/// let specs = vec![
///     ModelSpec::from_formula("small", "y ~ x").unwrap(),
///     ModelSpec::from_formula("full", "y ~ x + z").unwrap(),
/// ];
/// let result = cross_validate(&df, 5, 42, &specs).unwrap();
/// assert_eq!(result.best().unwrap().name, "full");
/// ```
pub fn cross_validate(
    df: &DataFrame,
    k: usize,
    seed: u64,
    specs: &[ModelSpec],
) -> Result<CrossValidationResult> {
    let validator = CrossValidator::new(CrossValidationConfig {
        folds: k,
        seed,
        parallel: false,
    });
    validator.evaluate(df, specs)
}

/// 1モデルの全データ推定の要約
#[derive(Debug, Clone, Serialize)]
pub struct ModelComparison {
    pub name: String,
    pub formula: String,
    /// 推定パラメータ数（切片と誤差分散を含む）
    pub n_params: usize,
    pub n_obs: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub aic: f64,
    pub bic: f64,
}

/// 全モデルを全行で推定し、R²・AIC・BICを返す
pub fn compare_models(df: &DataFrame, specs: &[ModelSpec]) -> Result<Vec<ModelComparison>> {
    check_specs(df, specs)?;
    specs
        .iter()
        .map(|spec| {
            let fit = linear_regression(df, spec.response(), spec.predictors())?;
            Ok(ModelComparison {
                name: spec.name().to_string(),
                formula: spec.formula(),
                n_params: fit.n_params(),
                n_obs: fit.n_obs,
                r_squared: fit.r_squared,
                adj_r_squared: fit.adj_r_squared,
                aic: fit.aic(),
                bic: fit.bic(),
            })
        })
        .collect()
}

fn check_specs(df: &DataFrame, specs: &[ModelSpec]) -> Result<()> {
    if specs.is_empty() {
        return Err(Error::EmptyInput("no model specifications given".into()));
    }
    let mut names = HashSet::new();
    for spec in specs {
        if !names.insert(spec.name()) {
            return Err(Error::InvalidInput(format!(
                "duplicate model name '{}'",
                spec.name()
            )));
        }
        spec.validate_against(df)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_frame(n: usize) -> DataFrame {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let w: Vec<f64> = (0..n).map(|i| ((i * 37) % 11) as f64).collect();
        let y: Vec<f64> = x.iter().zip(&w).map(|(a, b)| 3.0 + 0.5 * a + 2.0 * b).collect();
        DataFrame::from_columns(vec![("x", x), ("w", w), ("y", y)]).unwrap()
    }

    #[test]
    fn test_formula_parsing() {
        let spec = ModelSpec::from_formula("m", " o2sat ~ temp +salinity+ depth ").unwrap();
        assert_eq!(spec.response(), "o2sat");
        assert_eq!(spec.predictors(), &["temp", "salinity", "depth"]);
        assert_eq!(spec.formula(), "o2sat ~ temp + salinity + depth");

        let parsed: ModelSpec = "m2: y ~ a + b".parse().unwrap();
        assert_eq!(parsed.name(), "m2");
        assert_eq!(parsed.predictors().len(), 2);

        for bad in ["y", "y ~", "~ a", "y ~ a + ", "y ~ a * b", "y ~ a + a", "y ~ y", "y ~ a b"] {
            assert!(ModelSpec::from_formula("bad", bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_unknown_field_fails_before_fitting() {
        let df = linear_frame(20);
        let spec = ModelSpec::new("typo", "y", ["x", "ww"]).unwrap();
        assert!(matches!(
            cross_validate(&df, 5, 1, &[spec]),
            Err(Error::ColumnNotFound(name)) if name == "ww"
        ));
    }

    #[test]
    fn test_evaluate_fold_exact_fit() {
        let df = linear_frame(30);
        let assignment = assign_folds(30, 3, 5).unwrap();
        let spec = ModelSpec::new("full", "y", ["x", "w"]).unwrap();
        for fold in 1..=3 {
            let rmse = evaluate_fold(&df, &assignment, fold, &spec).unwrap();
            assert!(rmse < 1e-8, "fold {} rmse {}", fold, rmse);
        }
        assert!(matches!(
            evaluate_fold(&df, &assignment, 4, &spec),
            Err(Error::InvalidFold { fold: 4, folds: 3 })
        ));
    }

    #[test]
    fn test_evaluate_fold_empty_partitions() {
        let df = linear_frame(4);
        let spec = ModelSpec::new("m", "y", ["x"]).unwrap();

        // 分割3には行がない
        let skewed = FoldAssignment::from_labels(vec![1, 2, 1, 2], 3).unwrap();
        assert!(matches!(
            evaluate_fold(&df, &skewed, 3, &spec),
            Err(Error::EmptyFold {
                fold: 3,
                partition: Partition::Test
            })
        ));

        // 全行が分割1
        let all_one = FoldAssignment::from_labels(vec![1, 1, 1, 1], 2).unwrap();
        assert!(matches!(
            evaluate_fold(&df, &all_one, 1, &spec),
            Err(Error::EmptyFold {
                fold: 1,
                partition: Partition::Train
            })
        ));
    }

    #[test]
    fn test_assignment_length_must_match_rows() {
        let df = linear_frame(6);
        let spec = ModelSpec::new("m", "y", ["x"]).unwrap();
        let short = FoldAssignment::from_labels(vec![1, 2, 1, 2, 1], 2).unwrap();

        assert!(matches!(
            evaluate_fold(&df, &short, 1, &spec),
            Err(Error::LengthMismatch {
                expected: 6,
                actual: 5
            })
        ));
        assert!(matches!(
            CrossValidator::default().evaluate_with_assignment(&df, &short, &[spec]),
            Err(Error::LengthMismatch {
                expected: 6,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_mixed_scale_predictors_cross_validate() {
        let depth: Vec<f64> = (0..50).map(|i| i as f64 * 200.0).collect();
        let no2: Vec<f64> = (0..50).map(|i| ((7 * i) % 11) as f64 * 1e-3).collect();
        let y: Vec<f64> = depth
            .iter()
            .zip(&no2)
            .map(|(d, n)| 1.0 + 0.01 * d + 500.0 * n)
            .collect();
        let df = DataFrame::from_columns(vec![("depth", depth), ("no2", no2), ("y", y)]).unwrap();
        let spec = ModelSpec::new("m", "y", ["depth", "no2"]).unwrap();

        let result = cross_validate(&df, 5, 1, &[spec]).unwrap();
        assert!(result.scores[0].mean_rmse < 1e-8);
    }

    #[test]
    fn test_fold_failure_names_model_and_fold() {
        // `dup` は `x` の複製なので、どの分割でも特異になる
        let mut df = linear_frame(20);
        let dup = df.column("x").unwrap().to_vec();
        df.add_column("dup", dup).unwrap();

        let specs = vec![
            ModelSpec::new("ok", "y", ["x", "w"]).unwrap(),
            ModelSpec::new("collinear", "y", ["x", "dup"]).unwrap(),
        ];
        let err = cross_validate(&df, 4, 3, &specs).unwrap_err();
        match &err {
            Error::FoldEvaluation { model, fold, .. } => {
                assert_eq!(model, "collinear");
                assert_eq!(*fold, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(err.root_cause(), Error::SingularDesign(_)));
    }

    #[test]
    fn test_duplicate_names_and_empty_specs() {
        let df = linear_frame(10);
        let a = ModelSpec::new("m", "y", ["x"]).unwrap();
        let b = ModelSpec::new("m", "y", ["w"]).unwrap();
        assert!(matches!(
            cross_validate(&df, 2, 0, &[a, b]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            cross_validate(&df, 2, 0, &[]),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn test_best_and_ranked() {
        let df = linear_frame(40);
        let specs = vec![
            ModelSpec::new("x_only", "y", ["x"]).unwrap(),
            ModelSpec::new("full", "y", ["x", "w"]).unwrap(),
            ModelSpec::new("w_only", "y", ["w"]).unwrap(),
        ];
        let result = cross_validate(&df, 5, 11, &specs).unwrap();
        assert_eq!(result.best().unwrap().name, "full");
        assert_eq!(result.ranked()[0].name, "full");
        assert_eq!(result.scores[0].name, "x_only");
        assert_eq!(result.mean_scores().len(), 3);
        assert!(result.get("w_only").unwrap().fold_scores.len() == 5);
        assert!(result.get("full").unwrap().std_rmse() < 1e-8);
        assert!(result.get("x_only").unwrap().std_rmse() > 0.0);
    }

    #[test]
    fn test_compare_models_prefers_true_model() {
        let mut df = linear_frame(30);
        // 完全モデルのRSSが0にならないよう決定的なノイズを加える
        let y: Vec<f64> = df
            .column("y")
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, v)| v + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        let x = df.column("x").unwrap().to_vec();
        let w = df.column("w").unwrap().to_vec();
        df = DataFrame::from_columns(vec![("x", x), ("w", w), ("y", y)]).unwrap();

        let specs = vec![
            ModelSpec::new("x_only", "y", ["x"]).unwrap(),
            ModelSpec::new("full", "y", ["x", "w"]).unwrap(),
        ];
        let table = compare_models(&df, &specs).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[1].n_params, 4);
        assert!(table[1].aic < table[0].aic);
        assert!(table[1].bic < table[0].bic);
        assert!(table[1].r_squared > table[0].r_squared);
    }

    #[test]
    fn test_write_fold_table() {
        let df = linear_frame(12);
        let specs = vec![ModelSpec::new("m", "y", ["x", "w"]).unwrap()];
        let result = cross_validate(&df, 3, 8, &specs).unwrap();

        let mut buf = Vec::new();
        result.write_csv_to_writer(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "model,fold,rmse");
        assert_eq!(lines.len(), 4);
        assert!(lines[3].starts_with("m,3,"));

        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["folds"], 3);
        assert_eq!(json["scores"][0]["formula"], "y ~ x + w");
        assert_eq!(json["scores"][0]["fold_scores"].as_array().unwrap().len(), 3);
    }
}
