//! モデルの評価と選択
//!
//! 回帰予測の誤差指標と、競合する線形モデルのk分割交差検証を提供する。

pub mod metrics;
pub mod model_selection;

pub use model_selection::{
    compare_models, cross_validate, evaluate_fold, CrossValidationResult, CrossValidator,
    ModelComparison, ModelScore, ModelSpec,
};
