//! k分割交差検証のための無作為な分割割り当て

use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

/// データセットの各行の分割ラベル
///
/// ラベルは `1` から `folds` まで。各行はちょうど1つのラベルを持ち、
/// ラベルごとの行数の差は高々1。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoldAssignment {
    labels: Vec<usize>,
    folds: usize,
}

/// `n` 行を `k` 個の分割に割り当てる
///
/// `1, 2, ..., k, 1, 2, ...` を `n` 個で切り詰め、シード付きで並べ替える。
/// 同じ `(n, k, seed)` からは常に同じ割り当てが得られる。
pub fn assign_folds(n: usize, k: usize, seed: u64) -> Result<FoldAssignment> {
    if k < 2 || k > n {
        return Err(Error::InvalidPartition { folds: k, rows: n });
    }

    let mut labels: Vec<usize> = (0..n).map(|i| i % k + 1).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    labels.shuffle(&mut rng);

    Ok(FoldAssignment { labels, folds: k })
}

impl FoldAssignment {
    /// 既存のラベルから割り当てを作成する（ラベルの範囲を検証）
    pub fn from_labels(labels: Vec<usize>, folds: usize) -> Result<Self> {
        if folds < 2 || folds > labels.len() {
            return Err(Error::InvalidPartition {
                folds,
                rows: labels.len(),
            });
        }
        if let Some(&bad) = labels.iter().find(|&&l| l == 0 || l > folds) {
            return Err(Error::InvalidFold { fold: bad, folds });
        }
        Ok(FoldAssignment { labels, folds })
    }

    /// 行ごとの分割ラベル
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// 分割数
    pub fn folds(&self) -> usize {
        self.folds
    }

    /// 行数
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// 分割ごとの行数（添字0が分割1）
    pub fn fold_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.folds];
        for &label in &self.labels {
            sizes[label - 1] += 1;
        }
        sizes
    }

    /// ラベルが `fold` の行
    pub fn test_indices(&self, fold: usize) -> Result<Vec<usize>> {
        self.check_fold(fold)?;
        Ok(self.rows_where(|label| label == fold))
    }

    /// ラベルが `fold` 以外の行
    pub fn train_indices(&self, fold: usize) -> Result<Vec<usize>> {
        self.check_fold(fold)?;
        Ok(self.rows_where(|label| label != fold))
    }

    /// `fold` に対する `(学習, 検証)` の行番号
    pub fn split(&self, fold: usize) -> Result<(Vec<usize>, Vec<usize>)> {
        self.check_fold(fold)?;
        let (test, train): (Vec<usize>, Vec<usize>) =
            (0..self.labels.len()).partition(|&row| self.labels[row] == fold);
        Ok((train, test))
    }

    fn check_fold(&self, fold: usize) -> Result<()> {
        if fold == 0 || fold > self.folds {
            return Err(Error::InvalidFold {
                fold,
                folds: self.folds,
            });
        }
        Ok(())
    }

    fn rows_where(&self, pred: impl Fn(usize) -> bool) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|&(_, &label)| pred(label))
            .map(|(row, _)| row)
            .collect()
    }
}
