//! 列指向の数値データフレーム
//!
//! すべての列は `f64` の値を持ち、行数は全列で共通。
//! 列名は [`Schema`] を通して解決されるため、綴りを誤った列名は
//! 空のデータではなくエラーになる。

pub mod schema;

pub use schema::Schema;

use crate::error::{Error, Result};

/// 名前付き列を持つ数値テーブル
#[derive(Debug, Clone, Default)]
pub struct DataFrame {
    schema: Schema,
    columns: Vec<Vec<f64>>,
    row_count: usize,
}

impl DataFrame {
    /// 空のDataFrameを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// `(列名, 値)` の組から順序を保ってDataFrameを作成
    pub fn from_columns<S, I>(columns: I) -> Result<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Vec<f64>)>,
    {
        let mut df = DataFrame::new();
        for (name, values) in columns {
            df.add_column(name, values)?;
        }
        Ok(df)
    }

    /// 列を追加する。最初の列が行数を決める
    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        if !self.columns.is_empty() && values.len() != self.row_count {
            return Err(Error::InconsistentRowCount {
                expected: self.row_count,
                found: values.len(),
            });
        }

        self.schema.push(name)?;
        if self.columns.is_empty() {
            self.row_count = values.len();
        }
        self.columns.push(values);
        Ok(())
    }

    /// 指定した列の値
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        let idx = self.schema.index_of(name)?;
        Ok(&self.columns[idx])
    }

    /// [`DataFrame::schema`] の位置 `idx` にある列の値
    pub fn column_at(&self, idx: usize) -> Result<&[f64]> {
        self.columns
            .get(idx)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::ColumnNotFound(format!("#{}", idx)))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn column_names(&self) -> &[String] {
        self.schema.names()
    }

    pub fn nrows(&self) -> usize {
        self.row_count
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// 指定した列に NaN があれば最初のものを `MissingValue` として返す
    pub fn ensure_complete<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        for name in names {
            let name = name.as_ref();
            if let Some(row) = self.column(name)?.iter().position(|v| v.is_nan()) {
                return Err(Error::MissingValue {
                    column: name.to_string(),
                    row,
                });
            }
        }
        Ok(())
    }

    /// いずれかの列が NaN の行を削除し、削除した行数を返す
    pub fn drop_na(&mut self) -> usize {
        let keep: Vec<usize> = (0..self.row_count)
            .filter(|&row| self.columns.iter().all(|col| !col[row].is_nan()))
            .collect();
        let removed = self.row_count - keep.len();
        if removed > 0 {
            for col in &mut self.columns {
                *col = keep.iter().map(|&i| col[i]).collect();
            }
            self.row_count = keep.len();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        DataFrame::from_columns(vec![
            ("x", vec![1.0, 2.0, 3.0, 4.0]),
            ("y", vec![2.0, 4.0, 6.0, 8.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_add_column_checks_length() {
        let mut df = sample();
        let err = df.add_column("z", vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::InconsistentRowCount {
                expected: 4,
                found: 1
            }
        ));
        assert_eq!(df.ncols(), 2);
    }

    #[test]
    fn test_drop_na() {
        let mut df = DataFrame::from_columns(vec![
            ("a", vec![1.0, f64::NAN, 3.0]),
            ("b", vec![1.0, 2.0, f64::NAN]),
        ])
        .unwrap();
        assert!(matches!(
            df.ensure_complete(&["a"]),
            Err(Error::MissingValue { row: 1, .. })
        ));

        assert_eq!(df.drop_na(), 2);
        assert_eq!(df.nrows(), 1);
        assert!(df.ensure_complete(&["a", "b"]).is_ok());
    }
}
