//! [`DataFrame`](super::DataFrame) の列名と位置の対応

use crate::error::{Error, Result};
use std::collections::HashMap;

/// 重複のない列名の順序付き集合（名前からの検索は O(1)）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しい列名を登録し、その位置を返す
    pub fn push(&mut self, name: impl Into<String>) -> Result<usize> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("column name must not be empty".into()));
        }
        if self.positions.contains_key(&name) {
            return Err(Error::DuplicateColumnName(name));
        }

        let idx = self.names.len();
        self.positions.insert(name.clone(), idx);
        self.names.push(name);
        Ok(idx)
    }

    /// `name` の位置。存在しなければ `ColumnNotFound`
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.positions
            .get(name)
            .copied()
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// 複数の列名をまとめて解決する。最初の未知の列名でエラー
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        names.iter().map(|n| self.index_of(n.as_ref())).collect()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_resolve() {
        let mut schema = Schema::new();
        assert_eq!(schema.push("temp").unwrap(), 0);
        assert_eq!(schema.push("salinity").unwrap(), 1);

        assert_eq!(schema.resolve(&["salinity", "temp"]).unwrap(), vec![1, 0]);
        assert!(matches!(
            schema.index_of("salnity"),
            Err(Error::ColumnNotFound(name)) if name == "salnity"
        ));
    }

    #[test]
    fn test_duplicate_and_blank_names_rejected() {
        let mut schema = Schema::new();
        schema.push("o2sat").unwrap();
        assert!(matches!(schema.push("o2sat"), Err(Error::DuplicateColumnName(_))));
        assert!(matches!(schema.push("  "), Err(Error::InvalidInput(_))));
        assert_eq!(schema.names(), &["o2sat".to_string()]);
    }
}
