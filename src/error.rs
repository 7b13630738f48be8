use thiserror::Error;

/// クレート全体のエラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid partition: cannot split {rows} rows into {folds} folds (need 2 <= folds <= rows)")]
    InvalidPartition { folds: usize, rows: usize },

    #[error("Invalid fold label {fold}: labels run from 1 to {folds}")]
    InvalidFold { fold: usize, folds: usize },

    #[error("Length mismatch: expected {expected}, found {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Empty {partition} partition for fold {fold}")]
    EmptyFold {
        fold: usize,
        partition: Partition,
    },

    #[error("Singular design matrix: {0}")]
    SingularDesign(String),

    #[error("Model '{model}' failed on fold {fold}: {source}")]
    FoldEvaluation {
        model: String,
        fold: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Duplicate column name: {0}")]
    DuplicateColumnName(String),

    #[error("Inconsistent row count: expected {expected}, found {found}")]
    InconsistentRowCount { expected: usize, found: usize },

    #[error("Missing value in column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cannot parse '{value}' in column '{column}' at row {row} as a number")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error")]
    Io(#[source] std::io::Error),

    #[error("CSV error")]
    Csv(#[source] csv::Error),

    #[error("JSON error")]
    Json(#[source] serde_json::Error),
}

/// [`Error::EmptyFold`] が学習側・検証側のどちらかを示す
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Train,
    Test,
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Partition::Train => write!(f, "training"),
            Partition::Test => write!(f, "test"),
        }
    }
}

impl Error {
    /// 分割ごとの失敗を、発生したモデルと分割の情報で包む
    pub fn in_fold(self, model: &str, fold: usize) -> Self {
        Error::FoldEvaluation {
            model: model.to_string(),
            fold,
            source: Box::new(self),
        }
    }

    /// `FoldEvaluation` を取り除いた最も内側のエラー
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::FoldEvaluation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Resultの型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}
