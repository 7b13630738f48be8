//! CSVファイルの読み書き

use csv::{ReaderBuilder, Trim, Writer};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::dataframe::DataFrame;
use crate::error::{Error, Result};

/// [`read_csv`] のオプション
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    /// 読み込む列（この順序で並ぶ）。`None` なら全列
    pub columns: Option<Vec<String>>,
    /// 欠損値とみなすセルの文字列（前後の空白を除いて比較）
    pub na_values: Vec<String>,
    pub delimiter: u8,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        CsvReadOptions {
            columns: None,
            na_values: vec!["".into(), "NA".into(), "NaN".into()],
            delimiter: b',',
        }
    }
}

impl CsvReadOptions {
    /// 指定した列だけを読み込む
    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn is_na(&self, cell: &str) -> bool {
        self.na_values.iter().any(|na| na == cell)
    }
}

/// ヘッダー行付きのCSVファイルを数値のDataFrameとして読み込む
///
/// 読み込む列のいずれかに欠損値を含む行は除外される。`nan` と書かれたセルも
/// 欠損値として扱い、`inf` などの無限大は [`Error::Parse`] になる。
pub fn read_csv<P: AsRef<Path>>(path: P, options: &CsvReadOptions) -> Result<DataFrame> {
    let file = File::open(path.as_ref())?;
    read_csv_from_reader(file, options)
}

/// 任意のリーダーから読み込む [`read_csv`]
pub fn read_csv_from_reader<R: Read>(reader: R, options: &CsvReadOptions) -> Result<DataFrame> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();

    // 読み込む列ごとに (列名, レコード内の位置)
    let kept: Vec<(String, usize)> = match &options.columns {
        Some(wanted) => wanted
            .iter()
            .map(|name| {
                headers
                    .iter()
                    .position(|h| h == name)
                    .map(|pos| (name.clone(), pos))
                    .ok_or_else(|| Error::ColumnNotFound(name.clone()))
            })
            .collect::<Result<_>>()?,
        None => headers.iter().cloned().zip(0..).collect(),
    };

    let mut values: Vec<Vec<f64>> = vec![Vec::new(); kept.len()];

    for (row, record) in rdr.records().enumerate() {
        let record = record?;

        for ((name, pos), col) in kept.iter().zip(values.iter_mut()) {
            let cell = record.get(*pos).unwrap_or("");
            let value = if options.is_na(cell) {
                f64::NAN
            } else {
                parse_cell(cell, row, name)?
            };
            col.push(value);
        }
    }

    let mut df = DataFrame::new();
    for ((name, _), col) in kept.into_iter().zip(values) {
        df.add_column(name, col)?;
    }

    let dropped = df.drop_na();
    if dropped > 0 {
        log::warn!("Dropped {} rows with missing values while reading CSV", dropped);
    }
    log::debug!("Loaded CSV with {} rows and {} columns", df.nrows(), df.ncols());
    Ok(df)
}

/// 数値セルを解析する。NaN はそのまま返し、無限大はエラーにする
fn parse_cell(cell: &str, row: usize, column: &str) -> Result<f64> {
    match cell.parse::<f64>() {
        Ok(v) if v.is_infinite() => Err(Error::Parse {
            row,
            column: column.to_string(),
            value: cell.to_string(),
        }),
        Ok(v) => Ok(v),
        Err(_) => Err(Error::Parse {
            row,
            column: column.to_string(),
            value: cell.to_string(),
        }),
    }
}

/// DataFrameをヘッダー行付きのCSVファイルに書き出す
pub fn write_csv<P: AsRef<Path>>(df: &DataFrame, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_csv_to_writer(df, file)
}

/// 任意のライターに書き出す [`write_csv`]
pub fn write_csv_to_writer<W: Write>(df: &DataFrame, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(df.column_names())?;

    let columns = (0..df.ncols())
        .map(|idx| df.column_at(idx))
        .collect::<Result<Vec<_>>>()?;

    for row in 0..df.nrows() {
        wtr.write_record(columns.iter().map(|col| col[row].to_string()))?;
    }

    wtr.flush()?;
    Ok(())
}
