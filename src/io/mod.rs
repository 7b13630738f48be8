pub mod csv;

// よく使う関数の再エクスポート
pub use csv::{read_csv, read_csv_from_reader, write_csv, write_csv_to_writer, CsvReadOptions};
