//! CSV ingestion
//!
//! Reads delimited text into a [`Dataset`]. A column is numeric when every
//! non-empty cell parses as a number, text otherwise; empty cells become
//! missing values.

use crate::dataset::{Column, Dataset, DatasetError};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while reading an uploaded file
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File is not valid {encoding} text; try another encoding")]
    Decode { encoding: Encoding },

    #[error("CSV error on record {record}: {message}. Try another delimiter or encoding")]
    Parse { record: usize, message: String },

    #[error("CSV has no header row")]
    NoHeader,

    #[error("Invalid table: {0}")]
    Table(#[from] DatasetError),

    #[error("Unsupported encoding '{0}' (expected utf-8, latin1, iso-8859-1 or cp1252)")]
    UnknownEncoding(String),

    #[error("Delimiter must be a single byte, got '{0}'")]
    InvalidDelimiter(String),
}

/// Text encoding of an uploaded CSV file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Encoding {
    #[default]
    Utf8,
    /// ISO-8859-1
    Latin1,
    /// Windows-1252
    Cp1252,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "latin1",
            Encoding::Cp1252 => "cp1252",
        })
    }
}

impl FromStr for Encoding {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" => Ok(Encoding::Latin1),
            "cp1252" | "windows-1252" => Ok(Encoding::Cp1252),
            _ => Err(IngestError::UnknownEncoding(s.to_string())),
        }
    }
}

impl TryFrom<String> for Encoding {
    type Error = IngestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Encoding> for String {
    fn from(value: Encoding) -> Self {
        value.to_string()
    }
}

// Windows-1252 code points for bytes 0x80..=0x9F; the rest match Latin-1.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

impl Encoding {
    /// Decode raw bytes into a string
    pub fn decode(self, bytes: &[u8]) -> Result<String, IngestError> {
        match self {
            Encoding::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                String::from_utf8(bytes.to_vec())
                    .map_err(|_| IngestError::Decode { encoding: self })
            }
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Encoding::Cp1252 => Ok(bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
                    _ => char::from(b),
                })
                .collect()),
        }
    }
}

/// Options for reading a CSV upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field delimiter (`,`, `;` or tab in practice)
    #[serde(with = "delimiter_serde")]
    pub delimiter: u8,
    pub encoding: Encoding,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: Encoding::Utf8,
        }
    }
}

/// Parse a delimiter given on the command line or in config (`\t` and
/// `tab` both mean tab)
pub fn parse_delimiter(s: &str) -> Result<u8, IngestError> {
    match s {
        "\\t" | "tab" | "\t" => Ok(b'\t'),
        _ if s.len() == 1 => Ok(s.as_bytes()[0]),
        _ => Err(IngestError::InvalidDelimiter(s.to_string())),
    }
}

mod delimiter_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u8, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&char::from(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_delimiter(&s).map_err(serde::de::Error::custom)
    }
}

/// Read a CSV file from disk
pub fn read_csv_file<P: AsRef<Path>>(path: P, options: CsvOptions) -> Result<Dataset, IngestError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_csv_bytes(&bytes, options)
}

/// Read CSV content from raw bytes
pub fn read_csv_bytes(bytes: &[u8], options: CsvOptions) -> Result<Dataset, IngestError> {
    let text = options.encoding.decode(bytes)?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::Parse {
            record: 0,
            message: e.to_string(),
        })?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(IngestError::NoHeader);
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| IngestError::Parse {
            record: idx + 1,
            message: e.to_string(),
        })?;
        for (column, value) in cells.iter_mut().zip(record.iter()) {
            column.push(value.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| infer_column(name, raw))
        .collect();

    let dataset = Dataset::from_columns(columns)?;
    tracing::debug!(
        columns = dataset.columns().len(),
        rows = dataset.row_count(),
        "CSV ingested"
    );
    Ok(dataset)
}

/// Finite numbers only; "inf" and "nan" spellings count as missing
fn parse_number(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|x| x.is_finite())
}

fn is_missing(cell: &str) -> bool {
    cell.is_empty()
        || cell.eq_ignore_ascii_case("na")
        || cell.parse::<f64>().is_ok_and(|x| !x.is_finite())
}

fn infer_column(name: String, raw: Vec<String>) -> Column {
    let numeric = raw
        .iter()
        .all(|cell| is_missing(cell) || parse_number(cell).is_some());

    if numeric {
        let values = raw
            .iter()
            .map(|cell| if is_missing(cell) { None } else { parse_number(cell) })
            .collect();
        Column::numeric(name, values)
    } else {
        let values = raw
            .into_iter()
            .map(|cell| (!cell.is_empty()).then_some(cell))
            .collect();
        Column::text(name, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ColumnData;

    #[test]
    fn test_read_comma_csv() {
        let csv = "name,a,b\nx,1.5,2\ny,2.5,\nz,3.5,4\n";
        let ds = read_csv_bytes(csv.as_bytes(), CsvOptions::default()).unwrap();
        assert_eq!(ds.column_names(), vec!["name", "a", "b"]);
        assert_eq!(ds.numeric_column_names(), vec!["a", "b"]);
        assert_eq!(ds.numeric_values("b").unwrap(), vec![2.0, 4.0]);
        assert_eq!(ds.row_count(), 3);
    }

    #[test]
    fn test_infinite_cells_are_missing() {
        let csv = "x\n1\ninf\n-Infinity\nNaN\n4\n";
        let ds = read_csv_bytes(csv.as_bytes(), CsvOptions::default()).unwrap();
        assert_eq!(ds.numeric_column_names(), vec!["x"]);
        assert_eq!(ds.numeric_values("x").unwrap(), vec![1.0, 4.0]);
        assert_eq!(ds.row_count(), 5);
    }

    #[test]
    fn test_read_semicolon_csv() {
        let csv = "a;b\n1;2\n3;4\n";
        let options = CsvOptions {
            delimiter: b';',
            ..CsvOptions::default()
        };
        let ds = read_csv_bytes(csv.as_bytes(), options).unwrap();
        assert_eq!(ds.numeric_values("b").unwrap(), vec![2.0, 4.0]);
    }

    #[test]
    fn test_wrong_delimiter_yields_single_text_column() {
        let csv = "a;b\n1;2\n";
        let ds = read_csv_bytes(csv.as_bytes(), CsvOptions::default()).unwrap();
        assert_eq!(ds.column_names(), vec!["a;b"]);
        assert!(ds.numeric_column_names().is_empty());
    }

    #[test]
    fn test_ragged_rows_are_parse_errors() {
        let csv = "a,b\n1,2\n3\n";
        let err = read_csv_bytes(csv.as_bytes(), CsvOptions::default()).unwrap_err();
        assert!(matches!(err, IngestError::Parse { .. }));
        assert!(err.to_string().contains("delimiter"));
    }

    #[test]
    fn test_latin1_decoding() {
        // "café" in Latin-1
        let bytes = b"name,v\ncaf\xE9,1\n";
        let err = read_csv_bytes(bytes, CsvOptions::default()).unwrap_err();
        assert!(matches!(err, IngestError::Decode { .. }));

        let options = CsvOptions {
            encoding: Encoding::Latin1,
            ..CsvOptions::default()
        };
        let ds = read_csv_bytes(bytes, options).unwrap();
        match &ds.column("name").unwrap().data {
            ColumnData::Text(v) => assert_eq!(v[0].as_deref(), Some("café")),
            ColumnData::Numeric(_) => panic!("expected text column"),
        }
    }

    #[test]
    fn test_cp1252_euro_sign() {
        assert_eq!(Encoding::Cp1252.decode(b"\x80").unwrap(), "€");
        assert_eq!(Encoding::Latin1.decode(b"\x80").unwrap(), "\u{80}");
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!("ISO-8859-1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert_eq!("utf-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("windows-1252".parse::<Encoding>().unwrap(), Encoding::Cp1252);
        assert!("ebcdic".parse::<Encoding>().is_err());
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter("\\t").unwrap(), b'\t');
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert!(parse_delimiter(",,").is_err());
    }

    #[test]
    fn test_na_cells_are_missing() {
        let csv = "v\n1\nNA\nnan\n4\n";
        let ds = read_csv_bytes(csv.as_bytes(), CsvOptions::default()).unwrap();
        assert_eq!(ds.numeric_values("v").unwrap(), vec![1.0, 4.0]);
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let bytes = b"\xEF\xBB\xBFa\n1\n";
        let ds = read_csv_bytes(bytes, CsvOptions::default()).unwrap();
        assert_eq!(ds.column_names(), vec!["a"]);
    }
}
