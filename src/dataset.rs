//! Raw Well Dataset Loader
//!
//! Parses the raw well export (an Excel workbook or CSV, one row per well)
//! into a column-addressable table. Cells are kept as text and parsed on
//! demand, because which columns are numeric, categorical or dropped is
//! decided by configuration, not by the file.
//!
//! Workbooks (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`) are read from their
//! first sheet; any other extension is parsed as CSV.
//!
//! # Usage
//!
//! ```ignore
//! use npv_predictor::dataset::RawDataset;
//!
//! let raw = RawDataset::load("data/raw/wells.xlsx")?;
//! let npv = raw.numeric_column("NPV")?;
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("raw data file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read raw data: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("raw data is empty (no header or no data rows)")]
    Empty,
    #[error("line {line}: expected {expected} fields, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("duplicate column '{0}' in header")]
    DuplicateColumn(String),
    #[error("column '{0}' not found in raw data")]
    MissingColumn(String),
    #[error("row {row}, column '{column}': cannot parse '{value}' as a number")]
    NotNumeric {
        row: usize,
        column: String,
        value: String,
    },
}

// ============================================================================
// CSV Quote-Aware Parsing
// ============================================================================

/// Split a CSV line respecting quoted fields (handles commas inside quotes).
/// Returns owned strings because quoted fields need unquoting.
fn csv_split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    // Escaped quote ("")
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

// ============================================================================
// Workbook Cells
// ============================================================================

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)))
}

/// Text form of a cell, matching what the same value reads as in CSV.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn check_header(header: &[String]) -> Result<(), DatasetError> {
    for (i, name) in header.iter().enumerate() {
        if header[..i].contains(name) {
            return Err(DatasetError::DuplicateColumn(name.clone()));
        }
    }
    Ok(())
}

// ============================================================================
// Raw Dataset
// ============================================================================

/// Tabular raw input: a header plus rectangular rows of text cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawDataset {
    /// Load a workbook or CSV file, chosen by extension. Missing files and
    /// files without data rows are errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DatasetError::NotFound(path.to_path_buf()));
        }
        let workbook = is_workbook(path);
        let dataset = if workbook {
            Self::from_workbook(path)?
        } else {
            Self::from_reader(BufReader::new(File::open(path)?))?
        };
        debug!(
            path = %path.display(),
            workbook,
            rows = dataset.n_rows(),
            columns = dataset.columns.len(),
            "Raw dataset loaded"
        );
        Ok(dataset)
    }

    /// Read the first sheet of a workbook. The first non-blank row is the
    /// header; blank rows are skipped.
    pub fn from_workbook(path: &Path) -> Result<Self, DatasetError> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook.worksheet_range_at(0).ok_or(DatasetError::Empty)??;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|cell| !cell.is_empty()));

        let header = rows.next().ok_or(DatasetError::Empty)?;
        check_header(&header)?;

        let rows: Vec<Vec<String>> = rows.collect();
        if rows.is_empty() {
            return Err(DatasetError::Empty);
        }

        Ok(Self {
            columns: header,
            rows,
        })
    }

    /// Parse CSV from any buffered reader. Blank lines are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, DatasetError> {
        let mut lines = reader.lines().enumerate();

        let header = loop {
            match lines.next() {
                Some((_, line)) => {
                    let line = line?;
                    let line = line.trim_start_matches('\u{feff}');
                    if !line.trim().is_empty() {
                        break csv_split(line);
                    }
                }
                None => return Err(DatasetError::Empty),
            }
        };

        check_header(&header)?;

        let mut rows = Vec::new();
        for (idx, line) in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = csv_split(&line);
            if fields.len() != header.len() {
                return Err(DatasetError::RaggedRow {
                    line: idx + 1,
                    expected: header.len(),
                    found: fields.len(),
                });
            }
            rows.push(fields);
        }

        if rows.is_empty() {
            return Err(DatasetError::Empty);
        }

        Ok(Self {
            columns: header,
            rows,
        })
    }

    /// Column names in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn require(&self, name: &str) -> Result<usize, DatasetError> {
        self.column_index(name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    }

    /// Parse every cell of a column as `f64`. Empty or non-numeric cells fail.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, DatasetError> {
        let idx = self.require(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row, fields)| {
                let raw = &fields[idx];
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| DatasetError::NotNumeric {
                        row: row + 1,
                        column: name.to_string(),
                        value: raw.clone(),
                    })
            })
            .collect()
    }

    /// Return a column's raw text cells.
    pub fn text_column(&self, name: &str) -> Result<Vec<String>, DatasetError> {
        let idx = self.require(name)?;
        Ok(self.rows.iter().map(|fields| fields[idx].clone()).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
