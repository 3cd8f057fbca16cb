// Decoded tabular data shared by every source

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encoding::{TextEncoding, DEFAULT_CHAIN};

/// The three tables the matrix is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Features,
    GeologicalConstraints,
    EngineeringConstraints,
}

impl TableKind {
    pub const ALL: [TableKind; 3] = [
        Self::Features,
        Self::GeologicalConstraints,
        Self::EngineeringConstraints,
    ];

    /// Table name inside a GeoPackage.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Features => "geological_features",
            Self::GeologicalConstraints => "geological_constraints",
            Self::EngineeringConstraints => "engineering_constraints",
        }
    }

    /// File name inside a CSV data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Features => "geological_data.csv",
            Self::GeologicalConstraints => "reference-geological-constraints.csv",
            Self::EngineeringConstraints => "reference-engineering-constraints.csv",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// How raw bytes become a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Encodings tried in order; first clean decode wins.
    pub encodings: Vec<TextEncoding>,
    /// Field delimiter for CSV input. `None` sniffs it from the content.
    pub delimiter: Option<u8>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            encodings: DEFAULT_CHAIN.to_vec(),
            delimiter: None,
        }
    }
}

/// A header row plus data rows, all cells decoded to text.
///
/// Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub origin: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Encoding that decoded the text, when the whole source went through one
    /// decode step (CSV). GeoPackage cells are decoded individually.
    pub encoding: Option<TextEncoding>,
}

impl RawTable {
    /// Build a table from an unclean header row. Headers are trimmed, lose
    /// any byte-order mark and are made unique (see [`unique_headers`]); rows
    /// are padded or truncated to the header width.
    pub fn new(origin: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let cleaned: Vec<String> = headers.iter().map(|h| clean_header(h)).collect();
        let headers = unique_headers(&cleaned);
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self {
            origin: origin.into(),
            headers,
            rows,
            encoding: None,
        }
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Position of the column whose cleaned header equals `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = clean_header(name);
        self.headers.iter().position(|h| *h == name)
    }

    /// Header of column `index` with the repeat suffix from [`unique_headers`]
    /// removed: `Unknown.1` after an earlier `Unknown` gives `Unknown`.
    pub fn base_header(&self, index: usize) -> &str {
        let header = &self.headers[index];
        let Some((stem, n)) = header.rsplit_once('.') else {
            return header;
        };
        if n.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()) {
            return header;
        }
        let stem = stem.to_lowercase();
        self.headers[..index]
            .iter()
            .find(|h| h.to_lowercase() == stem)
            .map_or(header.as_str(), String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Strip surrounding whitespace and every BOM character from a header.
pub fn clean_header(raw: &str) -> String {
    raw.replace('\u{feff}', "").trim().to_string()
}

/// Column names that survive a round trip through SQLite: blanks become
/// `Unnamed: N` and repeats, compared case-insensitively, get a `.N` suffix.
/// Already-unique headers come back unchanged.
pub fn unique_headers(headers: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let base = if header.is_empty() {
                format!("Unnamed: {i}")
            } else {
                header.clone()
            };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.to_lowercase()) {
                name = format!("{base}.{n}");
                n += 1;
            }
            name
        })
        .collect()
}
