// Where the matrix tables come from

use std::path::{Path, PathBuf};

use crate::csv;
use crate::error::DataLoadError;
use crate::gpkg::GeoPackage;
use crate::table::{RawTable, ReadOptions, TableKind};

/// A backend that can produce each of the matrix tables.
pub trait TableSource: std::fmt::Debug {
    /// Short description for logs and error context.
    fn describe(&self) -> String;

    fn read_table(&self, kind: TableKind) -> Result<RawTable, DataLoadError>;
}

/// A directory holding one CSV file per table.
#[derive(Debug, Clone)]
pub struct CsvDirectory {
    dir: PathBuf,
    options: ReadOptions,
}

impl CsvDirectory {
    pub fn new(dir: impl Into<PathBuf>, options: ReadOptions) -> Self {
        Self {
            dir: dir.into(),
            options,
        }
    }

    pub fn path_for(&self, kind: TableKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }
}

impl TableSource for CsvDirectory {
    fn describe(&self) -> String {
        format!("CSV directory {}", self.dir.display())
    }

    fn read_table(&self, kind: TableKind) -> Result<RawTable, DataLoadError> {
        csv::read_table(&self.path_for(kind), &self.options)
    }
}

/// Pick a backend for `path`: a directory is read as CSV files, a file as a GeoPackage.
pub fn open_source(path: &Path, options: ReadOptions) -> Result<Box<dyn TableSource>, DataLoadError> {
    if path.is_dir() {
        Ok(Box::new(CsvDirectory::new(path, options)))
    } else if path.is_file() {
        Ok(Box::new(GeoPackage::new(path, options)))
    } else {
        Err(DataLoadError::InvalidSource {
            path: path.to_path_buf(),
            message: "no such file or directory".to_string(),
        })
    }
}
