//! `geomatrix-io` - tabular sources for the geo-assessment matrix.
//!
//! Turns CSV directories and GeoPackage files into decoded [`RawTable`]s.
//! Knows nothing about features or constraints.

pub mod csv;
pub mod encoding;
pub mod error;
pub mod gpkg;
pub mod source;
pub mod table;

pub use encoding::{decode_with_fallback, Decoded, TextEncoding, DEFAULT_CHAIN};
pub use error::DataLoadError;
pub use gpkg::GeoPackage;
pub use source::{open_source, CsvDirectory, TableSource};
pub use table::{RawTable, ReadOptions, TableKind};
