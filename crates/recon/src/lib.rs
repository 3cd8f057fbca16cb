//! `geomatrix-recon` - feature data reconciler.
//!
//! Loads the master feature table and the constraint indicator tables from a
//! [`geomatrix_io::TableSource`], then merges them per feature name: exact
//! match first, whitespace/case-normalized match second, empty flag set last.

pub mod audit;
pub mod config;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod model;
pub mod repository;

pub use audit::{MismatchReport, TableAudit};
pub use config::{ColumnMapping, ReconConfig};
pub use error::ReconError;
pub use loader::{load_constraint_table, load_master, ConstraintTable, FeatureSet};
pub use model::{
    ConstraintKind, ConstraintLevel, ConstraintMatch, FeatureRecord, FoundationType, MatchKind, MergedFeature,
};
pub use repository::FeatureRepository;
