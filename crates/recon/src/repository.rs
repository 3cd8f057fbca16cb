use std::collections::BTreeMap;

use geomatrix_io::TableSource;

use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::loader::{load_constraint_table, load_master, ConstraintTable, FeatureSet};
use crate::model::{ConstraintKind, DefinitionSource, FeatureRecord, MergedFeature};

/// Read-only view over the master table and the loaded constraint tables.
///
/// Built once at startup and handed to whoever needs it; nothing mutates it
/// afterwards, so one instance can be shared across threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct FeatureRepository {
    source: String,
    features: FeatureSet,
    constraints: Vec<ConstraintTable>,
}

impl FeatureRepository {
    /// Load the master table and every constraint table named in `config`.
    pub fn load(source: &dyn TableSource, config: &ReconConfig) -> Result<Self, ReconError> {
        config.validate()?;
        let description = source.describe();

        let master = source.read_table(geomatrix_io::TableKind::Features)?;
        let features = load_master(&master, config)?;

        let mut constraints = Vec::with_capacity(config.constraint_tables.len());
        for &kind in &config.constraint_tables {
            let raw = source.read_table(kind.table_kind())?;
            constraints.push(load_constraint_table(&raw, kind, config)?);
        }

        tracing::info!(
            source = %description,
            features = features.len(),
            constraint_tables = constraints.len(),
            "feature repository loaded"
        );
        Ok(Self::from_tables(description, features, constraints))
    }

    /// Assemble a repository from already-loaded tables.
    pub fn from_tables(source: impl Into<String>, features: FeatureSet, constraints: Vec<ConstraintTable>) -> Self {
        Self {
            source: source.into(),
            features,
            constraints,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn constraint_tables(&self) -> &[ConstraintTable] {
        &self.constraints
    }

    pub fn constraint_table(&self, kind: ConstraintKind) -> Option<&ConstraintTable> {
        self.constraints.iter().find(|t| t.kind == kind)
    }

    /// Master names, sorted, for feature pickers.
    pub fn feature_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.features.records().iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn get(&self, name: &str) -> Option<&FeatureRecord> {
        self.features.get(name)
    }

    /// Merge the master record for `name` with its constraint flags.
    ///
    /// The master lookup is exact; constraint tables fall back to a normalized
    /// match and then to an empty flag set.
    pub fn resolve(&self, name: &str) -> Result<MergedFeature, ReconError> {
        let record = self
            .features
            .get(name)
            .ok_or_else(|| ReconError::FeatureNotFound { name: name.to_string() })?;

        let mut constraints = BTreeMap::new();
        let mut definition = record.definition.clone();
        let mut definition_source = DefinitionSource::Master;

        for table in &self.constraints {
            let found = table.find(name);
            if table.kind == ConstraintKind::Geological {
                if let Some(text) = found.and_then(|(_, row, _)| row.definition.as_ref()) {
                    definition = text.clone();
                    definition_source = DefinitionSource::GeologicalConstraints;
                }
            }

            let matched = table.match_feature(name);
            tracing::debug!(
                feature = name,
                table = %table.kind,
                match_kind = ?matched.match_kind,
                flags = matched.flags.len(),
                "resolved constraints"
            );
            constraints.insert(table.kind, matched);
        }

        Ok(MergedFeature {
            record: record.clone(),
            definition,
            definition_source,
            constraints,
        })
    }

    /// Resolve two features independently.
    pub fn compare(&self, name_a: &str, name_b: &str) -> Result<(MergedFeature, MergedFeature), ReconError> {
        Ok((self.resolve(name_a)?, self.resolve(name_b)?))
    }
}
