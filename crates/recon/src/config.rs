use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{ConstraintKind, FoundationType};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// How the reconciler interprets the tables. Every field has a default that
/// matches the published matrix files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconConfig {
    /// Constraint tables to load; each listed table must exist in the source.
    pub constraint_tables: Vec<ConstraintKind>,
    pub columns: ColumnMapping,
    /// Name column of the constraint tables. `None` uses the first column.
    pub constraint_name_column: Option<String>,
    /// Constraint-table columns that carry text rather than flags.
    pub metadata_columns: Vec<String>,
    /// Cell values (case-insensitive, trimmed) that mark a flag as set.
    pub flag_markers: Vec<String>,
    /// Flag columns that are never reported.
    pub ignored_flags: Vec<String>,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            constraint_tables: ConstraintKind::ALL.to_vec(),
            columns: ColumnMapping::default(),
            constraint_name_column: None,
            metadata_columns: ["Setting", "Process", "Definition", "Comments", "References", "Dominant_Constraint"]
                .map(String::from)
                .to_vec(),
            flag_markers: ["x", "true", "yes", "1"].map(String::from).to_vec(),
            ignored_flags: [
                "Unknown",
                "Potentially unsuitable",
                "Requires individual WTG siting investigation",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl ReconConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(s: &str) -> Result<Self, ReconError> {
        let config: Self = toml::from_str(s).map_err(|e| ReconError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.columns.name.trim().is_empty() {
            return Err(ReconError::Config("columns.name must not be empty".into()));
        }
        if self.flag_markers.iter().all(|m| m.trim().is_empty()) {
            return Err(ReconError::Config("flag_markers must contain at least one marker".into()));
        }
        for (i, kind) in self.constraint_tables.iter().enumerate() {
            if self.constraint_tables[..i].contains(kind) {
                return Err(ReconError::Config(format!("constraint table '{kind}' listed twice")));
            }
        }
        Ok(())
    }

    pub(crate) fn is_flag_marker(&self, cell: &str) -> bool {
        let cell = cell.trim();
        !cell.is_empty() && self.flag_markers.iter().any(|m| m.trim().eq_ignore_ascii_case(cell))
    }

    pub(crate) fn is_metadata_column(&self, header: &str) -> bool {
        header_in(&self.metadata_columns, header)
    }

    pub(crate) fn is_ignored_flag(&self, header: &str) -> bool {
        header_in(&self.ignored_flags, header)
    }
}

fn header_in(list: &[String], header: &str) -> bool {
    let header = header.trim();
    list.iter().any(|h| h.trim().eq_ignore_ascii_case(header))
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Master-table column names. Only `name` is required to exist; other
/// missing columns load as empty text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub name: String,
    pub setting: String,
    pub process: String,
    pub dominant_constraint: String,
    /// Also read from the geological constraints table.
    pub definition: String,
    pub comments: String,
    pub references: String,
    pub piles: String,
    pub suction_caisson: String,
    pub gbs: String,
    pub cables: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            name: "Geological_Feature".into(),
            setting: "Setting".into(),
            process: "Process".into(),
            dominant_constraint: "Dominant_Constraint".into(),
            definition: "Definition".into(),
            comments: "Comments".into(),
            references: "References".into(),
            piles: "Piles_Assessment".into(),
            suction_caisson: "Suction_Caisson_Assessment".into(),
            gbs: "GBS_Assessment".into(),
            cables: "Cables_Assessment".into(),
        }
    }
}

impl ColumnMapping {
    pub fn assessment(&self, foundation: FoundationType) -> &str {
        match foundation {
            FoundationType::Piles => &self.piles,
            FoundationType::SuctionCaisson => &self.suction_caisson,
            FoundationType::Gbs => &self.gbs,
            FoundationType::Cables => &self.cables,
        }
    }
}
