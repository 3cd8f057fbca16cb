// RawTable -> typed feature and constraint tables

use std::collections::BTreeSet;

use geomatrix_io::{DataLoadError, RawTable};

use crate::config::ReconConfig;
use crate::matcher::{Inserted, NameIndex};
use crate::model::{
    Assessments, ConstraintKind, ConstraintMatch, ConstraintRow, FeatureRecord, FoundationAssessment,
    FoundationType,
};

// ---------------------------------------------------------------------------
// Master table
// ---------------------------------------------------------------------------

/// Master feature records with a unique-name index.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub origin: String,
    records: Vec<FeatureRecord>,
    index: NameIndex,
}

impl FeatureSet {
    pub fn get(&self, name: &str) -> Option<&FeatureRecord> {
        self.index.exact(name).map(|i| &self.records[i])
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Build the master feature set. Names are kept verbatim so exact lookups
/// stay exact. Rows with a blank name are skipped; a repeated name fails the load.
pub fn load_master(table: &RawTable, config: &ReconConfig) -> Result<FeatureSet, DataLoadError> {
    let columns = &config.columns;
    let name_col = table
        .column_index(&columns.name)
        .ok_or_else(|| DataLoadError::MissingColumn {
            origin: table.origin.clone(),
            column: columns.name.clone(),
        })?;

    let optional = |column: &str| {
        let index = table.column_index(column);
        if index.is_none() {
            tracing::warn!(origin = %table.origin, column, "master column missing; values load as empty");
        }
        index
    };
    let setting = optional(&columns.setting);
    let process = optional(&columns.process);
    let dominant_constraint = optional(&columns.dominant_constraint);
    let definition = optional(&columns.definition);
    let comments = optional(&columns.comments);
    let references = optional(&columns.references);
    let assessment_cols: Vec<Option<usize>> = FoundationType::ALL
        .iter()
        .map(|&f| optional(columns.assessment(f)))
        .collect();

    let mut records: Vec<FeatureRecord> = Vec::with_capacity(table.len());
    let mut index = NameIndex::new();
    let mut skipped = 0usize;

    for row in &table.rows {
        let name = row[name_col].as_str();
        if name.trim().is_empty() {
            skipped += 1;
            continue;
        }

        let cell = |col: Option<usize>| col.map(|i| row[i].trim().to_string()).unwrap_or_default();
        let assessment = |f: FoundationType| {
            let col = assessment_cols[f as usize];
            FoundationAssessment::from_cell(&cell(col))
        };

        let record = FeatureRecord {
            name: name.to_string(),
            setting: cell(setting),
            process: cell(process),
            dominant_constraint: cell(dominant_constraint),
            definition: cell(definition),
            comments: cell(comments),
            references: cell(references),
            assessments: Assessments {
                piles: assessment(FoundationType::Piles),
                suction_caisson: assessment(FoundationType::SuctionCaisson),
                gbs: assessment(FoundationType::Gbs),
                cables: assessment(FoundationType::Cables),
            },
        };

        match index.insert(&record.name, records.len()) {
            Inserted::DuplicateExact { .. } => {
                return Err(DataLoadError::DuplicateFeature {
                    origin: table.origin.clone(),
                    name: record.name,
                });
            }
            Inserted::NormalizedCollision { first } => {
                tracing::warn!(
                    origin = %table.origin,
                    name = %record.name,
                    earlier = %records[first].name,
                    "master names differ only by case or whitespace"
                );
            }
            Inserted::New => {}
        }
        records.push(record);
    }

    tracing::debug!(origin = %table.origin, features = records.len(), skipped, "loaded master table");
    Ok(FeatureSet {
        origin: table.origin.clone(),
        records,
        index,
    })
}

// ---------------------------------------------------------------------------
// Constraint tables
// ---------------------------------------------------------------------------

/// One constraint indicator table, indexed by row name.
#[derive(Debug, Clone)]
pub struct ConstraintTable {
    pub kind: ConstraintKind,
    pub origin: String,
    /// Flag column headers, in table order.
    pub flag_columns: Vec<String>,
    rows: Vec<ConstraintRow>,
    index: NameIndex,
}

impl ConstraintTable {
    pub fn rows(&self) -> &[ConstraintRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position and row for `feature_name`: exact first, then normalized.
    pub fn find(&self, feature_name: &str) -> Option<(usize, &ConstraintRow, crate::model::MatchKind)> {
        self.index
            .lookup(feature_name)
            .map(|(i, kind)| (i, &self.rows[i], kind))
    }

    /// Flags for `feature_name`. No matching row yields an empty set, never an error.
    pub fn match_feature(&self, feature_name: &str) -> ConstraintMatch {
        match self.find(feature_name) {
            Some((_, row, match_kind)) => ConstraintMatch {
                kind: self.kind,
                match_kind,
                matched_name: Some(row.name.clone()),
                flags: row.flags.clone(),
            },
            None => ConstraintMatch::unmatched(self.kind),
        }
    }
}

/// Build a constraint table: name -> set of flag names.
///
/// Every column other than the name column and the configured metadata
/// columns is a flag column. Blank and placeholder headers are skipped, as
/// are ignored flags.
pub fn load_constraint_table(
    table: &RawTable,
    kind: ConstraintKind,
    config: &ReconConfig,
) -> Result<ConstraintTable, DataLoadError> {
    if table.headers.is_empty() {
        return Err(DataLoadError::Empty { origin: table.origin.clone() });
    }

    let name_col = match &config.constraint_name_column {
        Some(column) => table.column_index(column).ok_or_else(|| DataLoadError::MissingColumn {
            origin: table.origin.clone(),
            column: column.clone(),
        })?,
        None => 0,
    };
    let definition_col = table.column_index(&config.columns.definition);

    // A repeated header counts as its first occurrence, so `Unknown.1` is
    // still ignored and a repeated flag column sets the same flag.
    let flag_cols: Vec<(usize, &str)> = (0..table.headers.len())
        .map(|i| (i, table.base_header(i)))
        .filter(|&(i, header)| {
            i != name_col
                && !header.is_empty()
                && !header.starts_with("Unnamed:")
                && !config.is_metadata_column(header)
                && !config.is_ignored_flag(header)
        })
        .collect();

    let mut rows: Vec<ConstraintRow> = Vec::with_capacity(table.len());
    let mut index = NameIndex::new();

    for raw in &table.rows {
        let name = raw[name_col].as_str();
        if name.trim().is_empty() {
            continue;
        }

        let flags: BTreeSet<String> = flag_cols
            .iter()
            .filter(|&&(i, _)| config.is_flag_marker(&raw[i]))
            .map(|&(_, header)| header.to_string())
            .collect();
        let definition = definition_col
            .map(|i| raw[i].trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        match index.insert(name, rows.len()) {
            Inserted::DuplicateExact { first } => {
                tracing::warn!(origin = %table.origin, name, first_row = first, "duplicate constraint row ignored");
                continue;
            }
            Inserted::NormalizedCollision { first } => {
                tracing::warn!(
                    origin = %table.origin,
                    name,
                    earlier = %rows[first].name,
                    "constraint names differ only by case or whitespace; fallback uses the earlier row"
                );
            }
            Inserted::New => {}
        }

        rows.push(ConstraintRow {
            name: name.to_string(),
            flags,
            definition,
        });
    }

    tracing::debug!(
        origin = %table.origin,
        kind = %kind,
        rows = rows.len(),
        flag_columns = flag_cols.len(),
        "loaded constraint table"
    );
    Ok(ConstraintTable {
        kind,
        origin: table.origin.clone(),
        flag_columns: flag_columns(&flag_cols),
        rows,
        index,
    })
}

/// Distinct flag headers in table order.
fn flag_columns(cols: &[(usize, &str)]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(cols.len());
    for &(_, header) in cols {
        if !out.iter().any(|h| h == header) {
            out.push(header.to_string());
        }
    }
    out
}
