use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use geomatrix_io::TableKind;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Foundation assessments
// ---------------------------------------------------------------------------

/// Offshore foundation method assessed against each feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoundationType {
    Piles,
    SuctionCaisson,
    Gbs,
    Cables,
}

impl FoundationType {
    pub const ALL: [FoundationType; 4] = [Self::Piles, Self::SuctionCaisson, Self::Gbs, Self::Cables];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Piles => "Piles",
            Self::SuctionCaisson => "Suction Caisson",
            Self::Gbs => "GBS",
            Self::Cables => "Cables",
        }
    }
}

impl fmt::Display for FoundationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintLevel {
    Higher,
    Moderate,
    Lower,
    Unknown,
}

impl ConstraintLevel {
    /// Parse cell text such as `Higher Constraint` or `Moderate constraint`.
    /// Only the leading word matters; anything unrecognised is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim().to_lowercase();
        if text.starts_with("high") {
            Self::Higher
        } else if text.starts_with("moderate") || text.starts_with("medium") {
            Self::Moderate
        } else if text.starts_with("low") {
            Self::Lower
        } else {
            Self::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Higher => "Higher Constraint",
            Self::Moderate => "Moderate Constraint",
            Self::Lower => "Lower Constraint",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConstraintLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One foundation assessment cell. `raw` is the cell text exactly as loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoundationAssessment {
    pub raw: String,
    pub level: ConstraintLevel,
}

impl FoundationAssessment {
    pub fn from_cell(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            level: ConstraintLevel::parse(raw),
        }
    }

    pub fn is_available(&self) -> bool {
        !self.raw.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessments {
    pub piles: FoundationAssessment,
    pub suction_caisson: FoundationAssessment,
    pub gbs: FoundationAssessment,
    pub cables: FoundationAssessment,
}

impl Assessments {
    pub fn get(&self, foundation: FoundationType) -> &FoundationAssessment {
        match foundation {
            FoundationType::Piles => &self.piles,
            FoundationType::SuctionCaisson => &self.suction_caisson,
            FoundationType::Gbs => &self.gbs,
            FoundationType::Cables => &self.cables,
        }
    }
}

// ---------------------------------------------------------------------------
// Master table
// ---------------------------------------------------------------------------

/// One row of the master feature table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureRecord {
    pub name: String,
    pub setting: String,
    pub process: String,
    pub dominant_constraint: String,
    pub definition: String,
    pub comments: String,
    pub references: String,
    pub assessments: Assessments,
}

impl FeatureRecord {
    pub fn assessment(&self, foundation: FoundationType) -> &FoundationAssessment {
        self.assessments.get(foundation)
    }
}

// ---------------------------------------------------------------------------
// Constraint indicator tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Geological,
    Engineering,
}

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 2] = [Self::Geological, Self::Engineering];

    pub fn table_kind(&self) -> TableKind {
        match self {
            Self::Geological => TableKind::GeologicalConstraints,
            Self::Engineering => TableKind::EngineeringConstraints,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Geological => "Geological Constraints",
            Self::Engineering => "Engineering Constraints",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geological => write!(f, "geological"),
            Self::Engineering => write!(f, "engineering"),
        }
    }
}

/// One row of a constraint table: the feature name as written in that table
/// and the flags marked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintRow {
    pub name: String,
    pub flags: BTreeSet<String>,
    /// Non-empty definition text from the table, when it has one.
    pub definition: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolution output
// ---------------------------------------------------------------------------

/// How a feature name found its row in a constraint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    /// Equal after trimming, collapsing whitespace and lowercasing.
    Normalized,
    Unmatched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintMatch {
    pub kind: ConstraintKind,
    pub match_kind: MatchKind,
    /// Row name as written in the constraint table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_name: Option<String>,
    pub flags: BTreeSet<String>,
}

impl ConstraintMatch {
    pub fn unmatched(kind: ConstraintKind) -> Self {
        Self {
            kind,
            match_kind: MatchKind::Unmatched,
            matched_name: None,
            flags: BTreeSet::new(),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.match_kind != MatchKind::Unmatched
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionSource {
    Master,
    GeologicalConstraints,
}

/// A master record with the constraint flags of every loaded constraint table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedFeature {
    pub record: FeatureRecord,
    /// Effective definition: the geological table's text when it has one,
    /// otherwise the master's.
    pub definition: String,
    pub definition_source: DefinitionSource,
    pub constraints: BTreeMap<ConstraintKind, ConstraintMatch>,
}

impl MergedFeature {
    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn constraint(&self, kind: ConstraintKind) -> Option<&ConstraintMatch> {
        self.constraints.get(&kind)
    }

    /// Flags for `kind`; empty when the table is not loaded or had no match.
    pub fn flags(&self, kind: ConstraintKind) -> impl Iterator<Item = &str> {
        self.constraints
            .get(&kind)
            .into_iter()
            .flat_map(|m| m.flags.iter().map(String::as_str))
    }

    pub fn has_flag(&self, kind: ConstraintKind, flag: &str) -> bool {
        self.constraints
            .get(&kind)
            .is_some_and(|m| m.flags.contains(flag))
    }

    pub fn flag_count(&self) -> usize {
        self.constraints.values().map(|m| m.flags.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing_uses_leading_word() {
        assert_eq!(ConstraintLevel::parse("Higher Constraint"), ConstraintLevel::Higher);
        assert_eq!(ConstraintLevel::parse("  moderate constraint"), ConstraintLevel::Moderate);
        assert_eq!(ConstraintLevel::parse("Lower Constraint"), ConstraintLevel::Lower);
        assert_eq!(ConstraintLevel::parse(""), ConstraintLevel::Unknown);
        assert_eq!(ConstraintLevel::parse("Unknown"), ConstraintLevel::Unknown);
        assert_eq!(ConstraintLevel::parse("Potentially unsuitable"), ConstraintLevel::Unknown);
    }

    #[test]
    fn assessment_keeps_raw_text() {
        let a = FoundationAssessment::from_cell("Moderate constraint");
        assert_eq!(a.raw, "Moderate constraint");
        assert_eq!(a.level, ConstraintLevel::Moderate);
        assert!(a.is_available());
        assert!(!FoundationAssessment::from_cell(" ").is_available());
    }

    #[test]
    fn constraint_kinds_map_to_tables() {
        assert_eq!(ConstraintKind::Geological.table_kind(), TableKind::GeologicalConstraints);
        assert_eq!(ConstraintKind::Engineering.table_kind(), TableKind::EngineeringConstraints);
    }
}
