// Name-mismatch report between the master table and each constraint table

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{ConstraintKind, MatchKind};
use crate::repository::FeatureRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedMatch {
    pub feature: String,
    pub row_name: String,
}

/// How one constraint table lines up with the master names.
#[derive(Debug, Clone, Serialize)]
pub struct TableAudit {
    pub kind: ConstraintKind,
    pub origin: String,
    pub row_count: usize,
    pub exact: Vec<String>,
    pub normalized: Vec<NormalizedMatch>,
    /// Master features with no row in this table.
    pub unmatched_features: Vec<String>,
    /// Rows that no master feature resolves to.
    pub orphan_rows: Vec<String>,
}

impl TableAudit {
    pub fn matched(&self) -> usize {
        self.exact.len() + self.normalized.len()
    }

    /// Share of master features with a row, in percent.
    pub fn match_rate(&self) -> f64 {
        let total = self.matched() + self.unmatched_features.len();
        if total == 0 {
            return 100.0;
        }
        self.matched() as f64 / total as f64 * 100.0
    }

    pub fn is_clean(&self) -> bool {
        self.normalized.is_empty() && self.unmatched_features.is_empty() && self.orphan_rows.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MismatchReport {
    pub source: String,
    pub generated_at: String,
    pub feature_count: usize,
    pub tables: Vec<TableAudit>,
}

impl MismatchReport {
    pub fn is_clean(&self) -> bool {
        self.tables.iter().all(TableAudit::is_clean)
    }

    /// Master features missing from at least one table.
    pub fn total_unmatched(&self) -> usize {
        self.tables.iter().map(|t| t.unmatched_features.len()).sum()
    }
}

impl FeatureRepository {
    /// Compare every master name against every loaded constraint table.
    pub fn audit(&self) -> MismatchReport {
        let names = self.feature_names();

        let tables = self
            .constraint_tables()
            .iter()
            .map(|table| {
                let mut exact = Vec::new();
                let mut normalized = Vec::new();
                let mut unmatched_features = Vec::new();
                let mut used = BTreeSet::new();

                for &name in &names {
                    match table.find(name) {
                        Some((position, _, MatchKind::Exact)) => {
                            used.insert(position);
                            exact.push(name.to_string());
                        }
                        Some((position, row, _)) => {
                            used.insert(position);
                            normalized.push(NormalizedMatch {
                                feature: name.to_string(),
                                row_name: row.name.clone(),
                            });
                        }
                        None => unmatched_features.push(name.to_string()),
                    }
                }

                let orphan_rows = table
                    .rows()
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !used.contains(i))
                    .map(|(_, row)| row.name.clone())
                    .collect();

                TableAudit {
                    kind: table.kind,
                    origin: table.origin.clone(),
                    row_count: table.len(),
                    exact,
                    normalized,
                    unmatched_features,
                    orphan_rows,
                }
            })
            .collect();

        let report = MismatchReport {
            source: self.source().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            feature_count: names.len(),
            tables,
        };
        for t in &report.tables {
            tracing::info!(
                table = %t.kind,
                matched = t.matched(),
                normalized = t.normalized.len(),
                unmatched = t.unmatched_features.len(),
                orphans = t.orphan_rows.len(),
                "audited constraint table"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconConfig;
    use crate::loader::{load_constraint_table, load_master};
    use geomatrix_io::RawTable;

    fn raw(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            "mem",
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter().map(|r| r.iter().map(|s| s.to_string()).collect()).collect(),
        )
    }

    #[test]
    fn audit_splits_exact_normalized_unmatched_and_orphans() {
        let config = ReconConfig::default();
        let master = load_master(
            &raw(&["Geological_Feature"], &[&["Sand"], &["Shallow gas"], &["Esker"], &["Beach"]]),
            &config,
        )
        .unwrap();
        let geo = load_constraint_table(
            &raw(
                &["name", "Coarse soil units (including gravel)"],
                &[&["Sand", "x"], &["Shallow gas ", ""], &["Beach", ""], &["Seamount", "x"]],
            ),
            ConstraintKind::Geological,
            &config,
        )
        .unwrap();
        let repo = FeatureRepository::from_tables("mem", master, vec![geo]);

        let report = repo.audit();
        assert_eq!(report.feature_count, 4);
        let t = &report.tables[0];
        assert_eq!(t.exact, vec!["Beach", "Sand"]);
        assert_eq!(
            t.normalized,
            vec![NormalizedMatch {
                feature: "Shallow gas".into(),
                row_name: "Shallow gas ".into()
            }]
        );
        assert_eq!(t.unmatched_features, vec!["Esker"]);
        assert_eq!(t.orphan_rows, vec!["Seamount"]);
        assert!((t.match_rate() - 75.0).abs() < 1e-9);
        assert!(!report.is_clean());
        assert_eq!(report.total_unmatched(), 1);
    }

    #[test]
    fn empty_master_reports_full_rate() {
        let config = ReconConfig::default();
        let master = load_master(&raw(&["Geological_Feature"], &[]), &config).unwrap();
        let repo = FeatureRepository::from_tables("mem", master, vec![]);
        let report = repo.audit();
        assert!(report.is_clean());
        assert!(report.tables.is_empty());
    }
}
