//! `geomatrix features|show|compare|audit` - lookups against the loaded matrix.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use geomatrix_config::Settings;
use geomatrix_io::open_source;
use geomatrix_recon::model::DefinitionSource;
use geomatrix_recon::{ConstraintKind, FeatureRepository, FoundationType, MatchKind, MergedFeature, MismatchReport};

use crate::exit_codes::EXIT_AUDIT_MISMATCH;
use crate::CliError;

/// Open the configured source and build the repository once for this command.
pub fn load_repository(settings: &Settings) -> Result<FeatureRepository, CliError> {
    let source = open_source(&settings.data.path, settings.read_options())?;
    Ok(FeatureRepository::load(source.as_ref(), &settings.recon)?)
}

pub fn cmd_features(settings: &Settings, json: bool) -> Result<(), CliError> {
    let repo = load_repository(settings)?;
    let names = repo.feature_names();
    if json {
        print_json(&names)
    } else {
        for name in names {
            println!("{name}");
        }
        Ok(())
    }
}

pub fn cmd_show(settings: &Settings, name: &str, json: bool) -> Result<(), CliError> {
    let repo = load_repository(settings)?;
    let merged = repo.resolve(name)?;
    if json {
        print_json(&merged)
    } else {
        print!("{}", render_feature(&merged));
        Ok(())
    }
}

/// Side-by-side view. `foundation` narrows the assessment rows (and the JSON
/// sides) to a single foundation type.
pub fn cmd_compare(
    settings: &Settings,
    name_a: &str,
    name_b: &str,
    foundation: Option<FoundationType>,
    json: bool,
) -> Result<(), CliError> {
    let repo = load_repository(settings)?;
    let (a, b) = repo.compare(name_a, name_b)?;
    let foundations = match foundation {
        Some(f) => vec![f],
        None => FoundationType::ALL.to_vec(),
    };

    if !json {
        print!("{}", render_comparison(&a, &b, &foundations));
        return Ok(());
    }
    match foundation {
        None => print_json(&serde_json::json!({ "a": a, "b": b })),
        Some(f) => {
            let side = |m: &MergedFeature| {
                serde_json::json!({
                    "name": m.name(),
                    "assessment": m.record.assessment(f),
                    "constraints": m.constraints,
                })
            };
            print_json(&serde_json::json!({ "foundation": f, "a": side(&a), "b": side(&b) }))
        }
    }
}

pub fn cmd_audit(settings: &Settings, json: bool, strict: bool) -> Result<(), CliError> {
    let repo = load_repository(settings)?;
    let report = repo.audit();
    if json {
        print_json(&report)?;
    } else {
        print!("{}", render_audit(&report));
    }

    if strict && !report.is_clean() {
        return Err(CliError::new(
            EXIT_AUDIT_MISMATCH,
            format!("{} constraint table(s) do not line up with the master names", dirty_tables(&report)),
        ));
    }
    Ok(())
}

fn dirty_tables(report: &MismatchReport) -> usize {
    report.tables.iter().filter(|t| !t.is_clean()).count()
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
    println!("{text}");
    Ok(())
}

// ============================================================================
// Text rendering
// ============================================================================

fn match_note(merged: &MergedFeature, kind: ConstraintKind) -> String {
    match merged.constraint(kind) {
        None => "not loaded".to_string(),
        Some(m) => match m.match_kind {
            MatchKind::Exact => "exact match".to_string(),
            MatchKind::Normalized => {
                let row = m.matched_name.as_deref().unwrap_or_default();
                format!("matched as {:?}", row)
            }
            MatchKind::Unmatched => "no matching row".to_string(),
        },
    }
}

fn or_dash(text: &str) -> &str {
    if text.trim().is_empty() {
        "-"
    } else {
        text
    }
}

pub fn render_feature(merged: &MergedFeature) -> String {
    let record = &merged.record;
    let mut out = String::new();

    let _ = writeln!(out, "{}", merged.name());
    let _ = writeln!(out, "  Setting:             {}", or_dash(&record.setting));
    let _ = writeln!(out, "  Process:             {}", or_dash(&record.process));
    let _ = writeln!(out, "  Dominant constraint: {}", or_dash(&record.dominant_constraint));
    let source = match merged.definition_source {
        DefinitionSource::Master => "",
        DefinitionSource::GeologicalConstraints => " [geological constraints]",
    };
    let _ = writeln!(out, "  Definition:          {}{}", or_dash(&merged.definition), source);

    let _ = writeln!(out, "\nFoundation assessments");
    for foundation in FoundationType::ALL {
        let _ = writeln!(out, "  {:<16} {}", foundation.label(), or_dash(&record.assessment(foundation).raw));
    }

    for kind in ConstraintKind::ALL {
        let _ = writeln!(out, "\n{} ({})", kind.label(), match_note(merged, kind));
        let mut any = false;
        for flag in merged.flags(kind) {
            let _ = writeln!(out, "  - {flag}");
            any = true;
        }
        if !any {
            let _ = writeln!(out, "  (none)");
        }
    }

    if !record.comments.is_empty() {
        let _ = writeln!(out, "\nComments: {}", record.comments);
    }
    if !record.references.is_empty() {
        let _ = writeln!(out, "References: {}", record.references);
    }
    out
}

pub fn render_comparison(a: &MergedFeature, b: &MergedFeature, foundations: &[FoundationType]) -> String {
    let labels = ["Dominant constraint"]
        .into_iter()
        .chain(foundations.iter().map(|f| f.label()))
        .chain(ConstraintKind::ALL.iter().map(|k| k.label()))
        .map(|s| s.chars().count());
    let flags = ConstraintKind::ALL
        .iter()
        .flat_map(|&k| a.flags(k).chain(b.flags(k)))
        .map(|f| f.chars().count() + 2);
    let width = labels.chain(flags).max().unwrap_or(0);

    let record = &a.record;
    let col = [a.name(), record.setting.as_str(), record.process.as_str(), record.dominant_constraint.as_str()]
        .into_iter()
        .chain(foundations.iter().map(|&f| record.assessment(f).raw.as_str()))
        .map(|s| s.chars().count())
        .max()
        .unwrap_or(0)
        .max(1);

    let mut out = String::new();
    let mut row = |label: &str, left: &str, right: &str| {
        let _ = writeln!(out, "{:<width$}  {:<col$}  {}", label, or_dash(left), or_dash(right));
    };

    row("", a.name(), b.name());
    row("Setting", &a.record.setting, &b.record.setting);
    row("Process", &a.record.process, &b.record.process);
    row("Dominant constraint", &a.record.dominant_constraint, &b.record.dominant_constraint);
    for &foundation in foundations {
        row(
            foundation.label(),
            &a.record.assessment(foundation).raw,
            &b.record.assessment(foundation).raw,
        );
    }

    for kind in ConstraintKind::ALL {
        let flags: BTreeSet<&str> = a.flags(kind).chain(b.flags(kind)).collect();
        if flags.is_empty() {
            continue;
        }
        row(kind.label(), "", "");
        for flag in flags {
            let mark = |m: &MergedFeature| if m.has_flag(kind, flag) { "x" } else { "" };
            row(&format!("  {flag}"), mark(a), mark(b));
        }
    }
    out
}

pub fn render_audit(report: &MismatchReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "source:   {}", report.source);
    let _ = writeln!(out, "features: {}", report.feature_count);

    for table in &report.tables {
        let _ = writeln!(
            out,
            "\n{} ({}): {}/{} matched ({:.1}%), {} rows",
            table.kind,
            table.origin,
            table.matched(),
            table.matched() + table.unmatched_features.len(),
            table.match_rate(),
            table.row_count,
        );
        for m in &table.normalized {
            let _ = writeln!(out, "  normalized: {:?} ~ {:?}", m.feature, m.row_name);
        }
        for name in &table.unmatched_features {
            let _ = writeln!(out, "  unmatched:  {:?}", name);
        }
        for name in &table.orphan_rows {
            let _ = writeln!(out, "  orphan row: {:?}", name);
        }
    }

    if report.is_clean() {
        let _ = writeln!(out, "\nall names match exactly");
    }
    out
}
