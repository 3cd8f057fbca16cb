//! `geomatrix gpkg` - regenerate and check the GeoPackage from the CSV sources.

use std::fmt::Write as _;
use std::path::PathBuf;

use clap::Subcommand;
use geomatrix_config::Settings;
use geomatrix_io::gpkg::{self, ValidationReport, WriteSummary};

use crate::exit_codes::{EXIT_GPKG_INVALID, EXIT_GPKG_WRITE};
use crate::CliError;

#[derive(Subcommand)]
pub enum GpkgCommands {
    /// Create a new GeoPackage from a CSV directory, replacing OUT
    #[command(after_help = "\
Examples:
  geomatrix gpkg build data/csv data/geological_data.gpkg")]
    Build {
        /// Directory holding the three matrix CSV files
        csv_dir: PathBuf,
        out: PathBuf,
    },

    /// Replace the data tables of an existing GeoPackage
    #[command(after_help = "\
Examples:
  geomatrix gpkg update data/csv data/geological_data.gpkg")]
    Update {
        csv_dir: PathBuf,
        gpkg: PathBuf,
    },

    /// Check application id, metadata tables and data tables
    #[command(after_help = "\
Examples:
  geomatrix gpkg validate data/geological_data.gpkg
  geomatrix gpkg validate data/geological_data.gpkg --json")]
    Validate {
        gpkg: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_gpkg(settings: &Settings, cmd: GpkgCommands) -> Result<(), CliError> {
    if let GpkgCommands::Build { csv_dir, .. } | GpkgCommands::Update { csv_dir, .. } = &cmd {
        if !csv_dir.is_dir() {
            return Err(CliError::args(format!("{} is not a directory", csv_dir.display())));
        }
    }

    match cmd {
        GpkgCommands::Build { csv_dir, out } => {
            let summary = gpkg::build(&csv_dir, &out, &settings.read_options()).map_err(write_err)?;
            eprint!("{}", render_summary("built", &summary));
            Ok(())
        }
        GpkgCommands::Update { csv_dir, gpkg: path } => {
            let summary = gpkg::update(&csv_dir, &path, &settings.read_options()).map_err(write_err)?;
            eprint!("{}", render_summary("updated", &summary));
            Ok(())
        }
        GpkgCommands::Validate { gpkg: path, json } => cmd_validate(path, json),
    }
}

fn write_err(err: geomatrix_io::DataLoadError) -> CliError {
    let mut cli: CliError = err.into();
    cli.code = EXIT_GPKG_WRITE;
    cli
}

fn cmd_validate(path: PathBuf, json: bool) -> Result<(), CliError> {
    let report = gpkg::validate(&path)?;
    if json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{text}");
    } else {
        print!("{}", render_validation(&report));
    }

    if !report.is_compliant() {
        return Err(CliError::new(EXIT_GPKG_INVALID, format!("{} is not a compliant GeoPackage", path.display()))
            .with_hint("rebuild it with `geomatrix gpkg build`"));
    }
    Ok(())
}

fn render_summary(verb: &str, summary: &WriteSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{verb} {}", summary.path.display());
    for (kind, rows) in &summary.tables {
        let _ = writeln!(out, "  {:<26} {rows} rows", kind.table_name());
    }
    out
}

fn check(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "FAIL"
    }
}

pub fn render_validation(report: &ValidationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", report.path.display());
    let _ = writeln!(
        out,
        "  [{}] application_id 0x{:08X}",
        check(report.application_id_ok()),
        report.application_id
    );
    let _ = writeln!(
        out,
        "  [{}] metadata tables{}",
        check(report.missing_required.is_empty()),
        if report.missing_required.is_empty() {
            String::new()
        } else {
            format!(" (missing: {})", report.missing_required.join(", "))
        }
    );
    for (srs_id, name) in &report.spatial_ref_systems {
        let _ = writeln!(out, "       srs {srs_id}: {name}");
    }
    for content in &report.contents {
        let rows = content
            .row_count
            .map(|n| format!("{n} rows"))
            .unwrap_or_else(|| "table missing".to_string());
        let _ = writeln!(out, "       content {} ({}): {rows}", content.table_name, content.data_type);
    }
    for table in &report.data_tables {
        let _ = writeln!(
            out,
            "  [{}] {} ({} rows, {} columns)",
            check(table.present),
            table.kind.table_name(),
            table.rows,
            table.columns
        );
    }
    let _ = writeln!(out, "{}", if report.is_compliant() { "compliant" } else { "not compliant" });
    out
}
