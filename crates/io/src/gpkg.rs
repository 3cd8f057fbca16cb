// GeoPackage (SQLite) tables: read, regenerate from CSV, validate

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, Transaction};
use serde::Serialize;

use crate::csv;
use crate::encoding::decode_with_fallback;
use crate::error::DataLoadError;
use crate::source::TableSource;
use crate::table::{RawTable, ReadOptions, TableKind};

/// `PRAGMA application_id` of an OGC GeoPackage ("GP10").
pub const GPKG_APPLICATION_ID: i64 = 0x4750_3130;

/// `PRAGMA user_version` for GeoPackage 1.3.
pub const GPKG_USER_VERSION: i64 = 10300;

/// Metadata tables every GeoPackage must carry.
pub const REQUIRED_TABLES: [&str; 2] = ["gpkg_spatial_ref_sys", "gpkg_contents"];

const METADATA_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS gpkg_spatial_ref_sys (
    srs_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL PRIMARY KEY,
    organization TEXT NOT NULL,
    organization_coordsys_id INTEGER NOT NULL,
    definition TEXT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS gpkg_contents (
    table_name TEXT NOT NULL PRIMARY KEY,
    data_type TEXT NOT NULL,
    identifier TEXT UNIQUE,
    description TEXT DEFAULT '',
    last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    min_x DOUBLE,
    min_y DOUBLE,
    max_x DOUBLE,
    max_y DOUBLE,
    srs_id INTEGER,
    CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
"#;

const WGS84_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// A GeoPackage file holding the three matrix tables.
#[derive(Debug, Clone)]
pub struct GeoPackage {
    path: PathBuf,
    options: ReadOptions,
}

impl GeoPackage {
    pub fn new(path: impl Into<PathBuf>, options: ReadOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection, DataLoadError> {
        require_file(&self.path)?;
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| DataLoadError::database(self.path.display().to_string(), e))
    }
}

impl TableSource for GeoPackage {
    fn describe(&self) -> String {
        format!("GeoPackage {}", self.path.display())
    }

    fn read_table(&self, kind: TableKind) -> Result<RawTable, DataLoadError> {
        let conn = self.open()?;
        let table = read_sql_table(&conn, &self.path, kind.table_name(), &self.options)?;
        tracing::debug!(origin = %table.origin, rows = table.len(), "read geopackage table");
        Ok(table)
    }
}

fn read_sql_table(
    conn: &Connection,
    path: &Path,
    table: &str,
    options: &ReadOptions,
) -> Result<RawTable, DataLoadError> {
    let origin = format!("{}#{}", path.display(), table);
    let db = |e| DataLoadError::database(&origin, e);

    if !table_exists(conn, table).map_err(db)? {
        return Err(DataLoadError::MissingTable {
            origin: path.display().to_string(),
            table: table.to_string(),
        });
    }

    let mut stmt = conn
        .prepare(&format!("SELECT * FROM {}", quote_ident(table)))
        .map_err(db)?;
    let headers: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = headers.len();

    let mut rows = Vec::new();
    let mut result = stmt.query([]).map_err(db)?;
    while let Some(row) = result.next().map_err(db)? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            let value = row.get_ref(i).map_err(db)?;
            cells.push(cell_text(value, &origin, options)?);
        }
        rows.push(cells);
    }

    Ok(RawTable::new(origin, headers, rows))
}

/// Render one SQLite value as text. Text and blobs go through the encoding chain
/// because the store may have been written by tools that did not transcode.
fn cell_text(value: ValueRef<'_>, origin: &str, options: &ReadOptions) -> Result<String, DataLoadError> {
    match value {
        ValueRef::Null => Ok(String::new()),
        ValueRef::Integer(i) => Ok(i.to_string()),
        ValueRef::Real(f) => Ok(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => decode_with_fallback(bytes, &options.encodings)
            .map(|d| d.text)
            .map_err(|attempted| DataLoadError::Encoding {
                origin: origin.to_string(),
                attempted,
            }),
    }
}

fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [table],
        |row| row.get(0),
    )
}

fn list_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
    let names = stmt.query_map([], |row| row.get(0))?.collect();
    names
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn require_file(path: &Path) -> Result<(), DataLoadError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DataLoadError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        })
    }
}

// ---------------------------------------------------------------------------
// Regeneration
// ---------------------------------------------------------------------------

/// Row counts written per table by [`build`] or [`update`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub tables: Vec<(TableKind, usize)>,
}

/// Create `out` from the three CSV files in `csv_dir`, replacing any existing file.
///
/// All CSV files are read before `out` is touched.
pub fn build(csv_dir: &Path, out: &Path, options: &ReadOptions) -> Result<WriteSummary, DataLoadError> {
    let tables = read_csv_tables(csv_dir, options)?;

    if out.exists() {
        std::fs::remove_file(out).map_err(|source| DataLoadError::Io {
            path: out.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %out.display(), "removed existing geopackage");
    }

    let mut conn = Connection::open(out).map_err(|e| DataLoadError::database(out.display().to_string(), e))?;
    write_package(&mut conn, out, &tables)
}

/// Replace the data tables of an existing GeoPackage with the current CSV files.
pub fn update(csv_dir: &Path, gpkg: &Path, options: &ReadOptions) -> Result<WriteSummary, DataLoadError> {
    require_file(gpkg)?;
    let tables = read_csv_tables(csv_dir, options)?;
    let mut conn = Connection::open(gpkg).map_err(|e| DataLoadError::database(gpkg.display().to_string(), e))?;
    write_package(&mut conn, gpkg, &tables)
}

fn read_csv_tables(csv_dir: &Path, options: &ReadOptions) -> Result<Vec<(TableKind, RawTable)>, DataLoadError> {
    TableKind::ALL
        .iter()
        .map(|&kind| csv::read_table(&csv_dir.join(kind.file_name()), options).map(|t| (kind, t)))
        .collect()
}

fn write_package(
    conn: &mut Connection,
    path: &Path,
    tables: &[(TableKind, RawTable)],
) -> Result<WriteSummary, DataLoadError> {
    let origin = path.display().to_string();
    let db = |e| DataLoadError::database(&origin, e);

    conn.pragma_update(None, "application_id", GPKG_APPLICATION_ID).map_err(db)?;
    conn.pragma_update(None, "user_version", GPKG_USER_VERSION).map_err(db)?;

    let tx = conn.transaction().map_err(db)?;
    tx.execute_batch(METADATA_SCHEMA).map_err(db)?;
    insert_spatial_ref_systems(&tx).map_err(db)?;

    let mut written = Vec::with_capacity(tables.len());
    for (kind, table) in tables {
        write_table(&tx, kind.table_name(), table).map_err(db)?;
        tx.execute(
            "INSERT OR REPLACE INTO gpkg_contents (table_name, data_type, identifier, description) \
             VALUES (?1, 'attributes', ?2, ?3)",
            params![kind.table_name(), kind.table_name(), contents_description(kind.table_name())],
        )
        .map_err(db)?;
        tracing::info!(table = kind.table_name(), rows = table.len(), "wrote table");
        written.push((*kind, table.len()));
    }

    tx.commit().map_err(db)?;
    Ok(WriteSummary {
        path: path.to_path_buf(),
        tables: written,
    })
}

fn insert_spatial_ref_systems(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare(
        "INSERT OR IGNORE INTO gpkg_spatial_ref_sys \
         (srs_name, srs_id, organization, organization_coordsys_id, definition, description) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    stmt.execute(params!["WGS 84 geodetic", 4326, "EPSG", 4326, WGS84_WKT, "longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid"])?;
    stmt.execute(params!["Undefined cartesian SRS", -1, "NONE", -1, "undefined", "undefined cartesian coordinate reference system"])?;
    stmt.execute(params!["Undefined geographic SRS", 0, "NONE", 0, "undefined", "undefined geographic coordinate reference system"])?;
    Ok(())
}

fn write_table(tx: &Transaction<'_>, name: &str, table: &RawTable) -> rusqlite::Result<()> {
    // RawTable headers are already unique and non-blank
    let columns = &table.headers;
    let column_defs: Vec<String> = columns.iter().map(|c| format!("{} TEXT", quote_ident(c))).collect();

    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {ident}; CREATE TABLE {ident} ({defs});",
        ident = quote_ident(name),
        defs = column_defs.join(", "),
    ))?;

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {} VALUES ({})",
        quote_ident(name),
        placeholders.join(", ")
    ))?;

    for row in &table.rows {
        // Empty cells are stored as NULL
        let values: Vec<Option<&str>> = row
            .iter()
            .map(|cell| if cell.is_empty() { None } else { Some(cell.as_str()) })
            .collect();
        stmt.execute(rusqlite::params_from_iter(values))?;
    }
    Ok(())
}

/// `geological_features` -> `EGDI Geological Features`
fn contents_description(table_name: &str) -> String {
    let words: Vec<String> = table_name
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    format!("EGDI {}", words.join(" "))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RegisteredContent {
    pub table_name: String,
    pub data_type: String,
    pub identifier: Option<String>,
    /// `None` when the registered table does not exist.
    pub row_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataTableCheck {
    pub kind: TableKind,
    pub present: bool,
    pub rows: i64,
    pub columns: usize,
}

/// Result of checking a file against the GeoPackage requirements this tool
/// depends on.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub path: PathBuf,
    pub application_id: i64,
    pub tables: Vec<String>,
    pub missing_required: Vec<String>,
    pub spatial_ref_systems: Vec<(i64, String)>,
    pub contents: Vec<RegisteredContent>,
    pub data_tables: Vec<DataTableCheck>,
}

impl ValidationReport {
    pub fn application_id_ok(&self) -> bool {
        self.application_id == GPKG_APPLICATION_ID
    }

    pub fn is_compliant(&self) -> bool {
        self.application_id_ok()
            && self.missing_required.is_empty()
            && self.data_tables.iter().all(|t| t.present)
    }
}

/// Inspect `path` without modifying it.
pub fn validate(path: &Path) -> Result<ValidationReport, DataLoadError> {
    require_file(path)?;
    let origin = path.display().to_string();
    let db = |e| DataLoadError::database(&origin, e);

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(db)?;
    let application_id: i64 = conn
        .query_row("PRAGMA application_id", [], |row| row.get(0))
        .map_err(db)?;
    let tables = list_tables(&conn).map_err(db)?;

    let missing_required: Vec<String> = REQUIRED_TABLES
        .iter()
        .filter(|t| !tables.iter().any(|name| name == *t))
        .map(|t| t.to_string())
        .collect();

    let mut report = ValidationReport {
        path: path.to_path_buf(),
        application_id,
        tables,
        missing_required,
        spatial_ref_systems: Vec::new(),
        contents: Vec::new(),
        data_tables: Vec::new(),
    };

    if report.missing_required.is_empty() {
        let mut stmt = conn
            .prepare("SELECT srs_id, srs_name FROM gpkg_spatial_ref_sys ORDER BY srs_id")
            .map_err(db)?;
        report.spatial_ref_systems = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(db)?
            .collect::<rusqlite::Result<_>>()
            .map_err(db)?;

        let mut stmt = conn
            .prepare("SELECT table_name, data_type, identifier FROM gpkg_contents ORDER BY table_name")
            .map_err(db)?;
        let registered: Vec<(String, String, Option<String>)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .map_err(db)?
            .collect::<rusqlite::Result<_>>()
            .map_err(db)?;

        for (table_name, data_type, identifier) in registered {
            let row_count = if report.tables.contains(&table_name) {
                Some(count_rows(&conn, &table_name).map_err(db)?)
            } else {
                None
            };
            report.contents.push(RegisteredContent {
                table_name,
                data_type,
                identifier,
                row_count,
            });
        }
    }

    for kind in TableKind::ALL {
        let name = kind.table_name();
        let check = if report.tables.iter().any(|t| t == name) {
            let rows = count_rows(&conn, name).map_err(db)?;
            let columns = conn
                .prepare(&format!("SELECT * FROM {} LIMIT 0", quote_ident(name)))
                .map_err(db)?
                .column_count();
            DataTableCheck { kind, present: true, rows, columns }
        } else {
            DataTableCheck { kind, present: false, rows: 0, columns: 0 }
        };
        report.data_tables.push(check);
    }

    Ok(report)
}

fn count_rows(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)), [], |row| row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_csv_dir(dir: &Path) {
        fs::write(
            dir.join(TableKind::Features.file_name()),
            "Geological_Feature,Setting,Piles_Assessment\nSoft mud,Sediments,Higher Constraint\nEsker,Glacial,\n",
        )
        .unwrap();
        fs::write(
            dir.join(TableKind::GeologicalConstraints.file_name()),
            b"Geological feature inventory,Definition ,Rafts or boulders\nSoft mud,Soft d\xE9p\xF4t,x\n",
        )
        .unwrap();
        fs::write(
            dir.join(TableKind::EngineeringConstraints.file_name()),
            "Geological feature inventory,Blowout,\nSoft mud,,x\n",
        )
        .unwrap();
    }

    #[test]
    fn build_then_read_round_trips_cells() {
        let dir = tempdir().unwrap();
        write_csv_dir(dir.path());
        let out = dir.path().join("geological_data.gpkg");

        let summary = build(dir.path(), &out, &ReadOptions::default()).unwrap();
        assert_eq!(summary.tables.len(), 3);
        assert_eq!(summary.tables[0], (TableKind::Features, 2));

        let gpkg = GeoPackage::new(&out, ReadOptions::default());
        let features = gpkg.read_table(TableKind::Features).unwrap();
        assert_eq!(features.headers, vec!["Geological_Feature", "Setting", "Piles_Assessment"]);
        assert_eq!(features.rows[0], vec!["Soft mud", "Sediments", "Higher Constraint"]);
        // Empty CSV cell -> NULL -> empty string
        assert_eq!(features.rows[1][2], "");

        let geo = gpkg.read_table(TableKind::GeologicalConstraints).unwrap();
        assert_eq!(geo.headers[1], "Definition");
        assert_eq!(geo.rows[0][1], "Soft dépôt");
    }

    #[test]
    fn blank_header_gets_placeholder_name() {
        let dir = tempdir().unwrap();
        write_csv_dir(dir.path());
        let out = dir.path().join("geological_data.gpkg");
        build(dir.path(), &out, &ReadOptions::default()).unwrap();

        let eng = GeoPackage::new(&out, ReadOptions::default())
            .read_table(TableKind::EngineeringConstraints)
            .unwrap();
        assert_eq!(eng.headers, vec!["Geological feature inventory", "Blowout", "Unnamed: 2"]);
    }

    #[test]
    fn built_package_validates() {
        let dir = tempdir().unwrap();
        write_csv_dir(dir.path());
        let out = dir.path().join("geological_data.gpkg");
        build(dir.path(), &out, &ReadOptions::default()).unwrap();

        let report = validate(&out).unwrap();
        assert!(report.application_id_ok());
        assert!(report.is_compliant(), "{report:?}");
        assert_eq!(report.spatial_ref_systems.len(), 3);
        assert_eq!(report.contents.len(), 3);
        let features = report
            .contents
            .iter()
            .find(|c| c.table_name == "geological_features")
            .unwrap();
        assert_eq!(features.data_type, "attributes");
        assert_eq!(features.row_count, Some(2));
        assert!(report.data_tables.iter().all(|t| t.present));
    }

    #[test]
    fn plain_sqlite_file_is_not_compliant() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE geological_features (Geological_Feature TEXT);").unwrap();
        drop(conn);

        let report = validate(&path).unwrap();
        assert!(!report.application_id_ok());
        assert_eq!(report.missing_required, vec!["gpkg_spatial_ref_sys", "gpkg_contents"]);
        assert!(!report.is_compliant());
    }

    #[test]
    fn update_replaces_rows() {
        let dir = tempdir().unwrap();
        write_csv_dir(dir.path());
        let out = dir.path().join("geological_data.gpkg");
        build(dir.path(), &out, &ReadOptions::default()).unwrap();

        fs::write(
            dir.path().join(TableKind::Features.file_name()),
            "Geological_Feature,Setting\nSand,Sediments\nGravel,Sediments\nBeach,Coastal\n",
        )
        .unwrap();
        let summary = update(dir.path(), &out, &ReadOptions::default()).unwrap();
        assert_eq!(summary.tables[0], (TableKind::Features, 3));

        let features = GeoPackage::new(&out, ReadOptions::default())
            .read_table(TableKind::Features)
            .unwrap();
        assert_eq!(features.headers, vec!["Geological_Feature", "Setting"]);
        assert_eq!(features.len(), 3);
        assert!(validate(&out).unwrap().is_compliant());
    }

    #[test]
    fn update_requires_existing_package() {
        let dir = tempdir().unwrap();
        write_csv_dir(dir.path());
        let err = update(dir.path(), &dir.path().join("missing.gpkg"), &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, DataLoadError::Io { .. }));
    }

    #[test]
    fn build_fails_before_touching_output_when_csv_missing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("geological_data.gpkg");
        fs::write(&out, b"keep me").unwrap();

        let err = build(dir.path(), &out, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, DataLoadError::Io { .. }));
        assert_eq!(fs::read(&out).unwrap(), b"keep me");
    }

    #[test]
    fn missing_table_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.gpkg");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE geological_features (Geological_Feature TEXT);").unwrap();
        drop(conn);

        let err = GeoPackage::new(&path, ReadOptions::default())
            .read_table(TableKind::EngineeringConstraints)
            .unwrap_err();
        match err {
            DataLoadError::MissingTable { table, .. } => assert_eq!(table, "engineering_constraints"),
            other => panic!("expected missing table, got {other:?}"),
        }
    }

    #[test]
    fn numeric_and_blob_cells_become_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("typed.gpkg");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE geological_constraints (name TEXT, flag INTEGER, depth REAL, raw BLOB);")
            .unwrap();
        conn.execute(
            "INSERT INTO geological_constraints VALUES (?1, ?2, ?3, ?4)",
            params!["Beach", 1, 2.5, b"R\xE9cif".to_vec()],
        )
        .unwrap();
        drop(conn);

        let table = GeoPackage::new(&path, ReadOptions::default())
            .read_table(TableKind::GeologicalConstraints)
            .unwrap();
        assert_eq!(table.rows[0], vec!["Beach", "1", "2.5", "Récif"]);
    }

    #[test]
    fn description_is_title_cased() {
        assert_eq!(contents_description("geological_features"), "EGDI Geological Features");
        assert_eq!(contents_description("engineering_constraints"), "EGDI Engineering Constraints");
    }
}
