// Application settings
// Loaded from ~/.config/geomatrix/settings.toml

use std::fs;
use std::path::{Path, PathBuf};

use geomatrix_io::{ReadOptions, TextEncoding, DEFAULT_CHAIN};
use geomatrix_recon::{ReconConfig, ReconError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings file override.
pub const CONFIG_ENV: &str = "GEOMATRIX_CONFIG";
/// Data source override.
pub const DATA_ENV: &str = "GEOMATRIX_DATA";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },
}

/// Where the matrix tables live and how to decode them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// A GeoPackage file or a directory of CSV files.
    pub path: PathBuf,
    pub encodings: Vec<TextEncoding>,
    /// Omit to sniff per file.
    pub delimiter: Option<char>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/geological_data.gpkg"),
            encodings: DEFAULT_CHAIN.to_vec(),
            delimiter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { filter: "warn".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub recon: ReconConfig,
    pub log: LogSettings,
}

impl Settings {
    /// Per-user settings file, if the platform has a config directory.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("geomatrix").join("settings.toml"))
    }

    /// Find and load settings: `explicit` path, then `GEOMATRIX_CONFIG`, then
    /// the per-user file, then built-in defaults.
    ///
    /// A path given explicitly or through the environment must exist; the
    /// per-user file is optional. Returns the file actually read, if any.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match locate(explicit.map(Path::to_path_buf), from_env, Self::config_path()) {
            Some(path) => {
                let settings = Self::load_from(&path)?;
                Ok((settings, Some(path)))
            }
            None => {
                tracing::debug!("no settings file found; using defaults");
                Ok((Self::default(), None))
            }
        }
    }

    /// Load and validate one settings file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::parse(path, &contents)?;
        tracing::debug!(path = %path.display(), data = %settings.data.path.display(), "loaded settings");
        Ok(settings)
    }

    /// Parse a TOML document. `path` is only used for error context.
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate().map_err(|message| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.data.encodings.is_empty() {
            return Err("data.encodings must list at least one encoding".to_string());
        }
        if let Some(delimiter) = self.data.delimiter {
            if !delimiter.is_ascii() || delimiter == '"' || delimiter == '\n' || delimiter == '\r' {
                return Err(format!("data.delimiter {delimiter:?} must be a single ASCII separator"));
            }
        }
        if self.log.filter.trim().is_empty() {
            return Err("log.filter must not be empty".to_string());
        }
        self.recon.validate().map_err(|e| match e {
            ReconError::Config(message) => format!("recon: {message}"),
            other => other.to_string(),
        })
    }

    /// Decoding options for the table readers.
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            encodings: self.data.encodings.clone(),
            // validate() keeps this ASCII
            delimiter: self.data.delimiter.map(|c| c as u8),
        }
    }
}

fn locate(explicit: Option<PathBuf>, from_env: Option<PathBuf>, user_file: Option<PathBuf>) -> Option<PathBuf> {
    explicit
        .or(from_env.filter(|p| !p.as_os_str().is_empty()))
        .or_else(|| user_file.filter(|p| p.is_file()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomatrix_recon::ConstraintKind;

    fn parse(s: &str) -> Result<Settings, ConfigError> {
        Settings::parse(Path::new("settings.toml"), s)
    }

    #[test]
    fn empty_document_gives_defaults() {
        let settings = parse("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.read_options(), ReadOptions::default());
        assert_eq!(settings.log.filter, "warn");
    }

    #[test]
    fn full_document_round_trips_sections() {
        let settings = parse(
            r#"
[data]
path = "matrix"
encodings = ["utf-8", "cp1252"]
delimiter = ";"

[recon]
constraint_tables = ["engineering"]
ignored_flags = []

[recon.columns]
name = "Feature"

[log]
filter = "geomatrix_recon=debug"
"#,
        )
        .unwrap();

        assert_eq!(settings.data.path, PathBuf::from("matrix"));
        let options = settings.read_options();
        assert_eq!(options.encodings, vec![TextEncoding::Utf8, TextEncoding::Windows1252]);
        assert_eq!(options.delimiter, Some(b';'));
        assert_eq!(settings.recon.constraint_tables, vec![ConstraintKind::Engineering]);
        assert!(settings.recon.ignored_flags.is_empty());
        assert_eq!(settings.recon.columns.name, "Feature");
        // Unlisted columns keep their defaults
        assert_eq!(settings.recon.columns.piles, "Piles_Assessment");
        assert_eq!(settings.log.filter, "geomatrix_recon=debug");
    }

    #[test]
    fn unknown_encoding_is_a_parse_error() {
        let err = parse("[data]\nencodings = [\"ebcdic\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("settings.toml"));
    }

    #[test]
    fn empty_encoding_list_is_rejected() {
        let err = parse("[data]\nencodings = []\n").unwrap_err();
        match err {
            ConfigError::Invalid { message, .. } => assert!(message.contains("encodings")),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        assert!(parse("[data]\ndelimiter = \"§\"\n").is_err());
        assert!(parse("[data]\ndelimiter = \"\\\"\"\n").is_err());
        assert!(parse("[data]\ndelimiter = \"\\t\"\n").is_ok());
    }

    #[test]
    fn recon_validation_surfaces() {
        let err = parse("[recon]\nflag_markers = []\n").unwrap_err();
        assert!(err.to_string().contains("recon: flag_markers"), "{err}");
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[data]\npath = \"/srv/matrix.gpkg\"\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.data.path, PathBuf::from("/srv/matrix.gpkg"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn explicit_then_env_then_user_file() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("settings.toml");
        let explicit = PathBuf::from("explicit.toml");
        let env = PathBuf::from("env.toml");

        assert_eq!(
            locate(Some(explicit.clone()), Some(env.clone()), Some(user.clone())),
            Some(explicit)
        );
        assert_eq!(locate(None, Some(env.clone()), Some(user.clone())), Some(env));
        // Empty env var counts as unset
        assert_eq!(locate(None, Some(PathBuf::new()), Some(user.clone())), None);

        // User file only counts once it exists
        assert_eq!(locate(None, None, Some(user.clone())), None);
        fs::write(&user, "").unwrap();
        assert_eq!(locate(None, None, Some(user.clone())), Some(user));
        assert_eq!(locate(None, None, None), None);
    }
}
