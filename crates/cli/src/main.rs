// geomatrix CLI - seabed feature lookups over the geo-assessment matrix

mod exit_codes;
mod gpkg;
mod logging;
mod matrix;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use geomatrix_config::{ConfigError, Settings, DATA_ENV};
use geomatrix_io::DataLoadError;
use geomatrix_recon::{FoundationType, ReconError};

use exit_codes::{config_exit_code, data_exit_code, recon_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "geomatrix")]
#[command(about = "Look up seabed geological features and their foundation constraints")]
#[command(version)]
struct Cli {
    /// Settings file (default: $GEOMATRIX_CONFIG, then the per-user settings.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// GeoPackage file or CSV directory; overrides data.path
    #[arg(long, global = true, env = DATA_ENV)]
    data: Option<PathBuf>,

    /// Log at debug level (overrides the settings file, not RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every feature name in the master table
    #[command(after_help = "\
Examples:
  geomatrix features
  geomatrix features --data data/csv --json")]
    Features {
        #[arg(long)]
        json: bool,
    },

    /// Show one feature with its assessments and constraint flags
    #[command(after_help = "\
Examples:
  geomatrix show 'Soft mud'
  geomatrix show 'Shallow gas' --json")]
    Show {
        /// Feature name, exactly as in the master table
        name: String,

        #[arg(long)]
        json: bool,
    },

    /// Show two features side by side
    #[command(after_help = "\
Examples:
  geomatrix compare 'Soft mud' Esker
  geomatrix compare 'Soft mud' Esker --foundation suction-caisson")]
    Compare {
        name_a: String,
        name_b: String,

        /// Only show the assessment for this foundation type
        #[arg(long, value_enum)]
        foundation: Option<FoundationArg>,

        #[arg(long)]
        json: bool,
    },

    /// Report names that do not line up between the master and constraint tables
    #[command(after_help = "\
Examples:
  geomatrix audit
  geomatrix audit --json --strict")]
    Audit {
        #[arg(long)]
        json: bool,

        /// Exit non-zero unless every name matches exactly
        #[arg(long)]
        strict: bool,
    },

    /// Build, update, or validate the GeoPackage
    #[command(subcommand)]
    Gpkg(gpkg::GpkgCommands),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FoundationArg {
    Piles,
    SuctionCaisson,
    Gbs,
    Cables,
}

impl From<FoundationArg> for FoundationType {
    fn from(arg: FoundationArg) -> Self {
        match arg {
            FoundationArg::Piles => Self::Piles,
            FoundationArg::SuctionCaisson => Self::SuctionCaisson,
            FoundationArg::Gbs => Self::Gbs,
            FoundationArg::Cables => Self::Cables,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let (mut settings, settings_path) = Settings::discover(cli.config.as_deref())?;
    logging::init(cli.verbose, &settings.log.filter);
    if let Some(path) = &settings_path {
        tracing::debug!(path = %path.display(), "using settings file");
    }
    if let Some(data) = cli.data {
        settings.data.path = data;
    }

    match cli.command {
        Commands::Features { json } => matrix::cmd_features(&settings, json),
        Commands::Show { name, json } => matrix::cmd_show(&settings, &name, json),
        Commands::Compare {
            name_a,
            name_b,
            foundation,
            json,
        } => matrix::cmd_compare(&settings, &name_a, &name_b, foundation.map(Into::into), json),
        Commands::Audit { json, strict } => matrix::cmd_audit(&settings, json, strict),
        Commands::Gpkg(cmd) => gpkg::cmd_gpkg(&settings, cmd),
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::new(config_exit_code(&err), err.to_string())
    }
}

impl From<DataLoadError> for CliError {
    fn from(err: DataLoadError) -> Self {
        let hint = match &err {
            DataLoadError::Encoding { .. } => Some("add the file's encoding to data.encodings in settings.toml"),
            DataLoadError::InvalidSource { .. } => Some("pass --data or set data.path in settings.toml"),
            DataLoadError::MissingColumn { .. } => Some("column names are set under [recon.columns] in settings.toml"),
            _ => None,
        };
        Self {
            code: data_exit_code(&err),
            message: err.to_string(),
            hint: hint.map(String::from),
        }
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        match err {
            ReconError::DataLoad(inner) => inner.into(),
            ReconError::FeatureNotFound { .. } => Self::new(recon_exit_code(&err), err.to_string())
                .with_hint("names are case-sensitive; run `geomatrix features` for the list"),
            other => Self::new(recon_exit_code(&other), other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn not_found_carries_hint() {
        let err: CliError = ReconError::FeatureNotFound { name: "Seamount".into() }.into();
        assert_eq!(err.code, exit_codes::EXIT_FEATURE_NOT_FOUND);
        assert!(err.message.contains("Seamount"));
        assert!(err.hint.is_some());
    }

    #[test]
    fn wrapped_data_errors_keep_their_code() {
        let err: CliError = ReconError::DataLoad(DataLoadError::Encoding {
            origin: "geological_data.csv".into(),
            attempted: vec![geomatrix_io::TextEncoding::Utf8],
        })
        .into();
        assert_eq!(err.code, exit_codes::EXIT_DATA_LOAD);
        assert!(err.message.contains("tried utf-8"));
        assert!(err.hint.is_some());
    }

    #[test]
    fn compare_foundation_takes_kebab_case_names() {
        let cli = Cli::try_parse_from(["geomatrix", "compare", "Soft mud", "Esker", "--foundation", "suction-caisson"])
            .unwrap();
        match cli.command {
            Commands::Compare { foundation: Some(f), .. } => {
                assert_eq!(FoundationType::from(f), FoundationType::SuctionCaisson);
            }
            _ => panic!("expected compare with a foundation"),
        }
        assert!(Cli::try_parse_from(["geomatrix", "compare", "a", "b", "--foundation", "monopile"]).is_err());
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["geomatrix", "show", "Soft mud", "--data", "matrix", "-v"]).unwrap();
        assert_eq!(cli.data, Some(PathBuf::from("matrix")));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Show { ref name, json: false } if name == "Soft mud"));
    }
}
