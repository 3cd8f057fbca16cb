//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | matrix           | Settings, data loading, lookups, audit   |
//! | 10-19   | gpkg             | GeoPackage build/update/validate         |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use geomatrix_config::ConfigError;
use geomatrix_io::DataLoadError;
use geomatrix_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Matrix (3-9)
// =============================================================================

/// Settings file unreadable, unparsable, or invalid.
pub const EXIT_CONFIG: u8 = 3;

/// A table could not be read, decoded, or parsed.
pub const EXIT_DATA_LOAD: u8 = 4;

/// Requested feature name is not in the master table.
pub const EXIT_FEATURE_NOT_FOUND: u8 = 5;

/// `audit --strict` found names that do not line up exactly.
pub const EXIT_AUDIT_MISMATCH: u8 = 6;

// =============================================================================
// GeoPackage (10-19)
// =============================================================================

/// Build or update failed while reading CSVs or writing the package.
pub const EXIT_GPKG_WRITE: u8 = 10;

/// `gpkg validate` found the file is not a compliant package.
pub const EXIT_GPKG_INVALID: u8 = 11;

/// Map a reconciler error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::DataLoad(_) => EXIT_DATA_LOAD,
        ReconError::FeatureNotFound { .. } => EXIT_FEATURE_NOT_FOUND,
        ReconError::Config(_) => EXIT_CONFIG,
    }
}

/// Map a settings error to its exit code.
pub fn config_exit_code(_err: &ConfigError) -> u8 {
    EXIT_CONFIG
}

/// Map a storage error to its exit code.
pub fn data_exit_code(err: &DataLoadError) -> u8 {
    match err {
        DataLoadError::InvalidSource { .. } => EXIT_USAGE,
        _ => EXIT_DATA_LOAD,
    }
}
