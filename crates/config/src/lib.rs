// Configuration loading

pub mod settings;

pub use settings::{ConfigError, DataSettings, LogSettings, Settings, CONFIG_ENV, DATA_ENV};
