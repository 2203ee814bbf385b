// Configuration loading

pub mod keys;
pub mod settings;

pub use keys::{get_api_key, KeyLookup, KeySource};
pub use settings::{CacheSettings, OracleSettings, Settings, SettingsError};
