use std::{fs::read_to_string, path::PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://genvision.db";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 20;

/// Json struct for server settings.
///
/// Every field is optional in the file; missing values fall back to the defaults above.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SettingsFile {
    pub database_url: Option<String>,
    pub port: Option<u16>,
    pub uploads_dir: Option<PathBuf>,
    pub max_upload_mb: Option<u64>,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Overrides given on the command line or through the environment
#[derive(Clone, Debug, Default)]
pub struct SettingsOverrides {
    pub database_url: Option<String>,
    pub port: Option<u16>,
    pub uploads_dir: Option<PathBuf>,
    pub max_upload_mb: Option<u64>,
}

/// Resolved settings used by the running server
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub port: u16,
    pub uploads_dir: PathBuf,
    pub max_upload_mb: u64,
    pub allowed_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::resolve(SettingsFile::default(), SettingsOverrides::default())
    }
}

impl Settings {
    /// Load settings from an optional Json file, then apply overrides on top.
    pub fn load(
        file: Option<&PathBuf>,
        overrides: SettingsOverrides,
    ) -> anyhow::Result<Self> {
        let file = match file {
            Some(path) => {
                log::info!("Loading settings from {}", path.display());
                serde_json::from_str::<SettingsFile>(&read_to_string(path)?)?
            }
            None => SettingsFile::default(),
        };

        Ok(Settings::resolve(file, overrides))
    }

    pub fn resolve(file: SettingsFile, overrides: SettingsOverrides) -> Self {
        Settings {
            database_url: overrides
                .database_url
                .or(file.database_url)
                .unwrap_or(DEFAULT_DATABASE_URL.to_owned()),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            uploads_dir: overrides
                .uploads_dir
                .or(file.uploads_dir)
                .unwrap_or(PathBuf::from(DEFAULT_UPLOADS_DIR)),
            max_upload_mb: overrides
                .max_upload_mb
                .or(file.max_upload_mb)
                .unwrap_or(DEFAULT_MAX_UPLOAD_MB),
            allowed_origins: file.allowed_origins,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
