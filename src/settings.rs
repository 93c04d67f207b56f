use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.json";
const APP_DIR_NAME: &str = "manual-studio";
const ENDPOINT_ENV: &str = "MANUAL_STUDIO_ENDPOINT";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Could not determine config directory")]
    NoConfigDir,
    #[error("Settings I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Manual generator endpoint (multipart POST).
    pub endpoint: String,

    /// Ask the backend to generate illustrations alongside the text.
    pub generate_images: bool,

    /// HTTP client timeout. The workflow itself never times out; only the
    /// transport gives up after this long.
    pub request_timeout_secs: u64,

    /// JPEG quality for captured photos (1-100).
    pub photo_quality: u8,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000/generate-manual".to_string(),
            generate_images: true,
            request_timeout_secs: 300,
            photo_quality: 90,
        }
    }
}

impl AppSettings {
    /// Apply environment overrides. Loads `.env` first if present.
    pub fn with_env_overrides(mut self) -> Self {
        // Development convenience; production uses real env vars.
        let _ = dotenvy::dotenv();

        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                log::info!("Settings: endpoint overridden by {}", ENDPOINT_ENV);
                self.endpoint = endpoint.trim().to_string();
            }
        }
        self
    }

    fn normalized(mut self) -> Self {
        self.photo_quality = self.photo_quality.clamp(1, 100);
        self
    }
}

/// `<config_dir>/manual-studio/settings.json`
pub fn settings_path() -> Result<PathBuf, SettingsError> {
    let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
    Ok(dir.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
}

/// Load settings from the default location plus env overrides.
pub fn load_settings() -> AppSettings {
    let settings = match settings_path() {
        Ok(path) => load_settings_from(&path),
        Err(e) => {
            log::warn!("Settings: {}", e);
            AppSettings::default()
        }
    };
    settings.with_env_overrides()
}

/// Missing file gives defaults; unreadable or malformed files give defaults
/// with a warning.
pub fn load_settings_from(path: &Path) -> AppSettings {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<AppSettings>(&contents) {
            Ok(settings) => settings.normalized(),
            Err(e) => {
                log::warn!("Settings: failed to parse {:?}: {}", path, e);
                AppSettings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppSettings::default(),
        Err(e) => {
            log::warn!("Settings: failed to read {:?}: {}", path, e);
            AppSettings::default()
        }
    }
}

pub fn save_settings(settings: &AppSettings) -> Result<(), SettingsError> {
    save_settings_to(&settings_path()?, settings)
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let contents = serde_json::to_string_pretty(settings)?;

    // Write to a temp file in the same directory, then rename over the target.
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &contents).map_err(io_err(&tmp_path))?;

    // Windows rename fails if the destination exists.
    if cfg!(windows) && path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(io_err(path)(e));
            }
        }
    }

    std::fs::rename(&tmp_path, path).map_err(io_err(path))?;
    Ok(())
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SettingsError {
    let path = path.to_path_buf();
    move |source| SettingsError::Io { path, source }
}
