//! Configuration for the catalog, the fetch tool and the FTP destination.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable that overrides [`CatalogConfig::api_key`].
pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";

/// Default number of catalog items shown per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Catalog listing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// YouTube Data API key.
    pub api_key: String,
    /// Number of items requested and shown per page.
    pub page_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// FTP destination configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// FTP server host name or address.
    pub host: String,
    /// FTP control port.
    pub port: u16,
    /// Login user name.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Remote root under which channel directories are created.
    pub target_directory: String,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 21,
            username: String::new(),
            password: String::new(),
            target_directory: "/".to_string(),
        }
    }
}

/// Configuration for the local fetch stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Path to the `yt-dlp` executable.
    pub ytdlp_path: PathBuf,
    /// Optional path to `ffmpeg`, passed to `yt-dlp` for merging streams.
    pub ffmpeg_path: Option<PathBuf>,
    /// `yt-dlp` format selector.
    pub format: String,
    /// Local directory that holds fetched artifacts for the duration of a run.
    pub work_dir: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: PathBuf::from("yt-dlp"),
            ffmpeg_path: None,
            format: "bestvideo[height<=720]+bestaudio/best[height<=720]".to_string(),
            work_dir: PathBuf::from("downloads"),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Catalog settings.
    pub catalog: CatalogConfig,
    /// FTP destination settings.
    pub destination: DestinationConfig,
    /// Fetch stage settings.
    pub fetch: FetchConfig,
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the default config file location.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kirinuki-ftp")
            .join("config.toml")
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.catalog.page_size = page_size;
        self
    }

    /// Replaces the API key when `key` is present and non-empty.
    #[must_use]
    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.catalog.api_key = key;
        }
        self
    }

    /// Loads the config at `path`, writing a template there first if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, written or parsed.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            log::info!("Wrote config template to {}", path.display());
            return Ok(config);
        }
        Self::load(path)
    }

    /// Loads the config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Configuration(format!("{}: {e}", path.display())))
    }

    /// Saves the config atomically (write tmp + rename).
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        let toml_str =
            toml::to_string(self).map_err(|e| Error::Configuration(e.to_string()))?;
        std::fs::write(&tmp_path, toml_str)?;

        // The file holds the FTP password in plain text
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Checks every setting needed before any work starts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.catalog.page_size == 0 {
            return Err(Error::Configuration(
                "page size must be at least 1".to_string(),
            ));
        }
        if self.catalog.api_key.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "no API key configured (set {API_KEY_ENV} or catalog.api_key)"
            )));
        }
        if self.destination.host.trim().is_empty() {
            return Err(Error::Configuration("destination host is empty".to_string()));
        }
        if self.destination.port == 0 {
            return Err(Error::Configuration("destination port must be 1-65535".to_string()));
        }
        let root = &self.destination.target_directory;
        if root.trim().is_empty() {
            return Err(Error::Configuration(
                "destination target directory is empty".to_string(),
            ));
        }
        // Relative roots would resolve against the login directory
        if !root.starts_with('/') {
            return Err(Error::Configuration(format!(
                "destination target directory must be absolute, got '{root}'"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::new().with_api_key_override(Some("key".to_string()));
        config.destination.host = "ftp.example.com".to_string();
        config
    }

    #[test]
    fn default_config() {
        let config = AppConfig::default();
        assert_eq!(config.catalog.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.destination.port, 21);
        assert_eq!(config.destination.target_directory, "/");
        assert_eq!(config.fetch.work_dir, PathBuf::from("downloads"));
        assert!(config.fetch.format.contains("height<=720"));
    }

    #[test]
    fn builder_pattern() {
        let config = AppConfig::new()
            .with_page_size(5)
            .with_api_key_override(Some("abc".to_string()));

        assert_eq!(config.catalog.page_size, 5);
        assert_eq!(config.catalog.api_key, "abc");
    }

    #[test]
    fn blank_api_key_override_is_ignored() {
        let mut config = AppConfig::new();
        config.catalog.api_key = "from-file".to_string();
        let config = config
            .with_api_key_override(Some("  ".to_string()))
            .with_api_key_override(None);
        assert_eq!(config.catalog.api_key, "from-file");
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let config = valid_config().with_page_size(0);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn validate_rejects_missing_host_and_root() {
        let mut config = valid_config();
        config.destination.host.clear();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let mut config = valid_config();
        config.destination.target_directory = " ".to_string();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let mut config = valid_config();
        config.destination.port = 0;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn validate_rejects_relative_root() {
        let mut config = valid_config();
        config.destination.target_directory = "videos".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must be absolute"), "{err}");

        config.destination.target_directory = "/videos".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_api_key() {
        let mut config = valid_config();
        config.catalog.api_key.clear();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [destination]
            host = "nas.local"
            "#,
        )
        .unwrap();
        assert_eq!(config.destination.host, "nas.local");
        assert_eq!(config.destination.port, 21);
        assert_eq!(config.catalog.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn load_or_create_writes_template() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let created = AppConfig::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, AppConfig::default());

        let mut edited = created;
        edited.destination.host = "10.0.0.2".to_string();
        edited.save(&path).unwrap();

        let loaded = AppConfig::load_or_create(&path).unwrap();
        assert_eq!(loaded.destination.host, "10.0.0.2");
    }

    #[test]
    fn load_rejects_malformed_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "catalog = 3").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(Error::Configuration(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn save_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        AppConfig::default().save(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
