use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub log_level: String,
    pub api_base_url: String,
    pub upgrade_insecure_urls: bool,
    pub request_timeout_secs: u64,
    pub download_dir: PathBuf,
    pub data_dir: PathBuf,
    pub use_file_store: bool,
    pub redirect_on_unauthorized: bool,
}

#[derive(Debug, Default)]
pub struct AppConfigOverrides {
    pub log_level: Option<String>,
    pub api_base_url: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub use_file_store: bool,
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_data_dir() -> PathBuf {
    auth::TokenStore::default_dir()
}

pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config")
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_base_url: api_client::DEFAULT_BASE_URL.to_string(),
            upgrade_insecure_urls: true,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            download_dir: dirs::download_dir().unwrap_or_else(|| home_dir().join("Downloads")),
            data_dir: default_data_dir(),
            use_file_store: false,
            redirect_on_unauthorized: false,
        }
    }
}

impl AppConfig {
    /// Read `path` (TOML, optional). Missing keys fall back to defaults.
    pub fn load_from(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(default_config_path);
        let cfg = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml).required(false))
            .build()
            .unwrap_or_default();
        let defaults = AppConfig::default();

        let log_level = cfg.get_string("log_level").unwrap_or(defaults.log_level);
        let api_base_url = cfg.get_string("api_base_url").unwrap_or(defaults.api_base_url);
        let upgrade_insecure_urls = cfg
            .get_bool("upgrade_insecure_urls")
            .unwrap_or(defaults.upgrade_insecure_urls);
        let request_timeout_secs = cfg
            .get_int("request_timeout_secs")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(defaults.request_timeout_secs);
        let download_dir = cfg
            .get_string("download_dir")
            .map(PathBuf::from)
            .unwrap_or(defaults.download_dir);
        let data_dir = cfg
            .get_string("data_dir")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let use_file_store = cfg.get_bool("use_file_store").unwrap_or(defaults.use_file_store);
        let redirect_on_unauthorized = cfg
            .get_bool("redirect_on_unauthorized")
            .unwrap_or(defaults.redirect_on_unauthorized);

        Self {
            log_level,
            api_base_url,
            upgrade_insecure_urls,
            request_timeout_secs,
            download_dir,
            data_dir,
            use_file_store,
            redirect_on_unauthorized,
        }
    }

    pub fn apply_overrides(mut self, ov: &AppConfigOverrides) -> Self {
        if let Some(l) = &ov.log_level {
            self.log_level = l.clone();
        }
        if let Some(url) = &ov.api_base_url {
            self.api_base_url = url.clone();
        }
        if let Some(dir) = &ov.download_dir {
            self.download_dir = dir.clone();
        }
        if ov.use_file_store {
            self.use_file_store = true;
        }
        self
    }

    pub fn save_to(&self, path: Option<PathBuf>) -> std::io::Result<()> {
        let path = path.unwrap_or_else(default_config_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = toml::to_string(self).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, data)
    }
}
