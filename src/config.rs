//! Settings
//!
//! Lookup order: `./geo-sync.json`, then `~/.config/geo-sync/config.json`,
//! then defaults. `.env` in the working directory is loaded first and
//! environment variables override file values.

use crate::error::{GeoSyncError, Result};
use geo_sync_common::FormContext;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const LOCAL_CONFIG_FILE: &str = "geo-sync.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Google service account key (JSON)
    pub credentials_path: PathBuf,
    pub google_maps_api_key: Option<String>,
    pub nominatim_url: String,
    /// Nominatim requires an identifying user agent
    pub user_agent: String,
    /// Admin root, e.g. `https://content.example.com/admin/`
    pub admin_url: String,
    pub parent_search_text: String,
    pub parent_visible_text: String,
    pub entity_type_visible_text: String,
    pub dry_run: bool,
    pub headless: bool,
    pub keep_browser_open: bool,
    pub webdriver_url: String,
    pub chrome_binary: Option<PathBuf>,
    pub chrome_profile_dir: Option<PathBuf>,
    pub google_account_identifier: Option<String>,
    #[serde(skip_serializing)]
    pub google_account_password: Option<String>,
    pub timeout_seconds: u64,
    /// Pause between geocoder calls
    pub request_delay_ms: u64,
    /// JSON-lines record of dry-run submissions
    pub dry_run_log: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("credentials/service-account.json"),
            google_maps_api_key: None,
            nominatim_url: "https://nominatim.openstreetmap.org".into(),
            user_agent: format!("geo-sheet-sync/{}", env!("CARGO_PKG_VERSION")),
            admin_url: "http://localhost:8000/admin/".into(),
            parent_search_text: String::new(),
            parent_visible_text: String::new(),
            entity_type_visible_text: String::new(),
            dry_run: true,
            headless: false,
            keep_browser_open: false,
            webdriver_url: "http://localhost:9515".into(),
            chrome_binary: None,
            chrome_profile_dir: None,
            google_account_identifier: None,
            google_account_password: None,
            timeout_seconds: 30,
            request_delay_ms: 1000,
            dry_run_log: Some(PathBuf::from("dry-run.jsonl")),
        }
    }
}

/// "1", "true", "yes", "on" (any case)
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();

        let mut settings = match Self::find_config_file() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| GeoSyncError::Config(format!("{}: {}", path.display(), e)))
    }

    fn find_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        Self::user_config_path().ok().filter(|p| p.exists())
    }

    pub fn user_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| GeoSyncError::Config("home directory not found".into()))?;
        Ok(home.join(".config").join("geo-sync").join("config.json"))
    }

    /// Apply overrides from a variable source (the process environment in production)
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| -> Result<Option<bool>> {
            match var(key) {
                None => Ok(None),
                Some(v) => parse_flag(&v)
                    .map(Some)
                    .ok_or_else(|| GeoSyncError::Config(format!("{}={} is not a boolean", key, v))),
            }
        };

        if let Some(path) = var("GCP_SERVICE_ACCOUNT_FILE") {
            self.credentials_path = PathBuf::from(path);
        }
        if let Some(key) = var("GOOGLE_MAPS_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.google_maps_api_key = Some(key);
        }
        if let Some(url) = var("GEO_SYNC_ADMIN_URL") {
            self.admin_url = url;
        }
        if let Some(url) = var("GEO_SYNC_WEBDRIVER_URL") {
            self.webdriver_url = url;
        }
        if let Some(id) = var("GOOGLE_ACCOUNT_IDENTIFIER") {
            self.google_account_identifier = Some(id);
        }
        if let Some(password) = var("GOOGLE_ACCOUNT_PASSWORD") {
            self.google_account_password = Some(password);
        }
        if let Some(v) = flag("DRY_RUN")? {
            self.dry_run = v;
        }
        if let Some(v) = flag("HEADLESS")? {
            self.headless = v;
        }
        if let Some(v) = flag("KEEP_BROWSER_OPEN")? {
            self.keep_browser_open = v;
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn get_api_key(&self) -> Result<String> {
        self.google_maps_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(GeoSyncError::MissingApiKey)
    }

    pub fn form_context(&self) -> FormContext {
        FormContext {
            parent_search_text: self.parent_search_text.clone(),
            parent_visible_text: self.parent_visible_text.clone(),
            entity_type_visible_text: self.entity_type_visible_text.clone(),
        }
    }

    /// Admin URL joined with a relative path; absolute paths pass through
    pub fn admin_page(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.admin_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
