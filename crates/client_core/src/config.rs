use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::error::{ClientError, ClientResult};

pub const DEV_API_URL: &str = "http://localhost:5000/api/v1";
pub const PROD_API_URL: &str = "https://kanbann.up.railway.app/api/v1";
pub const SETTINGS_FILE: &str = "kanban.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Some(Self::Development),
            "prod" | "production" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn default_api_url(self) -> &'static str {
        match self {
            Self::Development => DEV_API_URL,
            Self::Production => PROD_API_URL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    /// Explicit API base; wins over the environment default.
    pub api_url: Option<String>,
    pub firebase_url: Option<String>,
    pub session_cookie: Option<String>,
    pub app_origin: String,
    pub request_timeout_secs: u64,
    pub notification_poll_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            api_url: None,
            firebase_url: None,
            session_cookie: None,
            app_origin: "http://localhost:5173".into(),
            request_timeout_secs: 15,
            notification_poll_ms: 2_000,
        }
    }
}

impl Settings {
    pub fn api_base_url(&self) -> ClientResult<Url> {
        let raw = self
            .api_url
            .as_deref()
            .unwrap_or_else(|| self.environment.default_api_url());
        parse_base_url(raw)
    }

    pub fn firebase_base_url(&self) -> ClientResult<Option<Url>> {
        self.firebase_url.as_deref().map(parse_base_url).transpose()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn notification_poll_interval(&self) -> Duration {
        Duration::from_millis(self.notification_poll_ms.max(100))
    }

    pub fn invite_link(&self, board_id: &shared::domain::BoardId) -> String {
        format!("{}/invite/{board_id}", self.app_origin.trim_end_matches('/'))
    }
}

/// Keys accepted in `kanban.toml`; every key is optional.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    environment: Option<String>,
    api_url: Option<String>,
    firebase_url: Option<String>,
    session_cookie: Option<String>,
    app_origin: Option<String>,
    request_timeout_secs: Option<u64>,
    notification_poll_ms: Option<u64>,
}

impl FileSettings {
    fn read(path: &Path) -> Option<Self> {
        let raw = fs::read_to_string(path).ok()?;
        match toml::from_str(&raw) {
            Ok(file_cfg) => Some(file_cfg),
            Err(err) => {
                warn!(path = %path.display(), "ignoring unreadable settings file: {err}");
                None
            }
        }
    }
}

/// Parses a base URL and guarantees a trailing slash so that relative joins
/// keep the path prefix (`/api/v1`).
pub fn parse_base_url(raw: &str) -> ClientResult<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ClientError::Config("empty base url".into()));
    }
    let mut url = Url::parse(raw)?;
    if url.cannot_be_a_base() {
        return Err(ClientError::Config(format!("'{raw}' cannot be a base url")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Some(file_cfg) = FileSettings::read(path) {
        if let Some(raw) = file_cfg.environment.as_deref() {
            match Environment::parse(raw) {
                Some(v) => settings.environment = v,
                None => warn!(environment = raw, "unknown environment in settings file"),
            }
        }
        if let Some(v) = file_cfg.api_url {
            settings.api_url = Some(v);
        }
        if let Some(v) = file_cfg.firebase_url {
            settings.firebase_url = Some(v);
        }
        if let Some(v) = file_cfg.session_cookie {
            settings.session_cookie = Some(v);
        }
        if let Some(v) = file_cfg.app_origin {
            settings.app_origin = v;
        }
        if let Some(v) = file_cfg.request_timeout_secs {
            settings.request_timeout_secs = v;
        }
        if let Some(v) = file_cfg.notification_poll_ms {
            settings.notification_poll_ms = v;
        }
    }

    if let Some(v) = env("KANBAN_ENV").and_then(|v| Environment::parse(&v)) {
        settings.environment = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = Some(v);
    }
    if let Some(v) = env("APP__FIREBASE_URL") {
        settings.firebase_url = Some(v);
    }
    if let Some(v) = env("APP__SESSION_COOKIE") {
        settings.session_cookie = Some(v);
    }
    if let Some(v) = env("APP__APP_ORIGIN") {
        settings.app_origin = v;
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
    if let Some(v) = env("APP__NOTIFICATION_POLL_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.notification_poll_ms = parsed;
        }
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
