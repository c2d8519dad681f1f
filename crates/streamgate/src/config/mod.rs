use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;
use url::Url;

pub mod defaults;
pub mod duration_serde;

use crate::errors::{AppError, AppResult};
use crate::playback::EngineConfig;
use defaults::*;
use duration_serde::duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Tuning surface handed to the adaptive playback engine
    #[serde(default)]
    pub playback: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the media service; `/streaming` is appended per request
    #[serde(default = "default_media_service_base")]
    pub media_service_base: String,
    /// Total time allowed for one upstream manifest fetch
    #[serde(default = "default_request_timeout", with = "duration")]
    pub request_timeout: Duration,
    #[serde(default = "default_connect_timeout", with = "duration")]
    pub connect_timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Cookie consulted when no `Authorization: Bearer` header is present.
    /// Set to an empty string to only accept the header.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

// Web defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

// Upstream defaults
fn default_media_service_base() -> String {
    DEFAULT_MEDIA_SERVICE_BASE.to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(DEFAULT_UPSTREAM_REQUEST_TIMEOUT_SECONDS)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECONDS)
}

fn default_user_agent() -> String {
    format!("streamgate/{}", env!("CARGO_PKG_VERSION"))
}

// Auth defaults
fn default_session_cookie() -> String {
    DEFAULT_SESSION_COOKIE.to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            media_service_base: default_media_service_base(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie: default_session_cookie(),
        }
    }
}

impl UpstreamConfig {
    /// Parse the configured media service base into an absolute http(s) URL
    pub fn media_service_url(&self) -> AppResult<Url> {
        let url = Url::parse(&self.media_service_base).map_err(|e| {
            AppError::configuration(format!(
                "upstream.media_service_base '{}' is not a valid URL: {}",
                self.media_service_base, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::configuration(format!(
                "upstream.media_service_base must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if url.query().is_some() {
            return Err(AppError::configuration(
                "upstream.media_service_base must not carry a query string",
            ));
        }
        Ok(url)
    }
}

impl AuthConfig {
    pub fn session_cookie(&self) -> Option<&str> {
        let name = self.session_cookie.trim();
        (!name.is_empty()).then_some(name)
    }
}

impl Config {
    pub fn load() -> AppResult<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from_file(&config_file)
    }

    /// Load configuration layered as defaults, then the TOML file, then
    /// `STREAMGATE_` environment variables (`__` separates sections).
    ///
    /// A missing file is created with the default configuration.
    pub fn load_from_file<P: AsRef<Path>>(config_file: P) -> AppResult<Self> {
        let config_file = config_file.as_ref();
        if !config_file.exists() {
            let contents = toml::to_string_pretty(&Self::default())?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file.display());
        }

        let config: Config = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.upstream.media_service_url()?;

        if self.upstream.request_timeout.is_zero() {
            return Err(AppError::configuration(
                "upstream.request_timeout must be greater than zero",
            ));
        }
        if self.upstream.connect_timeout.is_zero() {
            return Err(AppError::configuration(
                "upstream.connect_timeout must be greater than zero",
            ));
        }
        if self.playback.manifest_loading_timeout.is_zero() {
            return Err(AppError::configuration(
                "playback.manifest_loading_timeout must be greater than zero",
            ));
        }
        if self.playback.max_buffer_length > self.playback.max_max_buffer_length {
            return Err(AppError::configuration(
                "playback.max_buffer_length cannot exceed playback.max_max_buffer_length",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        tokio_test::assert_ok!(config.validate());
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.upstream.request_timeout, Duration::from_secs(8));
        assert_eq!(config.auth.session_cookie(), Some("access_token"));
    }

    #[test]
    #[serial]
    fn test_load_from_file_merges_partial_sections() {
        let file = write_config(
            r#"
[web]
port = 9090

[upstream]
media_service_base = "https://media.example.com/api"
request_timeout = "2s"
"#,
        );

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.web.port, 9090);
        assert_eq!(config.web.host, DEFAULT_HOST);
        assert_eq!(
            config.upstream.media_service_base,
            "https://media.example.com/api"
        );
        assert_eq!(config.upstream.request_timeout, Duration::from_secs(2));
        assert_eq!(
            config.upstream.connect_timeout,
            Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECONDS)
        );
        assert_eq!(config.playback.back_buffer_length, Duration::from_secs(90));
    }

    #[test]
    #[serial]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from_file(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.upstream.media_service_base, DEFAULT_MEDIA_SERVICE_BASE);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("media_service_base"));
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let file = write_config(
            r#"
[upstream]
media_service_base = "https://media.example.com"
"#,
        );

        unsafe {
            std::env::set_var("STREAMGATE_UPSTREAM__MEDIA_SERVICE_BASE", "http://override:9000");
        }
        let result = Config::load_from_file(file.path());
        unsafe {
            std::env::remove_var("STREAMGATE_UPSTREAM__MEDIA_SERVICE_BASE");
        }

        let config = result.unwrap();
        assert_eq!(config.upstream.media_service_base, "http://override:9000");
    }

    #[test]
    #[serial]
    fn test_invalid_media_service_base_is_rejected() {
        let file = write_config(
            r#"
[upstream]
media_service_base = "ftp://media.example.com"
"#,
        );

        let error = Config::load_from_file(file.path()).unwrap_err();
        assert!(error.to_string().contains("http or https"));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = Config::default();
        config.upstream.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_session_cookie_disables_cookie_lookup() {
        let auth = AuthConfig {
            session_cookie: "  ".to_string(),
        };
        assert_eq!(auth.session_cookie(), None);
    }
}
