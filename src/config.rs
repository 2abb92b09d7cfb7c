use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::notes::NoteLimits;

/// Service configuration for an Ember instance.
///
/// Configuration is loaded in layers with the following precedence (lowest to highest):
/// 1. Environment variables (EMBER_*)
/// 2. TOML configuration file
/// 3. Command-line arguments
///
/// This means CLI args override TOML config, which overrides environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmberConfig {
    /// Address for the HTTP API.
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,

    /// Redis connection URL for the shared store.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Maximum note contents size in bytes.
    #[serde(default = "default_size_limit_bytes")]
    pub size_limit_bytes: usize,

    /// Maximum metadata size in bytes.
    #[serde(default = "default_meta_limit_bytes")]
    pub meta_limit_bytes: usize,

    /// Largest view count a creator may request.
    #[serde(default = "default_max_views")]
    pub max_views: u32,

    /// Longest expiration in minutes a creator may request.
    #[serde(default = "default_max_expiration")]
    pub max_expiration_minutes: u32,

    /// Length of generated note identifiers in characters.
    #[serde(default = "default_id_length")]
    pub id_length: usize,

    /// Whether creators may choose view counts and expirations.
    /// When disabled, every note gets exactly one view and no TTL.
    #[serde(default = "default_true")]
    pub allow_advanced: bool,

    /// Whether clients may attach file payloads. Advertised via the
    /// status endpoint; enforcement happens client-side.
    #[serde(default = "default_true")]
    pub allow_files: bool,

    /// Note creations admitted per identity per minute.
    #[serde(default = "default_rate_limit_create")]
    pub rate_limit_create_per_minute: u32,

    /// Note reads (previews and consumes) admitted per identity per minute.
    #[serde(default = "default_rate_limit_read")]
    pub rate_limit_read_per_minute: u32,

    /// Upper bound on any single store call, in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Branding served to clients via the status endpoint.
    #[serde(default)]
    pub theme: ThemeConfig,
}

/// Client-facing branding, advertised verbatim through the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Logo image URL.
    #[serde(default)]
    pub image: String,

    /// Tagline shown under the logo.
    #[serde(default)]
    pub text: String,

    /// Browser page title.
    #[serde(default = "default_page_title")]
    pub page_title: String,

    /// Favicon URL.
    #[serde(default)]
    pub favicon: String,

    /// Link to a legal-notice page.
    #[serde(default)]
    pub imprint_url: String,

    /// Inline legal-notice HTML; takes precedence over `imprint_url`
    /// in clients that render both.
    #[serde(default)]
    pub imprint_html: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            image: String::new(),
            text: String::new(),
            page_title: default_page_title(),
            favicon: String::new(),
            imprint_url: String::new(),
            imprint_html: String::new(),
        }
    }
}

impl Default for EmberConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            redis_url: default_redis_url(),
            size_limit_bytes: default_size_limit_bytes(),
            meta_limit_bytes: default_meta_limit_bytes(),
            max_views: default_max_views(),
            max_expiration_minutes: default_max_expiration(),
            id_length: default_id_length(),
            allow_advanced: true,
            allow_files: true,
            rate_limit_create_per_minute: default_rate_limit_create(),
            rate_limit_read_per_minute: default_rate_limit_read(),
            store_timeout_ms: default_store_timeout_ms(),
            theme: ThemeConfig::default(),
        }
    }
}

impl EmberConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        toml::from_str(&content).context(ParseTomlSnafu { path })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables carry the EMBER_ prefix (EMBER_REDIS_URL, EMBER_MAX_VIEWS,
    /// EMBER_RATE_LIMIT_CREATE, ...); theme fields use EMBER_THEME_<FIELD>.
    pub fn from_env() -> Self {
        Self {
            http_addr: parse_env("EMBER_HTTP_ADDR").unwrap_or_else(default_http_addr),
            redis_url: parse_env("EMBER_REDIS_URL").unwrap_or_else(default_redis_url),
            size_limit_bytes: parse_env("EMBER_SIZE_LIMIT_BYTES")
                .unwrap_or_else(default_size_limit_bytes),
            meta_limit_bytes: parse_env("EMBER_META_LIMIT_BYTES")
                .unwrap_or_else(default_meta_limit_bytes),
            max_views: parse_env("EMBER_MAX_VIEWS").unwrap_or_else(default_max_views),
            max_expiration_minutes: parse_env("EMBER_MAX_EXPIRATION_MINUTES")
                .unwrap_or_else(default_max_expiration),
            id_length: parse_env("EMBER_ID_LENGTH").unwrap_or_else(default_id_length),
            allow_advanced: parse_env("EMBER_ALLOW_ADVANCED").unwrap_or(true),
            allow_files: parse_env("EMBER_ALLOW_FILES").unwrap_or(true),
            rate_limit_create_per_minute: parse_env("EMBER_RATE_LIMIT_CREATE")
                .unwrap_or_else(default_rate_limit_create),
            rate_limit_read_per_minute: parse_env("EMBER_RATE_LIMIT_READ")
                .unwrap_or_else(default_rate_limit_read),
            store_timeout_ms: parse_env("EMBER_STORE_TIMEOUT_MS")
                .unwrap_or_else(default_store_timeout_ms),
            theme: ThemeConfig {
                image: parse_env("EMBER_THEME_IMAGE").unwrap_or_default(),
                text: parse_env("EMBER_THEME_TEXT").unwrap_or_default(),
                page_title: parse_env("EMBER_THEME_PAGE_TITLE").unwrap_or_else(default_page_title),
                favicon: parse_env("EMBER_THEME_FAVICON").unwrap_or_default(),
                imprint_url: parse_env("EMBER_IMPRINT_URL").unwrap_or_default(),
                imprint_html: parse_env("EMBER_IMPRINT_HTML").unwrap_or_default(),
            },
        }
    }

    /// Merge configuration from another source.
    ///
    /// Fields in `other` that differ from the defaults override fields in
    /// `self`. This is used to implement the layered config precedence.
    pub fn merge(&mut self, other: Self) {
        if other.http_addr != default_http_addr() {
            self.http_addr = other.http_addr;
        }
        if other.redis_url != default_redis_url() {
            self.redis_url = other.redis_url;
        }
        if other.size_limit_bytes != default_size_limit_bytes() {
            self.size_limit_bytes = other.size_limit_bytes;
        }
        if other.meta_limit_bytes != default_meta_limit_bytes() {
            self.meta_limit_bytes = other.meta_limit_bytes;
        }
        if other.max_views != default_max_views() {
            self.max_views = other.max_views;
        }
        if other.max_expiration_minutes != default_max_expiration() {
            self.max_expiration_minutes = other.max_expiration_minutes;
        }
        if other.id_length != default_id_length() {
            self.id_length = other.id_length;
        }
        if !other.allow_advanced {
            self.allow_advanced = false;
        }
        if !other.allow_files {
            self.allow_files = false;
        }
        if other.rate_limit_create_per_minute != default_rate_limit_create() {
            self.rate_limit_create_per_minute = other.rate_limit_create_per_minute;
        }
        if other.rate_limit_read_per_minute != default_rate_limit_read() {
            self.rate_limit_read_per_minute = other.rate_limit_read_per_minute;
        }
        if other.store_timeout_ms != default_store_timeout_ms() {
            self.store_timeout_ms = other.store_timeout_ms;
        }
        if !other.theme.image.is_empty() {
            self.theme.image = other.theme.image;
        }
        if !other.theme.text.is_empty() {
            self.theme.text = other.theme.text;
        }
        if other.theme.page_title != default_page_title() {
            self.theme.page_title = other.theme.page_title;
        }
        if !other.theme.favicon.is_empty() {
            self.theme.favicon = other.theme.favicon;
        }
        if !other.theme.imprint_url.is_empty() {
            self.theme.imprint_url = other.theme.imprint_url;
        }
        if !other.theme.imprint_html.is_empty() {
            self.theme.imprint_html = other.theme.imprint_html;
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if required fields are missing or invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.redis_url.is_empty() {
            return Err(ConfigError::Validation {
                message: "redis_url must not be empty".into(),
            });
        }

        if self.size_limit_bytes == 0 {
            return Err(ConfigError::Validation {
                message: "size_limit_bytes must be non-zero".into(),
            });
        }

        if self.meta_limit_bytes == 0 {
            return Err(ConfigError::Validation {
                message: "meta_limit_bytes must be non-zero".into(),
            });
        }

        if self.max_views == 0 {
            return Err(ConfigError::Validation {
                message: "max_views must be non-zero".into(),
            });
        }

        if self.max_expiration_minutes == 0 {
            return Err(ConfigError::Validation {
                message: "max_expiration_minutes must be non-zero".into(),
            });
        }

        if self.id_length < 16 || self.id_length > 128 {
            return Err(ConfigError::Validation {
                message: "id_length must be between 16 and 128".into(),
            });
        }

        if self.rate_limit_create_per_minute == 0 || self.rate_limit_read_per_minute == 0 {
            return Err(ConfigError::Validation {
                message: "rate limits must be non-zero".into(),
            });
        }

        if self.store_timeout_ms == 0 {
            return Err(ConfigError::Validation {
                message: "store_timeout_ms must be non-zero".into(),
            });
        }

        Ok(())
    }

    /// Load the layered configuration: environment, then an optional TOML
    /// file, then CLI overrides, and validate the result.
    pub fn load(config_file: Option<&Path>, overrides: Self) -> Result<Self, ConfigError> {
        let mut config = Self::from_env();
        if let Some(path) = config_file {
            config.merge(Self::from_toml_file(path)?);
        }
        config.merge(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Note validation limits derived from this configuration.
    pub fn note_limits(&self) -> NoteLimits {
        NoteLimits {
            size_limit_bytes: self.size_limit_bytes,
            meta_limit_bytes: self.meta_limit_bytes,
            max_views: self.max_views,
            max_expiration_minutes: self.max_expiration_minutes,
            id_length: self.id_length,
            allow_advanced: self.allow_advanced,
        }
    }

    /// Boundary timeout applied to each store call.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

// Default value functions
fn default_http_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".into()
}

fn default_size_limit_bytes() -> usize {
    // 80 MiB
    83_886_080
}

fn default_meta_limit_bytes() -> usize {
    4096
}

fn default_max_views() -> u32 {
    100
}

fn default_max_expiration() -> u32 {
    360
}

fn default_id_length() -> usize {
    32
}

fn default_true() -> bool {
    true
}

fn default_rate_limit_create() -> u32 {
    20
}

fn default_rate_limit_read() -> u32 {
    60
}

fn default_store_timeout_ms() -> u64 {
    5000
}

fn default_page_title() -> String {
    "Ember".into()
}

// Helper function for parsing environment variables
fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.parse().ok()
}

/// Configuration loading and parsing errors.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("failed to read config file {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse TOML config file {}: {source}", path.display()))]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[snafu(display("configuration validation failed: {message}"))]
    Validation { message: String },
}
