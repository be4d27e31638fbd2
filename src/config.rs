use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn env_duration_millis(key: &str, default_millis: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(default_millis))
}

fn env_duration_secs(key: &str, default_secs: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Which attribute decides the displayed name color of a proxied message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color of the remote member that sent the message.
    Member,
    /// Color of the remote system the member belongs to.
    System,
    /// The host's own role color for the underlying account in that channel.
    #[default]
    Account,
    /// Leave names uncolored.
    None,
}

impl ColorMode {
    /// Modes whose colors come from the remote service and can be adjusted
    /// for readability.
    pub fn uses_remote_color(self) -> bool {
        matches!(self, ColorMode::Member | ColorMode::System)
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColorMode::Member => "member",
            ColorMode::System => "system",
            ColorMode::Account => "account",
            ColorMode::None => "none",
        })
    }
}

impl FromStr for ColorMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(ColorMode::Member),
            "system" => Ok(ColorMode::System),
            "account" | "" => Ok(ColorMode::Account),
            "none" | "off" => Ok(ColorMode::None),
            _ => Err(()),
        }
    }
}

/// User-facing options. Changing `color_mode` or `readable_colors`
/// invalidates every cached color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub color_mode: ColorMode,
    pub readable_colors: bool,
    pub enable_tag: bool,
    pub enable_buttons: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        let color_mode = env::var("PROXY_COLORS_COLOR_MODE")
            .ok()
            .and_then(|value| ColorMode::from_str(&value).ok())
            .unwrap_or_default();

        Self {
            color_mode,
            readable_colors: env_bool("PROXY_COLORS_READABLE_COLORS", false),
            enable_tag: env_bool("PROXY_COLORS_ENABLE_TAG", true),
            enable_buttons: env_bool("PROXY_COLORS_ENABLE_BUTTONS", true),
        }
    }

    /// Whether switching from `self` to `other` makes cached colors stale.
    pub fn invalidates_colors(&self, other: &Settings) -> bool {
        self.color_mode != other.color_mode || self.readable_colors != other.readable_colors
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color_mode: ColorMode::default(),
            readable_colors: false,
            enable_tag: true,
            enable_buttons: true,
        }
    }
}

/// Timing and endpoint configuration for the lookup pipeline.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub api_base_url: String,
    pub user_agent: String,
    /// Minimum spacing between two remote calls. 100ms keeps us under the
    /// service's 10 requests per second.
    pub request_interval: Duration,
    /// Pause after a failed remote call before the queue is looked at again.
    pub retry_backoff: Duration,
    /// How long the worker sleeps when the queue is empty and nothing wakes it.
    pub idle_interval: Duration,
    pub color_ttl: Duration,
    pub sweep_interval: Duration,
    /// Upper bound on how long `resolve_color` waits for the worker.
    pub lookup_timeout: Duration,
    pub request_timeout: Duration,
}

impl LookupConfig {
    pub fn from_env() -> Self {
        Self {
            api_base_url: env_string("PROXY_COLORS_API_BASE_URL", "https://api.pluralkit.me"),
            user_agent: env_string("PROXY_COLORS_USER_AGENT", "proxy-colors/0.1"),
            request_interval: env_duration_millis("PROXY_COLORS_REQUEST_INTERVAL_MS", 100),
            retry_backoff: env_duration_millis("PROXY_COLORS_RETRY_BACKOFF_MS", 5_000),
            idle_interval: env_duration_millis("PROXY_COLORS_IDLE_INTERVAL_MS", 500),
            color_ttl: env_duration_secs("PROXY_COLORS_COLOR_TTL_SECS", 120),
            sweep_interval: env_duration_secs("PROXY_COLORS_SWEEP_INTERVAL_SECS", 300),
            lookup_timeout: env_duration_millis("PROXY_COLORS_LOOKUP_TIMEOUT_MS", 15_000),
            request_timeout: env_duration_millis("PROXY_COLORS_REQUEST_TIMEOUT_MS", 10_000),
        }
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_color_ttl(mut self, ttl: Duration) -> Self {
        self.color_ttl = ttl;
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
