//! Application configuration — TOML-based, platform-aware paths.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::association::AssociationConfig;
use crate::color::parse_color;
use crate::connectivity::{
    DEFAULT_EXPECTED_STATUS, DEFAULT_PROBE_INTERVAL_MS, DEFAULT_PROBE_TIMEOUT_MS,
    DEFAULT_PROBE_URL, ProbeConfig,
};
use crate::controller::ControllerConfig;
use crate::effects::{DEFAULT_FRAME_INTERVAL_MS, EffectParameters};
use crate::reset::DEFAULT_RESET_HOLD_MS;

/// Header comment prepended to saved config files.
const CONFIG_HEADER: &str =
    "# WiFiGlow configuration — changes made outside the tool may be overwritten.\n\n";

/// File the credential store lives in, next to `config.toml`.
pub const CREDENTIALS_FILE: &str = "credentials.toml";

/// Upper bound on `led_count`; one frame must fit comfortably in a tick.
pub const MAX_LED_COUNT: usize = 1024;

/// Upper bound on `association_poll_ms`.
pub const MAX_ASSOCIATION_POLL_MS: u64 = 60_000;

/// Upper bound on `association_max_attempts`.
pub const MAX_ASSOCIATION_ATTEMPTS: u32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of pixels on the strip. Default: 30.
    #[serde(default = "default_led_count")]
    pub led_count: usize,

    /// Minimum gap between rendered frames. Default: 50 ms.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Gap between reachability probes in monitoring mode. Default: 5000 ms.
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    /// Upper bound on a single probe. Default: 3000 ms.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Reachability endpoint.
    #[serde(default = "default_probe_url")]
    pub probe_url: String,

    /// Status the endpoint must answer with. Default: 204.
    #[serde(default = "default_probe_expected_status")]
    pub probe_expected_status: u16,

    /// How long the reset button must be held. Default: 3000 ms.
    #[serde(default = "default_reset_hold_ms")]
    pub reset_hold_ms: u64,

    /// Gap between association status polls at boot. Default: 500 ms.
    #[serde(default = "default_association_poll_ms")]
    pub association_poll_ms: u64,

    /// Status polls before giving up on the stored network. Default: 20.
    #[serde(default = "default_association_max_attempts")]
    pub association_max_attempts: u32,

    /// Provisioning access point name.
    #[serde(default = "default_ap_ssid")]
    pub ap_ssid: String,

    /// Initial `static` effect color (hex or name). Default: "#00FF00".
    #[serde(default = "default_static_color")]
    pub static_color: String,

    /// Initial `snake` effect color (hex or name). Default: "#FF0000".
    #[serde(default = "default_snake_color")]
    pub snake_color: String,
}

fn default_led_count() -> usize {
    30
}
fn default_frame_interval_ms() -> u64 {
    DEFAULT_FRAME_INTERVAL_MS
}
fn default_probe_interval_ms() -> u64 {
    DEFAULT_PROBE_INTERVAL_MS
}
fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}
fn default_probe_url() -> String {
    DEFAULT_PROBE_URL.into()
}
fn default_probe_expected_status() -> u16 {
    DEFAULT_EXPECTED_STATUS
}
fn default_reset_hold_ms() -> u64 {
    DEFAULT_RESET_HOLD_MS
}
fn default_association_poll_ms() -> u64 {
    500
}
fn default_association_max_attempts() -> u32 {
    20
}
fn default_ap_ssid() -> String {
    "WiFiGlow-Setup".into()
}
fn default_static_color() -> String {
    "#00FF00".into()
}
fn default_snake_color() -> String {
    "#FF0000".into()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            led_count: default_led_count(),
            frame_interval_ms: default_frame_interval_ms(),
            probe_interval_ms: default_probe_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            probe_url: default_probe_url(),
            probe_expected_status: default_probe_expected_status(),
            reset_hold_ms: default_reset_hold_ms(),
            association_poll_ms: default_association_poll_ms(),
            association_max_attempts: default_association_max_attempts(),
            ap_ssid: default_ap_ssid(),
            static_color: default_static_color(),
            snake_color: default_snake_color(),
        }
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// `led_count` is zero or above [`MAX_LED_COUNT`].
    LedCount(usize),
    /// A timing field is zero (`field` names it).
    ZeroInterval { field: &'static str },
    /// The probe timeout is not shorter than the probe interval.
    ProbeTimeoutTooLong { timeout_ms: u64, interval_ms: u64 },
    /// `probe_url` is not an http(s) URL.
    InvalidProbeUrl(String),
    /// `probe_expected_status` is outside 100..=599.
    InvalidStatus(u16),
    /// `association_max_attempts` is zero.
    NoAssociationAttempts,
    /// A field exceeds its upper bound.
    TooLarge {
        field: &'static str,
        value: u64,
        max: u64,
    },
    /// `ap_ssid` is empty or longer than 32 bytes.
    InvalidApSsid(String),
    /// A color field could not be parsed.
    InvalidColor { field: &'static str, reason: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::LedCount(n) => {
                write!(f, "led_count must be between 1 and {MAX_LED_COUNT}, got {n}")
            }
            ValidationError::ZeroInterval { field } => write!(f, "{field} must be greater than 0"),
            ValidationError::ProbeTimeoutTooLong {
                timeout_ms,
                interval_ms,
            } => write!(
                f,
                "probe_timeout_ms ({timeout_ms}) must be shorter than probe_interval_ms ({interval_ms})"
            ),
            ValidationError::InvalidProbeUrl(url) => {
                write!(f, "probe_url must start with http:// or https://, got \"{url}\"")
            }
            ValidationError::InvalidStatus(s) => {
                write!(f, "probe_expected_status must be an HTTP status, got {s}")
            }
            ValidationError::NoAssociationAttempts => {
                write!(f, "association_max_attempts must be at least 1")
            }
            ValidationError::TooLarge { field, value, max } => {
                write!(f, "{field} must be at most {max}, got {value}")
            }
            ValidationError::InvalidApSsid(s) => {
                write!(f, "ap_ssid must be 1-32 bytes, got \"{s}\"")
            }
            ValidationError::InvalidColor { field, reason } => {
                write!(f, "Invalid {field}: {reason}")
            }
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("wifiglow"))
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Credential store path belonging to a config file.
    pub fn credentials_path_for(config_path: &Path) -> PathBuf {
        match config_path.parent() {
            Some(dir) => dir.join(CREDENTIALS_FILE),
            None => PathBuf::from(CREDENTIALS_FILE),
        }
    }

    /// Load config from the default path, returning the config and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Save config to an arbitrary path atomically (write to temp file, then rename).
    ///
    /// A header comment is prepended to warn that manual edits may be overwritten.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let serialized = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        crate::store::write_atomic(path, &format!("{CONFIG_HEADER}{serialized}"))
    }

    /// Validate the entire config, collecting all errors.
    ///
    /// Returns `Ok(())` if valid, or `Err(Vec<ValidationError>)` with all problems found.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.led_count == 0 || self.led_count > MAX_LED_COUNT {
            errors.push(ValidationError::LedCount(self.led_count));
        }

        for (field, value) in [
            ("frame_interval_ms", self.frame_interval_ms),
            ("probe_interval_ms", self.probe_interval_ms),
            ("probe_timeout_ms", self.probe_timeout_ms),
            ("reset_hold_ms", self.reset_hold_ms),
            ("association_poll_ms", self.association_poll_ms),
        ] {
            if value == 0 {
                errors.push(ValidationError::ZeroInterval { field });
            }
        }

        if self.probe_timeout_ms >= self.probe_interval_ms && self.probe_interval_ms > 0 {
            errors.push(ValidationError::ProbeTimeoutTooLong {
                timeout_ms: self.probe_timeout_ms,
                interval_ms: self.probe_interval_ms,
            });
        }

        let url = self.probe_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError::InvalidProbeUrl(self.probe_url.clone()));
        }

        if !(100..=599).contains(&self.probe_expected_status) {
            errors.push(ValidationError::InvalidStatus(self.probe_expected_status));
        }

        if self.association_max_attempts == 0 {
            errors.push(ValidationError::NoAssociationAttempts);
        }
        if self.association_max_attempts > MAX_ASSOCIATION_ATTEMPTS {
            errors.push(ValidationError::TooLarge {
                field: "association_max_attempts",
                value: u64::from(self.association_max_attempts),
                max: u64::from(MAX_ASSOCIATION_ATTEMPTS),
            });
        }
        if self.association_poll_ms > MAX_ASSOCIATION_POLL_MS {
            errors.push(ValidationError::TooLarge {
                field: "association_poll_ms",
                value: self.association_poll_ms,
                max: MAX_ASSOCIATION_POLL_MS,
            });
        }

        let ap = self.ap_ssid.trim();
        if ap.is_empty() || ap.len() > 32 {
            errors.push(ValidationError::InvalidApSsid(self.ap_ssid.clone()));
        }

        for (field, value) in [
            ("static_color", &self.static_color),
            ("snake_color", &self.snake_color),
        ] {
            if let Err(e) = parse_color(value) {
                errors.push(ValidationError::InvalidColor {
                    field,
                    reason: e.to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Controller settings derived from this config. Unparseable colors fall
    /// back to their defaults with a warning.
    pub fn controller_config(&self) -> ControllerConfig {
        let defaults = EffectParameters::default();
        let color_or = |field: &str, value: &str, fallback| match parse_color(value) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("{field}: {e}, using default");
                fallback
            }
        };
        ControllerConfig {
            led_count: self.led_count,
            frame_interval_ms: self.frame_interval_ms,
            probe: ProbeConfig {
                url: self.probe_url.trim().to_string(),
                expected_status: self.probe_expected_status,
                interval_ms: self.probe_interval_ms,
                timeout: Duration::from_millis(self.probe_timeout_ms),
            },
            reset_hold_ms: self.reset_hold_ms,
            association: AssociationConfig {
                poll_interval: Duration::from_millis(self.association_poll_ms),
                max_attempts: self.association_max_attempts,
            },
            ap_ssid: self.ap_ssid.trim().to_string(),
            params: EffectParameters {
                static_color: color_or("static_color", &self.static_color, defaults.static_color),
                snake_color: color_or("snake_color", &self.snake_color, defaults.snake_color),
            },
        }
    }
}
