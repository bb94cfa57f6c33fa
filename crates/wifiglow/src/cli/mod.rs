//! CLI subcommands — host runner, credential maintenance, offline previews.

mod config_cmd;
mod preview;
mod probe;
mod provision;
mod run;
mod status;

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;

pub(super) use crate::RUNNING;
pub(super) use wifiglow_lib::WifiglowError;
pub(super) use wifiglow_lib::config::Config;
pub(super) use wifiglow_lib::error::Result;
pub(super) use wifiglow_lib::store::FileCredentialStore;

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

/// Load the config from `custom_path` or the platform default, logging parse warnings.
pub(super) fn load_config(custom_path: Option<&Path>) -> Config {
    let (config, warnings) = match custom_path {
        Some(p) => Config::load_from(p),
        None => Config::load_with_warnings(),
    };
    for w in &warnings {
        log::warn!("{w}");
    }
    config
}

/// The config file in effect, if any.
pub(super) fn config_path(custom_path: Option<&Path>) -> Option<PathBuf> {
    custom_path.map(Path::to_path_buf).or_else(Config::path)
}

/// The credential file belonging to the config in effect.
pub(super) fn credentials_path(custom_path: Option<&Path>) -> Result<PathBuf> {
    config_path(custom_path)
        .map(|p| Config::credentials_path_for(&p))
        .ok_or_else(|| WifiglowError::Config("No config directory; pass --config".into()))
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct StatusOutput {
    pub version: String,
    pub credentials_file: String,
    pub network: Option<String>,
    pub has_password: bool,
    pub boot_mode: String,
    pub config: ConfigSummaryJson,
}

#[derive(Serialize)]
pub(super) struct ConfigSummaryJson {
    pub led_count: usize,
    pub ap_ssid: String,
    pub probe_url: String,
    pub probe_interval_ms: u64,
    pub reset_hold_ms: u64,
}

impl ConfigSummaryJson {
    pub fn from_config(config: &Config) -> Self {
        ConfigSummaryJson {
            led_count: config.led_count,
            ap_ssid: config.ap_ssid.clone(),
            probe_url: config.probe_url.clone(),
            probe_interval_ms: config.probe_interval_ms,
            reset_hold_ms: config.reset_hold_ms,
        }
    }
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
    pub problems: Vec<String>,
    pub files: ConfigFilesJson,
}

#[derive(Serialize)]
pub(super) struct ConfigFilesJson {
    pub credentials: Option<String>,
    pub credentials_exists: bool,
}

#[derive(Serialize)]
pub(super) struct ProbeOutput {
    pub url: String,
    pub expected_status: u16,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub reachable: bool,
    pub elapsed_ms: u64,
}

#[derive(Serialize)]
pub(super) struct PreviewOutput {
    pub effect: String,
    pub led_count: usize,
    pub frame_interval_ms: u64,
    pub frames: Vec<Vec<String>>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the lamp on this machine (simulated radio, real reachability probe)
    Run {
        /// Stop after this many ticks (default: run until Ctrl+C)
        #[arg(long)]
        ticks: Option<u64>,
        /// Milliseconds between ticks
        #[arg(long, default_value_t = 10)]
        tick_ms: u64,
        /// Draw the strip in the terminal
        #[arg(long)]
        render: bool,
        /// Make the simulated radio fail to join the stored network
        #[arg(long)]
        fail_association: bool,
        /// Treat the reset button as held while this file exists
        #[arg(long, value_name = "PATH")]
        reset_file: Option<PathBuf>,
    },

    /// Show stored network and what the next boot will do
    Status,

    /// Store WiFi credentials, as the captive portal would
    Provision {
        /// Network name
        ssid: String,
        /// Network password (empty for open networks)
        #[arg(long, default_value = "")]
        password: String,
    },

    /// Forget stored WiFi credentials (factory reset)
    Reset,

    /// Run one reachability probe against the configured endpoint
    Probe {
        /// Probe this URL instead of the configured one
        #[arg(long)]
        url: Option<String>,
        /// Probe timeout in milliseconds (default: from config)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Render frames of an effect without running the lamp
    Preview {
        /// Effect name (waiting, rainbow, rainbow_fill, static, snake, breathe_green, blink_red, monitoring)
        effect: String,
        /// Number of frames to render
        #[arg(long, default_value_t = 10)]
        frames: u32,
        /// Strip length (default: from config)
        #[arg(long)]
        leds: Option<usize>,
        /// Color for the static effect (hex or name)
        #[arg(long)]
        static_color: Option<String>,
        /// Color for the snake effect (hex or name)
        #[arg(long)]
        snake_color: Option<String>,
    },

    /// Show current configuration and file paths
    Config {
        /// Write a config file with default settings
        #[arg(long)]
        init: bool,
        /// With --init, overwrite an existing config file
        #[arg(long, requires = "init")]
        force: bool,
    },
}

/// Warn if `--json` was passed to a command that doesn't support it.
fn warn_json_unsupported(cmd_name: &str) {
    log::warn!("--json is not supported for `{cmd_name}` (ignored)");
}

pub fn run(cmd: Command, json: bool, custom_config: Option<&Path>) -> Result<()> {
    match cmd {
        Command::Run {
            ticks,
            tick_ms,
            render,
            fail_association,
            reset_file,
        } => {
            if json {
                warn_json_unsupported("run");
            }
            run::cmd_run(
                run::RunOptions {
                    ticks,
                    tick_ms,
                    render,
                    fail_association,
                    reset_file,
                },
                custom_config,
            )
        }
        Command::Status => status::cmd_status(json, custom_config),
        Command::Provision { ssid, password } => {
            if json {
                warn_json_unsupported("provision");
            }
            provision::cmd_provision(&ssid, &password, custom_config)
        }
        Command::Reset => {
            if json {
                warn_json_unsupported("reset");
            }
            provision::cmd_reset(custom_config)
        }
        Command::Probe { url, timeout_ms } => {
            probe::cmd_probe(url, timeout_ms, json, custom_config)
        }
        Command::Preview {
            effect,
            frames,
            leds,
            static_color,
            snake_color,
        } => preview::cmd_preview(
            preview::PreviewOptions {
                effect,
                frames,
                leds,
                static_color,
                snake_color,
            },
            json,
            custom_config,
        ),
        Command::Config { init, force } => {
            if init {
                if json {
                    warn_json_unsupported("config --init");
                }
                config_cmd::cmd_config_init(force, custom_config)
            } else {
                config_cmd::cmd_config(json, custom_config)
            }
        }
    }
}

#[cfg(test)]
mod format_tests {
    use super::*;

    #[test]
    fn kv_width_top_only() {
        let w = kv_width(&["Short:", "Longer key:"], &[]);
        // "Longer key:" = 11 + PADDING = 13
        assert_eq!(w, 13);
    }

    #[test]
    fn kv_width_indent_drives_width() {
        let w = kv_width(&["A:"], &["Very long indent key:"]);
        // 21 + PADDING + 2
        assert_eq!(w, 25);
    }

    #[test]
    fn values_align_across_levels() {
        let w = kv_width(&["Top:"], &["Indent:"]);
        let top = format_kv("Top:", "V", w);
        let indent = format!("  {:<width$}{}", "Indent:", "V", width = w - 2);
        assert_eq!(top.find('V'), indent.find('V'));
    }

    #[test]
    fn format_kv_overlong_key_is_not_padded() {
        assert_eq!(format_kv("ExactWidth:", "val", 10), "ExactWidth:val");
    }

    #[test]
    fn kv_width_empty_both() {
        assert_eq!(kv_width(&[], &[]), 0);
    }
}


#[cfg(test)]
mod json_struct_tests {
    use super::*;

    #[test]
    fn config_summary_json_has_expected_fields() {
        let summary = ConfigSummaryJson::from_config(&Config::default());
        let json = serde_json::to_value(&summary).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 5, "ConfigSummaryJson should have 5 fields");
        assert_eq!(obj["ap_ssid"], "WiFiGlow-Setup");
        assert_eq!(obj["probe_interval_ms"], 5000);
    }

    #[test]
    fn status_output_with_no_network() {
        let output = StatusOutput {
            version: "0.1.0".into(),
            credentials_file: "/tmp/credentials.toml".into(),
            network: None,
            has_password: false,
            boot_mode: "provisioning".into(),
            config: ConfigSummaryJson::from_config(&Config::default()),
        };
        let json = serde_json::to_value(&output).unwrap();
        assert!(json["network"].is_null());
        assert_eq!(json["boot_mode"], "provisioning");
        assert_eq!(json.as_object().unwrap().len(), 6);
    }

    #[test]
    fn preview_output_frames_are_hex_strings() {
        let output = PreviewOutput {
            effect: "static".into(),
            led_count: 2,
            frame_interval_ms: 50,
            frames: vec![vec!["#00FF00".into(), "#00FF00".into()]],
        };
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["frames"][0][1], "#00FF00");
    }
}
