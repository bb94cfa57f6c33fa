//! `config` subcommand — show current configuration and file paths, or write
//! a default config file.

use std::path::Path;

use wifiglow_lib::color::{encode, parse_color};

use super::{
    Config, ConfigFilesJson, ConfigOutput, Result, WifiglowError, credentials_path, kv, kv_indent,
    kv_width, load_config,
};

pub(super) fn cmd_config_init(force: bool, custom_path: Option<&Path>) -> Result<()> {
    let path = super::config_path(custom_path)
        .ok_or_else(|| WifiglowError::Config("No config directory; pass --config".into()))?;
    if path.exists() && !force {
        return Err(WifiglowError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    Config::default().save_to(&path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

pub(super) fn cmd_config(json: bool, custom_path: Option<&Path>) -> Result<()> {
    let config = load_config(custom_path);
    let config_path = super::config_path(custom_path);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());

    let credentials = credentials_path(custom_path).ok();
    let credentials_exists = credentials.as_ref().is_some_and(|p| p.exists());

    let problems: Vec<String> = match config.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => errors.iter().map(ToString::to_string).collect(),
    };

    if json {
        let output = ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: config,
            problems,
            files: ConfigFilesJson {
                credentials: credentials.as_ref().map(|p| p.display().to_string()),
                credentials_exists,
            },
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?
        );
        return Ok(());
    }

    let w = kv_width(
        &["Config file:"],
        &[
            "led_count:",
            "frame_interval_ms:",
            "probe_url:",
            "probe_expected_status:",
            "probe_interval_ms:",
            "probe_timeout_ms:",
            "reset_hold_ms:",
            "association_poll_ms:",
            "association_max_attempts:",
            "ap_ssid:",
            "static_color:",
            "snake_color:",
            "Credentials:",
        ],
    );

    match &config_path {
        Some(p) => {
            if config_exists {
                kv("Config file:", format_args!("{} (loaded)", p.display()), w);
            } else {
                kv(
                    "Config file:",
                    format_args!("{} (not found, using defaults)", p.display()),
                    w,
                );
            }
        }
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    let color_display = |value: &str| match parse_color(value) {
        Ok(c) => format!("{value} -> {}", encode(c)),
        Err(_) => format!("{value} (invalid)"),
    };

    println!("Settings:");
    kv_indent("led_count:", config.led_count, w);
    kv_indent("frame_interval_ms:", config.frame_interval_ms, w);
    kv_indent("probe_url:", &config.probe_url, w);
    kv_indent("probe_expected_status:", config.probe_expected_status, w);
    kv_indent("probe_interval_ms:", config.probe_interval_ms, w);
    kv_indent("probe_timeout_ms:", config.probe_timeout_ms, w);
    kv_indent("reset_hold_ms:", config.reset_hold_ms, w);
    kv_indent("association_poll_ms:", config.association_poll_ms, w);
    kv_indent("association_max_attempts:", config.association_max_attempts, w);
    kv_indent("ap_ssid:", &config.ap_ssid, w);
    kv_indent("static_color:", color_display(&config.static_color), w);
    kv_indent("snake_color:", color_display(&config.snake_color), w);
    println!();

    println!("Files:");
    match &credentials {
        Some(p) => {
            let status = if credentials_exists {
                "present"
            } else {
                "not found"
            };
            kv_indent("Credentials:", format_args!("{} ({status})", p.display()), w);
        }
        None => kv_indent("Credentials:", "(no config directory)", w),
    }

    if !problems.is_empty() {
        println!();
        println!("Problems:");
        for p in &problems {
            println!("  {p}");
        }
    }
    Ok(())
}
