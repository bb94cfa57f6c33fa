//! `status` subcommand — stored network and what the next boot will do.

use std::path::Path;

use wifiglow_lib::controller::DeviceMode;
use wifiglow_lib::hal::{CredentialStore, KEY_PASSWORD, KEY_SSID};

use super::{
    ConfigSummaryJson, FileCredentialStore, Result, StatusOutput, credentials_path, kv, kv_indent,
    kv_width, load_config,
};

/// Mode the lamp boots into given a stored network, assuming it can join.
fn expected_boot_mode(network: Option<&str>) -> DeviceMode {
    match network {
        Some(ssid) if !ssid.trim().is_empty() => DeviceMode::Monitoring,
        _ => DeviceMode::Provisioning,
    }
}

pub(super) fn cmd_status(json: bool, custom_config: Option<&Path>) -> Result<()> {
    let config = load_config(custom_config);
    let creds = credentials_path(custom_config)?;
    let store = FileCredentialStore::new(&creds);

    let network = store.get(KEY_SSID)?;
    let has_password = store
        .get(KEY_PASSWORD)?
        .is_some_and(|p| !p.is_empty());
    let boot_mode = expected_boot_mode(network.as_deref());

    if json {
        let output = StatusOutput {
            version: env!("CARGO_PKG_VERSION").to_string(),
            credentials_file: creds.display().to_string(),
            network,
            has_password,
            boot_mode: boot_mode.to_string(),
            config: ConfigSummaryJson::from_config(&config),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?
        );
        return Ok(());
    }

    let w = kv_width(
        &["Version:", "Network:", "Next boot:", "Config:"],
        &["LEDs:", "Access point:", "Probe:", "Reset hold:"],
    );
    kv("Version:", env!("CARGO_PKG_VERSION"), w);
    match &network {
        Some(ssid) => {
            let security = if has_password { "password set" } else { "open" };
            kv("Network:", format_args!("\"{ssid}\" ({security})"), w);
        }
        None => kv("Network:", "(none stored)", w),
    }
    kv("Next boot:", boot_mode, w);
    println!("Config:");
    kv_indent("LEDs:", config.led_count, w);
    kv_indent("Access point:", &config.ap_ssid, w);
    kv_indent(
        "Probe:",
        format_args!("{} every {}ms", config.probe_url, config.probe_interval_ms),
        w,
    );
    kv_indent("Reset hold:", format_args!("{}ms", config.reset_hold_ms), w);
    Ok(())
}
