//! `provision` and `reset` subcommands — write or forget stored credentials.

use std::path::Path;

use wifiglow_lib::hal::{CredentialStore, KEY_PASSWORD, KEY_SSID};

use super::{FileCredentialStore, Result, WifiglowError, credentials_path};

pub(super) fn cmd_provision(ssid: &str, password: &str, custom_config: Option<&Path>) -> Result<()> {
    let ssid = ssid.trim();
    if ssid.is_empty() {
        return Err(WifiglowError::Config("network name cannot be empty".into()));
    }
    let path = credentials_path(custom_config)?;
    let mut store = FileCredentialStore::new(&path);
    store.put(KEY_SSID, ssid)?;
    store.put(KEY_PASSWORD, password)?;
    println!("Saved credentials for \"{ssid}\" to {}", path.display());
    println!("The lamp joins this network on its next boot.");
    Ok(())
}

pub(super) fn cmd_reset(custom_config: Option<&Path>) -> Result<()> {
    let path = credentials_path(custom_config)?;
    let existed = path.exists();
    FileCredentialStore::new(&path).clear()?;
    if existed {
        println!("Cleared stored credentials ({})", path.display());
    } else {
        println!("No stored credentials ({})", path.display());
    }
    println!("The lamp opens its provisioning portal on next boot.");
    Ok(())
}
