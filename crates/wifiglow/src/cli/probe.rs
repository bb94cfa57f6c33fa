//! `probe` subcommand — one reachability check, as the lamp would run it.

use std::path::Path;
use std::time::{Duration, Instant};

use wifiglow_lib::hal::ReachabilityTransport;

use super::{ProbeOutput, Result, kv, kv_width, load_config};
use crate::transport::HttpTransport;

pub(super) fn cmd_probe(
    url: Option<String>,
    timeout_ms: Option<u64>,
    json: bool,
    custom_config: Option<&Path>,
) -> Result<()> {
    let config = load_config(custom_config);
    let url = url.unwrap_or(config.probe_url);
    let timeout = Duration::from_millis(timeout_ms.unwrap_or(config.probe_timeout_ms));
    let expected = config.probe_expected_status;

    let mut transport = HttpTransport::new()?;
    let started = Instant::now();
    let result = transport.fetch_status(&url, timeout);
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let (status, error) = match result {
        Ok(code) => (Some(code), None),
        Err(e) => (None, Some(e.to_string())),
    };
    let reachable = status == Some(expected);

    if json {
        let output = ProbeOutput {
            url,
            expected_status: expected,
            status,
            error,
            reachable,
            elapsed_ms,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?
        );
        return Ok(());
    }

    let w = kv_width(&["URL:", "Status:", "Elapsed:", "Internet:"], &[]);
    kv("URL:", &url, w);
    match (status, &error) {
        (Some(code), _) => kv("Status:", format_args!("{code} (want {expected})"), w),
        (None, Some(e)) => kv("Status:", format_args!("failed: {e}"), w),
        (None, None) => kv("Status:", "-", w),
    }
    kv("Elapsed:", format_args!("{elapsed_ms}ms"), w);
    kv(
        "Internet:",
        if reachable { "reachable" } else { "unreachable" },
        w,
    );
    Ok(())
}
