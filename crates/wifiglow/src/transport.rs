//! Reachability probe over HTTP.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;

use wifiglow_lib::WifiglowError;
use wifiglow_lib::error::Result;
use wifiglow_lib::hal::ReachabilityTransport;

/// Blocking HTTP client issuing one GET per probe.
///
/// Redirects are not followed: a captive portal answering with a 302 must
/// read as "not reachable", not as the portal's final page.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .user_agent(concat!("wifiglow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WifiglowError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl ReachabilityTransport for HttpTransport {
    fn fetch_status(&mut self, url: &str, timeout: Duration) -> Result<u16> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(|e| WifiglowError::Transport(e.to_string()))?;
        Ok(resp.status().as_u16())
    }
}
