//! Boot-time WiFi association with a bounded number of status polls.
//!
//! This is the one place the device blocks: it runs before any request is
//! served, polls the radio at a fixed sub-interval, and gives up after a
//! capped number of attempts so the device always reaches a visible state.

use std::time::Duration;

use crate::hal::{AssociationStatus, WifiRadio};

/// Configuration for the bounded association loop.
#[derive(Debug, Clone)]
pub struct AssociationConfig {
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Maximum number of status polls before giving up.
    pub max_attempts: u32,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_attempts: 20,
        }
    }
}

impl AssociationConfig {
    /// Worst-case time spent blocking before giving up.
    pub fn budget(&self) -> Duration {
        self.poll_interval.saturating_mul(self.max_attempts)
    }
}

/// How an association attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationOutcome {
    /// Joined the network after `attempts` polls.
    Connected { attempts: u32 },
    /// The radio reported a definitive failure.
    Failed { attempts: u32 },
    /// Still pending after every allowed poll.
    TimedOut { attempts: u32 },
}

impl AssociationOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, AssociationOutcome::Connected { .. })
    }
}

/// Join `ssid`, polling the radio until it connects, fails, or the attempt
/// budget runs out. `sleep` is called between polls.
pub fn associate(
    radio: &mut impl WifiRadio,
    ssid: &str,
    password: &str,
    config: &AssociationConfig,
    mut sleep: impl FnMut(Duration),
) -> AssociationOutcome {
    log::info!("associating with \"{ssid}\" (up to {:?})", config.budget());
    radio.begin_association(ssid, password);

    for attempt in 1..=config.max_attempts {
        match radio.association_status() {
            AssociationStatus::Connected => {
                log::info!("associated with \"{ssid}\" after {attempt} poll(s)");
                return AssociationOutcome::Connected { attempts: attempt };
            }
            AssociationStatus::Failed => {
                log::warn!("association with \"{ssid}\" failed (poll {attempt})");
                return AssociationOutcome::Failed { attempts: attempt };
            }
            AssociationStatus::Pending => {
                if attempt < config.max_attempts {
                    sleep(config.poll_interval);
                }
            }
        }
    }

    log::warn!(
        "association with \"{ssid}\" still pending after {} polls, giving up",
        config.max_attempts
    );
    AssociationOutcome::TimedOut {
        attempts: config.max_attempts,
    }
}
