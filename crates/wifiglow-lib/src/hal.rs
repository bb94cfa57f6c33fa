//! Collaborator interfaces — everything the controller needs from the board.
//!
//! The controller never talks to hardware directly. Storage, the radio, the
//! reachability transport, the reset button and the LED strip each sit behind
//! a small trait; [`Board`] bundles them so the controller carries a single
//! generic parameter.

use std::time::Duration;

use serde::Serialize;
use smart_leds::RGB8;

use crate::error::Result;

/// Credential store key holding the network name.
pub const KEY_SSID: &str = "ssid";
/// Credential store key holding the network password.
pub const KEY_PASSWORD: &str = "password";

/// Persistent key/value storage for WiFi credentials.
pub trait CredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&mut self, key: &str, value: &str) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// Outcome of polling an association in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationStatus {
    Pending,
    Connected,
    Failed,
}

/// The WiFi radio.
pub trait WifiRadio {
    /// Start joining a network. Progress is reported by [`association_status`](Self::association_status).
    fn begin_association(&mut self, ssid: &str, password: &str);
    fn association_status(&mut self) -> AssociationStatus;
    /// Bring up the provisioning access point the captive portal is served on.
    fn start_access_point(&mut self, name: &str);
}

/// A single blocking request returning an HTTP-like status code.
pub trait ReachabilityTransport {
    fn fetch_status(&mut self, url: &str, timeout: Duration) -> Result<u16>;
}

/// The physical reset button.
pub trait ResetInput {
    /// `true` while the button is held.
    fn is_pressed(&mut self) -> bool;
}

/// The LED strip.
pub trait LedSink {
    fn show(&mut self, frame: &[RGB8]);
}

/// Everything the controller drives, as one bundle.
pub trait Board: CredentialStore + WifiRadio + ReachabilityTransport + ResetInput + LedSink {}

impl<T> Board for T where T: CredentialStore + WifiRadio + ReachabilityTransport + ResetInput + LedSink {}

/// In-memory board for unit and integration tests.
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};

    use crate::WifiglowError;

    /// Scriptable board. Every collaborator call is recorded so tests can
    /// assert on what the controller did.
    #[derive(Debug)]
    pub struct MockBoard {
        /// Credential storage.
        pub store: HashMap<String, String>,
        /// If true, every store operation fails.
        pub fail_store: bool,
        /// Statuses returned by successive `association_status` calls; the
        /// last one repeats once the queue is drained.
        pub association_script: VecDeque<AssociationStatus>,
        /// Recorded `begin_association` calls: (ssid, password).
        pub associations: Vec<(String, String)>,
        /// Recorded access point names.
        pub access_points: Vec<String>,
        /// Results returned by successive `fetch_status` calls; the last one
        /// repeats once the queue is drained.
        pub probe_script: VecDeque<Result<u16>>,
        /// Recorded probe calls: (url, timeout).
        pub probes: Vec<(String, Duration)>,
        /// Current reset button level.
        pub reset_pressed: bool,
        /// Every frame pushed to the strip.
        pub shown: Vec<Vec<RGB8>>,
    }

    impl Default for MockBoard {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockBoard {
        /// A board with no stored credentials, a radio that connects on the
        /// first poll, and a reachable network.
        pub fn new() -> Self {
            MockBoard {
                store: HashMap::new(),
                fail_store: false,
                association_script: VecDeque::from([AssociationStatus::Connected]),
                associations: Vec::new(),
                access_points: Vec::new(),
                probe_script: VecDeque::from([Ok(204)]),
                probes: Vec::new(),
                reset_pressed: false,
                shown: Vec::new(),
            }
        }

        /// A board with `ssid`/`password` already stored.
        pub fn with_credentials(ssid: &str, password: &str) -> Self {
            let mut board = Self::new();
            board.store.insert(KEY_SSID.into(), ssid.into());
            board.store.insert(KEY_PASSWORD.into(), password.into());
            board
        }

        /// Replace the association script.
        pub fn script_association(&mut self, statuses: &[AssociationStatus]) {
            self.association_script = statuses.iter().copied().collect();
        }

        /// Replace the probe script with plain status codes.
        pub fn script_probes(&mut self, codes: &[u16]) {
            self.probe_script = codes.iter().map(|&c| Ok(c)).collect();
        }

        /// Make every subsequent probe fail at the transport level.
        pub fn fail_probes(&mut self, reason: &str) {
            self.probe_script = VecDeque::from([Err(WifiglowError::Transport(reason.into()))]);
        }

        fn store_guard(&self) -> Result<()> {
            if self.fail_store {
                Err(WifiglowError::Store("mock store failure".into()))
            } else {
                Ok(())
            }
        }
    }

    impl CredentialStore for MockBoard {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.store_guard()?;
            Ok(self.store.get(key).cloned())
        }

        fn put(&mut self, key: &str, value: &str) -> Result<()> {
            self.store_guard()?;
            self.store.insert(key.into(), value.into());
            Ok(())
        }

        fn clear(&mut self) -> Result<()> {
            self.store_guard()?;
            self.store.clear();
            Ok(())
        }
    }

    impl WifiRadio for MockBoard {
        fn begin_association(&mut self, ssid: &str, password: &str) {
            self.associations.push((ssid.into(), password.into()));
        }

        fn association_status(&mut self) -> AssociationStatus {
            if self.association_script.len() > 1 {
                self.association_script
                    .pop_front()
                    .unwrap_or(AssociationStatus::Failed)
            } else {
                self.association_script
                    .front()
                    .copied()
                    .unwrap_or(AssociationStatus::Failed)
            }
        }

        fn start_access_point(&mut self, name: &str) {
            self.access_points.push(name.into());
        }
    }

    impl ReachabilityTransport for MockBoard {
        fn fetch_status(&mut self, url: &str, timeout: Duration) -> Result<u16> {
            self.probes.push((url.into(), timeout));
            let next = if self.probe_script.len() > 1 {
                self.probe_script.pop_front()
            } else {
                None
            };
            match next {
                Some(result) => result,
                None => match self.probe_script.front() {
                    Some(Ok(code)) => Ok(*code),
                    Some(Err(e)) => Err(WifiglowError::Transport(e.to_string())),
                    None => Err(WifiglowError::Transport("no scripted response".into())),
                },
            }
        }
    }

    impl ResetInput for MockBoard {
        fn is_pressed(&mut self) -> bool {
            self.reset_pressed
        }
    }

    impl LedSink for MockBoard {
        fn show(&mut self, frame: &[RGB8]) {
            self.shown.push(frame.to_vec());
        }
    }
}
