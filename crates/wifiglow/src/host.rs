//! Host-side board: the lamp's collaborators, simulated on a desktop.
//!
//! Credentials persist to a TOML file, the radio is simulated, the probe is a
//! real HTTP request, the reset button is "a file exists", and the strip is
//! drawn in the terminal with 24-bit ANSI colors.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use smart_leds::RGB8;
use wifiglow_lib::error::Result;
use wifiglow_lib::hal::{
    AssociationStatus, CredentialStore, LedSink, ReachabilityTransport, ResetInput, WifiRadio,
};
use wifiglow_lib::store::FileCredentialStore;

/// Radio that "joins" any network after a few pending polls.
#[derive(Debug, Default)]
pub struct SimulatedRadio {
    /// Report `Failed` instead of `Connected` once the pending polls run out.
    pub fail: bool,
    /// Polls answered with `Pending` before the outcome.
    pub pending_polls: u32,
    remaining: u32,
    /// Network of the last association attempt.
    pub joined: Option<String>,
    /// Name of the access point, once started.
    pub access_point: Option<String>,
}

impl SimulatedRadio {
    pub fn new(fail: bool, pending_polls: u32) -> Self {
        Self {
            fail,
            pending_polls,
            ..Self::default()
        }
    }
}

impl WifiRadio for SimulatedRadio {
    fn begin_association(&mut self, ssid: &str, _password: &str) {
        println!("[radio]  joining \"{ssid}\"");
        self.remaining = self.pending_polls;
        self.joined = Some(ssid.to_string());
    }

    fn association_status(&mut self) -> AssociationStatus {
        if self.remaining > 0 {
            self.remaining -= 1;
            AssociationStatus::Pending
        } else if self.fail {
            AssociationStatus::Failed
        } else {
            AssociationStatus::Connected
        }
    }

    fn start_access_point(&mut self, name: &str) {
        println!("[portal] access point \"{name}\" up, waiting for credentials");
        self.access_point = Some(name.to_string());
    }
}

/// Reset button that reads as held while a marker file exists.
#[derive(Debug, Default)]
pub struct FileButton {
    path: Option<PathBuf>,
}

impl FileButton {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl ResetInput for FileButton {
    fn is_pressed(&mut self) -> bool {
        self.path.as_ref().is_some_and(|p| p.exists())
    }
}

/// Terminal strip. Draws each frame in place when `render` is set.
#[derive(Debug, Default)]
pub struct TerminalStrip {
    render: bool,
    frames: u64,
    last: Vec<RGB8>,
}

impl TerminalStrip {
    pub fn new(render: bool) -> Self {
        Self {
            render,
            ..Self::default()
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_frame(&self) -> &[RGB8] {
        &self.last
    }

    /// Finish the in-place line so later output starts on a fresh one.
    pub fn finish(&self) {
        if self.render && self.frames > 0 {
            println!();
        }
    }
}

impl LedSink for TerminalStrip {
    fn show(&mut self, frame: &[RGB8]) {
        self.frames += 1;
        self.last.clear();
        self.last.extend_from_slice(frame);
        if self.render {
            print!("\r{}", ansi_frame(frame));
            let _ = std::io::stdout().flush();
        }
    }
}

/// One block per pixel in 24-bit color, followed by a reset.
pub fn ansi_frame(frame: &[RGB8]) -> String {
    let mut out = String::with_capacity(frame.len() * 20 + 4);
    for px in frame {
        let _ = write!(out, "\x1b[38;2;{};{};{}m\u{2588}", px.r, px.g, px.b);
    }
    out.push_str("\x1b[0m");
    out
}

/// All host collaborators as one board.
pub struct HostBoard<T> {
    pub store: FileCredentialStore,
    pub radio: SimulatedRadio,
    pub transport: T,
    pub button: FileButton,
    pub strip: TerminalStrip,
}

impl<T> CredentialStore for HostBoard<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key)
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        self.store.put(key, value)
    }

    fn clear(&mut self) -> Result<()> {
        self.store.clear()
    }
}

impl<T> WifiRadio for HostBoard<T> {
    fn begin_association(&mut self, ssid: &str, password: &str) {
        self.radio.begin_association(ssid, password);
    }

    fn association_status(&mut self) -> AssociationStatus {
        self.radio.association_status()
    }

    fn start_access_point(&mut self, name: &str) {
        self.radio.start_access_point(name);
    }
}

impl<T: ReachabilityTransport> ReachabilityTransport for HostBoard<T> {
    fn fetch_status(&mut self, url: &str, timeout: Duration) -> Result<u16> {
        self.transport.fetch_status(url, timeout)
    }
}

impl<T> ResetInput for HostBoard<T> {
    fn is_pressed(&mut self) -> bool {
        self.button.is_pressed()
    }
}

impl<T> LedSink for HostBoard<T> {
    fn show(&mut self, frame: &[RGB8]) {
        self.strip.show(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wifiglow_lib::controller::{ControllerConfig, DeviceMode, ModeController};
    use wifiglow_lib::effects::EffectId;
    use wifiglow_lib::hal::KEY_SSID;

    struct FixedStatus(u16);

    impl ReachabilityTransport for FixedStatus {
        fn fetch_status(&mut self, _url: &str, _timeout: Duration) -> Result<u16> {
            Ok(self.0)
        }
    }

    fn board(dir: &tempfile::TempDir, fail: bool, status: u16) -> HostBoard<FixedStatus> {
        HostBoard {
            store: FileCredentialStore::new(dir.path().join("credentials.toml")),
            radio: SimulatedRadio::new(fail, 2),
            transport: FixedStatus(status),
            button: FileButton::new(Some(dir.path().join("reset"))),
            strip: TerminalStrip::new(false),
        }
    }

    fn controller_config() -> ControllerConfig {
        ControllerConfig {
            led_count: 4,
            ..ControllerConfig::default()
        }
    }

    #[test]
    fn simulated_radio_reports_pending_first() {
        let mut radio = SimulatedRadio::new(false, 2);
        radio.begin_association("home", "pw");
        assert_eq!(radio.association_status(), AssociationStatus::Pending);
        assert_eq!(radio.association_status(), AssociationStatus::Pending);
        assert_eq!(radio.association_status(), AssociationStatus::Connected);
        assert_eq!(radio.joined.as_deref(), Some("home"));
    }

    #[test]
    fn simulated_radio_can_fail() {
        let mut radio = SimulatedRadio::new(true, 0);
        radio.begin_association("home", "pw");
        assert_eq!(radio.association_status(), AssociationStatus::Failed);
    }

    #[test]
    fn file_button_follows_marker_file() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("reset");
        let mut button = FileButton::new(Some(marker.clone()));
        assert!(!button.is_pressed());
        std::fs::write(&marker, "").unwrap();
        assert!(button.is_pressed());
        assert!(!FileButton::new(None).is_pressed());
    }

    #[test]
    fn ansi_frame_draws_one_block_per_pixel() {
        let s = ansi_frame(&[RGB8::new(255, 0, 0), RGB8::new(0, 0, 255)]);
        assert_eq!(
            s,
            "\x1b[38;2;255;0;0m\u{2588}\x1b[38;2;0;0;255m\u{2588}\x1b[0m"
        );
    }

    #[test]
    fn strip_keeps_last_frame() {
        let mut strip = TerminalStrip::new(false);
        strip.show(&[RGB8::new(1, 2, 3)]);
        strip.show(&[RGB8::new(4, 5, 6)]);
        assert_eq!(strip.frames(), 2);
        assert_eq!(strip.last_frame(), &[RGB8::new(4, 5, 6)]);
    }

    #[test]
    fn host_board_boots_from_credential_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = board(&dir, false, 204);
        b.put(KEY_SSID, "home").unwrap();

        let mut c = ModeController::boot(b, controller_config(), |_| {});
        assert_eq!(c.current_mode(), DeviceMode::Monitoring);
        c.tick(0);
        assert_eq!(c.current_effect(), &EffectId::BreatheGreen);
        assert_eq!(c.board().strip.frames(), 1);
    }

    #[test]
    fn host_board_reset_file_clears_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = board(&dir, false, 204);
        b.put(KEY_SSID, "home").unwrap();
        let mut c = ModeController::boot(b, controller_config(), |_| {});

        std::fs::write(dir.path().join("reset"), "").unwrap();
        let fired = (0..400u64)
            .map(|i| c.tick(i * 10).reset_fired)
            .filter(|&f| f)
            .count();
        assert_eq!(fired, 1);
        assert_eq!(c.current_mode(), DeviceMode::Provisioning);
        assert!(!dir.path().join("credentials.toml").exists());
        assert_eq!(c.board().radio.access_point.as_deref(), Some("WiFiGlow-Setup"));
    }

    #[test]
    fn host_board_failed_join_opens_portal() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = board(&dir, true, 204);
        b.put(KEY_SSID, "home").unwrap();
        let c = ModeController::boot(b, controller_config(), |_| {});
        assert_eq!(c.current_mode(), DeviceMode::Provisioning);
        assert_eq!(c.board().radio.joined.as_deref(), Some("home"));
    }
}
