//! Mode controller — owns the device mode and composes the reset watcher,
//! connectivity monitor and effect engine into one cooperative tick.
//!
//! The host loop calls [`ModeController::tick`] at a high rate. Every periodic
//! activity inside it is an elapsed-time check against its own timestamp; the
//! only blocking wait is the association attempt in [`ModeController::boot`],
//! which runs before any request is served.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

use crate::association::{self, AssociationConfig};
use crate::color;
use crate::command::{Command, ControllerHandle, EffectRequest, StatusSnapshot};
use crate::connectivity::{ConnectivityMonitor, ConnectivityState, ProbeConfig};
use crate::effects::{DEFAULT_FRAME_INTERVAL_MS, EffectEngine, EffectId, EffectParameters};
use crate::hal::{Board, CredentialStore, KEY_PASSWORD, KEY_SSID};
use crate::reset::{DEFAULT_RESET_HOLD_MS, ResetWatcher};

/// Top-level device mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceMode {
    /// Access point + captive portal, waiting for credentials.
    Provisioning,
    /// Joined to a network, reporting reachability on the strip.
    Monitoring,
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceMode::Provisioning => write!(f, "provisioning"),
            DeviceMode::Monitoring => write!(f, "monitoring"),
        }
    }
}

impl DeviceMode {
    /// The effect a mode starts with.
    pub fn entry_effect(self) -> EffectId {
        match self {
            DeviceMode::Provisioning => EffectId::Waiting,
            DeviceMode::Monitoring => EffectId::MonitoringPlaceholder,
        }
    }
}

/// Everything the controller needs to know up front.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub led_count: usize,
    pub frame_interval_ms: u64,
    pub probe: ProbeConfig,
    pub reset_hold_ms: u64,
    pub association: AssociationConfig,
    /// Name of the provisioning access point.
    pub ap_ssid: String,
    /// Initial effect colors.
    pub params: EffectParameters,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            led_count: 30,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            probe: ProbeConfig::default(),
            reset_hold_ms: DEFAULT_RESET_HOLD_MS,
            association: AssociationConfig::default(),
            ap_ssid: "WiFiGlow-Setup".into(),
            params: EffectParameters::default(),
        }
    }
}

/// Result of an effect change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectChange {
    Applied,
    /// The effect belongs to the other mode; nothing changed.
    IgnoredForMode,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The reset gesture fired and the device returned to provisioning.
    pub reset_fired: bool,
    /// Result of the connectivity probe, if one ran.
    pub probe: Option<bool>,
    /// A new frame was pushed to the strip.
    pub frame_shown: bool,
    /// New credentials were stored; the host should re-run boot.
    pub restart_requested: bool,
}

/// The device state machine. Sole owner of mode, effect and parameters.
pub struct ModeController<B: Board> {
    board: B,
    config: ControllerConfig,
    mode: DeviceMode,
    effect: EffectId,
    params: EffectParameters,
    engine: EffectEngine,
    connectivity: ConnectivityMonitor,
    reset: ResetWatcher,
    commands: Receiver<Command>,
    sender: Sender<Command>,
    status: Arc<Mutex<StatusSnapshot>>,
    restart_requested: bool,
}

impl<B: Board> ModeController<B> {
    /// Boot the device: join the stored network if there is one, otherwise
    /// (or on failure) open the provisioning portal.
    ///
    /// Blocks for up to the association budget, calling `sleep` between
    /// status polls.
    pub fn boot(mut board: B, config: ControllerConfig, sleep: impl FnMut(Duration)) -> Self {
        let mode = match read_credentials(&board) {
            Some((ssid, password)) => {
                let outcome =
                    association::associate(&mut board, &ssid, &password, &config.association, sleep);
                if outcome.is_connected() {
                    DeviceMode::Monitoring
                } else {
                    log::warn!("could not join \"{ssid}\" ({outcome:?}), falling back to provisioning");
                    DeviceMode::Provisioning
                }
            }
            None => {
                log::info!("no stored credentials");
                DeviceMode::Provisioning
            }
        };

        let (sender, commands) = mpsc::channel();
        let status = Arc::new(Mutex::new(StatusSnapshot {
            mode,
            effect: mode.entry_effect(),
            connectivity: ConnectivityState::default(),
        }));
        let mut controller = ModeController {
            engine: EffectEngine::new(config.led_count, config.frame_interval_ms),
            connectivity: ConnectivityMonitor::new(config.probe.clone()),
            reset: ResetWatcher::new(config.reset_hold_ms),
            params: config.params,
            effect: mode.entry_effect(),
            mode,
            board,
            config,
            commands,
            sender,
            status,
            restart_requested: false,
        };
        if mode == DeviceMode::Provisioning {
            controller.open_portal();
        }
        log::info!("booted into {mode} mode");
        controller.publish_status();
        controller
    }

    /// A handle request handlers can use from any thread.
    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle::new(self.sender.clone(), Arc::clone(&self.status))
    }

    pub fn current_mode(&self) -> DeviceMode {
        self.mode
    }

    pub fn current_effect(&self) -> &EffectId {
        &self.effect
    }

    pub fn parameters(&self) -> &EffectParameters {
        &self.params
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.connectivity.state()
    }

    pub fn engine(&self) -> &EffectEngine {
        &self.engine
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    /// Hand the collaborators back, e.g. to boot again after provisioning.
    pub fn into_board(self) -> B {
        self.board
    }

    /// Status as of the last completed tick.
    pub fn status_snapshot(&self) -> StatusSnapshot {
        self.status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Change the running effect and, optionally, its colors.
    ///
    /// Unknown effect names are stored as-is. Effects scoped to the other
    /// mode are ignored and leave both effect and colors untouched.
    pub fn set_effect(&mut self, request: EffectRequest) -> EffectChange {
        if !request.effect.allowed_in(self.mode) {
            log::warn!(
                "ignoring effect \"{}\" in {} mode",
                request.effect,
                self.mode
            );
            return EffectChange::IgnoredForMode;
        }
        if let Some(token) = &request.static_color {
            self.params.static_color = color::decode(token);
        }
        if let Some(token) = &request.snake_color {
            self.params.snake_color = color::decode(token);
        }
        if let EffectId::Unrecognized(name) = &request.effect {
            log::warn!("unknown effect \"{name}\" stored; strip will hold its last frame");
        } else {
            log::info!("effect -> {}", request.effect);
        }
        self.effect = request.effect;
        EffectChange::Applied
    }

    /// Explicit mode request from a handler.
    ///
    /// `Monitoring` while monitoring returns control of the strip to the
    /// connectivity monitor. `Monitoring` while provisioning is ignored: that
    /// edge needs a successful association, which only happens at boot.
    /// `Provisioning` is a factory reset.
    pub fn set_mode(&mut self, mode: DeviceMode) {
        match (self.mode, mode) {
            (DeviceMode::Monitoring, DeviceMode::Monitoring) => self.return_to_monitoring(),
            (DeviceMode::Provisioning, DeviceMode::Monitoring) => {
                log::warn!("cannot enter monitoring without associating; submit credentials instead");
            }
            (_, DeviceMode::Provisioning) => self.request_reset(),
        }
    }

    /// Factory reset: forget credentials and reopen the provisioning portal.
    pub fn request_reset(&mut self) {
        if let Err(e) = self.board.clear() {
            log::warn!("could not clear stored credentials: {e}");
        }
        log::info!("factory reset, entering provisioning mode");
        self.mode = DeviceMode::Provisioning;
        self.effect = DeviceMode::Provisioning.entry_effect();
        self.connectivity.reset();
        self.restart_requested = false;
        self.open_portal();
    }

    /// Store credentials from the portal and ask the host to boot again.
    /// Returns `false` if the store rejected them.
    pub fn submit_credentials(&mut self, ssid: &str, password: &str) -> bool {
        let ssid = ssid.trim();
        if ssid.is_empty() {
            log::warn!("ignoring credentials with an empty network name");
            return false;
        }
        let stored = self
            .board
            .put(KEY_SSID, ssid)
            .and_then(|()| self.board.put(KEY_PASSWORD, password));
        match stored {
            Ok(()) => {
                log::info!("credentials for \"{ssid}\" saved, restart requested");
                self.restart_requested = true;
                true
            }
            Err(e) => {
                log::warn!("could not save credentials: {e}");
                false
            }
        }
    }

    /// Run one cooperative cycle: queued commands, reset gesture,
    /// connectivity (monitoring only), then the frame.
    pub fn tick(&mut self, now: u64) -> TickReport {
        let mut report = TickReport::default();

        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
        }

        let pressed = self.board.is_pressed();
        if let Some(request) = self.reset.poll(pressed, now) {
            log::warn!("reset button held for {}ms", request.held_ms);
            self.request_reset();
            report.reset_fired = true;
        }

        if self.mode == DeviceMode::Monitoring {
            report.probe = self
                .connectivity
                .poll(now, &mut self.board, &mut self.effect);
        }

        if let Some(frame) = self.engine.advance_frame(&self.effect, &self.params, now) {
            log::trace!("frame {} px ({})", frame.len(), self.effect);
            self.board.show(frame);
            report.frame_shown = true;
        }

        report.restart_requested = std::mem::take(&mut self.restart_requested);
        self.publish_status();
        report
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::SetEffect(request) => {
                self.set_effect(request);
            }
            Command::SetMode(mode) => self.set_mode(mode),
            Command::RequestReset => self.request_reset(),
            Command::SubmitCredentials { ssid, password } => {
                self.submit_credentials(&ssid, &password);
            }
        }
    }

    fn return_to_monitoring(&mut self) {
        log::info!("returning strip to connectivity monitor");
        self.effect = EffectId::MonitoringPlaceholder;
        // Probe on the next tick so the placeholder resolves right away.
        self.connectivity.reset();
    }

    fn open_portal(&mut self) {
        let name = self.config.ap_ssid.clone();
        log::info!("starting provisioning access point \"{name}\"");
        self.board.start_access_point(&name);
    }

    fn publish_status(&self) {
        let snapshot = StatusSnapshot {
            mode: self.mode,
            effect: self.effect.clone(),
            connectivity: self.connectivity.state(),
        };
        *self
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot;
    }
}

/// Stored (ssid, password), treating store failures as "nothing stored".
fn read_credentials(store: &impl CredentialStore) -> Option<(String, String)> {
    let ssid = match store.get(KEY_SSID) {
        Ok(Some(ssid)) if !ssid.trim().is_empty() => ssid,
        Ok(_) => return None,
        Err(e) => {
            log::warn!("credential store unreadable, treating as empty: {e}");
            return None;
        }
    };
    let password = match store.get(KEY_PASSWORD) {
        Ok(password) => password.unwrap_or_default(),
        Err(e) => {
            log::warn!("stored password unreadable, treating as empty: {e}");
            String::new()
        }
    };
    Some((ssid, password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::AssociationStatus;
    use crate::hal::mock::MockBoard;
    use smart_leds::RGB8;

    fn config() -> ControllerConfig {
        ControllerConfig {
            led_count: 8,
            reset_hold_ms: 100,
            ..ControllerConfig::default()
        }
    }

    fn boot(board: MockBoard) -> ModeController<MockBoard> {
        ModeController::boot(board, config(), |_| {})
    }

    // ── boot ──

    #[test]
    fn boot_without_credentials_provisions() {
        let c = boot(MockBoard::new());
        assert_eq!(c.current_mode(), DeviceMode::Provisioning);
        assert_eq!(c.current_effect(), &EffectId::Waiting);
        assert!(c.board().associations.is_empty());
        assert_eq!(c.board().access_points, vec!["WiFiGlow-Setup".to_string()]);
    }

    #[test]
    fn boot_with_credentials_monitors() {
        let c = boot(MockBoard::with_credentials("home", "secret"));
        assert_eq!(c.current_mode(), DeviceMode::Monitoring);
        assert_eq!(c.current_effect(), &EffectId::MonitoringPlaceholder);
        assert_eq!(
            c.board().associations,
            vec![("home".to_string(), "secret".to_string())]
        );
        assert!(c.board().access_points.is_empty());
    }

    #[test]
    fn boot_association_failure_provisions() {
        let mut board = MockBoard::with_credentials("home", "wrong");
        board.script_association(&[AssociationStatus::Pending, AssociationStatus::Failed]);
        let c = boot(board);
        assert_eq!(c.current_mode(), DeviceMode::Provisioning);
        assert_eq!(c.current_effect(), &EffectId::Waiting);
        assert_eq!(c.board().access_points.len(), 1);
    }

    #[test]
    fn boot_association_timeout_provisions() {
        let mut board = MockBoard::with_credentials("home", "pw");
        board.script_association(&[AssociationStatus::Pending]);
        let mut sleeps = 0;
        let cfg = ControllerConfig {
            association: AssociationConfig {
                poll_interval: Duration::from_millis(10),
                max_attempts: 3,
            },
            ..config()
        };
        let c = ModeController::boot(board, cfg, |_| sleeps += 1);
        assert_eq!(c.current_mode(), DeviceMode::Provisioning);
        assert_eq!(sleeps, 2);
    }

    #[test]
    fn boot_store_failure_reads_as_no_credentials() {
        let mut board = MockBoard::with_credentials("home", "pw");
        board.fail_store = true;
        let c = boot(board);
        assert_eq!(c.current_mode(), DeviceMode::Provisioning);
        assert!(c.board().associations.is_empty());
    }

    #[test]
    fn boot_blank_ssid_reads_as_no_credentials() {
        let c = boot(MockBoard::with_credentials("   ", "pw"));
        assert_eq!(c.current_mode(), DeviceMode::Provisioning);
    }

    #[test]
    fn boot_publishes_initial_snapshot() {
        let c = boot(MockBoard::with_credentials("home", "pw"));
        let s = c.status_snapshot();
        assert_eq!(s.mode, DeviceMode::Monitoring);
        assert_eq!(s.effect, EffectId::MonitoringPlaceholder);
        assert_eq!(s.connectivity.last_probe_ms, None);
    }

    // ── set_effect ──

    #[test]
    fn set_effect_applies_colors() {
        let mut c = boot(MockBoard::new());
        let change = c.set_effect(
            EffectRequest::new(EffectId::Static).with_static_color("#0000FF"),
        );
        assert_eq!(change, EffectChange::Applied);
        assert_eq!(c.current_effect(), &EffectId::Static);
        assert_eq!(c.parameters().static_color, RGB8::new(0, 0, 255));
    }

    #[test]
    fn set_effect_tolerates_bad_color_tokens() {
        let mut c = boot(MockBoard::new());
        c.set_effect(EffectRequest::new(EffectId::Snake).with_snake_color("#zz"));
        assert_eq!(c.current_effect(), &EffectId::Snake);
        assert_eq!(c.parameters().snake_color, RGB8::new(0, 0, 0));
    }

    #[test]
    fn set_effect_stores_unknown_names() {
        let mut c = boot(MockBoard::with_credentials("home", "pw"));
        let id = EffectId::from_name("sparkle");
        assert_eq!(c.set_effect(EffectRequest::new(id.clone())), EffectChange::Applied);
        assert_eq!(c.current_effect(), &id);
    }

    #[test]
    fn set_effect_rejects_cross_mode_ids() {
        let mut c = boot(MockBoard::new());
        let change = c.set_effect(
            EffectRequest::new(EffectId::BlinkRed).with_static_color("#FFFFFF"),
        );
        assert_eq!(change, EffectChange::IgnoredForMode);
        assert_eq!(c.current_effect(), &EffectId::Waiting);
        assert_eq!(c.parameters().static_color, EffectParameters::default().static_color);

        let mut c = boot(MockBoard::with_credentials("home", "pw"));
        assert_eq!(
            c.set_effect(EffectRequest::new(EffectId::Waiting)),
            EffectChange::IgnoredForMode
        );
        assert_eq!(c.current_effect(), &EffectId::MonitoringPlaceholder);
    }

    // ── modes ──

    #[test]
    fn return_to_monitoring_restores_placeholder() {
        let mut c = boot(MockBoard::with_credentials("home", "pw"));
        c.tick(0);
        c.set_effect(EffectRequest::new(EffectId::Static));
        c.set_mode(DeviceMode::Monitoring);
        assert_eq!(c.current_effect(), &EffectId::MonitoringPlaceholder);
        // The next tick probes straight away and resolves it.
        let report = c.tick(10);
        assert_eq!(report.probe, Some(true));
        assert_eq!(c.current_effect(), &EffectId::BreatheGreen);
    }

    #[test]
    fn monitoring_request_ignored_while_provisioning() {
        let mut c = boot(MockBoard::new());
        c.set_mode(DeviceMode::Monitoring);
        assert_eq!(c.current_mode(), DeviceMode::Provisioning);
        assert_eq!(c.current_effect(), &EffectId::Waiting);
    }

    #[test]
    fn provisioning_request_is_factory_reset() {
        let mut c = boot(MockBoard::with_credentials("home", "pw"));
        c.set_mode(DeviceMode::Provisioning);
        assert_eq!(c.current_mode(), DeviceMode::Provisioning);
        assert_eq!(c.current_effect(), &EffectId::Waiting);
        assert!(c.board().store.is_empty());
    }

    #[test]
    fn request_reset_clears_and_reopens_portal() {
        let mut c = boot(MockBoard::with_credentials("home", "pw"));
        c.tick(0);
        assert!(c.connectivity().last_probe_ms.is_some());
        c.request_reset();
        assert_eq!(c.current_mode(), DeviceMode::Provisioning);
        assert_eq!(c.current_effect(), &EffectId::Waiting);
        assert!(c.board().store.is_empty());
        assert_eq!(c.board().access_points.len(), 1);
        assert_eq!(c.connectivity(), ConnectivityState::default());
    }

    #[test]
    fn reset_survives_store_failure() {
        let mut c = boot(MockBoard::with_credentials("home", "pw"));
        c.board_mut().fail_store = true;
        c.request_reset();
        assert_eq!(c.current_mode(), DeviceMode::Provisioning);
    }

    // ── credentials ──

    #[test]
    fn submit_credentials_stores_and_requests_restart() {
        let mut c = boot(MockBoard::new());
        assert!(c.submit_credentials("home", "pw"));
        assert_eq!(c.board().store.get(KEY_SSID).map(String::as_str), Some("home"));
        assert!(c.tick(0).restart_requested);
        assert!(!c.tick(50).restart_requested, "reported once");
        // Still provisioning until the host boots again.
        assert_eq!(c.current_mode(), DeviceMode::Provisioning);
    }

    #[test]
    fn submit_credentials_rejects_empty_ssid() {
        let mut c = boot(MockBoard::new());
        assert!(!c.submit_credentials("  ", "pw"));
        assert!(c.board().store.is_empty());
    }

    #[test]
    fn submit_credentials_store_failure() {
        let mut c = boot(MockBoard::new());
        c.board_mut().fail_store = true;
        assert!(!c.submit_credentials("home", "pw"));
        assert!(!c.tick(0).restart_requested);
    }

    // ── tick ──

    #[test]
    fn provisioning_tick_never_probes() {
        let mut c = boot(MockBoard::new());
        for now in (0..20_000).step_by(10) {
            assert_eq!(c.tick(now).probe, None);
        }
        assert!(c.board().probes.is_empty());
    }

    #[test]
    fn tick_shows_frames_at_frame_rate() {
        let mut c = boot(MockBoard::new());
        for now in (0..500).step_by(10) {
            c.tick(now);
        }
        // 0, 50, ..., 450
        assert_eq!(c.board().shown.len(), 10);
        assert!(c.board().shown.iter().all(|f| f.len() == 8));
    }

    #[test]
    fn tick_drains_handle_commands() {
        let mut c = boot(MockBoard::with_credentials("home", "pw"));
        let handle = c.handle();
        handle.set_effect(EffectRequest::new(EffectId::Static).with_static_color("#112233"));
        assert_eq!(handle.status_snapshot().effect, EffectId::MonitoringPlaceholder);

        c.tick(0);
        assert_eq!(c.current_effect(), &EffectId::Static);
        assert_eq!(handle.status_snapshot().effect, EffectId::Static);
        assert_eq!(c.board().shown[0][0], RGB8::new(0x11, 0x22, 0x33));
    }

    #[test]
    fn handle_submit_credentials_requests_restart() {
        let mut c = boot(MockBoard::new());
        c.handle().submit_credentials("home", "pw");
        assert!(c.tick(0).restart_requested);
    }

    #[test]
    fn reset_gesture_in_tick() {
        let mut c = boot(MockBoard::with_credentials("home", "pw"));
        c.board_mut().reset_pressed = true;
        let mut fired = 0;
        for now in (0..1000).step_by(10) {
            if c.tick(now).reset_fired {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        assert_eq!(c.current_mode(), DeviceMode::Provisioning);
        assert_eq!(c.current_effect(), &EffectId::Waiting);
        assert!(c.board().store.is_empty());
    }

    #[test]
    fn reboot_after_provisioning_enters_monitoring() {
        let mut c = boot(MockBoard::new());
        c.submit_credentials("home", "pw");
        assert!(c.tick(0).restart_requested);
        let c = boot(c.into_board());
        assert_eq!(c.current_mode(), DeviceMode::Monitoring);
    }
}
