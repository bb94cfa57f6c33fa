//! Connectivity monitor — periodic reachability probe mapped onto effects.
//!
//! The probe is a single lightweight request that must come back with one
//! exact "no content" status. Results only steer the connectivity-driven
//! effects; a manually chosen effect is never replaced.

use std::time::Duration;

use serde::Serialize;

use crate::effects::EffectId;
use crate::hal::ReachabilityTransport;

/// Default reachability endpoint.
pub const DEFAULT_PROBE_URL: &str = "http://clients3.google.com/generate_204";
/// Status the endpoint answers with when the internet is reachable.
pub const DEFAULT_EXPECTED_STATUS: u16 = 204;
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3000;

/// Probe settings.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub url: String,
    pub expected_status: u16,
    pub interval_ms: u64,
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PROBE_URL.into(),
            expected_status: DEFAULT_EXPECTED_STATUS,
            interval_ms: DEFAULT_PROBE_INTERVAL_MS,
            timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
        }
    }
}

/// Last known reachability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectivityState {
    pub reachable: bool,
    /// Tick time of the most recent probe, if any has run.
    pub last_probe_ms: Option<u64>,
}

/// Periodic reachability prober.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    config: ProbeConfig,
    state: ConnectivityState,
}

impl ConnectivityMonitor {
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            state: ConnectivityState::default(),
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Whether a probe is due at `now`. The first probe is due immediately.
    pub fn is_due(&self, now: u64) -> bool {
        match self.state.last_probe_ms {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.config.interval_ms,
        }
    }

    /// Issue one reachability check. Any transport error or unexpected status
    /// counts as unreachable.
    pub fn probe(&self, transport: &mut impl ReachabilityTransport) -> bool {
        match transport.fetch_status(&self.config.url, self.config.timeout) {
            Ok(code) if code == self.config.expected_status => true,
            Ok(code) => {
                log::debug!(
                    "probe {} returned {code} (want {})",
                    self.config.url,
                    self.config.expected_status
                );
                false
            }
            Err(e) => {
                log::debug!("probe {} failed: {e}", self.config.url);
                false
            }
        }
    }

    /// Probe if the interval has elapsed and steer `effect` with the result.
    ///
    /// The interval is stamped with `now`, the tick time the probe started at,
    /// so a probe that blocks for its whole timeout shortens the gap to the
    /// next one.
    pub fn poll(
        &mut self,
        now: u64,
        transport: &mut impl ReachabilityTransport,
        effect: &mut EffectId,
    ) -> Option<bool> {
        if !self.is_due(now) {
            return None;
        }
        let reachable = self.probe(transport);
        if reachable != self.state.reachable || self.state.last_probe_ms.is_none() {
            log::info!(
                "internet {}",
                if reachable { "reachable" } else { "unreachable" }
            );
        }
        self.state = ConnectivityState {
            reachable,
            last_probe_ms: Some(now),
        };
        apply_result(effect, reachable);
        Some(reachable)
    }

    /// Forget the last result so the next poll probes immediately.
    pub fn reset(&mut self) {
        self.state = ConnectivityState::default();
    }
}

/// Map a probe result onto the current effect, leaving manual choices alone.
pub fn apply_result(effect: &mut EffectId, reachable: bool) {
    if effect.is_connectivity_driven() {
        *effect = if reachable {
            EffectId::BreatheGreen
        } else {
            EffectId::BlinkRed
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::MockBoard;

    fn monitor() -> ConnectivityMonitor {
        ConnectivityMonitor::new(ProbeConfig::default())
    }

    // ── probe ──

    #[test]
    fn probe_true_only_on_expected_status() {
        let m = monitor();
        let mut board = MockBoard::new();
        board.script_probes(&[204, 200, 302, 500]);
        assert!(m.probe(&mut board));
        assert!(!m.probe(&mut board));
        assert!(!m.probe(&mut board));
        assert!(!m.probe(&mut board));
    }

    #[test]
    fn probe_transport_error_is_unreachable() {
        let m = monitor();
        let mut board = MockBoard::new();
        board.fail_probes("connection refused");
        assert!(!m.probe(&mut board));
    }

    #[test]
    fn probe_passes_url_and_timeout() {
        let m = monitor();
        let mut board = MockBoard::new();
        m.probe(&mut board);
        assert_eq!(board.probes[0].0, DEFAULT_PROBE_URL);
        assert_eq!(board.probes[0].1, Duration::from_millis(3000));
    }

    // ── apply_result ──

    #[test]
    fn placeholder_resolves_both_ways() {
        let mut e = EffectId::MonitoringPlaceholder;
        apply_result(&mut e, true);
        assert_eq!(e, EffectId::BreatheGreen);

        let mut e = EffectId::MonitoringPlaceholder;
        apply_result(&mut e, false);
        assert_eq!(e, EffectId::BlinkRed);
    }

    #[test]
    fn connectivity_effects_follow_result() {
        let mut e = EffectId::BreatheGreen;
        apply_result(&mut e, false);
        assert_eq!(e, EffectId::BlinkRed);
        apply_result(&mut e, true);
        assert_eq!(e, EffectId::BreatheGreen);
    }

    #[test]
    fn manual_effects_never_overridden() {
        for manual in [
            EffectId::Static,
            EffectId::Snake,
            EffectId::RainbowHsv,
            EffectId::RainbowFill,
            EffectId::Unrecognized("sparkle".into()),
        ] {
            let mut e = manual.clone();
            apply_result(&mut e, false);
            assert_eq!(e, manual);
            apply_result(&mut e, true);
            assert_eq!(e, manual);
        }
    }

    // ── poll cadence ──

    #[test]
    fn first_poll_probes_immediately() {
        let mut m = monitor();
        let mut board = MockBoard::new();
        let mut e = EffectId::MonitoringPlaceholder;
        assert_eq!(m.poll(0, &mut board, &mut e), Some(true));
        assert_eq!(e, EffectId::BreatheGreen);
        assert_eq!(m.state().last_probe_ms, Some(0));
    }

    #[test]
    fn poll_respects_interval() {
        let mut m = monitor();
        let mut board = MockBoard::new();
        let mut e = EffectId::MonitoringPlaceholder;
        m.poll(1000, &mut board, &mut e);
        assert_eq!(m.poll(1010, &mut board, &mut e), None);
        assert_eq!(m.poll(5999, &mut board, &mut e), None);
        assert!(m.poll(6000, &mut board, &mut e).is_some());
        assert_eq!(board.probes.len(), 2);
    }

    #[test]
    fn poll_stamps_start_time_not_completion() {
        // A probe that blocks its whole timeout still counts from when the
        // tick began, so the next one is due 5000ms after that start.
        let mut m = monitor();
        let mut board = MockBoard::new();
        board.fail_probes("timed out");
        let mut e = EffectId::MonitoringPlaceholder;
        m.poll(0, &mut board, &mut e);
        assert!(m.is_due(5000));
        assert!(!m.is_due(4999));
    }

    #[test]
    fn static_survives_down_then_up() {
        let mut m = monitor();
        let mut board = MockBoard::new();
        board.script_probes(&[503, 204]);
        let mut e = EffectId::Static;
        assert_eq!(m.poll(0, &mut board, &mut e), Some(false));
        assert_eq!(e, EffectId::Static);
        assert_eq!(m.poll(5000, &mut board, &mut e), Some(true));
        assert_eq!(e, EffectId::Static);
        assert!(m.state().reachable);
    }

    #[test]
    fn reset_forgets_state() {
        let mut m = monitor();
        let mut board = MockBoard::new();
        let mut e = EffectId::MonitoringPlaceholder;
        m.poll(100, &mut board, &mut e);
        m.reset();
        assert_eq!(m.state(), ConnectivityState::default());
        assert!(m.is_due(101));
    }
}
