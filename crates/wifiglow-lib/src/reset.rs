//! Reset gesture — turns a sustained button hold into one reset request.

/// Default hold time before a reset fires.
pub const DEFAULT_RESET_HOLD_MS: u64 = 3000;

/// Emitted once per qualifying hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetRequested {
    /// How long the button had been held when the request fired.
    pub held_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldState {
    Idle,
    Holding { since: u64 },
    /// Already fired for this hold; waits for release.
    Fired,
}

/// Button hold detector.
///
/// `Idle → Holding` on press, `Holding → Idle` on an early release,
/// `Holding → Fired` once the hold strictly exceeds the threshold. `Fired`
/// only returns to `Idle` on release, so one hold yields one request however
/// long it lasts.
#[derive(Debug, Clone)]
pub struct ResetWatcher {
    threshold_ms: u64,
    state: HoldState,
}

impl ResetWatcher {
    pub fn new(threshold_ms: u64) -> Self {
        Self {
            threshold_ms,
            state: HoldState::Idle,
        }
    }

    pub fn threshold_ms(&self) -> u64 {
        self.threshold_ms
    }

    /// Whether the button is currently held (including after firing).
    pub fn is_holding(&self) -> bool {
        !matches!(self.state, HoldState::Idle)
    }

    /// Feed the current button level.
    pub fn poll(&mut self, pressed: bool, now: u64) -> Option<ResetRequested> {
        match (self.state, pressed) {
            (_, false) => {
                self.state = HoldState::Idle;
                None
            }
            (HoldState::Idle, true) => {
                self.state = HoldState::Holding { since: now };
                None
            }
            (HoldState::Holding { since }, true) => {
                let held_ms = now.saturating_sub(since);
                if held_ms > self.threshold_ms {
                    self.state = HoldState::Fired;
                    Some(ResetRequested { held_ms })
                } else {
                    None
                }
            }
            (HoldState::Fired, true) => None,
        }
    }
}

impl Default for ResetWatcher {
    fn default() -> Self {
        Self::new(DEFAULT_RESET_HOLD_MS)
    }
}
