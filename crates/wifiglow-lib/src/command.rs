//! Request-handler surface — queued commands in, status snapshots out.
//!
//! Handlers never touch controller state. They push [`Command`]s through a
//! [`ControllerHandle`]; the controller drains the queue at the start of each
//! tick and publishes a fresh [`StatusSnapshot`] at the end of it, so every
//! mutation happens on the tick and every read sees a completed tick.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::connectivity::ConnectivityState;
use crate::controller::DeviceMode;
use crate::effects::EffectId;

/// An effect change as submitted by the effect page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectRequest {
    pub effect: EffectId,
    /// `#RRGGBB` token for the static effect, decoded tolerantly.
    pub static_color: Option<String>,
    /// `#RRGGBB` token for the snake effect, decoded tolerantly.
    pub snake_color: Option<String>,
}

impl EffectRequest {
    pub fn new(effect: EffectId) -> Self {
        Self {
            effect,
            static_color: None,
            snake_color: None,
        }
    }

    pub fn with_static_color(mut self, token: impl Into<String>) -> Self {
        self.static_color = Some(token.into());
        self
    }

    pub fn with_snake_color(mut self, token: impl Into<String>) -> Self {
        self.snake_color = Some(token.into());
        self
    }
}

/// A mutation queued by a request handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetEffect(EffectRequest),
    SetMode(DeviceMode),
    RequestReset,
    /// Credentials entered on the captive portal.
    SubmitCredentials { ssid: String, password: String },
}

/// Read-only view of the controller as of the last completed tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub mode: DeviceMode,
    pub effect: EffectId,
    pub connectivity: ConnectivityState,
}

/// Cloneable handle given to request handlers.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: Sender<Command>,
    status: Arc<Mutex<StatusSnapshot>>,
}

impl ControllerHandle {
    pub(crate) fn new(tx: Sender<Command>, status: Arc<Mutex<StatusSnapshot>>) -> Self {
        Self { tx, status }
    }

    /// Queue a command for the next tick. Returns `false` if the controller
    /// has been dropped.
    pub fn send(&self, command: Command) -> bool {
        match self.tx.send(command) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("controller gone, dropping command: {:?}", e.0);
                false
            }
        }
    }

    pub fn set_effect(&self, request: EffectRequest) -> bool {
        self.send(Command::SetEffect(request))
    }

    pub fn set_mode(&self, mode: DeviceMode) -> bool {
        self.send(Command::SetMode(mode))
    }

    pub fn request_reset(&self) -> bool {
        self.send(Command::RequestReset)
    }

    pub fn submit_credentials(&self, ssid: &str, password: &str) -> bool {
        self.send(Command::SubmitCredentials {
            ssid: ssid.into(),
            password: password.into(),
        })
    }

    /// Status as of the last completed tick.
    pub fn status_snapshot(&self) -> StatusSnapshot {
        self.status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
