//! Effect identifiers and the user-adjustable parameters they read.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smart_leds::RGB8;

use crate::controller::DeviceMode;

/// Every effect the strip can show.
///
/// `MonitoringPlaceholder`, `BreatheGreen` and `BlinkRed` are linked: the
/// placeholder means "not evaluated yet" and the connectivity monitor resolves
/// it into one of the other two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectId {
    Waiting,
    RainbowHsv,
    RainbowFill,
    Static,
    Snake,
    BreatheGreen,
    BlinkRed,
    MonitoringPlaceholder,
    /// A name that matched nothing in the catalog. Kept verbatim; the engine
    /// renders nothing for it.
    Unrecognized(String),
}

impl EffectId {
    /// Every known effect, in catalog order.
    pub const CATALOG: [EffectId; 8] = [
        EffectId::Waiting,
        EffectId::RainbowHsv,
        EffectId::RainbowFill,
        EffectId::Static,
        EffectId::Snake,
        EffectId::BreatheGreen,
        EffectId::BlinkRed,
        EffectId::MonitoringPlaceholder,
    ];

    /// Resolve an effect name as sent by a request handler. Never fails.
    pub fn from_name(name: &str) -> Self {
        let trimmed = name.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "waiting" => EffectId::Waiting,
            "rainbow" | "rainbow_hsv" => EffectId::RainbowHsv,
            "rainbow_fill" => EffectId::RainbowFill,
            "static" => EffectId::Static,
            "snake" => EffectId::Snake,
            "breathe_green" => EffectId::BreatheGreen,
            "blink_red" => EffectId::BlinkRed,
            "monitoring" => EffectId::MonitoringPlaceholder,
            _ => EffectId::Unrecognized(trimmed.to_string()),
        }
    }

    /// Canonical wire name.
    pub fn name(&self) -> &str {
        match self {
            EffectId::Waiting => "waiting",
            EffectId::RainbowHsv => "rainbow",
            EffectId::RainbowFill => "rainbow_fill",
            EffectId::Static => "static",
            EffectId::Snake => "snake",
            EffectId::BreatheGreen => "breathe_green",
            EffectId::BlinkRed => "blink_red",
            EffectId::MonitoringPlaceholder => "monitoring",
            EffectId::Unrecognized(name) => name,
        }
    }

    /// The only mode this effect may run in, or `None` if it is allowed in both.
    pub fn mode_scope(&self) -> Option<DeviceMode> {
        match self {
            EffectId::Waiting => Some(DeviceMode::Provisioning),
            EffectId::BreatheGreen | EffectId::BlinkRed | EffectId::MonitoringPlaceholder => {
                Some(DeviceMode::Monitoring)
            }
            _ => None,
        }
    }

    /// Whether this effect may be selected while the device is in `mode`.
    pub fn allowed_in(&self, mode: DeviceMode) -> bool {
        self.mode_scope().is_none_or(|scope| scope == mode)
    }

    /// Effects the connectivity monitor is allowed to replace.
    pub fn is_connectivity_driven(&self) -> bool {
        matches!(
            self,
            EffectId::MonitoringPlaceholder | EffectId::BreatheGreen | EffectId::BlinkRed
        )
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for EffectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for EffectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(EffectId::from_name(&name))
    }
}

/// Colors the effect-change handler can adjust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectParameters {
    pub static_color: RGB8,
    pub snake_color: RGB8,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            static_color: RGB8::new(0x00, 0xFF, 0x00),
            snake_color: RGB8::new(0xFF, 0x00, 0x00),
        }
    }
}
