//! LED effects — the fixed effect catalog and the per-frame engine.

mod catalog;
mod engine;

pub use catalog::{EffectId, EffectParameters};
pub use engine::{BLINK_PERIOD_MS, DEFAULT_FRAME_INTERVAL_MS, EffectEngine, FrameBuffer};
