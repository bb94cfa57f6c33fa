//! Frame engine — owns every effect's animation cursor and renders one frame
//! per frame interval.
//!
//! The host tick may run much faster than the frame rate; calls that arrive
//! before the interval has elapsed are coalesced and leave the buffer alone.

use smart_leds::RGB8;
use smart_leds::hsv::{Hsv, hsv2rgb};

use super::catalog::{EffectId, EffectParameters};

/// One color per pixel, fully overwritten by every rendered frame.
pub type FrameBuffer = Vec<RGB8>;

/// Default frame cadence (≈20 Hz).
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 50;

/// Half-period of the red blink, independent of the frame cadence.
pub const BLINK_PERIOD_MS: u64 = 250;

/// Hue phase wraps at 255, not 256.
const HUE_MODULUS: usize = 255;

const WAITING_HUE_SPACING: usize = 20;
const WAITING_PHASE_OFFSET: u8 = 10;
const WAITING_WAVE_STEP: u8 = 4;
const WAITING_MIN_BRIGHTNESS: u8 = 100;

const RAINBOW_HUE_STEP: usize = 2;
const RAINBOW_FILL_DELTA: usize = 7;

/// Amount removed from every snake pixel per frame, out of 256.
const SNAKE_FADE: u8 = 64;

const BREATHE_MIN: i16 = 50;
const BREATHE_MAX: i16 = 255;
const BREATHE_STEP: i16 = 3;
/// Congruent to 1 mod 3 so the bounce overshoots by at most 2 at either end.
const BREATHE_START: i16 = 100;
const GREEN_HUE: u8 = 85;

const BLINK_COLOR: RGB8 = RGB8 { r: 0xFF, g: 0, b: 0 };
const BLACK: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

/// Per-effect animation state plus the frame buffer it renders into.
#[derive(Debug, Clone)]
pub struct EffectEngine {
    frame: FrameBuffer,
    frame_interval_ms: u64,
    last_frame_at: Option<u64>,
    hue: u8,
    wave: u8,
    snake_pos: usize,
    snake_dir: i8,
    breathe_level: i16,
    breathe_dir: i16,
    blink_on: bool,
    blink_toggled_at: Option<u64>,
}

impl EffectEngine {
    /// Create an engine for a strip of `led_count` pixels.
    pub fn new(led_count: usize, frame_interval_ms: u64) -> Self {
        Self {
            frame: vec![BLACK; led_count],
            frame_interval_ms,
            last_frame_at: None,
            hue: 0,
            wave: 0,
            snake_pos: 0,
            snake_dir: 1,
            breathe_level: BREATHE_START,
            breathe_dir: 1,
            blink_on: false,
            blink_toggled_at: None,
        }
    }

    /// Render the next frame of `effect` if the frame interval has elapsed.
    ///
    /// Returns the new frame, or `None` when the call was coalesced; in that
    /// case [`frame`](Self::frame) still holds the previous buffer unchanged.
    /// The first call always renders.
    pub fn advance_frame(
        &mut self,
        effect: &EffectId,
        params: &EffectParameters,
        now: u64,
    ) -> Option<&[RGB8]> {
        if let Some(last) = self.last_frame_at
            && now.saturating_sub(last) < self.frame_interval_ms
        {
            return None;
        }
        self.last_frame_at = Some(now);
        self.render(effect, params, now);
        Some(&self.frame)
    }

    /// The most recently rendered frame.
    pub fn frame(&self) -> &[RGB8] {
        &self.frame
    }

    pub fn led_count(&self) -> usize {
        self.frame.len()
    }

    /// Current hue phase shared by the rainbow and waiting effects.
    pub fn hue_phase(&self) -> u8 {
        self.hue
    }

    /// Snake cursor position and direction (`1` or `-1`).
    pub fn snake_cursor(&self) -> (usize, i8) {
        (self.snake_pos, self.snake_dir)
    }

    /// Unclamped breathe level; may sit up to 2 past either bound.
    pub fn breathe_level(&self) -> i16 {
        self.breathe_level
    }

    /// Whether the blink is currently in its lit half.
    pub fn blink_on(&self) -> bool {
        self.blink_on
    }

    fn render(&mut self, effect: &EffectId, params: &EffectParameters, now: u64) {
        match effect {
            EffectId::Waiting => self.render_waiting(),
            EffectId::RainbowHsv => self.render_rainbow(),
            EffectId::RainbowFill => self.render_rainbow_fill(),
            EffectId::Static => self.frame.fill(params.static_color),
            EffectId::Snake => self.render_snake(params.snake_color),
            EffectId::BreatheGreen => self.render_breathe(),
            EffectId::BlinkRed => self.render_blink(now),
            EffectId::MonitoringPlaceholder => self.frame.fill(BLACK),
            EffectId::Unrecognized(name) => {
                log::trace!("no renderer for effect {name:?}, frame left unchanged");
            }
        }
    }

    fn render_waiting(&mut self) {
        let span = u16::from(255 - WAITING_MIN_BRIGHTNESS);
        for (i, px) in self.frame.iter_mut().enumerate() {
            let hue = wrap_hue(self.hue as usize + WAITING_HUE_SPACING * i);
            let phase = self
                .wave
                .wrapping_add((i as u8).wrapping_mul(WAITING_PHASE_OFFSET));
            let swing = (u16::from(sin8(phase)) * span / 255) as u8;
            *px = hsv2rgb(Hsv {
                hue,
                sat: 255,
                val: WAITING_MIN_BRIGHTNESS + swing,
            });
        }
        self.hue = wrap_hue(self.hue as usize + 1);
        self.wave = self.wave.wrapping_add(WAITING_WAVE_STEP);
    }

    fn render_rainbow(&mut self) {
        let n = self.frame.len();
        for (i, px) in self.frame.iter_mut().enumerate() {
            let hue = wrap_hue(self.hue as usize + i * 255 / n);
            *px = hsv2rgb(Hsv {
                hue,
                sat: 255,
                val: 255,
            });
        }
        self.hue = wrap_hue(self.hue as usize + RAINBOW_HUE_STEP);
    }

    fn render_rainbow_fill(&mut self) {
        for (i, px) in self.frame.iter_mut().enumerate() {
            let hue = wrap_hue(self.hue as usize + RAINBOW_FILL_DELTA * i);
            *px = hsv2rgb(Hsv {
                hue,
                sat: 255,
                val: 255,
            });
        }
        self.hue = wrap_hue(self.hue as usize + RAINBOW_HUE_STEP);
    }

    fn render_snake(&mut self, color: RGB8) {
        let keep = 255 - SNAKE_FADE;
        for px in self.frame.iter_mut() {
            *px = RGB8::new(scale8(px.r, keep), scale8(px.g, keep), scale8(px.b, keep));
        }
        let Some(last) = self.frame.len().checked_sub(1) else {
            return;
        };
        self.frame[self.snake_pos.min(last)] = color;

        let last = last as i64;
        let next = (self.snake_pos as i64 + i64::from(self.snake_dir)).clamp(0, last);
        self.snake_pos = next as usize;
        if next <= 0 || next >= last {
            self.snake_dir = -self.snake_dir;
        }
    }

    fn render_breathe(&mut self) {
        self.breathe_level += BREATHE_STEP * self.breathe_dir;
        if self.breathe_level > BREATHE_MAX || self.breathe_level < BREATHE_MIN {
            self.breathe_dir = -self.breathe_dir;
        }
        let val = self.breathe_level.clamp(0, 255) as u8;
        self.frame.fill(hsv2rgb(Hsv {
            hue: GREEN_HUE,
            sat: 255,
            val,
        }));
    }

    fn render_blink(&mut self, now: u64) {
        match self.blink_toggled_at {
            None => {
                self.blink_on = true;
                self.blink_toggled_at = Some(now);
            }
            Some(at) if now.saturating_sub(at) >= BLINK_PERIOD_MS => {
                self.blink_on = !self.blink_on;
                self.blink_toggled_at = Some(now);
            }
            Some(_) => {}
        }
        let color = if self.blink_on { BLINK_COLOR } else { BLACK };
        self.frame.fill(color);
    }
}

fn wrap_hue(h: usize) -> u8 {
    (h % HUE_MODULUS) as u8
}

/// `i * scale / 256`.
fn scale8(i: u8, scale: u8) -> u8 {
    ((u16::from(i) * u16::from(scale)) >> 8) as u8
}

/// Sine wave over one byte of phase, mapped onto `0..=255`.
fn sin8(phase: u8) -> u8 {
    let angle = f32::from(phase) / 256.0 * std::f32::consts::TAU;
    ((angle.sin() + 1.0) * 127.5).round() as u8
}
