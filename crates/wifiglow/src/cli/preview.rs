//! `preview` subcommand — render an effect offline.

use std::path::Path;

use smart_leds::RGB8;
use wifiglow_lib::color::{encode, parse_color};
use wifiglow_lib::config::MAX_LED_COUNT;
use wifiglow_lib::effects::{EffectEngine, EffectId, EffectParameters};

use super::{PreviewOutput, Result, WifiglowError, load_config};
use crate::host::ansi_frame;

pub(super) struct PreviewOptions {
    pub effect: String,
    pub frames: u32,
    pub leds: Option<usize>,
    pub static_color: Option<String>,
    pub snake_color: Option<String>,
}

/// Render `frames` frames, one frame interval apart.
fn render_frames(
    effect: &EffectId,
    frames: u32,
    led_count: usize,
    frame_interval_ms: u64,
    params: &EffectParameters,
) -> Vec<Vec<RGB8>> {
    let mut engine = EffectEngine::new(led_count, frame_interval_ms);
    (0..u64::from(frames))
        .filter_map(|i| {
            engine
                .advance_frame(effect, params, i * frame_interval_ms)
                .map(<[RGB8]>::to_vec)
        })
        .collect()
}

pub(super) fn cmd_preview(
    opts: PreviewOptions,
    json: bool,
    custom_config: Option<&Path>,
) -> Result<()> {
    let effect = EffectId::from_name(&opts.effect);
    if let EffectId::Unrecognized(name) = &effect {
        let known: Vec<String> = EffectId::CATALOG
            .iter()
            .map(|id| id.name().to_string())
            .collect();
        return Err(WifiglowError::Config(format!(
            "unknown effect \"{name}\" (known: {})",
            known.join(", ")
        )));
    }

    let config = load_config(custom_config);
    let led_count = opts.leds.unwrap_or(config.led_count);
    if led_count == 0 || led_count > MAX_LED_COUNT {
        return Err(WifiglowError::Config(format!(
            "--leds must be between 1 and {MAX_LED_COUNT}"
        )));
    }
    let mut params = config.controller_config().params;
    if let Some(c) = &opts.static_color {
        params.static_color = parse_color(c)?;
    }
    if let Some(c) = &opts.snake_color {
        params.snake_color = parse_color(c)?;
    }
    let interval = config.frame_interval_ms;

    let frames = render_frames(&effect, opts.frames, led_count, interval, &params);

    if json {
        let output = PreviewOutput {
            effect: effect.name().to_string(),
            led_count,
            frame_interval_ms: interval,
            frames: frames
                .iter()
                .map(|frame| frame.iter().copied().map(encode).collect())
                .collect(),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?
        );
        return Ok(());
    }

    println!("{effect}: {led_count} LEDs, {interval}ms per frame");
    for (i, frame) in frames.iter().enumerate() {
        println!("{:>4}ms  {}", i as u64 * interval, ansi_frame(frame));
    }
    Ok(())
}
