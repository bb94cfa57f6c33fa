//! Color tokens — tolerant `#RRGGBB` decoding for request parameters, plus a
//! strict parser for configuration values.

use smart_leds::RGB8;

/// Ceiling applied while accumulating hex digits, matching a 32-bit `strtol`.
const HEX_ACCUMULATOR_MAX: u32 = 0x7FFF_FFFF;

/// Decode a `#RRGGBB` token into an RGB triplet. Never fails.
///
/// A leading `#` is optional. Scanning stops at the first non-hex character and
/// whatever digits were read become the value, so `"#12ZZZZ"` decodes as
/// `0x000012` and an empty token decodes as black.
pub fn decode(token: &str) -> RGB8 {
    let token = token.trim_start();
    let digits = token.strip_prefix('#').unwrap_or(token);

    let mut value: u32 = 0;
    for c in digits.chars() {
        let Some(d) = c.to_digit(16) else {
            break;
        };
        value = value
            .saturating_mul(16)
            .saturating_add(d)
            .min(HEX_ACCUMULATOR_MAX);
    }

    RGB8::new(
        ((value >> 16) & 0xFF) as u8,
        ((value >> 8) & 0xFF) as u8,
        (value & 0xFF) as u8,
    )
}

/// Encode an RGB triplet as an uppercase `#RRGGBB` token.
pub fn encode(color: RGB8) -> String {
    format!("#{:02X}{:02X}{:02X}", color.r, color.g, color.b)
}

/// Strictly parse a color from configuration.
///
/// Accepts:
/// - Hex: `"#FF0000"`, `"FF0000"`, `"#ff0000"`
/// - Named: `"red"`, `"green"`, `"blue"`, `"white"`, `"orange"`, `"yellow"`, `"purple"`, `"cyan"`, `"off"`
pub fn parse_color(s: &str) -> crate::error::Result<RGB8> {
    let s = s.trim();

    match s.to_lowercase().as_str() {
        "red" => return Ok(RGB8::new(0xFF, 0x00, 0x00)),
        "green" => return Ok(RGB8::new(0x00, 0xFF, 0x00)),
        "blue" => return Ok(RGB8::new(0x00, 0x00, 0xFF)),
        "white" => return Ok(RGB8::new(0xFF, 0xFF, 0xFF)),
        "orange" => return Ok(RGB8::new(0xFF, 0x80, 0x00)),
        "yellow" => return Ok(RGB8::new(0xFF, 0xFF, 0x00)),
        "purple" => return Ok(RGB8::new(0x80, 0x00, 0xFF)),
        "cyan" => return Ok(RGB8::new(0x00, 0xFF, 0xFF)),
        "off" | "black" => return Ok(RGB8::new(0x00, 0x00, 0x00)),
        _ => {}
    }

    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(crate::WifiglowError::Color(format!(
            "Invalid color: {s} (use #RRGGBB or a color name)"
        )));
    }
    Ok(decode(hex))
}
