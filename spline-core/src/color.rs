//! Colour model for shape layers
//!
//! A [`Color`] wraps a packed ARGB integer and keeps two derived views of it
//! live: hue/saturation/value and the individual red/green/blue/alpha
//! channels. Editing through either view recomputes the packed colour and the
//! sibling fields.
//!
//! The HSV fields are allowed to hold values that the RGB channels cannot
//! express (a hue on a black colour, say). Channels are only refreshed from the
//! packed colour when the HSV computed from the *stored* channels disagrees
//! with the stored HSV, which keeps interactive HSV edits from oscillating
//! against the RGB representation.

use serde::{Deserialize, Serialize};

/// Colour given to freshly created shapes (a pale blue)
pub const DEFAULT_SHAPE_COLOR: u32 = 0xFFC6_DAFC;

/// Largest hue accepted by [`Color::set_hue`]
pub const MAX_HUE: f32 = 359.9;

/// Pack four channels into an ARGB integer
pub fn argb(alpha: u8, red: u8, green: u8, blue: u8) -> u32 {
    (u32::from(alpha) << 24) | (u32::from(red) << 16) | (u32::from(green) << 8) | u32::from(blue)
}

fn alpha_of(color: u32) -> u8 {
    (color >> 24) as u8
}

fn red_of(color: u32) -> u8 {
    (color >> 16) as u8
}

fn green_of(color: u32) -> u8 {
    (color >> 8) as u8
}

fn blue_of(color: u32) -> u8 {
    color as u8
}

/// Convert the RGB part of a packed colour to `[hue, saturation, value]`
///
/// Hue is in degrees `[0, 360)`, saturation and value in `[0, 1]`. Greys
/// report a hue and saturation of zero.
pub fn rgb_to_hsv(color: u32) -> [f32; 3] {
    let r = i32::from(red_of(color));
    let g = i32::from(green_of(color));
    let b = i32::from(blue_of(color));

    let min = r.min(g.min(b));
    let max = r.max(g.max(b));
    let delta = max - min;
    let v = max as f32 / 255.0;

    if delta == 0 {
        return [0.0, 0.0, v];
    }

    let s = delta as f32 / max as f32;
    let mut h = if r == max {
        (g - b) as f32 / delta as f32
    } else if g == max {
        2.0 + (b - r) as f32 / delta as f32
    } else {
        4.0 + (r - g) as f32 / delta as f32
    };

    h *= 60.0;
    if h < 0.0 {
        h += 360.0;
    }

    [h, s, v]
}

/// Convert `[hue, saturation, value]` plus an alpha channel to a packed colour
///
/// Saturation and value are clamped to `[0, 1]`; hues outside `[0, 360)` are
/// treated as zero.
pub fn hsv_to_rgb(alpha: u8, hsv: [f32; 3]) -> u32 {
    let s = hsv[1].clamp(0.0, 1.0);
    let v = hsv[2].clamp(0.0, 1.0);
    let v_byte = round_to_byte(v * 255.0);

    if s.abs() <= 1.0 / 4096.0 {
        return argb(alpha, v_byte, v_byte, v_byte);
    }

    let hx = if hsv[0] < 0.0 || hsv[0] >= 360.0 {
        0.0
    } else {
        hsv[0] / 60.0
    };
    let w = hx.floor();
    let f = hx - w;

    let p = round_to_byte((1.0 - s) * v * 255.0);
    let q = round_to_byte((1.0 - s * f) * v * 255.0);
    let t = round_to_byte((1.0 - s * (1.0 - f)) * v * 255.0);

    let (r, g, b) = match w as u32 {
        0 => (v_byte, t, p),
        1 => (q, v_byte, p),
        2 => (p, v_byte, t),
        3 => (p, q, v_byte),
        4 => (t, p, v_byte),
        _ => (v_byte, p, q),
    };

    argb(alpha, r, g, b)
}

fn round_to_byte(x: f32) -> u8 {
    (x + 0.5).floor().clamp(0.0, 255.0) as u8
}

/// RGBA colour with live HSV decomposition
///
/// Stored colours may omit any field. Missing channels and HSV components are
/// derived from the packed `color`, and a missing `color` falls back to
/// [`DEFAULT_SHAPE_COLOR`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredColor")]
pub struct Color {
    /// Packed ARGB value, the colour a renderer should use
    color: u32,

    hue: f32,
    saturation: f32,
    value: f32,

    red: u8,
    green: u8,
    blue: u8,
    alpha: u8,
}

#[derive(Deserialize)]
struct StoredColor {
    color: Option<u32>,
    hue: Option<f32>,
    saturation: Option<f32>,
    value: Option<f32>,
    red: Option<u8>,
    green: Option<u8>,
    blue: Option<u8>,
    alpha: Option<u8>,
}

impl From<StoredColor> for Color {
    fn from(stored: StoredColor) -> Self {
        let base = Color::new(stored.color.unwrap_or(DEFAULT_SHAPE_COLOR));
        Self {
            color: base.color,
            hue: stored.hue.unwrap_or(base.hue),
            saturation: stored.saturation.unwrap_or(base.saturation),
            value: stored.value.unwrap_or(base.value),
            red: stored.red.unwrap_or(base.red),
            green: stored.green.unwrap_or(base.green),
            blue: stored.blue.unwrap_or(base.blue),
            alpha: stored.alpha.unwrap_or(base.alpha),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new(DEFAULT_SHAPE_COLOR)
    }
}

impl Color {
    /// Create a colour from a packed ARGB value
    pub fn new(color: u32) -> Self {
        let mut c = Self {
            color,
            hue: 0.0,
            saturation: 0.0,
            value: 0.0,
            red: red_of(color),
            green: green_of(color),
            blue: blue_of(color),
            alpha: alpha_of(color),
        };
        c.update_values(true);
        c
    }

    /// Recompute the derived fields after `self.color` changed
    ///
    /// When `update_hsv` is false the stored HSV is kept as-is (the caller is
    /// editing HSV directly). The channel fields are refreshed only if the HSV
    /// of the stored channels no longer matches the stored HSV.
    fn update_values(&mut self, update_hsv: bool) {
        if update_hsv {
            let [h, s, v] = rgb_to_hsv(self.color);
            self.hue = h;
            self.saturation = s;
            self.value = v;
        }

        let old_rgb = argb(self.alpha, self.red, self.green, self.blue);
        let [oh, os, ov] = rgb_to_hsv(old_rgb);

        if self.hue != oh || self.saturation != os || self.value != ov {
            self.red = red_of(self.color);
            self.green = green_of(self.color);
            self.blue = blue_of(self.color);
            self.alpha = alpha_of(self.color);
        }
    }

    /// Packed ARGB value
    pub fn color(&self) -> u32 {
        self.color
    }

    pub fn set_color(&mut self, color: u32) {
        self.color = color;
        self.update_values(true);
    }

    pub fn hue(&self) -> f32 {
        self.hue
    }

    pub fn set_hue(&mut self, hue: f32) {
        self.color = hsv_to_rgb(self.alpha, [hue, self.saturation, self.value]);
        self.update_values(false);
        self.hue = hue.clamp(0.0, MAX_HUE);
    }

    pub fn saturation(&self) -> f32 {
        self.saturation
    }

    pub fn set_saturation(&mut self, saturation: f32) {
        self.color = hsv_to_rgb(self.alpha, [self.hue, saturation, self.value]);
        self.update_values(false);
        self.saturation = saturation.clamp(0.0, 1.0);
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn set_value(&mut self, value: f32) {
        self.color = hsv_to_rgb(self.alpha, [self.hue, self.saturation, value]);
        self.update_values(false);
        self.value = value.clamp(0.0, 1.0);
    }

    pub fn red(&self) -> u8 {
        self.red
    }

    pub fn set_red(&mut self, red: u8) {
        self.color = argb(self.alpha, red, self.green, self.blue);
        self.update_values(true);
    }

    pub fn green(&self) -> u8 {
        self.green
    }

    pub fn set_green(&mut self, green: u8) {
        self.color = argb(self.alpha, self.red, green, self.blue);
        self.update_values(true);
    }

    pub fn blue(&self) -> u8 {
        self.blue
    }

    pub fn set_blue(&mut self, blue: u8) {
        self.color = argb(self.alpha, self.red, self.green, blue);
        self.update_values(true);
    }

    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: u8) {
        self.color = argb(alpha, self.red, self.green, self.blue);
        self.update_values(true);
        // Alpha never takes part in the HSV comparison above
        self.alpha = alpha;
    }

    /// `#rrggbb`, lowercase, alpha omitted
    pub fn hex_string(&self) -> String {
        format!("#{:06x}", self.color & 0x00FF_FFFF)
    }

    /// Apply a `#rrggbb` string. Returns false (and changes nothing) for any
    /// other input or when the string already matches.
    pub fn set_hex_string(&mut self, hex: &str) -> bool {
        if hex == self.hex_string() || hex.len() != 7 {
            return false;
        }
        let Some(digits) = hex.strip_prefix('#') else {
            log::debug!("ignoring colour string without '#': {hex:?}");
            return false;
        };
        match u32::from_str_radix(digits, 16) {
            Ok(rgb) => {
                self.set_color(0xFF00_0000 | rgb);
                true
            }
            Err(e) => {
                log::debug!("ignoring colour string {hex:?}: {e}");
                false
            }
        }
    }

    pub fn red_string(&self) -> String {
        self.red.to_string()
    }

    pub fn set_red_string(&mut self, s: &str) -> bool {
        match parse_channel(s) {
            Some(r) if r != self.red => {
                self.set_red(r);
                true
            }
            _ => false,
        }
    }

    pub fn green_string(&self) -> String {
        self.green.to_string()
    }

    pub fn set_green_string(&mut self, s: &str) -> bool {
        match parse_channel(s) {
            Some(g) if g != self.green => {
                self.set_green(g);
                true
            }
            _ => false,
        }
    }

    pub fn blue_string(&self) -> String {
        self.blue.to_string()
    }

    pub fn set_blue_string(&mut self, s: &str) -> bool {
        match parse_channel(s) {
            Some(b) if b != self.blue => {
                self.set_blue(b);
                true
            }
            _ => false,
        }
    }
}

fn parse_channel(s: &str) -> Option<u8> {
    match s.trim().parse::<u8>() {
        Ok(v) => Some(v),
        Err(e) => {
            log::debug!("ignoring channel string {s:?}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_color() {
        let c = Color::default();
        assert_eq!(c.color(), DEFAULT_SHAPE_COLOR);
        assert_eq!(c.red(), 0xC6);
        assert_eq!(c.green(), 0xDA);
        assert_eq!(c.blue(), 0xFC);
        assert_eq!(c.alpha(), 0xFF);
        assert_eq!(c.hex_string(), "#c6dafc");
    }

    #[test]
    fn test_hsv_of_primaries() {
        assert_eq!(rgb_to_hsv(0xFFFF_0000), [0.0, 1.0, 1.0]);
        assert_eq!(rgb_to_hsv(0xFF00_FF00), [120.0, 1.0, 1.0]);
        assert_eq!(rgb_to_hsv(0xFF00_00FF), [240.0, 1.0, 1.0]);
        assert_eq!(rgb_to_hsv(0xFF80_8080)[1], 0.0);
    }

    #[test]
    fn test_hsv_to_rgb_primaries() {
        assert_eq!(hsv_to_rgb(255, [0.0, 1.0, 1.0]), 0xFFFF_0000);
        assert_eq!(hsv_to_rgb(255, [120.0, 1.0, 1.0]), 0xFF00_FF00);
        assert_eq!(hsv_to_rgb(255, [240.0, 1.0, 1.0]), 0xFF00_00FF);
        assert_eq!(hsv_to_rgb(255, [42.0, 0.0, 1.0]), 0xFFFF_FFFF);
    }

    #[test]
    fn test_set_hue_updates_rgb() {
        let mut c = Color::new(0xFFFF_0000);
        c.set_hue(120.0);
        assert_eq!(c.color(), 0xFF00_FF00);
        assert_eq!(c.hue(), 120.0);

        // Channels catch up once the stored HSV diverges from them
        c.set_saturation(1.0);
        assert_eq!(c.color(), 0xFF00_FF00);
        assert_eq!(c.red(), 0);
        assert_eq!(c.green(), 255);
    }

    #[test]
    fn test_hue_is_clamped() {
        let mut c = Color::new(0xFFFF_0000);
        c.set_hue(400.0);
        assert_eq!(c.hue(), MAX_HUE);
        c.set_hue(-5.0);
        assert_eq!(c.hue(), 0.0);
    }

    #[test]
    fn test_saturation_and_value_are_clamped() {
        let mut c = Color::new(0xFF33_6699);
        c.set_saturation(2.0);
        assert_eq!(c.saturation(), 1.0);
        c.set_value(-1.0);
        assert_eq!(c.value(), 0.0);
    }

    #[test]
    fn test_hue_survives_black() {
        let mut c = Color::new(0xFF00_FF00);
        c.set_value(0.0);
        assert_eq!(c.color(), 0xFF00_0000);
        assert_eq!(c.hue(), 120.0);
        assert_eq!(c.saturation(), 1.0);

        c.set_value(1.0);
        assert_eq!(c.color(), 0xFF00_FF00);
        assert_eq!(c.green(), 255);
    }

    #[test]
    fn test_set_red_recomputes_hsv() {
        let mut c = Color::new(0xFF00_0000);
        c.set_red(255);
        assert_eq!(c.color(), 0xFFFF_0000);
        assert_eq!(c.hue(), 0.0);
        assert_eq!(c.saturation(), 1.0);
        assert_eq!(c.value(), 1.0);
    }

    #[test]
    fn test_set_alpha() {
        let mut c = Color::new(0xFF12_3456);
        c.set_alpha(0x80);
        assert_eq!(c.alpha(), 0x80);
        assert_eq!(c.color(), 0x8012_3456);
    }

    #[test]
    fn test_hex_string_input() {
        let mut c = Color::new(0xFF00_0000);
        assert!(c.set_hex_string("#ff8000"));
        assert_eq!(c.color(), 0xFFFF_8000);

        // Rejected edits keep the previous value
        assert!(!c.set_hex_string("#ff80"));
        assert!(!c.set_hex_string("#zzzzzz"));
        assert!(!c.set_hex_string("1234567"));
        assert!(!c.set_hex_string("#ff8000"));
        assert_eq!(c.color(), 0xFFFF_8000);
    }

    #[test]
    fn test_channel_string_input() {
        let mut c = Color::new(0xFF00_0000);
        assert!(c.set_green_string("128"));
        assert_eq!(c.green(), 128);
        assert_eq!(c.green_string(), "128");

        assert!(!c.set_green_string("abc"));
        assert!(!c.set_green_string("300"));
        assert!(!c.set_green_string("128"));
        assert_eq!(c.color(), 0xFF00_8000);
    }

    #[test]
    fn test_partial_stored_color_fills_from_packed() {
        let c: Color = serde_json::from_str(r#"{"color": 4294901760, "hue": 10.0}"#).unwrap();
        assert_eq!(c.color(), 0xFFFF_0000);
        assert_eq!(c.hue(), 10.0);
        assert_eq!(c.saturation(), 1.0);
        assert_eq!((c.red(), c.green(), c.blue(), c.alpha()), (255, 0, 0, 255));

        let empty: Color = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, Color::default());
    }
}
