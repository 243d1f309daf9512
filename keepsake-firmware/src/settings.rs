//! Board-owned values for the adjustable camera settings.
//!
//! The application loops only ever say "nudge this setting by ±1"; the
//! ranges, wraparound, and display text all live here. Driver modules
//! translate the indices into hardware terms ([`crate::sensor`] for
//! resolution and effect, [`crate::leds`] for the ring light).

use core::fmt::Write;

use heapless::String;
use keepsake::mode::CaptureMode;
use keepsake::settings::Setting;

/// Still/clip resolution choices, as shown in the status bar.
///
/// [`crate::sensor`] maps each index onto a sensor resolution code and
/// length-asserts against this table.
pub const RESOLUTION_LABELS: [&str; 4] = ["320x240", "640x480", "800x600", "1280x720"];

/// Sensor color-effect choices (white-balance presets).
pub const EFFECT_LABELS: [&str; 5] = ["auto", "sunny", "cloudy", "office", "home"];

/// Ring-light brightness steps as 8-bit PWM duty.
pub const LED_LEVELS: [u8; 5] = [0, 25, 51, 128, 255];

/// Ring-light color presets: name and RGB weights.
pub const LED_COLORS: [(&str, [u8; 3]); 7] = [
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("cyan", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("yellow", [255, 255, 0]),
];

/// Seconds between automatic time-lapse captures.
pub const LAPSE_RATES: [u64; 10] = [5, 10, 20, 30, 60, 90, 120, 300, 600, 1800];

/// Display text for one setting value, sized for the overlay tag field.
pub type ValueTag = String<16>;

/// Current value of every adjustable setting.
///
/// Indices wrap on adjustment, mirroring the mode carousel. Defaults:
/// JPEG mode, 640x480, neutral effect, ring light off, 30 s rate.
pub struct BoardSettings {
    mode: CaptureMode,
    resolution: usize,
    effect: usize,
    led_level: usize,
    led_color: usize,
    lapse_rate: usize,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardSettings {
    pub fn new() -> Self {
        Self {
            mode: CaptureMode::Jpeg,
            resolution: 1,
            effect: 0,
            led_level: 0,
            led_color: 0,
            lapse_rate: 3,
        }
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn resolution_index(&self) -> usize {
        self.resolution
    }

    pub fn effect_index(&self) -> usize {
        self.effect
    }

    pub fn led_level_index(&self) -> usize {
        self.led_level
    }

    pub fn led_color_index(&self) -> usize {
        self.led_color
    }

    pub fn lapse_interval_secs(&self) -> u64 {
        LAPSE_RATES[self.lapse_rate]
    }

    /// Nudge `setting` by `delta` steps, wrapping at the table edges.
    pub fn adjust(&mut self, setting: Setting, delta: i32) {
        match setting {
            Setting::Mode => self.mode = self.mode.cycle(delta),
            Setting::Resolution => {
                self.resolution = wrap(self.resolution, delta, RESOLUTION_LABELS.len())
            }
            Setting::Effect => self.effect = wrap(self.effect, delta, EFFECT_LABELS.len()),
            Setting::LedLevel => self.led_level = wrap(self.led_level, delta, LED_LEVELS.len()),
            Setting::LedColor => self.led_color = wrap(self.led_color, delta, LED_COLORS.len()),
            Setting::TimelapseRate => {
                self.lapse_rate = wrap(self.lapse_rate, delta, LAPSE_RATES.len())
            }
        }
    }

    /// Current display text for `setting`, e.g. `"640x480"` or `"LED 3"`.
    pub fn value_tag(&self, setting: Setting) -> ValueTag {
        let mut tag = ValueTag::new();
        let _ = match setting {
            Setting::Mode => tag.push_str(self.mode.label()),
            Setting::Resolution => tag.push_str(RESOLUTION_LABELS[self.resolution]),
            Setting::Effect => tag.push_str(EFFECT_LABELS[self.effect]),
            Setting::LedLevel => write!(tag, "LED {}", self.led_level).map_err(|_| ()),
            Setting::LedColor => tag.push_str(LED_COLORS[self.led_color].0),
            Setting::TimelapseRate => {
                write!(tag, "{}s", LAPSE_RATES[self.lapse_rate]).map_err(|_| ())
            }
        };
        tag
    }
}

fn wrap(index: usize, delta: i32, len: usize) -> usize {
    (index as i32 + delta).rem_euclid(len as i32) as usize
}
