//! PWM ring light around the lens, driven by the led level / led color
//! settings.

use embassy_rp::pwm::{Config, Pwm};
use fixed::traits::ToFixed;

use crate::settings::{LED_COLORS, LED_LEVELS};

/// 8-bit duty resolution; ~98 kHz PWM at the divided clock, well above
/// flicker.
const LED_TOP: u16 = 255;
const LED_DIVIDER: u16 = 6;

/// RGB ring light: red and green share one PWM slice, blue sits on the
/// channel-A pin of the next.
pub struct RingLight {
    rg: Pwm<'static>,
    b: Pwm<'static>,
    rg_config: Config,
    b_config: Config,
}

impl RingLight {
    /// Takes over both slices and starts dark.
    pub fn new(rg: Pwm<'static>, b: Pwm<'static>) -> Self {
        let mut rg_config = Config::default();
        rg_config.divider = LED_DIVIDER.to_fixed();
        rg_config.top = LED_TOP;
        rg_config.compare_a = 0;
        rg_config.compare_b = 0;
        let b_config = rg_config.clone();
        let mut light = Self {
            rg,
            b,
            rg_config,
            b_config,
        };
        light.flush();
        light
    }

    /// Apply a brightness step and color preset from the settings tables.
    pub fn apply(&mut self, level_index: usize, color_index: usize) {
        let level = LED_LEVELS[level_index] as u16;
        let [r, g, b] = LED_COLORS[color_index].1;
        self.rg_config.compare_a = scale(r, level);
        self.rg_config.compare_b = scale(g, level);
        self.b_config.compare_a = scale(b, level);
        self.flush();
    }

    fn flush(&mut self) {
        self.rg.set_config(&self.rg_config);
        self.b.set_config(&self.b_config);
    }
}

/// Weight a color channel by the brightness level, both 0..=255.
fn scale(channel: u8, level: u16) -> u16 {
    channel as u16 * level / 255
}
