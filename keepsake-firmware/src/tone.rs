//! Square-wave tones on the piezo via one PWM slice.

use embassy_rp::pwm::{Config, Pwm};
use embassy_time::Timer;
use fixed::traits::ToFixed;

/// PWM counter tick rate after division (150 MHz sys clock / 150).
const PWM_TICK_HZ: u32 = 1_000_000;
const PWM_DIVIDER: u16 = 150;

/// Piezo buzzer on a PWM channel-A pin.
///
/// Tones block the caller for their duration; the UI deliberately
/// freezes while feedback beeps play.
pub struct Piezo {
    pwm: Pwm<'static>,
    config: Config,
}

impl Piezo {
    pub fn new(pwm: Pwm<'static>) -> Self {
        let mut config = Config::default();
        config.divider = PWM_DIVIDER.to_fixed();
        config.compare_a = 0;
        Self { pwm, config }
    }

    /// Play a square wave at `freq_hz` for `duration_ms`, then silence.
    pub async fn play(&mut self, freq_hz: u16, duration_ms: u32) {
        if freq_hz == 0 {
            Timer::after_millis(duration_ms as u64).await;
            return;
        }
        // 50% duty at the requested frequency. The divided tick is 1 MHz,
        // so anything above ~16 Hz fits the 16-bit counter.
        let top = (PWM_TICK_HZ / freq_hz as u32).clamp(2, u16::MAX as u32) as u16 - 1;
        self.config.top = top;
        self.config.compare_a = top / 2;
        self.pwm.set_config(&self.config);

        Timer::after_millis(duration_ms as u64).await;

        self.config.compare_a = 0;
        self.pwm.set_config(&self.config);
    }
}
