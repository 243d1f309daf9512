//! The settings carousel: a left/right cursor over the adjustable
//! camera settings.

use crate::mode::CaptureMode;

/// One adjustable camera setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Setting {
    /// Capture mode (see [`CaptureMode`]).
    Mode,
    /// Still/clip resolution.
    Resolution,
    /// Sensor color effect.
    Effect,
    /// Ring light brightness.
    LedLevel,
    /// Ring light color.
    LedColor,
    /// Seconds between automatic time-lapse captures.
    TimelapseRate,
}

impl Setting {
    /// Lowercase name shown next to the setting's value in the status bar.
    pub fn label(self) -> &'static str {
        match self {
            Setting::Mode => "mode",
            Setting::Resolution => "resolution",
            Setting::Effect => "effect",
            Setting::LedLevel => "led level",
            Setting::LedColor => "led color",
            Setting::TimelapseRate => "rate",
        }
    }
}

/// Carousel slots in display order.
///
/// The leading `None` is the rest position: nothing selected, up/down do
/// nothing there. `TimelapseRate` appears exactly once, so skipping it
/// (below) never needs more than one extra hop.
pub const SETTING_SLOTS: [Option<Setting>; 7] = [
    None,
    Some(Setting::Resolution),
    Some(Setting::Effect),
    Some(Setting::Mode),
    Some(Setting::LedLevel),
    Some(Setting::LedColor),
    Some(Setting::TimelapseRate),
];

/// Left/right cursor over [`SETTING_SLOTS`] with wraparound.
///
/// The time-lapse rate slot is only reachable while the camera is in
/// [`CaptureMode::Timelapse`]; stepping onto it in any other mode hops one
/// more slot in the same direction.
///
/// ```
/// use keepsake::{CaptureMode, Setting, SettingsCarousel};
///
/// let mut carousel = SettingsCarousel::new();
/// assert_eq!(carousel.selected(), None);
/// assert_eq!(carousel.next(CaptureMode::Jpeg), Some(Setting::Resolution));
/// // Stepping left from the rest position skips the rate outside LAPS.
/// let mut carousel = SettingsCarousel::new();
/// assert_eq!(carousel.prev(CaptureMode::Jpeg), Some(Setting::LedColor));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SettingsCarousel {
    index: usize,
}

impl SettingsCarousel {
    /// A carousel at the rest position.
    pub fn new() -> Self {
        Self { index: 0 }
    }

    /// The currently selected setting, if any.
    pub fn selected(&self) -> Option<Setting> {
        SETTING_SLOTS[self.index]
    }

    /// Move one slot right (with the mode-aware rate skip).
    pub fn next(&mut self, mode: CaptureMode) -> Option<Setting> {
        self.step(1, mode)
    }

    /// Move one slot left (with the mode-aware rate skip).
    pub fn prev(&mut self, mode: CaptureMode) -> Option<Setting> {
        self.step(-1, mode)
    }

    fn step(&mut self, dir: i32, mode: CaptureMode) -> Option<Setting> {
        self.index = Self::wrap(self.index as i32 + dir);
        if SETTING_SLOTS[self.index] == Some(Setting::TimelapseRate)
            && mode != CaptureMode::Timelapse
        {
            self.index = Self::wrap(self.index as i32 + dir);
        }
        self.selected()
    }

    fn wrap(index: i32) -> usize {
        index.rem_euclid(SETTING_SLOTS.len() as i32) as usize
    }
}
