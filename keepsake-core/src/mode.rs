//! Capture modes and their display tags.

/// Capture behavior selected by the mode setting.
///
/// The active mode decides how each live frame is presented and what the
/// shutter button does. Cycling through modes is just another setting
/// adjustment; see [`CaptureMode::cycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureMode {
    /// Stop-motion stills with an onionskin blend of the previous shot.
    StopMotion,
    /// Four-shade dithered preview; the shutter stores the dithered frame.
    GameBoy,
    /// Automatic periodic stills with an on-screen countdown.
    Timelapse,
    /// Hold-to-record motion-JPEG clip.
    Clip,
    /// One full-resolution still per shutter press.
    #[default]
    Jpeg,
    /// Plain live preview; the shutter does nothing.
    Preview,
}

impl CaptureMode {
    /// Every mode, in carousel order.
    pub const ALL: [CaptureMode; 6] = [
        CaptureMode::StopMotion,
        CaptureMode::GameBoy,
        CaptureMode::Timelapse,
        CaptureMode::Clip,
        CaptureMode::Jpeg,
        CaptureMode::Preview,
    ];

    /// The four-character tag shown in the status bar.
    pub fn label(self) -> &'static str {
        match self {
            CaptureMode::StopMotion => "STOP",
            CaptureMode::GameBoy => "GBOY",
            CaptureMode::Timelapse => "LAPS",
            CaptureMode::Clip => "CLIP",
            CaptureMode::Jpeg => "JPEG",
            CaptureMode::Preview => "LIVE",
        }
    }

    /// Step `delta` places through [`CaptureMode::ALL`] with wraparound.
    ///
    /// ```
    /// use keepsake::CaptureMode;
    ///
    /// assert_eq!(CaptureMode::Jpeg.cycle(1), CaptureMode::Preview);
    /// assert_eq!(CaptureMode::StopMotion.cycle(-1), CaptureMode::Preview);
    /// ```
    pub fn cycle(self, delta: i32) -> CaptureMode {
        let len = Self::ALL.len() as i32;
        let idx = (self.index() as i32 + delta).rem_euclid(len);
        Self::ALL[idx as usize]
    }

    fn index(self) -> usize {
        match self {
            CaptureMode::StopMotion => 0,
            CaptureMode::GameBoy => 1,
            CaptureMode::Timelapse => 2,
            CaptureMode::Clip => 3,
            CaptureMode::Jpeg => 4,
            CaptureMode::Preview => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_four_characters() {
        for mode in CaptureMode::ALL {
            assert_eq!(mode.label().len(), 4, "{:?}", mode);
        }
    }

    #[test]
    fn cycle_forward_wraps_to_first() {
        assert_eq!(CaptureMode::Preview.cycle(1), CaptureMode::StopMotion);
    }

    #[test]
    fn cycle_backward_wraps_to_last() {
        assert_eq!(CaptureMode::StopMotion.cycle(-1), CaptureMode::Preview);
    }

    #[test]
    fn cycle_by_zero_is_identity() {
        for mode in CaptureMode::ALL {
            assert_eq!(mode.cycle(0), mode);
        }
    }

    #[test]
    fn full_cycle_visits_every_mode_once() {
        let mut mode = CaptureMode::Jpeg;
        let mut seen = [false; CaptureMode::ALL.len()];
        for _ in 0..CaptureMode::ALL.len() {
            seen[mode.index()] = true;
            mode = mode.cycle(1);
        }
        assert_eq!(mode, CaptureMode::Jpeg);
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn default_mode_is_jpeg() {
        assert_eq!(CaptureMode::default(), CaptureMode::Jpeg);
    }
}
