//! The physical board behind the loop traits.
//!
//! [`KeepsakeBoard`] bundles the sensor, TFT, card, buttons, piezo and
//! ring light into the one object [`keepsake_board::CameraBoard`] and
//! friends describe. The provision binary additionally attaches the
//! radio; the camera binary leaves it unfitted.
//!
//! Overlay policy: the status bar persists across frames, a message
//! lives only until the next preview frame replaces it. Messages are
//! drawn immediately; bar changes ride along with the next blit.

use defmt::warn;
use embassy_time::{Instant, Timer};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use keepsake::frame::FrameBuf;
use keepsake::mode::CaptureMode;
use keepsake::settings::Setting;
use keepsake_board::board::{
    AutofocusStatus, CameraBoard, ClipStats, MessageKind, QrPayload, QrScanner, SettingsStore,
    TimelapseStatus, WifiRadio,
};
use keepsake_board::buttons::Inputs;
use keepsake_board::error::{CaptureError, RadioError, StillError, StorageError};
use keepsake_display::{render_overlay, OverlayConfig, OverlayState};

use crate::inputs::InputPins;
use crate::leds::RingLight;
use crate::qr;
use crate::radio::Radio;
use crate::sensor::CameraSensor;
use crate::settings::BoardSettings;
use crate::storage::CardStorage;
use crate::tone::Piezo;
use crate::{CameraSpi, Tft};

/// Clip frames always record at QVGA so appends keep pace with the
/// preview loop.
const CLIP_RESOLUTION_INDEX: usize = 0;

/// Height of the wiped band behind the message block. Tall enough for
/// the three lines a full message buffer wraps to.
const MESSAGE_BAND_H: u32 = 48;

pub struct KeepsakeBoard {
    sensor: CameraSensor<CameraSpi>,
    tft: Tft,
    overlay: OverlayState,
    overlay_config: OverlayConfig,
    storage: CardStorage,
    inputs: InputPins,
    piezo: Piezo,
    ring: RingLight,
    radio: Option<Radio>,
    settings: BoardSettings,
}

impl KeepsakeBoard {
    /// Assemble the board from initialised parts. The radio is absent
    /// until [`attach_radio()`](Self::attach_radio).
    pub fn new(
        sensor: CameraSensor<CameraSpi>,
        tft: Tft,
        storage: CardStorage,
        inputs: InputPins,
        piezo: Piezo,
        ring: RingLight,
    ) -> Self {
        let settings = BoardSettings::default();
        let mut overlay = OverlayState::default();
        overlay.set_mode_tag(settings.mode().label());
        Self {
            sensor,
            tft,
            overlay,
            overlay_config: OverlayConfig::default(),
            storage,
            inputs,
            piezo,
            ring,
            radio: None,
            settings,
        }
    }

    pub fn attach_radio(&mut self, radio: Radio) {
        self.radio = Some(radio);
    }

    /// Direct storage access for the provision binary's boot probe.
    pub fn storage_mut(&mut self) -> &mut CardStorage {
        &mut self.storage
    }

    /// Raw shutter level, bypassing the debouncer.
    pub fn shutter_level_held(&self) -> bool {
        self.inputs.shutter_held()
    }

    /// Whether the card-detect switch reads a seated card.
    pub fn card_present(&self) -> bool {
        self.inputs.card_present()
    }

    /// Draw the overlay over whatever the panel currently shows.
    fn flush_overlay(&mut self) {
        let Some(target) = self.tft.draw_target() else {
            return;
        };
        if render_overlay(target, &self.overlay, &self.overlay_config).is_err() {
            warn!("overlay draw failed");
        }
    }

    /// Black out the message block so redraws don't stack glyphs.
    fn wipe_message_band(&mut self) {
        let Some(target) = self.tft.draw_target() else {
            return;
        };
        let band = Rectangle::new(
            Point::new(0, self.overlay_config.message_y - 10),
            Size::new(self.overlay_config.display_width, MESSAGE_BAND_H),
        );
        if band
            .into_styled(PrimitiveStyle::with_fill(Rgb565::BLACK))
            .draw(target)
            .is_err()
        {
            warn!("message wipe failed");
        }
    }

    fn refresh_setting_tag(&mut self, setting: Setting) {
        let tag = self.settings.value_tag(setting);
        self.overlay.set_setting_tag(tag.as_str());
    }
}

impl CameraBoard for KeepsakeBoard {
    async fn capture_into(&mut self, frame: &mut FrameBuf<'_>) -> Result<(), CaptureError> {
        self.sensor.capture_preview(frame)
    }

    async fn blit(&mut self, frame: &FrameBuf<'_>) {
        // A fresh frame retires any message on screen.
        self.overlay.clear_message();
        if self.tft.blit_scaled2x(frame).is_err() {
            warn!("frame blit failed");
        }
        self.flush_overlay();
    }

    async fn capture_jpeg(&mut self) -> Result<(), StillError> {
        let jpeg = self.sensor.capture_still(self.settings.resolution_index())?;
        self.storage.write_jpeg(jpeg)?;
        Ok(())
    }

    async fn begin_clip(&mut self) -> Result<(), StillError> {
        Ok(self.storage.begin_clip()?)
    }

    async fn record_clip_frame(&mut self) -> Result<(), StillError> {
        let jpeg = self.sensor.capture_still(CLIP_RESOLUTION_INDEX)?;
        self.storage.append_clip_frame(jpeg)?;
        Ok(())
    }

    async fn finish_clip(&mut self) -> Result<ClipStats, StillError> {
        Ok(self.storage.finish_clip()?)
    }

    async fn store_bitmap(&mut self, frame: &FrameBuf<'_>) -> Result<(), StillError> {
        Ok(self.storage.write_bitmap(frame)?)
    }

    async fn display_message(&mut self, text: &str, kind: MessageKind) {
        let color = match kind {
            MessageKind::Info => Rgb565::WHITE,
            MessageKind::Success => Rgb565::BLUE,
            MessageKind::Error => Rgb565::RED,
        };
        self.overlay.set_message(text, color);
        self.wipe_message_band();
        self.flush_overlay();
    }

    async fn set_mode_banner(&mut self, banner: Option<&'static str>) {
        match banner {
            Some(text) => self.overlay.set_mode_tag(text),
            None => self.overlay.set_mode_tag(self.settings.mode().label()),
        }
    }

    async fn set_timelapse_status(&mut self, status: TimelapseStatus) {
        match status {
            TimelapseStatus::Hidden => self.overlay.set_lapse_text(""),
            TimelapseStatus::Stopped => self.overlay.set_lapse_text("STOP"),
            TimelapseStatus::Waiting { remaining } => self.overlay.set_lapse_countdown(remaining),
        }
    }

    async fn select_setting(&mut self, setting: Option<Setting>) {
        match setting {
            None => self.overlay.set_setting_tag(""),
            Some(setting) => self.refresh_setting_tag(setting),
        }
    }

    async fn adjust_setting(&mut self, setting: Setting, delta: i32) {
        self.settings.adjust(setting, delta);
        match setting {
            Setting::Mode => {
                let label = self.settings.mode().label();
                self.overlay.set_mode_tag(label);
            }
            Setting::Effect => {
                if self.sensor.set_effect(self.settings.effect_index()).is_err() {
                    warn!("effect change not applied");
                }
            }
            Setting::LedLevel | Setting::LedColor => {
                self.ring
                    .apply(self.settings.led_level_index(), self.settings.led_color_index());
            }
            Setting::Resolution | Setting::TimelapseRate => {}
        }
        self.refresh_setting_tag(setting);
    }

    fn capture_mode(&self) -> CaptureMode {
        self.settings.mode()
    }

    fn timelapse_interval_secs(&self) -> u64 {
        self.settings.lapse_interval_secs()
    }

    fn now_secs(&self) -> u64 {
        Instant::now().as_secs()
    }

    fn shutter_held(&self) -> bool {
        self.inputs.shutter_held()
    }

    async fn autofocus(&mut self) -> AutofocusStatus {
        self.sensor.autofocus()
    }

    async fn tone(&mut self, freq_hz: u16, duration_ms: u32) {
        self.piezo.play(freq_hz, duration_ms).await;
    }

    async fn poll_inputs(&mut self) -> Inputs {
        self.inputs.poll()
    }

    async fn mount_sd(&mut self) -> Result<(), StorageError> {
        self.storage.mount()
    }

    async fn unmount_sd(&mut self) {
        self.storage.unmount();
    }

    async fn delay_ms(&mut self, ms: u32) {
        Timer::after_millis(ms as u64).await;
    }

    async fn prepare_qr_scan(&mut self) {
        if self.sensor.set_effect(0).is_err() {
            warn!("neutral effect not applied");
        }
        self.overlay.set_mode_tag("SCAN");
        self.overlay.set_lapse_text("");
        self.overlay.set_setting_tag("");
    }
}

impl SettingsStore for KeepsakeBoard {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.storage.read_settings(buf)
    }

    async fn write(&mut self, text: &str) -> Result<(), StorageError> {
        self.storage.write_settings(text)
    }

    fn writable(&self) -> bool {
        self.storage.writable()
    }
}

impl QrScanner for KeepsakeBoard {
    async fn scan(&mut self, frame: &FrameBuf<'_>) -> Option<QrPayload> {
        qr::scan(frame)
    }
}

impl WifiRadio for KeepsakeBoard {
    async fn reset(&mut self) {
        match self.radio.as_mut() {
            Some(radio) => radio.reset().await,
            None => warn!("no radio fitted"),
        }
    }

    async fn join(&mut self, ssid: &str, psk: &str) -> Result<(), RadioError> {
        match self.radio.as_mut() {
            Some(radio) => radio.join(ssid, psk).await,
            None => Err(RadioError::NotResponding),
        }
    }
}
