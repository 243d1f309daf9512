//! Thin adapter over the `arducam-mega` SPI camera driver.
//!
//! The sensor runs in one of two regimes: RGB565 preview at QQVGA
//! (160x120, center-cropped into the 120x120 [`FrameBuf`]) or JPEG
//! stills at the configured resolution. Switching regimes reprograms
//! the sensor, so [`CameraSensor`] tracks the last one and only
//! reconfigures on change.
//!
//! Every `arducam-mega` call lives in this file; the rest of the crate
//! deals in [`FrameBuf`]s and JPEG byte slices.

use arducam_mega::{ArducamMega, Format, Resolution, WhiteBalanceMode};
use embassy_time::Delay;
use embedded_hal::spi::SpiDevice;
use keepsake::frame::FrameBuf;
use keepsake_board::board::AutofocusStatus;
use keepsake_board::error::CaptureError;

use crate::settings::{EFFECT_LABELS, RESOLUTION_LABELS};

use defmt::warn;

/// Preview regime geometry: QQVGA RGB565.
const PREVIEW_WIDTH: usize = 160;
const PREVIEW_HEIGHT: usize = 120;
/// Bytes in one full preview frame (two per pixel).
pub const PREVIEW_BYTES: usize = PREVIEW_WIDTH * PREVIEW_HEIGHT * 2;

/// Still resolutions, index-aligned with
/// [`RESOLUTION_LABELS`](crate::settings::RESOLUTION_LABELS).
const STILL_RESOLUTIONS: [Resolution; 4] = [
    Resolution::Qvga,
    Resolution::Vga,
    Resolution::Svga,
    Resolution::Hd,
];
const _: () = assert!(STILL_RESOLUTIONS.len() == RESOLUTION_LABELS.len());

/// Effect presets, index-aligned with
/// [`EFFECT_LABELS`](crate::settings::EFFECT_LABELS).
const EFFECTS: [WhiteBalanceMode; 5] = [
    WhiteBalanceMode::Auto,
    WhiteBalanceMode::Sunny,
    WhiteBalanceMode::Cloudy,
    WhiteBalanceMode::Office,
    WhiteBalanceMode::Home,
];
const _: () = assert!(EFFECTS.len() == EFFECT_LABELS.len());

#[derive(Clone, Copy, PartialEq, Eq)]
enum Regime {
    Unconfigured,
    Preview,
    Still(usize),
}

/// The camera module on its own SPI bus.
///
/// # Lifecycle
///
/// 1. [`CameraSensor::new()`] wraps the bus without traffic.
/// 2. [`CameraSensor::init()`] resets the module and programs the
///    preview regime.
/// 3. Capture with [`capture_preview()`](Self::capture_preview) and
///    [`capture_still()`](Self::capture_still).
///
/// # Errors
///
/// Driver faults surface as [`CaptureError::Sensor`]; an empty FIFO
/// after a capture (sensor wedged or mid-reset) surfaces as
/// [`CaptureError::Timeout`].
pub struct CameraSensor<SPI> {
    cam: ArducamMega<SPI, Delay>,
    /// Raw preview frame, [`PREVIEW_BYTES`] long.
    preview_raw: &'static mut [u8],
    /// JPEG landing buffer; stills larger than this are rejected.
    jpeg: &'static mut [u8],
    regime: Regime,
}

impl<SPI: SpiDevice> CameraSensor<SPI> {
    pub fn new(spi: SPI, preview_raw: &'static mut [u8], jpeg: &'static mut [u8]) -> Self {
        Self {
            cam: ArducamMega::new(spi, Delay),
            preview_raw,
            jpeg,
            regime: Regime::Unconfigured,
        }
    }

    /// Reset the module and enter the preview regime.
    pub fn init(&mut self) -> Result<(), CaptureError> {
        self.cam.reset().map_err(|_| CaptureError::Sensor)?;
        self.regime = Regime::Unconfigured;
        self.enter_preview()?;
        self.set_effect(0)
    }

    fn enter_preview(&mut self) -> Result<(), CaptureError> {
        if self.regime != Regime::Preview {
            self.cam
                .set_format(Format::Rgb565)
                .map_err(|_| CaptureError::Sensor)?;
            self.cam
                .set_resolution(Resolution::Qqvga)
                .map_err(|_| CaptureError::Sensor)?;
            self.regime = Regime::Preview;
        }
        Ok(())
    }

    fn enter_still(&mut self, resolution_index: usize) -> Result<(), CaptureError> {
        if self.regime != Regime::Still(resolution_index) {
            self.cam
                .set_format(Format::Jpeg)
                .map_err(|_| CaptureError::Sensor)?;
            self.cam
                .set_resolution(STILL_RESOLUTIONS[resolution_index])
                .map_err(|_| CaptureError::Sensor)?;
            self.regime = Regime::Still(resolution_index);
        }
        Ok(())
    }

    /// Grab one preview frame, center-cropped into `frame`.
    pub fn capture_preview(&mut self, frame: &mut FrameBuf<'_>) -> Result<(), CaptureError> {
        self.enter_preview()?;
        self.cam.capture().map_err(|_| CaptureError::Sensor)?;
        let len = self
            .cam
            .read_fifo_length()
            .map_err(|_| CaptureError::Sensor)? as usize;
        if len == 0 {
            return Err(CaptureError::Timeout);
        }
        if len < PREVIEW_BYTES {
            warn!("short preview frame: {} of {} bytes", len, PREVIEW_BYTES);
            return Err(CaptureError::Sensor);
        }
        self.cam
            .read_fifo_full(&mut self.preview_raw[..PREVIEW_BYTES])
            .map_err(|_| CaptureError::Sensor)?;
        crop_center(self.preview_raw, frame);
        Ok(())
    }

    /// Capture a JPEG still at the indexed resolution, returning the
    /// encoded bytes. The slice borrows this sensor's landing buffer and
    /// is valid until the next capture.
    pub fn capture_still(&mut self, resolution_index: usize) -> Result<&[u8], CaptureError> {
        self.enter_still(resolution_index)?;
        self.cam.capture().map_err(|_| CaptureError::Sensor)?;
        let len = self
            .cam
            .read_fifo_length()
            .map_err(|_| CaptureError::Sensor)? as usize;
        if len == 0 {
            return Err(CaptureError::Timeout);
        }
        if len > self.jpeg.len() {
            warn!("jpeg of {} bytes exceeds the {} byte buffer", len, self.jpeg.len());
            return Err(CaptureError::Sensor);
        }
        self.cam
            .read_fifo_full(&mut self.jpeg[..len])
            .map_err(|_| CaptureError::Sensor)?;
        Ok(&self.jpeg[..len])
    }

    /// Apply an effect preset from the settings table.
    pub fn set_effect(&mut self, effect_index: usize) -> Result<(), CaptureError> {
        self.cam
            .set_white_balance_mode(EFFECTS[effect_index])
            .map_err(|_| CaptureError::Sensor)
    }

    /// The fitted 3 MP module is fixed-focus; there is no sweep to run.
    pub fn autofocus(&mut self) -> AutofocusStatus {
        AutofocusStatus::Unsupported
    }
}

/// Copy the centered `frame`-sized window out of a raw big-endian
/// RGB565 preview.
fn crop_center(raw: &[u8], frame: &mut FrameBuf<'_>) {
    let (w, h) = (frame.width(), frame.height());
    debug_assert!(w <= PREVIEW_WIDTH && h <= PREVIEW_HEIGHT);
    let x_off = (PREVIEW_WIDTH - w) / 2;
    let y_off = (PREVIEW_HEIGHT - h) / 2;
    let pixels = frame.pixels_mut();
    for y in 0..h {
        let src_row = (y + y_off) * PREVIEW_WIDTH;
        let dst_row = y * w;
        for x in 0..w {
            let i = (src_row + x_off + x) * 2;
            pixels[dst_row + x] = u16::from_be_bytes([raw[i], raw[i + 1]]);
        }
    }
}
