//! The collaborator traits the application loops are written against.
//!
//! Each trait has exactly one hardware implementation (in the firmware
//! crate) and one scripted double (in this crate's tests). Methods are
//! async because the real implementations sit on SPI and card I/O; the
//! doubles resolve immediately, which is what lets the loop tests run
//! single `step` calls to completion on the host.

use heapless::String;
use keepsake::frame::FrameBuf;
use keepsake::mode::CaptureMode;
use keepsake::settings::Setting;

use crate::buttons::Inputs;
use crate::error::{CaptureError, RadioError, StillError, StorageError};

/// Decoded QR payload text.
pub type QrPayload = String<256>;

/// Tint of a transient full-screen message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageKind {
    /// Plain notice (white).
    Info,
    /// Capture feedback (blue).
    Success,
    /// Fault feedback (red).
    Error,
}

/// Time-lapse field of the status overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimelapseStatus {
    /// Field not shown (mode is not time-lapse).
    Hidden,
    /// Armed countdown is stopped.
    Stopped,
    /// Seconds until the next automatic capture.
    Waiting { remaining: u64 },
}

/// Outcome summary of a finished clip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClipStats {
    pub frames: u32,
    pub bytes: u32,
}

/// Autofocus attempt outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AutofocusStatus {
    Locked,
    Failed,
    /// The fitted sensor has no focus control.
    Unsupported,
}

/// Everything the camera hardware offers the loops: sensor, display,
/// storage, inputs, and the piezo.
///
/// Display-state methods (`set_mode_banner`, `set_timelapse_status`,
/// `select_setting`) are called every iteration their state is relevant;
/// implementations are expected to swallow no-op updates cheaply.
#[allow(async_fn_in_trait)]
pub trait CameraBoard {
    /// Grab the next preview frame into `frame`.
    async fn capture_into(&mut self, frame: &mut FrameBuf<'_>) -> Result<(), CaptureError>;

    /// Push a full frame to the panel, then redraw the status overlay.
    async fn blit(&mut self, frame: &FrameBuf<'_>);

    /// Capture a full-resolution JPEG still to the next numbered file.
    async fn capture_jpeg(&mut self) -> Result<(), StillError>;

    /// Open the next numbered clip file.
    async fn begin_clip(&mut self) -> Result<(), StillError>;

    /// Capture one sensor JPEG frame and append it to the open clip.
    async fn record_clip_frame(&mut self) -> Result<(), StillError>;

    /// Close the open clip. Also safe with no clip open.
    async fn finish_clip(&mut self) -> Result<ClipStats, StillError>;

    /// Store `frame` as the next numbered bitmap file.
    async fn store_bitmap(&mut self, frame: &FrameBuf<'_>) -> Result<(), StillError>;

    /// Show a transient centered message over the preview. The next
    /// [`CameraBoard::blit`] wipes it.
    async fn display_message(&mut self, text: &str, kind: MessageKind);

    /// Override the mode tag in the status bar; `None` restores it.
    async fn set_mode_banner(&mut self, banner: Option<&'static str>);

    /// Update the time-lapse field of the status overlay.
    async fn set_timelapse_status(&mut self, status: TimelapseStatus);

    /// Highlight a setting in the status bar (`None` clears it).
    async fn select_setting(&mut self, setting: Option<Setting>);

    /// Nudge a setting's value up or down; the board owns each
    /// setting's range and wraparound.
    async fn adjust_setting(&mut self, setting: Setting, delta: i32);

    /// The mode setting's current value.
    fn capture_mode(&self) -> CaptureMode;

    /// The time-lapse rate setting's current value, in seconds.
    fn timelapse_interval_secs(&self) -> u64;

    /// Wall-clock seconds since boot.
    fn now_secs(&self) -> u64;

    /// Raw (undebounced) shutter level; sampled mid-clip.
    fn shutter_held(&self) -> bool;

    /// Run the sensor's autofocus sweep, if it has one.
    async fn autofocus(&mut self) -> AutofocusStatus;

    /// Play a square-wave tone on the piezo.
    async fn tone(&mut self, freq_hz: u16, duration_ms: u32);

    /// Refresh every debouncer once and drain the accumulated events.
    async fn poll_inputs(&mut self) -> Inputs;

    /// Mount the SD card.
    async fn mount_sd(&mut self) -> Result<(), StorageError>;

    /// Unmount the SD card; storage fails with `NoCard` until remounted.
    async fn unmount_sd(&mut self);

    /// Sleep for `ms` milliseconds.
    async fn delay_ms(&mut self, ms: u32);

    /// Configure the sensor and status bar for QR scanning: no
    /// mirroring, neutral effect, scan banner.
    async fn prepare_qr_scan(&mut self);
}

/// The on-card settings file.
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    /// Read the settings file into `buf`, returning the byte length.
    /// A missing file reads as empty (`Ok(0)`).
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Replace the whole settings file.
    async fn write(&mut self, text: &str) -> Result<(), StorageError>;

    /// Whether this session may rewrite the file (decided once at boot).
    fn writable(&self) -> bool;
}

/// QR decoder collaborator.
#[allow(async_fn_in_trait)]
pub trait QrScanner {
    /// Scan one frame; `Some` holds the first decoded payload.
    async fn scan(&mut self, frame: &FrameBuf<'_>) -> Option<QrPayload>;
}

/// Wi-Fi radio collaborator.
#[allow(async_fn_in_trait)]
pub trait WifiRadio {
    /// Power-cycle the radio ahead of a fresh association attempt.
    async fn reset(&mut self);

    /// Associate with `ssid` using `psk` (empty for open networks).
    async fn join(&mut self, ssid: &str, psk: &str) -> Result<(), RadioError>;
}
