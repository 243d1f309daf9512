//! Scripted board double shared by the camera-loop and provisioner
//! tests. Every trait call lands in [`ScriptedBoard::calls`] in order;
//! results and input events are queued up front by each test.

use core::cell::Cell;

use heapless::{Deque, String, Vec};
use keepsake::frame::FrameBuf;
use keepsake::mode::CaptureMode;
use keepsake::settings::Setting;

use crate::board::{
    AutofocusStatus, CameraBoard, ClipStats, MessageKind, QrPayload, QrScanner, SettingsStore,
    TimelapseStatus, WifiRadio,
};
use crate::buttons::{ButtonEvents, Inputs};
use crate::camera_app::CameraFrames;
use crate::error::{CaptureError, RadioError, StillError, StorageError};

/// One recorded board call. Messages keep their first 48 characters,
/// which covers every string the loops produce short of the countdown
/// prompt (which no test compares by text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CaptureInto,
    /// First pixel of the blitted frame, enough to tell the
    /// composites apart.
    Blit(u16),
    CaptureJpeg,
    BeginClip,
    RecordClipFrame,
    FinishClip,
    StoreBitmap,
    Message(String<48>, MessageKind),
    Banner(Option<&'static str>),
    Status(TimelapseStatus),
    Select(Option<Setting>),
    Adjust(Setting, i32),
    Autofocus,
    Tone(u16, u32),
    MountSd,
    UnmountSd,
    DelayMs(u32),
    PrepareQrScan,
}

impl Call {
    /// A [`Call::Message`] with the same truncation the recorder applies.
    pub fn message(text: &str, kind: MessageKind) -> Self {
        let mut s: String<48> = String::new();
        for c in text.chars().take(48) {
            let _ = s.push(c);
        }
        Call::Message(s, kind)
    }
}

/// One recorded radio call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCall {
    Reset,
    Join(String<32>, String<64>),
}

impl RadioCall {
    pub fn join(ssid: &str, psk: &str) -> Self {
        let mut s: String<32> = String::new();
        let _ = s.push_str(ssid);
        let mut p: String<64> = String::new();
        let _ = p.push_str(psk);
        RadioCall::Join(s, p)
    }
}

/// Shutter press: one debounced short click.
pub fn pressed() -> ButtonEvents {
    ButtonEvents {
        fell: true,
        short_count: 1,
        ..ButtonEvents::default()
    }
}

/// Bare falling edge, what the navigation buttons dispatch on.
pub fn fell() -> ButtonEvents {
    ButtonEvents {
        fell: true,
        ..ButtonEvents::default()
    }
}

/// A completed long press with no short click.
pub fn long_pressed() -> ButtonEvents {
    ButtonEvents {
        long_press: true,
        held: true,
        ..ButtonEvents::default()
    }
}

/// Owns the three 4x4 pixel arrays a [`CameraFrames`] borrows from.
pub struct TestBufs {
    scratch: [u16; 16],
    last: [u16; 16],
    onionskin: [u16; 16],
}

impl TestBufs {
    pub fn new() -> Self {
        Self {
            scratch: [0; 16],
            last: [0; 16],
            onionskin: [0; 16],
        }
    }

    pub fn frames(&mut self) -> CameraFrames<'_> {
        CameraFrames {
            scratch: FrameBuf::new(4, 4, &mut self.scratch).unwrap(),
            last: FrameBuf::new(4, 4, &mut self.last).unwrap(),
            onionskin: FrameBuf::new(4, 4, &mut self.onionskin).unwrap(),
        }
    }
}

/// A board whose every answer is scripted by the test.
pub struct ScriptedBoard {
    pub mode: CaptureMode,
    pub interval_secs: u64,
    pub clock_secs: u64,
    /// `capture_into` floods the frame with this color.
    pub capture_fill: u16,
    pub capture_result: Result<(), CaptureError>,
    pub jpeg_result: Result<(), StillError>,
    pub bitmap_result: Result<(), StillError>,
    pub begin_clip_result: Result<(), StillError>,
    pub finish_clip_result: Result<ClipStats, StillError>,
    /// Fail `record_clip_frame` after this many successful frames.
    pub clip_frame_fail_after: Option<u32>,
    pub calls: Vec<Call, 256>,

    // Settings store.
    pub writable: bool,
    pub read_result: Result<(), StorageError>,
    pub write_result: Result<(), StorageError>,
    /// The last full text accepted by `write`.
    pub written: Option<String<1024>>,

    // Scanner and radio.
    pub scans: usize,
    pub join_result: Result<(), RadioError>,
    pub radio_calls: Vec<RadioCall, 8>,

    inputs: Deque<Inputs, 16>,
    mount_results: Deque<Result<(), StorageError>, 8>,
    payloads: Deque<Option<QrPayload>, 8>,
    settings: String<1024>,
    held_ticks: Cell<u32>,
    clip_frames_taken: u32,
}

impl ScriptedBoard {
    pub fn new(mode: CaptureMode) -> Self {
        Self {
            mode,
            interval_secs: 30,
            clock_secs: 0,
            capture_fill: 0,
            capture_result: Ok(()),
            jpeg_result: Ok(()),
            bitmap_result: Ok(()),
            begin_clip_result: Ok(()),
            finish_clip_result: Ok(ClipStats::default()),
            clip_frame_fail_after: None,
            calls: Vec::new(),
            writable: true,
            read_result: Ok(()),
            write_result: Ok(()),
            written: None,
            scans: 0,
            join_result: Ok(()),
            radio_calls: Vec::new(),
            inputs: Deque::new(),
            mount_results: Deque::new(),
            payloads: Deque::new(),
            settings: String::new(),
            held_ticks: Cell::new(0),
            clip_frames_taken: 0,
        }
    }

    /// Queue the inputs for one `poll_inputs`; an exhausted queue
    /// polls as all-idle.
    pub fn push_inputs(&mut self, inputs: Inputs) {
        self.inputs.push_back(inputs).expect("input queue full");
    }

    /// Queue one `mount_sd` outcome; the default is success.
    pub fn push_mount_result(&mut self, result: Result<(), StorageError>) {
        self.mount_results
            .push_back(result)
            .expect("mount queue full");
    }

    /// Queue one `scan` outcome; the default is no decode.
    pub fn push_payload(&mut self, payload: Option<QrPayload>) {
        self.payloads.push_back(payload).expect("payload queue full");
    }

    /// Seed the settings file content returned by `read`.
    pub fn settings_text(&mut self, text: &str) {
        self.settings = String::try_from(text).expect("settings text too long");
    }

    /// Report the shutter as held for the next `ticks` polls of
    /// `shutter_held`.
    pub fn hold_shutter_for(&mut self, ticks: u32) {
        self.held_ticks.set(ticks);
    }

    /// Index of the first recorded call matching `pred`.
    pub fn position(&self, pred: impl FnMut(&Call) -> bool) -> Option<usize> {
        self.calls.iter().position(pred)
    }

    fn record(&mut self, call: Call) {
        self.calls.push(call).expect("call log full");
    }
}

impl CameraBoard for ScriptedBoard {
    async fn capture_into(&mut self, frame: &mut FrameBuf<'_>) -> Result<(), CaptureError> {
        self.record(Call::CaptureInto);
        self.capture_result?;
        frame.fill(self.capture_fill);
        Ok(())
    }

    async fn blit(&mut self, frame: &FrameBuf<'_>) {
        let first = frame.pixels().first().copied().unwrap_or(0);
        self.record(Call::Blit(first));
    }

    async fn capture_jpeg(&mut self) -> Result<(), StillError> {
        self.record(Call::CaptureJpeg);
        self.jpeg_result
    }

    async fn begin_clip(&mut self) -> Result<(), StillError> {
        self.record(Call::BeginClip);
        self.begin_clip_result
    }

    async fn record_clip_frame(&mut self) -> Result<(), StillError> {
        self.record(Call::RecordClipFrame);
        if let Some(limit) = self.clip_frame_fail_after {
            if self.clip_frames_taken >= limit {
                return Err(StillError::Capture(CaptureError::Sensor));
            }
        }
        self.clip_frames_taken += 1;
        Ok(())
    }

    async fn finish_clip(&mut self) -> Result<ClipStats, StillError> {
        self.record(Call::FinishClip);
        self.finish_clip_result
    }

    async fn store_bitmap(&mut self, _frame: &FrameBuf<'_>) -> Result<(), StillError> {
        self.record(Call::StoreBitmap);
        self.bitmap_result
    }

    async fn display_message(&mut self, text: &str, kind: MessageKind) {
        self.record(Call::message(text, kind));
    }

    async fn set_mode_banner(&mut self, banner: Option<&'static str>) {
        self.record(Call::Banner(banner));
    }

    async fn set_timelapse_status(&mut self, status: TimelapseStatus) {
        self.record(Call::Status(status));
    }

    async fn select_setting(&mut self, setting: Option<Setting>) {
        self.record(Call::Select(setting));
    }

    async fn adjust_setting(&mut self, setting: Setting, delta: i32) {
        self.record(Call::Adjust(setting, delta));
    }

    fn capture_mode(&self) -> CaptureMode {
        self.mode
    }

    fn timelapse_interval_secs(&self) -> u64 {
        self.interval_secs
    }

    fn now_secs(&self) -> u64 {
        self.clock_secs
    }

    fn shutter_held(&self) -> bool {
        let left = self.held_ticks.get();
        if left > 0 {
            self.held_ticks.set(left - 1);
            true
        } else {
            false
        }
    }

    async fn autofocus(&mut self) -> AutofocusStatus {
        self.record(Call::Autofocus);
        AutofocusStatus::Unsupported
    }

    async fn tone(&mut self, freq_hz: u16, duration_ms: u32) {
        self.record(Call::Tone(freq_hz, duration_ms));
    }

    async fn poll_inputs(&mut self) -> Inputs {
        self.inputs.pop_front().unwrap_or_default()
    }

    async fn mount_sd(&mut self) -> Result<(), StorageError> {
        self.record(Call::MountSd);
        self.mount_results.pop_front().unwrap_or(Ok(()))
    }

    async fn unmount_sd(&mut self) {
        self.record(Call::UnmountSd);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.record(Call::DelayMs(ms));
    }

    async fn prepare_qr_scan(&mut self) {
        self.record(Call::PrepareQrScan);
    }
}

impl SettingsStore for ScriptedBoard {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.read_result?;
        let bytes = self.settings.as_bytes();
        let len = bytes.len().min(buf.len());
        buf[..len].copy_from_slice(&bytes[..len]);
        Ok(len)
    }

    async fn write(&mut self, text: &str) -> Result<(), StorageError> {
        self.write_result?;
        self.written = String::try_from(text).ok();
        Ok(())
    }

    fn writable(&self) -> bool {
        self.writable
    }
}

impl QrScanner for ScriptedBoard {
    async fn scan(&mut self, _frame: &FrameBuf<'_>) -> Option<QrPayload> {
        self.scans += 1;
        self.payloads.pop_front().flatten()
    }
}

impl WifiRadio for ScriptedBoard {
    async fn reset(&mut self) {
        self.radio_calls
            .push(RadioCall::Reset)
            .expect("radio log full");
    }

    async fn join(&mut self, ssid: &str, psk: &str) -> Result<(), RadioError> {
        self.radio_calls
            .push(RadioCall::join(ssid, psk))
            .expect("radio log full");
        self.join_result
    }
}
