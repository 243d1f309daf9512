//! The live camera loop.
//!
//! One [`CameraApp::step`] is one loop iteration:
//!
//! 1. Present a frame the way the active [`CaptureMode`] wants it
//!    (plain, onionskin blend, dither, or with the time-lapse countdown).
//! 2. Fire a due time-lapse capture and re-arm the schedule.
//! 3. Drain the debounced inputs once and dispatch them: shutter
//!    (long press focuses, short press captures per mode), card-detect
//!    edges (unmount / mount with retries), left/right (settings
//!    carousel), up/down (adjust the selected setting), ok (arm or
//!    disarm the time-lapse).
//!
//! Faults never leave the loop; they become transient on-screen
//! messages and log lines.

use keepsake::frame::{blend_onionskin, dither_gameboy, FrameBuf};
use keepsake::mode::CaptureMode;
use keepsake::settings::SettingsCarousel;
use keepsake::timelapse::{Timelapse, TimelapsePoll};

use crate::board::{CameraBoard, MessageKind, TimelapseStatus};
use crate::buttons::CardEvent;
use crate::error::StillError;

/// Frames recorded into a clip even if the shutter is released at once.
pub const CLIP_MIN_FRAMES: u32 = 15;
/// How long transient status and error messages stay up.
pub const MESSAGE_HOLD_MS: u32 = 500;
/// Attempts at mounting a freshly inserted card.
pub const MOUNT_ATTEMPTS: u32 = 3;
/// Delay between mount attempts.
pub const MOUNT_RETRY_MS: u32 = 500;

/// The three retained frame buffers the loop composites with. All live
/// for the whole session and are rewritten in place.
pub struct CameraFrames<'a> {
    /// Capture target for the current preview frame.
    pub scratch: FrameBuf<'a>,
    /// Previous stop-motion still; also the dither target.
    pub last: FrameBuf<'a>,
    /// Blend target for the stop-motion onionskin.
    pub onionskin: FrameBuf<'a>,
}

/// State carried across loop iterations.
pub struct CameraApp {
    carousel: SettingsCarousel,
    timelapse: Timelapse,
    stop_motion_frames: u32,
}

impl Default for CameraApp {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraApp {
    pub fn new() -> Self {
        Self {
            carousel: SettingsCarousel::new(),
            timelapse: Timelapse::Stopped,
            stop_motion_frames: 0,
        }
    }

    /// Run the loop forever.
    pub async fn run<B: CameraBoard>(&mut self, board: &mut B, frames: &mut CameraFrames<'_>) -> ! {
        info!("camera loop starting");
        loop {
            self.step(board, frames).await;
        }
    }

    /// One loop iteration: one frame presented, one round of inputs.
    pub async fn step<B: CameraBoard>(&mut self, board: &mut B, frames: &mut CameraFrames<'_>) {
        let mode = board.capture_mode();
        self.frame_phase(board, frames, mode).await;

        let inputs = board.poll_inputs().await;

        if inputs.shutter.long_press {
            let status = board.autofocus().await;
            info!("autofocus: {}", status);
        }
        if inputs.shutter.short_count > 0 {
            debug!("shutter pressed in {}", mode);
            self.on_shutter(board, frames, mode).await;
        }
        match inputs.card {
            Some(CardEvent::Removed) => {
                info!("SD card removed");
                board.unmount_sd().await;
            }
            Some(CardEvent::Inserted) => {
                info!("SD card inserted");
                remount_card(board).await;
            }
            None => {}
        }
        if inputs.up.fell {
            if let Some(setting) = self.carousel.selected() {
                board.adjust_setting(setting, 1).await;
            }
        }
        if inputs.down.fell {
            if let Some(setting) = self.carousel.selected() {
                board.adjust_setting(setting, -1).await;
            }
        }
        if inputs.right.fell {
            let selected = self.carousel.next(board.capture_mode());
            board.select_setting(selected).await;
        }
        if inputs.left.fell {
            let selected = self.carousel.prev(board.capture_mode());
            board.select_setting(selected).await;
        }
        if inputs.select.fell {
            debug!("select pressed");
        }
        if inputs.ok.fell && mode == CaptureMode::Timelapse {
            let armed = self
                .timelapse
                .toggle(board.now_secs(), board.timelapse_interval_secs());
            info!("timelapse {}", if armed { "armed" } else { "stopped" });
        }
    }

    async fn frame_phase<B: CameraBoard>(
        &mut self,
        board: &mut B,
        frames: &mut CameraFrames<'_>,
        mode: CaptureMode,
    ) {
        match mode {
            CaptureMode::StopMotion if self.stop_motion_frames != 0 => {
                if capture(board, &mut frames.scratch).await {
                    blend_onionskin(&mut frames.onionskin, &frames.last, &frames.scratch);
                    board.blit(&frames.onionskin).await;
                }
            }
            CaptureMode::GameBoy => {
                if capture(board, &mut frames.scratch).await {
                    dither_gameboy(&mut frames.last, &frames.scratch);
                    board.blit(&frames.last).await;
                }
            }
            CaptureMode::Timelapse => {
                if capture(board, &mut frames.scratch).await {
                    board.blit(&frames.scratch).await;
                }
                match self.timelapse.poll(board.now_secs()) {
                    TimelapsePoll::Idle => {
                        board.set_timelapse_status(TimelapseStatus::Stopped).await;
                    }
                    TimelapsePoll::Waiting { remaining } => {
                        board
                            .set_timelapse_status(TimelapseStatus::Waiting { remaining })
                            .await;
                    }
                    TimelapsePoll::Due => {
                        snap_jpeg(board).await;
                        self.timelapse
                            .rearm(board.now_secs(), board.timelapse_interval_secs());
                    }
                }
            }
            _ => {
                if capture(board, &mut frames.scratch).await {
                    board.blit(&frames.scratch).await;
                }
            }
        }
        if mode != CaptureMode::Timelapse {
            board.set_timelapse_status(TimelapseStatus::Hidden).await;
        }
    }

    async fn on_shutter<B: CameraBoard>(
        &mut self,
        board: &mut B,
        frames: &mut CameraFrames<'_>,
        mode: CaptureMode,
    ) {
        match mode {
            CaptureMode::StopMotion => {
                // The fresh still becomes the next onionskin underlayer.
                if capture(board, &mut frames.last).await {
                    self.stop_motion_frames += 1;
                }
                snap_jpeg(board).await;
            }
            CaptureMode::GameBoy => {
                if let Err(err) = board.store_bitmap(&frames.last).await {
                    warn!("bitmap save failed: {}", err);
                    show_still_error(board, err).await;
                }
            }
            CaptureMode::Clip => record_clip(board).await,
            CaptureMode::Jpeg => {
                board.tone(200, 100).await;
                snap_jpeg(board).await;
            }
            CaptureMode::Timelapse | CaptureMode::Preview => {}
        }
    }
}

/// Capture into `frame`; a failure is logged and skips this frame.
async fn capture<B: CameraBoard>(board: &mut B, frame: &mut FrameBuf<'_>) -> bool {
    match board.capture_into(frame).await {
        Ok(()) => true,
        Err(err) => {
            warn!("frame capture failed: {}", err);
            false
        }
    }
}

/// Shared JPEG still path: `Snap!`, capture, error messages.
async fn snap_jpeg<B: CameraBoard>(board: &mut B) {
    board.display_message("Snap!", MessageKind::Success).await;
    if let Err(err) = board.capture_jpeg().await {
        warn!("still capture failed: {}", err);
        show_still_error(board, err).await;
    }
}

async fn show_still_error<B: CameraBoard>(board: &mut B, err: StillError) {
    let text = match err {
        StillError::Storage(_) => "Error\nNo SD Card",
        StillError::Capture(_) => "Failed",
    };
    board.display_message(text, MessageKind::Error).await;
    board.delay_ms(MESSAGE_HOLD_MS).await;
}

/// The whole hold-to-record clip, shutter press to finished file.
async fn record_clip<B: CameraBoard>(board: &mut B) {
    if let Err(err) = board.begin_clip().await {
        warn!("clip open failed: {}", err);
        show_still_error(board, err).await;
        return;
    }
    board.set_mode_banner(Some("RECORDING")).await;
    let mut frames_taken = 0u32;
    let mut failure = None;
    while frames_taken < CLIP_MIN_FRAMES || board.shutter_held() {
        match board.record_clip_frame().await {
            Ok(()) => frames_taken += 1,
            Err(err) => {
                warn!("clip frame failed: {}", err);
                failure = Some(err);
                break;
            }
        }
    }
    let stats = board.finish_clip().await;
    board.set_mode_banner(None).await;
    match (failure, stats) {
        (None, Ok(stats)) => {
            info!("clip finished: {} frames, {} bytes", stats.frames, stats.bytes);
        }
        (Some(err), _) => show_still_error(board, err).await,
        (None, Err(err)) => {
            warn!("clip close failed: {}", err);
            show_still_error(board, err).await;
        }
    }
}

/// Mount flow after a card-insertion edge: up to [`MOUNT_ATTEMPTS`]
/// tries, then give up visibly. Both outcomes hold for
/// [`MESSAGE_HOLD_MS`] so the card settles before the next capture.
async fn remount_card<B: CameraBoard>(board: &mut B) {
    board
        .display_message("Mounting\nSD Card", MessageKind::Info)
        .await;
    for attempt in 1..=MOUNT_ATTEMPTS {
        match board.mount_sd().await {
            Ok(()) => {
                info!("SD card mounted");
                board.delay_ms(MESSAGE_HOLD_MS).await;
                return;
            }
            Err(err) => {
                warn!("mount attempt {} failed: {}", attempt, err);
                board.delay_ms(MOUNT_RETRY_MS).await;
            }
        }
    }
    board
        .display_message("SD Card\nFailed!", MessageKind::Error)
        .await;
    board.delay_ms(MESSAGE_HOLD_MS).await;
}
