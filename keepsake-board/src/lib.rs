//! Hardware-agnostic camera application for the Keepsake handheld.
//!
//! This crate holds everything above the wires: the [`CameraBoard`]
//! facade the firmware implements, the debounced input model, and the
//! two top-level loops. [`CameraApp`] is the live camera (preview,
//! stills, clips, stop-motion, time-lapse); [`Provisioner`] is the
//! QR-driven Wi-Fi setup flow.
//!
//! # Quick Start
//!
//! ```ignore
//! use keepsake_board::{CameraApp, CameraFrames};
//!
//! // In your Embassy main, after bringing up the board:
//! let mut app = CameraApp::new();
//! app.run(&mut board, &mut frames).await
//!
//! // Thin task wrapper (Embassy tasks cannot be generic):
//! #[embassy_executor::task]
//! async fn camera_task(
//!     board: &'static mut KeepsakeBoard,
//!     frames: &'static mut CameraFrames<'static>,
//! ) {
//!     CameraApp::new().run(board, frames).await
//! }
//! ```
//!
//! Both loops talk to hardware only through traits, so the whole
//! application runs under `cargo test` on the host against a scripted
//! board double.
//!
//! # Crate Features
//!
//! - **`defmt`** — structured logging via [`defmt`]. Off by default so
//!   host tests build without a logger.

#![no_std]

// This must go FIRST so that the other modules see its macros.
mod fmt;

pub mod board;
pub mod buttons;
pub mod camera_app;
pub mod error;
pub mod provisioner;

#[cfg(test)]
mod testkit;

// ── Re-exports for convenience ───────────────────────────────────────────

pub use board::{
    AutofocusStatus, CameraBoard, ClipStats, MessageKind, QrPayload, QrScanner, SettingsStore,
    TimelapseStatus, WifiRadio,
};
pub use buttons::{ButtonEvents, CardEvent, Debouncer, Inputs};
pub use camera_app::{CameraApp, CameraFrames};
pub use error::{CaptureError, RadioError, StillError, StorageError};
pub use provisioner::{ProvisionRig, Provisioner};
