//! TFT driver and status overlay for the Keepsake camera's 240×240
//! ST7789 panel.
//!
//! This crate provides [`TftDriver`], a wrapper around the [`mipidsi`]
//! crate that pushes whole [`FrameBuf`] frames (at native size or
//! pixel-doubled), and [`render_overlay`], which re-draws the
//! [`OverlayState`] status text after every blit.
//!
//! # Quick Start
//!
//! ```ignore
//! use keepsake_display::{render_overlay, OverlayConfig, OverlayState, TftDriver};
//!
//! let mut tft = TftDriver::new(di, rst);
//! tft.init(&mut delay)?;
//!
//! let mut overlay = OverlayState::default();
//! overlay.set_mode_tag("JPEG");
//!
//! tft.blit_scaled2x(&frame)?;
//! if let Some(target) = tft.draw_target() {
//!     render_overlay(target, &overlay, &OverlayConfig::default()).ok();
//! }
//! ```
//!
//! # Crate Features
//!
//! - **`defmt`** *(default)* — structured logging via [`defmt`].
//!
//! [`FrameBuf`]: keepsake::frame::FrameBuf

#![no_std]

pub mod driver;
pub mod error;
pub mod overlay;

// ── Re-exports for convenience ───────────────────────────────────────────

pub use driver::{TftDriver, TFT_HEIGHT, TFT_WIDTH};
pub use error::TftError;
pub use overlay::{render_overlay, OverlayConfig, OverlayState};
