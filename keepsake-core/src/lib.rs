//! Pure application state and algorithms for the Keepsake camera.
//!
//! Everything in this crate is `no_std` and allocation-free: the capture
//! modes, the settings carousel, the time-lapse schedule, RGB565 frame
//! compositing (the stop-motion onionskin blend and the game-boy dither),
//! `WIFI:` QR payload parsing, and the on-card settings file. Nothing in
//! here touches hardware; the firmware crates feed these types with real
//! inputs and the test suites drive them on the host.
//!
//! # Quick Start
//!
//! ```
//! use keepsake::{CaptureMode, SettingsCarousel, Timelapse, TimelapsePoll};
//!
//! let mut carousel = SettingsCarousel::new();
//! carousel.next(CaptureMode::Jpeg);
//!
//! let mut lapse = Timelapse::default();
//! lapse.arm(100, 30);
//! assert_eq!(lapse.poll(140), TimelapsePoll::Due);
//! ```
//!
//! # Crate Features
//!
//! - **`defmt`** — derive [`defmt::Format`] on the public types so the
//!   firmware can log them.

#![no_std]

pub mod config;
pub mod frame;
pub mod mode;
pub mod settings;
pub mod timelapse;
pub mod wifi;

// Re-export the types almost every consumer needs.
pub use config::{ConfigError, SettingsFile, Value};
pub use frame::{blend_onionskin, dither_gameboy, FrameBuf};
pub use mode::CaptureMode;
pub use settings::{Setting, SettingsCarousel};
pub use timelapse::{Timelapse, TimelapsePoll};
pub use wifi::{WifiCredentials, WifiParseError, WifiSecurity};
