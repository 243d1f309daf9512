//! Hardware support for the keepsake camera on a Pico 2 W (RP2350).
//!
//! Two binaries share this crate: `camera` runs the live-view capture
//! loop, `provision` runs the QR Wi-Fi setup loop. Both build the same
//! [`KeepsakeBoard`] from the pin plan below and hand it to the loop
//! code in `keepsake-board`; only `provision` powers the radio.
//!
//! Bus layout: the camera owns SPI0; the TFT and the SD card share
//! SPI1 behind a `RefCell`, blocking and single-task, with the card
//! briefly dropping the bus clock during mount.

#![no_std]

pub mod board;
pub mod inputs;
pub mod leds;
pub mod qr;
pub mod radio;
pub mod sensor;
pub mod settings;
pub mod storage;
pub mod tone;

use core::cell::RefCell;

use embassy_rp::gpio::Output;
use embassy_rp::peripherals::{SPI0, SPI1};
use embassy_rp::spi::{Blocking, Spi};
use embassy_time::Delay;
use embedded_hal_bus::spi::{ExclusiveDevice, RefCellDevice};
use mipidsi::interface::SpiInterface;

pub use board::KeepsakeBoard;

/// Preview frame edge in pixels; doubled onto the 240x240 panel.
pub const FRAME_WIDTH: usize = 120;
pub const FRAME_HEIGHT: usize = 120;

/// Camera clock on SPI0.
pub const SPI0_HZ: u32 = 8_000_000;

/// Run clock of the shared SPI1 bus.
pub const SPI1_HZ: u32 = 16_000_000;

/// The camera has SPI0 to itself.
pub type CameraSpi = ExclusiveDevice<Spi<'static, SPI0, Blocking>, Output<'static>, Delay>;

/// TFT and SD card share SPI1; a `RefCell` is enough because both
/// sides run blocking transfers from the one task.
pub type SharedSpiBus = RefCell<Spi<'static, SPI1, Blocking>>;
pub type DisplaySpi = RefCellDevice<'static, Spi<'static, SPI1, Blocking>, Output<'static>, Delay>;
pub type SdSpi = RefCellDevice<'static, Spi<'static, SPI1, Blocking>, Output<'static>, Delay>;

/// The concrete panel driver behind the board facade.
pub type Tft =
    keepsake_display::TftDriver<SpiInterface<'static, DisplaySpi, Output<'static>>, Output<'static>>;
