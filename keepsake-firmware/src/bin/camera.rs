//! keepsake camera
//!
//! Live-view firmware for the keepsake camera on the Raspberry Pi
//! Pico 2 W. Wires the library crates into one interactive loop:
//!
//! 1. The Arducam streams QQVGA RGB565 previews over SPI0; each frame
//!    is center-cropped to 120x120 and pixel-doubled onto the TFT.
//! 2. Buttons step capture modes and the settings carousel; the
//!    shutter drives stills, clips, time-lapse and stop-motion.
//! 3. Captures land on the SD card as numbered 8.3 files.
//!
//! The whole UI is a single task; the loop itself lives in
//! `keepsake-board` and only sees this board through its traits.

#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::pwm::{self, Pwm};
use embassy_rp::spi::{self, Spi};
use embassy_time::Delay;
use embedded_hal_bus::spi::{ExclusiveDevice, RefCellDevice};
use mipidsi::interface::SpiInterface;
use static_cell::{ConstStaticCell, StaticCell};
use {defmt_rtt as _, panic_probe as _};

use keepsake::frame::FrameBuf;
use keepsake_board::board::CameraBoard;
use keepsake_board::camera_app::{CameraApp, CameraFrames};
use keepsake_display::TftDriver;
use keepsake_firmware::inputs::InputPins;
use keepsake_firmware::leds::RingLight;
use keepsake_firmware::sensor::{CameraSensor, PREVIEW_BYTES};
use keepsake_firmware::storage::CardStorage;
use keepsake_firmware::tone::Piezo;
use keepsake_firmware::{
    KeepsakeBoard, SharedSpiBus, FRAME_HEIGHT, FRAME_WIDTH, SPI0_HZ, SPI1_HZ,
};

// ---------------------------------------------------------------------------
// Boot block
// ---------------------------------------------------------------------------

/// Tell the RP2350 Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

// ---------------------------------------------------------------------------
// Static storage
// ---------------------------------------------------------------------------

const FRAME_PIXELS: usize = FRAME_WIDTH * FRAME_HEIGHT;

/// Largest JPEG the sensor hands back at the HD setting.
const JPEG_BUF_LEN: usize = 128 * 1024;

/// Raw QQVGA RGB565 bytes straight off the sensor FIFO.
static PREVIEW_RAW: ConstStaticCell<[u8; PREVIEW_BYTES]> =
    ConstStaticCell::new([0; PREVIEW_BYTES]);

/// JPEG landing buffer for stills and clip frames.
static JPEG_BUF: ConstStaticCell<[u8; JPEG_BUF_LEN]> = ConstStaticCell::new([0; JPEG_BUF_LEN]);

/// The three composited frames the loop keeps alive all session.
static SCRATCH_PIXELS: ConstStaticCell<[u16; FRAME_PIXELS]> =
    ConstStaticCell::new([0; FRAME_PIXELS]);
static LAST_PIXELS: ConstStaticCell<[u16; FRAME_PIXELS]> =
    ConstStaticCell::new([0; FRAME_PIXELS]);
static ONION_PIXELS: ConstStaticCell<[u16; FRAME_PIXELS]> =
    ConstStaticCell::new([0; FRAME_PIXELS]);

/// Staging buffer for the mipidsi SPI interface.
static DISPLAY_BUF: ConstStaticCell<[u8; 512]> = ConstStaticCell::new([0; 512]);

/// SPI1, shared between the TFT and the SD card.
static SPI1_BUS: StaticCell<SharedSpiBus> = StaticCell::new();

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("keepsake camera starting");

    // —— Pin assignments ————————————————————————————————————————————————————
    // SPI0 (camera):  CLK → GP18, MOSI → GP19, MISO → GP16, CS → GP17
    // SPI1 (shared):  CLK → GP10, MOSI → GP11, MISO → GP12
    //   TFT: CS → GP13, DC → GP14, RST → GP15
    //   SD:  CS → GP9,  card detect → GP8 (closed to ground when seated)
    // Buttons (to ground, pulled up): shutter GP2, up GP3, down GP4,
    //   left GP5, right GP6, select GP7, ok GP22
    // Piezo → GP20 (PWM slice 2 A)
    // Ring light: R → GP26, G → GP27 (slice 5 A/B), B → GP28 (slice 6 A)
    // ———————————————————————————————————————————————————————————————————————

    // Camera, alone on SPI0.
    let mut cam_config = spi::Config::default();
    cam_config.frequency = SPI0_HZ;
    let cam_spi = Spi::new_blocking(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, cam_config);
    let cam_dev = ExclusiveDevice::new(cam_spi, Output::new(p.PIN_17, Level::High), Delay).unwrap();

    let mut sensor = CameraSensor::new(cam_dev, PREVIEW_RAW.take(), JPEG_BUF.take());
    if sensor.init().is_err() {
        error!("camera init failed; previews will error until power cycle");
    }

    // TFT and SD card share SPI1 behind a RefCell.
    let mut shared_config = spi::Config::default();
    shared_config.frequency = SPI1_HZ;
    let shared_spi = Spi::new_blocking(p.SPI1, p.PIN_10, p.PIN_11, p.PIN_12, shared_config);
    let spi1_bus = SPI1_BUS.init(RefCell::new(shared_spi));

    let tft_spi = RefCellDevice::new(spi1_bus, Output::new(p.PIN_13, Level::High), Delay).unwrap();
    let di = SpiInterface::new(tft_spi, Output::new(p.PIN_14, Level::Low), DISPLAY_BUF.take());
    let mut tft = TftDriver::new(di, Output::new(p.PIN_15, Level::High));
    let mut delay = Delay;
    if tft.init(&mut delay).is_err() {
        error!("tft init failed; running headless");
    }
    let _ = tft.clear();

    let sd_spi = RefCellDevice::new(spi1_bus, Output::new(p.PIN_9, Level::High), Delay).unwrap();
    let storage = CardStorage::new(sd_spi, spi1_bus);

    // Buttons and the card-detect switch.
    let inputs = InputPins::new(
        Input::new(p.PIN_2, Pull::Up),  // shutter
        Input::new(p.PIN_3, Pull::Up),  // up
        Input::new(p.PIN_4, Pull::Up),  // down
        Input::new(p.PIN_5, Pull::Up),  // left
        Input::new(p.PIN_6, Pull::Up),  // right
        Input::new(p.PIN_7, Pull::Up),  // select
        Input::new(p.PIN_22, Pull::Up), // ok
        Input::new(p.PIN_8, Pull::Up),  // card detect
    );

    let piezo = Piezo::new(Pwm::new_output_a(p.PWM_SLICE2, p.PIN_20, pwm::Config::default()));
    let ring = RingLight::new(
        Pwm::new_output_ab(p.PWM_SLICE5, p.PIN_26, p.PIN_27, pwm::Config::default()),
        Pwm::new_output_a(p.PWM_SLICE6, p.PIN_28, pwm::Config::default()),
    );

    let mut board = KeepsakeBoard::new(sensor, tft, storage, inputs, piezo, ring);

    // A card seated at power-on mounts now; later insertions are the
    // loop's card events.
    if board.card_present() {
        if board.mount_sd().await.is_err() {
            warn!("boot mount failed; reseat the card to retry");
        }
    }

    // —— Frames and loop ————————————————————————————————————————————————————

    let scratch = FrameBuf::new(FRAME_WIDTH, FRAME_HEIGHT, SCRATCH_PIXELS.take()).unwrap();
    let last = FrameBuf::new(FRAME_WIDTH, FRAME_HEIGHT, LAST_PIXELS.take()).unwrap();
    let onionskin = FrameBuf::new(FRAME_WIDTH, FRAME_HEIGHT, ONION_PIXELS.take()).unwrap();
    let mut frames = CameraFrames {
        scratch,
        last,
        onionskin,
    };

    info!("entering camera loop");
    let mut app = CameraApp::new();
    app.run(&mut board, &mut frames).await
}
