//! keepsake provision
//!
//! QR Wi-Fi setup firmware for the Pico 2 W. Runs instead of the camera
//! binary when the card needs network credentials:
//!
//! 1. After a 2.5 s settle, the raw shutter level decides whether this
//!    session may rewrite `SETTINGS.TXT` (held → writable).
//! 2. The Arducam streams previews; every frame is scanned for a QR
//!    code. `WIFI:` payloads merge credentials into the settings file.
//! 3. A short countdown offers joining the scanned network immediately
//!    through the on-board CYW43439.
//!
//! The radio firmware blobs live at fixed flash offsets; see
//! `firmware/README.md`.

#![no_std]
#![no_main]

use core::cell::RefCell;

use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::block::ImageDef;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::{self, Pio};
use embassy_rp::pwm::{self, Pwm};
use embassy_rp::spi::{self, Spi};
use embassy_time::{Delay, Timer};
use embedded_hal_bus::spi::{ExclusiveDevice, RefCellDevice};
use mipidsi::interface::SpiInterface;
use static_cell::{ConstStaticCell, StaticCell};
use {defmt_rtt as _, panic_probe as _};

use keepsake::frame::FrameBuf;
use keepsake_board::board::CameraBoard;
use keepsake_board::provisioner::Provisioner;
use keepsake_display::TftDriver;
use keepsake_firmware::inputs::InputPins;
use keepsake_firmware::leds::RingLight;
use keepsake_firmware::qr;
use keepsake_firmware::radio::{self, cyw43_task, Radio};
use keepsake_firmware::sensor::{CameraSensor, PREVIEW_BYTES};
use keepsake_firmware::storage::CardStorage;
use keepsake_firmware::tone::Piezo;
use keepsake_firmware::{
    KeepsakeBoard, SharedSpiBus, FRAME_HEIGHT, FRAME_WIDTH, SPI0_HZ, SPI1_HZ,
};

// ---------------------------------------------------------------------------
// Boot block and interrupt binding
// ---------------------------------------------------------------------------

/// Tell the RP2350 Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

// The CYW43439 hangs off PIO0's state machine 0.
bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => pio::InterruptHandler<PIO0>;
});

// ---------------------------------------------------------------------------
// Static storage
// ---------------------------------------------------------------------------

const FRAME_PIXELS: usize = FRAME_WIDTH * FRAME_HEIGHT;

/// Settle time before the writability probe samples the shutter.
const WRITE_PROBE_SETTLE_MS: u64 = 2_500;

/// Raw QQVGA RGB565 bytes straight off the sensor FIFO.
static PREVIEW_RAW: ConstStaticCell<[u8; PREVIEW_BYTES]> =
    ConstStaticCell::new([0; PREVIEW_BYTES]);

/// The one frame the scan loop captures into and displays.
static SCAN_PIXELS: ConstStaticCell<[u16; FRAME_PIXELS]> =
    ConstStaticCell::new([0; FRAME_PIXELS]);

/// Staging buffer for the mipidsi SPI interface.
static DISPLAY_BUF: ConstStaticCell<[u8; 512]> = ConstStaticCell::new([0; 512]);

/// SPI1, shared between the TFT and the SD card.
static SPI1_BUS: StaticCell<SharedSpiBus> = StaticCell::new();

/// cyw43 driver state, alive as long as the runner task.
static CYW43_STATE: StaticCell<cyw43::State> = StaticCell::new();

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("keepsake provision starting");

    // rqrr allocates during detection; nothing else does.
    qr::init_heap();

    // —— Pin assignments ————————————————————————————————————————————————————
    // Identical to the camera binary, plus the Pico 2 W radio pins
    // (fixed by the board): PWR GP23, CS GP25, DIO GP24, CLK GP29.
    // ———————————————————————————————————————————————————————————————————————

    // Camera, alone on SPI0.
    let mut cam_config = spi::Config::default();
    cam_config.frequency = SPI0_HZ;
    let cam_spi = Spi::new_blocking(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, cam_config);
    let cam_dev = ExclusiveDevice::new(cam_spi, Output::new(p.PIN_17, Level::High), Delay).unwrap();

    // Provisioning never captures stills, so no JPEG buffer.
    let mut sensor = CameraSensor::new(cam_dev, PREVIEW_RAW.take(), &mut []);
    if sensor.init().is_err() {
        error!("camera init failed; scanning cannot work");
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

    if board.card_present() {
        if board.mount_sd().await.is_err() {
            warn!("boot mount failed; settings will not load");
        }
    }

    // —— Session writability ————————————————————————————————————————————————

    // Hold the shutter through boot to allow settings rewrites this
    // session. The settle gives the user time to be deliberate.
    Timer::after_millis(WRITE_PROBE_SETTLE_MS).await;
    let writable = board.shutter_level_held();
    board.storage_mut().set_writable(writable);
    info!("settings store writable: {}", writable);

    // —— Radio bring-up —————————————————————————————————————————————————————

    let pwr = Output::new(p.PIN_23, Level::Low);
    let cs = Output::new(p.PIN_25, Level::High);
    let mut pio = Pio::new(p.PIO0, Irqs);
    let radio_spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        p.PIN_24,
        p.PIN_29,
        p.DMA_CH0,
    );
    let state = CYW43_STATE.init(cyw43::State::new());
    let (_net_device, mut control, runner) = cyw43::new(state, pwr, radio_spi, radio::firmware()).await;
    spawner.spawn(cyw43_task(runner)).unwrap();
    control.init(radio::clm()).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;
    board.attach_radio(Radio::new(control));

    // —— Scan loop ——————————————————————————————————————————————————————————

    let mut frame = FrameBuf::new(FRAME_WIDTH, FRAME_HEIGHT, SCAN_PIXELS.take()).unwrap();

    info!("entering provisioning loop");
    let mut provisioner = Provisioner::new();
    provisioner.run(&mut board, &mut frame).await
}
