//! CYW43439 bring-up and station joins for the Pico 2 W.
//!
//! The radio firmware and CLM blobs are not baked into the image; they
//! are flashed once to fixed offsets and read back from memory-mapped
//! flash here. `firmware/README.md` has the flashing commands.

use cyw43::{Control, JoinOptions};
use cyw43_pio::PioSpi;
use defmt::{info, warn};
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::{DMA_CH0, PIO0};
use embassy_time::Timer;
use keepsake_board::error::RadioError;

/// Flash offset and size of `43439A0.bin`.
const FW_ADDR: usize = 0x1010_0000;
const FW_LEN: usize = 230_321;

/// Flash offset and size of `43439A0_clm.bin`.
const CLM_ADDR: usize = 0x1014_0000;
const CLM_LEN: usize = 4_752;

/// Settle time after dropping an association.
const RESET_SETTLE_MS: u64 = 100;

/// The radio firmware blob, read from its flash slot.
pub fn firmware() -> &'static [u8] {
    unsafe { core::slice::from_raw_parts(FW_ADDR as *const u8, FW_LEN) }
}

/// The CLM blob, read from its flash slot.
pub fn clm() -> &'static [u8] {
    unsafe { core::slice::from_raw_parts(CLM_ADDR as *const u8, CLM_LEN) }
}

/// The cyw43 driver half that must keep polling in its own task.
pub type RadioRunner = cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>;

#[embassy_executor::task]
pub async fn cyw43_task(runner: RadioRunner) -> ! {
    runner.run().await
}

/// Control half of the radio, narrowed to what provisioning needs.
pub struct Radio {
    control: Control<'static>,
}

impl Radio {
    pub fn new(control: Control<'static>) -> Self {
        Self { control }
    }

    /// Drop any current association and let the chip settle.
    pub async fn reset(&mut self) {
        self.control.leave().await;
        Timer::after_millis(RESET_SETTLE_MS).await;
    }

    /// Associate with `ssid`. An empty `psk` joins as an open network.
    pub async fn join(&mut self, ssid: &str, psk: &str) -> Result<(), RadioError> {
        let options = if psk.is_empty() {
            JoinOptions::new_open()
        } else {
            JoinOptions::new(psk.as_bytes())
        };
        match self.control.join(ssid, options).await {
            Ok(()) => {
                info!("joined {}", ssid);
                Ok(())
            }
            Err(err) => {
                warn!("join {} failed, status {}", ssid, err.status);
                Err(RadioError::JoinFailed)
            }
        }
    }
}
