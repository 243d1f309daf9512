//! QR detection over a preview frame.
//!
//! `rqrr` wants an allocator, so this module also owns the global heap.
//! Only the provision binary allocates; it must call [`init_heap`] once
//! before the first scan. Detection runs on the same 120x120 preview
//! the screen shows, greyscaled pixel by pixel on the way in.

use defmt::{debug, warn};
use embedded_alloc::LlffHeap;
use keepsake::frame::{luma565, FrameBuf};
use keepsake_board::QrPayload;

#[global_allocator]
static HEAP: LlffHeap = LlffHeap::empty();

/// Detection working set for a 120x120 frame peaks well under this.
const HEAP_SIZE: usize = 96 * 1024;

/// Hand [`HEAP_SIZE`] bytes of RAM to the allocator. Call once, before
/// anything scans.
pub fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    unsafe { HEAP.init(core::ptr::addr_of_mut!(HEAP_MEM) as usize, HEAP_SIZE) }
}

/// Look for one QR code in `frame` and decode it.
///
/// Multiple codes in view decode in grid-detection order; only the
/// first that decodes cleanly is returned. Oversized payloads are cut
/// at the buffer's capacity.
pub fn scan(frame: &FrameBuf<'_>) -> Option<QrPayload> {
    let width = frame.width();
    let pixels = frame.pixels();
    let mut image = rqrr::PreparedImage::prepare_from_greyscale(width, frame.height(), |x, y| {
        luma565(pixels[y * width + x])
    });
    let grids = image.detect_grids();
    if grids.is_empty() {
        return None;
    }
    debug!("qr: {} grid(s) in view", grids.len());
    for grid in grids {
        match grid.decode() {
            Ok((_, content)) => {
                let mut payload = QrPayload::new();
                for ch in content.chars() {
                    if payload.push(ch).is_err() {
                        warn!("qr payload truncated at {} bytes", payload.len());
                        break;
                    }
                }
                return Some(payload);
            }
            Err(_) => warn!("qr grid found but decode failed"),
        }
    }
    None
}
