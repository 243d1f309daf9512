//! Core TFT driver wrapping the `mipidsi` crate for the ST7789 panel.
//!
//! [`TftDriver`] manages the panel lifecycle: construction without bus
//! traffic, explicit initialisation, and full-frame pixel pushes from a
//! [`FrameBuf`].

use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use keepsake::frame::FrameBuf;
use mipidsi::interface::Interface;
use mipidsi::models::ST7789;
use mipidsi::options::ColorInversion;
use mipidsi::Builder;

use crate::error::TftError;

/// Panel width in pixels.
pub const TFT_WIDTH: u16 = 240;
/// Panel height in pixels.
pub const TFT_HEIGHT: u16 = 240;

/// Concrete display type used internally by [`TftDriver`].
type Display<DI, RST> = mipidsi::Display<DI, ST7789, RST>;

/// Driver for a 240×240 ST7789 TFT behind any `mipidsi` interface.
///
/// # Lifecycle
///
/// 1. [`TftDriver::new()`] — constructs the driver without any bus traffic.
/// 2. [`TftDriver::init()`] — sends the ST7789 initialisation sequence.
/// 3. Push frames with [`blit()`](Self::blit) or
///    [`blit_scaled2x()`](Self::blit_scaled2x); draw overlays through
///    [`draw_target()`](Self::draw_target).
///
/// # Example
///
/// ```no_run
/// # use keepsake_display::TftDriver;
/// # fn example<DI, RST>(di: DI, rst: RST, mut delay: impl embedded_hal::delay::DelayNs)
/// # where
/// #     DI: mipidsi::interface::Interface<Word = u8>,
/// #     RST: embedded_hal::digital::OutputPin,
/// # {
/// let mut tft = TftDriver::new(di, rst);
/// tft.init(&mut delay).unwrap();
/// tft.clear().unwrap();
/// # }
/// ```
pub struct TftDriver<DI, RST>
where
    DI: Interface<Word = u8>,
    RST: OutputPin,
{
    /// Interface and reset pin, held until `init()` consumes them.
    parts: Option<(DI, RST)>,
    /// The underlying mipidsi display. `Some` after a successful
    /// `init()`; provides the not-initialised guard for every
    /// drawing method.
    display: Option<Display<DI, RST>>,
}

impl<DI, RST> TftDriver<DI, RST>
where
    DI: Interface<Word = u8>,
    RST: OutputPin,
{
    /// Construct an uninitialised driver.
    ///
    /// No bus traffic is generated. You **must** call
    /// [`init()`](Self::init) before any display operations.
    ///
    /// # Arguments
    /// * `di` — display interface (typically a `SpiInterface`).
    /// * `rst` — hardware reset pin.
    pub fn new(di: DI, rst: RST) -> Self {
        Self {
            parts: Some((di, rst)),
            display: None,
        }
    }

    /// Initialise the ST7789 hardware.
    ///
    /// Resets the panel and sends the initialisation command sequence.
    /// Must be called exactly once before any rendering operations.
    ///
    /// # Errors
    ///
    /// Returns [`TftError::InitFailed`] if the panel does not respond,
    /// or [`TftError::NotInitialized`] if `init()` was already called.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Result<(), TftError> {
        let (di, rst) = self.parts.take().ok_or(TftError::NotInitialized)?;
        let display = Builder::new(ST7789, di)
            .display_size(TFT_WIDTH, TFT_HEIGHT)
            .invert_colors(ColorInversion::Inverted)
            .reset_pin(rst)
            .init(delay)
            .map_err(|_| TftError::InitFailed)?;
        self.display = Some(display);
        Ok(())
    }

    /// Push a full frame to the panel at native size, anchored top-left.
    ///
    /// # Errors
    ///
    /// Returns [`TftError::NotInitialized`] before [`init()`](Self::init),
    /// or [`TftError::Interface`] on a bus-level failure.
    pub fn blit(&mut self, frame: &FrameBuf<'_>) -> Result<(), TftError> {
        let display = self.display.as_mut().ok_or(TftError::NotInitialized)?;
        let (w, h) = (frame.width() as u16, frame.height() as u16);
        let colors = frame.pixels().iter().map(|&px| Rgb565::from(RawU16::new(px)));
        display
            .set_pixels(0, 0, w - 1, h - 1, colors)
            .map_err(|_| TftError::Interface)
    }

    /// Push a frame pixel-doubled to twice its size, anchored top-left.
    ///
    /// A 120×120 preview frame fills the whole 240×240 panel this way
    /// without a scaled intermediate buffer: each source row is sent
    /// twice with every pixel repeated.
    ///
    /// # Errors
    ///
    /// Returns [`TftError::NotInitialized`] before [`init()`](Self::init),
    /// or [`TftError::Interface`] on a bus-level failure.
    pub fn blit_scaled2x(&mut self, frame: &FrameBuf<'_>) -> Result<(), TftError> {
        let display = self.display.as_mut().ok_or(TftError::NotInitialized)?;
        let (w, h) = (frame.width() as u16, frame.height() as u16);
        let colors = frame
            .pixels()
            .chunks(frame.width())
            .flat_map(|row| [row, row])
            .flat_map(|row| {
                row.iter().flat_map(|&px| {
                    let color = Rgb565::from(RawU16::new(px));
                    [color, color]
                })
            });
        display
            .set_pixels(0, 0, 2 * w - 1, 2 * h - 1, colors)
            .map_err(|_| TftError::Interface)
    }

    /// Fill the whole panel with black.
    ///
    /// # Errors
    ///
    /// Returns [`TftError::NotInitialized`] before [`init()`](Self::init),
    /// or [`TftError::Interface`] on a bus-level failure.
    pub fn clear(&mut self) -> Result<(), TftError> {
        let display = self.display.as_mut().ok_or(TftError::NotInitialized)?;
        display.clear(Rgb565::BLACK).map_err(|_| TftError::Interface)
    }

    /// Returns a mutable reference to the underlying `mipidsi` display,
    /// allowing direct use of `embedded-graphics` [`DrawTarget`] APIs
    /// (the overlay renderer draws through this).
    ///
    /// Returns `None` if the driver has not been initialised.
    ///
    /// [`DrawTarget`]: embedded_graphics::draw_target::DrawTarget
    pub fn draw_target(&mut self) -> Option<&mut Display<DI, RST>> {
        self.display.as_mut()
    }

    /// Check whether the panel has been successfully initialised.
    ///
    /// No bus traffic is generated.
    pub fn is_initialized(&self) -> bool {
        self.display.is_some()
    }
}
