//! RGB565 frame buffers and the two in-place compositing operations.
//!
//! Pixels are native-endian RGB565 words; byte order on the wire is the
//! sensor and display adapters' concern. The camera loop keeps three
//! frames alive for the whole session (capture scratch, onionskin
//! underlayer, blend target), all backed by static buffers and rewritten
//! in place every iteration.

/// View over a caller-owned RGB565 pixel slice.
pub struct FrameBuf<'a> {
    width: usize,
    height: usize,
    pixels: &'a mut [u16],
}

impl<'a> FrameBuf<'a> {
    /// Wrap `pixels` as a `width x height` frame.
    ///
    /// Returns `None` if the slice holds fewer than `width * height`
    /// pixels; a longer slice is truncated to exactly that many.
    pub fn new(width: usize, height: usize, pixels: &'a mut [u16]) -> Option<Self> {
        let needed = width.checked_mul(height)?;
        if pixels.len() < needed {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels: &mut pixels[..needed],
        })
    }

    /// Frame width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The backing pixels, row-major.
    pub fn pixels(&self) -> &[u16] {
        self.pixels
    }

    /// Mutable access to the backing pixels, row-major.
    pub fn pixels_mut(&mut self) -> &mut [u16] {
        self.pixels
    }

    /// Set every pixel to `color`.
    pub fn fill(&mut self, color: u16) {
        self.pixels.fill(color);
    }

    /// Copy the overlapping pixel range from another frame.
    pub fn copy_from(&mut self, other: &FrameBuf<'_>) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        let len = self.pixels.len().min(other.pixels.len());
        self.pixels[..len].copy_from_slice(&other.pixels[..len]);
    }
}

// ── Compositing ──────────────────────────────────────────────────────────

/// Per-channel 50/50 average of two RGB565 pixels.
pub fn blend_rgb565(a: u16, b: u16) -> u16 {
    let r = (((a >> 11) & 0x1f) + ((b >> 11) & 0x1f)) >> 1;
    let g = (((a >> 5) & 0x3f) + ((b >> 5) & 0x3f)) >> 1;
    let b = ((a & 0x1f) + (b & 0x1f)) >> 1;
    (r << 11) | (g << 5) | b
}

/// Blend `under` and `over` 50/50 into `dst`, pixel by pixel.
///
/// All three frames must share dimensions (debug-asserted); in release a
/// mismatch only touches the overlapping range.
pub fn blend_onionskin(dst: &mut FrameBuf<'_>, under: &FrameBuf<'_>, over: &FrameBuf<'_>) {
    debug_assert_eq!((dst.width, dst.height), (under.width, under.height));
    debug_assert_eq!((dst.width, dst.height), (over.width, over.height));
    for ((d, &u), &o) in dst
        .pixels
        .iter_mut()
        .zip(under.pixels.iter())
        .zip(over.pixels.iter())
    {
        *d = blend_rgb565(u, o);
    }
}

/// The DMG screen palette, darkest to lightest, as RGB565.
pub const GAMEBOY_SHADES: [u16; 4] = [0x09c1, 0x3306, 0x8d61, 0x9de1];

/// 4x4 ordered-dither bias, row-major: Bayer cell value scaled to about
/// half a quantization step (plus or minus 30 out of 64).
const DITHER_BIAS: [[i32; 4]; 4] = [
    [-30, 2, -22, 10],
    [18, -14, 26, -6],
    [-18, 14, -26, 6],
    [30, -2, 22, -10],
];

/// Perceptual luminance of an RGB565 pixel, 0..=255.
pub fn luma565(px: u16) -> u8 {
    // Expand each field to 8 bits before the fixed-point weighting.
    let r5 = (px >> 11) & 0x1f;
    let g6 = (px >> 5) & 0x3f;
    let b5 = px & 0x1f;
    let r = ((r5 << 3) | (r5 >> 2)) as u32;
    let g = ((g6 << 2) | (g6 >> 4)) as u32;
    let b = ((b5 << 3) | (b5 >> 2)) as u32;
    ((77 * r + 150 * g + 29 * b) >> 8) as u8
}

/// Ordered-dither `src` onto the four-shade [`GAMEBOY_SHADES`] palette.
///
/// Same dimension contract as [`blend_onionskin`].
pub fn dither_gameboy(dst: &mut FrameBuf<'_>, src: &FrameBuf<'_>) {
    debug_assert_eq!((dst.width, dst.height), (src.width, src.height));
    let width = dst.width.min(src.width);
    let height = dst.height.min(src.height);
    for y in 0..height {
        for x in 0..width {
            let luma = luma565(src.pixels[y * src.width + x]) as i32;
            let biased = (luma + DITHER_BIAS[y & 3][x & 3]).clamp(0, 255);
            dst.pixels[y * dst.width + x] = GAMEBOY_SHADES[(biased >> 6) as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: u16 = 0xffff;

    fn frame(pixels: &mut [u16]) -> FrameBuf<'_> {
        FrameBuf::new(4, 4, pixels).unwrap()
    }

    #[test]
    fn new_rejects_short_slice() {
        let mut pixels = [0u16; 15];
        assert!(FrameBuf::new(4, 4, &mut pixels).is_none());
    }

    #[test]
    fn new_truncates_long_slice() {
        let mut pixels = [0u16; 20];
        let buf = FrameBuf::new(4, 4, &mut pixels).unwrap();
        assert_eq!(buf.pixels().len(), 16);
    }

    #[test]
    fn blend_of_equal_pixels_is_identity() {
        for px in [0x0000, WHITE, 0x4444, GAMEBOY_SHADES[2]] {
            assert_eq!(blend_rgb565(px, px), px);
        }
    }

    #[test]
    fn blend_averages_each_channel() {
        // Full red with full blue: both channels halve, green stays zero.
        let red = 0xf800;
        let blue = 0x001f;
        let mix = blend_rgb565(red, blue);
        assert_eq!((mix >> 11) & 0x1f, 0x0f);
        assert_eq!((mix >> 5) & 0x3f, 0);
        assert_eq!(mix & 0x1f, 0x0f);
    }

    #[test]
    fn blend_onionskin_fills_destination() {
        let mut a = [0xf800u16; 16];
        let mut b = [0x001fu16; 16];
        let mut d = [0u16; 16];
        let under = frame(&mut a);
        let over = frame(&mut b);
        let mut dst = frame(&mut d);
        blend_onionskin(&mut dst, &under, &over);
        let expected = blend_rgb565(0xf800, 0x001f);
        assert!(dst.pixels().iter().all(|&px| px == expected));
    }

    #[test]
    fn luma_is_monotonic_over_gray_ramp() {
        // Gray in RGB565: equal-ish fields. Brighter gray, larger luma.
        let dark = 0x2104; // r=4 g=8 b=4
        let mid = 0x8410; // r=16 g=32 b=16
        assert!(luma565(0x0000) < luma565(dark));
        assert!(luma565(dark) < luma565(mid));
        assert!(luma565(mid) < luma565(WHITE));
        assert_eq!(luma565(WHITE), 255);
    }

    #[test]
    fn dither_black_maps_to_darkest_shade() {
        let mut s = [0u16; 16];
        let mut d = [WHITE; 16];
        let src = frame(&mut s);
        let mut dst = frame(&mut d);
        dither_gameboy(&mut dst, &src);
        assert!(dst.pixels().iter().all(|&px| px == GAMEBOY_SHADES[0]));
    }

    #[test]
    fn dither_white_maps_to_lightest_shade() {
        let mut s = [WHITE; 16];
        let mut d = [0u16; 16];
        let src = frame(&mut s);
        let mut dst = frame(&mut d);
        dither_gameboy(&mut dst, &src);
        assert!(dst.pixels().iter().all(|&px| px == GAMEBOY_SHADES[3]));
    }

    #[test]
    fn dither_midtone_mixes_neighboring_shades() {
        let mut s = [0x8410u16; 16]; // mid gray, luma right at a threshold
        let mut d = [0u16; 16];
        let src = frame(&mut s);
        let mut dst = frame(&mut d);
        dither_gameboy(&mut dst, &src);
        let lighter = dst.pixels().iter().filter(|&&px| px == GAMEBOY_SHADES[2]).count();
        let darker = dst.pixels().iter().filter(|&&px| px == GAMEBOY_SHADES[1]).count();
        assert_eq!(lighter + darker, 16, "only adjacent shades appear");
        assert!(lighter > 0 && darker > 0, "dither must alternate");
    }

    #[test]
    fn copy_from_duplicates_pixels() {
        let mut a = [0x1234u16; 16];
        let mut b = [0u16; 16];
        let src = frame(&mut a);
        let mut dst = frame(&mut b);
        dst.copy_from(&src);
        assert_eq!(dst.pixels(), src.pixels());
    }
}
