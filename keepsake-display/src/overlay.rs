//! Status overlay state and rendering.
//!
//! The camera redraws the preview every frame, wiping whatever text was
//! on screen, so the overlay is kept as a plain [`OverlayState`]
//! snapshot that [`render_overlay`] re-draws on top of each blit. The
//! snapshot is `PartialEq` so callers can skip redraws of message-only
//! screens that did not change.

use core::fmt::Write;

use embedded_graphics::{
    mono_font::{
        ascii::{FONT_6X10, FONT_9X15},
        MonoTextStyle,
    },
    pixelcolor::Rgb565,
    prelude::*,
    text::{Alignment, Text},
};
use heapless::String;

// ── OverlayConfig ────────────────────────────────────────────────────────

/// Layout geometry for the overlay.
///
/// All geometry lives here. [`OverlayConfig::default()`] reproduces the
/// 240×240 panel layout: a one-line status bar along the bottom edge
/// and a centred message block.
pub struct OverlayConfig {
    /// Total display width in pixels. Default: 240.
    pub display_width: u32,
    /// Total display height in pixels. Default: 240.
    pub display_height: u32,
    /// Horizontal inset of the status bar tags. Default: 4.
    pub margin_x: i32,
    /// Baseline of the status bar text. Default: 234.
    pub bar_y: i32,
    /// Baseline of the first message line. Default: 104.
    pub message_y: i32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            display_width: 240,
            display_height: 240,
            margin_x: 4,
            bar_y: 234,
            message_y: 104,
        }
    }
}

// ── OverlayState ─────────────────────────────────────────────────────────

/// Snapshot of everything drawn on top of the camera preview.
///
/// Strings are stored as null-padded UTF-8 byte buffers, silently
/// truncated on write; an empty field is not drawn at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayState {
    /// Capture-mode tag, bottom right (`"JPEG"`, `"RECORDING"`, ...).
    mode_tag: [u8; 12],
    /// Selected-setting tag, bottom left (`"640x480"`, `"LED +2"`, ...).
    setting_tag: [u8; 16],
    /// Time-lapse field, bottom centre (`"OFF"`, `"42s"`, ...).
    lapse_text: [u8; 12],
    /// Centred message block; newlines start new lines.
    message: [u8; 96],
    /// Color of the message block.
    pub message_color: Rgb565,
}

impl Default for OverlayState {
    fn default() -> Self {
        Self {
            mode_tag: [0; 12],
            setting_tag: [0; 16],
            lapse_text: [0; 12],
            message: [0; 96],
            message_color: Rgb565::WHITE,
        }
    }
}

impl OverlayState {
    pub fn set_mode_tag(&mut self, tag: &str) {
        write_field(&mut self.mode_tag, tag);
    }

    pub fn set_setting_tag(&mut self, tag: &str) {
        write_field(&mut self.setting_tag, tag);
    }

    pub fn set_lapse_text(&mut self, text: &str) {
        write_field(&mut self.lapse_text, text);
    }

    /// Format `remaining` seconds into the time-lapse field.
    pub fn set_lapse_countdown(&mut self, remaining: u64) {
        let mut text: String<12> = String::new();
        let _ = write!(text, "{}s", remaining);
        self.set_lapse_text(&text);
    }

    pub fn set_message(&mut self, text: &str, color: Rgb565) {
        write_field(&mut self.message, text);
        self.message_color = color;
    }

    pub fn clear_message(&mut self) {
        self.message = [0; 96];
    }

    pub fn mode_tag(&self) -> &str {
        field_str(&self.mode_tag)
    }

    pub fn setting_tag(&self) -> &str {
        field_str(&self.setting_tag)
    }

    pub fn lapse_text(&self) -> &str {
        field_str(&self.lapse_text)
    }

    pub fn message(&self) -> &str {
        field_str(&self.message)
    }
}

/// Truncating copy of `text` into a null-padded field.
fn write_field(field: &mut [u8], text: &str) {
    field.fill(0);
    let bytes = text.as_bytes();
    let mut len = bytes.len().min(field.len());
    // Back off to a character boundary so the field stays valid UTF-8.
    while len > 0 && !text.is_char_boundary(len) {
        len -= 1;
    }
    field[..len].copy_from_slice(&bytes[..len]);
}

/// The string up to the first null byte.
fn field_str(field: &[u8]) -> &str {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    core::str::from_utf8(&field[..end]).unwrap_or("")
}

// ── Rendering ────────────────────────────────────────────────────────────

/// Draw the overlay on top of whatever is already on `target`.
///
/// # Layout
///
/// ```text
/// ┌──────────────────────────────────────┐
/// │                                      │
/// │         Message (centred,            │  ← message_y
/// │          multiline, colored)         │
/// │                                      │
/// │ setting        lapse          mode   │  ← bar_y
/// └──────────────────────────────────────┘
/// ```
pub fn render_overlay<D>(
    target: &mut D,
    state: &OverlayState,
    config: &OverlayConfig,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let tag_style = MonoTextStyle::new(&FONT_6X10, Rgb565::WHITE);
    let centre_x = config.display_width as i32 / 2;

    let setting = state.setting_tag();
    if !setting.is_empty() {
        Text::new(setting, Point::new(config.margin_x, config.bar_y), tag_style)
            .draw(target)?;
    }

    let lapse = state.lapse_text();
    if !lapse.is_empty() {
        Text::with_alignment(
            lapse,
            Point::new(centre_x, config.bar_y),
            tag_style,
            Alignment::Center,
        )
        .draw(target)?;
    }

    let mode = state.mode_tag();
    if !mode.is_empty() {
        Text::with_alignment(
            mode,
            Point::new(config.display_width as i32 - config.margin_x, config.bar_y),
            tag_style,
            Alignment::Right,
        )
        .draw(target)?;
    }

    let message = state.message();
    if !message.is_empty() {
        let message_style = MonoTextStyle::new(&FONT_9X15, state.message_color);
        Text::with_alignment(
            message,
            Point::new(centre_x, config.message_y),
            message_style,
            Alignment::Center,
        )
        .draw(target)?;
    }

    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────────
