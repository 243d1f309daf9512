//! SD card storage: numbered capture files and the settings file.
//!
//! Everything on the card uses FAT 8.3 names: `IMG_nnnn.JPG` stills,
//! `CLIPnnnn.MJP` motion-JPEG clips, `GBOYnnnn.BMP` dithered bitmaps,
//! and `SETTINGS.TXT`. Numbered names are allocated by scanning the
//! root directory once for the highest existing number of that kind.
//!
//! The card shares SPI1 with the TFT. Card initialisation needs a slow
//! clock, so [`CardStorage::mount()`] briefly drops the shared bus to
//! 400 kHz and restores it afterwards.

use core::fmt::Write;

use embassy_time::Delay;
use embedded_sdmmc::{
    Mode, RawDirectory, RawFile, SdCard, TimeSource, Timestamp, VolumeIdx, VolumeManager,
};
use heapless::String;
use keepsake::frame::FrameBuf;
use keepsake_board::board::ClipStats;
use keepsake_board::error::StorageError;

use crate::{SdSpi, SharedSpiBus, SPI1_HZ};

use defmt::{info, warn};

/// The settings file consumed and rewritten by the provisioner.
pub const SETTINGS_FILE: &str = "SETTINGS.TXT";

/// Bus clock during card initialisation.
const SD_INIT_HZ: u32 = 400_000;

/// Highest file number an 8.3 name with a four-digit suffix can hold.
const MAX_FILE_NUMBER: u32 = 9999;

/// Bytes in the BMP file header: 14 file header + 40 info header +
/// three 4-byte RGB565 channel masks.
const BMP_HEADER_LEN: usize = 66;

/// The card has no clock; timestamps on written files are all epoch.
struct NullTime;

impl TimeSource for NullTime {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 0,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

/// One kind of numbered capture file.
#[derive(Clone, Copy)]
pub enum FileKind {
    Jpeg,
    Clip,
    Bitmap,
}

impl FileKind {
    fn prefix(self) -> &'static str {
        match self {
            FileKind::Jpeg => "IMG_",
            FileKind::Clip => "CLIP",
            FileKind::Bitmap => "GBOY",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            FileKind::Jpeg => "JPG",
            FileKind::Clip => "MJP",
            FileKind::Bitmap => "BMP",
        }
    }

    fn filename(self, number: u32) -> String<12> {
        let mut name = String::new();
        let _ = write!(name, "{}{:04}.{}", self.prefix(), number, self.extension());
        name
    }
}

struct OpenClip {
    file: RawFile,
    frames: u32,
    bytes: u32,
}

/// The SD card behind a [`VolumeManager`], plus the session flags the
/// loops ask about.
///
/// The volume and root directory handles stay open from `mount()` to
/// `unmount()`; per-file handles are opened and closed around each
/// capture, except the clip file which spans a recording.
pub struct CardStorage {
    volume_mgr: VolumeManager<SdCard<SdSpi, Delay>, NullTime>,
    bus: &'static SharedSpiBus,
    volume: Option<embedded_sdmmc::RawVolume>,
    dir: Option<RawDirectory>,
    clip: Option<OpenClip>,
    writable: bool,
}

impl CardStorage {
    /// Wraps the card's SPI device. Starts unmounted and read-only for
    /// settings; the provision binary flips writability after its boot
    /// probe.
    pub fn new(spi: SdSpi, bus: &'static SharedSpiBus) -> Self {
        Self {
            volume_mgr: VolumeManager::new(SdCard::new(spi, Delay), NullTime),
            bus,
            volume: None,
            dir: None,
            clip: None,
            writable: false,
        }
    }

    /// Whether this session may rewrite the settings file.
    pub fn writable(&self) -> bool {
        self.writable
    }

    pub fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }

    /// (Re-)initialise the card and open volume 0 and its root.
    pub fn mount(&mut self) -> Result<(), StorageError> {
        self.unmount();

        // Card init needs a slow clock; the TFT shares this bus, so
        // restore the run speed before surfacing any error.
        self.bus.borrow_mut().set_frequency(SD_INIT_HZ);
        self.volume_mgr.device().mark_card_uninit();
        let probed = self.volume_mgr.device().num_bytes();
        self.bus.borrow_mut().set_frequency(SPI1_HZ);
        let size = probed.map_err(|_| StorageError::NoCard)?;

        let volume = self
            .volume_mgr
            .open_raw_volume(VolumeIdx(0))
            .map_err(map_fs)?;
        let dir = match self.volume_mgr.open_root_dir(volume) {
            Ok(dir) => dir,
            Err(err) => {
                let _ = self.volume_mgr.close_volume(volume);
                return Err(map_fs(err));
            }
        };
        info!("card mounted, {} MiB", size / (1024 * 1024));
        self.volume = Some(volume);
        self.dir = Some(dir);
        Ok(())
    }

    /// Drop every open handle. Safe when already unmounted; close
    /// failures on a yanked card are logged and swallowed.
    pub fn unmount(&mut self) {
        if let Some(clip) = self.clip.take() {
            if self.volume_mgr.close_file(clip.file).is_err() {
                warn!("clip handle lost with the card");
            }
        }
        if let Some(dir) = self.dir.take() {
            let _ = self.volume_mgr.close_dir(dir);
        }
        if let Some(volume) = self.volume.take() {
            let _ = self.volume_mgr.close_volume(volume);
        }
    }

    fn root(&self) -> Result<RawDirectory, StorageError> {
        self.dir.ok_or(StorageError::NotMounted)
    }

    /// Highest existing number of `kind` in the root, scanned in one
    /// directory pass.
    fn next_number(&mut self, kind: FileKind) -> Result<u32, StorageError> {
        let dir = self.root()?;
        let prefix = kind.prefix().as_bytes();
        let extension = kind.extension().as_bytes();
        let mut highest: Option<u32> = None;
        self.volume_mgr
            .iterate_dir(dir, |entry| {
                if entry.name.extension() != extension {
                    return;
                }
                let base = entry.name.base_name();
                if base.len() != 8 || !base.starts_with(prefix) {
                    return;
                }
                if let Some(number) = parse_digits(&base[prefix.len()..]) {
                    highest = Some(highest.map_or(number, |h| h.max(number)));
                }
            })
            .map_err(map_fs)?;
        match highest {
            None => Ok(0),
            Some(n) if n < MAX_FILE_NUMBER => Ok(n + 1),
            Some(_) => Err(StorageError::Full),
        }
    }

    /// Create the next numbered file of `kind` in the root.
    fn create_numbered(&mut self, kind: FileKind) -> Result<RawFile, StorageError> {
        let dir = self.root()?;
        let name = kind.filename(self.next_number(kind)?);
        let file = self
            .volume_mgr
            .open_file_in_dir(dir, name.as_str(), Mode::ReadWriteCreate)
            .map_err(map_fs)?;
        info!("writing {}", name.as_str());
        Ok(file)
    }

    /// Store one JPEG still as the next `IMG_nnnn.JPG`.
    pub fn write_jpeg(&mut self, jpeg: &[u8]) -> Result<(), StorageError> {
        let file = self.create_numbered(FileKind::Jpeg)?;
        let wrote = self.volume_mgr.write(file, jpeg).map_err(map_fs);
        let closed = self.volume_mgr.close_file(file).map_err(map_fs);
        wrote.and(closed)
    }

    /// Open the next `CLIPnnnn.MJP` for frame appends.
    pub fn begin_clip(&mut self) -> Result<(), StorageError> {
        if self.clip.is_some() {
            warn!("clip already open");
            return Err(StorageError::Filesystem);
        }
        let file = self.create_numbered(FileKind::Clip)?;
        self.clip = Some(OpenClip {
            file,
            frames: 0,
            bytes: 0,
        });
        Ok(())
    }

    /// Append one JPEG frame to the open clip.
    pub fn append_clip_frame(&mut self, jpeg: &[u8]) -> Result<(), StorageError> {
        let clip = self.clip.as_mut().ok_or(StorageError::Filesystem)?;
        self.volume_mgr.write(clip.file, jpeg).map_err(map_fs)?;
        clip.frames += 1;
        clip.bytes += jpeg.len() as u32;
        Ok(())
    }

    /// Close the open clip, if any, and report what it holds.
    pub fn finish_clip(&mut self) -> Result<ClipStats, StorageError> {
        match self.clip.take() {
            None => Ok(ClipStats::default()),
            Some(clip) => {
                self.volume_mgr.close_file(clip.file).map_err(map_fs)?;
                Ok(ClipStats {
                    frames: clip.frames,
                    bytes: clip.bytes,
                })
            }
        }
    }

    /// Store `frame` as the next `GBOYnnnn.BMP`: 16-bit RGB565 with
    /// channel masks, rows top-down.
    pub fn write_bitmap(&mut self, frame: &FrameBuf<'_>) -> Result<(), StorageError> {
        // Row stride must stay 4-byte aligned without padding.
        debug_assert!(frame.width() % 2 == 0);
        let file = self.create_numbered(FileKind::Bitmap)?;
        let wrote = self.write_bitmap_rows(file, frame);
        let closed = self.volume_mgr.close_file(file).map_err(map_fs);
        wrote.and(closed)
    }

    fn write_bitmap_rows(&mut self, file: RawFile, frame: &FrameBuf<'_>) -> Result<(), StorageError> {
        let header = bmp_header(frame.width() as u32, frame.height() as u32);
        self.volume_mgr.write(file, &header).map_err(map_fs)?;
        let mut row = [0u8; 2 * crate::FRAME_WIDTH];
        let row_bytes = 2 * frame.width();
        for row_pixels in frame.pixels().chunks(frame.width()) {
            for (px, out) in row_pixels.iter().zip(row.chunks_exact_mut(2)) {
                out.copy_from_slice(&px.to_le_bytes());
            }
            self.volume_mgr.write(file, &row[..row_bytes]).map_err(map_fs)?;
        }
        Ok(())
    }

    /// Read `SETTINGS.TXT` into `buf`; a missing file reads as empty.
    pub fn read_settings(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        let dir = self.root()?;
        let entry = match self.volume_mgr.find_directory_entry(dir, SETTINGS_FILE) {
            Ok(entry) => entry,
            Err(embedded_sdmmc::Error::NotFound) => return Ok(0),
            Err(err) => return Err(map_fs(err)),
        };
        if entry.size as usize > buf.len() {
            warn!("settings file truncated to {} bytes", buf.len());
        }
        let want = (entry.size as usize).min(buf.len());

        let file = self
            .volume_mgr
            .open_file_in_dir(dir, SETTINGS_FILE, Mode::ReadOnly)
            .map_err(map_fs)?;
        let mut got = 0;
        let outcome = loop {
            if got >= want {
                break Ok(());
            }
            match self.volume_mgr.read(file, &mut buf[got..want]) {
                Ok(0) => break Ok(()),
                Ok(n) => got += n,
                Err(err) => break Err(map_fs(err)),
            }
        };
        let closed = self.volume_mgr.close_file(file).map_err(map_fs);
        outcome.and(closed).map(|_| got)
    }

    /// Replace `SETTINGS.TXT` wholesale.
    pub fn write_settings(&mut self, text: &str) -> Result<(), StorageError> {
        if !self.writable {
            return Err(StorageError::ReadOnly);
        }
        let dir = self.root()?;
        let file = self
            .volume_mgr
            .open_file_in_dir(dir, SETTINGS_FILE, Mode::ReadWriteCreateOrTruncate)
            .map_err(map_fs)?;
        let wrote = self.volume_mgr.write(file, text.as_bytes()).map_err(map_fs);
        let closed = self.volume_mgr.close_file(file).map_err(map_fs);
        wrote.and(closed)
    }
}

/// Collapse the filesystem error tree onto the loop-facing taxonomy.
fn map_fs<E>(err: embedded_sdmmc::Error<E>) -> StorageError {
    match err {
        embedded_sdmmc::Error::DeviceError(_) => StorageError::NoCard,
        _ => StorageError::Filesystem,
    }
}

/// Parse an exact run of ASCII digits.
fn parse_digits(digits: &[u8]) -> Option<u32> {
    let mut value: u32 = 0;
    for &d in digits {
        if !d.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add((d - b'0') as u32)?;
    }
    Some(value)
}

/// BMP file + info header for a top-down 16-bit RGB565 image.
fn bmp_header(width: u32, height: u32) -> [u8; BMP_HEADER_LEN] {
    let image_bytes = width * 2 * height;
    let mut h = [0u8; BMP_HEADER_LEN];
    h[0] = b'B';
    h[1] = b'M';
    put_u32(&mut h, 2, BMP_HEADER_LEN as u32 + image_bytes);
    put_u32(&mut h, 10, BMP_HEADER_LEN as u32); // pixel data offset
    put_u32(&mut h, 14, 40); // BITMAPINFOHEADER
    put_u32(&mut h, 18, width);
    put_u32(&mut h, 22, (height as i32).wrapping_neg() as u32); // negative height: top-down
    put_u16(&mut h, 26, 1); // planes
    put_u16(&mut h, 28, 16); // bits per pixel
    put_u32(&mut h, 30, 3); // BI_BITFIELDS
    put_u32(&mut h, 34, image_bytes);
    put_u32(&mut h, 38, 2835); // 72 dpi
    put_u32(&mut h, 42, 2835);
    put_u32(&mut h, 54, 0xF800); // red mask
    put_u32(&mut h, 58, 0x07E0); // green mask
    put_u32(&mut h, 62, 0x001F); // blue mask
    h
}

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}
