//! Error taxonomy shared by the board facade and the loops.
//!
//! These are deliberately coarse. The loops only ever branch on whether a
//! fault came from the sensor or from storage (the two produce different
//! on-screen messages); everything finer-grained stays in the firmware's
//! log output.

/// Faults from the frame-capture path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureError {
    /// The sensor rejected the command or returned garbage.
    Sensor,
    /// The sensor produced no frame in time.
    Timeout,
}

/// Faults from the SD card and the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// No card in the slot.
    NoCard,
    /// Card present but not mounted.
    NotMounted,
    /// The session is read-only (boot-time decision).
    ReadOnly,
    /// The filesystem layer failed.
    Filesystem,
    /// No free space or no free file number.
    Full,
}

/// Faults from saving a still, clip frame, or bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StillError {
    Capture(CaptureError),
    Storage(StorageError),
}

impl From<CaptureError> for StillError {
    fn from(err: CaptureError) -> Self {
        StillError::Capture(err)
    }
}

impl From<StorageError> for StillError {
    fn from(err: StorageError) -> Self {
        StillError::Storage(err)
    }
}

/// Faults from the Wi-Fi radio collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// No radio fitted, or the chip stopped answering.
    NotResponding,
    /// Association with the network failed.
    JoinFailed,
}
