//! Error types for the TFT driver.

/// Errors that can occur during TFT display operations.
///
/// `mipidsi` errors are generic over the interface type, so they are
/// collapsed into [`TftError::Interface`] here to keep this enum
/// non-generic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TftError {
    /// An operation was attempted before [`TftDriver::init()`](crate::TftDriver::init)
    /// was called, or `init()` was called twice.
    NotInitialized,
    /// Display hardware did not respond to initialisation.
    InitFailed,
    /// Bus-level failure while talking to the panel.
    Interface,
}

#[cfg(feature = "defmt")]
impl defmt::Format for TftError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            TftError::NotInitialized => defmt::write!(f, "Not initialized"),
            TftError::InitFailed => defmt::write!(f, "Initialization failed"),
            TftError::Interface => defmt::write!(f, "Display interface error"),
        }
    }
}
