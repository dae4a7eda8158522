//! # Error Types
//!
//! Custom error types for DS5W using `thiserror`.
//!
//! Every fallible operation in the library shares one taxonomy, exposed
//! numerically through [`ErrorCode`].

use thiserror::Error;

/// Numeric result codes shared by all operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    Ok = 0,
    Unknown = 1,
    InsufficientBuffer = 2,
    ExternalApi = 3,
    StackOverflow = 4,
    InvalidArguments = 5,
    NotSupported = 6,
    DeviceRemoved = 7,
    BluetoothCommunication = 8,
}

/// Main error type for DS5W
#[derive(Debug, Error)]
pub enum Ds5Error {
    /// Operation encountered an unknown error
    #[error("Unknown error")]
    Unknown,

    /// Caller supplied buffer is too small
    #[error("Insufficient buffer: need {required} bytes/entries, got {actual}")]
    InsufficientBuffer { required: usize, actual: usize },

    /// Unexpected failure reported by the OS HID stack
    #[error("External API error: {0}")]
    ExternalApi(String),

    /// Internal fixed-size buffer overrun guard tripped
    #[error("Internal buffer overrun")]
    StackOverflow,

    /// Invalid arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Capability not available
    #[error("Currently not supported: {0}")]
    NotSupported(String),

    /// Controller was unplugged or went out of range
    #[error("Device was removed")]
    DeviceRemoved,

    /// Bluetooth report framing or checksum failure
    #[error("Bluetooth communication error: {0}")]
    BluetoothCommunication(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Ds5Error {
    /// Map this error onto the shared numeric taxonomy.
    pub fn code(&self) -> ErrorCode {
        match self {
            Ds5Error::Unknown => ErrorCode::Unknown,
            Ds5Error::InsufficientBuffer { .. } => ErrorCode::InsufficientBuffer,
            Ds5Error::ExternalApi(_) | Ds5Error::Io(_) => ErrorCode::ExternalApi,
            Ds5Error::StackOverflow => ErrorCode::StackOverflow,
            Ds5Error::InvalidArguments(_) | Ds5Error::Config(_) => ErrorCode::InvalidArguments,
            Ds5Error::NotSupported(_) => ErrorCode::NotSupported,
            Ds5Error::DeviceRemoved => ErrorCode::DeviceRemoved,
            Ds5Error::BluetoothCommunication(_) => ErrorCode::BluetoothCommunication,
        }
    }

    /// True for transient link failures whose recovery is reconnect, then
    /// re-enumerate.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Ds5Error::DeviceRemoved | Ds5Error::BluetoothCommunication(_)
        )
    }
}

/// Result type alias for DS5W
pub type Result<T> = std::result::Result<T, Ds5Error>;
