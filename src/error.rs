use thiserror::Error;

#[derive(Error, Debug)]
pub enum CcdError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Payload decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The device endpoint is unreachable or a named device never appeared.
    #[error("Fatal connection error: {message}")]
    FatalConnection { message: String },

    /// A property push made after connection failed; the session stays up.
    #[error("Failed to push {property}: {message}")]
    ConfigPush { property: String, message: String },

    #[error("Invalid parameter '{value}' for {command}: {reason}")]
    InvalidParameter {
        command: String,
        value: String,
        reason: String,
    },

    #[error("Unrecognised Command {command}")]
    UnrecognizedCommand { command: String },

    #[error("Unsupported Method Type {method}")]
    UnsupportedMethod { method: String },

    #[error("No image has been captured yet")]
    NoImage,

    #[error("Render error: {details}")]
    Render { details: String },

    #[error("System error: {message}")]
    System { message: String },
}

/// Errors raised at the device-protocol boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("No device server running on {host}:{port}: {details}")]
    ServerUnreachable {
        host: String,
        port: u16,
        details: String,
    },

    #[error("{what} did not become available after {attempts} attempts")]
    ResolveTimeout { what: String, attempts: u32 },

    #[error("Device session is not connected")]
    NotConnected,

    #[error("Write to property {property} failed: {details}")]
    PropertyWrite { property: String, details: String },
}

/// Errors raised while turning a binary payload into pixels
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Payload truncated: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Missing header keyword {keyword}")]
    MissingKeyword { keyword: String },

    #[error("Unsupported image layout: {details}")]
    Unsupported { details: String },

    #[error("Unsupported payload format '{format}'")]
    UnknownFormat { format: String },
}

impl CcdError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn invalid_parameter<C: Into<String>, V: Into<String>, R: Into<String>>(
        command: C,
        value: V,
        reason: R,
    ) -> Self {
        Self::InvalidParameter {
            command: command.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Errors in this class end the process when raised during startup
    pub fn is_fatal(&self) -> bool {
        matches!(self, CcdError::FatalConnection { .. })
    }
}

pub type Result<T> = std::result::Result<T, CcdError>;
