use crate::error::DeviceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

/// Standard property names published by camera drivers
pub mod properties {
    /// Switch vector: index 0 connects, index 1 disconnects
    pub const CONNECTION: &str = "CONNECTION";
    pub const CONNECT: usize = 0;
    pub const DISCONNECT: usize = 1;

    /// Writing the single element starts an exposure of that many seconds
    pub const CCD_EXPOSURE: &str = "CCD_EXPOSURE";
    /// `[max_x, max_y, pixel_size, pixel_size_x, pixel_size_y, bits_per_pixel]`
    pub const CCD_INFO: &str = "CCD_INFO";
    /// `[x, y, width, height]` of the readout region
    pub const CCD_FRAME: &str = "CCD_FRAME";
    /// Binary image payload
    pub const CCD1: &str = "CCD1";
    /// Cooler target in degrees C
    pub const CCD_TEMPERATURE: &str = "CCD_TEMPERATURE";
    /// Switch vector: index 0 turns the cooler on, index 1 off
    pub const CCD_COOLER: &str = "CCD_COOLER";
    pub const COOLER_ON: usize = 0;
    pub const COOLER_OFF: usize = 1;

    /// Telescope pointing, `[ra_hours, dec_degrees]`
    pub const EQUATORIAL_EOD_COORD: &str = "EQUATORIAL_EOD_COORD";
}

/// Opaque reference to a named device on the device server
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    name: String,
}

impl DeviceHandle {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Opaque reference to a named property of a device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyRef {
    device: String,
    name: String,
}

impl PropertyRef {
    pub fn new<D: Into<String>, N: Into<String>>(device: D, name: N) -> Self {
        Self {
            device: device.into(),
            name: name.into(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.device, self.name)
    }
}

/// A binary payload pushed by the device, typically a finished exposure
#[derive(Debug, Clone)]
pub struct DevicePayload {
    pub device: String,
    pub property: String,
    /// Payload format as reported by the device, e.g. `".fits"`
    pub format: String,
    pub data: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

/// Client side of the device-control protocol.
///
/// Lookups return `None` while a device or property has not been published
/// yet; callers poll them with [`resolve_with_retry`](super::resolve_with_retry).
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Open the protocol session to the device server
    async fn connect_server(&self, host: &str, port: u16) -> Result<(), DeviceError>;

    async fn find_device(&self, name: &str) -> Option<DeviceHandle>;

    async fn find_property(&self, device: &DeviceHandle, name: &str) -> Option<PropertyRef>;

    async fn is_device_connected(&self, device: &DeviceHandle) -> bool;

    /// Turn on switch `index` of a one-of-many switch vector
    async fn set_switch(&self, property: &PropertyRef, index: usize) -> Result<(), DeviceError>;

    async fn set_numbers(&self, property: &PropertyRef, values: &[f64]) -> Result<(), DeviceError>;

    async fn number_values(&self, property: &PropertyRef) -> Option<Vec<f64>>;

    /// Ask the server to forward `property` payloads of `device` to `sender`
    async fn enable_payloads(
        &self,
        device: &DeviceHandle,
        property: &str,
        sender: UnboundedSender<DevicePayload>,
    ) -> Result<(), DeviceError>;
}
