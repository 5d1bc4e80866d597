use crate::geometry::{Rect, Size};
use crate::product::ImageProduct;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Where the session is in the exposure cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    Error,
    NoImage,
    Idle,
    Exposing,
    /// Payload received, pixels being decoded
    Downloading,
}

impl SessionStatus {
    /// Numeric code published in the status document
    pub fn code(self) -> i32 {
        match self {
            SessionStatus::Error => -1,
            SessionStatus::NoImage => 0,
            SessionStatus::Idle => 1,
            SessionStatus::Exposing => 2,
            SessionStatus::Downloading => 3,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Severity of the last message, independent of [`SessionStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorState {
    Ok,
    Warning,
    Error,
}

impl ErrorState {
    pub fn code(self) -> i32 {
        match self {
            ErrorState::Ok => 0,
            ErrorState::Warning => -1,
            ErrorState::Error => -2,
        }
    }
}

/// Operator-controlled capture settings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraConfig {
    pub exposure_time: f64,
    pub cooler_setpoint: f64,
    pub cooler_enabled: bool,
    /// Readout region, bounded by the sensor
    pub sub_frame: Rect,
    /// Analysis region, relative to and bounded by the sub-frame
    pub roi: Rect,
    pub continuous: bool,
    pub auto_save: bool,
    pub save_name_root: String,
    pub x_profile_width: u32,
    pub y_profile_width: u32,
}

/// Everything guarded by the session lock
#[derive(Debug, Clone)]
pub struct SessionState {
    pub status: SessionStatus,
    pub error_state: ErrorState,
    pub message: String,
    pub connected: bool,
    pub sensor: Size,
    pub config: CameraConfig,
    /// Replaced wholesale on every completed exposure
    pub current_image: Option<Arc<ImageProduct>>,
    /// Bumped each time an exposure is armed
    pub(crate) exposure_generation: u64,
    /// Sub-frame the exposure in flight is read out with
    pub(crate) armed_sub_frame: Option<Rect>,
}

impl SessionState {
    pub fn new(config: CameraConfig, sensor: Size) -> Self {
        Self {
            status: SessionStatus::NoImage,
            error_state: ErrorState::Ok,
            message: String::new(),
            connected: false,
            sensor,
            config,
            current_image: None,
            exposure_generation: 0,
            armed_sub_frame: None,
        }
    }

    pub(crate) fn set_message<S: Into<String>>(&mut self, error_state: ErrorState, message: S) {
        self.error_state = error_state;
        self.message = message.into();
    }

    /// An exposure is in flight or its payload is being decoded
    pub(crate) fn is_busy(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Exposing | SessionStatus::Downloading
        )
    }

    /// Status to fall back to when an exposure cycle is abandoned
    pub(crate) fn resting_status(&self) -> SessionStatus {
        if self.current_image.is_some() {
            SessionStatus::Idle
        } else {
            SessionStatus::NoImage
        }
    }
}
