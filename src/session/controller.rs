use super::persist::SaveFormat;
use super::state::{CameraConfig, ErrorState, SessionState, SessionStatus};
use super::status::StatusDocument;
use crate::config::CcdConfig;
use crate::device::{DeviceClient, DeviceHandle, PropertyRef};
use crate::error::{CcdError, DeviceError};
use crate::geometry::{Rect, Size};
use crate::payload::{FitsDecoder, PayloadDecoder};
use crate::product::ImageProduct;
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Fixed settings for one camera session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub camera_id: String,
    pub host: String,
    pub port: u16,
    pub telescope_simulator: bool,
    pub max_attempts: u32,
    pub retry_interval: Duration,
    /// Added to the exposure time to get the exposure deadline
    pub exposure_timeout_margin: Duration,
    pub data_dir: PathBuf,
    pub save_format: SaveFormat,
}

impl SessionSettings {
    pub fn from_config(config: &CcdConfig) -> Self {
        Self {
            camera_id: config.device.camera_id.clone(),
            host: config.device.host.clone(),
            port: config.device.port,
            telescope_simulator: config.device.telescope_simulator,
            max_attempts: config.retry.max_attempts,
            retry_interval: Duration::from_millis(config.retry.interval_ms),
            exposure_timeout_margin: Duration::from_millis(config.exposure.timeout_margin_ms),
            data_dir: PathBuf::from(&config.capture.data_dir),
            save_format: SaveFormat::parse(&config.capture.format).unwrap_or_default(),
        }
    }
}

/// Resolved device references held while connected
#[derive(Debug, Clone)]
pub(crate) struct Connection {
    pub(crate) camera: DeviceHandle,
    pub(crate) exposure: PropertyRef,
}

/// Owns the camera connection, the exposure state machine and the current image.
///
/// Command handlers and the image event loop share one instance through an
/// `Arc`. All mutable state sits behind a single `RwLock` that is never held
/// across an `.await`.
pub struct SessionController {
    pub(crate) settings: SessionSettings,
    pub(crate) client: Arc<dyn DeviceClient>,
    pub(crate) decoder: Arc<dyn PayloadDecoder>,
    pub(crate) state: RwLock<SessionState>,
    /// Serialises connection attempts
    pub(crate) connection: tokio::sync::Mutex<Option<Connection>>,
    pub(crate) sequence: AtomicU64,
    pub(crate) event_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    pub fn new(
        settings: SessionSettings,
        camera: CameraConfig,
        client: Arc<dyn DeviceClient>,
        decoder: Arc<dyn PayloadDecoder>,
    ) -> Arc<Self> {
        info!("Creating capture session for {}", settings.camera_id);

        Arc::new(Self {
            settings,
            client,
            decoder,
            state: RwLock::new(SessionState::new(camera, Size::new(0, 0))),
            connection: tokio::sync::Mutex::new(None),
            sequence: AtomicU64::new(0),
            event_task: Mutex::new(None),
        })
    }

    /// Session configured from `config`, decoding FITS payloads
    pub fn from_config(config: &CcdConfig, client: Arc<dyn DeviceClient>) -> Arc<Self> {
        let camera = CameraConfig {
            exposure_time: config.exposure.exposure_time,
            cooler_setpoint: config.exposure.cooler_setpoint,
            cooler_enabled: false,
            sub_frame: Rect::default(),
            roi: Rect::default(),
            continuous: false,
            auto_save: false,
            save_name_root: config.capture.save_name_root.clone(),
            x_profile_width: config.analysis.x_profile_width,
            y_profile_width: config.analysis.y_profile_width,
        };

        Self::new(
            SessionSettings::from_config(config),
            camera,
            client,
            Arc::new(FitsDecoder::new()),
        )
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn camera_id(&self) -> &str {
        &self.settings.camera_id
    }

    pub fn status(&self) -> SessionStatus {
        self.state.read().status
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().connected
    }

    /// Consistent copy of the whole session state
    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn camera_config(&self) -> CameraConfig {
        self.state.read().config.clone()
    }

    pub fn sensor_size(&self) -> Size {
        self.state.read().sensor
    }

    /// The latest complete image, if any
    pub fn current_image(&self) -> Option<Arc<ImageProduct>> {
        self.state.read().current_image.clone()
    }

    pub fn status_document(&self) -> StatusDocument {
        let state = self.state.read();
        StatusDocument::from_state(&self.settings.camera_id, &state)
    }

    /// Stop re-arming and detach from the device's image notifications
    pub fn shutdown(&self) {
        self.state.write().config.continuous = false;
        if let Some(task) = self.event_task.lock().take() {
            task.abort();
        }
        info!("Capture session for {} shut down", self.settings.camera_id);
    }

    /// Record a failed property push. The session stays up.
    pub(crate) fn push_failed(&self, property: &str, cause: DeviceError) -> CcdError {
        let err = CcdError::ConfigPush {
            property: property.to_string(),
            message: cause.to_string(),
        };
        error!("{}", err);
        self.state
            .write()
            .set_message(ErrorState::Error, err.to_string());
        err
    }
}
