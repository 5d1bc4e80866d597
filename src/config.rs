use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CcdConfig {
    pub device: DeviceConfig,
    pub exposure: ExposureConfig,
    pub capture: CaptureConfig,
    pub retry: RetryConfig,
    pub analysis: AnalysisConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeviceConfig {
    /// Name of the camera device as published by the device server
    #[serde(default = "default_camera_id")]
    pub camera_id: String,

    /// Device server host
    #[serde(default = "default_device_host")]
    pub host: String,

    /// Device server port
    #[serde(default = "default_device_port")]
    pub port: u16,

    /// Also bring up the simulated telescope companion device
    #[serde(default = "default_telescope_simulator")]
    pub telescope_simulator: bool,

    /// Use the in-process simulated camera
    #[serde(default = "default_simulate")]
    pub simulate: bool,

    /// Sensor size (width, height) reported by the simulated camera
    #[serde(default = "default_sensor_size")]
    pub sensor_size: (u32, u32),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExposureConfig {
    /// Initial exposure time in seconds
    #[serde(default = "default_exposure_time")]
    pub exposure_time: f64,

    /// Initial cooler setpoint in degrees C
    #[serde(default = "default_cooler_setpoint")]
    pub cooler_setpoint: f64,

    /// Grace period past the exposure time before an exposure is given up
    #[serde(default = "default_timeout_margin_ms")]
    pub timeout_margin_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaptureConfig {
    /// Directory saved images are written to
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Default file name root for saved images
    #[serde(default = "default_save_name_root")]
    pub save_name_root: String,

    /// File format for saved images ("fits" or "png")
    #[serde(default = "default_save_format")]
    pub format: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetryConfig {
    /// Attempts made to resolve a device property before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_profile_width")]
    pub x_profile_width: u32,

    #[serde(default = "default_profile_width")]
    pub y_profile_width: u32,

    /// Bounding box for images served to the web page
    #[serde(default = "default_web_max_width")]
    pub web_max_width: u32,

    #[serde(default = "default_web_max_height")]
    pub web_max_height: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// IP address to bind to
    #[serde(default = "default_server_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl CcdConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("ccdcam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("device.camera_id", default_camera_id())?
            .set_default("device.host", default_device_host())?
            .set_default("device.port", default_device_port())?
            .set_default("device.telescope_simulator", default_telescope_simulator())?
            .set_default("device.simulate", default_simulate())?
            .set_default(
                "device.sensor_size",
                vec![default_sensor_size().0, default_sensor_size().1],
            )?
            .set_default("exposure.exposure_time", default_exposure_time())?
            .set_default("exposure.cooler_setpoint", default_cooler_setpoint())?
            .set_default("exposure.timeout_margin_ms", default_timeout_margin_ms())?
            .set_default("capture.data_dir", default_data_dir())?
            .set_default("capture.save_name_root", default_save_name_root())?
            .set_default("capture.format", default_save_format())?
            .set_default("retry.max_attempts", default_max_attempts())?
            .set_default("retry.interval_ms", default_interval_ms())?
            .set_default("analysis.x_profile_width", default_profile_width())?
            .set_default("analysis.y_profile_width", default_profile_width())?
            .set_default("analysis.web_max_width", default_web_max_width())?
            .set_default("analysis.web_max_height", default_web_max_height())?
            .set_default("server.ip", default_server_ip())?
            .set_default("server.port", default_server_port())?
            .add_source(File::with_name(&path_str).required(false))
            // CCDCAM_DEVICE__CAMERA_ID, CCDCAM_SERVER__PORT, ...
            .add_source(
                Environment::with_prefix("CCDCAM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: CcdConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.camera_id.trim().is_empty() {
            return Err(ConfigError::Message(
                "Camera id must not be empty".to_string(),
            ));
        }

        if self.device.sensor_size.0 == 0 || self.device.sensor_size.1 == 0 {
            return Err(ConfigError::Message(
                "Sensor size must be greater than 0".to_string(),
            ));
        }

        if !(self.exposure.exposure_time > 0.0) {
            return Err(ConfigError::Message(
                "Exposure time must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Message(
                "Retry max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.analysis.x_profile_width == 0 || self.analysis.y_profile_width == 0 {
            return Err(ConfigError::Message(
                "Profile widths must be greater than 0".to_string(),
            ));
        }

        if self.analysis.web_max_width == 0 || self.analysis.web_max_height == 0 {
            return Err(ConfigError::Message(
                "Web image size must be greater than 0".to_string(),
            ));
        }

        match self.capture.format.to_lowercase().as_str() {
            "fits" | "png" => {}
            other => {
                return Err(ConfigError::Message(format!(
                    "Unknown save format '{}' (expected fits or png)",
                    other
                )))
            }
        }

        Ok(())
    }
}

impl Default for CcdConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig {
                camera_id: default_camera_id(),
                host: default_device_host(),
                port: default_device_port(),
                telescope_simulator: default_telescope_simulator(),
                simulate: default_simulate(),
                sensor_size: default_sensor_size(),
            },
            exposure: ExposureConfig {
                exposure_time: default_exposure_time(),
                cooler_setpoint: default_cooler_setpoint(),
                timeout_margin_ms: default_timeout_margin_ms(),
            },
            capture: CaptureConfig {
                data_dir: default_data_dir(),
                save_name_root: default_save_name_root(),
                format: default_save_format(),
            },
            retry: RetryConfig {
                max_attempts: default_max_attempts(),
                interval_ms: default_interval_ms(),
            },
            analysis: AnalysisConfig {
                x_profile_width: default_profile_width(),
                y_profile_width: default_profile_width(),
                web_max_width: default_web_max_width(),
                web_max_height: default_web_max_height(),
            },
            server: ServerConfig {
                ip: default_server_ip(),
                port: default_server_port(),
            },
        }
    }
}

// Default value functions
fn default_camera_id() -> String {
    "CCD Simulator".to_string()
}
fn default_device_host() -> String {
    "localhost".to_string()
}
fn default_device_port() -> u16 {
    7624
}
fn default_telescope_simulator() -> bool {
    false
}
fn default_simulate() -> bool {
    true
}
fn default_sensor_size() -> (u32, u32) {
    (1024, 768)
}

fn default_exposure_time() -> f64 {
    0.5
}
fn default_cooler_setpoint() -> f64 {
    0.0
}
fn default_timeout_margin_ms() -> u64 {
    30_000
}

fn default_data_dir() -> String {
    "./data".to_string()
}
fn default_save_name_root() -> String {
    "image".to_string()
}
fn default_save_format() -> String {
    "fits".to_string()
}

fn default_max_attempts() -> u32 {
    20
}
fn default_interval_ms() -> u64 {
    500
}

fn default_profile_width() -> u32 {
    1
}
fn default_web_max_width() -> u32 {
    600
}
fn default_web_max_height() -> u32 {
    400
}

fn default_server_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_server_port() -> u16 {
    8081
}
