use super::client::{properties, DeviceClient, DeviceHandle, DevicePayload, PropertyRef};
use crate::error::DeviceError;
use crate::payload::encode_fits;
use async_trait::async_trait;
use chrono::Utc;
use ndarray::Array2;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace, warn};

/// Name of the companion telescope device
pub const TELESCOPE_SIMULATOR: &str = "Telescope Simulator";

const CAMERA_PROPERTIES: &[&str] = &[
    properties::CCD_EXPOSURE,
    properties::CCD_INFO,
    properties::CCD_FRAME,
    properties::CCD1,
    properties::CCD_TEMPERATURE,
    properties::CCD_COOLER,
];

const TELESCOPE_PROPERTIES: &[&str] = &[properties::EQUATORIAL_EOD_COORD];

/// Star positions as fractions of the sensor size, with peak brightness
const STARS: &[(f64, f64, f64)] = &[
    (0.50, 0.50, 30000.0),
    (0.23, 0.31, 12000.0),
    (0.71, 0.18, 8000.0),
    (0.64, 0.77, 18000.0),
    (0.12, 0.85, 5000.0),
];
const STAR_SIGMA: f64 = 3.0;
const BACKGROUND: f64 = 1000.0;

/// Builder for the in-process simulated camera
pub struct SimulatedClientBuilder {
    camera_id: String,
    sensor_size: (u32, u32),
    appearance_delay: Duration,
    exposure_scale: f64,
    auto_deliver: bool,
    reachable: bool,
    telescope: bool,
    missing_devices: Vec<String>,
}

impl SimulatedClientBuilder {
    pub fn new() -> Self {
        Self {
            camera_id: "CCD Simulator".to_string(),
            sensor_size: (1024, 768),
            appearance_delay: Duration::ZERO,
            exposure_scale: 1.0,
            auto_deliver: true,
            reachable: true,
            telescope: true,
            missing_devices: Vec::new(),
        }
    }

    pub fn camera_id<S: Into<String>>(mut self, camera_id: S) -> Self {
        self.camera_id = camera_id.into();
        self
    }

    pub fn sensor_size(mut self, width: u32, height: u32) -> Self {
        self.sensor_size = (width, height);
        self
    }

    /// Devices and properties stay unpublished for this long after connecting
    pub fn appearance_delay(mut self, delay: Duration) -> Self {
        self.appearance_delay = delay;
        self
    }

    /// Multiplier applied to requested exposure times; 0 delivers immediately
    pub fn exposure_scale(mut self, scale: f64) -> Self {
        self.exposure_scale = scale.max(0.0);
        self
    }

    /// When false, finished exposures queue until [`SimulatedClient::deliver_next`]
    pub fn auto_deliver(mut self, auto_deliver: bool) -> Self {
        self.auto_deliver = auto_deliver;
        self
    }

    /// When false, `connect_server` fails as if no server were running
    pub fn reachable(mut self, reachable: bool) -> Self {
        self.reachable = reachable;
        self
    }

    pub fn telescope(mut self, telescope: bool) -> Self {
        self.telescope = telescope;
        self
    }

    /// Never publish the named device
    pub fn missing_device<S: Into<String>>(mut self, name: S) -> Self {
        self.missing_devices.push(name.into());
        self
    }

    pub fn build(self) -> SimulatedClient {
        let (width, height) = self.sensor_size;
        let mut devices = HashMap::new();

        let mut camera = SimDevice {
            published: CAMERA_PROPERTIES,
            ..SimDevice::default()
        };
        camera.numbers.insert(
            properties::CCD_INFO.to_string(),
            vec![width as f64, height as f64, 5.4, 5.4, 5.4, 16.0],
        );
        camera.numbers.insert(
            properties::CCD_FRAME.to_string(),
            vec![0.0, 0.0, width as f64, height as f64],
        );
        camera
            .numbers
            .insert(properties::CCD_EXPOSURE.to_string(), vec![1.0]);
        camera
            .numbers
            .insert(properties::CCD_TEMPERATURE.to_string(), vec![20.0]);
        camera
            .switches
            .insert(properties::CCD_COOLER.to_string(), properties::COOLER_OFF);
        devices.insert(self.camera_id.clone(), camera);

        if self.telescope {
            let mut telescope = SimDevice {
                published: TELESCOPE_PROPERTIES,
                ..SimDevice::default()
            };
            telescope.numbers.insert(
                properties::EQUATORIAL_EOD_COORD.to_string(),
                vec![0.0, 90.0],
            );
            devices.insert(TELESCOPE_SIMULATOR.to_string(), telescope);
        }

        for name in &self.missing_devices {
            devices.remove(name);
        }

        SimulatedClient {
            sensor_size: self.sensor_size,
            appearance_delay: self.appearance_delay,
            exposure_scale: self.exposure_scale,
            auto_deliver: self.auto_deliver,
            reachable: self.reachable,
            state: Arc::new(Mutex::new(SimState {
                server_connected_at: None,
                devices,
                hidden_properties: HashSet::new(),
                pending: VecDeque::new(),
                exposures: 0,
            })),
        }
    }
}

impl Default for SimulatedClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct SimDevice {
    connected: bool,
    /// Properties published once the device is connected
    published: &'static [&'static str],
    numbers: HashMap<String, Vec<f64>>,
    switches: HashMap<String, usize>,
    payload_targets: HashMap<String, UnboundedSender<DevicePayload>>,
}

impl SimDevice {
    fn publishes(&self, name: &str) -> bool {
        name == properties::CONNECTION
            || (self.connected && self.published.iter().any(|p| *p == name))
    }
}

struct SimState {
    server_connected_at: Option<Instant>,
    devices: HashMap<String, SimDevice>,
    hidden_properties: HashSet<String>,
    pending: VecDeque<DevicePayload>,
    exposures: u64,
}

/// In-process stand-in for a device server hosting a CCD camera.
///
/// Exposures produce a synthetic star field, encoded as FITS, covering the
/// current `CCD_FRAME` region.
pub struct SimulatedClient {
    sensor_size: (u32, u32),
    appearance_delay: Duration,
    exposure_scale: f64,
    auto_deliver: bool,
    reachable: bool,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedClient {
    pub fn builder() -> SimulatedClientBuilder {
        SimulatedClientBuilder::new()
    }

    /// Number of exposures started so far
    pub fn exposure_count(&self) -> u64 {
        self.state.lock().exposures
    }

    /// Number of finished exposures waiting for manual delivery
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Deliver the oldest queued exposure. Returns false when none is queued.
    pub fn deliver_next(&self) -> bool {
        let payload = self.state.lock().pending.pop_front();
        match payload {
            Some(payload) => {
                send_payload(&self.state, payload);
                true
            }
            None => false,
        }
    }

    /// Stop publishing a property, as a driver does when it is reconfigured
    pub fn hide_property(&self, name: &str) {
        self.state.lock().hidden_properties.insert(name.to_string());
    }

    pub fn show_property(&self, name: &str) {
        self.state.lock().hidden_properties.remove(name);
    }

    /// Last values written to a number property
    pub fn numbers(&self, device: &str, property: &str) -> Option<Vec<f64>> {
        self.state
            .lock()
            .devices
            .get(device)
            .and_then(|d| d.numbers.get(property).cloned())
    }

    /// Index of the active element of a switch property
    pub fn switch(&self, device: &str, property: &str) -> Option<usize> {
        self.state
            .lock()
            .devices
            .get(device)
            .and_then(|d| d.switches.get(property).copied())
    }

    fn published(&self, state: &SimState) -> bool {
        state
            .server_connected_at
            .map(|at| at.elapsed() >= self.appearance_delay)
            .unwrap_or(false)
    }

    fn start_exposure(&self, device: &str, seconds: f64) -> Result<(), DeviceError> {
        let (region, sequence) = {
            let mut state = self.state.lock();
            state.exposures += 1;
            let sequence = state.exposures;
            let frame = state
                .devices
                .get(device)
                .and_then(|d| d.numbers.get(properties::CCD_FRAME).cloned())
                .unwrap_or_else(|| {
                    vec![
                        0.0,
                        0.0,
                        self.sensor_size.0 as f64,
                        self.sensor_size.1 as f64,
                    ]
                });
            (frame, sequence)
        };

        let [x, y, w, h] = clamp_region(&region, self.sensor_size);
        let pixels = synthesize_frame(self.sensor_size, x, y, w, h, seconds, sequence);
        let captured_at = Utc::now();

        let payload = DevicePayload {
            device: device.to_string(),
            property: properties::CCD1.to_string(),
            format: ".fits".to_string(),
            data: encode_fits(&pixels, captured_at),
            received_at: captured_at,
        };

        debug!(
            "Simulated exposure {} of {:.3}s over {},{}:{},{}",
            sequence, seconds, x, y, w, h
        );

        if self.auto_deliver {
            let state = Arc::clone(&self.state);
            let delay = Duration::from_secs_f64((seconds * self.exposure_scale).max(0.0));
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                send_payload(&state, payload);
            });
        } else {
            self.state.lock().pending.push_back(payload);
        }

        Ok(())
    }
}

fn send_payload(state: &Mutex<SimState>, payload: DevicePayload) {
    let sender = state
        .lock()
        .devices
        .get(&payload.device)
        .and_then(|d| d.payload_targets.get(&payload.property).cloned());

    match sender {
        Some(sender) => {
            trace!("Delivering {} bytes from {}", payload.data.len(), payload.device);
            if sender.send(payload).is_err() {
                warn!("Payload receiver has gone away; dropping image");
            }
        }
        None => debug!("No payload subscriber for {}; dropping image", payload.device),
    }
}

fn clamp_region(region: &[f64], sensor: (u32, u32)) -> [u32; 4] {
    let value = |i: usize| region.get(i).copied().unwrap_or(0.0).max(0.0) as u32;
    let x = value(0).min(sensor.0.saturating_sub(1));
    let y = value(1).min(sensor.1.saturating_sub(1));
    let w = value(2).min(sensor.0 - x);
    let h = value(3).min(sensor.1 - y);
    [x, y, w, h]
}

/// Star field over the sensor region `(x, y, w, h)`.
///
/// Background gradient plus gaussian stars whose brightness scales with the
/// exposure time; `sequence` adds a small frame-to-frame offset.
fn synthesize_frame(
    sensor: (u32, u32),
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    seconds: f64,
    sequence: u64,
) -> Array2<u16> {
    let (sw, sh) = (sensor.0 as f64, sensor.1 as f64);
    let gain = seconds.clamp(0.0, 10.0);
    let offset = (sequence % 16) as f64 * 8.0;

    Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
        let px = (x as usize + col) as f64;
        let py = (y as usize + row) as f64;

        let mut value = BACKGROUND + offset + 200.0 * (px / sw + py / sh);
        for &(fx, fy, peak) in STARS {
            let dx = px - fx * sw;
            let dy = py - fy * sh;
            value += gain * peak * (-(dx * dx + dy * dy) / (2.0 * STAR_SIGMA * STAR_SIGMA)).exp();
        }

        value.round().clamp(0.0, u16::MAX as f64) as u16
    })
}

#[async_trait]
impl DeviceClient for SimulatedClient {
    async fn connect_server(&self, host: &str, port: u16) -> Result<(), DeviceError> {
        if !self.reachable {
            return Err(DeviceError::ServerUnreachable {
                host: host.to_string(),
                port,
                details: "connection refused".to_string(),
            });
        }

        let mut state = self.state.lock();
        if state.server_connected_at.is_none() {
            state.server_connected_at = Some(Instant::now());
            info!("Simulated device server up on {}:{}", host, port);
        }
        Ok(())
    }

    async fn find_device(&self, name: &str) -> Option<DeviceHandle> {
        let state = self.state.lock();
        if !self.published(&state) {
            return None;
        }
        state
            .devices
            .contains_key(name)
            .then(|| DeviceHandle::new(name))
    }

    async fn find_property(&self, device: &DeviceHandle, name: &str) -> Option<PropertyRef> {
        let state = self.state.lock();
        if !self.published(&state) || state.hidden_properties.contains(name) {
            return None;
        }
        state
            .devices
            .get(device.name())
            .filter(|d| d.publishes(name))
            .map(|_| PropertyRef::new(device.name(), name))
    }

    async fn is_device_connected(&self, device: &DeviceHandle) -> bool {
        self.state
            .lock()
            .devices
            .get(device.name())
            .map(|d| d.connected)
            .unwrap_or(false)
    }

    async fn set_switch(&self, property: &PropertyRef, index: usize) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        let device = state
            .devices
            .get_mut(property.device())
            .ok_or(DeviceError::NotConnected)?;

        match property.name() {
            properties::CONNECTION => {
                device.connected = index == properties::CONNECT;
                info!(
                    "Simulated device {} {}",
                    property.device(),
                    if device.connected { "connected" } else { "disconnected" }
                );
            }
            name if device.publishes(name) => {}
            _ => {
                return Err(DeviceError::PropertyWrite {
                    property: property.to_string(),
                    details: "property is not published".to_string(),
                })
            }
        }

        device.switches.insert(property.name().to_string(), index);
        Ok(())
    }

    async fn set_numbers(&self, property: &PropertyRef, values: &[f64]) -> Result<(), DeviceError> {
        {
            let mut state = self.state.lock();
            let device = state
                .devices
                .get_mut(property.device())
                .ok_or(DeviceError::NotConnected)?;

            if !device.connected {
                return Err(DeviceError::NotConnected);
            }
            if !device.publishes(property.name()) {
                return Err(DeviceError::PropertyWrite {
                    property: property.to_string(),
                    details: "property is not published".to_string(),
                });
            }

            device
                .numbers
                .insert(property.name().to_string(), values.to_vec());
        }

        if property.name() == properties::CCD_EXPOSURE {
            let seconds = values.first().copied().unwrap_or(0.0);
            self.start_exposure(property.device(), seconds)?;
        }

        Ok(())
    }

    async fn number_values(&self, property: &PropertyRef) -> Option<Vec<f64>> {
        self.numbers(property.device(), property.name())
    }

    async fn enable_payloads(
        &self,
        device: &DeviceHandle,
        property: &str,
        sender: UnboundedSender<DevicePayload>,
    ) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        let device = state
            .devices
            .get_mut(device.name())
            .ok_or(DeviceError::NotConnected)?;
        device.payload_targets.insert(property.to_string(), sender);
        Ok(())
    }
}
