use super::controller::{Connection, SessionController};
use super::state::{ErrorState, SessionStatus};
use crate::device::{
    properties, resolve_with_retry, DeviceHandle, DevicePayload, PropertyRef, TELESCOPE_SIMULATOR,
};
use crate::error::{CcdError, DeviceError, Result};
use crate::geometry::{Rect, Size};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error, info, warn};

fn fatal(cause: DeviceError) -> CcdError {
    CcdError::FatalConnection {
        message: cause.to_string(),
    }
}

impl SessionController {
    /// Connect to the device server and resolve the camera.
    ///
    /// Any lookup that exhausts its retry budget yields
    /// [`CcdError::FatalConnection`] and leaves the session in `Error`.
    /// Calling this on a connected session is a no-op.
    pub async fn connect(self: &Arc<Self>) -> Result<()> {
        let mut connection = self.connection.lock().await;
        if connection.is_some() {
            return Ok(());
        }

        match self.establish().await {
            Ok((established, sensor)) => {
                {
                    let mut state = self.state.write();
                    state.sensor = sensor;
                    state.connected = true;
                    state.config.sub_frame = Rect::full(sensor);
                    state.config.roi = Rect::full(sensor);
                    if state.status == SessionStatus::Error {
                        state.status = state.resting_status();
                    }
                    state.set_message(ErrorState::Ok, "Connection complete");
                }
                info!(
                    "Connected to {} ({}x{} sensor)",
                    self.settings.camera_id, sensor.width, sensor.height
                );
                *connection = Some(established);
                Ok(())
            }
            Err(e) => {
                error!("Failed to connect to {}: {}", self.settings.camera_id, e);
                let mut state = self.state.write();
                state.status = SessionStatus::Error;
                state.connected = false;
                state.set_message(ErrorState::Error, e.to_string());
                Err(e)
            }
        }
    }

    /// Current connection, connecting first if needed
    pub(crate) async fn ensure_connected(self: &Arc<Self>) -> Result<Connection> {
        let existing = self.connection.lock().await.clone();
        if let Some(connection) = existing {
            return Ok(connection);
        }

        info!("Not connected - connecting to {}", self.settings.camera_id);
        self.connect().await?;

        let connection = self.connection.lock().await.clone();
        connection.ok_or_else(|| CcdError::system("Connection missing after connect"))
    }

    async fn establish(self: &Arc<Self>) -> Result<(Connection, Size)> {
        let settings = &self.settings;

        info!(
            "Connecting to device server {}:{}",
            settings.host, settings.port
        );
        self.client
            .connect_server(&settings.host, settings.port)
            .await
            .map_err(fatal)?;

        if settings.telescope_simulator {
            if let Err(e) = self.connect_telescope().await {
                warn!("Telescope simulator unavailable, continuing without it: {}", e);
            }
        }

        debug!("Looking for device {}", settings.camera_id);
        let camera = self
            .resolve_device(&settings.camera_id)
            .await
            .map_err(fatal)?;

        self.connect_device(&camera).await.map_err(fatal)?;

        let exposure = self
            .resolve_property(&camera, properties::CCD_EXPOSURE)
            .await
            .map_err(fatal)?;
        let info = self
            .resolve_property(&camera, properties::CCD_INFO)
            .await
            .map_err(fatal)?;
        let frame = self
            .resolve_property(&camera, properties::CCD_FRAME)
            .await
            .map_err(fatal)?;

        let sensor = self.read_sensor_size(&info).await.map_err(fatal)?;
        let full = Rect::full(sensor);
        self.client
            .set_numbers(&frame, &frame_values(full))
            .await
            .map_err(fatal)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        self.client
            .enable_payloads(&camera, properties::CCD1, sender)
            .await
            .map_err(fatal)?;
        self.spawn_event_loop(receiver);

        Ok((Connection { camera, exposure }, sensor))
    }

    /// Turn on the device's CONNECTION switch if it is not connected yet
    async fn connect_device(&self, device: &DeviceHandle) -> std::result::Result<(), DeviceError> {
        let switch = self
            .resolve_property(device, properties::CONNECTION)
            .await?;

        if !self.client.is_device_connected(device).await {
            info!("Device {} is not connected - connecting", device.name());
            self.client.set_switch(&switch, properties::CONNECT).await?;
        }
        Ok(())
    }

    async fn connect_telescope(&self) -> std::result::Result<(), DeviceError> {
        let telescope = self.resolve_device(TELESCOPE_SIMULATOR).await?;
        self.connect_device(&telescope).await?;
        self.resolve_property(&telescope, properties::EQUATORIAL_EOD_COORD)
            .await?;
        info!("Telescope simulator connected");
        Ok(())
    }

    async fn read_sensor_size(&self, info: &PropertyRef) -> std::result::Result<Size, DeviceError> {
        let client = self.client.as_ref();
        let values = resolve_with_retry(
            properties::CCD_INFO,
            self.settings.max_attempts,
            self.settings.retry_interval,
            move || async move {
                client
                    .number_values(info)
                    .await
                    .filter(|v| v.len() >= 2 && v[0] >= 1.0 && v[1] >= 1.0)
            },
        )
        .await?;

        Ok(Size::new(values[0] as u32, values[1] as u32))
    }

    pub(crate) async fn resolve_device(
        &self,
        name: &str,
    ) -> std::result::Result<DeviceHandle, DeviceError> {
        let client = self.client.as_ref();
        resolve_with_retry(
            &format!("Device {}", name),
            self.settings.max_attempts,
            self.settings.retry_interval,
            move || client.find_device(name),
        )
        .await
    }

    pub(crate) async fn resolve_property(
        &self,
        device: &DeviceHandle,
        name: &str,
    ) -> std::result::Result<PropertyRef, DeviceError> {
        let client = self.client.as_ref();
        resolve_with_retry(
            &format!("{}.{}", device.name(), name),
            self.settings.max_attempts,
            self.settings.retry_interval,
            move || client.find_property(device, name),
        )
        .await
    }

    fn spawn_event_loop(self: &Arc<Self>, mut receiver: UnboundedReceiver<DevicePayload>) {
        let weak = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            debug!("Image event loop started");
            while let Some(payload) = receiver.recv().await {
                let Some(session) = weak.upgrade() else {
                    break;
                };
                if payload.property != properties::CCD1 {
                    debug!("Ignoring payload from {}", payload.property);
                    continue;
                }
                if let Err(e) = session.on_image_ready(payload).await {
                    error!("Failed to process image: {}", e);
                }
            }
            debug!("Image event loop stopped");
        });

        if let Some(previous) = self.event_task.lock().replace(task) {
            previous.abort();
        }
    }
}

pub(crate) fn frame_values(rect: Rect) -> [f64; 4] {
    [
        rect.origin_x as f64,
        rect.origin_y as f64,
        rect.size_x as f64,
        rect.size_y as f64,
    ]
}
