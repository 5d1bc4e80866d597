use super::controller::SessionController;
use super::state::{ErrorState, SessionStatus};
use crate::device::{properties, DevicePayload};
use crate::error::Result;
use crate::product::ImageProduct;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

impl SessionController {
    /// Arm and trigger one exposure. Returns once the device has accepted it.
    pub async fn start_exposure(self: &Arc<Self>) -> Result<()> {
        let connection = self.ensure_connected().await?;

        self.resolve_property(&connection.camera, properties::CCD1)
            .await
            .map_err(|e| self.push_failed(properties::CCD1, e))?;

        let (exposure_time, generation) = {
            let mut state = self.state.write();
            if state.is_busy() {
                warn!("{} in progress - ignoring start request", state.status);
                return Ok(());
            }
            state.status = SessionStatus::Exposing;
            state.exposure_generation += 1;
            state.armed_sub_frame = Some(state.config.sub_frame);
            let exposure_time = state.config.exposure_time;
            state.set_message(
                ErrorState::Ok,
                format!("Exposing for {} s", exposure_time),
            );
            (exposure_time, state.exposure_generation)
        };

        if let Err(e) = self
            .client
            .set_numbers(&connection.exposure, &[exposure_time])
            .await
        {
            {
                let mut state = self.state.write();
                if state.exposure_generation == generation {
                    state.status = state.resting_status();
                    state.armed_sub_frame = None;
                }
            }
            return Err(self.push_failed(properties::CCD_EXPOSURE, e));
        }

        let deadline = Duration::try_from_secs_f64(exposure_time)
            .unwrap_or(Duration::MAX)
            .saturating_add(self.settings.exposure_timeout_margin);
        self.spawn_exposure_watchdog(generation, deadline);

        info!("Started {} s exposure", exposure_time);
        Ok(())
    }

    /// Give up on exposure `generation` if no payload arrived within `timeout`.
    ///
    /// The session returns to its resting status; in continuous mode the
    /// exposure is issued again.
    fn spawn_exposure_watchdog(self: &Arc<Self>, generation: u64, timeout: Duration) {
        let weak = Arc::downgrade(self);

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let Some(session) = weak.upgrade() else {
                return;
            };

            let continuous = {
                let mut state = session.state.write();
                if state.status != SessionStatus::Exposing
                    || state.exposure_generation != generation
                {
                    return;
                }
                state.status = state.resting_status();
                state.armed_sub_frame = None;
                state.set_message(
                    ErrorState::Warning,
                    format!(
                        "No image after {:.1} s - exposure abandoned",
                        timeout.as_secs_f64()
                    ),
                );
                state.config.continuous
            };
            warn!(
                "Exposure {} timed out after {:.1} s",
                generation,
                timeout.as_secs_f64()
            );

            if continuous {
                if let Err(e) = session.start_exposure().await {
                    error!("Failed to re-issue timed out exposure: {}", e);
                }
            }
        });
    }

    /// Handle a finished exposure delivered by the device.
    ///
    /// Decoding and statistics run without the session lock; only the swap of
    /// the current image is done under it. The continuous flag is read once,
    /// in the same critical section as the swap.
    pub async fn on_image_ready(
        self: &Arc<Self>,
        payload: DevicePayload,
    ) -> Result<Arc<ImageProduct>> {
        let (sub_frame, roi) = {
            let mut state = self.state.write();
            state.status = SessionStatus::Downloading;
            let sub_frame = state
                .armed_sub_frame
                .take()
                .unwrap_or(state.config.sub_frame);
            (sub_frame, state.config.roi)
        };

        let pixels = match self.decoder.decode(&payload.format, &payload.data) {
            Ok(pixels) => pixels,
            Err(e) => {
                let mut state = self.state.write();
                if state.status == SessionStatus::Downloading {
                    state.status = state.resting_status();
                }
                state.config.continuous = false;
                state.set_message(ErrorState::Error, format!("Failed to decode image: {}", e));
                return Err(e.into());
            }
        };

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let product = Arc::new(ImageProduct::new(
            sequence,
            pixels,
            payload.received_at,
            sub_frame,
            roi,
        ));

        let (continuous, auto_save, name_root) = {
            let mut state = self.state.write();
            state.current_image = Some(Arc::clone(&product));
            if state.status == SessionStatus::Downloading {
                state.status = SessionStatus::Idle;
            }
            state.set_message(ErrorState::Ok, format!("Image {} received", sequence));
            (
                state.config.continuous,
                state.config.auto_save,
                state.config.save_name_root.clone(),
            )
        };

        info!(
            "Image {} received ({}x{}, mean {:.1})",
            sequence, product.width, product.height, product.whole_image_stats.mean
        );

        if auto_save {
            if let Err(e) = self.save_product(&product, &name_root).await {
                error!("Auto-save of image {} failed: {}", sequence, e);
                self.state
                    .write()
                    .set_message(ErrorState::Warning, format!("Auto-save failed: {}", e));
            }
        }

        if continuous {
            if let Err(e) = self.start_exposure().await {
                error!("Failed to re-arm continuous exposure: {}", e);
            }
        }

        Ok(product)
    }

    /// Re-arm after every completed exposure until stopped
    pub async fn start_continuous(self: &Arc<Self>) -> Result<()> {
        let idle = {
            let mut state = self.state.write();
            state.config.continuous = true;
            !state.is_busy()
        };
        info!("Continuous exposures enabled");

        if idle {
            self.start_exposure().await?;
        }
        Ok(())
    }

    /// Takes effect after the exposure in flight completes
    pub fn stop_continuous(&self) {
        self.state.write().config.continuous = false;
        info!("Continuous exposures disabled");
    }
}
