use super::connect::frame_values;
use super::controller::{Connection, SessionController};
use super::state::ErrorState;
use crate::device::properties;
use crate::error::{CcdError, Result};
use crate::geometry::{validate_rect, CandidateRect, Rect, Validated};
use std::sync::Arc;
use tracing::{debug, info};

impl SessionController {
    pub fn set_exposure_time(&self, seconds: f64) -> Result<()> {
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(CcdError::invalid_parameter(
                "setExposureTime",
                seconds.to_string(),
                "exposure time must be a positive number of seconds",
            ));
        }

        self.state.write().config.exposure_time = seconds;
        info!("Exposure time set to {} s", seconds);
        Ok(())
    }

    /// Push a new cooler target and switch the cooler on
    pub async fn set_cooler(self: &Arc<Self>, setpoint: f64) -> Result<()> {
        if !setpoint.is_finite() {
            return Err(CcdError::invalid_parameter(
                "setCooler",
                setpoint.to_string(),
                "setpoint must be a number",
            ));
        }

        let connection = self.ensure_connected().await?;

        let temperature = self
            .resolve_property(&connection.camera, properties::CCD_TEMPERATURE)
            .await
            .map_err(|e| self.push_failed(properties::CCD_TEMPERATURE, e))?;
        self.client
            .set_numbers(&temperature, &[setpoint])
            .await
            .map_err(|e| self.push_failed(properties::CCD_TEMPERATURE, e))?;
        self.switch_cooler(&connection, properties::COOLER_ON)
            .await?;

        let mut state = self.state.write();
        state.config.cooler_setpoint = setpoint;
        state.config.cooler_enabled = true;
        info!("Cooler on, setpoint {} C", setpoint);
        Ok(())
    }

    pub async fn stop_cooler(self: &Arc<Self>) -> Result<()> {
        let connection = self.ensure_connected().await?;
        self.switch_cooler(&connection, properties::COOLER_OFF)
            .await?;

        self.state.write().config.cooler_enabled = false;
        info!("Cooler off");
        Ok(())
    }

    async fn switch_cooler(&self, connection: &Connection, index: usize) -> Result<()> {
        let cooler = self
            .resolve_property(&connection.camera, properties::CCD_COOLER)
            .await
            .map_err(|e| self.push_failed(properties::CCD_COOLER, e))?;
        self.client
            .set_switch(&cooler, index)
            .await
            .map_err(|e| self.push_failed(properties::CCD_COOLER, e))
    }

    /// Validate `candidate` against the sensor and push it to the device.
    ///
    /// The ROI is re-validated against the new sub-frame. Nothing changes if
    /// the push fails.
    pub async fn set_sub_frame(self: &Arc<Self>, candidate: CandidateRect) -> Result<Validated> {
        let connection = self.ensure_connected().await?;
        let sensor = self.state.read().sensor;
        let validated = validate_rect(candidate, sensor);

        self.apply_sub_frame(&connection, validated.rect).await?;
        if validated.was_clipped() {
            self.state.write().set_message(
                ErrorState::Warning,
                format!("Sub-frame clipped to {}", validated.rect),
            );
        }
        Ok(validated)
    }

    /// Reset the sub-frame to the full sensor and push it
    pub async fn clear_sub_frame(self: &Arc<Self>) -> Result<Rect> {
        let connection = self.ensure_connected().await?;
        let full = Rect::full(self.state.read().sensor);

        self.apply_sub_frame(&connection, full).await?;
        Ok(full)
    }

    async fn apply_sub_frame(&self, connection: &Connection, sub_frame: Rect) -> Result<()> {
        let frame = self
            .resolve_property(&connection.camera, properties::CCD_FRAME)
            .await
            .map_err(|e| self.push_failed(properties::CCD_FRAME, e))?;
        self.client
            .set_numbers(&frame, &frame_values(sub_frame))
            .await
            .map_err(|e| self.push_failed(properties::CCD_FRAME, e))?;

        let roi = {
            let mut state = self.state.write();
            state.config.sub_frame = sub_frame;
            let roi = validate_rect(state.config.roi.into(), sub_frame.size()).rect;
            state.config.roi = roi;
            state.set_message(ErrorState::Ok, format!("Sub-frame set to {}", sub_frame));
            roi
        };
        info!("Sub-frame set to {}, ROI now {}", sub_frame, roi);

        self.reanalyse_current(roi);
        Ok(())
    }

    /// Set the ROI, clipped to the current sub-frame
    pub fn set_roi(&self, candidate: CandidateRect) -> Validated {
        let validated = {
            let mut state = self.state.write();
            let validated = validate_rect(candidate, state.config.sub_frame.size());
            state.config.roi = validated.rect;
            if validated.was_clipped() {
                state.set_message(
                    ErrorState::Warning,
                    format!("ROI clipped to {}", validated.rect),
                );
            }
            validated
        };
        info!("ROI set to {}", validated.rect);

        self.reanalyse_current(validated.rect);
        validated
    }

    /// Reset the ROI to cover the whole sub-frame
    pub fn clear_roi(&self) -> Rect {
        let roi = {
            let mut state = self.state.write();
            let roi = Rect::full(state.config.sub_frame.size());
            state.config.roi = roi;
            roi
        };
        info!("ROI cleared to {}", roi);

        self.reanalyse_current(roi);
        roi
    }

    pub fn set_profile_widths(&self, x_width: u32, y_width: u32) -> Result<()> {
        if x_width == 0 || y_width == 0 {
            return Err(CcdError::invalid_parameter(
                "setProfileWidth",
                format!("{},{}", x_width, y_width),
                "profile widths must be at least 1",
            ));
        }

        let mut state = self.state.write();
        state.config.x_profile_width = x_width;
        state.config.y_profile_width = y_width;
        debug!("Profile widths set to {}x{}", x_width, y_width);
        Ok(())
    }

    /// Recompute ROI statistics of the current image for a new ROI.
    ///
    /// The slot is only replaced if no newer image arrived meanwhile.
    fn reanalyse_current(&self, roi: Rect) {
        let Some(image) = self.current_image() else {
            return;
        };
        if image.roi == roi {
            return;
        }

        let updated = Arc::new(image.with_roi(roi));

        let mut state = self.state.write();
        let unchanged = state
            .current_image
            .as_ref()
            .map(|current| Arc::ptr_eq(current, &image))
            .unwrap_or(false);
        if unchanged {
            state.current_image = Some(updated);
        }
    }
}
