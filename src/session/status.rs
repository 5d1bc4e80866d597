use super::state::SessionState;
use crate::stats::StatsSummary;
use serde::Serialize;

/// JSON document returned by `getData`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDocument {
    pub status_val: i32,
    pub status: String,
    pub error_state: i32,
    pub msg: String,
    pub connected: bool,
    pub camera_id: String,
    pub exposure_time: f64,
    pub frame_size_x: u32,
    pub frame_size_y: u32,
    pub sub_frame_origin_x: u32,
    pub sub_frame_origin_y: u32,
    pub sub_frame_size_x: u32,
    pub sub_frame_size_y: u32,
    pub roi_origin_x: u32,
    pub roi_origin_y: u32,
    pub roi_size_x: u32,
    pub roi_size_y: u32,
    pub cooler_setpoint: f64,
    pub cooler_on: bool,
    pub continuous_mode: bool,
    pub auto_save: bool,
    pub save_name_root: String,
    pub x_profile_width: u32,
    pub y_profile_width: u32,
    /// Capture time of the current image in Unix seconds, 0 when none
    pub cur_image_time: f64,
    pub image_sequence: u64,
    pub image_width: u32,
    pub image_height: u32,
    pub image_stats: Option<StatsSummary>,
    pub roi_stats: Option<StatsSummary>,
}

impl StatusDocument {
    /// Snapshot `state`. All image fields come from the same product.
    pub fn from_state(camera_id: &str, state: &SessionState) -> Self {
        let config = &state.config;
        let image = state.current_image.as_deref();

        Self {
            status_val: state.status.code(),
            status: state.status.to_string(),
            error_state: state.error_state.code(),
            msg: state.message.clone(),
            connected: state.connected,
            camera_id: camera_id.to_string(),
            exposure_time: config.exposure_time,
            frame_size_x: state.sensor.width,
            frame_size_y: state.sensor.height,
            sub_frame_origin_x: config.sub_frame.origin_x,
            sub_frame_origin_y: config.sub_frame.origin_y,
            sub_frame_size_x: config.sub_frame.size_x,
            sub_frame_size_y: config.sub_frame.size_y,
            roi_origin_x: config.roi.origin_x,
            roi_origin_y: config.roi.origin_y,
            roi_size_x: config.roi.size_x,
            roi_size_y: config.roi.size_y,
            cooler_setpoint: config.cooler_setpoint,
            cooler_on: config.cooler_enabled,
            continuous_mode: config.continuous,
            auto_save: config.auto_save,
            save_name_root: config.save_name_root.clone(),
            x_profile_width: config.x_profile_width,
            y_profile_width: config.y_profile_width,
            cur_image_time: image.map(|i| i.captured_at_epoch()).unwrap_or(0.0),
            image_sequence: image.map(|i| i.sequence).unwrap_or(0),
            image_width: image.map(|i| i.width).unwrap_or(0),
            image_height: image.map(|i| i.height).unwrap_or(0),
            image_stats: image.map(|i| i.whole_image_stats.summary()),
            roi_stats: image.map(|i| i.roi_stats.summary()),
        }
    }
}
