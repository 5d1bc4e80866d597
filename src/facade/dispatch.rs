use super::command::{Command, Method};
use super::response::FacadeResponse;
use crate::config::AnalysisConfig;
use crate::error::{CcdError, Result};
use crate::geometry::{parse_pair, CandidateRect, ProfileWindows};
use crate::product::ImageProduct;
use crate::render;
use crate::session::SessionController;
use crate::stats::{
    extract_roi_x_profile, extract_roi_y_profile, extract_x_profile, extract_y_profile,
};
use ndarray::Array2;
use std::sync::Arc;
use tracing::{debug, warn};

/// Translates `{command, value, method}` requests into session calls
#[derive(Clone)]
pub struct CommandFacade {
    session: Arc<SessionController>,
    web_max_width: u32,
    web_max_height: u32,
}

impl CommandFacade {
    pub fn new(session: Arc<SessionController>, analysis: &AnalysisConfig) -> Self {
        Self {
            session,
            web_max_width: analysis.web_max_width,
            web_max_height: analysis.web_max_height,
        }
    }

    pub fn session(&self) -> &Arc<SessionController> {
        &self.session
    }

    /// Handle one command. Never fails: errors become error responses.
    pub async fn handle(&self, command: &str, value: &str, method: &str) -> FacadeResponse {
        debug!("Command {} {}/{}", method, command, value);

        let result = match Command::lookup(&Method::parse(method), command) {
            Ok(parsed) => self.dispatch(parsed, value).await,
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            warn!("Command {} {}/{} failed: {}", method, command, value, e);
            FacadeResponse::from(e)
        })
    }

    async fn dispatch(&self, command: Command, value: &str) -> Result<FacadeResponse> {
        if command.needs_image() {
            return match self.session.current_image() {
                Some(image) => self.render(command, &image),
                None => Ok(FacadeResponse::no_image()),
            };
        }

        let session = &self.session;
        match command {
            Command::GetData => {
                let document = session.status_document();
                let json = serde_json::to_string_pretty(&document)
                    .map_err(|e| CcdError::system(format!("Failed to serialise status: {}", e)))?;
                return Ok(FacadeResponse::json(json));
            }
            Command::StartExposure => session.start_exposure().await?,
            Command::StartContinuousExposures => session.start_continuous().await?,
            Command::StopContinuousExposures => session.stop_continuous(),
            Command::SaveImage => {
                session.save_image(optional(value)).await?;
            }
            Command::StartAutoSave => session.start_auto_save(optional(value))?,
            Command::StopAutoSave => session.stop_auto_save(),
            Command::SetExposureTime => {
                session.set_exposure_time(parse_number("setExposureTime", value)?)?
            }
            Command::SetCooler => session.set_cooler(parse_number("setCooler", value)?).await?,
            Command::StopCooler => session.stop_cooler().await?,
            Command::SetSubFrame => {
                session
                    .set_sub_frame(CandidateRect::parse("setSubFrame", value)?)
                    .await?;
            }
            Command::ClearSubFrame => {
                session.clear_sub_frame().await?;
            }
            Command::SetRoi => {
                session.set_roi(CandidateRect::parse("setRoi", value)?);
            }
            Command::ClearRoi => {
                session.clear_roi();
            }
            Command::SetProfileWidth => {
                let (x, y) = parse_widths(value)?;
                session.set_profile_widths(x, y)?;
            }
            _ => {
                return Err(CcdError::system(format!(
                    "Command {:?} has no handler",
                    command
                )))
            }
        }

        Ok(FacadeResponse::ok())
    }

    fn render(&self, command: Command, image: &ImageProduct) -> Result<FacadeResponse> {
        let (max_w, max_h) = (self.web_max_width, self.web_max_height);
        let config = self.session.camera_config();
        let windows =
            ProfileWindows::for_roi(image.roi, config.x_profile_width, config.y_profile_width);

        let png = match command {
            Command::GetImage => render::web_image(&image.pixels, max_w, max_h)?,
            Command::GetRoiImage => render::roi_image(&image.pixels, image.roi, max_w, max_h)?,
            Command::GetFullImage => render::encode_full_png(&image.pixels)?,
            Command::GetFrameHistogram => render::histogram_chart(&image.whole_image_stats)?,
            Command::GetRoiHistogram => render::histogram_chart(&image.roi_stats)?,
            Command::GetXProfile => {
                render::profile_chart(&first_row(&extract_x_profile(&image.pixels, windows.y)))?
            }
            Command::GetYProfile => {
                render::profile_chart(&first_column(&extract_y_profile(&image.pixels, windows.x)))?
            }
            Command::GetRoiXProfile => render::profile_chart(&first_row(&extract_roi_x_profile(
                &image.pixels,
                image.roi,
                windows.y,
            )))?,
            Command::GetRoiYProfile => render::profile_chart(&first_column(
                &extract_roi_y_profile(&image.pixels, image.roi, windows.x),
            ))?,
            Command::GetRoiStats => {
                let json = serde_json::to_string_pretty(&serde_json::json!({
                    "sequence": image.sequence,
                    "roi": image.roi,
                    "stats": image.roi_stats,
                    "stdDevPercent": image.roi_stats.std_dev_percent(),
                }))
                .map_err(|e| CcdError::system(format!("Failed to serialise statistics: {}", e)))?;
                return Ok(FacadeResponse::json(json));
            }
            other => {
                return Err(CcdError::system(format!(
                    "Command {:?} does not render an image",
                    other
                )))
            }
        };

        Ok(FacadeResponse::png(png))
    }
}

fn optional(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn parse_number(command: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CcdError::invalid_parameter(command, value, "expected a number"))
}

fn parse_widths(value: &str) -> Result<(u32, u32)> {
    let invalid = || {
        CcdError::invalid_parameter("setProfileWidth", value, "expected two non-negative widths")
    };
    let (x, y) = parse_pair(value).ok_or_else(invalid)?;
    let x = u32::try_from(x).map_err(|_| invalid())?;
    let y = u32::try_from(y).map_err(|_| invalid())?;
    Ok((x, y))
}

/// The X profile chart plots the first row of the window
fn first_row(profile: &Array2<u16>) -> Vec<u16> {
    profile
        .rows()
        .into_iter()
        .next()
        .map(|r| r.to_vec())
        .unwrap_or_default()
}

fn first_column(profile: &Array2<u16>) -> Vec<u16> {
    profile
        .columns()
        .into_iter()
        .next()
        .map(|c| c.to_vec())
        .unwrap_or_default()
}
