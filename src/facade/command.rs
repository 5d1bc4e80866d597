use crate::error::{CcdError, Result};
use std::fmt;

/// Request method as far as the command surface cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Other(other) => write!(f, "{}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    GetData,
    GetImage,
    GetRoiImage,
    GetFullImage,
    GetFrameHistogram,
    GetRoiHistogram,
    GetXProfile,
    GetYProfile,
    GetRoiXProfile,
    GetRoiYProfile,
    GetRoiStats,
    StartExposure,
    StartContinuousExposures,
    StopContinuousExposures,
    SaveImage,
    StartAutoSave,
    StopAutoSave,
    SetExposureTime,
    SetCooler,
    StopCooler,
    SetSubFrame,
    ClearSubFrame,
    SetRoi,
    ClearRoi,
    SetProfileWidth,
}

const GET_COMMANDS: &[(&str, Command)] = &[
    ("getData", Command::GetData),
    ("getImage", Command::GetImage),
    ("getRoiImage", Command::GetRoiImage),
    ("getFullImage", Command::GetFullImage),
    ("getFrameHistogram", Command::GetFrameHistogram),
    ("getRoiHistogram", Command::GetRoiHistogram),
    ("getXProfile", Command::GetXProfile),
    ("getYProfile", Command::GetYProfile),
    ("getRoiXProfile", Command::GetRoiXProfile),
    ("getRoiYProfile", Command::GetRoiYProfile),
    ("getRoiStats", Command::GetRoiStats),
];

const POST_COMMANDS: &[(&str, Command)] = &[
    ("startExposure", Command::StartExposure),
    ("startContinuousExposures", Command::StartContinuousExposures),
    ("stopContinuousExposures", Command::StopContinuousExposures),
    ("saveImage", Command::SaveImage),
    ("startAutoSave", Command::StartAutoSave),
    ("stopAutoSave", Command::StopAutoSave),
    ("setExposureTime", Command::SetExposureTime),
    ("setCooler", Command::SetCooler),
    ("stopCooler", Command::StopCooler),
    ("setSubFrame", Command::SetSubFrame),
    ("clearSubFrame", Command::ClearSubFrame),
    ("setRoi", Command::SetRoi),
    ("clearRoi", Command::ClearRoi),
    ("setProfileWidth", Command::SetProfileWidth),
];

impl Command {
    /// Case-insensitive lookup of `name` among the commands for `method`
    pub fn lookup(method: &Method, name: &str) -> Result<Self> {
        let table = match method {
            Method::Get => GET_COMMANDS,
            Method::Post => POST_COMMANDS,
            Method::Other(other) => {
                return Err(CcdError::UnsupportedMethod {
                    method: other.clone(),
                })
            }
        };

        table
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(_, command)| *command)
            .ok_or_else(|| CcdError::UnrecognizedCommand {
                command: name.to_string(),
            })
    }

    /// Whether the command returns a rendering of the current image
    pub fn needs_image(self) -> bool {
        matches!(
            self,
            Command::GetImage
                | Command::GetRoiImage
                | Command::GetFullImage
                | Command::GetFrameHistogram
                | Command::GetRoiHistogram
                | Command::GetXProfile
                | Command::GetYProfile
                | Command::GetRoiXProfile
                | Command::GetRoiYProfile
                | Command::GetRoiStats
        )
    }
}
