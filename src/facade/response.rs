use crate::error::CcdError;

/// Placeholder returned for image requests before the first exposure
pub const NO_IMAGE_BODY: &str = "<p>No Image</p>";

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(String),
    Png(Vec<u8>),
    Html(String),
    Text(String),
}

impl ResponseBody {
    pub fn content_type(&self) -> &'static str {
        match self {
            ResponseBody::Json(_) => "application/json",
            ResponseBody::Png(_) => "image/png",
            ResponseBody::Html(_) => "text/html; charset=utf-8",
            ResponseBody::Text(_) => "text/plain; charset=utf-8",
        }
    }
}

/// Outcome of one command, independent of the transport
#[derive(Debug, Clone, PartialEq)]
pub struct FacadeResponse {
    /// HTTP-style status code
    pub status: u16,
    pub body: ResponseBody,
}

impl FacadeResponse {
    pub fn ok() -> Self {
        Self::text(200, "ok")
    }

    pub fn text<S: Into<String>>(status: u16, text: S) -> Self {
        Self {
            status,
            body: ResponseBody::Text(text.into()),
        }
    }

    pub fn json(json: String) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Json(json),
        }
    }

    pub fn png(png: Vec<u8>) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Png(png),
        }
    }

    pub fn no_image() -> Self {
        Self {
            status: 200,
            body: ResponseBody::Html(NO_IMAGE_BODY.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<CcdError> for FacadeResponse {
    fn from(error: CcdError) -> Self {
        let status = match &error {
            CcdError::InvalidParameter { .. } => 400,
            CcdError::UnrecognizedCommand { .. } => 404,
            CcdError::UnsupportedMethod { .. } => 405,
            CcdError::NoImage => 409,
            _ => 500,
        };
        FacadeResponse::text(status, format!("ERROR - {}", error))
    }
}
