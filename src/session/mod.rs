mod configure;
mod connect;
mod controller;
mod exposure;
mod persist;
mod state;
mod status;

pub use controller::{SessionController, SessionSettings};
pub use persist::{image_file_name, SaveFormat};
pub use state::{CameraConfig, ErrorState, SessionState, SessionStatus};
pub use status::StatusDocument;
