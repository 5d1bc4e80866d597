pub mod config;
pub mod device;
pub mod error;
pub mod facade;
pub mod geometry;
pub mod payload;
pub mod product;
pub mod render;
pub mod sequence;
pub mod session;
pub mod stats;

#[cfg(feature = "http")]
pub mod server;

pub use config::CcdConfig;
pub use error::{CcdError, DecodeError, DeviceError, Result};
pub use facade::{CommandFacade, FacadeResponse};
pub use product::ImageProduct;
pub use session::{SessionController, SessionStatus};

#[cfg(feature = "http")]
pub use server::{CommandServer, CommandServerBuilder};
