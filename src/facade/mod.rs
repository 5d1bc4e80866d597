mod command;
mod dispatch;
mod response;
#[cfg(test)]
mod tests;

pub use command::{Command, Method};
pub use dispatch::CommandFacade;
pub use response::{FacadeResponse, ResponseBody, NO_IMAGE_BODY};
