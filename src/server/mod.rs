mod handlers;
mod http;
mod page;

pub use http::{CommandServer, CommandServerBuilder};
