mod client;
mod retry;
mod simulator;
#[cfg(test)]
mod tests;

pub use client::{properties, DeviceClient, DeviceHandle, DevicePayload, PropertyRef};
pub use retry::resolve_with_retry;
pub use simulator::{SimulatedClient, SimulatedClientBuilder, TELESCOPE_SIMULATOR};
