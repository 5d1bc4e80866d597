mod fits;
#[cfg(test)]
mod tests;

pub use fits::{encode_fits, FitsDecoder, FITS_BLOCK};

use crate::error::DecodeError;
use ndarray::Array2;

/// Turns a binary image payload delivered by the device into pixels
pub trait PayloadDecoder: Send + Sync {
    /// `format` is the device-reported payload format, e.g. `".fits"`
    fn decode(&self, format: &str, data: &[u8]) -> Result<Array2<u16>, DecodeError>;
}
