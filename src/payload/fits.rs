use super::PayloadDecoder;
use crate::error::DecodeError;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use std::collections::HashMap;
use tracing::{debug, trace};

/// FITS files are written in blocks of this many bytes
pub const FITS_BLOCK: usize = 2880;
const CARD_LEN: usize = 80;

/// Zero offset for storing unsigned 16-bit data in signed 16-bit integers
const UNSIGNED_BZERO: f64 = 32768.0;

/// Decoder for a FITS primary HDU holding a 2-D 8 or 16-bit image
#[derive(Debug, Default, Clone, Copy)]
pub struct FitsDecoder;

impl FitsDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Whether `format` names a FITS payload (`.fits`, `fits`, `.fit`)
    pub fn accepts(format: &str) -> bool {
        matches!(
            format.trim_start_matches('.').to_ascii_lowercase().as_str(),
            "fits" | "fit" | "fts"
        )
    }
}

impl PayloadDecoder for FitsDecoder {
    fn decode(&self, format: &str, data: &[u8]) -> Result<Array2<u16>, DecodeError> {
        if !Self::accepts(format) {
            return Err(DecodeError::UnknownFormat {
                format: format.to_string(),
            });
        }
        decode_fits(data)
    }
}

struct Header {
    cards: HashMap<String, String>,
    /// Byte offset of the data unit
    data_offset: usize,
}

impl Header {
    fn integer(&self, keyword: &str) -> Result<i64, DecodeError> {
        self.cards
            .get(keyword)
            .and_then(|v| v.parse::<f64>().ok())
            .map(|v| v as i64)
            .ok_or_else(|| DecodeError::MissingKeyword {
                keyword: keyword.to_string(),
            })
    }

    fn float_or(&self, keyword: &str, default: f64) -> f64 {
        self.cards
            .get(keyword)
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(default)
    }
}

fn parse_header(data: &[u8]) -> Result<Header, DecodeError> {
    let mut cards = HashMap::new();
    let mut offset = 0;

    loop {
        let end = offset + CARD_LEN;
        if end > data.len() {
            return Err(DecodeError::MissingKeyword {
                keyword: "END".to_string(),
            });
        }

        let card = String::from_utf8_lossy(&data[offset..end]);
        offset = end;

        let keyword = card.get(..8).unwrap_or("").trim_end();
        if keyword == "END" {
            break;
        }
        if card.get(8..10) != Some("= ") {
            // COMMENT, HISTORY and blank cards
            continue;
        }

        let value = card_value(card.get(10..).unwrap_or(""));
        trace!("FITS card {} = {}", keyword, value);
        cards.insert(keyword.to_string(), value);
    }

    let data_offset = offset.div_ceil(FITS_BLOCK) * FITS_BLOCK;
    Ok(Header { cards, data_offset })
}

/// Value field of a card with any trailing comment and string quotes removed
fn card_value(field: &str) -> String {
    let field = field.trim_start();
    if let Some(rest) = field.strip_prefix('\'') {
        let text = rest.split('\'').next().unwrap_or("");
        return text.trim_end().to_string();
    }
    field.split('/').next().unwrap_or("").trim().to_string()
}

fn decode_fits(data: &[u8]) -> Result<Array2<u16>, DecodeError> {
    let header = parse_header(data)?;

    let naxis = header.integer("NAXIS")?;
    if naxis != 2 {
        return Err(DecodeError::Unsupported {
            details: format!("NAXIS = {} (only 2-D images are supported)", naxis),
        });
    }

    let bitpix = header.integer("BITPIX")?;
    let width = header.integer("NAXIS1")?.max(0) as usize;
    let height = header.integer("NAXIS2")?.max(0) as usize;
    let bzero = header.float_or("BZERO", 0.0);
    let bscale = header.float_or("BSCALE", 1.0);

    let bytes_per_pixel = match bitpix {
        8 => 1,
        16 => 2,
        other => {
            return Err(DecodeError::Unsupported {
                details: format!("BITPIX = {}", other),
            })
        }
    };

    let expected = width
        .checked_mul(height)
        .and_then(|pixels| pixels.checked_mul(bytes_per_pixel))
        .and_then(|size| size.checked_add(header.data_offset))
        .ok_or_else(|| DecodeError::Unsupported {
            details: format!("image size {}x{} is too large", width, height),
        })?;
    if data.len() < expected {
        return Err(DecodeError::Truncated {
            expected,
            actual: data.len(),
        });
    }

    let body = &data[header.data_offset..expected];
    let physical = |raw: f64| (bzero + bscale * raw).round().clamp(0.0, u16::MAX as f64) as u16;

    let samples: Vec<u16> = match bitpix {
        8 => body.iter().map(|&b| physical(b as f64)).collect(),
        _ => body
            .chunks_exact(2)
            .map(|pair| physical(i16::from_be_bytes([pair[0], pair[1]]) as f64))
            .collect(),
    };

    debug!(
        "Decoded FITS image {}x{} (BITPIX {}, BZERO {}, BSCALE {})",
        width, height, bitpix, bzero, bscale
    );

    Array2::from_shape_vec((height, width), samples).map_err(|e| DecodeError::Unsupported {
        details: e.to_string(),
    })
}

fn push_card(header: &mut Vec<u8>, keyword: &str, value: &str) {
    let card = format!("{:<8}= {:>20}", keyword, value);
    push_padded(header, &card);
}

fn push_padded(header: &mut Vec<u8>, text: &str) {
    let mut card = text.as_bytes().to_vec();
    card.resize(CARD_LEN, b' ');
    header.extend_from_slice(&card[..CARD_LEN]);
}

/// Encode pixels as a single-HDU FITS file (BITPIX 16, BZERO 32768)
pub fn encode_fits(pixels: &Array2<u16>, captured_at: DateTime<Utc>) -> Vec<u8> {
    let (height, width) = pixels.dim();
    let mut out = Vec::with_capacity(FITS_BLOCK * 2 + width * height * 2);

    push_card(&mut out, "SIMPLE", "T");
    push_card(&mut out, "BITPIX", "16");
    push_card(&mut out, "NAXIS", "2");
    push_card(&mut out, "NAXIS1", &width.to_string());
    push_card(&mut out, "NAXIS2", &height.to_string());
    push_card(&mut out, "BZERO", "32768");
    push_card(&mut out, "BSCALE", "1");
    push_padded(
        &mut out,
        &format!(
            "{:<8}= '{}'",
            "DATE-OBS",
            captured_at.format("%Y-%m-%dT%H:%M:%S%.3f")
        ),
    );
    push_padded(&mut out, "END");
    out.resize(out.len().div_ceil(FITS_BLOCK) * FITS_BLOCK, b' ');

    // ndarray iterates in logical row-major order regardless of memory layout
    for &value in pixels.iter() {
        let stored = (value as f64 - UNSIGNED_BZERO) as i16;
        out.extend_from_slice(&stored.to_be_bytes());
    }
    out.resize(out.len().div_ceil(FITS_BLOCK) * FITS_BLOCK, 0);

    out
}
