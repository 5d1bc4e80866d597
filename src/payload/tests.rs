use super::*;
use crate::error::DecodeError;
use chrono::Utc;
use ndarray::{array, Array2};

fn header_block(cards: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for card in cards {
        let mut bytes = card.as_bytes().to_vec();
        bytes.resize(80, b' ');
        out.extend(bytes);
    }
    let mut end = b"END".to_vec();
    end.resize(80, b' ');
    out.extend(end);
    out.resize(out.len().div_ceil(FITS_BLOCK) * FITS_BLOCK, b' ');
    out
}

#[test]
fn test_encode_then_decode_preserves_full_range() {
    let pixels: Array2<u16> = array![[0u16, 1, 32767], [32768, 40000, 65535]];

    let encoded = encode_fits(&pixels, Utc::now());
    assert_eq!(encoded.len() % FITS_BLOCK, 0);
    assert!(encoded.starts_with(b"SIMPLE  =                    T"));

    let decoded = FitsDecoder::new().decode(".fits", &encoded).unwrap();
    assert_eq!(decoded, pixels);
}

#[test]
fn test_decode_eight_bit_with_scaling() {
    let mut data = header_block(&[
        "SIMPLE  =                    T",
        "BITPIX  =                    8 / bits per pixel",
        "NAXIS   =                    2",
        "NAXIS1  =                    3",
        "NAXIS2  =                    1",
        "BSCALE  =                  2.0",
        "BZERO   =                   10",
        "COMMENT synthetic test frame",
    ]);
    data.extend_from_slice(&[0, 5, 255]);

    let decoded = FitsDecoder::new().decode("fits", &data).unwrap();
    assert_eq!(decoded, array![[10u16, 20, 520]]);
}

#[test]
fn test_decode_rejects_truncated_data() {
    let pixels = Array2::<u16>::zeros((4, 4));
    let encoded = encode_fits(&pixels, Utc::now());

    let result = FitsDecoder::new().decode(".fits", &encoded[..FITS_BLOCK + 10]);
    assert!(matches!(result, Err(DecodeError::Truncated { .. })));
}

#[test]
fn test_decode_rejects_unsupported_layouts() {
    let data = header_block(&[
        "SIMPLE  =                    T",
        "BITPIX  =                  -32",
        "NAXIS   =                    2",
        "NAXIS1  =                    1",
        "NAXIS2  =                    1",
    ]);
    let result = FitsDecoder::new().decode(".fits", &data);
    assert!(matches!(result, Err(DecodeError::Unsupported { .. })));

    let data = header_block(&["SIMPLE  =                    T", "BITPIX  =                   16"]);
    let result = FitsDecoder::new().decode(".fits", &data);
    assert_eq!(
        result,
        Err(DecodeError::MissingKeyword {
            keyword: "NAXIS".to_string()
        })
    );
}

#[test]
fn test_decode_rejects_other_formats() {
    let result = FitsDecoder::new().decode(".jpeg", &[]);
    assert!(matches!(result, Err(DecodeError::UnknownFormat { .. })));
    assert!(FitsDecoder::accepts(".FITS"));
    assert!(FitsDecoder::accepts("fit"));
}

#[test]
fn test_missing_end_card() {
    let result = FitsDecoder::new().decode(".fits", &[b' '; 100]);
    assert_eq!(
        result,
        Err(DecodeError::MissingKeyword {
            keyword: "END".to_string()
        })
    );
}

#[test]
fn test_decode_rejects_oversized_dimensions() {
    let mut data = header_block(&[
        "SIMPLE  =                    T",
        "BITPIX  =                   16",
        "NAXIS   =                    2",
        "NAXIS1  =   288230376151711699",
        "NAXIS2  =                   64",
    ]);
    data.extend(vec![0u8; FITS_BLOCK]);

    let result = FitsDecoder::new().decode(".fits", &data);
    assert!(matches!(result, Err(DecodeError::Unsupported { .. })));

    // large but representable sizes are reported as truncation
    let mut data = header_block(&[
        "SIMPLE  =                    T",
        "BITPIX  =                   16",
        "NAXIS   =                    2",
        "NAXIS1  =              1048576",
        "NAXIS2  =              1048576",
    ]);
    data.extend(vec![0u8; FITS_BLOCK]);

    let result = FitsDecoder::new().decode(".fits", &data);
    assert!(matches!(result, Err(DecodeError::Truncated { .. })));
}
