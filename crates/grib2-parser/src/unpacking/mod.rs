//! GRIB2 data unpacking.
//!
//! Simple packing (template 5.0) is decoded here directly. Every other
//! packing template (complex, JPEG2000, PNG) is handed to the `grib` crate,
//! which is given the bytes of the single message.

use std::io::Cursor;

use crate::error::{Grib2Error, Result};

/// Unpack simple packed GRIB2 data.
///
/// value = (R + X * 2^E) * 10^(-D). Points cleared in the bitmap come back
/// as `None`; packed values are only stored for points that are present.
pub fn unpack_simple(
    packed_data: &[u8],
    num_points: u32,
    bits_per_value: u8,
    reference_value: f32,
    binary_scale_factor: i16,
    decimal_scale_factor: i16,
    bitmap: Option<&[u8]>,
) -> Result<Vec<Option<f32>>> {
    let binary_scale = 2.0_f32.powi(binary_scale_factor as i32);
    let decimal_scale = 10.0_f32.powi(-(decimal_scale_factor as i32));
    let bits_per_value = bits_per_value as usize;

    let mut values = Vec::with_capacity(num_points as usize);
    let mut bit_position = 0;

    for i in 0..(num_points as usize) {
        let present = match bitmap {
            Some(bm) => bm
                .get(i / 8)
                .map(|byte| (byte >> (7 - (i % 8))) & 1 == 1)
                .unwrap_or(true),
            None => true,
        };

        if !present {
            values.push(None);
            continue;
        }

        let packed_value = if bits_per_value == 0 {
            0
        } else {
            let v = extract_bits(packed_data, bit_position, bits_per_value)
                .map_err(|e| Grib2Error::UnpackingError(format!("failed to extract bits: {}", e)))?;
            bit_position += bits_per_value;
            v
        };

        let value = (reference_value + (packed_value as f32) * binary_scale) * decimal_scale;
        values.push(Some(value));
    }

    Ok(values)
}

/// Decode a single-field message with the `grib` crate.
pub fn unpack_with_grib_crate(message: &[u8]) -> Result<Vec<f32>> {
    let grib2 = grib::from_reader(Cursor::new(message))
        .map_err(|e| Grib2Error::UnpackingError(format!("grib crate could not parse message: {:?}", e)))?;

    let (_, submessage) = grib2
        .iter()
        .next()
        .ok_or_else(|| Grib2Error::UnpackingError("message has no submessages".to_string()))?;

    let decoder = grib::Grib2SubmessageDecoder::from(submessage)
        .map_err(|e| Grib2Error::UnpackingError(format!("failed to create decoder: {:?}", e)))?;
    let values = decoder
        .dispatch()
        .map_err(|e| Grib2Error::UnpackingError(format!("failed to decode values: {:?}", e)))?;

    Ok(values.collect())
}

/// Extract `num_bits` bits, MSB first, starting at `start_bit`.
fn extract_bits(data: &[u8], start_bit: usize, num_bits: usize) -> std::result::Result<u32, String> {
    if num_bits > 32 || num_bits == 0 {
        return Err(format!("invalid number of bits: {}", num_bits));
    }

    let mut result = 0u32;

    for i in 0..num_bits {
        let absolute_bit = start_bit + i;
        let byte_idx = absolute_bit / 8;
        let bit_idx = 7 - (absolute_bit % 8);

        let byte = data
            .get(byte_idx)
            .ok_or_else(|| "not enough data to extract bits".to_string())?;
        result = (result << 1) | ((byte >> bit_idx) & 1) as u32;
    }

    Ok(result)
}
