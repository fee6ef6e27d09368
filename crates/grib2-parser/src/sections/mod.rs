//! GRIB2 section parsing.
//!
//! Each GRIB2 message is a sequence of numbered sections. The functions in
//! this module take the bytes of a single message (starting at `GRIB`) and
//! decode the fields the record index needs: reference time, grid shape,
//! parameter codes, fixed surfaces and packing parameters.

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{Grib2Error, Result};

/// Section 0: Indicator Section (16 bytes)
#[derive(Debug, Clone)]
pub struct Indicator {
    pub discipline: u8,
    pub edition: u8,
    pub message_length: u64,
}

/// Section 1: Identification Section
#[derive(Debug, Clone)]
pub struct Identification {
    pub center: u16,
    pub sub_center: u16,
    pub reference_time: DateTime<Utc>,
    pub production_status: u8,
    pub data_type: u8,
}

/// Section 3: Grid Definition Section
#[derive(Debug, Clone)]
pub struct GridDefinition {
    pub template: u16,
    pub num_data_points: u32,
    /// Points along a parallel (x).
    pub ni: u32,
    /// Points along a meridian (y).
    pub nj: u32,
    /// Lat/lon of the first and last grid points in degrees. Only filled for
    /// template 3.0; projected grids leave them at zero.
    pub first_latitude: f64,
    pub first_longitude: f64,
    pub last_latitude: f64,
    pub last_longitude: f64,
    pub scanning_mode: u8,
}

/// A fixed surface from Section 4 (type code plus scaled value).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSurface {
    pub surface_type: u8,
    pub value: f64,
}

/// Section 4: Product Definition Section
#[derive(Debug, Clone)]
pub struct ProductDefinition {
    pub template: u16,
    pub parameter_category: u8,
    pub parameter_number: u8,
    /// Forecast time converted to hours.
    pub forecast_hour: u32,
    pub first_surface: FixedSurface,
    pub second_surface: Option<FixedSurface>,
}

/// Section 5: Data Representation Section
#[derive(Debug, Clone)]
pub struct DataRepresentation {
    pub num_data_points: u32,
    pub template: u16,
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub bits_per_value: u8,
    pub original_data_type: u8,
}

/// Section 6: Bitmap Section
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub indicator: u8,
    pub data: Bytes,
}

/// Section 7: Data Section
#[derive(Debug, Clone)]
pub struct DataSection {
    pub data: Bytes,
}

const MISSING_U32: u32 = 0xFFFF_FFFF;
const NO_SURFACE: u8 = 255;

/// Decode a 4-byte GRIB2 sign-magnitude integer (MSB is the sign bit).
///
/// Returns 0 for slices that are not exactly four bytes long.
pub fn decode_grib2_signed(bytes: &[u8]) -> i32 {
    if bytes.len() != 4 {
        return 0;
    }
    let raw = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let magnitude = (raw & 0x7FFF_FFFF) as i32;
    if raw & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Decode a 2-byte GRIB2 sign-magnitude integer.
fn decode_grib2_signed_i16(hi: u8, lo: u8) -> i16 {
    let raw = u16::from_be_bytes([hi, lo]);
    let magnitude = (raw & 0x7FFF) as i16;
    if raw & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Parse Section 0 (Indicator) from the start of a message.
pub fn parse_indicator(data: &[u8]) -> Result<Indicator> {
    if data.len() < 16 {
        return Err(Grib2Error::InvalidFormat(
            "not enough data for indicator section".to_string(),
        ));
    }

    if &data[0..4] != b"GRIB" {
        return Err(Grib2Error::InvalidFormat("invalid GRIB magic bytes".to_string()));
    }

    // Octets 5-6 reserved, 7 discipline, 8 edition, 9-16 total length.
    let discipline = data[6];
    let edition = data[7];
    if edition != 2 {
        return Err(Grib2Error::InvalidFormat(format!(
            "expected GRIB edition 2, got {}",
            edition
        )));
    }

    let message_length = u64::from_be_bytes([
        data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15],
    ]);

    Ok(Indicator {
        discipline,
        edition,
        message_length,
    })
}

/// Parse Section 1 (Identification), which always follows the indicator.
pub fn parse_identification(data: &[u8]) -> Result<Identification> {
    let offset = find_section(data, 1)?;
    let sec = &data[offset..];

    if sec.len() < 21 {
        return Err(Grib2Error::InvalidSection {
            section: 1,
            reason: "not enough data".to_string(),
        });
    }

    let center = u16::from_be_bytes([sec[5], sec[6]]);
    let sub_center = u16::from_be_bytes([sec[7], sec[8]]);

    let year = u16::from_be_bytes([sec[12], sec[13]]);
    let (month, day, hour, minute, second) = (sec[14], sec[15], sec[16], sec[17], sec[18]);

    let reference_time = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| Grib2Error::InvalidSection {
            section: 1,
            reason: format!(
                "invalid reference time: {}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ),
        })?;

    Ok(Identification {
        center,
        sub_center,
        reference_time: DateTime::<Utc>::from_naive_utc_and_offset(reference_time, Utc),
        production_status: sec[19],
        data_type: sec[20],
    })
}

/// Parse Section 3 (Grid Definition).
///
/// Template 3.0 (regular lat/lon) is decoded in full. For the projected
/// templates NCEP models use (3.30 Lambert conformal, 3.20 polar
/// stereographic) Nx/Ny sit at the same octets as Ni/Nj, so only the
/// dimensions are taken.
pub fn parse_grid_definition(data: &[u8]) -> Result<GridDefinition> {
    let offset = find_section(data, 3)?;
    let sec = &data[offset..];

    if sec.len() < 14 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: "not enough data".to_string(),
        });
    }

    let num_data_points = read_u32(sec, 6);
    let template = u16::from_be_bytes([sec[12], sec[13]]);
    let gd = &sec[14..];

    if gd.len() < 24 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: format!("template {} too short ({} bytes)", template, gd.len()),
        });
    }

    let ni = read_u32(gd, 16);
    let nj = read_u32(gd, 20);

    if template == 0 && gd.len() >= 58 {
        let micro = |at: usize| decode_grib2_signed(&gd[at..at + 4]) as f64 / 1e6;
        return Ok(GridDefinition {
            template,
            num_data_points,
            ni,
            nj,
            first_latitude: micro(32),
            first_longitude: micro(36),
            last_latitude: micro(41),
            last_longitude: micro(45),
            scanning_mode: gd[57],
        });
    }

    Ok(GridDefinition {
        template,
        num_data_points,
        ni,
        nj,
        first_latitude: 0.0,
        first_longitude: 0.0,
        last_latitude: 0.0,
        last_longitude: 0.0,
        scanning_mode: 0,
    })
}

/// Parse Section 4 (Product Definition).
///
/// Templates 4.0 (instantaneous) and 4.8 (statistically processed, e.g.
/// hourly maxima) share the layout of the octets read here.
/// Forecast time in hours for a code table 4.4 unit. Saturates on
/// corrupt lead times.
fn forecast_hours(time_unit: u8, forecast_time: u32) -> u32 {
    match time_unit {
        0 => forecast_time / 60,
        1 => forecast_time,
        2 => forecast_time.saturating_mul(24),
        10 => forecast_time.saturating_mul(3),
        11 => forecast_time.saturating_mul(6),
        12 => forecast_time.saturating_mul(12),
        _ => forecast_time,
    }
}

pub fn parse_product_definition(data: &[u8]) -> Result<ProductDefinition> {
    let offset = find_section(data, 4)?;
    let sec = &data[offset..];

    if sec.len() < 34 {
        return Err(Grib2Error::InvalidSection {
            section: 4,
            reason: "not enough data".to_string(),
        });
    }

    let template = u16::from_be_bytes([sec[7], sec[8]]);
    let parameter_category = sec[9];
    let parameter_number = sec[10];

    let time_unit = sec[17];
    let forecast_time = read_u32(sec, 18);
    let forecast_hour = forecast_hours(time_unit, forecast_time);

    let first_surface = parse_fixed_surface(sec[22], sec[23], read_u32(sec, 24));
    let second_surface = (sec[28] != NO_SURFACE)
        .then(|| parse_fixed_surface(sec[28], sec[29], read_u32(sec, 30)));

    Ok(ProductDefinition {
        template,
        parameter_category,
        parameter_number,
        forecast_hour,
        first_surface,
        second_surface,
    })
}

/// value = scaled_value / 10^scale_factor; isobaric surfaces are converted
/// from Pa to hPa so levels read like "500".
fn parse_fixed_surface(surface_type: u8, scale_factor: u8, scaled_value: u32) -> FixedSurface {
    let value = if scaled_value == MISSING_U32 {
        0.0
    } else {
        let scale = scale_factor as i8;
        scaled_value as f64 / 10f64.powi(scale as i32)
    };

    let value = if surface_type == 100 { value / 100.0 } else { value };

    FixedSurface {
        surface_type,
        value,
    }
}

/// Parse Section 5 (Data Representation).
pub fn parse_data_representation(data: &[u8]) -> Result<DataRepresentation> {
    let offset = find_section(data, 5)?;
    let sec = &data[offset..];

    if sec.len() < 21 {
        return Err(Grib2Error::InvalidSection {
            section: 5,
            reason: "not enough data".to_string(),
        });
    }

    // Octets 12-21 carry the simple-packing parameters shared by templates
    // 5.0, 5.2, 5.3, 5.40 and 5.41.
    Ok(DataRepresentation {
        num_data_points: read_u32(sec, 5),
        template: u16::from_be_bytes([sec[9], sec[10]]),
        reference_value: f32::from_be_bytes([sec[11], sec[12], sec[13], sec[14]]),
        binary_scale_factor: decode_grib2_signed_i16(sec[15], sec[16]),
        decimal_scale_factor: decode_grib2_signed_i16(sec[17], sec[18]),
        bits_per_value: sec[19],
        original_data_type: sec[20],
    })
}

/// Parse Section 6 (Bitmap). Returns `None` when the indicator says no
/// bitmap applies (255).
pub fn parse_bitmap(data: &[u8]) -> Result<Option<Bitmap>> {
    let offset = find_section(data, 6)?;
    let sec = &data[offset..];

    if sec.len() < 6 {
        return Err(Grib2Error::InvalidSection {
            section: 6,
            reason: "not enough data".to_string(),
        });
    }

    let section_length = read_u32(sec, 0) as usize;
    let indicator = sec[5];

    if indicator == 255 {
        return Ok(None);
    }
    if indicator != 0 {
        return Err(Grib2Error::InvalidSection {
            section: 6,
            reason: format!("predefined bitmap {} is not supported", indicator),
        });
    }

    Ok(Some(Bitmap {
        indicator,
        data: Bytes::copy_from_slice(sec.get(6..section_length).unwrap_or(&[])),
    }))
}

/// Parse Section 7 (Data).
pub fn parse_data_section(data: &[u8]) -> Result<DataSection> {
    let offset = find_section(data, 7)?;
    let sec = &data[offset..];

    let section_length = read_u32(sec, 0) as usize;
    let payload = if section_length > 5 {
        Bytes::copy_from_slice(&sec[5..section_length])
    } else {
        Bytes::new()
    };

    Ok(DataSection { data: payload })
}

/// Find the offset of a section by number within a message.
fn find_section(data: &[u8], section_num: u8) -> Result<usize> {
    let mut offset = 16; // After Section 0

    loop {
        if offset + 5 > data.len() {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "section not found".to_string(),
            });
        }

        if &data[offset..offset + 4] == b"7777" {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "reached end of message without finding section".to_string(),
            });
        }

        let section_length = read_u32(data, offset) as usize;
        if section_length < 5 || offset + section_length > data.len() {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "invalid section length".to_string(),
            });
        }

        if data[offset + 4] == section_num {
            return Ok(offset);
        }

        offset += section_length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_i16_sign_magnitude() {
        assert_eq!(decode_grib2_signed_i16(0x00, 0x05), 5);
        assert_eq!(decode_grib2_signed_i16(0x80, 0x05), -5);
        assert_eq!(decode_grib2_signed_i16(0x80, 0x00), 0);
    }

    #[test]
    fn test_forecast_hours_units() {
        assert_eq!(forecast_hours(0, 90), 1);
        assert_eq!(forecast_hours(1, 18), 18);
        assert_eq!(forecast_hours(2, 2), 48);
        assert_eq!(forecast_hours(10, 4), 12);
        assert_eq!(forecast_hours(12, 3), 36);
    }

    #[test]
    fn test_forecast_hours_saturate() {
        assert_eq!(forecast_hours(2, u32::MAX), u32::MAX);
        assert_eq!(forecast_hours(11, u32::MAX / 2), u32::MAX);
    }

    #[test]
    fn test_fixed_surface_isobaric_in_hpa() {
        let surface = parse_fixed_surface(100, 0, 50_000);
        assert_eq!(surface.value, 500.0);
    }

    #[test]
    fn test_fixed_surface_scale_factor() {
        // 0.5 encoded as 5 with scale factor 1
        let surface = parse_fixed_surface(104, 1, 5);
        assert!((surface.value - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_indicator_rejects_edition_1() {
        let mut data = vec![0u8; 16];
        data[0..4].copy_from_slice(b"GRIB");
        data[7] = 1;
        assert!(matches!(
            parse_indicator(&data),
            Err(Grib2Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_find_section_stops_at_end_marker() {
        let mut data = vec![0u8; 16];
        data[0..4].copy_from_slice(b"GRIB");
        data.extend_from_slice(b"7777");
        data.push(0);
        assert!(find_section(&data, 3).is_err());
    }
}
