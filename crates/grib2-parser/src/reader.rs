//! Sequential GRIB2 message reader.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{Grib2Error, Result};
use crate::sections::{
    self, Bitmap, DataRepresentation, DataSection, GridDefinition, Identification, Indicator,
    ProductDefinition,
};
use crate::tables::{Grib2Tables, ParameterInfo};
use crate::unpacking;

/// A single parsed GRIB2 message.
#[derive(Debug, Clone)]
pub struct Grib2Message {
    pub indicator: Indicator,
    pub identification: Identification,
    pub grid_definition: GridDefinition,
    pub product_definition: ProductDefinition,
    pub data_representation: DataRepresentation,
    pub bitmap: Option<Bitmap>,
    pub data_section: DataSection,
    /// Bytes of the whole message, `GRIB` through `7777`.
    pub raw_data: Bytes,
}

impl Grib2Message {
    /// Parse every section of one message.
    pub fn parse(raw_data: Bytes) -> Result<Self> {
        let indicator = sections::parse_indicator(&raw_data)?;
        let identification = sections::parse_identification(&raw_data)?;
        let grid_definition = sections::parse_grid_definition(&raw_data)?;
        let product_definition = sections::parse_product_definition(&raw_data)?;
        let data_representation = sections::parse_data_representation(&raw_data)?;
        let bitmap = sections::parse_bitmap(&raw_data)?;
        let data_section = sections::parse_data_section(&raw_data)?;

        Ok(Self {
            indicator,
            identification,
            grid_definition,
            product_definition,
            data_representation,
            bitmap,
            data_section,
            raw_data,
        })
    }

    pub fn discipline(&self) -> u8 {
        self.indicator.discipline
    }

    /// Parameter names and units from the given tables.
    pub fn parameter(&self, tables: &Grib2Tables) -> ParameterInfo {
        tables.parameter(
            self.indicator.discipline,
            self.product_definition.parameter_category,
            self.product_definition.parameter_number,
        )
    }

    /// Grid dimensions as (rows, cols).
    pub fn grid_dims(&self) -> (usize, usize) {
        (
            self.grid_definition.nj as usize,
            self.grid_definition.ni as usize,
        )
    }

    /// Decode the field values in scan order. Points masked out by the
    /// bitmap come back as NaN.
    pub fn unpack_data(&self) -> Result<Vec<f32>> {
        let (rows, cols) = self.grid_dims();
        let expected = rows * cols;

        let values = if self.data_representation.template == 0 {
            let dr = &self.data_representation;
            unpacking::unpack_simple(
                &self.data_section.data,
                self.grid_definition.num_data_points,
                dr.bits_per_value,
                dr.reference_value,
                dr.binary_scale_factor,
                dr.decimal_scale_factor,
                self.bitmap.as_ref().map(|bm| bm.data.as_ref()),
            )?
            .into_iter()
            .map(|v| v.unwrap_or(f32::NAN))
            .collect::<Vec<f32>>()
        } else {
            debug!(
                template = self.data_representation.template,
                "Decoding packed data with grib crate"
            );
            unpacking::unpack_with_grib_crate(&self.raw_data)?
        };

        if values.len() != expected {
            return Err(Grib2Error::UnpackingError(format!(
                "decoded {} values for a {}x{} grid",
                values.len(),
                rows,
                cols
            )));
        }

        Ok(values)
    }
}

/// Reads GRIB2 messages one after another from an in-memory file.
pub struct Grib2Reader {
    data: Bytes,
    offset: usize,
}

impl Grib2Reader {
    pub fn new(data: Bytes) -> Self {
        Self { data, offset: 0 }
    }

    /// Read the next message, skipping any padding between messages.
    ///
    /// Returns `Ok(None)` once no further `GRIB` marker is found.
    pub fn next_message(&mut self) -> Result<Option<Grib2Message>> {
        let start = match find_magic(&self.data, self.offset) {
            Some(start) => start,
            None => {
                self.offset = self.data.len();
                return Ok(None);
            }
        };

        if start > self.offset {
            warn!(
                skipped = start - self.offset,
                offset = self.offset,
                "Skipping bytes before GRIB marker"
            );
        }

        let indicator = sections::parse_indicator(&self.data[start..])?;
        let length = indicator.message_length as usize;
        let end = start
            .checked_add(length)
            .filter(|&end| end <= self.data.len() && length >= 20)
            .ok_or_else(|| {
                Grib2Error::InvalidFormat(format!(
                    "message at offset {} declares length {} but file has {} bytes",
                    start,
                    length,
                    self.data.len()
                ))
            })?;

        if &self.data[end - 4..end] != b"7777" {
            return Err(Grib2Error::InvalidFormat(format!(
                "message at offset {} is missing its 7777 end marker",
                start
            )));
        }

        self.offset = end;
        Grib2Message::parse(self.data.slice(start..end)).map(Some)
    }

    /// Parse every remaining message.
    pub fn read_all(&mut self) -> Result<Vec<Grib2Message>> {
        let mut messages = Vec::new();
        while let Some(message) = self.next_message()? {
            messages.push(message);
        }
        Ok(messages)
    }
}

fn find_magic(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(4)
        .position(|w| w == b"GRIB")
        .map(|pos| from + pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_has_no_messages() {
        let mut reader = Grib2Reader::new(Bytes::new());
        assert!(reader.next_message().unwrap().is_none());
    }

    #[test]
    fn test_find_magic_skips_padding() {
        let data = b"\0\0\0GRIB";
        assert_eq!(find_magic(data, 0), Some(3));
        assert_eq!(find_magic(data, 4), None);
    }

    #[test]
    fn test_truncated_message_is_rejected() {
        let mut data = b"GRIB".to_vec();
        data.extend_from_slice(&[0, 0, 0, 2]);
        data.extend_from_slice(&1000u64.to_be_bytes());

        let mut reader = Grib2Reader::new(Bytes::from(data));
        assert!(matches!(
            reader.next_message(),
            Err(Grib2Error::InvalidFormat(_))
        ));
    }
}
