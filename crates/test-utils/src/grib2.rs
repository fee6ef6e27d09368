//! Synthetic GRIB2 messages.
//!
//! Builds minimal but structurally valid GRIB2 edition 2 messages: a regular
//! lat/lon grid (template 3.0), product template 4.0 with an optional second
//! fixed surface, simple packing (template 5.0) at 16 bits, and a bitmap
//! whenever the data contains NaN.

/// Builder for a single GRIB2 message.
#[derive(Debug, Clone)]
pub struct Grib2Builder {
    discipline: u8,
    center: u16,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    ni: u32,
    nj: u32,
    la1: i32,
    lo1: i32,
    la2: i32,
    lo2: i32,
    di: u32,
    dj: u32,
    scanning_mode: u8,
    param_category: u8,
    param_number: u8,
    level_type: u8,
    level_scale: u8,
    level_value: u32,
    second_surface: Option<(u8, u32)>,
    forecast_hour: u32,
    data_values: Vec<f32>,
}

impl Default for Grib2Builder {
    fn default() -> Self {
        Self::new_hrrr()
    }
}

impl Grib2Builder {
    /// A small 8x6 convection-allowing-model style grid: NCEP, 2 m
    /// temperature, 2020-05-01 00 UTC run.
    pub fn new_hrrr() -> Self {
        let ni = 8;
        let nj = 6;
        Self {
            discipline: 0,
            center: 7,
            year: 2020,
            month: 5,
            day: 1,
            hour: 0,
            ni,
            nj,
            la1: 40_000_000,
            lo1: 260_000_000,
            la2: 35_000_000,
            lo2: 267_000_000,
            di: 1_000_000,
            dj: 1_000_000,
            scanning_mode: 0b0100_0000,
            param_category: 0,
            param_number: 0,
            level_type: 103,
            level_scale: 0,
            level_value: 2,
            second_surface: None,
            forecast_hour: 0,
            data_values: vec![288.15; (ni * nj) as usize],
        }
    }

    pub fn with_discipline(mut self, discipline: u8) -> Self {
        self.discipline = discipline;
        self
    }

    pub fn with_reference_time(mut self, year: u16, month: u8, day: u8, hour: u8) -> Self {
        self.year = year;
        self.month = month;
        self.day = day;
        self.hour = hour;
        self
    }

    /// Resize the grid; data resets to zeros.
    pub fn with_grid(mut self, ni: u32, nj: u32) -> Self {
        self.ni = ni;
        self.nj = nj;
        self.data_values = vec![0.0; (ni * nj) as usize];
        self
    }

    pub fn with_parameter(mut self, category: u8, number: u8) -> Self {
        self.param_category = category;
        self.param_number = number;
        self
    }

    /// First fixed surface. Isobaric levels (type 100) are given in Pa.
    pub fn with_level(mut self, level_type: u8, level_value: u32) -> Self {
        self.level_type = level_type;
        self.level_scale = 0;
        self.level_value = level_value;
        self
    }

    /// First fixed surface with an explicit decimal scale factor.
    pub fn with_scaled_level(mut self, level_type: u8, scale: u8, scaled_value: u32) -> Self {
        self.level_type = level_type;
        self.level_scale = scale;
        self.level_value = scaled_value;
        self
    }

    /// Second fixed surface, which makes the record a layer.
    pub fn with_second_surface(mut self, level_type: u8, level_value: u32) -> Self {
        self.second_surface = Some((level_type, level_value));
        self
    }

    pub fn with_forecast_hour(mut self, hour: u32) -> Self {
        self.forecast_hour = hour;
        self
    }

    pub fn with_constant_value(mut self, value: f32) -> Self {
        self.data_values = vec![value; (self.ni * self.nj) as usize];
        self
    }

    pub fn with_gradient(mut self, min_val: f32, max_val: f32) -> Self {
        let n = (self.ni * self.nj) as usize;
        self.data_values = (0..n)
            .map(|i| min_val + (max_val - min_val) * (i as f32 / n as f32))
            .collect();
        self
    }

    /// Row-major values; NaN marks missing points.
    pub fn with_data(mut self, data: Vec<f32>) -> Self {
        self.data_values = data;
        self
    }

    /// Build the complete GRIB2 message bytes.
    pub fn build(&self) -> Vec<u8> {
        let sections = [
            self.build_section1(),
            self.build_section3(),
            self.build_section4(),
            self.build_section5(),
            self.build_section6(),
            self.build_section7(),
        ];

        let message_length = 16 + sections.iter().map(Vec::len).sum::<usize>() + 4;

        let mut message = Vec::with_capacity(message_length);
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]);
        message.push(self.discipline);
        message.push(2);
        message.extend_from_slice(&(message_length as u64).to_be_bytes());
        for section in &sections {
            message.extend_from_slice(section);
        }
        message.extend_from_slice(b"7777");
        message
    }

    fn present_values(&self) -> impl Iterator<Item = f32> + '_ {
        self.data_values.iter().copied().filter(|v| !v.is_nan())
    }

    fn has_missing(&self) -> bool {
        self.data_values.iter().any(|v| v.is_nan())
    }

    /// (reference value, binary scale factor, bits per value)
    fn packing(&self) -> (f32, i16, u8) {
        let (min_val, max_val) = self
            .present_values()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), v| {
                (min.min(v), max.max(v))
            });

        if !min_val.is_finite() {
            return (0.0, 0, 0);
        }

        let range = max_val - min_val;
        if range == 0.0 {
            return (min_val, 0, 0);
        }

        // value = R + X * 2^E with X < 2^16
        let binary_scale_factor = (range / 65535.0).log2().ceil() as i16;
        (min_val, binary_scale_factor, 16)
    }

    fn build_section1(&self) -> Vec<u8> {
        let mut section = Vec::with_capacity(21);
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(1);
        section.extend_from_slice(&self.center.to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // sub-center
        section.push(2); // master table version
        section.push(1); // local table version
        section.push(1); // start of forecast
        section.extend_from_slice(&self.year.to_be_bytes());
        section.push(self.month);
        section.push(self.day);
        section.push(self.hour);
        section.push(0);
        section.push(0);
        section.push(0); // operational
        section.push(1); // forecast
        section
    }

    fn build_section3(&self) -> Vec<u8> {
        let mut section = Vec::with_capacity(72);
        section.extend_from_slice(&72u32.to_be_bytes());
        section.push(3);
        section.push(0);
        section.extend_from_slice(&(self.ni * self.nj).to_be_bytes());
        section.push(0);
        section.push(0);
        section.extend_from_slice(&0u16.to_be_bytes()); // template 3.0

        section.push(6); // spherical earth, radius 6371229 m
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.extend_from_slice(&self.ni.to_be_bytes());
        section.extend_from_slice(&self.nj.to_be_bytes());
        section.extend_from_slice(&0u32.to_be_bytes()); // basic angle
        section.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes());
        section.extend_from_slice(&encode_signed_u32(self.la1));
        section.extend_from_slice(&encode_signed_u32(self.lo1));
        section.push(48);
        section.extend_from_slice(&encode_signed_u32(self.la2));
        section.extend_from_slice(&encode_signed_u32(self.lo2));
        section.extend_from_slice(&self.di.to_be_bytes());
        section.extend_from_slice(&self.dj.to_be_bytes());
        section.push(self.scanning_mode);
        section
    }

    fn build_section4(&self) -> Vec<u8> {
        let mut section = Vec::with_capacity(34);
        section.extend_from_slice(&34u32.to_be_bytes());
        section.push(4);
        section.extend_from_slice(&0u16.to_be_bytes()); // coordinate values
        section.extend_from_slice(&0u16.to_be_bytes()); // template 4.0
        section.push(self.param_category);
        section.push(self.param_number);
        section.push(2); // forecast
        section.push(0);
        section.push(0);
        section.extend_from_slice(&0u16.to_be_bytes());
        section.push(0);
        section.push(1); // hours
        section.extend_from_slice(&self.forecast_hour.to_be_bytes());

        section.push(self.level_type);
        section.push(self.level_scale);
        section.extend_from_slice(&self.level_value.to_be_bytes());

        match self.second_surface {
            Some((level_type, value)) => {
                section.push(level_type);
                section.push(0);
                section.extend_from_slice(&value.to_be_bytes());
            }
            None => {
                section.push(255);
                section.push(0);
                section.extend_from_slice(&0u32.to_be_bytes());
            }
        }
        section
    }

    fn build_section5(&self) -> Vec<u8> {
        let (reference_value, binary_scale_factor, bits_per_value) = self.packing();
        let num_packed = self.present_values().count() as u32;

        let mut section = Vec::with_capacity(21);
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(5);
        section.extend_from_slice(&num_packed.to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // template 5.0
        section.extend_from_slice(&reference_value.to_be_bytes());
        section.extend_from_slice(&encode_signed_u16(binary_scale_factor));
        section.extend_from_slice(&encode_signed_u16(0));
        section.push(bits_per_value);
        section.push(0);
        section
    }

    fn build_section6(&self) -> Vec<u8> {
        if !self.has_missing() {
            let mut section = 6u32.to_be_bytes().to_vec();
            section.push(6);
            section.push(255);
            return section;
        }

        let mut bitmap = vec![0u8; self.data_values.len().div_ceil(8)];
        for (i, v) in self.data_values.iter().enumerate() {
            if !v.is_nan() {
                bitmap[i / 8] |= 0x80 >> (i % 8);
            }
        }

        let mut section = ((6 + bitmap.len()) as u32).to_be_bytes().to_vec();
        section.push(6);
        section.push(0);
        section.extend_from_slice(&bitmap);
        section
    }

    fn build_section7(&self) -> Vec<u8> {
        let (reference_value, binary_scale_factor, bits_per_value) = self.packing();

        let mut packed = Vec::new();
        if bits_per_value > 0 {
            let binary_scale = 2.0_f32.powi(binary_scale_factor as i32);
            for v in self.present_values() {
                let x = ((v - reference_value) / binary_scale).round().clamp(0.0, 65535.0) as u16;
                packed.extend_from_slice(&x.to_be_bytes());
            }
        }

        let mut section = ((5 + packed.len()) as u32).to_be_bytes().to_vec();
        section.push(7);
        section.extend_from_slice(&packed);
        section
    }
}

/// Concatenate messages into one GRIB2 file.
pub fn build_grib2_file(messages: &[Grib2Builder]) -> Vec<u8> {
    messages.iter().flat_map(|m| m.build()).collect()
}

fn encode_signed_u16(value: i16) -> [u8; 2] {
    let magnitude = value.unsigned_abs() & 0x7FFF;
    let raw = if value < 0 { magnitude | 0x8000 } else { magnitude };
    raw.to_be_bytes()
}

fn encode_signed_u32(value: i32) -> [u8; 4] {
    let magnitude = value.unsigned_abs() & 0x7FFF_FFFF;
    let raw = if value < 0 { magnitude | 0x8000_0000 } else { magnitude };
    raw.to_be_bytes()
}
