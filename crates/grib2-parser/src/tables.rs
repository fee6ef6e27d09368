//! GRIB2 parameter and level lookup tables.
//!
//! Translates (discipline, category, number) codes into short names, long
//! names and units, and fixed-surface codes into the `typeOfLevel` names
//! used by ecCodes. Parameters missing from the table come back as
//! `"unknown"`, which is how NCEP local-use fields (RETOP, MAXREF, MXUPHL,
//! ...) appear to generic readers; callers that know those fields supply
//! their own mapping.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

/// Lookup key for parameter: (discipline, category, number)
pub type ParamKey = (u8, u8, u8);

/// Name given to parameters the tables do not know.
pub const UNKNOWN: &str = "unknown";

/// Descriptive metadata for a GRIB2 parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    pub short_name: String,
    pub name: String,
    pub units: String,
}

impl ParameterInfo {
    fn new(short_name: &str, name: &str, units: &str) -> Self {
        Self {
            short_name: short_name.to_string(),
            name: name.to_string(),
            units: units.to_string(),
        }
    }

    /// Placeholder for parameters absent from the tables.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN, UNKNOWN)
    }
}

static WMO_PARAMETERS: &[(ParamKey, &str, &str, &str)] = &[
    // Discipline 0, category 0: temperature
    ((0, 0, 0), "TMP", "Temperature", "K"),
    ((0, 0, 2), "POT", "Potential temperature", "K"),
    ((0, 0, 6), "DPT", "Dew point temperature", "K"),
    // Category 1: moisture
    ((0, 1, 0), "SPFH", "Specific humidity", "kg kg**-1"),
    ((0, 1, 1), "RH", "Relative humidity", "%"),
    ((0, 1, 3), "PWAT", "Precipitable water", "kg m**-2"),
    ((0, 1, 8), "APCP", "Total Precipitation", "kg m**-2"),
    // Category 2: momentum
    ((0, 2, 2), "UGRD", "U component of wind", "m s**-1"),
    ((0, 2, 3), "VGRD", "V component of wind", "m s**-1"),
    ((0, 2, 8), "VVEL", "Vertical velocity", "Pa s**-1"),
    ((0, 2, 22), "GUST", "Wind speed (gust)", "m s**-1"),
    // Category 3: mass
    ((0, 3, 0), "PRES", "Pressure", "Pa"),
    ((0, 3, 1), "PRMSL", "Pressure reduced to MSL", "Pa"),
    ((0, 3, 5), "HGT", "Geopotential Height", "gpm"),
    // Category 6: cloud
    ((0, 6, 1), "TCDC", "Total Cloud Cover", "%"),
    // Category 7: thermodynamic stability
    ((0, 7, 6), "CAPE", "Convective available potential energy", "J kg**-1"),
    ((0, 7, 7), "CIN", "Convective inhibition", "J kg**-1"),
    ((0, 7, 8), "HLCY", "Storm relative helicity", "m**2 s**-2"),
    ((0, 7, 192), "LFTX", "Surface lifted index", "K"),
    // Category 16: forecast radar imagery
    ((0, 16, 195), "REFD", "Derived radar reflectivity", "dB"),
    ((0, 16, 196), "REFC", "Maximum/Composite radar reflectivity", "dB"),
    // Category 19: physical atmospheric properties
    ((0, 19, 0), "VIS", "Visibility", "m"),
    // Discipline 209: MRMS
    ((209, 0, 16), "REFL", "Merged reflectivity QC", "dBZ"),
    ((209, 1, 0), "PrecipRate", "Radar precipitation rate", "mm h**-1"),
];

/// GRIB2 parameter lookup tables.
///
/// The NCEP defaults are built once per process and shared through
/// [`Grib2Tables::shared`]; readers take an `Arc` so custom tables can be
/// injected in tests.
#[derive(Debug, Clone, Default)]
pub struct Grib2Tables {
    parameters: HashMap<ParamKey, ParameterInfo>,
}

static NCEP_TABLES: Lazy<Arc<Grib2Tables>> = Lazy::new(|| {
    let mut tables = Grib2Tables::default();
    for &(key, short_name, name, units) in WMO_PARAMETERS {
        tables
            .parameters
            .insert(key, ParameterInfo::new(short_name, name, units));
    }
    Arc::new(tables)
});

impl Grib2Tables {
    /// Create empty tables; every parameter resolves to "unknown".
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide NCEP/WMO tables.
    pub fn shared() -> Arc<Grib2Tables> {
        Arc::clone(&NCEP_TABLES)
    }

    /// Add or replace a parameter mapping.
    pub fn with_parameter(
        mut self,
        key: ParamKey,
        short_name: &str,
        name: &str,
        units: &str,
    ) -> Self {
        self.parameters
            .insert(key, ParameterInfo::new(short_name, name, units));
        self
    }

    /// Look up a parameter, falling back to [`ParameterInfo::unknown`].
    pub fn parameter(&self, discipline: u8, category: u8, number: u8) -> ParameterInfo {
        self.parameters
            .get(&(discipline, category, number))
            .cloned()
            .unwrap_or_else(ParameterInfo::unknown)
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }
}

/// ecCodes `typeOfLevel` name for a fixed-surface code. `layered` selects
/// the layer variant when the product defines a second surface.
pub fn type_of_level(surface_type: u8, layered: bool) -> &'static str {
    match (surface_type, layered) {
        (1, _) => "surface",
        (2, _) => "cloudBase",
        (3, _) => "cloudTop",
        (4, _) => "isothermZero",
        (6, _) => "maxWind",
        (7, _) => "tropopause",
        (8, _) => "nominalTop",
        (10, _) => "atmosphereSingleLayer",
        (100, false) => "isobaricInhPa",
        (100, true) => "isobaricLayer",
        (101, _) => "meanSea",
        (102, _) => "heightAboveSea",
        (103, false) => "heightAboveGround",
        (103, true) => "heightAboveGroundLayer",
        (104, _) => "sigma",
        (105, _) => "hybrid",
        (106, _) => "depthBelowLandLayer",
        (108, _) => "pressureFromGroundLayer",
        (200, _) => "atmosphere",
        (204, _) => "highestTroposphericFreezing",
        (214, _) => "lowCloudLayer",
        (224, _) => "middleCloudLayer",
        (234, _) => "highCloudLayer",
        _ => UNKNOWN,
    }
}
