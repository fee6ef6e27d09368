//! NCEP local-use records that generic parameter tables report as
//! `unknown`, keyed by parameter number.
//!
//! | ID  | name | meaning |
//! |-----|------|---------|
//! | 3-5 | LCDC, MCDC, HCDC | low/middle/high cloud cover |
//! | 6, 7 | CAPE, CIN (long names) | convective available potential energy, convective inhibition |
//! | 197 | RETOP | echo top |
//! | 198 | MAXREF | hourly max simulated reflectivity at 1 km AGL |
//! | 199, 200 | MXUPHL, MNUPHL | hourly max/min updraft helicity (e.g. `MXUPHL_5000`) |
//! | 220, 221 | MAXUVV, MAXDVV | hourly max up/downward vertical velocity |
//! | 222, 223 | MAXUW, MAXVW | components of the hourly max 10 m wind |

/// A locally defined record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownRecord {
    pub parameter_number: u8,
    pub name: &'static str,
    pub units: &'static str,
}

const fn record(parameter_number: u8, name: &'static str, units: &'static str) -> UnknownRecord {
    UnknownRecord {
        parameter_number,
        name,
        units,
    }
}

pub static UNKNOWN_RECORDS: [UnknownRecord; 13] = [
    record(3, "LCDC", "%"),
    record(4, "MCDC", "%"),
    record(5, "HCDC", "%"),
    record(6, "Convective available potential energy", "J kg-1"),
    record(7, "Convective inhibition", "J kg-1"),
    record(197, "RETOP", "m"),
    record(198, "MAXREF", "dB"),
    record(199, "MXUPHL", "m**2 s**-2"),
    record(200, "MNUPHL", "m**2 s**-2"),
    record(220, "MAXUVV", "m s**-1"),
    record(221, "MAXDVV", "m s**-1"),
    record(222, "MAXUW", "m s**-1"),
    record(223, "MAXVW", "m s**-1"),
];

pub fn by_name(name: &str) -> Option<&'static UnknownRecord> {
    UNKNOWN_RECORDS.iter().find(|r| r.name == name)
}

pub fn units_for(parameter_number: u8) -> Option<&'static str> {
    UNKNOWN_RECORDS
        .iter()
        .find(|r| r.parameter_number == parameter_number)
        .map(|r| r.units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookups() {
        assert_eq!(by_name("MAXREF").map(|r| r.parameter_number), Some(198));
        assert_eq!(units_for(198), Some("dB"));
        assert_eq!(units_for(6), Some("J kg-1"));
        assert!(by_name("TMP").is_none());
        assert!(units_for(0).is_none());
    }

    #[test]
    fn test_names_are_unique() {
        for (i, a) in UNKNOWN_RECORDS.iter().enumerate() {
            for b in &UNKNOWN_RECORDS[i + 1..] {
                assert_ne!(a.name, b.name);
                assert_ne!(a.parameter_number, b.parameter_number);
            }
        }
    }
}
