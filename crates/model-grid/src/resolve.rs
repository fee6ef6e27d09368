//! Resolving a [`VariableSpec`] to one record of an indexed file.
//!
//! Names are tried through an ordered list of selection tiers; the first
//! tier that matches wins and failures fall through to the next one. Only
//! running out of tiers is an error.

use std::path::Path;

use grib2_parser::{Grib2Index, RecordKey, RecordMeta, UNKNOWN};
use ndarray::Array2;
use tracing::debug;

use crate::error::{GridReadError, Result};
use crate::unknown;
use crate::variable::VariableSpec;

/// One decoded 2-D layer and its units.
#[derive(Debug, Clone)]
pub struct ResolvedLayer {
    pub record: RecordMeta,
    pub values: Array2<f32>,
    pub units: String,
}

/// Find and decode the layer `spec` refers to.
pub fn resolve_layer(index: &Grib2Index, spec: &VariableSpec, path: &Path) -> Result<ResolvedLayer> {
    let (record, units) = match spec {
        VariableSpec::RecordId(id) => resolve_record_id(index, *id, spec, path)?,
        VariableSpec::Name {
            name,
            level: Some(level),
        } => resolve_name_level(index, name, level, spec, path)?,
        VariableSpec::Name { name, level: None } => resolve_name(index, name, spec, path)?,
    };

    let message = index.message(record.number)?;
    let (rows, cols) = message.grid_dims();
    let values = Array2::from_shape_vec((rows, cols), message.unpack_data()?).map_err(|e| {
        GridReadError::Grib2(grib2_parser::Grib2Error::UnpackingError(e.to_string()))
    })?;

    debug!(
        path = %path.display(),
        variable = %spec,
        record = %record,
        "Resolved variable"
    );

    Ok(ResolvedLayer {
        record,
        values,
        units,
    })
}

fn lookup_error(spec: &VariableSpec, path: &Path) -> GridReadError {
    GridReadError::Lookup {
        variable: spec.to_string(),
        path: path.to_path_buf(),
    }
}

fn resolve_record_id(
    index: &Grib2Index,
    id: usize,
    spec: &VariableSpec,
    path: &Path,
) -> Result<(RecordMeta, String)> {
    let record = index.record(id).map_err(|_| lookup_error(spec, path))?;

    let units = if record.units == UNKNOWN {
        unknown::units_for(record.parameter_number)
            .unwrap_or(UNKNOWN)
            .to_string()
    } else {
        record.units.clone()
    };
    Ok((record.clone(), units))
}

/// Tiers: level type, then numeric level, then level label.
fn level_tiers(base: RecordKey, level: &str) -> Vec<Vec<RecordKey>> {
    let mut tiers = vec![vec![base.clone(), RecordKey::TypeOfLevel(level.to_string())]];
    if let Ok(numeric) = level.parse::<i64>() {
        tiers.push(vec![base.clone(), RecordKey::Level(numeric)]);
    }
    tiers.push(vec![base, RecordKey::LevelLabel(level.to_string())]);
    tiers
}

/// First record of the first tier that matches anything.
fn first_match<'a>(index: &'a Grib2Index, tiers: &[Vec<RecordKey>]) -> Option<&'a RecordMeta> {
    tiers.iter().find_map(|keys| match index.select(keys) {
        Ok(records) => records.into_iter().next(),
        Err(e) => {
            debug!(keys = ?keys, error = %e, "Selection tier failed");
            None
        }
    })
}

fn resolve_name_level(
    index: &Grib2Index,
    name: &str,
    level: &str,
    spec: &VariableSpec,
    path: &Path,
) -> Result<(RecordMeta, String)> {
    if let Some(local) = unknown::by_name(name) {
        let tiers = level_tiers(RecordKey::ParameterNumber(local.parameter_number), level);
        let record = first_match(index, &tiers).ok_or_else(|| lookup_error(spec, path))?;
        return Ok((record.clone(), local.units.to_string()));
    }

    let tiers = level_tiers(RecordKey::Name(name.to_string()), level);
    let record = first_match(index, &tiers).ok_or_else(|| lookup_error(spec, path))?;
    Ok((record.clone(), record.units.clone()))
}

fn resolve_name(
    index: &Grib2Index,
    name: &str,
    spec: &VariableSpec,
    path: &Path,
) -> Result<(RecordMeta, String)> {
    if let Some(local) = unknown::by_name(name) {
        let tiers = [vec![RecordKey::ParameterNumber(local.parameter_number)]];
        let record = first_match(index, &tiers).ok_or_else(|| lookup_error(spec, path))?;
        return Ok((record.clone(), local.units.to_string()));
    }

    let matches = index
        .select(&[RecordKey::ShortName(name.to_string())])
        .or_else(|_| index.select(&[RecordKey::LongName(name.to_string())]))
        .map_err(|_| lookup_error(spec, path))?;

    if matches.len() > 1 {
        return Err(GridReadError::Ambiguous {
            name: name.to_string(),
            count: matches.len(),
        });
    }
    let record = matches[0];
    Ok((record.clone(), record.units.clone()))
}
