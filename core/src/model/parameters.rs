//! Name-keyed per-pulse parameter maps: range corrections and classifiers.

use std::collections::BTreeMap;

use crate::prelude::{L1bError, L1bResult};

/// Canonical range and geophysical correction names.
pub const CORRECTION_NAMES: [&str; 14] = [
    "dry_troposphere",
    "wet_troposphere",
    "inverse_barometric",
    "dynamic_atmosphere",
    "ionospheric",
    "ocean_tide_elastic",
    "ocean_tide_long_period",
    "ocean_loading_tide",
    "solid_earth_tide",
    "geocentric_polar_tide",
    "equilibrium_tide",
    "elevation_saturation",
    "elevation_bias",
    "instrument_range",
];

pub fn is_correction_name(name: &str) -> bool {
    CORRECTION_NAMES.contains(&name)
}

fn check_length(kind: &str, name: &str, len: usize, n_pulses: usize) -> L1bResult<()> {
    if len != n_pulses {
        return Err(L1bError::StructuralInconsistency(format!(
            "{} {} has {} values for {} pulses",
            kind, name, len, n_pulses
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Corrections {
    n_pulses: usize,
    values: BTreeMap<String, Vec<f64>>,
}

impl Corrections {
    pub fn new(n_pulses: usize) -> Self {
        Self {
            n_pulses,
            values: BTreeMap::new(),
        }
    }

    /// Each canonical correction is set at most once per track.
    pub fn set(&mut self, name: &str, values: Vec<f64>) -> L1bResult<()> {
        if !is_correction_name(name) {
            return Err(L1bError::InvalidConfig(format!(
                "{:?} is not a canonical correction name",
                name
            )));
        }
        check_length("correction", name, values.len(), self.n_pulses)?;
        if self.values.contains_key(name) {
            return Err(L1bError::StructuralInconsistency(format!(
                "correction {} set twice",
                name
            )));
        }
        self.values.insert(name.to_string(), values);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.values.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Open-ended waveform and mission diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Classifiers {
    n_pulses: usize,
    values: BTreeMap<String, Vec<f64>>,
}

impl Classifiers {
    pub fn new(n_pulses: usize) -> Self {
        Self {
            n_pulses,
            values: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, values: Vec<f64>, name: &str) -> L1bResult<()> {
        check_length("classifier", name, values.len(), self.n_pulses)?;
        if self.values.contains_key(name) {
            return Err(L1bError::StructuralInconsistency(format!(
                "classifier {} added twice",
                name
            )));
        }
        self.values.insert(name.to_string(), values);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.values.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
