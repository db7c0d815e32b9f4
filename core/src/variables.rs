//! Self-describing products: named n-dimensional variables plus global
//! attributes, as carried by netCDF and HDF5 files.

use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::prelude::{L1bError, L1bResult};
use crate::source::ProductFile;

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Variable {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> L1bResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(L1bError::StructuralInconsistency(format!(
                "variable shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn vector(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Row-major values.
    pub fn flat(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Leading dimension as rows, all others folded into columns.
    pub fn to_array2(&self) -> L1bResult<Array2<f64>> {
        let rows = self.shape.first().copied().unwrap_or(0);
        let cols = if rows == 0 { 0 } else { self.data.len() / rows };
        Array2::from_shape_vec((rows, cols), self.data.clone())
            .map_err(|err| L1bError::StructuralInconsistency(err.to_string()))
    }

    /// Trailing dimension as columns, all leading dimensions folded into
    /// rows: `[records, blocks, bins]` becomes `[records * blocks, bins]`.
    pub fn to_rows(&self) -> L1bResult<Array2<f64>> {
        let cols = self.shape.last().copied().unwrap_or(0);
        let rows = if cols == 0 { 0 } else { self.data.len() / cols };
        Array2::from_shape_vec((rows, cols), self.data.clone())
            .map_err(|err| L1bError::StructuralInconsistency(err.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableSet {
    attributes: BTreeMap<String, serde_json::Value>,
    variables: BTreeMap<String, Variable>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, variable: Variable) {
        self.variables.insert(name.into(), variable);
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn variable(&self, name: &str) -> L1bResult<&Variable> {
        self.get(name)
            .ok_or_else(|| L1bError::MissingField(format!("variable {}", name)))
    }

    /// Flattened values of a required variable.
    pub fn values(&self, name: &str) -> L1bResult<Vec<f64>> {
        Ok(self.variable(name)?.flat().to_vec())
    }

    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }

    /// String attributes are returned as is, other scalars are formatted.
    pub fn attribute_text(&self, name: &str) -> Option<String> {
        match self.attributes.get(name)? {
            serde_json::Value::String(text) => Some(text.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn attribute_f64(&self, name: &str) -> Option<f64> {
        match self.attributes.get(name)? {
            serde_json::Value::Number(number) => number.as_f64(),
            serde_json::Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn attribute_i64(&self, name: &str) -> Option<i64> {
        match self.attributes.get(name)? {
            serde_json::Value::Number(number) => number.as_i64(),
            serde_json::Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn to_json(&self) -> L1bResult<String> {
        let dump = JsonDump {
            attributes: self.attributes.clone(),
            variables: self
                .variables
                .iter()
                .map(|(name, variable)| {
                    let data = variable
                        .data
                        .iter()
                        .map(|v| if v.is_finite() { Some(*v) } else { None })
                        .collect();
                    let raw = JsonVariable {
                        shape: variable.shape.clone(),
                        data,
                    };
                    (name.clone(), raw)
                })
                .collect(),
        };
        serde_json::to_string(&dump).map_err(|err| L1bError::InvalidConfig(err.to_string()))
    }
}

/// Reads a product into a [`VariableSet`].
pub trait VariableSource: Send + Sync {
    fn read(&self, file: &ProductFile) -> L1bResult<VariableSet>;
}

#[derive(Serialize, Deserialize)]
struct JsonVariable {
    shape: Vec<usize>,
    data: Vec<Option<f64>>,
}

#[derive(Serialize, Deserialize)]
struct JsonDump {
    #[serde(default)]
    attributes: BTreeMap<String, serde_json::Value>,
    variables: BTreeMap<String, JsonVariable>,
}

/// JSON dump of a netCDF/HDF5 product. `null` entries are fill values and
/// read as NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonVariableSource;

impl VariableSource for JsonVariableSource {
    fn read(&self, file: &ProductFile) -> L1bResult<VariableSet> {
        let dump: JsonDump = serde_json::from_slice(file.bytes())
            .map_err(|err| L1bError::BinaryDecode(format!("{}: {}", file.file_name(), err)))?;
        let mut set = VariableSet::new();
        set.attributes = dump.attributes;
        for (name, raw) in dump.variables {
            let data = raw.data.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            let variable = Variable::new(raw.shape, data)
                .map_err(|err| L1bError::StructuralInconsistency(format!("{}: {}", name, err)))?;
            set.insert(name, variable);
        }
        Ok(set)
    }
}
