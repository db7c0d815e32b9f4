//! Data set descriptor (DSD) table.
//!
//! The number of descriptor lines is derived from the `NUM_DSD` main-header
//! field times the lines each descriptor occupies; the table is never located
//! by scanning for a terminator.

use std::collections::HashMap;
use std::io::BufRead;

use crate::header::text::{split_key_value, split_unit, MAX_HEADER_LINES};
use crate::prelude::{L1bError, L1bResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSetDescriptor {
    pub name: String,
    pub ds_type: String,
    pub filename: String,
    /// Absolute byte offset of the data set in the product file.
    pub offset: u64,
    /// Declared byte span of the data set.
    pub size: u64,
    pub record_count: u64,
    /// Declared record size; 0 when the product does not state it.
    pub record_size: u64,
}

impl DataSetDescriptor {
    /// Fails when the declared span reaches past the end of the file.
    pub fn check_bounds(&self, file_len: u64) -> L1bResult<()> {
        let end = self.offset.checked_add(self.size).ok_or_else(|| {
            L1bError::BinaryDecode(format!("data set {} span overflows", self.name))
        })?;
        if end > file_len {
            return Err(L1bError::BinaryDecode(format!(
                "data set {} spans bytes {}..{} but the file has {} bytes",
                self.name, self.offset, end, file_len
            )));
        }
        Ok(())
    }
}

/// Descriptors keyed by lower-cased name.
#[derive(Debug, Clone, Default)]
pub struct DataSetDescriptorTable {
    descriptors: Vec<DataSetDescriptor>,
    index: HashMap<String, usize>,
}

#[derive(Default)]
struct PartialDescriptor {
    fields: HashMap<String, String>,
}

impl PartialDescriptor {
    fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn text(&self, key: &str) -> String {
        self.fields.get(key).cloned().unwrap_or_default()
    }

    fn number(&self, key: &str, name: &str, required: bool) -> L1bResult<u64> {
        match self.fields.get(key) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                L1bError::HeaderParse(format!("descriptor {}: {}={:?} is not a count", name, key, raw))
            }),
            None if required => Err(L1bError::MissingField(format!(
                "{} in data set descriptor {}",
                key, name
            ))),
            None => Ok(0),
        }
    }

    fn finish(self) -> L1bResult<Option<DataSetDescriptor>> {
        let name = self.text("DS_NAME");
        if name.is_empty() {
            // spare descriptor slot
            return Ok(None);
        }
        Ok(Some(DataSetDescriptor {
            ds_type: self.text("DS_TYPE"),
            filename: self.text("FILENAME"),
            offset: self.number("DS_OFFSET", &name, true)?,
            size: self.number("DS_SIZE", &name, true)?,
            record_count: self.number("NUM_DSR", &name, true)?,
            record_size: self.number("DSR_SIZE", &name, false)?,
            name,
        }))
    }
}

impl DataSetDescriptorTable {
    /// Reads exactly `descriptor_count * lines_per_descriptor` lines. A table
    /// longer than `MAX_HEADER_LINES` is rejected before anything is read.
    pub fn parse<R: BufRead>(
        reader: &mut R,
        descriptor_count: usize,
        lines_per_descriptor: usize,
    ) -> L1bResult<Self> {
        let total_lines = descriptor_count
            .checked_mul(lines_per_descriptor)
            .filter(|&lines| lines <= MAX_HEADER_LINES)
            .ok_or_else(|| {
                L1bError::HeaderParse(format!(
                    "{} descriptors of {} lines exceed the {} line header limit",
                    descriptor_count, lines_per_descriptor, MAX_HEADER_LINES
                ))
            })?;
        let mut table = Self::default();
        let mut current = PartialDescriptor::default();
        let mut line = Vec::new();

        for line_no in 0..total_lines {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|err| L1bError::HeaderParse(format!("descriptor read failed: {}", err)))?;
            if read == 0 {
                return Err(L1bError::HeaderParse(format!(
                    "descriptor table truncated after {} of {} lines",
                    line_no, total_lines
                )));
            }
            let text = String::from_utf8_lossy(&line);
            let Some((key, value)) = split_key_value(&text) else {
                continue;
            };
            if key == "DS_NAME" && !current.is_empty() {
                table.push(std::mem::take(&mut current).finish()?);
            }
            let (raw, _unit) = split_unit(value);
            current.fields.insert(key.to_string(), raw);
        }
        if !current.is_empty() {
            table.push(current.finish()?);
        }
        Ok(table)
    }

    fn push(&mut self, descriptor: Option<DataSetDescriptor>) {
        if let Some(descriptor) = descriptor {
            self.index
                .insert(descriptor.name.to_ascii_lowercase(), self.descriptors.len());
            self.descriptors.push(descriptor);
        }
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataSetDescriptor> {
        self.descriptors.iter()
    }

    /// Exact, case-insensitive lookup.
    pub fn get(&self, name: &str) -> L1bResult<&DataSetDescriptor> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&idx| &self.descriptors[idx])
            .ok_or_else(|| L1bError::MissingField(format!("data set descriptor {}", name)))
    }

    /// Checks every measurement data set against the file length.
    pub fn check_bounds(&self, file_len: u64) -> L1bResult<()> {
        self.descriptors
            .iter()
            .filter(|descriptor| descriptor.size > 0)
            .try_for_each(|descriptor| descriptor.check_bounds(file_len))
    }
}
