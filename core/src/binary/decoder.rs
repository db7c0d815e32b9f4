//! Generic interpreter of [`RecordLayout`]s over a byte buffer.

use log::debug;

use crate::binary::layout::{Endian, FieldRef, FieldType, RecordLayout};
use crate::header::DataSetDescriptor;
use crate::prelude::{L1bError, L1bResult};

macro_rules! read_as {
    ($ty:ty, $bytes:expr, $endian:expr) => {{
        let mut raw = [0u8; std::mem::size_of::<$ty>()];
        raw.copy_from_slice($bytes);
        match $endian {
            Endian::Big => <$ty>::from_be_bytes(raw) as f64,
            Endian::Little => <$ty>::from_le_bytes(raw) as f64,
        }
    }};
}

macro_rules! write_as {
    ($ty:ty, $value:expr, $endian:expr) => {{
        let value = $value as $ty;
        match $endian {
            Endian::Big => value.to_be_bytes().to_vec(),
            Endian::Little => value.to_le_bytes().to_vec(),
        }
    }};
}

/// Every field is widened to `f64`. 64-bit integers are exact up to 2^53;
/// the widest field carried, a window delay in picoseconds, stays far below.
fn read_value(bytes: &[u8], ty: FieldType, endian: Endian) -> f64 {
    match ty {
        FieldType::I8 => read_as!(i8, bytes, endian),
        FieldType::U8 => read_as!(u8, bytes, endian),
        FieldType::I16 => read_as!(i16, bytes, endian),
        FieldType::U16 => read_as!(u16, bytes, endian),
        FieldType::I32 => read_as!(i32, bytes, endian),
        FieldType::U32 => read_as!(u32, bytes, endian),
        FieldType::I64 => read_as!(i64, bytes, endian),
        FieldType::U64 => read_as!(u64, bytes, endian),
        FieldType::F32 => {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(bytes);
            match endian {
                Endian::Big => f32::from_be_bytes(raw) as f64,
                Endian::Little => f32::from_le_bytes(raw) as f64,
            }
        }
        FieldType::F64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            match endian {
                Endian::Big => f64::from_be_bytes(raw),
                Endian::Little => f64::from_le_bytes(raw),
            }
        }
        FieldType::Spare(_) => 0.0,
    }
}

fn write_value(value: f64, ty: FieldType, endian: Endian) -> Vec<u8> {
    match ty {
        FieldType::I8 => write_as!(i8, value.round(), endian),
        FieldType::U8 => write_as!(u8, value.round(), endian),
        FieldType::I16 => write_as!(i16, value.round(), endian),
        FieldType::U16 => write_as!(u16, value.round(), endian),
        FieldType::I32 => write_as!(i32, value.round(), endian),
        FieldType::U32 => write_as!(u32, value.round(), endian),
        FieldType::I64 => write_as!(i64, value.round(), endian),
        FieldType::U64 => write_as!(u64, value.round(), endian),
        FieldType::F32 => write_as!(f32, value, endian),
        FieldType::F64 => write_as!(f64, value, endian),
        FieldType::Spare(bytes) => vec![0; bytes],
    }
}

/// One decoded record: raw (unscaled) values in layout slot order.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeRecord {
    values: Vec<f64>,
}

impl NativeRecord {
    pub fn zeroed(layout: &RecordLayout) -> Self {
        Self {
            values: vec![0.0; layout.record_slots()],
        }
    }

    pub fn raw(&self, layout: &RecordLayout, field: FieldRef, block: usize, element: usize) -> f64 {
        self.values[layout.slot(field, block, element)]
    }

    pub fn set_raw(
        &mut self,
        layout: &RecordLayout,
        field: FieldRef,
        block: usize,
        element: usize,
        value: f64,
    ) {
        let slot = layout.slot(field, block, element);
        self.values[slot] = value;
    }

    /// Stores a physical value, undoing the field's scale factor.
    pub fn set_scaled(
        &mut self,
        layout: &RecordLayout,
        field: FieldRef,
        block: usize,
        element: usize,
        value: f64,
    ) {
        let scale = layout.spec(field).scale;
        self.set_raw(layout, field, block, element, value / scale);
    }

    /// Raw value times the field's scale factor.
    pub fn scaled(&self, layout: &RecordLayout, field: FieldRef, block: usize, element: usize) -> f64 {
        self.raw(layout, field, block, element) * layout.spec(field).scale
    }
}

/// Records of one measurement data set, bound to the layout that decoded them.
#[derive(Debug, Clone)]
pub struct MeasurementSegment<'a> {
    layout: &'a RecordLayout,
    records: Vec<NativeRecord>,
}

impl<'a> MeasurementSegment<'a> {
    pub fn layout(&self) -> &'a RecordLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[NativeRecord] {
        &self.records
    }

    pub fn field(&self, group: &str, field: &str) -> L1bResult<FieldRef> {
        self.layout.field(group, field)
    }

    /// First element of the first block, one value per record.
    pub fn record_values(&self, field: FieldRef) -> Vec<f64> {
        self.records
            .iter()
            .map(|record| record.scaled(self.layout, field, 0, 0))
            .collect()
    }

    /// Per record, the field's value in every block of its group.
    pub fn block_values(&self, field: FieldRef) -> Vec<Vec<f64>> {
        let blocks = self.layout.blocks(field);
        self.records
            .iter()
            .map(|record| {
                (0..blocks)
                    .map(|block| record.scaled(self.layout, field, block, 0))
                    .collect()
            })
            .collect()
    }

    /// Per record, every element of the field in the first block.
    pub fn element_values(&self, field: FieldRef) -> Vec<Vec<f64>> {
        let count = self.layout.spec(field).count;
        self.records
            .iter()
            .map(|record| {
                (0..count)
                    .map(|element| record.scaled(self.layout, field, 0, element))
                    .collect()
            })
            .collect()
    }

    /// One row per (record, block) holding every element: waveforms and vectors.
    pub fn array_rows(&self, field: FieldRef) -> Vec<Vec<f64>> {
        let blocks = self.layout.blocks(field);
        let count = self.layout.spec(field).count;
        let mut rows = Vec::with_capacity(self.records.len() * blocks);
        for record in &self.records {
            for block in 0..blocks {
                rows.push(
                    (0..count)
                        .map(|element| record.scaled(self.layout, field, block, element))
                        .collect(),
                );
            }
        }
        rows
    }
}

pub struct BinaryRecordDecoder;

impl BinaryRecordDecoder {
    /// Decodes the data set described by `descriptor` out of the whole
    /// product buffer.
    pub fn decode<'a>(
        bytes: &[u8],
        descriptor: &DataSetDescriptor,
        layout: &'a RecordLayout,
    ) -> L1bResult<MeasurementSegment<'a>> {
        let record_size = layout.record_size() as u64;
        if descriptor.record_size != 0 && descriptor.record_size != record_size {
            return Err(L1bError::BinaryDecode(format!(
                "{}: declared record size {} but layout {} has {}",
                descriptor.name, descriptor.record_size, layout.key, record_size
            )));
        }
        let expected = descriptor.record_count.checked_mul(record_size).ok_or_else(|| {
            L1bError::BinaryDecode(format!("{}: record span overflows", descriptor.name))
        })?;
        if expected != descriptor.size {
            return Err(L1bError::BinaryDecode(format!(
                "{}: {} records of {} bytes do not fill the declared {} bytes",
                descriptor.name, descriptor.record_count, record_size, descriptor.size
            )));
        }
        let start = usize::try_from(descriptor.offset)
            .map_err(|_| L1bError::BinaryDecode(format!("{}: offset out of range", descriptor.name)))?;
        let end = start
            .checked_add(expected as usize)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                L1bError::BinaryDecode(format!(
                    "{}: bytes {}..{} exceed buffer of {} bytes",
                    descriptor.name,
                    start,
                    start as u64 + expected,
                    bytes.len()
                ))
            })?;

        let records = bytes[start..end]
            .chunks_exact(layout.record_size())
            .map(|chunk| Self::decode_record(chunk, layout))
            .collect::<Vec<_>>();
        debug!(
            "decoded {} records of {} ({} bytes each)",
            records.len(),
            layout.key,
            record_size
        );
        Ok(MeasurementSegment { layout, records })
    }

    fn decode_record(chunk: &[u8], layout: &RecordLayout) -> NativeRecord {
        let mut record = NativeRecord::zeroed(layout);
        for field in layout.field_refs() {
            let spec = layout.spec(field);
            let width = spec.ty.width();
            for block in 0..layout.blocks(field) {
                for element in 0..spec.count {
                    let offset = layout.byte_offset(field, block, element);
                    let value = read_value(&chunk[offset..offset + width], spec.ty, layout.endian);
                    record.set_raw(layout, field, block, element, value);
                }
            }
        }
        record
    }
}

/// Serialises a record with `layout`; used to build products.
pub fn encode_record(layout: &RecordLayout, record: &NativeRecord) -> Vec<u8> {
    let mut bytes = vec![0u8; layout.record_size()];
    for field in layout.field_refs() {
        let spec = layout.spec(field);
        let width = spec.ty.width();
        for block in 0..layout.blocks(field) {
            for element in 0..spec.count {
                let offset = layout.byte_offset(field, block, element);
                let encoded = write_value(record.raw(layout, field, block, element), spec.ty, layout.endian);
                bytes[offset..offset + width].copy_from_slice(&encoded);
            }
        }
    }
    bytes
}
