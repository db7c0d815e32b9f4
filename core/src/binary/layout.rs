//! Declarative record layouts.
//!
//! A layout is plain data: ordered groups, each repeated `blocks` times per
//! record, each block an ordered list of typed fields. Offsets and the record
//! size are derived from the field list, so a layout can never disagree with
//! itself about where a field lives.

use std::fmt;

use crate::prelude::{L1bError, L1bResult, MissionId, RadarMode};

/// Byte order of a mission's binary data sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// Reserved bytes, skipped on decode.
    Spare(usize),
}

impl FieldType {
    pub const fn width(self) -> usize {
        match self {
            FieldType::I8 | FieldType::U8 => 1,
            FieldType::I16 | FieldType::U16 => 2,
            FieldType::I32 | FieldType::U32 | FieldType::F32 => 4,
            FieldType::I64 | FieldType::U64 | FieldType::F64 => 8,
            FieldType::Spare(bytes) => bytes,
        }
    }

    pub const fn is_spare(self) -> bool {
        matches!(self, FieldType::Spare(_))
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    /// Elements per block (waveform bins, vector components, 20 Hz arrays).
    pub count: usize,
    /// Factor from the stored integer to the physical unit.
    pub scale: f64,
    pub unit: &'static str,
}

impl FieldSpec {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            count: 1,
            scale: 1.0,
            unit: "",
        }
    }

    pub const fn spare(bytes: usize) -> Self {
        Self::new("spare", FieldType::Spare(bytes))
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn scaled(mut self, scale: f64, unit: &'static str) -> Self {
        self.scale = scale;
        self.unit = unit;
        self
    }

    pub const fn size(&self) -> usize {
        self.ty.width() * self.count
    }

    /// Decoded values this field contributes per block.
    pub const fn slots(&self) -> usize {
        if self.ty.is_spare() {
            0
        } else {
            self.count
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroupSpec {
    pub name: &'static str,
    pub blocks: usize,
    pub fields: Vec<FieldSpec>,
}

impl GroupSpec {
    pub fn new(name: &'static str, blocks: usize, fields: Vec<FieldSpec>) -> Self {
        Self {
            name,
            blocks,
            fields,
        }
    }

    pub fn block_size(&self) -> usize {
        self.fields.iter().map(FieldSpec::size).sum()
    }

    fn block_slots(&self) -> usize {
        self.fields.iter().map(FieldSpec::slots).sum()
    }
}

/// Selects a layout: mission, format baseline, radar mode and data set name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutKey {
    pub mission: MissionId,
    pub baseline: String,
    pub mode: RadarMode,
    pub dataset: String,
}

impl LayoutKey {
    pub fn new(mission: MissionId, baseline: &str, mode: RadarMode, dataset: &str) -> Self {
        Self {
            mission,
            baseline: baseline.to_string(),
            mode,
            dataset: dataset.to_ascii_uppercase(),
        }
    }
}

impl fmt::Display for LayoutKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.mission, self.baseline, self.mode, self.dataset
        )
    }
}

/// Position of a decoded field inside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef {
    pub group: usize,
    pub field: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldPlacement {
    /// Byte offset inside one block of the group.
    pub byte_offset: usize,
    /// Index of the first decoded value inside one block.
    pub slot: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct GroupPlacement {
    pub byte_offset: usize,
    pub block_size: usize,
    pub slot: usize,
    pub block_slots: usize,
}

#[derive(Debug, Clone)]
pub struct RecordLayout {
    pub key: LayoutKey,
    pub endian: Endian,
    pub groups: Vec<GroupSpec>,
    group_placements: Vec<GroupPlacement>,
    field_placements: Vec<Vec<FieldPlacement>>,
    record_size: usize,
    record_slots: usize,
}

impl RecordLayout {
    pub fn new(key: LayoutKey, endian: Endian, groups: Vec<GroupSpec>) -> Self {
        let mut group_placements = Vec::with_capacity(groups.len());
        let mut field_placements = Vec::with_capacity(groups.len());
        let mut byte_offset = 0;
        let mut slot = 0;

        for group in &groups {
            let mut fields = Vec::with_capacity(group.fields.len());
            let mut field_offset = 0;
            let mut field_slot = 0;
            for field in &group.fields {
                fields.push(FieldPlacement {
                    byte_offset: field_offset,
                    slot: field_slot,
                });
                field_offset += field.size();
                field_slot += field.slots();
            }
            let placement = GroupPlacement {
                byte_offset,
                block_size: group.block_size(),
                slot,
                block_slots: group.block_slots(),
            };
            byte_offset += placement.block_size * group.blocks;
            slot += placement.block_slots * group.blocks;
            group_placements.push(placement);
            field_placements.push(fields);
        }

        Self {
            key,
            endian,
            groups,
            group_placements,
            field_placements,
            record_size: byte_offset,
            record_slots: slot,
        }
    }

    /// Bytes per record.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Decoded values per record.
    pub fn record_slots(&self) -> usize {
        self.record_slots
    }

    pub fn group(&self, name: &str) -> L1bResult<&GroupSpec> {
        self.groups
            .iter()
            .find(|group| group.name == name)
            .ok_or_else(|| L1bError::MissingField(format!("group {} in layout {}", name, self.key)))
    }

    pub fn has_field(&self, group: &str, field: &str) -> bool {
        self.field(group, field).is_ok()
    }

    pub fn field(&self, group: &str, field: &str) -> L1bResult<FieldRef> {
        let group_idx = self
            .groups
            .iter()
            .position(|candidate| candidate.name == group)
            .ok_or_else(|| {
                L1bError::MissingField(format!("group {} in layout {}", group, self.key))
            })?;
        let field_idx = self.groups[group_idx]
            .fields
            .iter()
            .position(|candidate| candidate.name == field && !candidate.ty.is_spare())
            .ok_or_else(|| {
                L1bError::MissingField(format!("{}.{} in layout {}", group, field, self.key))
            })?;
        Ok(FieldRef {
            group: group_idx,
            field: field_idx,
        })
    }

    pub fn spec(&self, field: FieldRef) -> &FieldSpec {
        &self.groups[field.group].fields[field.field]
    }

    pub fn blocks(&self, field: FieldRef) -> usize {
        self.groups[field.group].blocks
    }

    /// Index into a record's value vector.
    pub fn slot(&self, field: FieldRef, block: usize, element: usize) -> usize {
        let group = &self.group_placements[field.group];
        let placement = &self.field_placements[field.group][field.field];
        group.slot + block * group.block_slots + placement.slot + element
    }

    /// Byte offset inside a record.
    pub fn byte_offset(&self, field: FieldRef, block: usize, element: usize) -> usize {
        let group = &self.group_placements[field.group];
        let placement = &self.field_placements[field.group][field.field];
        let spec = self.spec(field);
        group.byte_offset + block * group.block_size + placement.byte_offset + element * spec.ty.width()
    }

    /// Every decodable field, in on-disk order.
    pub(crate) fn field_refs(&self) -> impl Iterator<Item = FieldRef> + '_ {
        self.groups.iter().enumerate().flat_map(|(group, spec)| {
            spec.fields
                .iter()
                .enumerate()
                .filter(|(_, field)| !field.ty.is_spare())
                .map(move |(field, _)| FieldRef { group, field })
        })
    }
}
