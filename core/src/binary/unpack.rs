//! Expansion of low-rate record groups into high-rate per-pulse series.

use ndarray::Array2;

use crate::binary::decoder::MeasurementSegment;
use crate::binary::layout::FieldRef;
use crate::prelude::{L1bError, L1bResult};

/// Unpacks groups of records that each carry `blocks` high-rate sub-records.
#[derive(Debug, Clone, Copy)]
pub struct GroupUnpacker {
    blocks: usize,
}

impl GroupUnpacker {
    pub fn new(blocks: usize) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Single-block group: each record value repeated once per sub-record.
    pub fn replicate<T: Clone>(&self, values: &[T]) -> Vec<T> {
        values
            .iter()
            .flat_map(|value| std::iter::repeat(value.clone()).take(self.blocks))
            .collect()
    }

    /// Multi-block group: per-record rows concatenated in file order.
    pub fn concat<T: Clone>(&self, rows: &[Vec<T>]) -> L1bResult<Vec<T>> {
        let mut out = Vec::with_capacity(rows.len() * self.blocks);
        for (record, row) in rows.iter().enumerate() {
            self.check_row(record, row.len())?;
            out.extend(row.iter().cloned());
        }
        Ok(out)
    }

    /// `out[r * G + i] = base[r] + increments[r][i]`.
    pub fn apply_increments(&self, base: &[f64], increments: &[Vec<f64>]) -> L1bResult<Vec<f64>> {
        if base.len() != increments.len() {
            return Err(L1bError::StructuralInconsistency(format!(
                "{} base values but {} increment rows",
                base.len(),
                increments.len()
            )));
        }
        let mut out = Vec::with_capacity(base.len() * self.blocks);
        for (record, (value, row)) in base.iter().zip(increments).enumerate() {
            self.check_row(record, row.len())?;
            out.extend(row.iter().map(|increment| value + increment));
        }
        Ok(out)
    }

    /// Unpacks a decoded field to one value per sub-record, whatever rate
    /// the layout stores it at: a multi-block group, a `G`-element array in
    /// a single-block group, or a single-block scalar.
    pub fn unpack(&self, segment: &MeasurementSegment<'_>, field: FieldRef) -> L1bResult<Vec<f64>> {
        let layout = segment.layout();
        let blocks = layout.blocks(field);
        let count = layout.spec(field).count;
        match (blocks, count) {
            (b, 1) if b == self.blocks => self.concat(&segment.block_values(field)),
            (1, c) if c == self.blocks => self.concat(&segment.element_values(field)),
            (1, 1) => Ok(self.replicate(&segment.record_values(field))),
            _ => Err(L1bError::StructuralInconsistency(format!(
                "{}.{} has {} blocks of {} elements, cannot unpack to {} sub-records",
                layout.groups[field.group].name,
                layout.spec(field).name,
                blocks,
                count,
                self.blocks
            ))),
        }
    }

    fn check_row(&self, record: usize, len: usize) -> L1bResult<()> {
        if len != self.blocks {
            return Err(L1bError::StructuralInconsistency(format!(
                "record {} has {} sub-record values, expected {}",
                record, len, self.blocks
            )));
        }
        Ok(())
    }
}

/// Stacks equal-length rows into an `[N, B]` array.
pub fn rows_to_array(rows: Vec<Vec<f64>>) -> L1bResult<Array2<f64>> {
    let n = rows.len();
    let bins = rows.first().map_or(0, Vec::len);
    if let Some((idx, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != bins) {
        return Err(L1bError::StructuralInconsistency(format!(
            "row {} has {} bins, expected {}",
            idx,
            row.len(),
            bins
        )));
    }
    let flat = rows.into_iter().flatten().collect::<Vec<_>>();
    Array2::from_shape_vec((n, bins), flat)
        .map_err(|err| L1bError::StructuralInconsistency(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::decoder::{encode_record, BinaryRecordDecoder, NativeRecord};
    use crate::binary::layout::{Endian, FieldSpec, FieldType, GroupSpec, LayoutKey, RecordLayout};
    use crate::header::DataSetDescriptor;
    use crate::prelude::{MissionId, RadarMode};

    #[test]
    fn single_block_value_is_replicated_twenty_times() {
        let unpacker = GroupUnpacker::new(20);
        let out = unpacker.replicate(&[7.25]);
        assert_eq!(out.len(), 20);
        assert!(out.iter().all(|&v| v == 7.25));
    }

    #[test]
    fn increments_are_added_to_base_in_order() {
        let unpacker = GroupUnpacker::new(20);
        let increments: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
        let out = unpacker
            .apply_increments(&[100.0, 200.0], &[increments.clone(), increments.clone()])
            .unwrap();
        assert_eq!(out.len(), 40);
        for i in 0..20 {
            assert_eq!(out[i], 100.0 + increments[i]);
            assert_eq!(out[20 + i], 200.0 + increments[i]);
        }
    }

    #[test]
    fn wrong_increment_length_is_structural_inconsistency() {
        let unpacker = GroupUnpacker::new(20);
        let err = unpacker
            .apply_increments(&[1.0], &[vec![0.0; 19]])
            .unwrap_err();
        assert!(matches!(err, L1bError::StructuralInconsistency(_)));
        assert!(unpacker.concat(&[vec![0.0; 21]]).is_err());
        assert!(unpacker.apply_increments(&[1.0, 2.0], &[vec![0.0; 20]]).is_err());
    }

    #[test]
    fn unpack_handles_each_storage_rate() {
        let layout = RecordLayout::new(
            LayoutKey::new(MissionId::Envisat, "T", RadarMode::Lrm, "test"),
            Endian::Big,
            vec![
                GroupSpec::new(
                    "one_hz",
                    1,
                    vec![
                        FieldSpec::new("scalar", FieldType::I32),
                        FieldSpec::new("array", FieldType::I16).count(4),
                        FieldSpec::new("odd", FieldType::I16).count(3),
                    ],
                ),
                GroupSpec::new("blocks", 4, vec![FieldSpec::new("value", FieldType::I16)]),
            ],
        );
        let scalar = layout.field("one_hz", "scalar").unwrap();
        let array = layout.field("one_hz", "array").unwrap();
        let value = layout.field("blocks", "value").unwrap();
        let mut bytes = Vec::new();
        for r in 0..2 {
            let mut record = NativeRecord::zeroed(&layout);
            record.set_raw(&layout, scalar, 0, 0, r as f64);
            for i in 0..4 {
                record.set_raw(&layout, array, 0, i, (10 * r + i) as f64);
                record.set_raw(&layout, value, i, 0, -((10 * r + i) as f64));
            }
            bytes.extend(encode_record(&layout, &record));
        }
        let size = layout.record_size() as u64;
        let descriptor = DataSetDescriptor {
            name: "test".into(),
            ds_type: "M".into(),
            filename: String::new(),
            offset: 0,
            size: 2 * size,
            record_count: 2,
            record_size: size,
        };
        let segment = BinaryRecordDecoder::decode(&bytes, &descriptor, &layout).unwrap();
        let unpacker = GroupUnpacker::new(4);

        assert_eq!(
            unpacker.unpack(&segment, scalar).unwrap(),
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]
        );
        assert_eq!(
            unpacker.unpack(&segment, array).unwrap(),
            vec![0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0]
        );
        assert_eq!(unpacker.unpack(&segment, value).unwrap()[5], -11.0);
        let odd = layout.field("one_hz", "odd").unwrap();
        assert!(matches!(
            unpacker.unpack(&segment, odd),
            Err(L1bError::StructuralInconsistency(_))
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert_eq!(rows_to_array(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap()[[1, 0]], 3.0);
        assert!(rows_to_array(vec![vec![1.0, 2.0], vec![3.0]]).is_err());
    }
}
