//! Assembles PDS products (MPH, SPH, DSD table and data sets) from encoded
//! records. The inverse of [`PdsHeader::read`](super::PdsHeader::read).

use crate::binary::{encode_record, NativeRecord, RecordLayout};
use crate::header::{format_descriptor, format_integer_field, format_text_field, DataSetDescriptor};

struct PendingDataSet {
    name: String,
    record_count: u64,
    record_size: u64,
    payload: Vec<u8>,
}

#[derive(Default)]
pub struct PdsProductWriter {
    mph: String,
    sph: String,
    datasets: Vec<PendingDataSet>,
}

impl PdsProductWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mph_text(mut self, key: &str, value: &str) -> Self {
        self.mph.push_str(&format_text_field(key, value));
        self
    }

    pub fn mph_integer(mut self, key: &str, value: i64) -> Self {
        self.mph.push_str(&format_integer_field(key, value, None));
        self
    }

    pub fn sph_text(mut self, key: &str, value: &str) -> Self {
        self.sph.push_str(&format_text_field(key, value));
        self
    }

    pub fn sph_integer(mut self, key: &str, value: i64, unit: Option<&str>) -> Self {
        self.sph.push_str(&format_integer_field(key, value, unit));
        self
    }

    pub fn dataset(mut self, name: &str, layout: &RecordLayout, records: &[NativeRecord]) -> Self {
        let payload = records
            .iter()
            .flat_map(|record| encode_record(layout, record))
            .collect();
        self.datasets.push(PendingDataSet {
            name: name.to_string(),
            record_count: records.len() as u64,
            record_size: layout.record_size() as u64,
            payload,
        });
        self
    }

    fn descriptors(&self, first_offset: u64) -> Vec<DataSetDescriptor> {
        let mut offset = first_offset;
        self.datasets
            .iter()
            .map(|ds| {
                let descriptor = DataSetDescriptor {
                    name: ds.name.clone(),
                    ds_type: "M".into(),
                    filename: String::new(),
                    offset,
                    size: ds.payload.len() as u64,
                    record_count: ds.record_count,
                    record_size: ds.record_size,
                };
                offset += descriptor.size;
                descriptor
            })
            .collect()
    }

    /// MPH closes with `NUM_DSD`, `DSD_SIZE`, `NUM_DATA_SETS` and `CRC`; the
    /// SPH must already end with its own sentinel field.
    pub fn finish(self) -> Vec<u8> {
        let n = self.datasets.len() as i64;
        let mut mph = self.mph.clone();
        mph.push_str(&format_integer_field("NUM_DSD", n, None));
        mph.push_str(&format_integer_field("DSD_SIZE", 280, Some("bytes")));
        mph.push_str(&format_integer_field("NUM_DATA_SETS", n, None));
        mph.push_str(&format_integer_field("CRC", -1, None));

        // Descriptors are fixed width, so a dry run with offset 0 sizes the header.
        let dsd_len: usize = self.descriptors(0).iter().map(|d| format_descriptor(d).len()).sum();
        let header_len = (mph.len() + self.sph.len() + dsd_len) as u64;

        let mut bytes = mph.into_bytes();
        bytes.extend_from_slice(self.sph.as_bytes());
        for descriptor in self.descriptors(header_len) {
            bytes.extend_from_slice(format_descriptor(&descriptor).as_bytes());
        }
        for ds in self.datasets {
            bytes.extend(ds.payload);
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::BinaryRecordDecoder;
    use crate::header::{HeaderSchema, PdsHeader, PdsSchema, DSD_LINES};
    use crate::layouts::envisat;
    use crate::source::ProductFile;

    const SCHEMA: PdsSchema = PdsSchema {
        mph: HeaderSchema {
            sentinel: "CRC",
            integer_fields: &["NUM_DSD", "CRC"],
            float_fields: &[],
            max_lines: 64,
        },
        sph: HeaderSchema {
            sentinel: "SPH_END",
            integer_fields: &[],
            float_fields: &[],
            max_lines: 64,
        },
        lines_per_descriptor: DSD_LINES,
    };

    #[test]
    fn written_product_reads_back() {
        let layout = envisat::waveform_layout();
        let records = vec![NativeRecord::zeroed(&layout); 3];
        let bytes = PdsProductWriter::new()
            .mph_text("PRODUCT", "RA2_MWS_2P_TEST.N1")
            .sph_text("SPH_END", "x")
            .dataset("FIRST", &layout, &records)
            .dataset("SECOND", &layout, &records[..1])
            .finish();
        let product = ProductFile::from_bytes("RA2_MWS_2P_TEST.N1", bytes);
        let header = PdsHeader::read(&product, &SCHEMA).unwrap();
        let second = header.dsd.get("second").unwrap();
        assert_eq!(second.record_count, 1);
        assert_eq!(second.offset + second.size, product.len() as u64);
        let first = BinaryRecordDecoder::decode(product.bytes(), header.dsd.get("first").unwrap(), &layout).unwrap();
        assert_eq!(first.len(), 3);
    }
}
