//! ESA PDS product headers: main product header (MPH), specific product
//! header (SPH) and the data set descriptor table that follows them.

pub mod dsd;
pub mod text;
pub mod writer;

pub use dsd::{DataSetDescriptor, DataSetDescriptorTable};
pub use text::{HeaderField, HeaderSchema, HeaderValue, ProductHeader, TextHeaderParser};
pub use writer::PdsProductWriter;

use log::debug;

use crate::prelude::{L1bError, L1bResult};
use crate::source::ProductFile;

/// A DSD occupies seven `KEY=VALUE` lines and one blank separator line.
pub const DSD_LINES: usize = 8;

/// Header block rules of one product family.
#[derive(Debug, Clone, Copy)]
pub struct PdsSchema {
    pub mph: HeaderSchema,
    pub sph: HeaderSchema,
    pub lines_per_descriptor: usize,
}

#[derive(Debug, Clone)]
pub struct PdsHeader {
    pub mph: ProductHeader,
    pub sph: ProductHeader,
    pub dsd: DataSetDescriptorTable,
}

impl PdsHeader {
    /// Parses MPH, SPH and DSD table in file order and checks every declared
    /// data set span against the product length.
    pub fn read(product: &ProductFile, schema: &PdsSchema) -> L1bResult<Self> {
        let mut cursor = product.cursor();
        let mph = TextHeaderParser::parse(&mut cursor, &schema.mph)?;
        let sph = TextHeaderParser::parse(&mut cursor, &schema.sph)?;

        let num_dsd = mph.integer("num_dsd")?;
        let num_dsd = usize::try_from(num_dsd).map_err(|_| {
            L1bError::HeaderParse(format!("negative descriptor count {}", num_dsd))
        })?;
        let dsd = DataSetDescriptorTable::parse(&mut cursor, num_dsd, schema.lines_per_descriptor)?;
        dsd.check_bounds(product.len() as u64)?;

        debug!(
            "{}: {} MPH fields, {} SPH fields, {} data sets",
            product.file_name(),
            mph.len(),
            sph.len(),
            dsd.len()
        );
        Ok(Self { mph, sph, dsd })
    }
}

/// Text field as written by the ground segment.
pub fn format_text_field(key: &str, value: &str) -> String {
    format!("{}=\"{}\"\n", key, value)
}

/// Signed integer field, optionally with a unit.
pub fn format_integer_field(key: &str, value: i64, unit: Option<&str>) -> String {
    match unit {
        Some(unit) => format!("{}={:+011}<{}>\n", key, value, unit),
        None => format!("{}={:+011}\n", key, value),
    }
}

/// Renders one descriptor in its eight-line on-disk form.
pub fn format_descriptor(descriptor: &DataSetDescriptor) -> String {
    let mut text = String::new();
    text.push_str(&format!("DS_NAME=\"{:<28}\"\n", descriptor.name));
    text.push_str(&format!("DS_TYPE={}\n", descriptor.ds_type));
    text.push_str(&format!("FILENAME=\"{:<62}\"\n", descriptor.filename));
    text.push_str(&format!("DS_OFFSET={:+021}<bytes>\n", descriptor.offset));
    text.push_str(&format!("DS_SIZE={:+021}<bytes>\n", descriptor.size));
    text.push_str(&format!("NUM_DSR={:+011}\n", descriptor.record_count));
    text.push_str(&format!("DSR_SIZE={:+011}<bytes>\n", descriptor.record_size));
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: PdsSchema = PdsSchema {
        mph: HeaderSchema {
            sentinel: "CRC",
            integer_fields: &["NUM_DSD", "CRC"],
            float_fields: &[],
            max_lines: 100,
        },
        sph: HeaderSchema {
            sentinel: "STOP",
            integer_fields: &[],
            float_fields: &[],
            max_lines: 100,
        },
        lines_per_descriptor: DSD_LINES,
    };

    fn product(payload_len: usize, declared: u64) -> ProductFile {
        product_declaring(1, payload_len, declared)
    }

    fn product_declaring(num_dsd: i64, payload_len: usize, declared: u64) -> ProductFile {
        let mut text = String::new();
        text.push_str(&format_text_field("PRODUCT", "TEST.DBL"));
        text.push_str(&format_integer_field("NUM_DSD", num_dsd, None));
        text.push_str(&format_integer_field("CRC", -1, None));
        text.push_str(&format_text_field("STOP", "x"));
        let header_len = text.len() + format_descriptor(&DataSetDescriptor {
            name: "MDS".into(),
            ds_type: "M".into(),
            filename: String::new(),
            offset: 0,
            size: 0,
            record_count: 0,
            record_size: 0,
        })
        .len();
        text.push_str(&format_descriptor(&DataSetDescriptor {
            name: "MDS".into(),
            ds_type: "M".into(),
            filename: String::new(),
            offset: header_len as u64,
            size: declared,
            record_count: 1,
            record_size: declared,
        }));
        let mut bytes = text.into_bytes();
        bytes.extend(std::iter::repeat(0u8).take(payload_len));
        ProductFile::from_bytes("TEST.DBL", bytes)
    }

    #[test]
    fn reads_mph_sph_and_descriptors() {
        let header = PdsHeader::read(&product(64, 64), &SCHEMA).unwrap();
        assert_eq!(header.mph.text("product").unwrap(), "TEST.DBL");
        assert_eq!(header.sph.len(), 1);
        assert_eq!(header.dsd.get("mds").unwrap().size, 64);
    }

    #[test]
    fn descriptor_past_end_of_file_is_rejected() {
        let err = PdsHeader::read(&product(63, 64), &SCHEMA).unwrap_err();
        assert!(matches!(err, L1bError::BinaryDecode(_)));
    }

    #[test]
    fn corrupt_descriptor_count_is_a_parse_error() {
        for num_dsd in [i64::MAX, 1 << 40, -1] {
            let err = PdsHeader::read(&product_declaring(num_dsd, 64, 64), &SCHEMA).unwrap_err();
            assert!(matches!(err, L1bError::HeaderParse(_)), "NUM_DSD={}", num_dsd);
        }
    }
}
