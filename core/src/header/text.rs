//! Fixed-format `KEY=VALUE` header blocks (main and specific product headers).
//!
//! A block is read line by line until the line carrying the block's sentinel
//! key. Values are coerced by a per-block type table; a value that fails
//! coercion is kept as text and marked, since a damaged header field should
//! not make an otherwise readable product unusable.

use std::collections::HashMap;
use std::io::BufRead;

use log::warn;

use crate::prelude::{L1bError, L1bResult};

/// Upper bound on the number of lines scanned for a sentinel.
pub const MAX_HEADER_LINES: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderField {
    /// Lower-cased key.
    pub name: String,
    /// Value text with quotes and unit removed.
    pub raw: String,
    pub value: HeaderValue,
    pub unit: Option<String>,
    pub coercion_failed: bool,
}

/// Sentinel and coercion table of one header block.
#[derive(Debug, Clone, Copy)]
pub struct HeaderSchema {
    /// Key of the last field of the block (upper case, as written in the file).
    pub sentinel: &'static str,
    pub integer_fields: &'static [&'static str],
    pub float_fields: &'static [&'static str],
    pub max_lines: usize,
}

impl HeaderSchema {
    fn coerce(&self, key: &str, raw: &str) -> (HeaderValue, bool) {
        if self.integer_fields.contains(&key) {
            match raw.parse::<i64>() {
                Ok(value) => (HeaderValue::Integer(value), false),
                Err(_) => (HeaderValue::Text(raw.to_string()), true),
            }
        } else if self.float_fields.contains(&key) {
            match raw.parse::<f64>() {
                Ok(value) => (HeaderValue::Float(value), false),
                Err(_) => (HeaderValue::Text(raw.to_string()), true),
            }
        } else {
            (HeaderValue::Text(raw.to_string()), false)
        }
    }
}

/// Ordered, immutable header field mapping.
#[derive(Debug, Clone, Default)]
pub struct ProductHeader {
    fields: Vec<HeaderField>,
    index: HashMap<String, usize>,
}

impl ProductHeader {
    fn insert(&mut self, field: HeaderField) {
        if self.index.contains_key(&field.name) {
            warn!("duplicate header field {} ignored", field.name);
            return;
        }
        self.index.insert(field.name.clone(), self.fields.len());
        self.fields.push(field);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &HeaderField> {
        self.fields.iter()
    }

    /// Field lookup; names are matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&HeaderField> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&idx| &self.fields[idx])
    }

    pub fn require(&self, name: &str) -> L1bResult<&HeaderField> {
        self.get(name)
            .ok_or_else(|| L1bError::MissingField(format!("header field {}", name)))
    }

    pub fn integer(&self, name: &str) -> L1bResult<i64> {
        match &self.require(name)?.value {
            HeaderValue::Integer(value) => Ok(*value),
            _ => Err(L1bError::MissingField(format!(
                "header field {} has no integer value",
                name
            ))),
        }
    }

    pub fn float(&self, name: &str) -> L1bResult<f64> {
        match &self.require(name)?.value {
            HeaderValue::Float(value) => Ok(*value),
            HeaderValue::Integer(value) => Ok(*value as f64),
            HeaderValue::Text(_) => Err(L1bError::MissingField(format!(
                "header field {} has no numeric value",
                name
            ))),
        }
    }

    pub fn text(&self, name: &str) -> L1bResult<&str> {
        Ok(self.require(name)?.raw.as_str())
    }

    pub fn unit(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|field| field.unit.as_deref())
    }

    /// Field name to unit, for the fields that declare one.
    pub fn units(&self) -> HashMap<&str, &str> {
        self.fields
            .iter()
            .filter_map(|field| Some((field.name.as_str(), field.unit.as_deref()?)))
            .collect()
    }
}

pub struct TextHeaderParser;

impl TextHeaderParser {
    /// Reads one header block, leaving `reader` on the line after the sentinel.
    pub fn parse<R: BufRead>(reader: &mut R, schema: &HeaderSchema) -> L1bResult<ProductHeader> {
        let mut header = ProductHeader::default();
        let mut line = Vec::new();

        for _ in 0..schema.max_lines {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|err| L1bError::HeaderParse(format!("read failed: {}", err)))?;
            if read == 0 {
                return Err(L1bError::HeaderParse(format!(
                    "end of data before sentinel {}",
                    schema.sentinel
                )));
            }

            let text = String::from_utf8_lossy(&line);
            let Some((key, value)) = split_key_value(&text) else {
                continue;
            };
            let (raw, unit) = split_unit(value);
            let (value, coercion_failed) = schema.coerce(key, &raw);
            if coercion_failed {
                warn!("header field {} kept as text: {:?}", key, raw);
            }
            let is_sentinel = key == schema.sentinel;
            header.insert(HeaderField {
                name: key.to_ascii_lowercase(),
                raw,
                value,
                unit,
                coercion_failed,
            });
            if is_sentinel {
                return Ok(header);
            }
        }

        Err(L1bError::HeaderParse(format!(
            "sentinel {} not found within {} lines",
            schema.sentinel, schema.max_lines
        )))
    }
}

/// Splits `KEY=VALUE`; lines without a key are not fields.
pub(crate) fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end_matches(['\n', '\r', '\0']);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key, value))
}

/// Separates the unit from a value: `"text"`, `+0042<bytes>` or `12.5,dB`.
pub(crate) fn split_unit(value: &str) -> (String, Option<String>) {
    let value = value.trim();
    if let Some(quoted) = value.strip_prefix('"') {
        let inner = quoted.strip_suffix('"').unwrap_or(quoted);
        return (inner.trim().to_string(), None);
    }
    if value.ends_with('>') {
        if let Some(start) = value.find('<') {
            let unit = &value[start + 1..value.len() - 1];
            return (value[..start].trim().to_string(), Some(unit.to_string()));
        }
    }
    if let Some((number, unit)) = value.rsplit_once(',') {
        if !unit.trim().is_empty() {
            return (number.trim().to_string(), Some(unit.trim().to_string()));
        }
    }
    (value.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SCHEMA: HeaderSchema = HeaderSchema {
        sentinel: "CRC",
        integer_fields: &["CYCLE", "NUM_DSD", "CRC"],
        float_fields: &["DELTA_UT1"],
        max_lines: 16,
    };

    #[test]
    fn parser_returns_fields_up_to_sentinel() {
        let text = "PRODUCT=\"CS_OFFL_SIR_SAR_1B_X.DBL\"\nCYCLE=+012\nDELTA_UT1=-0.123456<s>\nNUM_DSD=+0000000004\nCRC=-00001\nNEXT=1\n";
        let mut cursor = Cursor::new(text.as_bytes());
        let header = TextHeaderParser::parse(&mut cursor, &SCHEMA).unwrap();

        assert_eq!(header.len(), 5);
        assert_eq!(header.text("product").unwrap(), "CS_OFFL_SIR_SAR_1B_X.DBL");
        assert_eq!(header.integer("cycle").unwrap(), 12);
        assert_eq!(header.unit("delta_ut1"), Some("s"));
        assert!((header.float("DELTA_UT1").unwrap() + 0.123456).abs() < 1e-12);

        let mut rest = String::new();
        cursor.read_line(&mut rest).unwrap();
        assert_eq!(rest, "NEXT=1\n");
    }

    #[test]
    fn coercion_failure_keeps_raw_text() {
        let text = "CYCLE=twelve\nCRC=+1\n";
        let header = TextHeaderParser::parse(&mut Cursor::new(text.as_bytes()), &SCHEMA).unwrap();
        let cycle = header.get("cycle").unwrap();
        assert!(cycle.coercion_failed);
        assert_eq!(cycle.value, HeaderValue::Text("twelve".into()));
        assert!(header.integer("cycle").is_err());
    }

    #[test]
    fn missing_sentinel_is_a_parse_error() {
        let text = "CYCLE=+1\nNUM_DSD=+2\n";
        let err = TextHeaderParser::parse(&mut Cursor::new(text.as_bytes()), &SCHEMA).unwrap_err();
        assert!(matches!(err, L1bError::HeaderParse(_)));
    }

    #[test]
    fn line_bound_guards_unterminated_header() {
        let text = "A=1\n".repeat(SCHEMA.max_lines + 4);
        let err = TextHeaderParser::parse(&mut Cursor::new(text.as_bytes()), &SCHEMA).unwrap_err();
        assert!(err.to_string().contains("within 16 lines"));
    }

    #[test]
    fn comma_unit_and_blank_lines() {
        let text = "\nSIGMA=12.5,dB\nCRC=+0\n";
        let header = TextHeaderParser::parse(&mut Cursor::new(text.as_bytes()), &SCHEMA).unwrap();
        assert_eq!(header.len(), 2);
        assert_eq!(header.units().get("sigma"), Some(&"dB"));
    }
}
