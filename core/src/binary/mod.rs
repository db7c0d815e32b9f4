pub mod decoder;
pub mod layout;
pub mod trim;
pub mod unpack;

pub use decoder::{encode_record, BinaryRecordDecoder, MeasurementSegment, NativeRecord};
pub use layout::{Endian, FieldRef, FieldSpec, FieldType, GroupSpec, LayoutKey, RecordLayout};
pub use trim::{TrackTrimmer, TrimPlan};
pub use unpack::{rows_to_array, GroupUnpacker};
