//! Envisat RA-2 SGDR measurement data sets, software version 9 and later.
//!
//! Both data sets are big-endian with one 1 Hz record per data set record.
//! The level-2 data set carries 18 Hz quantities as 20-element arrays; the
//! waveform data set carries 20 averaged waveform blocks.
//!
//! Only the fields the adapter reads are laid out, so these records are
//! narrower than the full SGDR record and a product's declared record size
//! has to match them.

use crate::binary::{Endian, FieldSpec, FieldType, GroupSpec, LayoutKey, RecordLayout};
use crate::prelude::{MissionId, RadarMode};

pub const BLOCKS_PER_RECORD: usize = 20;
pub const BASELINE: &str = "v9";
pub const WAVEFORM_BINS: usize = 128;
pub const LEVEL2_DATASET: &str = "RA2_DATA_SET_FOR_LEVEL_2";
pub const WAVEFORM_DATASET: &str = "RA2_AVERAGE_WAVEFORMS";

fn utc_time() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("utc_days", FieldType::I32).scaled(1.0, "day"),
        FieldSpec::new("utc_seconds", FieldType::U32).scaled(1.0, "s"),
        FieldSpec::new("utc_microseconds", FieldType::U32).scaled(1.0, "us"),
        FieldSpec::new("quality_indicator", FieldType::I8),
        FieldSpec::spare(3),
    ]
}

fn per_18hz(name: &'static str, ty: FieldType, scale: f64, unit: &'static str) -> FieldSpec {
    FieldSpec::new(name, ty)
        .count(BLOCKS_PER_RECORD)
        .scaled(scale, unit)
}

pub fn level2_layout() -> RecordLayout {
    let mut time_orbit = utc_time();
    time_orbit.extend([
        FieldSpec::new("latitude", FieldType::I32).scaled(1e-6, "deg"),
        FieldSpec::new("longitude", FieldType::I32).scaled(1e-6, "deg"),
        FieldSpec::new("altitude", FieldType::I32).scaled(1e-3, "m"),
        FieldSpec::new("altitude_rate", FieldType::I16).scaled(1e-2, "m/s"),
        FieldSpec::spare(2),
        per_18hz("altitude_differences_18hz", FieldType::I16, 1e-3, "m"),
        FieldSpec::new("measurement_confidence_data", FieldType::U32),
    ]);

    let metres16 = |name| FieldSpec::new(name, FieldType::I16).scaled(1e-3, "m");
    let metres32 = |name| FieldSpec::new(name, FieldType::I32).scaled(1e-3, "m");

    RecordLayout::new(
        LayoutKey::new(MissionId::Envisat, BASELINE, RadarMode::Lrm, LEVEL2_DATASET),
        Endian::Big,
        vec![
            GroupSpec::new("time_orbit", 1, time_orbit),
            GroupSpec::new(
                "range_information",
                1,
                vec![
                    per_18hz("tracker_range_no_doppler_ku_18hz", FieldType::I32, 1e-3, "m"),
                    per_18hz("latitude_differences_18hz", FieldType::I16, 1e-6, "deg"),
                    per_18hz("longitude_differences_18hz", FieldType::I16, 1e-6, "deg"),
                ],
            ),
            GroupSpec::new(
                "range_correction",
                1,
                vec![
                    per_18hz("doppler_ku_18hz", FieldType::I16, 1e-3, "m"),
                    per_18hz("doppler_slope_ku_18hz", FieldType::I16, 1e-3, "m"),
                    metres16("ku_instrument_correction"),
                    FieldSpec::spare(2),
                ],
            ),
            GroupSpec::new(
                "geophysical",
                1,
                vec![
                    metres16("dry_troposphere"),
                    metres16("inverse_barometric"),
                    metres16("wet_troposphere_model"),
                    metres16("wet_troposphere_mwr"),
                    metres16("ionospheric_gim"),
                    metres16("ionospheric_doris"),
                    metres32("ocean_tide_solution1"),
                    metres32("long_period_tide"),
                    metres32("loading_tide_solution1"),
                    metres32("solid_earth_tide"),
                    metres32("geocentric_pole_tide"),
                ],
            ),
            GroupSpec::new(
                "backscatter",
                1,
                vec![
                    per_18hz("sea_ice_sigma_ku_18hz", FieldType::I16, 1e-2, "dB"),
                    FieldSpec::new("ku_sigma0", FieldType::I16).scaled(1e-2, "dB"),
                    FieldSpec::spare(2),
                ],
            ),
            GroupSpec::new(
                "flags",
                1,
                vec![
                    FieldSpec::new("average_ku_chirp_band", FieldType::U8),
                    FieldSpec::new("altimeter_surface_type", FieldType::U8),
                    FieldSpec::new("radiometer_land_ocean", FieldType::U8),
                    FieldSpec::new("sea_ice", FieldType::U8),
                ],
            ),
        ],
    )
}

pub fn waveform_layout() -> RecordLayout {
    RecordLayout::new(
        LayoutKey::new(MissionId::Envisat, BASELINE, RadarMode::Lrm, WAVEFORM_DATASET),
        Endian::Big,
        vec![
            GroupSpec::new("header", 1, utc_time()),
            GroupSpec::new(
                "wfm",
                BLOCKS_PER_RECORD,
                vec![
                    FieldSpec::new("average_wfm_if_corr_ku", FieldType::U16).count(WAVEFORM_BINS),
                    FieldSpec::new("average_wfm_if_corr_s", FieldType::U16).count(64),
                    FieldSpec::new("indication_of_tracking", FieldType::U8),
                    FieldSpec::spare(3),
                ],
            ),
        ],
    )
}

pub fn all() -> Vec<RecordLayout> {
    vec![level2_layout(), waveform_layout()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level2_record_size() {
        let layout = level2_layout();
        let time_orbit = 16 + 12 + 4 + 40 + 4;
        let range_information = 80 + 40 + 40;
        let range_correction = 40 + 40 + 4;
        let geophysical = 6 * 2 + 5 * 4;
        let backscatter = 40 + 4;
        let flags = 4;
        assert_eq!(
            layout.record_size(),
            time_orbit + range_information + range_correction + geophysical + backscatter + flags
        );
    }

    #[test]
    fn waveform_record_holds_twenty_blocks() {
        let layout = waveform_layout();
        assert_eq!(layout.group("wfm").unwrap().blocks, BLOCKS_PER_RECORD);
        assert_eq!(layout.record_size(), 16 + 20 * (256 + 128 + 4));
    }
}
