use crate::generator::template::{diffuse_echo, specular_echo};
use anyhow::{bail, Context};
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use l1bcore::adapters::cryosat2::{product_name, write_product, ProductMetadata};
use l1bcore::binary::{NativeRecord, RecordLayout};
use l1bcore::clock::mjd2000_epoch;
use l1bcore::config::SPEED_OF_LIGHT;
use l1bcore::layouts::cryosat2::{layout, BASELINES, BLOCKS_PER_RECORD};
use l1bcore::RadarMode;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for generating a synthetic CryoSat-2 L1b product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub mode: RadarMode,
    pub baseline: String,
    /// 1 Hz records carrying data.
    pub records: usize,
    /// Zero-filled records appended after the data, as in real products.
    pub pad_records: usize,
    /// TAI time of the first pulse.
    pub start: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Relative amplitude of the multiplicative count noise.
    pub noise: f64,
    pub seed: u64,
    pub description: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mode: RadarMode::Sar,
            baseline: "C".into(),
            records: 4,
            pad_records: 1,
            start: NaiveDate::from_ymd_opt(2017, 3, 1)
                .and_then(|day| day.and_hms_opt(6, 0, 0))
                .unwrap_or_default(),
            latitude: 75.0,
            longitude: -10.0,
            altitude: 720_000.0,
            noise: 0.05,
            seed: 0,
            description: None,
        }
    }
}

pub struct SyntheticProduct {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Along-track latitude step between 20 Hz pulses [deg].
const LATITUDE_STEP: f64 = 0.0034;
const PULSE_INTERVAL_MS: i64 = 50;
const ECHO_PEAK_COUNTS: f64 = 40_000.0;

/// ESA surface code of record `r`: every fourth second is over land.
fn surface_code(record: usize) -> f64 {
    if record % 4 == 3 {
        3.0
    } else {
        0.0
    }
}

fn jitter(rng: &mut StdRng, amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        rng.gen_range(-amplitude..amplitude)
    } else {
        0.0
    }
}

fn put(layout: &RecordLayout, record: &mut NativeRecord, group: &str, field: &str, block: usize, value: f64) -> anyhow::Result<()> {
    let field = layout
        .field(group, field)
        .with_context(|| format!("synthetic layout lacks {}/{}", group, field))?;
    record.set_scaled(layout, field, block, 0, value);
    Ok(())
}

fn build_record(config: &GeneratorConfig, layout: &RecordLayout, record_index: usize, rng: &mut StdRng) -> anyhow::Result<NativeRecord> {
    let wfm = layout.field("waveform", "wfm")?;
    let bins = layout.spec(wfm).count;
    let epoch = mjd2000_epoch();
    let window_delay = 2.0 * config.altitude / SPEED_OF_LIGHT;
    let mut record = NativeRecord::zeroed(layout);

    for block in 0..BLOCKS_PER_RECORD {
        let pulse = record_index * BLOCKS_PER_RECORD + block;
        let time = config.start + Duration::milliseconds(PULSE_INTERVAL_MS * pulse as i64);
        put(layout, &mut record, "time_orbit", "days", block, (time.date() - epoch.date()).num_days() as f64)?;
        put(layout, &mut record, "time_orbit", "seconds", block, time.num_seconds_from_midnight() as f64)?;
        put(layout, &mut record, "time_orbit", "microseconds", block, (time.nanosecond() / 1000) as f64)?;
        put(layout, &mut record, "time_orbit", "source_sequence_counter", block, (pulse % 65_535 + 1) as f64)?;
        put(layout, &mut record, "time_orbit", "latitude", block, config.latitude + LATITUDE_STEP * pulse as f64)?;
        put(layout, &mut record, "time_orbit", "longitude", block, config.longitude)?;
        put(layout, &mut record, "time_orbit", "altitude", block, config.altitude + jitter(rng, 5.0))?;
        put(layout, &mut record, "time_orbit", "satellite_velocity", block, 7_500.0)?;
        if layout.has_field("time_orbit", "antenna_roll") {
            put(layout, &mut record, "time_orbit", "antenna_roll", block, jitter(rng, 0.1))?;
            put(layout, &mut record, "time_orbit", "antenna_pitch", block, jitter(rng, 0.1))?;
        }
        put(layout, &mut record, "measurement", "window_delay", block, window_delay)?;
        put(layout, &mut record, "measurement", "tx_power", block, 25.0)?;
        put(layout, &mut record, "waveform", "linear_scale", block, 1000.0)?;

        // Every fifth pulse sees a lead.
        let centre = bins as f64 / 2.0 + jitter(rng, 2.0);
        let template = if pulse % 5 == 0 {
            specular_echo(bins, centre)
        } else {
            diffuse_echo(bins, centre)
        };
        for (k, shape) in template.iter().enumerate() {
            let counts = ECHO_PEAK_COUNTS * shape * (1.0 + jitter(rng, config.noise));
            record.set_scaled(layout, wfm, block, k, counts.round().clamp(1.0, 65_535.0));
        }
        if layout.has_field("waveform", "stack_kurtosis") {
            put(layout, &mut record, "waveform", "stack_standard_deviation", block, 4.0 + jitter(rng, 1.0))?;
            put(layout, &mut record, "waveform", "stack_kurtosis", block, 12.0 + jitter(rng, 3.0))?;
            put(layout, &mut record, "waveform", "stack_skewness", block, 3.0 + jitter(rng, 1.0))?;
        }
    }

    put(layout, &mut record, "corrections", "dry_troposphere", 0, -2.3)?;
    put(layout, &mut record, "corrections", "wet_troposphere", 0, -0.1)?;
    put(layout, &mut record, "corrections", "inverse_barometric", 0, 0.05)?;
    put(layout, &mut record, "corrections", "ionospheric_gim", 0, -0.05)?;
    put(layout, &mut record, "corrections", "ocean_tide_elastic", 0, 0.3)?;
    put(layout, &mut record, "corrections", "solid_earth_tide", 0, 0.1)?;
    put(layout, &mut record, "corrections", "surface_type", 0, surface_code(record_index))?;
    Ok(record)
}

/// Builds a complete product; the same config always yields the same bytes.
pub fn build_synthetic_product(config: &GeneratorConfig) -> anyhow::Result<SyntheticProduct> {
    if !BASELINES.contains(&config.baseline.as_str()) {
        bail!("no CryoSat-2 layout for baseline {}", config.baseline);
    }
    if config.records == 0 {
        bail!("synthetic product needs at least one data record");
    }
    let layout = layout(&config.baseline, config.mode);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut records = (0..config.records)
        .map(|r| build_record(config, &layout, r, &mut rng))
        .collect::<anyhow::Result<Vec<_>>>()?;
    records.extend(std::iter::repeat(NativeRecord::zeroed(&layout)).take(config.pad_records));

    let stop = config.start + Duration::seconds(config.records as i64);
    let name = product_name(config.mode, &config.baseline, config.start, stop);
    let ocean = (0..config.records).filter(|&r| surface_code(r) == 0.0).count();
    let metadata = ProductMetadata {
        product_name: name.clone(),
        proc_stage: "O".into(),
        cycle: 1,
        abs_orbit: 1,
        start_tai: config.start,
        stop_tai: stop,
        open_ocean_percent: 100.0 * ocean as f64 / config.records as f64,
    };
    let bytes = write_product(&layout, &metadata, &records);
    Ok(SyntheticProduct { name, bytes })
}

/// Writes the product into `target`, a directory (the product name is used)
/// or a file path. Returns the path written.
pub fn write_synthetic_product(target: &Path, config: &GeneratorConfig) -> anyhow::Result<PathBuf> {
    let product = build_synthetic_product(config)?;
    let path = if target.is_dir() {
        target.join(&product.name)
    } else {
        target.to_path_buf()
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, &product.bytes)
        .with_context(|| format!("writing synthetic product {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use l1bcore::adapters::Cryosat2Adapter;
    use l1bcore::classifier::names;
    use l1bcore::clock::{LeapSecondTable, TaiUtcConverter};
    use l1bcore::source::ProductFile;
    use l1bcore::{MissionAdapter, MissionConfig, MissionId};

    fn adapter() -> Cryosat2Adapter {
        Cryosat2Adapter::new(
            MissionConfig::defaults(MissionId::Cryosat2),
            TaiUtcConverter::new(LeapSecondTable::builtin()),
        )
    }

    #[test]
    fn generator_is_reproducible_per_seed() {
        let config = GeneratorConfig::default();
        let first = build_synthetic_product(&config).unwrap();
        let second = build_synthetic_product(&config).unwrap();
        assert_eq!(first.bytes, second.bytes);
        assert!(first.name.starts_with("CS_OFFL_SIR_SAR_1B_20170301T060000"));

        let other = build_synthetic_product(&GeneratorConfig { seed: 7, ..config }).unwrap();
        assert_ne!(first.bytes, other.bytes);
    }

    #[test]
    fn synthetic_product_decodes_into_a_track() {
        let config = GeneratorConfig {
            records: 4,
            pad_records: 2,
            description: Some("smoke".into()),
            ..Default::default()
        };
        let product = build_synthetic_product(&config).unwrap();
        let track = adapter()
            .construct(ProductFile::from_bytes(product.name, product.bytes))
            .unwrap();
        assert_eq!(track.n_pulses(), 4 * BLOCKS_PER_RECORD);
        assert_eq!(track.info().pulses_trimmed, 2 * BLOCKS_PER_RECORD);
        assert!(track.waveform().valid.iter().all(|&valid| valid));
        assert_eq!(track.surface_type().get_by_name("land").unwrap().num(), BLOCKS_PER_RECORD);
        assert!(track.classifier().contains(names::PEAKINESS));
    }

    #[test]
    fn lrm_and_baseline_b_are_supported() {
        let config = GeneratorConfig {
            mode: RadarMode::Lrm,
            baseline: "B".into(),
            noise: 0.0,
            ..Default::default()
        };
        let product = build_synthetic_product(&config).unwrap();
        let track = adapter()
            .construct(ProductFile::from_bytes(product.name, product.bytes))
            .unwrap();
        assert_eq!(track.waveform().range_bins(), 128);
    }

    #[test]
    fn unknown_baseline_and_empty_products_are_rejected() {
        let bad = GeneratorConfig {
            baseline: "A".into(),
            ..Default::default()
        };
        assert!(build_synthetic_product(&bad).is_err());
        let empty = GeneratorConfig {
            records: 0,
            ..Default::default()
        };
        assert!(build_synthetic_product(&empty).is_err());
    }

    #[test]
    fn products_written_into_directories_keep_their_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_synthetic_product(dir.path(), &GeneratorConfig::default()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with(".DBL"));
        assert!(path.exists());
    }
}
