//! Mission adapters: one native product in, one canonical track out.

pub mod cryosat2;
pub mod envisat;
pub mod ers;
pub mod icesat;
pub mod sentinel3;

pub use cryosat2::Cryosat2Adapter;
pub use envisat::EnvisatAdapter;
pub use ers::ErsAdapter;
pub use icesat::IcesatAdapter;
pub use sentinel3::Sentinel3Adapter;

use std::path::Path;

use crate::clock::{LeapSecondTable, TaiUtcConverter};
use crate::config::MissionConfig;
use crate::model::{PulseTrack, PulseTrackBuilder, SurfaceCategory};
use crate::prelude::{L1bResult, MissionAdapter, MissionId, TrackError};
use crate::source::ProductFile;

/// Adapter for `config.mission`.
pub fn adapter_for(config: MissionConfig, leap_seconds: &LeapSecondTable) -> Box<dyn MissionAdapter + Send + Sync> {
    match config.mission {
        MissionId::Cryosat2 => Box::new(Cryosat2Adapter::new(
            config,
            TaiUtcConverter::new(leap_seconds.clone()),
        )),
        MissionId::Envisat => Box::new(EnvisatAdapter::new(config)),
        MissionId::Ers1 | MissionId::Ers2 => Box::new(ErsAdapter::new(config)),
        MissionId::Sentinel3a | MissionId::Sentinel3b => Box::new(Sentinel3Adapter::new(config)),
        MissionId::Icesat => Box::new(IcesatAdapter::new(config)),
    }
}

/// Opens `path` and runs the adapter on it. Either a complete track or the
/// error that stopped it; never a partial track.
pub fn construct_track(adapter: &dyn MissionAdapter, path: &Path) -> Result<PulseTrack, TrackError> {
    let fail = |source| TrackError {
        path: path.to_path_buf(),
        source,
    };
    let product = ProductFile::open(path).map_err(fail)?;
    adapter.construct(product).map_err(fail)
}

/// Maps native surface codes through the configured dictionary.
pub(crate) fn transfer_surface_codes(
    builder: &mut PulseTrackBuilder,
    codes: &[f64],
    config: &MissionConfig,
) -> L1bResult<()> {
    let categories: Vec<SurfaceCategory> = codes
        .iter()
        .map(|&code| {
            if code.is_finite() {
                config.surface_category(code.round() as i64)
            } else {
                SurfaceCategory::Unknown
            }
        })
        .collect();
    for category in SurfaceCategory::ALL {
        if category == SurfaceCategory::Unknown {
            continue;
        }
        let flag: Vec<bool> = categories.iter().map(|&c| c == category).collect();
        if flag.iter().any(|&set| set) {
            builder.surface_type().add(&flag, category)?;
        }
    }
    Ok(())
}

/// Sets every configured correction. `native` resolves a native name to
/// per-pulse values; targets without a native name are zero-filled.
pub(crate) fn transfer_corrections<F>(
    builder: &mut PulseTrackBuilder,
    config: &MissionConfig,
    mut native: F,
) -> L1bResult<()>
where
    F: FnMut(&str, &str) -> L1bResult<Vec<f64>>,
{
    let n = builder.n_pulses();
    for (name, target) in &config.correction_targets {
        let values = match target {
            Some(field) => native(name, field)?,
            None => vec![0.0; n],
        };
        builder.correction().set(name, values)?;
    }
    Ok(())
}

/// Adds every configured pass-through classifier, resolving native names
/// the same way as [`transfer_corrections`].
pub(crate) fn transfer_classifier_targets<F>(
    builder: &mut PulseTrackBuilder,
    config: &MissionConfig,
    mut native: F,
) -> L1bResult<()>
where
    F: FnMut(&str) -> L1bResult<Vec<f64>>,
{
    for (name, field) in &config.classifier_targets {
        let values = native(field)?;
        builder.classifier().add(values, name)?;
    }
    Ok(())
}

/// Nonzero, finite values.
pub(crate) fn truthy(values: &[f64]) -> Vec<bool> {
    values.iter().map(|v| v.is_finite() && *v != 0.0).collect()
}
