//! Process-wide, immutable table of known record layouts.

pub mod cryosat2;
pub mod envisat;

use std::sync::OnceLock;

use log::debug;

use crate::binary::RecordLayout;
use crate::prelude::{L1bError, L1bResult, MissionId, RadarMode};

static REGISTRY: OnceLock<LayoutRegistry> = OnceLock::new();

pub struct LayoutRegistry {
    layouts: Vec<RecordLayout>,
}

impl LayoutRegistry {
    fn build() -> Self {
        let mut layouts = cryosat2::all();
        layouts.extend(envisat::all());
        debug!("layout registry holds {} layouts", layouts.len());
        Self { layouts }
    }

    /// Built on first use and shared read-only afterwards.
    pub fn global() -> &'static LayoutRegistry {
        REGISTRY.get_or_init(Self::build)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    pub fn lookup(
        &self,
        mission: MissionId,
        baseline: &str,
        mode: RadarMode,
        dataset: &str,
    ) -> L1bResult<&RecordLayout> {
        self.layouts
            .iter()
            .find(|layout| {
                layout.key.mission == mission
                    && layout.key.baseline == baseline
                    && layout.key.mode == mode
                    && layout.key.dataset.eq_ignore_ascii_case(dataset)
            })
            .ok_or_else(|| L1bError::UnsupportedFormatVersion {
                mission: mission.to_string(),
                baseline: baseline.to_string(),
                mode: mode.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_knows_every_supported_combination() {
        let registry = LayoutRegistry::global();
        assert_eq!(registry.len(), 8);
        for baseline in cryosat2::BASELINES {
            for mode in cryosat2::MODES {
                let layout = registry
                    .lookup(MissionId::Cryosat2, baseline, mode, cryosat2::dataset_name(mode))
                    .unwrap();
                assert_eq!(layout.key.baseline, baseline);
            }
        }
        assert!(registry
            .lookup(MissionId::Envisat, "v9", RadarMode::Lrm, "ra2_average_waveforms")
            .is_ok());
    }

    #[test]
    fn unknown_baseline_is_unsupported() {
        let err = LayoutRegistry::global()
            .lookup(MissionId::Cryosat2, "A", RadarMode::Sar, "SIR_L1B_SAR")
            .unwrap_err();
        assert!(matches!(err, L1bError::UnsupportedFormatVersion { .. }));
    }
}
