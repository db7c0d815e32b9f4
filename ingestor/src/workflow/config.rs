use anyhow::Context;
use l1bcore::clock::LeapSecondTable;
use l1bcore::{MissionConfig, MissionId};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Products of one mission and the configuration overrides they share.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MissionEntry {
    pub mission: MissionId,
    /// Partial `MissionConfig` merged over the mission defaults.
    #[serde(default)]
    pub overrides: serde_json::Value,
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub missions: Vec<MissionEntry>,
    /// IETF `leap-seconds.list`; the built-in table is used when absent.
    pub leap_seconds: Option<PathBuf>,
    pub workers: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            missions: Vec::new(),
            leap_seconds: None,
            workers: 4,
        }
    }
}

impl IngestConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading ingest config {}", path_ref.display()))?;
        let config: IngestConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing ingest config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(mission: MissionId, inputs: Vec<PathBuf>) -> Self {
        let mut config = Self::default();
        config.add_inputs(mission, inputs);
        config
    }

    /// Appends `inputs` to the entry of `mission`, creating it if needed.
    pub fn add_inputs(&mut self, mission: MissionId, inputs: Vec<PathBuf>) {
        match self.missions.iter_mut().find(|entry| entry.mission == mission) {
            Some(entry) => entry.inputs.extend(inputs),
            None => self.missions.push(MissionEntry {
                mission,
                overrides: serde_json::Value::Null,
                inputs,
            }),
        }
    }

    pub fn input_count(&self) -> usize {
        self.missions.iter().map(|entry| entry.inputs.len()).sum()
    }

    pub fn leap_second_table(&self) -> anyhow::Result<LeapSecondTable> {
        match &self.leap_seconds {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("opening leap-second file {}", path.display()))?;
                LeapSecondTable::from_reader(BufReader::new(file))
                    .with_context(|| format!("parsing leap-second file {}", path.display()))
            }
            None => Ok(LeapSecondTable::builtin()),
        }
    }
}

impl MissionEntry {
    pub fn mission_config(&self) -> anyhow::Result<MissionConfig> {
        MissionConfig::defaults(self.mission)
            .with_overrides(&self.overrides)
            .with_context(|| format!("applying {} configuration overrides", self.mission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_groups_inputs_by_mission() {
        let mut cfg = IngestConfig::from_args(MissionId::Ers2, vec!["a.nc".into()]);
        cfg.add_inputs(MissionId::Ers2, vec!["b.nc".into()]);
        cfg.add_inputs(MissionId::Icesat, vec!["c.h5".into()]);
        assert_eq!(cfg.missions.len(), 2);
        assert_eq!(cfg.input_count(), 3);
        assert_eq!(cfg.missions[0].mission_config().unwrap().mission, MissionId::Ers2);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"workers: 2\nmissions:\n  - mission: cryosat2\n    overrides:\n      peakiness_pad: 3\n    inputs: [CS_OFFL_SIR_SAR_1B.DBL]\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = IngestConfig::load(&path).unwrap();
        assert_eq!(cfg.workers, 2);
        assert!(cfg.leap_seconds.is_none());
        let mission = cfg.missions[0].mission_config().unwrap();
        assert_eq!(mission.mission, MissionId::Cryosat2);
        assert_eq!(mission.peakiness_pad, 3);
    }

    #[test]
    fn bad_overrides_are_reported() {
        let entry = MissionEntry {
            mission: MissionId::Envisat,
            overrides: serde_json::json!({"time_units": "eons since 1990-01-01"}),
            inputs: Vec::new(),
        };
        assert!(entry.mission_config().is_err());
    }
}
