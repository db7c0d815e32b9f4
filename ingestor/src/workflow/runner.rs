use crate::workflow::config::IngestConfig;
use l1bcore::model::{PulseTrack, TrackSummary};
use l1bcore::telemetry::{MetricsRecorder, MetricsSnapshot};
use l1bcore::{adapter_for, construct_track, MissionAdapter, TrackError};
use log::{info, warn};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinError;

type TaskOutcome = Result<Result<PulseTrack, TrackError>, JoinError>;

#[derive(Debug, Clone, Serialize)]
pub struct FailedTrack {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub tracks: Vec<TrackSummary>,
    pub failures: Vec<FailedTrack>,
    pub metrics: MetricsSnapshot,
}

#[derive(Clone)]
pub struct Runner {
    config: IngestConfig,
    metrics: Arc<MetricsRecorder>,
}

impl Runner {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    /// Decodes every configured input on the blocking pool. A failed track
    /// is reported and counted; it never stops the run.
    pub async fn execute(&self) -> anyhow::Result<IngestReport> {
        let leap_seconds = self.config.leap_second_table()?;
        let mut handles = Vec::with_capacity(self.config.input_count());
        for entry in &self.config.missions {
            let mission_config = entry.mission_config()?;
            let adapter: Arc<dyn MissionAdapter + Send + Sync> =
                Arc::from(adapter_for(mission_config, &leap_seconds));
            for path in &entry.inputs {
                let adapter = adapter.clone();
                let task_path = path.clone();
                let handle = tokio::task::spawn_blocking(move || construct_track(adapter.as_ref(), &task_path));
                handles.push((path.clone(), handle));
            }
        }

        let mut report = IngestReport {
            tracks: Vec::new(),
            failures: Vec::new(),
            metrics: MetricsSnapshot::default(),
        };
        for (path, handle) in handles {
            self.record_outcome(&path, handle.await, &mut report);
        }
        report.metrics = self.metrics.snapshot();
        Ok(report)
    }

    /// Folds one task result into the report. A task that panicked or was
    /// cancelled fails its own input only.
    fn record_outcome(&self, path: &Path, outcome: TaskOutcome, report: &mut IngestReport) {
        let result = match outcome {
            Ok(result) => result,
            Err(join_err) => {
                self.metrics.record_failure();
                warn!("{}: decode task aborted: {}", path.display(), join_err);
                report.failures.push(FailedTrack {
                    path: path.display().to_string(),
                    error: format!("decode task aborted: {}", join_err),
                });
                return;
            }
        };
        match result {
            Ok(track) => {
                let summary = track.summary();
                self.metrics.record_track(summary.n_pulses, summary.pulses_trimmed);
                info!(
                    "{}: {} {} track, {} pulses ({} valid, {} trimmed)",
                    path.display(),
                    summary.mission,
                    summary.radar_mode,
                    summary.n_pulses,
                    summary.n_valid,
                    summary.pulses_trimmed
                );
                report.tracks.push(summary);
            }
            Err(err) => {
                self.metrics.record_failure();
                warn!("{}", err);
                report.failures.push(FailedTrack {
                    path: path.display().to_string(),
                    error: err.source.to_string(),
                });
            }
        }
    }
}
