//! Level-1b ingestion core for multi-mission radar altimetry.
//!
//! Native products (ESA PDS binaries and variable-set dumps) are decoded by
//! per-mission adapters into one canonical along-track pulse model, with
//! waveform classifiers computed on the way.

pub mod adapters;
pub mod binary;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod header;
pub mod layouts;
pub mod math;
pub mod model;
pub mod prelude;
pub mod source;
pub mod telemetry;
pub mod variables;

pub use adapters::{adapter_for, construct_track};
pub use config::MissionConfig;
pub use model::{PulseTrack, TrackInfo};
pub use prelude::{L1bError, L1bResult, MissionAdapter, MissionId, RadarMode, TrackError};
