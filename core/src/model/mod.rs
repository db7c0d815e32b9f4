//! Mission-agnostic per-pulse track model.

pub mod info;
pub mod parameters;
pub mod surface;
pub mod track;

pub use info::{Timeliness, TrackInfo, TrackSummary};
pub use parameters::{is_correction_name, Classifiers, Corrections, CORRECTION_NAMES};
pub use surface::{SurfaceCategory, SurfaceFlag, SurfaceType};
pub use track::{PulseTrack, PulseTrackBuilder, TimeOrbit, Waveform};
