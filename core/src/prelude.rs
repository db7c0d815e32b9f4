use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::PulseTrack;
use crate::source::ProductFile;

/// Altimeter operating mode of a track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RadarMode {
    Lrm,
    Sar,
    #[serde(alias = "sin")]
    Sarin,
}

impl RadarMode {
    /// Accepts the mode tokens used in product names and configuration files.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "lrm" => Some(Self::Lrm),
            "sar" => Some(Self::Sar),
            "sin" | "sarin" => Some(Self::Sarin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lrm => "lrm",
            Self::Sar => "sar",
            Self::Sarin => "sin",
        }
    }

    /// SAR and SARin footprints follow the synthetic-aperture radar equation.
    pub fn is_synthetic_aperture(self) -> bool {
        matches!(self, Self::Sar | Self::Sarin)
    }
}

impl fmt::Display for RadarMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Missions with a registered adapter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MissionId {
    Cryosat2,
    Envisat,
    Ers1,
    Ers2,
    Sentinel3a,
    Sentinel3b,
    Icesat,
}

impl MissionId {
    pub const ALL: [MissionId; 7] = [
        Self::Cryosat2,
        Self::Envisat,
        Self::Ers1,
        Self::Ers2,
        Self::Sentinel3a,
        Self::Sentinel3b,
        Self::Icesat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cryosat2 => "cryosat2",
            Self::Envisat => "envisat",
            Self::Ers1 => "ers1",
            Self::Ers2 => "ers2",
            Self::Sentinel3a => "sentinel3a",
            Self::Sentinel3b => "sentinel3b",
            Self::Icesat => "icesat",
        }
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissionId {
    type Err = L1bError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|mission| mission.as_str() == wanted)
            .ok_or_else(|| L1bError::InvalidConfig(format!("unknown mission id {:?}", s)))
    }
}

/// Failure taxonomy of track construction.
///
/// Every variant aborts the current track only. Per-pulse numeric
/// degeneracies are never errors; they surface as NaN.
#[derive(thiserror::Error, Debug)]
pub enum L1bError {
    #[error("invalid file path {}: {reason}", .path.display())]
    InvalidFilePath { path: PathBuf, reason: String },
    #[error("unsupported format: mission {mission}, baseline {baseline}, mode {mode}")]
    UnsupportedFormatVersion {
        mission: String,
        baseline: String,
        mode: String,
    },
    #[error("header parse error: {0}")]
    HeaderParse(String),
    #[error("missing field: {0}")]
    MissingField(String),
    #[error("binary decode error: {0}")]
    BinaryDecode(String),
    #[error("structural inconsistency: {0}")]
    StructuralInconsistency(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type L1bResult<T> = Result<T, L1bError>;

/// A failed track, with the product path it belongs to.
#[derive(thiserror::Error, Debug)]
#[error("{}: {source}", .path.display())]
pub struct TrackError {
    pub path: PathBuf,
    pub source: L1bError,
}

/// Translates one mission's native product into the canonical pulse model.
///
/// Implementations consume the product handle, so the underlying bytes are
/// released when construction returns, on success and on every error path.
pub trait MissionAdapter {
    fn mission(&self) -> MissionId;
    fn construct(&self, product: ProductFile) -> L1bResult<PulseTrack>;
}
