//! Per-pulse surface-type classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::prelude::{L1bError, L1bResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceCategory {
    Ocean,
    SeaIce,
    LandIce,
    Land,
    Unknown,
}

impl SurfaceCategory {
    pub const ALL: [SurfaceCategory; 5] = [
        Self::Ocean,
        Self::SeaIce,
        Self::LandIce,
        Self::Land,
        Self::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ocean => "ocean",
            Self::SeaIce => "sea_ice",
            Self::LandIce => "land_ice",
            Self::Land => "land",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(name: &str) -> L1bResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == name)
            .ok_or_else(|| L1bError::InvalidConfig(format!("unknown surface type {:?}", name)))
    }
}

impl fmt::Display for SurfaceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One category per pulse; every pulse starts as `Unknown`.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceType {
    categories: Vec<SurfaceCategory>,
}

impl SurfaceType {
    pub fn new(n_pulses: usize) -> Self {
        Self {
            categories: vec![SurfaceCategory::Unknown; n_pulses],
        }
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Assigns `category` where `flag` is set. A later call wins over an
    /// earlier one for the same pulse.
    pub fn add(&mut self, flag: &[bool], category: SurfaceCategory) -> L1bResult<()> {
        if flag.len() != self.categories.len() {
            return Err(L1bError::StructuralInconsistency(format!(
                "surface flag {} has {} values for {} pulses",
                category,
                flag.len(),
                self.categories.len()
            )));
        }
        for (slot, &set) in self.categories.iter_mut().zip(flag) {
            if set {
                *slot = category;
            }
        }
        Ok(())
    }

    pub fn category(&self, index: usize) -> Option<SurfaceCategory> {
        self.categories.get(index).copied()
    }

    pub fn categories(&self) -> &[SurfaceCategory] {
        &self.categories
    }

    pub fn get(&self, category: SurfaceCategory) -> SurfaceFlag {
        SurfaceFlag {
            category,
            mask: self.categories.iter().map(|c| *c == category).collect(),
        }
    }

    pub fn get_by_name(&self, name: &str) -> L1bResult<SurfaceFlag> {
        Ok(self.get(SurfaceCategory::parse(name)?))
    }
}

/// Boolean view of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceFlag {
    pub category: SurfaceCategory,
    mask: Vec<bool>,
}

impl SurfaceFlag {
    pub fn flag(&self) -> &[bool] {
        &self.mask
    }

    pub fn indices(&self) -> Vec<usize> {
        self.mask
            .iter()
            .enumerate()
            .filter_map(|(idx, &set)| set.then_some(idx))
            .collect()
    }

    pub fn num(&self) -> usize {
        self.mask.iter().filter(|&&set| set).count()
    }
}
