// VolumeMapper - smoothed relax index to actuator volume in [0, 1]
//
// The mapping is inverted: a relax index at the calibration minimum gives
// full volume, one at or above the maximum gives silence. Every
// non-computable input maps to full volume and is reported through the
// status rather than an error.

use serde::{Deserialize, Serialize};

use crate::calibration::state::NormalizationBounds;

/// Volume reported for every non-computable input
pub const FALLBACK_VOLUME: f64 = 1.0;

/// How a volume was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeStatus {
    /// Regular rescaling within the calibration bounds
    Mapped,
    /// NaN input or unusable bounds
    Indeterminate,
    /// `+inf` input: calibration or session failed upstream
    UpstreamFailure,
}

/// Volume with its provenance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeReading {
    pub volume: f64,
    pub status: VolumeStatus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeMapper {
    bounds: Option<NormalizationBounds>,
}

impl VolumeMapper {
    pub fn new(bounds: Option<NormalizationBounds>) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> Option<NormalizationBounds> {
        self.bounds
    }

    /// Map a smoothed relax index to a volume
    pub fn map(&self, value: f64) -> VolumeReading {
        if value == f64::INFINITY {
            return VolumeReading {
                volume: FALLBACK_VOLUME,
                status: VolumeStatus::UpstreamFailure,
            };
        }
        if value.is_nan() {
            log::warn!("[VolumeMapper] Relax index not computable (NaN), volume forced to 1");
            return self.indeterminate();
        }
        let Some(bounds) = self.bounds.filter(NormalizationBounds::is_usable) else {
            log::warn!(
                "[VolumeMapper] Unusable normalisation bounds {:?}, volume forced to 1",
                self.bounds
            );
            return self.indeterminate();
        };

        let rescaled = ((value - bounds.min) / (bounds.max - bounds.min)).clamp(0.0, 1.0);
        VolumeReading {
            volume: 1.0 - rescaled,
            status: VolumeStatus::Mapped,
        }
    }

    fn indeterminate(&self) -> VolumeReading {
        VolumeReading {
            volume: FALLBACK_VOLUME,
            status: VolumeStatus::Indeterminate,
        }
    }
}
