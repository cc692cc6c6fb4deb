// CalibrationParameters - outcome of one calibration run
//
// This record is created once per calibration and only read afterwards. A
// failed calibration still produces a record: the alpha band and bounds are
// absent, the RMS histories hold the single `+inf` sentinel and `error`
// says why. Sessions built from such a record report full volume.
//
// JSON has no infinity or NaN, so the histories go through `non_finite`:
// non-finite entries are written as strings and read back unchanged.

use serde::{Deserialize, Serialize};

use crate::analysis::band::FrequencyBand;
use crate::analysis::stats::finite_mean;
use crate::error::{CalibrationError, ErrorCode};

/// Status code of a successful calibration
pub const CALIBRATION_OK: i32 = 0;

/// Range used to rescale the smoothed relaxation index into a volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationBounds {
    pub min: f64,
    pub max: f64,
}

impl NormalizationBounds {
    /// Bounds from a smoothed calibration RMS history
    ///
    /// `min = min(history) * min_factor`, `max = mean(history) * max_factor`,
    /// both over finite entries only.
    ///
    /// # Returns
    /// `None` when the history holds no finite value
    pub fn from_history(smoothed: &[f64], min_factor: f64, max_factor: f64) -> Option<Self> {
        let lowest = smoothed
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .min_by(|a, b| a.total_cmp(b))?;
        let average = finite_mean(smoothed.iter().copied());
        Some(Self {
            min: lowest * min_factor,
            max: average * max_factor,
        })
    }

    /// Non-degenerate, finite range
    pub fn is_usable(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.max > self.min
    }
}

/// Calibration output consumed by every session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParameters {
    /// Personalised alpha band, absent on failure
    pub alpha_band: Option<FrequencyBand>,
    /// Combined RMS per one-second window
    #[serde(with = "non_finite")]
    pub raw_rms_history: Vec<f64>,
    /// Trailing average of `raw_rms_history`, same length
    #[serde(with = "non_finite")]
    pub smoothed_rms_history: Vec<f64>,
    /// Peak frequencies accepted while detecting the alpha band
    #[serde(default, with = "non_finite")]
    pub frequency_history: Vec<f64>,
    /// Volume mapping range, absent on failure
    pub bounds: Option<NormalizationBounds>,
    /// Per-channel mean normalised quality of the recording
    #[serde(default)]
    pub mean_qualities: Vec<f64>,
    /// Packets that passed selection
    #[serde(default)]
    pub kept_packets: Vec<usize>,
    /// Number of channels the calibration was computed on
    pub channel_count: usize,
    /// Failure reason, absent on success
    #[serde(default)]
    pub error: Option<CalibrationError>,
}

impl CalibrationParameters {
    /// Sentinel parameters for a failed run
    pub fn failed(error: CalibrationError, channel_count: usize) -> Self {
        let mean_qualities = match &error {
            CalibrationError::InsufficientQuality { mean_qualities } => mean_qualities.clone(),
            CalibrationError::InvalidInput { .. } => Vec::new(),
        };
        Self {
            alpha_band: None,
            raw_rms_history: vec![f64::INFINITY],
            smoothed_rms_history: vec![f64::INFINITY],
            frequency_history: Vec::new(),
            bounds: None,
            mean_qualities,
            kept_packets: Vec::new(),
            channel_count,
            error: Some(error),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// `0` on success, otherwise the calibration error code (`-1`, `-2`)
    pub fn status_code(&self) -> i32 {
        self.error.as_ref().map_or(CALIBRATION_OK, |e| e.code())
    }

    /// Split into the success value or the failure reason
    pub fn into_result(self) -> Result<Self, CalibrationError> {
        match self.error.clone() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

/// Float list encoding that keeps `inf`, `-inf` and `NaN`
///
/// Finite values stay JSON numbers. Non-finite values are written as
/// `"inf"`, `"-inf"` or `"NaN"`, and `null` reads back as NaN.
mod non_finite {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|&v| {
            if v.is_finite() {
                Entry::Number(v)
            } else {
                Entry::Text(v.to_string())
            }
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Vec::<Option<Entry>>::deserialize(deserializer)?
            .into_iter()
            .map(|entry| match entry {
                Some(Entry::Number(v)) => Ok(v),
                Some(Entry::Text(text)) => text
                    .parse::<f64>()
                    .map_err(|_| D::Error::custom(format!("invalid float entry {:?}", text))),
                None => Ok(f64::NAN),
            })
            .collect()
    }
}
