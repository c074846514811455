//! Per-subnet weight policy.
//!
//! [`WeightPolicy`] holds the hyper-parameters that govern how a raw score
//! vector is turned into an emitted weight set: how many non-zero weights a
//! submission must carry, the per-element ceiling, how much of the low tail
//! may be dropped and the integer width of the emitted values. It is
//! serializable via [`serde`] so it can be stored next to other node
//! settings as JSON.
//!
//! # Example
//!
//! ```rust
//! use ruvector_weights::config::WeightPolicy;
//!
//! let policy = WeightPolicy::default();
//! policy.validate().expect("default policy is valid");
//!
//! assert_eq!(policy.min_allowed_weights, 8);
//! assert_eq!(policy.max_emission_bits, 16);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::emit::{quantize_for_emit, U16_MAX};
use crate::error::{ConfigError, WeightResult};
use crate::process::{process_weights, Emission, EmissionValues, ProcessedWeights};

// ---------------------------------------------------------------------------
// WeightPolicy
// ---------------------------------------------------------------------------

/// Hyper-parameters for [`process_weights`] and emission.
///
/// Missing fields in a JSON document take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightPolicy {
    /// Minimum number of non-zero weights a submission must carry.
    ///
    /// Submissions with fewer are padded with a small floor weight on every
    /// uid. Default: **8**.
    pub min_allowed_weights: usize,

    /// Largest share any single uid may hold after normalization, in
    /// `(0, 1]`. Default: **0.1**.
    pub max_weight_limit: f64,

    /// Quantile of the non-zero weights below which weights are dropped, in
    /// `[0, 1]`. Never drops so many that fewer than
    /// `min_allowed_weights` remain. Default: **0.0**.
    pub exclude_quantile: f64,

    /// Width of emitted integer weights: 16 or 32. Default: **16**.
    pub max_emission_bits: u8,
}

impl Default for WeightPolicy {
    fn default() -> Self {
        WeightPolicy {
            min_allowed_weights: 8,
            max_weight_limit: 0.1,
            exclude_quantile: 0.0,
            max_emission_bits: 16,
        }
    }
}

impl WeightPolicy {
    /// Build a policy from the u16-scaled values stored on chain.
    ///
    /// `max_weight_limit` and `exclude_quantile` are fixed-point fractions
    /// of `65535`.
    pub fn from_chain_params(
        min_allowed_weights: u16,
        max_weight_limit: u16,
        exclude_quantile: u16,
    ) -> Result<Self, ConfigError> {
        let scale = f64::from(U16_MAX);
        let policy = WeightPolicy {
            min_allowed_weights: usize::from(min_allowed_weights),
            max_weight_limit: f64::from(max_weight_limit) / scale,
            exclude_quantile: f64::from(exclude_quantile) / scale,
            ..WeightPolicy::default()
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Check every field against its documented range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_weight_limit > 0.0 && self.max_weight_limit <= 1.0) {
            return Err(ConfigError::invalid_value(
                "max_weight_limit",
                format!("must be in (0, 1], got {}", self.max_weight_limit),
            ));
        }
        if !(0.0..=1.0).contains(&self.exclude_quantile) {
            return Err(ConfigError::invalid_value(
                "exclude_quantile",
                format!("must be in [0, 1], got {}", self.exclude_quantile),
            ));
        }
        if !matches!(self.max_emission_bits, 16 | 32) {
            return Err(ConfigError::invalid_value(
                "max_emission_bits",
                format!("must be 16 or 32, got {}", self.max_emission_bits),
            ));
        }
        Ok(())
    }

    /// Load and validate a policy from a JSON file.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let policy: WeightPolicy = serde_json::from_str(&contents).map_err(|source| {
            ConfigError::ParseError { path: path.to_path_buf(), source }
        })?;
        policy.validate()?;
        Ok(policy)
    }

    /// Write the policy as pretty-printed JSON, creating parent directories.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::FileRead {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid_value("(serialization)", e.to_string()))?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Run [`process_weights`] under this policy.
    pub fn process(&self, n: i64, uids: &[i64], weights: &[f64]) -> WeightResult<ProcessedWeights> {
        process_weights(n, uids, weights, self)
    }

    /// Quantize processed weights at [`max_emission_bits`](Self::max_emission_bits).
    pub fn emit(&self, processed: &ProcessedWeights) -> WeightResult<Emission> {
        self.validate()?;
        let (uids, values) = if self.max_emission_bits == 32 {
            let (uids, values) = quantize_for_emit::<u32>(&processed.uids, &processed.weights)?;
            (uids, EmissionValues::U32(values))
        } else {
            let (uids, values) = quantize_for_emit::<u16>(&processed.uids, &processed.weights)?;
            (uids, EmissionValues::U16(values))
        };
        Ok(Emission { uids, values })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
