//! # RuVector Weights
//!
//! Conversion of sparse, real-valued weight and bond assignments into dense,
//! bounded, deterministic vectors for consensus submission, plus a
//! self-describing envelope for shipping numeric arrays between components.
//!
//! ## Architecture
//!
//! ```text
//! (uids, values) ──► subnet::filter_available ──┐   (root weights only)
//!        │                                      │
//!        └──────────────► scatter::scatter ◄────┘
//!                               │
//!                 ┌─────────────┼───────────────────┐
//!                 ▼             ▼                   ▼
//!          bonds (i64)   normalize::normalize   process::process_weights
//!                               │                   │  (WeightPolicy)
//!                               │        normalize::normalize_max_weight
//!                               │                   │
//!                               └──────► emit::quantize_for_emit ──► u16 / u32
//!
//! NumericArray ◄──► codec::serialize / deserialize ◄──► TensorEnvelope (JSON)
//! ```
//!
//! Every operation is a pure function over borrowed input that returns a
//! freshly allocated output, so calls can run concurrently without locks.
//!
//! ## Quick Start
//!
//! ```rust
//! use ruvector_weights::prelude::*;
//!
//! let dense = convert_weight_uids_and_vals_to_tensor(3, &[0, 1, 2], &[15.0, 5.0, 80.0]).unwrap();
//! assert!((dense[2] - 0.8).abs() < 1e-12);
//!
//! let (uids, values) = convert_values_and_ids_for_emit(&[0, 1], &[1.0, 1.0]).unwrap();
//! assert_eq!(uids, vec![0, 1]);
//! assert_eq!(values, vec![32768, 32768]);
//!
//! let array = NumericArray::from_vec([2, 2], vec![1.0f32, 2.0, 3.0, 4.0]).unwrap();
//! let envelope = serialize(&array).unwrap();
//! assert_eq!(deserialize(&envelope).unwrap(), array);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod config;
pub mod convert;
pub mod emit;
pub mod error;
pub mod normalize;
pub mod process;
pub mod scatter;
pub mod subnet;
pub mod tensor;

// Convenient re-exports at the crate root.
pub use codec::{cast_dtype, cast_shape, deserialize, serialize, DTypeSpec, ShapeSpec, TensorEnvelope};
pub use config::WeightPolicy;
pub use convert::{
    convert_bond_uids_and_vals_to_tensor, convert_root_weight_uids_and_vals_to_tensor,
    convert_weight_uids_and_vals_to_tensor,
};
pub use emit::{convert_values_and_ids_for_emit, quantize_for_emit, EmissionWidth, U16_MAX, U32_MAX};
pub use error::{ConfigError, WeightError, WeightResult};
pub use normalize::{normalize, normalize_max_weight};
pub use process::{process_weights, Emission, EmissionValues, ProcessedWeights};
pub use scatter::scatter;
pub use subnet::{filter_available, FilteredWeights};
pub use tensor::{DataType, Element, NumericArray, TensorData, TensorShape};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::codec::{deserialize, serialize, TensorEnvelope};
    pub use crate::config::WeightPolicy;
    pub use crate::convert::{
        convert_bond_uids_and_vals_to_tensor, convert_root_weight_uids_and_vals_to_tensor,
        convert_weight_uids_and_vals_to_tensor,
    };
    pub use crate::emit::convert_values_and_ids_for_emit;
    pub use crate::error::{WeightError, WeightResult};
    pub use crate::normalize::normalize_max_weight;
    pub use crate::process::process_weights;
    pub use crate::tensor::{DataType, NumericArray};
}
