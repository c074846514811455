//! Self-describing tensor envelope.
//!
//! A [`TensorEnvelope`] carries three fields: the canonical `dtype` name,
//! the `shape`, and a base64 `buffer` holding a msgpack-numpy payload
//! (see [`ndmsg`]). The envelope is plain serde data and travels as JSON:
//!
//! ```json
//! {"buffer": "haJuZMOk...", "dtype": "float32", "shape": [2, 3]}
//! ```
//!
//! Rank-0 arrays are announced with shape `[0]`; on decode a declared
//! `[0]` keeps the payload's own (empty or scalar) shape.

pub mod ndmsg;

use crate::error::{WeightError, WeightResult};
use crate::tensor::{DataType, Element, NumericArray, TensorShape};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::trace;

// ---------------------------------------------------------------------------
// Coercion helpers
// ---------------------------------------------------------------------------

/// Raw forms accepted for an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DTypeSpec<'a> {
    /// An already-typed element tag.
    Native(DataType),
    /// A numpy type string such as `"<f4"` or `"|b1"`.
    Descriptor(&'a str),
    /// A canonical name such as `"float32"`.
    Name(&'a str),
    /// No type given.
    Absent,
}

impl DTypeSpec<'_> {
    /// The element tag of a Rust type.
    pub fn of<T: Element>() -> Self {
        DTypeSpec::Native(T::DTYPE)
    }
}

impl From<DataType> for DTypeSpec<'_> {
    fn from(dtype: DataType) -> Self {
        DTypeSpec::Native(dtype)
    }
}

impl<'a> From<&'a str> for DTypeSpec<'a> {
    fn from(name: &'a str) -> Self {
        DTypeSpec::Name(name)
    }
}

impl<'a> From<Option<&'a str>> for DTypeSpec<'a> {
    fn from(name: Option<&'a str>) -> Self {
        name.map_or(DTypeSpec::Absent, DTypeSpec::Name)
    }
}

/// Coerce a raw element type into its canonical name.
///
/// `Absent` and the empty string yield `Ok(None)`. Names outside the
/// supported enumeration and unknown numpy descriptors fail with
/// [`WeightError::UnsupportedType`].
pub fn cast_dtype<'a>(raw: impl Into<DTypeSpec<'a>>) -> WeightResult<Option<&'static str>> {
    match raw.into() {
        DTypeSpec::Native(dtype) => Ok(Some(dtype.name())),
        DTypeSpec::Descriptor(descr) => ndmsg::parse_descriptor(descr).map(|(dt, _)| Some(dt.name())),
        DTypeSpec::Name("") | DTypeSpec::Absent => Ok(None),
        DTypeSpec::Name(name) => DataType::from_name(name).map(|dt| Some(dt.name())),
    }
}

/// Raw forms accepted for a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeSpec<'a> {
    /// A list of dimensions; every entry must be non-negative.
    Dims(&'a [i64]),
    /// A string of the form `"[d0, d1, ...]"`.
    Text(&'a str),
    /// No shape given.
    Absent,
}

impl<'a> From<&'a [i64]> for ShapeSpec<'a> {
    fn from(dims: &'a [i64]) -> Self {
        ShapeSpec::Dims(dims)
    }
}

impl<'a, const N: usize> From<&'a [i64; N]> for ShapeSpec<'a> {
    fn from(dims: &'a [i64; N]) -> Self {
        ShapeSpec::Dims(dims)
    }
}

impl<'a> From<&'a str> for ShapeSpec<'a> {
    fn from(text: &'a str) -> Self {
        ShapeSpec::Text(text)
    }
}

/// Coerce a raw shape into a list of dimensions.
///
/// `Absent` yields an empty list. Negative dimensions and non-integer
/// tokens fail with [`WeightError::InvalidArgument`].
pub fn cast_shape<'a>(raw: impl Into<ShapeSpec<'a>>) -> WeightResult<Vec<usize>> {
    match raw.into() {
        ShapeSpec::Dims(dims) => dims
            .iter()
            .map(|&d| {
                usize::try_from(d).map_err(|_| {
                    WeightError::invalid_argument("shape", format!("dimension {d} is negative"))
                })
            })
            .collect(),
        ShapeSpec::Text(text) => parse_shape_text(text),
        ShapeSpec::Absent => Ok(Vec::new()),
    }
}

fn parse_shape_text(text: &str) -> WeightResult<Vec<usize>> {
    let inner = text
        .split_once('[')
        .and_then(|(_, rest)| rest.split_once(']'))
        .map(|(inner, _)| inner)
        .ok_or_else(|| {
            WeightError::invalid_argument("shape", format!("`{text}` is not of the form \"[d0, d1, ...]\""))
        })?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|tok| {
            let tok = tok.trim();
            tok.parse::<usize>().map_err(|_| {
                WeightError::invalid_argument(
                    "shape",
                    format!("`{tok}` in `{text}` is not a non-negative integer"),
                )
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// TensorEnvelope
// ---------------------------------------------------------------------------

/// Wire form of a [`NumericArray`].
///
/// Fields are validated at construction (including JSON parsing) and are
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope")]
pub struct TensorEnvelope {
    buffer: String,
    dtype: DataType,
    shape: Vec<usize>,
}

#[derive(Deserialize)]
struct RawEnvelope {
    buffer: String,
    #[serde(default)]
    dtype: Option<String>,
    #[serde(default)]
    shape: Option<RawShape>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawShape {
    Dims(Vec<i64>),
    Text(String),
}

impl TryFrom<RawEnvelope> for TensorEnvelope {
    type Error = WeightError;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        let shape = match &raw.shape {
            Some(RawShape::Dims(dims)) => ShapeSpec::Dims(dims.as_slice()),
            Some(RawShape::Text(text)) => ShapeSpec::Text(text.as_str()),
            None => ShapeSpec::Absent,
        };
        TensorEnvelope::new(raw.buffer, raw.dtype.as_deref(), shape)
    }
}

impl TensorEnvelope {
    /// Build an envelope from raw parts, running the dtype and shape
    /// coercions.
    pub fn new<'a>(
        buffer: impl Into<String>,
        dtype: impl Into<DTypeSpec<'a>>,
        shape: impl Into<ShapeSpec<'a>>,
    ) -> WeightResult<Self> {
        let name = cast_dtype(dtype)?
            .ok_or_else(|| WeightError::invalid_argument("dtype", "an element type is required"))?;
        Ok(Self {
            buffer: buffer.into(),
            dtype: DataType::from_name(name)?,
            shape: cast_shape(shape)?,
        })
    }

    /// Serialize an array into an envelope.
    pub fn from_array(array: &NumericArray) -> WeightResult<Self> {
        serialize(array)
    }

    /// Decode the envelope back into an array.
    pub fn to_array(&self) -> WeightResult<NumericArray> {
        deserialize(self)
    }

    /// Decoded elements widened to `f64`.
    pub fn to_f64_vec(&self) -> WeightResult<Vec<f64>> {
        Ok(self.to_array()?.to_f64_vec())
    }

    /// Base64 msgpack-numpy payload.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Declared element type.
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Declared shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> WeightResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate a JSON envelope.
    pub fn from_json(json: &str) -> WeightResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Serialize an array into a self-describing envelope.
///
/// Output is deterministic for identical input.
pub fn serialize(array: &NumericArray) -> WeightResult<TensorEnvelope> {
    let payload = ndmsg::encode(array)?;
    let buffer = STANDARD.encode(&payload);
    let shape = if array.ndim() == 0 { vec![0] } else { array.shape().dims().to_vec() };
    trace!(dtype = %array.dtype(), elements = array.len(), bytes = payload.len(), "serialized tensor");
    Ok(TensorEnvelope { buffer, dtype: array.dtype(), shape })
}

/// Decode an envelope into an array of its declared dtype and shape.
///
/// # Errors
///
/// [`WeightError::Decode`] if the base64 or msgpack layer is malformed, or
/// the decoded element count disagrees with the declared shape. A declared
/// shape of `[0]` accepts a payload of zero or one elements as-is.
pub fn deserialize(envelope: &TensorEnvelope) -> WeightResult<NumericArray> {
    let bytes = STANDARD.decode(envelope.buffer.as_bytes())?;
    let decoded = ndmsg::decode(&bytes)?;

    let declared = TensorShape::from_slice(&envelope.shape);
    let shaped = if declared.is_flat_empty() {
        if decoded.len() > 1 {
            return Err(WeightError::decode(format!(
                "shape [0] declares an empty or scalar tensor but the payload holds {} elements",
                decoded.len()
            )));
        }
        decoded
    } else {
        if declared.numel() != decoded.len() {
            return Err(WeightError::decode(format!(
                "shape {declared} holds {} elements but the payload holds {}",
                declared.numel(),
                decoded.len()
            )));
        }
        decoded.reshape(declared)?
    };

    trace!(dtype = %envelope.dtype, elements = shaped.len(), "deserialized tensor");
    Ok(shaped.cast(envelope.dtype))
}
