//! Typed n-dimensional arrays.
//!
//! [`NumericArray`] is the common currency between the weight pipeline and
//! the tensor codec: an element type tag, a row-major shape and a contiguous
//! buffer whose length always equals the product of the shape. Arrays are
//! value objects; every transform returns a fresh array.

use crate::error::{WeightError, WeightResult};
use half::f16;
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Row-major dimensions of a [`NumericArray`].
///
/// An empty dimension list is rank 0 and holds exactly one element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorShape(Vec<usize>);

impl TensorShape {
    /// Wrap owned dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Self(dims)
    }

    /// Copy borrowed dimensions.
    pub fn from_slice(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }

    /// Rank-0 shape.
    pub fn scalar() -> Self {
        Self(Vec::new())
    }

    /// Rank.
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Extent along each axis, outermost first.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Element count implied by the dimensions (1 for rank 0).
    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    /// Extent of `axis`, if the shape has that many axes.
    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.0.get(axis).copied()
    }

    /// `true` for the `[0]` shape used on the wire for empty and scalar arrays.
    pub fn is_flat_empty(&self) -> bool {
        self.0.as_slice() == [0]
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.0.iter().map(usize::to_string).collect();
        write!(f, "[{}]", dims.join(", "))
    }
}

impl From<Vec<usize>> for TensorShape {
    fn from(dims: Vec<usize>) -> Self {
        Self(dims)
    }
}

impl From<&[usize]> for TensorShape {
    fn from(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for TensorShape {
    fn from(dims: [usize; N]) -> Self {
        Self(dims.to_vec())
    }
}

/// Data type for tensor elements.
///
/// The serde representation is the canonical lowercase name (`"float32"`,
/// `"uint8"`, `"bool"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 16-bit IEEE 754 half precision
    Float16,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// 8-bit unsigned integer
    Uint8,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// Boolean, stored as one byte
    Bool,
}

impl DataType {
    /// Every supported element type, in wire-enumeration order.
    pub const ALL: [DataType; 9] = [
        DataType::Float16,
        DataType::Float32,
        DataType::Float64,
        DataType::Uint8,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::Bool,
    ];

    /// Get the size of this data type in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::Float16 => 2,
            DataType::Float32 => 4,
            DataType::Float64 => 8,
            DataType::Uint8 => 1,
            DataType::Int8 => 1,
            DataType::Int16 => 2,
            DataType::Int32 => 4,
            DataType::Int64 => 8,
            DataType::Bool => 1,
        }
    }

    /// Canonical name used in tensor envelopes.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Float16 => "float16",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Uint8 => "uint8",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Bool => "bool",
        }
    }

    /// Look up a data type by its canonical name.
    pub fn from_name(name: &str) -> WeightResult<Self> {
        DataType::ALL
            .iter()
            .copied()
            .find(|dt| dt.name() == name)
            .ok_or_else(|| {
                WeightError::unsupported_type(format!(
                    "`{name}` is not one of {:?}",
                    DataType::ALL.map(|dt| dt.name())
                ))
            })
    }

    /// `true` for the floating point types.
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float16 | DataType::Float32 | DataType::Float64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = WeightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::from_name(s)
    }
}

/// Row-major element storage, one variant per [`DataType`].
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    /// Half precision floats
    Float16(Vec<f16>),
    /// Single precision floats
    Float32(Vec<f32>),
    /// Double precision floats
    Float64(Vec<f64>),
    /// Unsigned bytes
    Uint8(Vec<u8>),
    /// Signed bytes
    Int8(Vec<i8>),
    /// 16-bit integers
    Int16(Vec<i16>),
    /// 32-bit integers
    Int32(Vec<i32>),
    /// 64-bit integers
    Int64(Vec<i64>),
    /// Booleans
    Bool(Vec<bool>),
}

/// Expands `$num` for every numeric variant and `$boolean` for the bool variant.
macro_rules! match_data {
    ($data:expr, $v:ident => $num:expr, $b:ident => $boolean:expr) => {
        match $data {
            TensorData::Float16($v) => $num,
            TensorData::Float32($v) => $num,
            TensorData::Float64($v) => $num,
            TensorData::Uint8($v) => $num,
            TensorData::Int8($v) => $num,
            TensorData::Int16($v) => $num,
            TensorData::Int32($v) => $num,
            TensorData::Int64($v) => $num,
            TensorData::Bool($b) => $boolean,
        }
    };
}

macro_rules! read_elements {
    ($bytes:expr, $big_endian:expr, $t:ty, $width:literal) => {
        $bytes
            .chunks_exact($width)
            .map(|chunk| {
                let mut raw = [0u8; $width];
                raw.copy_from_slice(chunk);
                if $big_endian {
                    <$t>::from_be_bytes(raw)
                } else {
                    <$t>::from_le_bytes(raw)
                }
            })
            .collect::<Vec<$t>>()
    };
}

/// Widened view of an element buffer used for casting.
enum Lanes {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Bool(Vec<bool>),
}

fn build<T>(
    lanes: &Lanes,
    from_float: impl Fn(f64) -> T,
    from_int: impl Fn(i64) -> T,
    from_bool: impl Fn(bool) -> T,
) -> Vec<T> {
    match lanes {
        Lanes::Float(v) => v.iter().map(|&x| from_float(x)).collect(),
        Lanes::Int(v) => v.iter().map(|&x| from_int(x)).collect(),
        Lanes::Bool(v) => v.iter().map(|&x| from_bool(x)).collect(),
    }
}

impl TensorData {
    /// A zero-filled buffer of `len` elements.
    pub fn zeros(dtype: DataType, len: usize) -> Self {
        match dtype {
            DataType::Float16 => TensorData::Float16(vec![f16::ZERO; len]),
            DataType::Float32 => TensorData::Float32(vec![0.0; len]),
            DataType::Float64 => TensorData::Float64(vec![0.0; len]),
            DataType::Uint8 => TensorData::Uint8(vec![0; len]),
            DataType::Int8 => TensorData::Int8(vec![0; len]),
            DataType::Int16 => TensorData::Int16(vec![0; len]),
            DataType::Int32 => TensorData::Int32(vec![0; len]),
            DataType::Int64 => TensorData::Int64(vec![0; len]),
            DataType::Bool => TensorData::Bool(vec![false; len]),
        }
    }

    /// Element type of this buffer.
    pub fn dtype(&self) -> DataType {
        match self {
            TensorData::Float16(_) => DataType::Float16,
            TensorData::Float32(_) => DataType::Float32,
            TensorData::Float64(_) => DataType::Float64,
            TensorData::Uint8(_) => DataType::Uint8,
            TensorData::Int8(_) => DataType::Int8,
            TensorData::Int16(_) => DataType::Int16,
            TensorData::Int32(_) => DataType::Int32,
            TensorData::Int64(_) => DataType::Int64,
            TensorData::Bool(_) => DataType::Bool,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match_data!(self, v => v.len(), b => b.len())
    }

    /// `true` if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw little-endian element bytes; booleans are one byte each (`0`/`1`).
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match_data!(
            self,
            v => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            b => b.iter().map(|&x| u8::from(x)).collect()
        )
    }

    /// Rebuild a buffer from raw element bytes.
    ///
    /// Fails with [`WeightError::Decode`] if the byte count is not a multiple
    /// of the element width.
    pub fn from_bytes(dtype: DataType, bytes: &[u8], big_endian: bool) -> WeightResult<Self> {
        let width = dtype.size_bytes();
        if bytes.len() % width != 0 {
            return Err(WeightError::decode(format!(
                "{} payload bytes is not a multiple of the {dtype} width ({width})",
                bytes.len()
            )));
        }
        let data = match dtype {
            DataType::Float16 => TensorData::Float16(read_elements!(bytes, big_endian, f16, 2)),
            DataType::Float32 => TensorData::Float32(read_elements!(bytes, big_endian, f32, 4)),
            DataType::Float64 => TensorData::Float64(read_elements!(bytes, big_endian, f64, 8)),
            DataType::Uint8 => TensorData::Uint8(bytes.to_vec()),
            DataType::Int8 => TensorData::Int8(bytes.iter().map(|&b| b as i8).collect()),
            DataType::Int16 => TensorData::Int16(read_elements!(bytes, big_endian, i16, 2)),
            DataType::Int32 => TensorData::Int32(read_elements!(bytes, big_endian, i32, 4)),
            DataType::Int64 => TensorData::Int64(read_elements!(bytes, big_endian, i64, 8)),
            DataType::Bool => TensorData::Bool(bytes.iter().map(|&b| b != 0).collect()),
        };
        Ok(data)
    }

    fn lanes(&self) -> Lanes {
        match self {
            TensorData::Float16(v) => Lanes::Float(v.iter().map(|x| x.to_f64()).collect()),
            TensorData::Float32(v) => Lanes::Float(v.iter().map(|&x| f64::from(x)).collect()),
            TensorData::Float64(v) => Lanes::Float(v.clone()),
            TensorData::Uint8(v) => Lanes::Int(v.iter().map(|&x| i64::from(x)).collect()),
            TensorData::Int8(v) => Lanes::Int(v.iter().map(|&x| i64::from(x)).collect()),
            TensorData::Int16(v) => Lanes::Int(v.iter().map(|&x| i64::from(x)).collect()),
            TensorData::Int32(v) => Lanes::Int(v.iter().map(|&x| i64::from(x)).collect()),
            TensorData::Int64(v) => Lanes::Int(v.clone()),
            TensorData::Bool(v) => Lanes::Bool(v.clone()),
        }
    }

    /// Convert every element to `dtype`.
    ///
    /// Float to integer truncates toward zero and saturates at the target
    /// bounds; integer narrowing wraps; anything to bool is `!= 0`.
    pub fn cast(&self, dtype: DataType) -> TensorData {
        if self.dtype() == dtype {
            return self.clone();
        }
        let lanes = self.lanes();
        match dtype {
            DataType::Float16 => TensorData::Float16(build(
                &lanes,
                f16::from_f64,
                |x| f16::from_f64(x as f64),
                |x| if x { f16::ONE } else { f16::ZERO },
            )),
            DataType::Float32 => {
                TensorData::Float32(build(&lanes, |x| x as f32, |x| x as f32, |x| f32::from(u8::from(x))))
            }
            DataType::Float64 => {
                TensorData::Float64(build(&lanes, |x| x, |x| x as f64, |x| f64::from(u8::from(x))))
            }
            DataType::Uint8 => TensorData::Uint8(build(&lanes, |x| x as u8, |x| x as u8, u8::from)),
            DataType::Int8 => TensorData::Int8(build(&lanes, |x| x as i8, |x| x as i8, |x| i8::from(x))),
            DataType::Int16 => {
                TensorData::Int16(build(&lanes, |x| x as i16, |x| x as i16, |x| i16::from(x)))
            }
            DataType::Int32 => {
                TensorData::Int32(build(&lanes, |x| x as i32, |x| x as i32, |x| i32::from(x)))
            }
            DataType::Int64 => TensorData::Int64(build(&lanes, |x| x as i64, |x| x, |x| i64::from(x))),
            DataType::Bool => TensorData::Bool(build(&lanes, |x| x != 0.0, |x| x != 0, |x| x)),
        }
    }

    /// Every element widened to `f64` (booleans become `0.0`/`1.0`).
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self.lanes() {
            Lanes::Float(v) => v,
            Lanes::Int(v) => v.into_iter().map(|x| x as f64).collect(),
            Lanes::Bool(v) => v.into_iter().map(|x| f64::from(u8::from(x))).collect(),
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Rust element types that map onto a [`DataType`].
///
/// Sealed: implemented for `f16`, `f32`, `f64`, `u8`, `i8`, `i16`, `i32`,
/// `i64` and `bool` only.
pub trait Element: Copy + PartialEq + fmt::Debug + sealed::Sealed {
    /// Tag of this element type.
    const DTYPE: DataType;

    /// Wrap an owned buffer.
    fn wrap(values: Vec<Self>) -> TensorData;

    /// Borrow the buffer if it holds this element type.
    fn view(data: &TensorData) -> Option<&[Self]>;
}

macro_rules! impl_element {
    ($t:ty, $variant:ident) => {
        impl sealed::Sealed for $t {}

        impl Element for $t {
            const DTYPE: DataType = DataType::$variant;

            fn wrap(values: Vec<Self>) -> TensorData {
                TensorData::$variant(values)
            }

            fn view(data: &TensorData) -> Option<&[Self]> {
                match data {
                    TensorData::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_element!(f16, Float16);
impl_element!(f32, Float32);
impl_element!(f64, Float64);
impl_element!(u8, Uint8);
impl_element!(i8, Int8);
impl_element!(i16, Int16);
impl_element!(i32, Int32);
impl_element!(i64, Int64);
impl_element!(bool, Bool);

/// An n-dimensional array of a fixed element type.
///
/// Invariant: `data.len() == shape.numel()`. Fields are private and there
/// are no in-place mutators.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    shape: TensorShape,
    data: TensorData,
}

impl NumericArray {
    /// Create an array, checking that the buffer length matches the shape.
    pub fn new(shape: impl Into<TensorShape>, data: TensorData) -> WeightResult<Self> {
        let shape = shape.into();
        if shape.numel() != data.len() {
            return Err(WeightError::invalid_argument(
                "shape",
                format!("{shape} holds {} elements but the buffer has {}", shape.numel(), data.len()),
            ));
        }
        Ok(Self { shape, data })
    }

    /// Create an array from a typed vector.
    pub fn from_vec<T: Element>(shape: impl Into<TensorShape>, values: Vec<T>) -> WeightResult<Self> {
        Self::new(shape, T::wrap(values))
    }

    /// A one-dimensional array over a copy of `values`.
    pub fn from_slice<T: Element>(values: &[T]) -> Self {
        Self { shape: TensorShape::new(vec![values.len()]), data: T::wrap(values.to_vec()) }
    }

    /// A zero-dimensional array holding one element.
    pub fn scalar<T: Element>(value: T) -> Self {
        Self { shape: TensorShape::scalar(), data: T::wrap(vec![value]) }
    }

    /// A zero-filled array.
    pub fn zeros(dtype: DataType, shape: impl Into<TensorShape>) -> Self {
        let shape = shape.into();
        let data = TensorData::zeros(dtype, shape.numel());
        Self { shape, data }
    }

    /// The canonical empty array, shape `[0]`.
    pub fn empty(dtype: DataType) -> Self {
        Self::zeros(dtype, [0])
    }

    /// Element type.
    pub fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    /// Shape.
    pub fn shape(&self) -> &TensorShape {
        &self.shape
    }

    /// Element buffer.
    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    /// Borrow the elements if the array holds `T`.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::view(&self.data)
    }

    /// Elements widened to `f64`, in row-major order.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.data.to_f64_vec()
    }

    /// Same shape, elements converted to `dtype`.
    pub fn cast(&self, dtype: DataType) -> NumericArray {
        Self { shape: self.shape.clone(), data: self.data.cast(dtype) }
    }

    /// Same elements viewed under a new shape with the same element count.
    pub fn reshape(&self, shape: impl Into<TensorShape>) -> WeightResult<NumericArray> {
        Self::new(shape, self.data.clone())
    }

    /// Split into shape and buffer.
    pub fn into_parts(self) -> (TensorShape, TensorData) {
        (self.shape, self.data)
    }

    /// Copy into an `ndarray` array of element type `T`.
    pub fn to_ndarray<T: Element>(&self) -> WeightResult<ArrayD<T>> {
        let values = T::view(&self.data).ok_or_else(|| {
            WeightError::unsupported_type(format!(
                "array holds {} elements, requested {}",
                self.dtype(),
                T::DTYPE
            ))
        })?;
        ArrayD::from_shape_vec(IxDyn(self.shape.dims()), values.to_vec())
            .map_err(|e| WeightError::invalid_argument("shape", e.to_string()))
    }
}

impl<T: Element> From<ArrayD<T>> for NumericArray {
    fn from(array: ArrayD<T>) -> Self {
        let shape = TensorShape::from_slice(array.shape());
        let values: Vec<T> = array.iter().copied().collect();
        Self { shape, data: T::wrap(values) }
    }
}

impl<T: Element> From<Vec<T>> for NumericArray {
    fn from(values: Vec<T>) -> Self {
        Self { shape: TensorShape::new(vec![values.len()]), data: T::wrap(values) }
    }
}
