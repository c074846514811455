//! msgpack-numpy array payloads.
//!
//! An array is packed as a msgpack map
//! `{b"nd": true, b"type": "<f4", b"kind": b"", b"shape": [..], b"data": <bin>}`,
//! the layout numpy peers produce and expect. Keys are written as `bin`;
//! both `bin` and `str` keys are accepted on read.

use crate::error::{WeightError, WeightResult};
use crate::tensor::{DataType, NumericArray, TensorData};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_bytes::{ByteBuf, Bytes};
use std::fmt;

const KEY_ND: &[u8] = b"nd";
const KEY_TYPE: &[u8] = b"type";
const KEY_KIND: &[u8] = b"kind";
const KEY_SHAPE: &[u8] = b"shape";
const KEY_DATA: &[u8] = b"data";

/// numpy type string for `dtype` in little-endian byte order.
pub fn descriptor(dtype: DataType) -> &'static str {
    match dtype {
        DataType::Float16 => "<f2",
        DataType::Float32 => "<f4",
        DataType::Float64 => "<f8",
        DataType::Uint8 => "|u1",
        DataType::Int8 => "|i1",
        DataType::Int16 => "<i2",
        DataType::Int32 => "<i4",
        DataType::Int64 => "<i8",
        DataType::Bool => "|b1",
    }
}

/// Parse a numpy type string into its element type and byte order.
///
/// Returns `(dtype, big_endian)`. A leading `<` or `|` is little-endian /
/// not applicable, `>` is big-endian and `=` is this host's order.
pub fn parse_descriptor(descr: &str) -> WeightResult<(DataType, bool)> {
    let (big_endian, code) = match descr.as_bytes().first() {
        Some(b'<') | Some(b'|') => (false, &descr[1..]),
        Some(b'>') => (true, &descr[1..]),
        Some(b'=') => (cfg!(target_endian = "big"), &descr[1..]),
        _ => (false, descr),
    };
    let dtype = match code {
        "f2" => DataType::Float16,
        "f4" => DataType::Float32,
        "f8" => DataType::Float64,
        "u1" => DataType::Uint8,
        "i1" => DataType::Int8,
        "i2" => DataType::Int16,
        "i4" => DataType::Int32,
        "i8" => DataType::Int64,
        "b1" => DataType::Bool,
        _ => {
            return Err(WeightError::unsupported_type(format!(
                "numpy type `{descr}` has no supported element type"
            )))
        }
    };
    Ok((dtype, big_endian))
}

struct PayloadRef<'a> {
    descr: &'static str,
    shape: &'a [usize],
    data: &'a [u8],
}

impl Serialize for PayloadRef<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(5))?;
        map.serialize_entry(Bytes::new(KEY_ND), &true)?;
        map.serialize_entry(Bytes::new(KEY_TYPE), self.descr)?;
        map.serialize_entry(Bytes::new(KEY_KIND), Bytes::new(b""))?;
        map.serialize_entry(Bytes::new(KEY_SHAPE), self.shape)?;
        map.serialize_entry(Bytes::new(KEY_DATA), Bytes::new(self.data))?;
        map.end()
    }
}

/// Pack an array into msgpack-numpy bytes.
pub fn encode(array: &NumericArray) -> WeightResult<Vec<u8>> {
    let data = array.data().to_le_bytes();
    let payload = PayloadRef {
        descr: descriptor(array.dtype()),
        shape: array.shape().dims(),
        data: &data,
    };
    Ok(rmp_serde::to_vec(&payload)?)
}

/// Unpack msgpack-numpy bytes into an array.
///
/// `nd: false` payloads (numpy scalars) decode to a zero-dimensional array.
pub fn decode(bytes: &[u8]) -> WeightResult<NumericArray> {
    let payload: Payload = rmp_serde::from_slice(bytes)?;
    let (dtype, big_endian) = parse_descriptor(&payload.descr)?;
    let data = TensorData::from_bytes(dtype, &payload.data, big_endian)?;

    let shape = if payload.is_array {
        let dims = payload
            .shape
            .ok_or_else(|| WeightError::decode("array payload has no `shape`"))?;
        dims.into_iter()
            .map(|d| {
                usize::try_from(d)
                    .map_err(|_| WeightError::decode(format!("dimension {d} does not fit in usize")))
            })
            .collect::<WeightResult<Vec<usize>>>()?
    } else {
        Vec::new()
    };

    let count = data.len();
    NumericArray::new(shape, data).map_err(|_| {
        WeightError::decode(format!("payload holds {count} {dtype} elements, inconsistent with its shape"))
    })
}

#[derive(Debug)]
struct Payload {
    is_array: bool,
    descr: String,
    shape: Option<Vec<u64>>,
    data: Vec<u8>,
}

enum Key {
    Nd,
    Type,
    Shape,
    Data,
    Other,
}

impl Key {
    fn from_bytes(key: &[u8]) -> Self {
        match key {
            KEY_ND => Key::Nd,
            KEY_TYPE => Key::Type,
            KEY_SHAPE => Key::Shape,
            KEY_DATA => Key::Data,
            _ => Key::Other,
        }
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = Key;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a str or bin map key")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Key, E> {
                Ok(Key::from_bytes(v.as_bytes()))
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Key, E> {
                Ok(Key::from_bytes(v))
            }
        }

        d.deserialize_any(KeyVisitor)
    }
}

/// A string that may arrive as msgpack `str` or `bin`.
struct Text(String);

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct TextVisitor;

        impl<'de> Visitor<'de> for TextVisitor {
            type Value = Text;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a str or utf-8 bin")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Text, E> {
                Ok(Text(v.to_owned()))
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Text, E> {
                std::str::from_utf8(v)
                    .map(|s| Text(s.to_owned()))
                    .map_err(|_| E::invalid_value(de::Unexpected::Bytes(v), &self))
            }
        }

        d.deserialize_any(TextVisitor)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct PayloadVisitor;

        impl<'de> Visitor<'de> for PayloadVisitor {
            type Value = Payload;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a msgpack-numpy map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Payload, A::Error> {
                let mut is_array = None;
                let mut descr = None;
                let mut shape = None;
                let mut data = None;
                while let Some(key) = map.next_key::<Key>()? {
                    match key {
                        Key::Nd => is_array = Some(map.next_value::<bool>()?),
                        Key::Type => descr = Some(map.next_value::<Text>()?.0),
                        Key::Shape => shape = Some(map.next_value::<Vec<u64>>()?),
                        Key::Data => data = Some(map.next_value::<ByteBuf>()?.into_vec()),
                        Key::Other => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                let missing = <A::Error as de::Error>::missing_field;
                Ok(Payload {
                    is_array: is_array.ok_or_else(|| missing("nd"))?,
                    descr: descr.ok_or_else(|| missing("type"))?,
                    shape,
                    data: data.ok_or_else(|| missing("data"))?,
                })
            }
        }

        d.deserialize_map(PayloadVisitor)
    }
}
