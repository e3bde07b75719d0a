// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::common::bit;

/// Size in bytes of one view struct.
pub const VIEW_LEN: usize = 16;
/// Values of at most this many bytes are stored inside the view struct itself.
pub const VIEW_INLINE_LEN: usize = 12;
pub const VIEW_PREFIX_LEN: usize = 4;

const LENGTH_OFFSET: usize = 0;
const INLINE_OFFSET: usize = 4;
const BUFFER_INDEX_OFFSET: usize = 8;
const BUFFER_OFFSET_OFFSET: usize = 12;

/// The decoded form of one 16-byte view struct of a `BinaryView`/`Utf8View` column.
///
/// View struct layout (little-endian):
///   - length (4 bytes)
///   - if length <= 12: the value itself, zero padded to 12 bytes
///   - otherwise: first 4 bytes of the value, variadic buffer index (4 bytes) and offset into
///     that buffer (4 bytes)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum View {
    Inline {
        length: i32,
        data: [u8; VIEW_INLINE_LEN],
    },
    Ref {
        length: i32,
        prefix: [u8; VIEW_PREFIX_LEN],
        buffer_index: i32,
        offset: i32,
    },
}

impl View {
    /// The view of a null or empty value: all 16 bytes are zero.
    pub const NULL: [u8; VIEW_LEN] = [0; VIEW_LEN];

    /// Creates an inline view. `value` must be at most [`VIEW_INLINE_LEN`] bytes.
    pub fn inline(value: &[u8]) -> Self {
        debug_assert!(value.len() <= VIEW_INLINE_LEN);
        let mut data = [0u8; VIEW_INLINE_LEN];
        data[..value.len()].copy_from_slice(value);
        View::Inline {
            length: value.len() as i32,
            data,
        }
    }

    /// Creates a view referencing `value`, stored at `offset` of variadic buffer `buffer_index`.
    pub fn reference(value: &[u8], buffer_index: i32, offset: i32) -> Self {
        debug_assert!(value.len() > VIEW_INLINE_LEN);
        let mut prefix = [0u8; VIEW_PREFIX_LEN];
        prefix.copy_from_slice(&value[..VIEW_PREFIX_LEN]);
        View::Ref {
            length: value.len() as i32,
            prefix,
            buffer_index,
            offset,
        }
    }

    /// Decodes a view from the first 16 bytes of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let length = bit::read_i32_le(bytes, LENGTH_OFFSET);
        if length as usize <= VIEW_INLINE_LEN || length < 0 {
            let mut data = [0u8; VIEW_INLINE_LEN];
            data.copy_from_slice(&bytes[INLINE_OFFSET..VIEW_LEN]);
            View::Inline { length, data }
        } else {
            let mut prefix = [0u8; VIEW_PREFIX_LEN];
            prefix.copy_from_slice(&bytes[INLINE_OFFSET..INLINE_OFFSET + VIEW_PREFIX_LEN]);
            View::Ref {
                length,
                prefix,
                buffer_index: bit::read_i32_le(bytes, BUFFER_INDEX_OFFSET),
                offset: bit::read_i32_le(bytes, BUFFER_OFFSET_OFFSET),
            }
        }
    }

    /// Encodes this view into its 16-byte wire form.
    pub fn to_bytes(&self) -> [u8; VIEW_LEN] {
        let mut bytes = [0u8; VIEW_LEN];
        match self {
            View::Inline { length, data } => {
                bit::write_i32_le(&mut bytes, LENGTH_OFFSET, *length);
                bytes[INLINE_OFFSET..].copy_from_slice(data);
            }
            View::Ref {
                length,
                prefix,
                buffer_index,
                offset,
            } => {
                bit::write_i32_le(&mut bytes, LENGTH_OFFSET, *length);
                bytes[INLINE_OFFSET..BUFFER_INDEX_OFFSET].copy_from_slice(prefix);
                bit::write_i32_le(&mut bytes, BUFFER_INDEX_OFFSET, *buffer_index);
                bit::write_i32_le(&mut bytes, BUFFER_OFFSET_OFFSET, *offset);
            }
        }
        bytes
    }

    pub fn length(&self) -> i32 {
        match self {
            View::Inline { length, .. } | View::Ref { length, .. } => *length,
        }
    }

    /// Returns the inline payload, i.e. the first `length` bytes of the inline data.
    pub fn inline_data(&self) -> Option<&[u8]> {
        match self {
            View::Inline { length, data } => Some(&data[..(*length).clamp(0, 12) as usize]),
            View::Ref { .. } => None,
        }
    }
}

/// A dynamically typed value handed to column builders.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Utf8(String),
    Binary(Vec<u8>),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

macro_rules! impl_from_native {
    ($($native:ty => $variant:ident),*) => {
        $(
        impl From<$native> for Value {
            fn from(v: $native) -> Self {
                Value::$variant(v)
            }
        }
        )*
    };
}

impl_from_native! {
    bool => Boolean, i8 => Int8, i16 => Int16, i32 => Int32, i64 => Int64, u8 => UInt8,
    u16 => UInt16, u32 => UInt32, u64 => UInt64, f32 => Float32, f64 => Float64,
    String => Utf8, Vec<u8> => Binary, Vec<Value> => List
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Binary(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_view_layout() {
        let view = View::inline(b"hello");
        let bytes = view.to_bytes();
        assert_eq!(&bytes[0..4], &5i32.to_le_bytes());
        assert_eq!(&bytes[4..9], b"hello");
        assert!(bytes[9..].iter().all(|b| *b == 0));
        assert_eq!(View::from_bytes(&bytes), view);
        assert_eq!(view.inline_data(), Some(&b"hello"[..]));
    }

    #[test]
    fn reference_view_layout() {
        let value = b"this is longer than twelve bytes";
        let view = View::reference(value, 2, 48);
        let bytes = view.to_bytes();
        assert_eq!(&bytes[0..4], &(value.len() as i32).to_le_bytes());
        assert_eq!(&bytes[4..8], b"this");
        assert_eq!(&bytes[8..12], &2i32.to_le_bytes());
        assert_eq!(&bytes[12..16], &48i32.to_le_bytes());
        assert_eq!(View::from_bytes(&bytes), view);
        assert_eq!(view.inline_data(), None);
    }

    #[test]
    fn null_view_is_empty_inline() {
        let view = View::from_bytes(&View::NULL);
        assert_eq!(view.length(), 0);
        assert_eq!(view.inline_data(), Some(&[][..]));
        assert_eq!(View::inline(&[]).to_bytes(), View::NULL);
    }

    #[test]
    fn value_conversions() {
        assert_eq!(Value::from(3i8), Value::Int8(3));
        assert_eq!(Value::from("abc"), Value::Utf8("abc".to_string()));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(7u64)), Value::UInt64(7));
        assert_eq!(
            Value::from(vec![Value::from(1i32), Value::Null]),
            Value::List(vec![Value::Int32(1), Value::Null])
        );
        assert!(Value::Null.is_null());
    }
}
