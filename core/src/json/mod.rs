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

//! The Arrow JSON integration format for column chunks.
//!
//! A column is one JSON object:
//!
//! ```text
//! { "name": "col", "count": 3, "VALIDITY": [1, 0, 1], "DATA": [...], "children": [...] }
//! ```
//!
//! 64-bit integers and decimals are written as strings so that no JSON parser loses precision
//! on them. The reader accepts both numbers and strings for every integer.

mod reader;
mod writer;

pub use reader::*;
pub use writer::*;

use arrow_buffer::{i256, ArrowNativeType};
use serde_json::{Map, Value as JsonValue};

use crate::errors::{decode_err, ViewResult};

pub const NAME: &str = "name";
pub const COUNT: &str = "count";
pub const COLUMNS: &str = "columns";
pub const CHILDREN: &str = "children";
pub const VALIDITY: &str = "VALIDITY";
pub const DATA: &str = "DATA";
pub const OFFSET: &str = "OFFSET";
pub const SIZE: &str = "SIZE";
pub const TYPE_ID: &str = "TYPE_ID";
pub const VIEWS: &str = "VIEWS";
pub const VARIADIC_DATA_BUFFERS: &str = "VARIADIC_DATA_BUFFERS";
pub const INLINED: &str = "INLINED";
pub const PREFIX_HEX: &str = "PREFIX_HEX";
pub const BUFFER_INDEX: &str = "BUFFER_INDEX";

/// A native element type with a JSON representation.
pub(crate) trait JsonNative: ArrowNativeType {
    fn to_json(self) -> JsonValue;

    fn from_json(value: &JsonValue) -> ViewResult<Self>;
}

/// Integers that fit into a JSON number without loss are written as numbers.
macro_rules! impl_json_number {
    ($($native:ty),*) => {
        $(
        impl JsonNative for $native {
            fn to_json(self) -> JsonValue {
                JsonValue::from(self)
            }

            fn from_json(value: &JsonValue) -> ViewResult<Self> {
                let wide = match value {
                    JsonValue::Number(n) => n.as_i64(),
                    JsonValue::String(s) => Some(s.trim().parse::<i64>()?),
                    _ => None,
                };
                match wide.and_then(|v| Self::try_from(v).ok()) {
                    Some(v) => Ok(v),
                    None => decode_err!("Invalid {} value: {value}", stringify!($native)),
                }
            }
        }
        )*
    };
}

impl_json_number!(i8, i16, i32, u8, u16, u32);

/// Integers wider than 53 bits are written as decimal strings.
macro_rules! impl_json_string {
    ($($native:ty),*) => {
        $(
        impl JsonNative for $native {
            fn to_json(self) -> JsonValue {
                JsonValue::String(self.to_string())
            }

            fn from_json(value: &JsonValue) -> ViewResult<Self> {
                match value {
                    JsonValue::String(s) => Ok(s.trim().parse::<$native>()?),
                    JsonValue::Number(n) => match n.to_string().parse::<$native>() {
                        Ok(v) => Ok(v),
                        Err(_) => decode_err!("Invalid {} value: {n}", stringify!($native)),
                    },
                    _ => decode_err!("Invalid {} value: {value}", stringify!($native)),
                }
            }
        }
        )*
    };
}

impl_json_string!(i64, u64, i128);

impl JsonNative for i256 {
    fn to_json(self) -> JsonValue {
        JsonValue::String(self.to_string())
    }

    fn from_json(value: &JsonValue) -> ViewResult<Self> {
        let parsed = match value {
            JsonValue::String(s) => i256::from_string(s.trim()),
            JsonValue::Number(n) => i256::from_string(&n.to_string()),
            _ => None,
        };
        match parsed {
            Some(v) => Ok(v),
            None => decode_err!("Invalid i256 value: {value}"),
        }
    }
}

macro_rules! impl_json_float {
    ($($native:ty),*) => {
        $(
        impl JsonNative for $native {
            fn to_json(self) -> JsonValue {
                JsonValue::from(self)
            }

            fn from_json(value: &JsonValue) -> ViewResult<Self> {
                match value {
                    JsonValue::Number(n) => match n.as_f64() {
                        Some(v) => Ok(v as $native),
                        None => decode_err!("Invalid float value: {n}"),
                    },
                    JsonValue::String(s) => Ok(s.trim().parse::<$native>()?),
                    _ => decode_err!("Invalid float value: {value}"),
                }
            }
        }
        )*
    };
}

impl_json_float!(f32, f64);

/// Runs `$body` with `$t` bound to the native type of the fixed-width `$data_type`, or evaluates
/// `$fallback` with `$other` bound to any other type.
macro_rules! with_native_type {
    ($data_type:expr, $t:ident => $body:expr, $other:ident => $fallback:expr) => {
        match $data_type {
            arrow_schema::DataType::Int8 => {
                type $t = i8;
                $body
            }
            arrow_schema::DataType::Int16 => {
                type $t = i16;
                $body
            }
            arrow_schema::DataType::Int32
            | arrow_schema::DataType::Date32
            | arrow_schema::DataType::Time32(_) => {
                type $t = i32;
                $body
            }
            arrow_schema::DataType::Int64
            | arrow_schema::DataType::Date64
            | arrow_schema::DataType::Time64(_)
            | arrow_schema::DataType::Timestamp(_, _)
            | arrow_schema::DataType::Duration(_) => {
                type $t = i64;
                $body
            }
            arrow_schema::DataType::UInt8 => {
                type $t = u8;
                $body
            }
            arrow_schema::DataType::UInt16 => {
                type $t = u16;
                $body
            }
            arrow_schema::DataType::UInt32 => {
                type $t = u32;
                $body
            }
            arrow_schema::DataType::UInt64 => {
                type $t = u64;
                $body
            }
            arrow_schema::DataType::Float32 => {
                type $t = f32;
                $body
            }
            arrow_schema::DataType::Float64 => {
                type $t = f64;
                $body
            }
            arrow_schema::DataType::Decimal128(_, _) => {
                type $t = i128;
                $body
            }
            arrow_schema::DataType::Decimal256(_, _) => {
                type $t = arrow_buffer::i256;
                $body
            }
            $other => $fallback,
        }
    };
}

pub(crate) use with_native_type;

/// Whether `s` can be read as a hex string: even length and hex digits only.
pub(crate) fn is_hex(s: &str) -> bool {
    s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

pub(crate) fn get<'a>(object: &'a Map<String, JsonValue>, key: &str) -> ViewResult<&'a JsonValue> {
    match object.get(key) {
        Some(value) => Ok(value),
        None => decode_err!("Missing \"{key}\" in column {}", column_name(object)),
    }
}

/// Reads a non-negative row count under `key`.
pub(crate) fn get_count(object: &Map<String, JsonValue>, key: &str) -> ViewResult<usize> {
    let count = u64::from_json(get(object, key)?)?;
    match usize::try_from(count) {
        Ok(count) => Ok(count),
        Err(_) => decode_err!("\"{key}\" of column {} is too large: {count}", column_name(object)),
    }
}

pub(crate) fn get_array<'a>(
    object: &'a Map<String, JsonValue>,
    key: &str,
) -> ViewResult<&'a Vec<JsonValue>> {
    match get(object, key)? {
        JsonValue::Array(values) => Ok(values),
        other => decode_err!("\"{key}\" of column {} is not an array: {other}", column_name(object)),
    }
}

pub(crate) fn get_str<'a>(object: &'a Map<String, JsonValue>, key: &str) -> ViewResult<&'a str> {
    match get(object, key)? {
        JsonValue::String(s) => Ok(s),
        other => decode_err!("\"{key}\" of column {} is not a string: {other}", column_name(object)),
    }
}

fn column_name(object: &Map<String, JsonValue>) -> &str {
    object.get(NAME).and_then(|n| n.as_str()).unwrap_or("<unnamed>")
}
