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

use std::collections::HashMap;

use arrow_buffer::{BooleanBuffer, Buffer, MutableBuffer, NullBuffer};
use arrow_data::{ArrayData, ArrayDataBuilder};
use arrow_schema::{DataType, Field, UnionMode};
use log::trace;
use serde_json::{Map, Value as JsonValue};

use super::*;
use crate::{
    common::bit,
    data_type::{View, VIEW_INLINE_LEN, VIEW_LEN, VIEW_PREFIX_LEN},
    errors::{decode_err, ViewError, ViewResult},
};

/// Reads a record batch written as `{"count": n, "columns": [...]}`, one column per field.
pub fn read_batch<'f>(
    fields: impl IntoIterator<Item = &'f Field>,
    json: &JsonValue,
    dictionaries: &HashMap<i64, ArrayData>,
) -> ViewResult<Vec<ArrayData>> {
    let Some(batch) = json.as_object() else {
        decode_err!("Record batch is not a JSON object")
    };
    let count = get_count(batch, COUNT)?;
    let columns = get_array(batch, COLUMNS)?;
    let fields: Vec<&Field> = fields.into_iter().collect();
    if fields.len() != columns.len() {
        decode_err!(
            "Batch has {} fields but {} columns",
            fields.len(),
            columns.len()
        )
    }

    let columns = fields
        .into_iter()
        .zip(columns)
        .map(|(field, column)| read_column(field, column, dictionaries))
        .collect::<ViewResult<Vec<_>>>()?;
    if let Some(column) = columns.iter().find(|c| c.len() != count) {
        decode_err!(
            "Batch count is {count} but a column has {} rows",
            column.len()
        )
    }
    Ok(columns)
}

/// Reads one column chunk of `field`. Dictionary columns get their values from `dictionaries`,
/// keyed by the dictionary id of the field.
pub fn read_column(
    field: &Field,
    json: &JsonValue,
    dictionaries: &HashMap<i64, ArrayData>,
) -> ViewResult<ArrayData> {
    let Some(column) = json.as_object() else {
        decode_err!("Column {} is not a JSON object", field.name())
    };
    let len = get_count(column, COUNT)?;
    let data_type = field.data_type();
    let mut builder = ArrayData::builder(data_type.clone()).len(len);
    if !matches!(data_type, DataType::Null | DataType::Union(_, _)) {
        builder = builder.nulls(read_validity(column, len)?);
    }

    builder = match data_type {
        DataType::Null => builder,
        DataType::Boolean => {
            let values = get_array(column, DATA)?;
            check_len(column, DATA, values, len)?;
            let bits = values
                .iter()
                .map(|v| match v {
                    JsonValue::Bool(b) => Ok(*b),
                    other => Ok(u8::from_json(other)? != 0),
                })
                .collect::<ViewResult<Vec<bool>>>()?;
            builder.add_buffer(Buffer::from_vec(bit::pack_bools(bits)))
        }
        DataType::Utf8 => read_bytes::<i32>(builder, column, len, true)?,
        DataType::LargeUtf8 => read_bytes::<i64>(builder, column, len, true)?,
        DataType::Binary => read_bytes::<i32>(builder, column, len, false)?,
        DataType::LargeBinary => read_bytes::<i64>(builder, column, len, false)?,
        DataType::FixedSizeBinary(_) => {
            let values = get_array(column, DATA)?;
            check_len(column, DATA, values, len)?;
            builder.add_buffer(Buffer::from_vec(concat_hex(values)?))
        }
        DataType::Utf8View | DataType::BinaryView => read_views(builder, column, len)?,
        DataType::List(child) | DataType::Map(child, _) => {
            let builder = builder.add_buffer(read_natives::<i32>(column, OFFSET, len + 1)?);
            read_children(builder, column, [child.as_ref()], dictionaries)?
        }
        DataType::LargeList(child) => {
            let builder = builder.add_buffer(read_natives::<i64>(column, OFFSET, len + 1)?);
            read_children(builder, column, [child.as_ref()], dictionaries)?
        }
        DataType::FixedSizeList(child, _) => {
            read_children(builder, column, [child.as_ref()], dictionaries)?
        }
        DataType::ListView(child) => {
            let builder = builder
                .add_buffer(read_natives::<i32>(column, OFFSET, len)?)
                .add_buffer(read_natives::<i32>(column, SIZE, len)?);
            read_children(builder, column, [child.as_ref()], dictionaries)?
        }
        DataType::LargeListView(child) => {
            let builder = builder
                .add_buffer(read_natives::<i64>(column, OFFSET, len)?)
                .add_buffer(read_natives::<i64>(column, SIZE, len)?);
            read_children(builder, column, [child.as_ref()], dictionaries)?
        }
        DataType::Struct(children) => read_children(
            builder,
            column,
            children.iter().map(|f| f.as_ref()),
            dictionaries,
        )?,
        DataType::Union(children, mode) => {
            let mut builder = builder.add_buffer(read_natives::<i8>(column, TYPE_ID, len)?);
            if *mode == UnionMode::Dense {
                builder = builder.add_buffer(read_natives::<i32>(column, OFFSET, len)?);
            }
            read_children(
                builder,
                column,
                children.iter().map(|(_, f)| f.as_ref()),
                dictionaries,
            )?
        }
        DataType::Dictionary(key_type, value_type) => {
            let keys = with_native_type!(
                key_type.as_ref(),
                T => read_natives::<T>(column, DATA, len)?,
                other => return Err(ViewError::UnsupportedType(other.clone()))
            );
            #[allow(deprecated)]
            let Some(dict_id) = field.dict_id() else {
                decode_err!("Dictionary field {} has no dictionary id", field.name())
            };
            let Some(dictionary) = dictionaries.get(&dict_id) else {
                decode_err!("No dictionary with id {dict_id} for column {}", field.name())
            };
            if dictionary.data_type() != value_type.as_ref() {
                decode_err!(
                    "Dictionary {dict_id} has type {}, expected {value_type}",
                    dictionary.data_type()
                )
            }
            builder.add_buffer(keys).add_child_data(dictionary.clone())
        }
        data_type => with_native_type!(
            data_type,
            T => builder.add_buffer(read_natives::<T>(column, DATA, len)?),
            other => return Err(ViewError::UnsupportedType(other.clone()))
        ),
    };
    Ok(builder.build()?)
}

fn check_len(
    column: &Map<String, JsonValue>,
    key: &str,
    values: &[JsonValue],
    len: usize,
) -> ViewResult<()> {
    if values.len() != len {
        decode_err!(
            "\"{key}\" of column {} has {} entries, expected {len}",
            column_name(column),
            values.len()
        )
    }
    Ok(())
}

/// Reads `VALIDITY`. A missing array means every row is valid.
fn read_validity(column: &Map<String, JsonValue>, len: usize) -> ViewResult<Option<NullBuffer>> {
    if !column.contains_key(VALIDITY) {
        return Ok(None);
    }
    let values = get_array(column, VALIDITY)?;
    check_len(column, VALIDITY, values, len)?;
    let bits = values
        .iter()
        .map(|v| match v {
            JsonValue::Bool(b) => Ok(*b),
            other => Ok(u8::from_json(other)? != 0),
        })
        .collect::<ViewResult<Vec<bool>>>()?;
    let nulls = NullBuffer::new(BooleanBuffer::new(
        Buffer::from_vec(bit::pack_bools(bits)),
        0,
        len,
    ));
    Ok((nulls.null_count() > 0).then_some(nulls))
}

fn read_natives<T: JsonNative>(
    column: &Map<String, JsonValue>,
    key: &str,
    len: usize,
) -> ViewResult<Buffer> {
    let values = get_array(column, key)?;
    check_len(column, key, values, len)?;
    let natives = values
        .iter()
        .map(T::from_json)
        .collect::<ViewResult<Vec<T>>>()?;
    Ok(Buffer::from_vec(natives))
}

/// Hex values are concatenated and decoded as one stream.
fn concat_hex(values: &[JsonValue]) -> ViewResult<Vec<u8>> {
    let mut hex_string = String::new();
    for value in values {
        match value {
            JsonValue::String(s) => hex_string.push_str(s),
            other => decode_err!("Expected a hex string, got {other}"),
        }
    }
    Ok(hex::decode(hex_string)?)
}

fn read_bytes<O: JsonNative>(
    builder: ArrayDataBuilder,
    column: &Map<String, JsonValue>,
    len: usize,
    utf8: bool,
) -> ViewResult<ArrayDataBuilder> {
    let offsets = read_natives::<O>(column, OFFSET, len + 1)?;
    let values = get_array(column, DATA)?;
    check_len(column, DATA, values, len)?;
    let bytes = if utf8 {
        let mut bytes = Vec::new();
        for value in values {
            match value {
                JsonValue::String(s) => bytes.extend_from_slice(s.as_bytes()),
                other => decode_err!("Expected a string, got {other}"),
            }
        }
        bytes
    } else {
        concat_hex(values)?
    };
    Ok(builder.add_buffer(offsets).add_buffer(Buffer::from_vec(bytes)))
}

/// Rebuilds the 16-byte views from `VIEWS` rows.
///
/// `INLINED` holds hex for `BinaryView` and literal text for `Utf8View`, and the reader tells
/// them apart by content: a value that looks like hex (even length, hex digits only) and whose
/// decoded length matches `SIZE` is decoded, anything else is taken as text.
fn read_views(
    builder: ArrayDataBuilder,
    column: &Map<String, JsonValue>,
    len: usize,
) -> ViewResult<ArrayDataBuilder> {
    let rows = get_array(column, VIEWS)?;
    check_len(column, VIEWS, rows, len)?;

    let mut views = MutableBuffer::new(len * VIEW_LEN);
    for row in rows {
        let Some(row) = row.as_object() else {
            decode_err!("View row is not a JSON object: {row}")
        };
        let size = i32::from_json(get(row, SIZE)?)?;
        let view = if row.contains_key(INLINED) {
            let inlined = get_str(row, INLINED)?;
            let bytes = decode_inlined(inlined, size)?;
            if bytes.len() > VIEW_INLINE_LEN {
                decode_err!("Inlined value of {} bytes is too long", bytes.len())
            }
            let mut data = [0u8; VIEW_INLINE_LEN];
            data[..bytes.len()].copy_from_slice(&bytes);
            View::Inline { length: size, data }
        } else {
            let prefix = hex::decode(get_str(row, PREFIX_HEX)?)?;
            let Ok(prefix) = <[u8; VIEW_PREFIX_LEN]>::try_from(prefix.as_slice()) else {
                decode_err!("View prefix must be {VIEW_PREFIX_LEN} bytes, got {}", prefix.len())
            };
            View::Ref {
                length: size,
                prefix,
                buffer_index: i32::from_json(get(row, BUFFER_INDEX)?)?,
                offset: i32::from_json(get(row, OFFSET)?)?,
            }
        };
        views.extend_from_slice(&view.to_bytes());
    }

    let mut builder = builder.add_buffer(views.into());
    if column.contains_key(VARIADIC_DATA_BUFFERS) {
        for buffer in get_array(column, VARIADIC_DATA_BUFFERS)? {
            let Some(buffer) = buffer.as_str() else {
                decode_err!("Variadic buffer is not a hex string: {buffer}")
            };
            builder = builder.add_buffer(Buffer::from_vec(hex::decode(buffer)?));
        }
    }
    Ok(builder)
}

fn decode_inlined(inlined: &str, size: i32) -> ViewResult<Vec<u8>> {
    if is_hex(inlined) && i64::try_from(inlined.len() / 2) == Ok(i64::from(size)) {
        return Ok(hex::decode(inlined)?);
    }
    trace!("Reading inlined value {inlined:?} as text");
    Ok(inlined.as_bytes().to_vec())
}

fn read_children<'f>(
    builder: ArrayDataBuilder,
    column: &Map<String, JsonValue>,
    fields: impl IntoIterator<Item = &'f Field>,
    dictionaries: &HashMap<i64, ArrayData>,
) -> ViewResult<ArrayDataBuilder> {
    let children = get_array(column, CHILDREN)?;
    let fields: Vec<&Field> = fields.into_iter().collect();
    check_len(column, CHILDREN, children, fields.len())?;
    let mut builder = builder;
    for (field, child) in fields.into_iter().zip(children) {
        builder = builder.add_child_data(read_column(field, child, dictionaries)?);
    }
    Ok(builder)
}
