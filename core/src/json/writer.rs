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

use arrow_array::OffsetSizeTrait;
use arrow_buffer::ArrowNativeType;
use arrow_data::ArrayData;
use arrow_schema::{DataType, Field, UnionMode};
use serde_json::{Map, Value as JsonValue};

use super::*;
use crate::{
    common::bit,
    data_type::{View, VIEW_LEN},
    errors::{decode_err, ViewError, ViewResult},
};

/// Writes a record batch as `{"count": n, "columns": [...]}`.
pub fn write_batch<'f>(
    fields: impl IntoIterator<Item = &'f Field>,
    columns: &[ArrayData],
) -> ViewResult<JsonValue> {
    let fields: Vec<&Field> = fields.into_iter().collect();
    if fields.len() != columns.len() {
        decode_err!(
            "Batch has {} fields but {} columns",
            fields.len(),
            columns.len()
        )
    }
    let count = columns.first().map_or(0, |c| c.len());
    let columns = fields
        .iter()
        .zip(columns)
        .map(|(field, column)| write_column(field, column))
        .collect::<ViewResult<Vec<_>>>()?;

    let mut batch = Map::new();
    batch.insert(COUNT.to_string(), count.into());
    batch.insert(COLUMNS.to_string(), JsonValue::Array(columns));
    Ok(JsonValue::Object(batch))
}

/// Writes one column chunk. Dictionary columns are written as their indices.
pub fn write_column(field: &Field, data: &ArrayData) -> ViewResult<JsonValue> {
    if data.data_type() != field.data_type() {
        return Err(ViewError::Schema(format!(
            "Column of type {} does not match field {} of type {}",
            data.data_type(),
            field.name(),
            field.data_type()
        )));
    }
    if data.offset() != 0 {
        decode_err!(
            "Cannot write column {} with non-zero offset {}",
            field.name(),
            data.offset()
        )
    }

    let len = data.len();
    let mut column = Map::new();
    column.insert(NAME.to_string(), field.name().as_str().into());
    column.insert(COUNT.to_string(), len.into());
    if !matches!(data.data_type(), DataType::Null | DataType::Union(_, _)) {
        let validity = (0..len)
            .map(|i| JsonValue::from(u8::from(data.is_valid(i))))
            .collect();
        column.insert(VALIDITY.to_string(), JsonValue::Array(validity));
    }

    match data.data_type() {
        DataType::Null => {}
        DataType::Boolean => {
            let bits = checked_slice(data, 0, bit::ceil(len, 8))?;
            let values = (0..len)
                .map(|i| JsonValue::Bool(bit::get_bit(bits, i)))
                .collect();
            column.insert(DATA.to_string(), JsonValue::Array(values));
        }
        DataType::Utf8 => write_bytes::<i32>(data, &mut column, true)?,
        DataType::LargeUtf8 => write_bytes::<i64>(data, &mut column, true)?,
        DataType::Binary => write_bytes::<i32>(data, &mut column, false)?,
        DataType::LargeBinary => write_bytes::<i64>(data, &mut column, false)?,
        DataType::FixedSizeBinary(width) => {
            let width = *width as usize;
            let bytes = checked_slice(data, 0, len * width)?;
            let values = (0..len)
                .map(|i| JsonValue::String(hex::encode_upper(&bytes[i * width..(i + 1) * width])))
                .collect();
            column.insert(DATA.to_string(), JsonValue::Array(values));
        }
        DataType::Utf8View => write_views(data, &mut column, true)?,
        DataType::BinaryView => write_views(data, &mut column, false)?,
        DataType::List(child) | DataType::Map(child, _) => {
            column.insert(OFFSET.to_string(), natives::<i32>(data, 0, len + 1)?);
            write_children(&mut column, [child.as_ref()], data)?;
        }
        DataType::LargeList(child) => {
            column.insert(OFFSET.to_string(), natives::<i64>(data, 0, len + 1)?);
            write_children(&mut column, [child.as_ref()], data)?;
        }
        DataType::FixedSizeList(child, _) => {
            write_children(&mut column, [child.as_ref()], data)?;
        }
        DataType::ListView(child) => {
            column.insert(OFFSET.to_string(), natives::<i32>(data, 0, len)?);
            column.insert(SIZE.to_string(), natives::<i32>(data, 1, len)?);
            write_children(&mut column, [child.as_ref()], data)?;
        }
        DataType::LargeListView(child) => {
            column.insert(OFFSET.to_string(), natives::<i64>(data, 0, len)?);
            column.insert(SIZE.to_string(), natives::<i64>(data, 1, len)?);
            write_children(&mut column, [child.as_ref()], data)?;
        }
        DataType::Struct(children) => {
            write_children(&mut column, children.iter().map(|f| f.as_ref()), data)?;
        }
        DataType::Union(children, mode) => {
            column.insert(TYPE_ID.to_string(), natives::<i8>(data, 0, len)?);
            if *mode == UnionMode::Dense {
                column.insert(OFFSET.to_string(), natives::<i32>(data, 1, len)?);
            }
            write_children(&mut column, children.iter().map(|(_, f)| f.as_ref()), data)?;
        }
        DataType::Dictionary(key_type, _) => {
            let keys = with_native_type!(
                key_type.as_ref(),
                T => natives::<T>(data, 0, len)?,
                other => return Err(ViewError::UnsupportedType(other.clone()))
            );
            column.insert(DATA.to_string(), keys);
        }
        data_type => {
            let values = with_native_type!(
                data_type,
                T => natives::<T>(data, 0, len)?,
                other => return Err(ViewError::UnsupportedType(other.clone()))
            );
            column.insert(DATA.to_string(), values);
        }
    }
    Ok(JsonValue::Object(column))
}

/// Returns the first `len` bytes of buffer `index` of `data`.
fn checked_slice(data: &ArrayData, index: usize, len: usize) -> ViewResult<&[u8]> {
    match data.buffers().get(index) {
        Some(buffer) if buffer.len() >= len => Ok(&buffer.as_slice()[..len]),
        Some(buffer) => decode_err!(
            "Buffer {index} of {} column holds {} bytes, expected {len}",
            data.data_type(),
            buffer.len()
        ),
        None => decode_err!("{} column has no buffer {index}", data.data_type()),
    }
}

fn typed<T: ArrowNativeType>(data: &ArrayData, index: usize, len: usize) -> ViewResult<&[T]> {
    checked_slice(data, index, len * std::mem::size_of::<T>())?;
    Ok(&data.buffers()[index].typed_data::<T>()[..len])
}

fn natives<T: JsonNative>(data: &ArrayData, index: usize, len: usize) -> ViewResult<JsonValue> {
    let values = typed::<T>(data, index, len)?;
    Ok(JsonValue::Array(values.iter().map(|v| v.to_json()).collect()))
}

/// Writes `OFFSET` and `DATA` of variable-length string or binary columns.
fn write_bytes<O: OffsetSizeTrait + JsonNative>(
    data: &ArrayData,
    column: &mut Map<String, JsonValue>,
    utf8: bool,
) -> ViewResult<()> {
    let len = data.len();
    let offsets = typed::<O>(data, 0, len + 1)?;
    let end = offsets.last().map_or(0, |o| o.as_usize());
    let bytes = checked_slice(data, 1, end)?;

    let mut values = Vec::with_capacity(len);
    for window in offsets.windows(2) {
        let value = &bytes[window[0].as_usize()..window[1].as_usize()];
        values.push(if utf8 {
            JsonValue::String(std::str::from_utf8(value)?.to_string())
        } else {
            JsonValue::String(hex::encode_upper(value))
        });
    }
    column.insert(OFFSET.to_string(), natives::<O>(data, 0, len + 1)?);
    column.insert(DATA.to_string(), JsonValue::Array(values));
    Ok(())
}

/// Writes `VIEWS` and `VARIADIC_DATA_BUFFERS`.
///
/// Inline values are written as literal text for `Utf8View` and as hex for `BinaryView`.
/// Variadic buffers are renumbered in the order rows first reference them, and buffers that no
/// row references are dropped.
fn write_views(
    data: &ArrayData,
    column: &mut Map<String, JsonValue>,
    utf8: bool,
) -> ViewResult<()> {
    let len = data.len();
    let views = checked_slice(data, 0, len * VIEW_LEN)?;
    let mut remap: HashMap<i32, usize> = HashMap::new();
    let mut variadic: Vec<JsonValue> = vec![];

    let mut rows = Vec::with_capacity(len);
    for chunk in views.chunks_exact(VIEW_LEN) {
        let mut row = Map::new();
        match View::from_bytes(chunk) {
            view @ View::Inline { length, .. } => {
                let inlined = match view.inline_data() {
                    Some(bytes) if utf8 => std::str::from_utf8(bytes)?.to_string(),
                    Some(bytes) => hex::encode_upper(bytes),
                    None => String::new(),
                };
                row.insert(SIZE.to_string(), length.into());
                row.insert(INLINED.to_string(), inlined.into());
            }
            View::Ref {
                length,
                prefix,
                buffer_index,
                offset,
            } => {
                let index = match remap.get(&buffer_index) {
                    Some(index) => *index,
                    None => {
                        let Some(buffer) = usize::try_from(buffer_index)
                            .ok()
                            .and_then(|i| data.buffers().get(i + 1))
                        else {
                            decode_err!("View references missing variadic buffer {buffer_index}")
                        };
                        variadic.push(JsonValue::String(hex::encode_upper(buffer.as_slice())));
                        remap.insert(buffer_index, variadic.len() - 1);
                        variadic.len() - 1
                    }
                };
                row.insert(SIZE.to_string(), length.into());
                row.insert(PREFIX_HEX.to_string(), hex::encode_upper(prefix).into());
                row.insert(BUFFER_INDEX.to_string(), index.into());
                row.insert(OFFSET.to_string(), offset.into());
            }
        }
        rows.push(JsonValue::Object(row));
    }
    column.insert(VIEWS.to_string(), JsonValue::Array(rows));
    column.insert(VARIADIC_DATA_BUFFERS.to_string(), JsonValue::Array(variadic));
    Ok(())
}

fn write_children<'f>(
    column: &mut Map<String, JsonValue>,
    fields: impl IntoIterator<Item = &'f Field>,
    data: &ArrayData,
) -> ViewResult<()> {
    let fields: Vec<&Field> = fields.into_iter().collect();
    if fields.len() != data.child_data().len() {
        decode_err!(
            "{} column has {} children, expected {}",
            data.data_type(),
            data.child_data().len(),
            fields.len()
        )
    }
    let children = fields
        .into_iter()
        .zip(data.child_data())
        .map(|(field, child)| write_column(field, child))
        .collect::<ViewResult<Vec<_>>>()?;
    column.insert(CHILDREN.to_string(), JsonValue::Array(children));
    Ok(())
}
