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

//! Column builders that turn indexed [`Value`]s into immutable Arrow column chunks.
//!
//! Every builder tracks validity the same way: rows can be written in any order, the logical
//! length is one past the highest row written, and rows never written are null. `flush` returns
//! the accumulated rows as one [`ArrayData`] and resets the builder so it can produce the next
//! chunk.

mod list_view;
mod primitive;
mod view;

pub use list_view::*;
pub use primitive::*;
pub use view::*;

use std::fmt::Debug;

use arrow_array::types::{
    BinaryViewType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    StringViewType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow_data::ArrayData;
use arrow_schema::DataType;

use crate::{
    common::ValidityBuilder,
    config::{ViewConfig, DEFAULT_VARIADIC_BUFFER_SIZE},
    data_type::Value,
    errors::{ViewError, ViewResult},
};

/// Options used to construct a builder via [`make_builder`].
#[derive(Clone, Debug, PartialEq)]
pub struct BuilderOptions {
    pub data_type: DataType,
    /// Values treated as null in addition to [`Value::Null`].
    pub null_values: Vec<Value>,
    /// Soft cap on the size of one variadic buffer of view builders.
    pub variadic_buffer_size: usize,
}

impl BuilderOptions {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            null_values: vec![],
            variadic_buffer_size: DEFAULT_VARIADIC_BUFFER_SIZE,
        }
    }

    pub fn with_config(data_type: DataType, config: &ViewConfig) -> Self {
        Self {
            variadic_buffer_size: config.variadic_buffer_size,
            ..Self::new(data_type)
        }
    }

    pub fn with_null_values(mut self, null_values: Vec<Value>) -> Self {
        self.null_values = null_values;
        self
    }

    pub fn with_variadic_buffer_size(mut self, size: usize) -> Self {
        self.variadic_buffer_size = size;
        self
    }

    /// Options for a child builder: same null sentinels and buffer size, different type.
    fn for_child(&self, data_type: DataType) -> Self {
        Self {
            data_type,
            null_values: self.null_values.clone(),
            variadic_buffer_size: self.variadic_buffer_size,
        }
    }
}

/// State shared by all builders: target type, validity and lifecycle.
#[derive(Debug)]
pub struct BuilderState {
    data_type: DataType,
    validity: ValidityBuilder,
    null_values: Vec<Value>,
    finished: bool,
}

impl BuilderState {
    pub fn new(options: &BuilderOptions) -> Self {
        Self {
            data_type: options.data_type.clone(),
            validity: ValidityBuilder::default(),
            null_values: options.null_values.clone(),
            finished: false,
        }
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub(crate) fn set_data_type(&mut self, data_type: DataType) {
        self.data_type = data_type;
    }

    pub fn validity(&self) -> &ValidityBuilder {
        &self.validity
    }

    pub fn validity_mut(&mut self) -> &mut ValidityBuilder {
        &mut self.validity
    }

    /// Whether `value` is stored as a valid row, i.e. it is neither null nor a null sentinel.
    pub fn is_valid(&self, value: &Value) -> bool {
        !value.is_null() && !self.null_values.contains(value)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn invalid_value(&self, value: &Value) -> ViewError {
        ViewError::InvalidValue {
            data_type: self.data_type.clone(),
            value: format!("{value:?}"),
        }
    }
}

/// A builder of one column of a fixed logical type.
pub trait ColumnBuilder: Debug + Send {
    fn state(&self) -> &BuilderState;

    fn state_mut(&mut self) -> &mut BuilderState;

    fn data_type(&self) -> &DataType {
        self.state().data_type()
    }

    /// Number of rows written so far, including null rows.
    fn len(&self) -> usize {
        self.state().validity.len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn null_count(&self) -> usize {
        self.state().validity.null_count()
    }

    fn is_finished(&self) -> bool {
        self.state().finished
    }

    /// Number of bytes currently held by this builder and its children.
    fn byte_length(&self) -> usize;

    /// Writes a valid `value` at row `index`. Callers normally go through [`Self::set`], which
    /// applies null handling first.
    fn set_value(&mut self, index: usize, value: Value) -> ViewResult<()>;

    /// Marks row `index` as valid or null, returning `valid`.
    fn set_valid(&mut self, index: usize, valid: bool) -> ViewResult<bool> {
        Ok(self.state_mut().validity.set(index, valid))
    }

    /// Writes `value` at row `index`, storing a null if it is null or one of the null sentinels.
    /// A value the builder cannot store leaves a null row behind.
    fn set(&mut self, index: usize, value: Value) -> ViewResult<()> {
        if self.is_finished() {
            return Err(ViewError::Finished(self.data_type().clone()));
        }
        let valid = self.state().is_valid(&value);
        if self.set_valid(index, valid)? {
            if let Err(e) = self.set_value(index, value) {
                self.set_valid(index, false)?;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Writes `value` after the last row.
    fn append(&mut self, value: Value) -> ViewResult<()> {
        self.set(self.len(), value)
    }

    /// Binds a child builder. Only nested builders accept children.
    fn add_child(&mut self, _child: Box<dyn ColumnBuilder>, _name: &str) -> ViewResult<()> {
        Err(ViewError::Schema(format!(
            "{} builder does not accept children",
            self.data_type()
        )))
    }

    /// Returns the rows written since the last flush as one column chunk and resets this builder.
    fn flush(&mut self) -> ViewResult<ArrayData>;

    /// Stops this builder from accepting further values. Rows written so far can still be
    /// flushed.
    fn finish(&mut self) -> ViewResult<()> {
        self.state_mut().finished = true;
        Ok(())
    }

    /// Drops everything written since the last flush.
    fn clear(&mut self);
}

/// Creates a builder for `options.data_type`. List-view builders get a child builder for their
/// element type, created with the same options.
pub fn make_builder(options: BuilderOptions) -> ViewResult<Box<dyn ColumnBuilder>> {
    let builder: Box<dyn ColumnBuilder> = match &options.data_type {
        DataType::Boolean => Box::new(BooleanColumnBuilder::new(&options)),
        DataType::Int8 => Box::new(PrimitiveColumnBuilder::<Int8Type>::new(&options)),
        DataType::Int16 => Box::new(PrimitiveColumnBuilder::<Int16Type>::new(&options)),
        DataType::Int32 => Box::new(PrimitiveColumnBuilder::<Int32Type>::new(&options)),
        DataType::Int64 => Box::new(PrimitiveColumnBuilder::<Int64Type>::new(&options)),
        DataType::UInt8 => Box::new(PrimitiveColumnBuilder::<UInt8Type>::new(&options)),
        DataType::UInt16 => Box::new(PrimitiveColumnBuilder::<UInt16Type>::new(&options)),
        DataType::UInt32 => Box::new(PrimitiveColumnBuilder::<UInt32Type>::new(&options)),
        DataType::UInt64 => Box::new(PrimitiveColumnBuilder::<UInt64Type>::new(&options)),
        DataType::Float32 => Box::new(PrimitiveColumnBuilder::<Float32Type>::new(&options)),
        DataType::Float64 => Box::new(PrimitiveColumnBuilder::<Float64Type>::new(&options)),
        DataType::BinaryView => Box::new(ByteViewBuilder::<BinaryViewType>::new(&options)),
        DataType::Utf8View => Box::new(ByteViewBuilder::<StringViewType>::new(&options)),
        DataType::ListView(field) | DataType::LargeListView(field) => {
            let child = make_builder(options.for_child(field.data_type().clone()))?;
            let mut builder: Box<dyn ColumnBuilder> =
                if matches!(options.data_type, DataType::ListView(_)) {
                    Box::new(ListViewBuilder::new(&options))
                } else {
                    Box::new(LargeListViewBuilder::new(&options))
                };
            builder.add_child(child, field.name())?;
            builder
        }
        other => return Err(ViewError::UnsupportedType(other.clone())),
    };
    Ok(builder)
}
