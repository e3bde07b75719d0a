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

use std::fmt::{Debug, Formatter};

use arrow_array::ArrowPrimitiveType;
use arrow_buffer::BooleanBufferBuilder;
use arrow_data::ArrayData;

use super::{BuilderOptions, BuilderState, ColumnBuilder};
use crate::{common::TypedBufferBuilder, data_type::Value, errors::ViewResult};

/// Conversion from a dynamic [`Value`] into a native element type. Integers are range checked,
/// so e.g. `Value::Int64(300)` is rejected by an `Int8` builder.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_from_value_int {
    ($($native:ty),*) => {
        $(
        impl FromValue for $native {
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::Int8(v) => Self::try_from(*v).ok(),
                    Value::Int16(v) => Self::try_from(*v).ok(),
                    Value::Int32(v) => Self::try_from(*v).ok(),
                    Value::Int64(v) => Self::try_from(*v).ok(),
                    Value::UInt8(v) => Self::try_from(*v).ok(),
                    Value::UInt16(v) => Self::try_from(*v).ok(),
                    Value::UInt32(v) => Self::try_from(*v).ok(),
                    Value::UInt64(v) => Self::try_from(*v).ok(),
                    _ => None,
                }
            }
        }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromValue for f32 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float32(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }
}

/// Builder of fixed-width numeric columns, used as the element builder of list views.
pub struct PrimitiveColumnBuilder<T: ArrowPrimitiveType> {
    state: BuilderState,
    values: TypedBufferBuilder<T::Native>,
}

impl<T: ArrowPrimitiveType> Debug for PrimitiveColumnBuilder<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimitiveColumnBuilder")
            .field("state", &self.state)
            .field("values", &self.values)
            .finish()
    }
}

impl<T: ArrowPrimitiveType> PrimitiveColumnBuilder<T>
where
    T::Native: FromValue,
{
    pub fn new(options: &BuilderOptions) -> Self {
        Self {
            state: BuilderState::new(options),
            values: TypedBufferBuilder::new(),
        }
    }
}

impl<T: ArrowPrimitiveType> ColumnBuilder for PrimitiveColumnBuilder<T>
where
    T::Native: FromValue,
{
    fn state(&self) -> &BuilderState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BuilderState {
        &mut self.state
    }

    fn byte_length(&self) -> usize {
        self.values.byte_length() + self.state.validity().byte_length()
    }

    fn set_value(&mut self, index: usize, value: Value) -> ViewResult<()> {
        let native =
            T::Native::from_value(&value).ok_or_else(|| self.state.invalid_value(&value))?;
        self.values.set(index, native);
        Ok(())
    }

    fn flush(&mut self) -> ViewResult<ArrayData> {
        let len = self.len();
        let values = self.values.flush(len);
        let nulls = self.state.validity_mut().flush(len);
        let data = ArrayData::builder(self.state.data_type().clone())
            .len(len)
            .add_buffer(values)
            .nulls(nulls)
            .build()?;
        self.clear();
        Ok(data)
    }

    fn clear(&mut self) {
        self.values.clear();
        self.state.validity_mut().clear();
    }
}

#[derive(Debug)]
pub struct BooleanColumnBuilder {
    state: BuilderState,
    values: BooleanBufferBuilder,
}

impl BooleanColumnBuilder {
    pub fn new(options: &BuilderOptions) -> Self {
        Self {
            state: BuilderState::new(options),
            values: BooleanBufferBuilder::new(0),
        }
    }
}

impl ColumnBuilder for BooleanColumnBuilder {
    fn state(&self) -> &BuilderState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BuilderState {
        &mut self.state
    }

    fn byte_length(&self) -> usize {
        self.values.capacity() / 8 + self.state.validity().byte_length()
    }

    fn set_value(&mut self, index: usize, value: Value) -> ViewResult<()> {
        let Value::Boolean(v) = value else {
            return Err(self.state.invalid_value(&value));
        };
        if index >= self.values.len() {
            self.values.resize(index + 1);
        }
        self.values.set_bit(index, v);
        Ok(())
    }

    fn flush(&mut self) -> ViewResult<ArrayData> {
        let len = self.len();
        if self.values.len() < len {
            self.values.resize(len);
        }
        let values = self.values.finish().slice(0, len);
        let nulls = self.state.validity_mut().flush(len);
        let data = ArrayData::builder(self.state.data_type().clone())
            .len(len)
            .offset(values.offset())
            .add_buffer(values.into_inner())
            .nulls(nulls)
            .build()?;
        self.clear();
        Ok(data)
    }

    fn clear(&mut self) {
        self.values = BooleanBufferBuilder::new(0);
        self.state.validity_mut().clear();
    }
}
