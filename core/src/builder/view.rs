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

use std::{
    fmt::{Debug, Formatter},
    marker::PhantomData,
};

use arrow_array::types::{BinaryViewType, ByteViewType, StringViewType};
use arrow_buffer::Buffer;
use arrow_data::ArrayData;
use log::{debug, trace};

use super::{BuilderOptions, BuilderState, ColumnBuilder};
use crate::{
    common::BufferBuilder,
    data_type::{Value, View, VIEW_INLINE_LEN, VIEW_LEN},
    errors::{ViewError, ViewResult},
};

pub type BinaryViewColumnBuilder = ByteViewBuilder<BinaryViewType>;
pub type Utf8ViewColumnBuilder = ByteViewBuilder<StringViewType>;

/// Builder of `BinaryView` and `Utf8View` columns.
///
/// Each row is a 16-byte [`View`] in the views buffer. Values longer than
/// [`VIEW_INLINE_LEN`] bytes are appended to the current variadic buffer, which is sealed and
/// replaced by a new one once the next value would push it past the configured size. A value is
/// never split across two variadic buffers, so a value larger than the configured size gets a
/// buffer of its own.
///
/// Strings are stored as their UTF-8 bytes: lengths and prefixes count bytes, not characters.
pub struct ByteViewBuilder<T: ByteViewType> {
    state: BuilderState,
    views: BufferBuilder,
    /// Variadic buffer currently being appended to.
    current: BufferBuilder,
    /// Full variadic buffers, in buffer index order.
    sealed: Vec<Buffer>,
    variadic_buffer_size: usize,
    phantom: PhantomData<T>,
}

impl<T: ByteViewType> Debug for ByteViewBuilder<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteViewBuilder")
            .field("state", &self.state)
            .field("views", &self.views)
            .field("current", &self.current)
            .field("sealed", &self.sealed.len())
            .field("variadic_buffer_size", &self.variadic_buffer_size)
            .finish()
    }
}

impl<T: ByteViewType> ByteViewBuilder<T> {
    pub fn new(options: &BuilderOptions) -> Self {
        Self {
            state: BuilderState::new(options),
            views: BufferBuilder::default(),
            current: BufferBuilder::default(),
            sealed: vec![],
            // offsets into a variadic buffer are stored as i32
            variadic_buffer_size: options.variadic_buffer_size.clamp(1, i32::MAX as usize),
            phantom: PhantomData,
        }
    }

    /// Number of variadic buffers the next flush would emit.
    pub fn num_variadic_buffers(&self) -> usize {
        self.sealed.len() + usize::from(!self.current.is_empty())
    }

    fn value_bytes<'a>(&self, value: &'a Value) -> ViewResult<&'a [u8]> {
        match value {
            Value::Utf8(s) if T::IS_UTF8 => Ok(s.as_bytes()),
            Value::Binary(b) if !T::IS_UTF8 => Ok(b),
            _ => Err(self.state.invalid_value(value)),
        }
    }

    fn seal_current(&mut self) {
        let len = self.current.len();
        trace!(
            "Sealing variadic buffer {} of {len} bytes",
            self.sealed.len()
        );
        self.sealed.push(self.current.flush(len));
    }

    /// Copies `bytes` into the variadic buffers and returns the view referencing them.
    fn store_out_of_line(&mut self, bytes: &[u8]) -> ViewResult<View> {
        if !self.current.is_empty() && self.current.len() + bytes.len() > self.variadic_buffer_size
        {
            self.seal_current();
        }
        let (Ok(buffer_index), Ok(offset)) = (
            i32::try_from(self.sealed.len()),
            i32::try_from(self.current.len()),
        ) else {
            return Err(ViewError::InvalidValue {
                data_type: self.state.data_type().clone(),
                value: format!("{} variadic buffers exceed the view range", self.sealed.len()),
            });
        };
        self.current.append(bytes);
        Ok(View::reference(bytes, buffer_index, offset))
    }
}

impl<T: ByteViewType> ColumnBuilder for ByteViewBuilder<T> {
    fn state(&self) -> &BuilderState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BuilderState {
        &mut self.state
    }

    fn byte_length(&self) -> usize {
        self.views.byte_length()
            + self.state.validity().byte_length()
            + self.sealed.iter().map(|b| b.len()).sum::<usize>()
            + self.current.byte_length()
    }

    fn set_value(&mut self, index: usize, value: Value) -> ViewResult<()> {
        let bytes = self.value_bytes(&value)?;
        if bytes.len() > i32::MAX as usize {
            return Err(self.state.invalid_value(&value));
        }
        let view = if bytes.len() <= VIEW_INLINE_LEN {
            View::inline(bytes)
        } else {
            self.store_out_of_line(bytes)?
        };
        self.views.write_at(index * VIEW_LEN, &view.to_bytes());
        Ok(())
    }

    fn set_valid(&mut self, index: usize, valid: bool) -> ViewResult<bool> {
        if !valid {
            self.views.write_at(index * VIEW_LEN, &View::NULL);
        }
        Ok(self.state.validity_mut().set(index, valid))
    }

    fn flush(&mut self) -> ViewResult<ArrayData> {
        let len = self.len();
        if !self.current.is_empty() {
            self.seal_current();
        }
        let mut buffers = Vec::with_capacity(self.sealed.len() + 1);
        buffers.push(self.views.flush(len * VIEW_LEN));
        buffers.append(&mut self.sealed);
        debug!(
            "Flushing {} column of {len} rows with {} variadic buffers",
            T::DATA_TYPE,
            buffers.len() - 1
        );

        let nulls = self.state.validity_mut().flush(len);
        let data = ArrayData::builder(T::DATA_TYPE)
            .len(len)
            .buffers(buffers)
            .nulls(nulls)
            .build()?;
        self.clear();
        Ok(data)
    }

    fn clear(&mut self) {
        self.views.clear();
        self.current.clear();
        self.sealed.clear();
        self.state.validity_mut().clear();
    }
}
