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

use std::{collections::BTreeMap, sync::Arc};

use arrow_array::OffsetSizeTrait;
use arrow_data::ArrayData;
use arrow_schema::{DataType, Field};
use log::{debug, warn};

use super::{BuilderOptions, BuilderState, ColumnBuilder};
use crate::{
    common::TypedBufferBuilder,
    data_type::Value,
    errors::{ViewError, ViewResult},
};

pub type ListViewBuilder = GenericListViewBuilder<i32>;
pub type LargeListViewBuilder = GenericListViewBuilder<i64>;

/// Builder of `ListView` (`O = i32`) and `LargeListView` (`O = i64`) columns.
///
/// Rows are staged by index and only written out when the builder is flushed or finished. At
/// that point staged rows are drained in ascending row order and their elements appended to the
/// child builder one after another, so the child column is contiguous no matter in which order
/// rows were set. Setting a row twice keeps the last value. Null rows get offset 0 and size 0.
#[derive(Debug)]
pub struct GenericListViewBuilder<O: OffsetSizeTrait> {
    state: BuilderState,
    offsets: TypedBufferBuilder<O>,
    sizes: TypedBufferBuilder<O>,
    /// Staged rows, `None` for null rows.
    pending: BTreeMap<usize, Option<Vec<Value>>>,
    /// Next child row to write to.
    cursor: usize,
    child: Option<Box<dyn ColumnBuilder>>,
}

impl<O: OffsetSizeTrait> GenericListViewBuilder<O> {
    pub fn new(options: &BuilderOptions) -> Self {
        Self {
            state: BuilderState::new(options),
            offsets: TypedBufferBuilder::new(),
            sizes: TypedBufferBuilder::new(),
            pending: BTreeMap::new(),
            cursor: 0,
            child: None,
        }
    }

    /// Number of rows staged but not yet written to the child.
    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    fn to_offset(&self, n: usize) -> ViewResult<O> {
        O::from_usize(n).ok_or_else(|| {
            ViewError::InvalidValue {
                data_type: self.state.data_type().clone(),
                value: format!("offset {n} out of range"),
            }
        })
    }

    /// Writes all staged rows to the offsets, sizes and child. On error the whole builder,
    /// child included, is cleared so that no partially written chunk can be flushed.
    fn drain_pending(&mut self) -> ViewResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let result = self.write_pending();
        if let Err(err) = &result {
            warn!(
                "Discarding {} column of {} rows: {err}",
                self.state.data_type(),
                self.state.validity().len()
            );
            self.clear();
        }
        result
    }

    fn write_pending(&mut self) -> ViewResult<()> {
        let pending = std::mem::take(&mut self.pending);
        let child = self.child.as_mut().ok_or_else(|| {
            ViewError::Schema(format!("{} builder has no child", self.state.data_type()))
        })?;

        for (index, row) in pending {
            match row {
                Some(values) => {
                    let offset = O::from_usize(self.cursor);
                    let size = O::from_usize(values.len());
                    let (Some(offset), Some(size)) = (offset, size) else {
                        return Err(ViewError::InvalidValue {
                            data_type: self.state.data_type().clone(),
                            value: format!("row {index} exceeds the offset range"),
                        });
                    };
                    self.offsets.set(index, offset);
                    self.sizes.set(index, size);
                    for value in values {
                        child.set(self.cursor, value)?;
                        self.cursor += 1;
                    }
                }
                None => {
                    self.offsets.set(index, O::usize_as(0));
                    self.sizes.set(index, O::usize_as(0));
                }
            }
        }
        // the end of the child must stay addressable
        self.to_offset(self.cursor)?;
        Ok(())
    }
}

impl<O: OffsetSizeTrait> ColumnBuilder for GenericListViewBuilder<O> {
    fn state(&self) -> &BuilderState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BuilderState {
        &mut self.state
    }

    fn byte_length(&self) -> usize {
        self.offsets.byte_length()
            + self.sizes.byte_length()
            + self.state.validity().byte_length()
            + self.child.as_ref().map_or(0, |c| c.byte_length())
    }

    fn add_child(&mut self, child: Box<dyn ColumnBuilder>, name: &str) -> ViewResult<()> {
        if self.child.is_some() {
            return Err(ViewError::Schema(format!(
                "{} builder can only have one child",
                self.state.data_type()
            )));
        }
        let field = Arc::new(Field::new(name, child.data_type().clone(), true));
        let data_type = if O::IS_LARGE {
            DataType::LargeListView(field)
        } else {
            DataType::ListView(field)
        };
        self.state.set_data_type(data_type);
        self.child = Some(child);
        Ok(())
    }

    fn set_value(&mut self, index: usize, value: Value) -> ViewResult<()> {
        let Value::List(values) = value else {
            return Err(self.state.invalid_value(&value));
        };
        self.pending.insert(index, Some(values));
        Ok(())
    }

    fn set_valid(&mut self, index: usize, valid: bool) -> ViewResult<bool> {
        if !self.state.validity_mut().set(index, valid) {
            self.pending.insert(index, None);
        }
        Ok(valid)
    }

    fn flush(&mut self) -> ViewResult<ArrayData> {
        self.drain_pending()?;
        let child = self.child.as_mut().ok_or_else(|| {
            ViewError::Schema(format!("{} builder has no child", self.state.data_type()))
        })?;
        let child_data = child.flush()?;

        let len = self.state.validity().len();
        debug!(
            "Flushing {} column of {len} rows over {} child rows",
            self.state.data_type(),
            child_data.len()
        );
        let offsets = self.offsets.flush(len);
        let sizes = self.sizes.flush(len);
        let nulls = self.state.validity_mut().flush(len);
        let data = ArrayData::builder(self.state.data_type().clone())
            .len(len)
            .add_buffer(offsets)
            .add_buffer(sizes)
            .nulls(nulls)
            .add_child_data(child_data)
            .build()?;
        self.clear();
        Ok(data)
    }

    fn finish(&mut self) -> ViewResult<()> {
        self.drain_pending()?;
        if let Some(child) = self.child.as_mut() {
            child.finish()?;
        }
        self.state_mut().finished = true;
        Ok(())
    }

    fn clear(&mut self) {
        self.pending.clear();
        self.cursor = 0;
        self.offsets.clear();
        self.sizes.clear();
        self.state.validity_mut().clear();
        if let Some(child) = self.child.as_mut() {
            child.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use arrow_array::{
        cast::AsArray,
        make_array,
        types::{Int32Type, Int8Type},
        Array, GenericListViewArray,
    };

    use super::*;
    use crate::builder::make_builder;

    fn list_view_of(item: DataType) -> DataType {
        DataType::ListView(Arc::new(Field::new("item", item, true)))
    }

    fn ints(values: &[i32]) -> Value {
        Value::List(values.iter().map(|v| Value::Int32(*v)).collect())
    }

    fn rows<O: OffsetSizeTrait>(array: &GenericListViewArray<O>) -> Vec<Option<Vec<Option<i32>>>> {
        (0..array.len())
            .map(|i| {
                array.is_valid(i).then(|| {
                    array
                        .value(i)
                        .as_primitive::<Int32Type>()
                        .iter()
                        .collect()
                })
            })
            .collect()
    }

    #[test]
    fn single_child_only() {
        let mut builder = ListViewBuilder::new(&BuilderOptions::new(DataType::Null));
        let child = make_builder(BuilderOptions::new(DataType::Int32)).unwrap();
        builder.add_child(child, "values").unwrap();
        assert_eq!(
            builder.data_type(),
            &DataType::ListView(Arc::new(Field::new("values", DataType::Int32, true)))
        );

        let second = make_builder(BuilderOptions::new(DataType::Int32)).unwrap();
        let err = builder.add_child(second, "other").unwrap_err();
        assert!(matches!(err, ViewError::Schema(_)), "{err}");
    }

    #[test]
    fn flush_without_child() {
        let mut builder = ListViewBuilder::new(&BuilderOptions::new(DataType::Null));
        builder.set_value(0, ints(&[1])).unwrap();
        assert!(matches!(builder.flush(), Err(ViewError::Schema(_))));
    }

    #[test]
    fn out_of_order_rows_are_contiguous() {
        let mut builder = make_builder(BuilderOptions::new(list_view_of(DataType::Int32))).unwrap();
        builder.set(2, ints(&[5, 6])).unwrap();
        builder.set(0, ints(&[1, 2, 3])).unwrap();
        builder.set(1, Value::Null).unwrap();
        builder.set(3, ints(&[])).unwrap();
        assert_eq!(builder.len(), 4);
        assert_eq!(builder.null_count(), 1);

        let data = builder.flush().unwrap();
        assert_eq!(data.buffers()[0].typed_data::<i32>(), &[0, 0, 3, 5]);
        assert_eq!(data.buffers()[1].typed_data::<i32>(), &[3, 0, 2, 0]);

        let array = make_array(data);
        assert_eq!(
            rows(array.as_list_view::<i32>()),
            vec![
                Some(vec![Some(1), Some(2), Some(3)]),
                None,
                Some(vec![Some(5), Some(6)]),
                Some(vec![]),
            ]
        );
    }

    #[test]
    fn last_write_wins() {
        let mut builder = make_builder(BuilderOptions::new(list_view_of(DataType::Int32))).unwrap();
        builder.set(0, ints(&[1, 2])).unwrap();
        builder.set(0, ints(&[9])).unwrap();
        builder.set(1, ints(&[3])).unwrap();
        builder.set(1, Value::Null).unwrap();

        let data = builder.flush().unwrap();
        // overwritten rows never reach the child
        assert_eq!(data.child_data()[0].len(), 1);
        let array = make_array(data);
        assert_eq!(
            rows(array.as_list_view::<i32>()),
            vec![Some(vec![Some(9)]), None]
        );
    }

    #[test]
    fn null_elements_propagate_to_child() {
        let item = DataType::Int8;
        let mut builder = make_builder(BuilderOptions::new(list_view_of(item))).unwrap();
        builder
            .append(Value::List(vec![Value::Int8(1), Value::Null, Value::Int8(-1)]))
            .unwrap();
        let data = builder.flush().unwrap();
        let array = make_array(data);
        let list = array.as_list_view::<i32>();
        let values = list.value(0);
        assert_eq!(
            values.as_primitive::<Int8Type>().iter().collect::<Vec<_>>(),
            vec![Some(1), None, Some(-1)]
        );
    }

    #[test]
    fn flushes_are_independent() {
        let mut builder = make_builder(BuilderOptions::new(list_view_of(DataType::Int32))).unwrap();
        builder.append(ints(&[1, 2])).unwrap();
        let first = builder.flush().unwrap();

        builder.append(ints(&[3, 4])).unwrap();
        let second = builder.flush().unwrap();

        for (data, expected) in [(first, [1, 2]), (second, [3, 4])] {
            assert_eq!(data.len(), 1);
            assert_eq!(data.buffers()[0].typed_data::<i32>(), &[0]);
            let array = make_array(data);
            assert_eq!(
                rows(array.as_list_view::<i32>()),
                vec![Some(expected.iter().map(|v| Some(*v)).collect())]
            );
        }
    }

    #[test]
    fn finish_drains_pending_rows() {
        let mut builder = LargeListViewBuilder::new(&BuilderOptions::new(DataType::Null));
        builder
            .add_child(make_builder(BuilderOptions::new(DataType::Int32)).unwrap(), "item")
            .unwrap();
        builder.set(1, ints(&[7, 8])).unwrap();
        builder.set(0, ints(&[6])).unwrap();
        assert_eq!(builder.num_pending(), 2);

        builder.finish().unwrap();
        assert_eq!(builder.num_pending(), 0);
        assert!(builder.set(2, ints(&[1])).is_err());

        let data = builder.flush().unwrap();
        assert_eq!(data.buffers()[0].typed_data::<i64>(), &[0, 1]);
        assert_eq!(data.buffers()[1].typed_data::<i64>(), &[1, 2]);
        let array = make_array(data);
        assert_eq!(
            rows(array.as_list_view::<i64>()),
            vec![Some(vec![Some(6)]), Some(vec![Some(7), Some(8)])]
        );
    }

    #[test]
    fn byte_length_includes_child() {
        let mut builder = make_builder(BuilderOptions::new(list_view_of(DataType::Int32))).unwrap();
        builder.append(ints(&[1, 2, 3, 4])).unwrap();
        let staged = builder.byte_length();
        builder.finish().unwrap();
        // draining writes offsets, sizes and four child values
        assert!(builder.byte_length() >= staged + 2 * 4 + 4 * 4);
    }

    #[test]
    fn failed_drain_discards_the_chunk() {
        let mut builder = make_builder(BuilderOptions::new(list_view_of(DataType::Int8))).unwrap();
        builder
            .set(0, Value::List(vec![Value::Int8(1), Value::Int32(300)]))
            .unwrap();
        builder
            .set(1, Value::List(vec![Value::Int8(5), Value::Int8(6)]))
            .unwrap();

        let err = builder.flush().unwrap_err();
        assert!(matches!(err, ViewError::InvalidValue { .. }), "{err}");
        assert!(builder.is_empty());

        // the builder is usable again and nothing from the failed rows leaks through
        builder
            .set(0, Value::List(vec![Value::Int8(5), Value::Int8(6)]))
            .unwrap();
        let data = builder.flush().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.child_data()[0].len(), 2);
        let array = make_array(data);
        let values = array.as_list_view::<i32>().value(0);
        assert_eq!(
            values.as_primitive::<Int8Type>().iter().collect::<Vec<_>>(),
            vec![Some(5), Some(6)]
        );
    }

    #[test]
    fn failed_finish_leaves_nothing_behind() {
        let mut builder = make_builder(BuilderOptions::new(list_view_of(DataType::Int8))).unwrap();
        builder.set(0, Value::List(vec![Value::Utf8("x".into())])).unwrap();
        assert!(builder.finish().is_err());
        assert!(!builder.is_finished());
        assert!(builder.is_empty());
        assert_eq!(builder.flush().unwrap().len(), 0);
    }

    #[test]
    fn rejects_non_list_values() {
        let mut builder = make_builder(BuilderOptions::new(list_view_of(DataType::Int32))).unwrap();
        let err = builder.append(Value::Int32(1)).unwrap_err();
        assert!(matches!(err, ViewError::InvalidValue { .. }));
    }
}
