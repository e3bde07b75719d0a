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

use arrow_buffer::{BooleanBuffer, Buffer, NullBuffer};
use arrow_data::ArrayData;
use arrow_schema::{DataType, Field, UnionMode};
use log::{debug, trace};

use super::{
    is_fixed_width,
    metadata::{BodyMetadata, BufferRegion, FieldNode},
};
use crate::{
    config::MetadataVersion,
    errors::{decode_err, ViewResult},
};

/// Reconstructs column chunks from a message body.
///
/// Fields are visited depth first. Each field consumes one [`FieldNode`] and the buffer regions of
/// its layout, in order:
///
/// | type                                  | regions                                     |
/// |---------------------------------------|---------------------------------------------|
/// | `Null`                                | none                                        |
/// | fixed width, `Boolean`                | validity, data                              |
/// | `Utf8`, `Binary` and their large forms| validity, offsets, data                     |
/// | `Utf8View`, `BinaryView`              | validity, views, one per variadic buffer    |
/// | `List`, `LargeList`, `Map`            | validity, offsets, then the child           |
/// | `FixedSizeList`                       | validity, then the child                    |
/// | `ListView`, `LargeListView`           | validity, offsets, sizes, then the child    |
/// | `Struct`                              | validity, then every child                  |
/// | `Union`                               | type ids, offsets (dense), then every child |
/// | `Dictionary`                          | validity, indices                           |
///
/// The validity region is consumed even when the field has no nulls. The number of variadic
/// buffers of view fields is taken from [`BodyMetadata::variadic_counts`] in field order, and is
/// 0 for fields past the end of that list.
///
/// Buffers are zero-copy slices of the body, except for slices that are not aligned for their
/// element type, which are copied.
pub struct VectorLoader<'a> {
    body: &'a Buffer,
    metadata: &'a BodyMetadata,
    dictionaries: &'a HashMap<i64, ArrayData>,
    metadata_version: MetadataVersion,
    next_node: usize,
    next_buffer: usize,
    next_variadic_count: usize,
}

impl<'a> VectorLoader<'a> {
    pub fn new(
        body: &'a Buffer,
        metadata: &'a BodyMetadata,
        dictionaries: &'a HashMap<i64, ArrayData>,
    ) -> Self {
        Self {
            body,
            metadata,
            dictionaries,
            metadata_version: MetadataVersion::default(),
            next_node: 0,
            next_buffer: 0,
            next_variadic_count: 0,
        }
    }

    pub fn with_metadata_version(mut self, metadata_version: MetadataVersion) -> Self {
        self.metadata_version = metadata_version;
        self
    }

    /// Loads one column per field.
    pub fn load<'f>(
        &mut self,
        fields: impl IntoIterator<Item = &'f Field>,
    ) -> ViewResult<Vec<ArrayData>> {
        let columns = fields
            .into_iter()
            .map(|field| self.visit(field))
            .collect::<ViewResult<Vec<_>>>()?;
        if self.next_node < self.metadata.nodes.len()
            || self.next_buffer < self.metadata.buffers.len()
        {
            debug!(
                "Body has {} unread field nodes and {} unread buffer regions",
                self.metadata.nodes.len() - self.next_node,
                self.metadata.buffers.len() - self.next_buffer
            );
        }
        Ok(columns)
    }

    /// Loads the column of `field` and, recursively, its children.
    pub fn visit(&mut self, field: &Field) -> ViewResult<ArrayData> {
        let data_type = field.data_type();
        let node = self.next_node(field)?;
        trace!(
            "Loading field {} ({data_type}) with {} rows",
            field.name(),
            node.length
        );

        let mut builder = ArrayData::builder(data_type.clone()).len(node.length);
        match data_type {
            DataType::Null => {}
            dt if is_fixed_width(dt) => {
                let nulls = self.read_nulls(&node)?;
                builder = builder.nulls(nulls).add_buffer(self.read_buffer()?);
            }
            DataType::Utf8 | DataType::Binary | DataType::LargeUtf8 | DataType::LargeBinary => {
                let nulls = self.read_nulls(&node)?;
                builder = builder
                    .nulls(nulls)
                    .add_buffer(self.read_buffer()?)
                    .add_buffer(self.read_buffer()?);
            }
            DataType::Utf8View | DataType::BinaryView => {
                let nulls = self.read_nulls(&node)?;
                builder = builder.nulls(nulls).add_buffer(self.read_buffer()?);
                let count = self.next_variadic_count();
                for _ in 0..count {
                    builder = builder.add_buffer(self.read_buffer()?);
                }
            }
            DataType::List(child) | DataType::LargeList(child) | DataType::Map(child, _) => {
                let nulls = self.read_nulls(&node)?;
                builder = builder.nulls(nulls).add_buffer(self.read_buffer()?);
                builder = builder.add_child_data(self.visit(child)?);
            }
            DataType::FixedSizeList(child, _) => {
                let nulls = self.read_nulls(&node)?;
                builder = builder.nulls(nulls).add_child_data(self.visit(child)?);
            }
            DataType::ListView(child) | DataType::LargeListView(child) => {
                let nulls = self.read_nulls(&node)?;
                builder = builder
                    .nulls(nulls)
                    .add_buffer(self.read_buffer()?)
                    .add_buffer(self.read_buffer()?);
                builder = builder.add_child_data(self.visit(child)?);
            }
            DataType::Struct(children) => {
                let nulls = self.read_nulls(&node)?;
                builder = builder.nulls(nulls);
                for child in children {
                    builder = builder.add_child_data(self.visit(child)?);
                }
            }
            DataType::Union(children, mode) => {
                if self.metadata_version < MetadataVersion::V5 {
                    // unions had a validity buffer before V5, it is always empty
                    self.next_region()?;
                }
                builder = builder.add_buffer(self.read_buffer()?);
                if *mode == UnionMode::Dense {
                    builder = builder.add_buffer(self.read_buffer()?);
                }
                for (_, child) in children.iter() {
                    builder = builder.add_child_data(self.visit(child)?);
                }
            }
            DataType::Dictionary(_, value_type) => {
                let nulls = self.read_nulls(&node)?;
                builder = builder.nulls(nulls).add_buffer(self.read_buffer()?);
                #[allow(deprecated)]
                let Some(dict_id) = field.dict_id() else {
                    decode_err!("Dictionary field {} has no dictionary id", field.name())
                };
                let Some(dictionary) = self.dictionaries.get(&dict_id) else {
                    decode_err!("No dictionary with id {dict_id} for field {}", field.name())
                };
                if dictionary.data_type() != value_type.as_ref() {
                    decode_err!(
                        "Dictionary {dict_id} has type {}, expected {value_type}",
                        dictionary.data_type()
                    )
                }
                builder = builder.add_child_data(dictionary.clone());
            }
            other => decode_err!("Unsupported data type in message body: {other}"),
        }
        Ok(builder.align_buffers(true).build()?)
    }

    fn next_node(&mut self, field: &Field) -> ViewResult<FieldNode> {
        let Some(node) = self.metadata.nodes.get(self.next_node) else {
            decode_err!(
                "Missing field node {} for field {}",
                self.next_node,
                field.name()
            )
        };
        if node.null_count > node.length {
            decode_err!(
                "Field {} declares {} nulls in {} rows",
                field.name(),
                node.null_count,
                node.length
            )
        }
        self.next_node += 1;
        Ok(*node)
    }

    fn next_region(&mut self) -> ViewResult<BufferRegion> {
        let Some(region) = self.metadata.buffers.get(self.next_buffer) else {
            decode_err!("Missing buffer region {}", self.next_buffer)
        };
        match region.offset.checked_add(region.length) {
            Some(end) if end <= self.body.len() => {}
            _ => decode_err!(
                "Buffer region {} ({}..+{}) is outside of the {} byte body",
                self.next_buffer,
                region.offset,
                region.length,
                self.body.len()
            ),
        }
        self.next_buffer += 1;
        Ok(*region)
    }

    fn read_buffer(&mut self) -> ViewResult<Buffer> {
        let region = self.next_region()?;
        let buffer = self.body.slice_with_length(region.offset, region.length);
        if buffer.as_ptr().align_offset(8) != 0 {
            trace!(
                "Buffer region at offset {} is not 8-byte aligned and may be copied",
                region.offset
            );
        }
        Ok(buffer)
    }

    fn next_variadic_count(&mut self) -> usize {
        let count = self
            .metadata
            .variadic_counts
            .get(self.next_variadic_count)
            .copied()
            .unwrap_or(0);
        self.next_variadic_count += 1;
        count
    }

    /// Consumes the validity region of `node`, returning the null buffer if the field has nulls.
    fn read_nulls(&mut self, node: &FieldNode) -> ViewResult<Option<NullBuffer>> {
        let buffer = self.read_buffer()?;
        if node.null_count == 0 {
            return Ok(None);
        }
        if buffer.len() * 8 < node.length {
            decode_err!(
                "Validity buffer of {} bytes is too short for {} rows",
                buffer.len(),
                node.length
            )
        }
        let nulls = NullBuffer::new(BooleanBuffer::new(buffer, 0, node.length));
        if nulls.null_count() != node.null_count {
            decode_err!(
                "Field node declares {} nulls but the validity buffer has {}",
                node.null_count,
                nulls.null_count()
            )
        }
        Ok(Some(nulls))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow_array::{
        cast::AsArray,
        make_array,
        types::{Int32Type, Int8Type},
        Array,
    };
    use arrow_buffer::ToByteSlice;
    use arrow_schema::{Fields, UnionFields};

    use super::*;
    use crate::{common::bit, errors::ViewError};

    /// Concatenates `parts` into a body, padding each to 8 bytes, and returns the regions.
    fn make_body(parts: &[&[u8]]) -> (Buffer, Vec<BufferRegion>) {
        let mut bytes = vec![];
        let mut regions = vec![];
        for part in parts {
            regions.push(BufferRegion::new(bytes.len(), part.len()));
            bytes.extend_from_slice(part);
            bytes.resize(bit::round_upto_power_of_2(bytes.len(), 8), 0);
        }
        (Buffer::from_vec(bytes), regions)
    }

    fn load(field: Field, body: &Buffer, metadata: &BodyMetadata) -> ViewResult<ArrayData> {
        let dictionaries = HashMap::new();
        VectorLoader::new(body, metadata, &dictionaries).visit(&field)
    }

    #[test]
    fn list_view_arbitrary_addressing() {
        let child_values: [i8; 7] = [0, -127, 127, 50, 12, -7, 25];
        let offsets: [i32; 5] = [4, 7, 0, 0, 3];
        let sizes: [i32; 5] = [3, 0, 4, 0, 2];
        let validity = bit::pack_bools([true, false, true, true, true]);
        assert_eq!(validity, vec![0b00011101]);

        let (body, buffers) = make_body(&[
            &validity,
            offsets.to_byte_slice(),
            sizes.to_byte_slice(),
            &[],
            child_values.to_byte_slice(),
        ]);
        let metadata = BodyMetadata {
            nodes: vec![FieldNode::new(5, 1), FieldNode::new(7, 0)],
            buffers,
            variadic_counts: vec![],
        };
        let item = Arc::new(Field::new("item", DataType::Int8, true));
        let field = Field::new("list", DataType::ListView(item), true);
        let data = load(field, &body, &metadata).unwrap();

        let array = make_array(data);
        let list = array.as_list_view::<i32>();
        let rows: Vec<Option<Vec<i8>>> = (0..list.len())
            .map(|i| {
                list.is_valid(i)
                    .then(|| list.value(i).as_primitive::<Int8Type>().values().to_vec())
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                Some(vec![12, -7, 25]),
                None,
                Some(vec![0, -127, 127, 50]),
                Some(vec![]),
                Some(vec![50, 12]),
            ]
        );
    }

    #[test]
    fn views_with_variadic_buffers() {
        let long = b"a value longer than twelve bytes";
        let mut views = vec![];
        views.extend_from_slice(&crate::data_type::View::inline(b"short").to_bytes());
        views.extend_from_slice(&crate::data_type::View::reference(long, 1, 0).to_bytes());

        let (body, buffers) = make_body(&[&[], &views, b"unused", long]);
        let metadata = BodyMetadata {
            nodes: vec![FieldNode::new(2, 0)],
            buffers,
            variadic_counts: vec![2],
        };
        let data = load(Field::new("s", DataType::Utf8View, true), &body, &metadata).unwrap();
        assert_eq!(data.buffers().len(), 3);
        let array = make_array(data);
        let strings = array.as_string_view();
        assert_eq!(strings.value(0), "short");
        assert_eq!(strings.value(1).as_bytes(), long);
    }

    #[test]
    fn missing_variadic_count_defaults_to_zero() {
        let views = crate::data_type::View::inline(b"abc").to_bytes();
        let (body, buffers) = make_body(&[&[], &views]);
        let metadata = BodyMetadata {
            nodes: vec![FieldNode::new(1, 0)],
            buffers,
            variadic_counts: vec![],
        };
        let data = load(Field::new("b", DataType::BinaryView, true), &body, &metadata).unwrap();
        assert_eq!(data.buffers().len(), 1);
    }

    #[test]
    fn variadic_count_past_the_regions() {
        let views = crate::data_type::View::inline(b"abc").to_bytes();
        let (body, buffers) = make_body(&[&[], &views]);
        let metadata = BodyMetadata {
            nodes: vec![FieldNode::new(1, 0)],
            buffers,
            variadic_counts: vec![3],
        };
        let err = load(Field::new("b", DataType::BinaryView, true), &body, &metadata).unwrap_err();
        assert!(matches!(err, ViewError::Decode(_)), "{err}");
    }

    #[test]
    fn null_count_must_match_bitmap() {
        let values = [1i32, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        // one byte of validity cannot cover ten rows
        let (body, buffers) = make_body(&[&[0xFF], values.to_byte_slice()]);
        let metadata = BodyMetadata {
            nodes: vec![FieldNode::new(10, 1)],
            buffers,
            variadic_counts: vec![],
        };
        let field = Field::new("i", DataType::Int32, true);
        let err = load(field.clone(), &body, &metadata).unwrap_err();
        assert!(matches!(err, ViewError::Decode(_)), "{err}");

        let (body, buffers) = make_body(&[&[0xFF, 0x03], values.to_byte_slice()]);
        let metadata = BodyMetadata {
            nodes: vec![FieldNode::new(10, 1)],
            buffers,
            variadic_counts: vec![],
        };
        let err = load(field.clone(), &body, &metadata).unwrap_err();
        assert!(matches!(err, ViewError::Decode(_)), "{err}");

        // no nulls declared: the validity region is skipped whatever it holds
        let metadata = BodyMetadata {
            nodes: vec![FieldNode::new(10, 0)],
            ..metadata
        };
        let data = load(field, &body, &metadata).unwrap();
        assert_eq!(data.null_count(), 0);
    }

    #[test]
    fn malformed_metadata() {
        let (body, buffers) = make_body(&[&[], &[1, 0, 0, 0]]);
        let field = Field::new("i", DataType::Int32, true);

        let metadata = BodyMetadata {
            nodes: vec![],
            buffers: buffers.clone(),
            variadic_counts: vec![],
        };
        assert!(matches!(
            load(field.clone(), &body, &metadata),
            Err(ViewError::Decode(_))
        ));

        let metadata = BodyMetadata {
            nodes: vec![FieldNode::new(1, 0)],
            buffers: buffers[..1].to_vec(),
            variadic_counts: vec![],
        };
        assert!(matches!(
            load(field.clone(), &body, &metadata),
            Err(ViewError::Decode(_))
        ));

        let metadata = BodyMetadata {
            nodes: vec![FieldNode::new(1, 0)],
            buffers: vec![BufferRegion::new(0, 0), BufferRegion::new(4, 1024)],
            variadic_counts: vec![],
        };
        assert!(matches!(
            load(field, &body, &metadata),
            Err(ViewError::Decode(_))
        ));
    }

    #[test]
    fn union_validity_depends_on_version() {
        let type_ids: [i8; 2] = [0, 0];
        let values: [i32; 2] = [5, 6];
        let fields = UnionFields::new(vec![0], vec![Field::new("a", DataType::Int32, true)]);
        let field = Field::new("u", DataType::Union(fields, UnionMode::Sparse), false);
        let dictionaries = HashMap::new();

        let (body, buffers) = make_body(&[type_ids.to_byte_slice(), &[], values.to_byte_slice()]);
        let metadata = BodyMetadata {
            nodes: vec![FieldNode::new(2, 0), FieldNode::new(2, 0)],
            buffers,
            variadic_counts: vec![],
        };
        let data = VectorLoader::new(&body, &metadata, &dictionaries)
            .visit(&field)
            .unwrap();
        assert_eq!(data.child_data()[0].buffers()[0].typed_data::<i32>(), &[5, 6]);

        let (body, buffers) = make_body(&[&[], type_ids.to_byte_slice(), &[], values.to_byte_slice()]);
        let metadata = BodyMetadata {
            nodes: vec![FieldNode::new(2, 0), FieldNode::new(2, 0)],
            buffers,
            variadic_counts: vec![],
        };
        let data = VectorLoader::new(&body, &metadata, &dictionaries)
            .with_metadata_version(MetadataVersion::V4)
            .visit(&field)
            .unwrap();
        assert_eq!(data.child_data()[0].buffers()[0].typed_data::<i32>(), &[5, 6]);
    }

    #[test]
    fn dictionary_lookup() {
        let offsets: [i32; 3] = [0, 1, 2];
        let (body, buffers) = make_body(&[&[], offsets.to_byte_slice(), b"ab"]);
        let metadata = BodyMetadata {
            nodes: vec![FieldNode::new(2, 0)],
            buffers,
            variadic_counts: vec![],
        };
        let values = load(Field::new("v", DataType::Utf8, false), &body, &metadata).unwrap();
        let dictionaries = HashMap::from([(7, values)]);

        let keys: [i32; 3] = [1, 0, 1];
        let (body, buffers) = make_body(&[&[], keys.to_byte_slice()]);
        let metadata = BodyMetadata {
            nodes: vec![FieldNode::new(3, 0)],
            buffers,
            variadic_counts: vec![],
        };
        #[allow(deprecated)]
        let field = Field::new_dict(
            "d",
            DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
            true,
            7,
            false,
        );
        let data = VectorLoader::new(&body, &metadata, &dictionaries)
            .visit(&field)
            .unwrap();
        let array = make_array(data);
        let dict = array.as_dictionary::<Int32Type>();
        assert_eq!(dict.values().as_string::<i32>().value(1), "b");
        assert_eq!(dict.keys().values(), &[1, 0, 1]);

        let err = VectorLoader::new(&body, &metadata, &HashMap::new())
            .visit(&field)
            .unwrap_err();
        assert!(matches!(err, ViewError::Decode(_)), "{err}");
    }

    #[test]
    fn nested_struct() {
        let (body, buffers) = make_body(&[&[], &[], &[1, 0, 0, 0, 2, 0, 0, 0]]);
        let metadata = BodyMetadata {
            nodes: vec![FieldNode::new(2, 0), FieldNode::new(2, 0)],
            buffers,
            variadic_counts: vec![],
        };
        let field = Field::new_struct(
            "s",
            Fields::from(vec![Field::new("x", DataType::Int32, false)]),
            true,
        );
        let data = load(field, &body, &metadata).unwrap();
        assert_eq!(data.child_data().len(), 1);
        assert_eq!(data.child_data()[0].buffers()[0].typed_data::<i32>(), &[1, 2]);
    }
}
