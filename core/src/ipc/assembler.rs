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

use arrow_buffer::{Buffer, MutableBuffer};
use arrow_data::ArrayData;
use arrow_schema::{DataType, UnionMode};
use log::debug;

use super::{
    is_fixed_width,
    metadata::{BodyMetadata, BufferRegion, FieldNode},
};
use crate::{
    common::bit,
    config::MetadataVersion,
    errors::{decode_err, ViewResult},
};

/// A message body together with the metadata describing it.
#[derive(Clone, Debug)]
pub struct IpcBody {
    pub body: Buffer,
    pub metadata: BodyMetadata,
}

/// Writes `columns` into one message body, in the order [`super::VectorLoader`] reads them back.
/// Every buffer starts at a multiple of 8 bytes.
pub fn assemble(columns: &[ArrayData], metadata_version: MetadataVersion) -> ViewResult<IpcBody> {
    let mut assembler = BodyAssembler {
        body: MutableBuffer::new(0),
        metadata: BodyMetadata::default(),
        metadata_version,
    };
    for column in columns {
        assembler.visit(column)?;
    }
    debug!(
        "Assembled body of {} bytes: {} field nodes, {} buffers",
        assembler.body.len(),
        assembler.metadata.nodes.len(),
        assembler.metadata.buffers.len()
    );
    Ok(IpcBody {
        body: assembler.body.into(),
        metadata: assembler.metadata,
    })
}

struct BodyAssembler {
    body: MutableBuffer,
    metadata: BodyMetadata,
    metadata_version: MetadataVersion,
}

impl BodyAssembler {
    fn visit(&mut self, data: &ArrayData) -> ViewResult<()> {
        if data.offset() != 0 {
            decode_err!(
                "Cannot write a {} column with non-zero offset {}",
                data.data_type(),
                data.offset()
            )
        }
        self.metadata
            .nodes
            .push(FieldNode::new(data.len(), data.null_count()));

        match data.data_type() {
            DataType::Null => {}
            dt if is_fixed_width(dt) => {
                self.write_nulls(data);
                self.write_buffers(data, 1)?;
            }
            DataType::Utf8 | DataType::Binary | DataType::LargeUtf8 | DataType::LargeBinary => {
                self.write_nulls(data);
                self.write_buffers(data, 2)?;
            }
            DataType::Utf8View | DataType::BinaryView => {
                self.write_nulls(data);
                let count = data.buffers().len();
                self.write_buffers(data, count)?;
                self.metadata.variadic_counts.push(count - 1);
            }
            DataType::List(_) | DataType::LargeList(_) | DataType::Map(_, _) => {
                self.write_nulls(data);
                self.write_buffers(data, 1)?;
                self.write_children(data)?;
            }
            DataType::FixedSizeList(_, _) | DataType::Struct(_) => {
                self.write_nulls(data);
                self.write_children(data)?;
            }
            DataType::ListView(_) | DataType::LargeListView(_) => {
                self.write_nulls(data);
                self.write_buffers(data, 2)?;
                self.write_children(data)?;
            }
            DataType::Union(_, mode) => {
                if self.metadata_version < MetadataVersion::V5 {
                    self.write_region(&[]);
                }
                let count = if *mode == UnionMode::Dense { 2 } else { 1 };
                self.write_buffers(data, count)?;
                self.write_children(data)?;
            }
            DataType::Dictionary(_, _) => {
                self.write_nulls(data);
                self.write_buffers(data, 1)?;
            }
            other => decode_err!("Unsupported data type in message body: {other}"),
        }
        Ok(())
    }

    fn write_region(&mut self, bytes: &[u8]) {
        let offset = self.body.len();
        self.body.extend_from_slice(bytes);
        let padded = bit::round_upto_power_of_2(self.body.len(), 8);
        self.body.resize(padded, 0);
        self.metadata
            .buffers
            .push(BufferRegion::new(offset, bytes.len()));
    }

    /// Writes the validity bitmap, or an empty region when there are no nulls.
    fn write_nulls(&mut self, data: &ArrayData) {
        match data.nulls().filter(|n| n.null_count() > 0) {
            Some(nulls) => {
                let inner = nulls.inner();
                let bytes = bit::ceil(inner.offset() + inner.len(), 8);
                if inner.offset() == 0 {
                    let values = inner.values();
                    self.write_region(&values[..bytes]);
                } else {
                    let packed = bit::pack_bools(inner.iter());
                    self.write_region(&packed);
                }
            }
            None => self.write_region(&[]),
        }
    }

    fn write_buffers(&mut self, data: &ArrayData, count: usize) -> ViewResult<()> {
        if data.buffers().len() < count {
            decode_err!(
                "{} column has {} buffers, expected {count}",
                data.data_type(),
                data.buffers().len()
            )
        }
        for buffer in &data.buffers()[..count] {
            self.write_region(buffer.as_slice());
        }
        Ok(())
    }

    fn write_children(&mut self, data: &ArrayData) -> ViewResult<()> {
        for child in data.child_data() {
            self.visit(child)?;
        }
        Ok(())
    }
}
