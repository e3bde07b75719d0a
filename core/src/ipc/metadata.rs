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

use serde::{Deserialize, Serialize};

/// Logical row count and null count of one field of a record batch body.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNode {
    pub length: usize,
    pub null_count: usize,
}

impl FieldNode {
    pub fn new(length: usize, null_count: usize) -> Self {
        Self { length, null_count }
    }
}

/// A byte range within a message body.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferRegion {
    pub offset: usize,
    pub length: usize,
}

impl BufferRegion {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Describes how a message body is laid out: field nodes and buffer regions in depth-first field
/// order, plus the number of variadic buffers of each view typed field in the same order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyMetadata {
    pub nodes: Vec<FieldNode>,
    pub buffers: Vec<BufferRegion>,
    #[serde(default)]
    pub variadic_counts: Vec<usize>,
}
