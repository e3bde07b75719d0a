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

//! Reading and writing column chunks as IPC message bodies: a flat byte buffer described by field
//! nodes, buffer regions and variadic buffer counts.

mod assembler;
mod loader;
mod metadata;

pub use assembler::*;
pub use loader::*;
pub use metadata::*;

use arrow_schema::DataType;

/// Types laid out as a validity bitmap followed by a single data buffer.
pub(crate) fn is_fixed_width(data_type: &DataType) -> bool {
    data_type.primitive_width().is_some()
        || matches!(data_type, DataType::Boolean | DataType::FixedSizeBinary(_))
}
