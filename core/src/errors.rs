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

//! Common errors and macros.

use arrow::error::ArrowError;
use arrow_schema::DataType;

use std::{
    num::{ParseFloatError, ParseIntError},
    result,
    str::Utf8Error,
};

#[derive(thiserror::Error, Debug)]
pub enum ViewError {
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Raised when a builder tree is wired up in a way its type does not allow, e.g. a second
    /// child bound to a list-view builder.
    #[error("Schema Error: {0}")]
    Schema(String),

    /// Raised when IPC or JSON metadata does not line up with the data it describes.
    #[error("Decode Error: {0}")]
    Decode(String),

    #[error("Invalid value for {data_type}: {value}")]
    InvalidValue { data_type: DataType, value: String },

    #[error("Builder for {0} has already been finished")]
    Finished(DataType),

    #[error("Unsupported data type: {0}")]
    UnsupportedType(DataType),

    #[error(transparent)]
    Arrow {
        #[from]
        source: ArrowError,
    },

    #[error(transparent)]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Hex {
        #[from]
        source: hex::FromHexError,
    },

    #[error(transparent)]
    Format {
        #[from]
        source: Utf8Error,
    },

    #[error(transparent)]
    NumberIntFormat {
        #[from]
        source: ParseIntError,
    },

    #[error(transparent)]
    NumberFloatFormat {
        #[from]
        source: ParseFloatError,
    },
}

pub type ViewResult<T> = result::Result<T, ViewError>;

/// Returns early with a [`ViewError::Decode`] built from a format string.
macro_rules! decode_err {
    ($($arg:tt)*) => {
        return Err($crate::errors::ViewError::Decode(format!($($arg)*)))
    };
}

pub(crate) use decode_err;
