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

use crate::errors::{ViewError, ViewResult};

/// Soft cap on the size of one variadic data buffer written by view builders.
pub const DEFAULT_VARIADIC_BUFFER_SIZE: usize = 32 * 1024 * 1024;

pub const VARIADIC_BUFFER_SIZE_KEY: &str = "view.variadic_buffer_size";
pub const METADATA_VERSION_KEY: &str = "ipc.metadata_version";

/// IPC metadata version of the message a body was written with. Only the union layout differs
/// between the versions this crate reads.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum MetadataVersion {
    /// Unions carry a validity buffer.
    V4,
    #[default]
    V5,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewConfig {
    pub variadic_buffer_size: usize,
    pub metadata_version: MetadataVersion,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            variadic_buffer_size: DEFAULT_VARIADIC_BUFFER_SIZE,
            metadata_version: MetadataVersion::default(),
        }
    }
}

impl ViewConfig {
    /// Builds a config from string settings. Missing keys keep their defaults.
    pub fn from_map(settings: &HashMap<String, String>) -> ViewResult<Self> {
        let mut config = Self::default();
        for (key, value) in settings {
            match key.as_str() {
                VARIADIC_BUFFER_SIZE_KEY => {
                    let size: usize = value.trim().parse().map_err(|_| {
                        ViewError::Config(format!("Invalid {VARIADIC_BUFFER_SIZE_KEY}: {value}"))
                    })?;
                    if size == 0 || size > i32::MAX as usize {
                        return Err(ViewError::Config(format!(
                            "{VARIADIC_BUFFER_SIZE_KEY} must be in (0, {}], got {size}",
                            i32::MAX
                        )));
                    }
                    config.variadic_buffer_size = size;
                }
                METADATA_VERSION_KEY => {
                    config.metadata_version = match value.trim().to_ascii_uppercase().as_str() {
                        "V4" => MetadataVersion::V4,
                        "V5" => MetadataVersion::V5,
                        _ => {
                            return Err(ViewError::Config(format!(
                                "Unsupported metadata version: {value}"
                            )))
                        }
                    }
                }
                _ => {
                    return Err(ViewError::Config(format!(
                        "Unknown configuration key: {key}"
                    )))
                }
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults() {
        let config = ViewConfig::from_map(&HashMap::new()).unwrap();
        assert_eq!(config.variadic_buffer_size, 32 * 1024 * 1024);
        assert_eq!(config.metadata_version, MetadataVersion::V5);
    }

    #[test]
    fn parse_settings() {
        let config = ViewConfig::from_map(&settings(&[
            (VARIADIC_BUFFER_SIZE_KEY, "1024"),
            (METADATA_VERSION_KEY, "v4"),
        ]))
        .unwrap();
        assert_eq!(config.variadic_buffer_size, 1024);
        assert_eq!(config.metadata_version, MetadataVersion::V4);
    }

    #[test]
    fn reject_bad_settings() {
        for pairs in [
            [(VARIADIC_BUFFER_SIZE_KEY, "0")],
            [(VARIADIC_BUFFER_SIZE_KEY, "lots")],
            [(METADATA_VERSION_KEY, "V3")],
            [("view.unknown", "1")],
        ] {
            let err = ViewConfig::from_map(&settings(&pairs)).unwrap_err();
            assert!(matches!(err, ViewError::Config(_)), "{err}");
        }
    }
}
