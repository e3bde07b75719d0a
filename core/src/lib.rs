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

//! Builders and codecs for the Arrow view layouts: `BinaryView`, `Utf8View`, `ListView` and
//! `LargeListView`.
//!
//! Column chunks are [`arrow_data::ArrayData`]. They are produced by the builders in
//! [`builder`], moved through IPC message bodies by [`ipc`] and through the JSON integration
//! format by [`json`].

use log::{info, LevelFilter};
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{load_config_file, Appender, Deserializers, Root},
    encode::pattern::PatternEncoder,
    Config,
};

use crate::errors::{ViewError, ViewResult};

pub mod builder;
pub mod common;
pub mod config;
pub mod data_type;
pub mod errors;
pub mod ipc;
pub mod json;

pub use data_type::*;

/// Initializes logging from the log4rs config file at `path`, or logs to stderr at `INFO`
/// when no path is given.
///
/// Fails if a global logger has already been installed.
pub fn init_logging(path: Option<&str>) -> ViewResult<()> {
    let log_config = match path.filter(|p| !p.is_empty()) {
        Some(path) => load_config_file(path, Deserializers::default())
            .map_err(|err| ViewError::Config(err.to_string()))?,
        None => default_logger_config()?,
    };
    log4rs::init_config(log_config).map_err(|err| ViewError::Config(err.to_string()))?;

    info!("arrow-views logging initialized");
    Ok(())
}

const LOG_PATTERN: &str = "{d(%y/%m/%d %H:%M:%S)} {l} {f}: {m}{n}";

// Creates a default log4rs config, which logs to console with `INFO` level.
fn default_logger_config() -> ViewResult<Config> {
    let console_append = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    let appender = Appender::builder().build("console", Box::new(console_append));
    let root = Root::builder().appender("console").build(LevelFilter::Info);
    Config::builder()
        .appender(appender)
        .build(root)
        .map_err(|err| ViewError::Config(err.to_string()))
}
