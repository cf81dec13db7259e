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
//! An interactive walk through Azure Blob Storage.
//!
//! The tour creates a container, then reads single letter commands: `P` uploads a sample
//! file, `L` lists the blobs, `G` downloads the blob, `D` deletes it and `E` cleans
//! everything up and exits. Commands run in the background, so the prompt comes back
//! before they finish and their output may interleave.

mod app;
pub use app::Tour;

mod command;
pub use command::{Command, Dispatcher, State};

mod config;
pub use config::{TutorialConfig, BLOBTOUR_CONTAINER};

mod console;
pub use console::{BufferConsole, Console, StdoutConsole};

mod error;
pub use error::TourError;

mod files;
pub use files::SampleFiles;

pub mod handlers;
