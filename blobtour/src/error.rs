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
use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Failures that end the tour.
///
/// Failures of individual commands are printed and never surface here.
#[derive(Error, Debug)]
pub enum TourError {
    /// Missing credentials or a malformed endpoint.
    #[error("startup configuration failed: {0}")]
    StartupConfiguration(#[source] blobtour_core::Error),

    /// The sample or download file could not be created, written or read.
    #[error("{context}: {source}")]
    LocalIo {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The storage account could not be prepared before the command loop.
    #[error("preparing the storage account failed: {0}")]
    Remote(#[source] blobtour_core::Error),
}

impl TourError {
    pub(crate) fn local_io(context: impl Into<String>, source: io::Error) -> Self {
        TourError::LocalIo {
            context: context.into(),
            source,
        }
    }

    /// Process exit code reported for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            TourError::StartupConfiguration(_) => 1,
            TourError::LocalIo { .. } => 2,
            TourError::Remote(_) => 3,
        }
    }
}

impl From<&TourError> for ExitCode {
    fn from(err: &TourError) -> Self {
        ExitCode::from(err.exit_code())
    }
}
