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
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::TempPath;

use crate::TourError;

/// The two local files of the tour: the upload source and the download target.
///
/// Both live in the system temp directory and are removed when dropped.
#[derive(Debug)]
pub struct SampleFiles {
    sample: TempPath,
    download: Option<TempPath>,
    download_path: PathBuf,
}

impl SampleFiles {
    /// Create `HelloWorld*.txt` holding `content` and an empty `downloadedFile*.txt`.
    pub fn create(content: &str) -> Result<Self, TourError> {
        let mut sample = tempfile::Builder::new()
            .prefix("HelloWorld")
            .suffix(".txt")
            .tempfile()
            .map_err(|e| TourError::local_io("create sample file", e))?;
        sample
            .write_all(content.as_bytes())
            .and_then(|_| sample.flush())
            .map_err(|e| TourError::local_io("write sample file", e))?;

        let download = tempfile::Builder::new()
            .prefix("downloadedFile")
            .suffix(".txt")
            .tempfile()
            .map_err(|e| TourError::local_io("create download file", e))?
            .into_temp_path();
        let download_path = absolute(&download)?;
        debug!("download target is {}", download_path.display());

        Ok(Self {
            sample: sample.into_temp_path(),
            download: Some(download),
            download_path,
        })
    }

    /// Absolute path of the sample file.
    pub fn sample_path(&self) -> &Path {
        &self.sample
    }

    /// Absolute path of the download file.
    pub fn download_path(&self) -> &Path {
        &self.download_path
    }

    /// Delete the download file now instead of on drop.
    ///
    /// Deleting twice is a no-op.
    pub fn remove_download(&mut self) -> Result<(), TourError> {
        match self.download.take() {
            Some(path) => path
                .close()
                .map_err(|e| TourError::local_io("delete download file", e)),
            None => Ok(()),
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf, TourError> {
    std::path::absolute(path).map_err(|e| TourError::local_io("resolve download file path", e))
}
