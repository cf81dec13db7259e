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
use std::sync::Arc;

use blobtour_core::Result;
use http::StatusCode;

use crate::blob_core::BlobCore;
use crate::error::parse_error;
use crate::{BlobClient, BlobLister};

/// Handle to a single container.
#[derive(Clone, Debug)]
pub struct ContainerClient {
    core: Arc<BlobCore>,
    name: String,
}

impl ContainerClient {
    pub(crate) fn new(core: Arc<BlobCore>, name: &str) -> Self {
        Self {
            core,
            name: name.to_string(),
        }
    }

    /// Container name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URL of the container on the primary endpoint.
    pub fn url(&self) -> String {
        self.core.container_url(&self.name)
    }

    /// Create the container.
    pub async fn create(&self) -> Result<()> {
        let resp = self.core.create_container(&self.name).await?;
        match resp.status() {
            StatusCode::CREATED => Ok(()),
            _ => Err(parse_error(resp)),
        }
    }

    /// Delete the container and every blob in it.
    pub async fn delete(&self) -> Result<()> {
        let resp = self.core.delete_container(&self.name).await?;
        match resp.status() {
            StatusCode::ACCEPTED => Ok(()),
            _ => Err(parse_error(resp)),
        }
    }

    /// List blobs and their snapshots, `page_size` at a time.
    ///
    /// Listings are served by the configured read location.
    pub fn list_blobs(&self, page_size: Option<usize>) -> BlobLister {
        BlobLister::new(self.core.clone(), &self.name, page_size)
    }

    /// Bind a handle to the blob `name` without any request.
    pub fn blob_client(&self, name: &str) -> BlobClient {
        BlobClient::new(self.core.clone(), &self.name, name)
    }
}
