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
use std::collections::VecDeque;
use std::sync::Arc;

use blobtour_core::time::{parse_http_date, DateTime};
use blobtour_core::{Error, Result};
use bytes::{Buf, Bytes};
use http::StatusCode;
use log::debug;
use quick_xml::de;
use serde::Deserialize;

use crate::blob_core::BlobCore;
use crate::error::{parse_error, strip_bom};

/// A blob as reported by a container listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobItem {
    /// Blob name.
    pub name: String,
    /// Snapshot timestamp, set only for snapshot entries.
    pub snapshot: Option<String>,
    /// Size of the blob in bytes.
    pub content_length: u64,
    /// Content type, empty if the service did not report one.
    pub content_type: String,
    /// Entity tag.
    pub etag: String,
    /// Last modification time.
    pub last_modified: Option<DateTime>,
}

/// A container as reported by a service listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerItem {
    /// Container name.
    pub name: String,
}

/// Lazily pages through the blobs of a container, snapshots included.
///
/// A page is only requested once the previous one has been drained; items come out in
/// listing order and each exactly once.
#[derive(Debug)]
pub struct BlobLister {
    core: Arc<BlobCore>,
    container: String,
    page_size: Option<usize>,

    next_marker: String,
    done: bool,
    buffer: VecDeque<BlobItem>,
}

impl BlobLister {
    pub(crate) fn new(core: Arc<BlobCore>, container: &str, page_size: Option<usize>) -> Self {
        Self {
            core,
            container: container.to_string(),
            page_size,

            next_marker: "".to_string(),
            done: false,
            buffer: VecDeque::new(),
        }
    }

    /// Fetch the next page, `None` once the listing is exhausted.
    ///
    /// Items still buffered by [`BlobLister::next_blob`] are returned first.
    pub async fn next_page(&mut self) -> Result<Option<Vec<BlobItem>>> {
        if !self.buffer.is_empty() {
            return Ok(Some(self.buffer.drain(..).collect()));
        }
        if self.done {
            return Ok(None);
        }

        let resp = self
            .core
            .list_blobs(&self.container, &self.next_marker, self.page_size)
            .await?;
        if resp.status() != StatusCode::OK {
            return Err(parse_error(resp));
        }

        let output: ListBlobsOutput = deserialize(resp.into_body())?;
        self.advance(output.next_marker);

        let items = output
            .blobs
            .blob
            .into_iter()
            .map(BlobItem::try_from)
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "listed {} blobs in container {}, done: {}",
            items.len(),
            self.container,
            self.done
        );

        Ok(Some(items))
    }

    /// Yield the next blob, fetching a new page when the current one is drained.
    pub async fn next_blob(&mut self) -> Result<Option<BlobItem>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            match self.next_page().await? {
                Some(page) => self.buffer.extend(page),
                None => return Ok(None),
            }
        }
    }

    fn advance(&mut self, next_marker: Option<String>) {
        let next_marker = next_marker.unwrap_or_default();
        self.done = next_marker.is_empty();
        self.next_marker = next_marker;
    }
}

/// Lazily pages through the containers of an account.
#[derive(Debug)]
pub struct ContainerLister {
    core: Arc<BlobCore>,
    prefix: String,
    page_size: Option<usize>,

    next_marker: String,
    done: bool,
    buffer: VecDeque<ContainerItem>,
}

impl ContainerLister {
    pub(crate) fn new(core: Arc<BlobCore>, prefix: &str, page_size: Option<usize>) -> Self {
        Self {
            core,
            prefix: prefix.to_string(),
            page_size,

            next_marker: "".to_string(),
            done: false,
            buffer: VecDeque::new(),
        }
    }

    /// Fetch the next page, `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<ContainerItem>>> {
        if !self.buffer.is_empty() {
            return Ok(Some(self.buffer.drain(..).collect()));
        }
        if self.done {
            return Ok(None);
        }

        let resp = self
            .core
            .list_containers(&self.prefix, &self.next_marker, self.page_size)
            .await?;
        if resp.status() != StatusCode::OK {
            return Err(parse_error(resp));
        }

        let output: ListContainersOutput = deserialize(resp.into_body())?;
        let next_marker = output.next_marker.unwrap_or_default();
        self.done = next_marker.is_empty();
        self.next_marker = next_marker;

        Ok(Some(
            output
                .containers
                .container
                .into_iter()
                .map(|c| ContainerItem { name: c.name })
                .collect(),
        ))
    }

    /// Yield the next container, fetching a new page when the current one is drained.
    pub async fn next_container(&mut self) -> Result<Option<ContainerItem>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            match self.next_page().await? {
                Some(page) => self.buffer.extend(page),
                None => return Ok(None),
            }
        }
    }
}

fn deserialize<T: for<'de> Deserialize<'de>>(bs: Bytes) -> Result<T> {
    de::from_reader(strip_bom(&bs).reader())
        .map_err(|e| Error::unexpected("deserialize xml from response").with_source(e))
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ListBlobsOutput {
    blobs: Blobs,
    next_marker: Option<String>,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Blobs {
    blob: Vec<Blob>,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Blob {
    name: String,
    snapshot: Option<String>,
    properties: Properties,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Properties {
    #[serde(rename = "Content-Length")]
    content_length: u64,
    #[serde(rename = "Last-Modified")]
    last_modified: String,
    #[serde(rename = "Content-Type")]
    content_type: String,
    etag: String,
}

impl TryFrom<Blob> for BlobItem {
    type Error = Error;

    fn try_from(blob: Blob) -> Result<Self> {
        let last_modified = match blob.properties.last_modified.as_str() {
            "" => None,
            v => Some(parse_http_date(v)?),
        };

        Ok(BlobItem {
            name: blob.name,
            snapshot: blob.snapshot.filter(|v| !v.is_empty()),
            content_length: blob.properties.content_length,
            content_type: blob.properties.content_type,
            etag: blob.properties.etag,
            last_modified,
        })
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ListContainersOutput {
    containers: Containers,
    next_marker: Option<String>,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Containers {
    container: Vec<Container>,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Container {
    name: String,
}
