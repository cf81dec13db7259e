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
use std::ops::Range;
use std::sync::Arc;

use blobtour_core::{RequestUri, Result};
use bytes::Bytes;
use http::header::ETAG;
use http::{StatusCode, Uri};

use crate::blob_core::BlobCore;
use crate::error::parse_error;
use crate::Location;

/// Handle to a single blob.
#[derive(Clone, Debug)]
pub struct BlobClient {
    core: Arc<BlobCore>,
    container: String,
    name: String,
}

/// Outcome of an upload.
#[derive(Clone, Debug)]
pub struct UploadResponse {
    /// HTTP status returned by the service, `201 Created` on success.
    pub status: StatusCode,
    /// Entity tag of the new blob content.
    pub etag: Option<String>,
}

/// Outcome of a download.
#[derive(Clone, Debug)]
pub struct DownloadResponse {
    /// HTTP status returned by the service.
    pub status: StatusCode,
    /// Blob content, or the requested part of it.
    pub content: Bytes,
    /// URI of the request that produced this response.
    pub request_uri: Uri,
}

impl DownloadResponse {
    /// The replica that served this download.
    pub fn location(&self) -> Location {
        Location::from_host(self.request_uri.host().unwrap_or_default())
    }
}

impl BlobClient {
    pub(crate) fn new(core: Arc<BlobCore>, container: &str, name: &str) -> Self {
        Self {
            core,
            container: container.to_string(),
            name: name.to_string(),
        }
    }

    /// Blob name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URL of the blob on the primary endpoint.
    pub fn url(&self) -> String {
        self.core.blob_url(&self.container, &self.name)
    }

    /// Upload `content` as a block blob, replacing whatever the blob held before.
    pub async fn upload(&self, content: Bytes) -> Result<UploadResponse> {
        let resp = self
            .core
            .put_blob(&self.container, &self.name, content)
            .await?;

        match resp.status() {
            StatusCode::CREATED => Ok(UploadResponse {
                status: resp.status(),
                etag: resp
                    .headers()
                    .get(ETAG)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.to_string()),
            }),
            _ => Err(parse_error(resp)),
        }
    }

    /// Download the whole blob from the configured read location.
    pub async fn download(&self) -> Result<DownloadResponse> {
        self.get(None).await
    }

    /// Download the bytes `range` of the blob from the configured read location.
    pub async fn download_range(&self, range: Range<u64>) -> Result<DownloadResponse> {
        self.get(Some(range)).await
    }

    async fn get(&self, range: Option<Range<u64>>) -> Result<DownloadResponse> {
        let resp = self
            .core
            .get_blob(&self.container, &self.name, range)
            .await?;

        match resp.status() {
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => {
                let request_uri = match resp.extensions().get::<RequestUri>() {
                    Some(uri) => uri.0.clone(),
                    None => Uri::default(),
                };
                let status = resp.status();

                Ok(DownloadResponse {
                    status,
                    content: resp.into_body(),
                    request_uri,
                })
            }
            _ => Err(parse_error(resp)),
        }
    }

    /// Delete the blob together with its snapshots.
    pub async fn delete(&self) -> Result<()> {
        let resp = self.core.delete_blob(&self.container, &self.name).await?;
        match resp.status() {
            StatusCode::ACCEPTED => Ok(()),
            _ => Err(parse_error(resp)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://acct.blob.core.windows.net/tutorial/HelloWorld.txt", Location::Primary)]
    #[test_case("https://acct-secondary.blob.core.windows.net/tutorial/HelloWorld.txt", Location::Secondary)]
    #[test_case("/relative", Location::Primary)]
    fn test_download_location(uri: &str, expected: Location) {
        let resp = DownloadResponse {
            status: StatusCode::OK,
            content: Bytes::new(),
            request_uri: uri.parse().unwrap(),
        };
        assert_eq!(resp.location(), expected);
    }
}
