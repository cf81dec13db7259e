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
use std::fmt::{Debug, Formatter};
use std::ops::Range;

use blobtour_core::{Context, Error, Result, Signer};
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, RANGE};
use http::{HeaderValue, Request, Response};
use log::debug;
use percent_encoding::utf8_percent_encode;

use crate::config::Endpoints;
use crate::constants::*;
use crate::{Credential, Location};

/// Shared state of every client handle: where to send requests and how to sign them.
pub(crate) struct BlobCore {
    pub ctx: Context,
    pub signer: Signer<Credential>,
    pub endpoints: Endpoints,
    pub read_location: Location,
}

impl Debug for BlobCore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobCore")
            .field("endpoints", &self.endpoints)
            .field("read_location", &self.read_location)
            .finish_non_exhaustive()
    }
}

pub(crate) fn percent_encode_path(path: &str) -> String {
    utf8_percent_encode(path, &AZURE_URI_ENCODE_SET).to_string()
}

/// Builds `<base>?k=v&...` with every value percent encoded.
struct QueryPairsWriter {
    url: String,
    has_query: bool,
}

impl QueryPairsWriter {
    fn new(base: &str) -> Self {
        Self {
            url: base.to_string(),
            has_query: false,
        }
    }

    fn push(mut self, key: &str, value: &str) -> Self {
        self.url.push(if self.has_query { '&' } else { '?' });
        self.has_query = true;
        self.url.push_str(key);
        self.url.push('=');
        self.url.push_str(&percent_encode_path(value));
        self
    }

    fn push_if(self, key: &str, value: &str) -> Self {
        if value.is_empty() {
            self
        } else {
            self.push(key, value)
        }
    }

    fn finish(self) -> String {
        self.url
    }
}

impl BlobCore {
    /// Endpoint serving reads for the configured read location.
    pub fn read_endpoint(&self) -> &str {
        match (self.read_location, &self.endpoints.secondary) {
            (Location::Secondary, Some(secondary)) => secondary,
            _ => &self.endpoints.primary,
        }
    }

    pub fn container_url(&self, container: &str) -> String {
        format!(
            "{}/{}",
            self.endpoints.primary,
            percent_encode_path(container)
        )
    }

    pub fn blob_url(&self, container: &str, blob: &str) -> String {
        build_blob_url(&self.endpoints.primary, container, blob)
    }

    /// Sign and send a request, stamping the service version first.
    pub async fn send(&self, req: Request<Bytes>) -> Result<Response<Bytes>> {
        let (mut parts, body) = req.into_parts();
        parts
            .headers
            .insert(X_MS_VERSION, HeaderValue::from_static(AZURE_STORAGE_VERSION));

        self.signer.sign(&mut parts).await?;
        debug!("sending request: {} {}", parts.method, parts.uri);

        let resp = self
            .ctx
            .http_send(Request::from_parts(parts, body))
            .await?;
        debug!("got response: {}", resp.status());

        Ok(resp)
    }

    pub async fn list_containers(
        &self,
        prefix: &str,
        marker: &str,
        max_results: Option<usize>,
    ) -> Result<Response<Bytes>> {
        let mut url = QueryPairsWriter::new(&format!("{}/", self.endpoints.primary))
            .push("comp", "list")
            .push_if("prefix", prefix)
            .push_if("marker", marker);
        if let Some(max_results) = max_results {
            url = url.push("maxresults", &max_results.to_string());
        }

        let req = Request::get(url.finish()).body(Bytes::new())?;
        self.send(req).await
    }

    pub async fn create_container(&self, container: &str) -> Result<Response<Bytes>> {
        let url = QueryPairsWriter::new(&self.container_url(container))
            .push("restype", "container")
            .finish();

        let req = Request::put(url)
            .header(CONTENT_LENGTH, 0)
            .body(Bytes::new())?;
        self.send(req).await
    }

    pub async fn delete_container(&self, container: &str) -> Result<Response<Bytes>> {
        let url = QueryPairsWriter::new(&self.container_url(container))
            .push("restype", "container")
            .finish();

        let req = Request::delete(url)
            .header(CONTENT_LENGTH, 0)
            .body(Bytes::new())?;
        self.send(req).await
    }

    pub async fn list_blobs(
        &self,
        container: &str,
        marker: &str,
        max_results: Option<usize>,
    ) -> Result<Response<Bytes>> {
        let base = format!(
            "{}/{}",
            self.read_endpoint(),
            percent_encode_path(container)
        );
        let mut url = QueryPairsWriter::new(&base)
            .push("restype", "container")
            .push("comp", "list")
            .push("include", "snapshots");
        if let Some(max_results) = max_results {
            url = url.push("maxresults", &max_results.to_string());
        }
        let url = url.push_if("marker", marker);

        let req = Request::get(url.finish()).body(Bytes::new())?;
        self.send(req).await
    }

    pub async fn put_blob(
        &self,
        container: &str,
        blob: &str,
        content: Bytes,
    ) -> Result<Response<Bytes>> {
        let req = Request::put(self.blob_url(container, blob))
            .header(X_MS_BLOB_TYPE, "BlockBlob")
            .header(CONTENT_LENGTH, content.len())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(content)?;
        self.send(req).await
    }

    pub async fn get_blob(
        &self,
        container: &str,
        blob: &str,
        range: Option<Range<u64>>,
    ) -> Result<Response<Bytes>> {
        let mut req = Request::get(build_blob_url(self.read_endpoint(), container, blob));
        if let Some(range) = range {
            if range.start >= range.end {
                return Err(Error::request_invalid(format!(
                    "range {range:?} is empty"
                )));
            }
            req = req.header(RANGE, format!("bytes={}-{}", range.start, range.end - 1));
        }

        self.send(req.body(Bytes::new())?).await
    }

    pub async fn delete_blob(&self, container: &str, blob: &str) -> Result<Response<Bytes>> {
        let req = Request::delete(self.blob_url(container, blob))
            .header(X_MS_DELETE_SNAPSHOTS, "include")
            .header(CONTENT_LENGTH, 0)
            .body(Bytes::new())?;
        self.send(req).await
    }
}

fn build_blob_url(endpoint: &str, container: &str, blob: &str) -> String {
    format!(
        "{endpoint}/{}/{}",
        percent_encode_path(container),
        percent_encode_path(blob.trim_start_matches('/'))
    )
}
