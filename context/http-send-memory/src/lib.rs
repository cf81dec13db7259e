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
//! In-process `HttpSend` that answers Azure Blob Storage REST calls from memory.
//!
//! It serves the subset of the blob service that blobtour uses: listing, creating and
//! deleting containers, and putting, getting, listing and deleting block blobs. Requests
//! must carry a `SharedKey` authorization header but the signature itself is not
//! verified. Hosts with the `-secondary` marker read the same data and reject writes,
//! like the read-only replica of a geo-redundant account.
//!
//! ```
//! use blobtour_core::Context;
//! use blobtour_http_send_memory::MemoryHttpSend;
//!
//! let storage = MemoryHttpSend::new();
//! storage.create_container("tutorial");
//! let ctx = Context::new().with_http_send(storage.clone());
//! ```

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use blobtour_core::time::{format_http_date, now};
use blobtour_core::{Error, HttpSend, RequestUri, Result};
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED, RANGE};
use http::{Method, Request, Response, StatusCode, Uri};
use log::debug;
use percent_encoding::percent_decode_str;
use serde::Serialize;

const X_MS_ERROR_CODE: &str = "x-ms-error-code";
const X_MS_BLOB_TYPE: &str = "x-ms-blob-type";
const SECONDARY_HOST_MARKER: &str = "-secondary";
const XML_BOM: &str = "\u{feff}";

/// A request as seen by [`MemoryHttpSend`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Request method.
    pub method: Method,
    /// Full request URI.
    pub uri: Uri,
}

/// In-memory blob service, see the crate docs.
///
/// Clones share the same storage.
#[derive(Clone, Debug, Default)]
pub struct MemoryHttpSend {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    containers: BTreeMap<String, Container>,
    requests: Vec<RecordedRequest>,
    etag_seq: u64,
}

#[derive(Debug, Default)]
struct Container {
    blobs: BTreeMap<String, StoredBlob>,
}

#[derive(Debug)]
struct StoredBlob {
    content: Bytes,
    etag: String,
    last_modified: String,
    snapshots: Vec<String>,
}

impl MemoryHttpSend {
    /// Create an empty storage account.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("lock poisoned")
    }

    /// Create a container directly, bypassing the REST surface.
    pub fn create_container(&self, name: &str) {
        self.state()
            .containers
            .entry(name.to_string())
            .or_default();
    }

    /// Whether the container exists.
    pub fn container_exists(&self, name: &str) -> bool {
        self.state().containers.contains_key(name)
    }

    /// Store a blob directly, creating its container if needed.
    pub fn put_blob(&self, container: &str, name: &str, content: impl Into<Bytes>) {
        let mut state = self.state();
        let etag = state.next_etag();
        let blobs = &mut state.containers.entry(container.to_string()).or_default().blobs;
        upsert_blob(blobs, name, content.into(), etag);
    }

    /// Record a snapshot of an existing blob, returns `false` if the blob doesn't exist.
    pub fn snapshot_blob(&self, container: &str, name: &str, snapshot: &str) -> bool {
        let mut state = self.state();
        match state
            .containers
            .get_mut(container)
            .and_then(|c| c.blobs.get_mut(name))
        {
            Some(blob) => {
                blob.snapshots.push(snapshot.to_string());
                true
            }
            None => false,
        }
    }

    /// Content of a blob.
    pub fn blob(&self, container: &str, name: &str) -> Option<Bytes> {
        self.state()
            .containers
            .get(container)
            .and_then(|c| c.blobs.get(name))
            .map(|b| b.content.clone())
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }
}

impl State {
    fn next_etag(&mut self) -> String {
        self.etag_seq += 1;
        format!("\"0x8DA0A64D{:08X}\"", self.etag_seq)
    }
}

fn upsert_blob(blobs: &mut BTreeMap<String, StoredBlob>, name: &str, content: Bytes, etag: String) {
    let last_modified = format_http_date(now());
    match blobs.get_mut(name) {
        Some(blob) => {
            blob.content = content;
            blob.etag = etag;
            blob.last_modified = last_modified;
        }
        None => {
            blobs.insert(
                name.to_string(),
                StoredBlob {
                    content,
                    etag,
                    last_modified,
                    snapshots: vec![],
                },
            );
        }
    }
}

#[async_trait]
impl HttpSend for MemoryHttpSend {
    async fn http_send(&self, req: Request<Bytes>) -> Result<Response<Bytes>> {
        let uri = req.uri().clone();
        debug!("memory blob service got: {} {}", req.method(), uri);

        let mut resp = {
            let mut state = self.state();
            state.requests.push(RecordedRequest {
                method: req.method().clone(),
                uri: uri.clone(),
            });
            state.handle(req)?
        };

        resp.extensions_mut().insert(RequestUri(uri));
        Ok(resp)
    }
}

/// Parsed target of a request.
struct Target {
    container: String,
    blob: String,
    query: HashMap<String, String>,
    secondary: bool,
}

impl Target {
    fn parse(uri: &Uri) -> Result<Self> {
        let path = percent_decode_str(uri.path())
            .decode_utf8()
            .map_err(|e| Error::request_invalid("path is not valid utf-8").with_source(e))?;
        let path = path.trim_start_matches('/');
        let (container, blob) = path.split_once('/').unwrap_or((path, ""));

        Ok(Target {
            container: container.to_string(),
            blob: blob.to_string(),
            query: form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes())
                .into_owned()
                .collect(),
            secondary: uri.host().unwrap_or_default().contains(SECONDARY_HOST_MARKER),
        })
    }

    fn query(&self, key: &str) -> &str {
        self.query.get(key).map(String::as_str).unwrap_or_default()
    }
}

impl State {
    fn handle(&mut self, req: Request<Bytes>) -> Result<Response<Bytes>> {
        let authorized = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("SharedKey "));
        if !authorized {
            return error_response(
                StatusCode::FORBIDDEN,
                "AuthenticationFailed",
                "Server failed to authenticate the request.",
            );
        }

        let target = Target::parse(req.uri())?;
        if target.secondary && req.method() != Method::GET {
            return error_response(
                StatusCode::FORBIDDEN,
                "WriteOperationNotSupportedOnSecondary",
                "Write operations are not allowed on the secondary location.",
            );
        }

        match (req.method().clone(), target.container.is_empty(), target.blob.is_empty()) {
            (Method::GET, true, _) if target.query("comp") == "list" => {
                self.list_containers(&target)
            }
            (method, false, true) if target.query("restype") == "container" => match method {
                Method::PUT => self.create_container(&target),
                Method::DELETE => self.delete_container(&target),
                Method::GET if target.query("comp") == "list" => self.list_blobs(&target),
                _ => unsupported(),
            },
            (Method::PUT, false, false) => self.put_blob(&target, req),
            (Method::GET, false, false) => self.get_blob(&target, &req),
            (Method::DELETE, false, false) => self.delete_blob(&target),
            _ => unsupported(),
        }
    }

    fn list_containers(&self, target: &Target) -> Result<Response<Bytes>> {
        let names: Vec<&String> = self
            .containers
            .keys()
            .filter(|name| name.starts_with(target.query("prefix")))
            .collect();
        let (page, next_marker) = paginate(&names, target)?;

        xml_response(&ContainerEnumeration {
            service_endpoint: "memory".to_string(),
            prefix: target.query("prefix").to_string(),
            containers: ContainerList {
                container: page
                    .iter()
                    .map(|name| ContainerEntry {
                        name: name.to_string(),
                    })
                    .collect(),
            },
            next_marker,
        })
    }

    fn create_container(&mut self, target: &Target) -> Result<Response<Bytes>> {
        if self.containers.contains_key(&target.container) {
            return error_response(
                StatusCode::CONFLICT,
                "ContainerAlreadyExists",
                "The specified container already exists.",
            );
        }

        self.containers
            .insert(target.container.clone(), Container::default());
        empty_response(StatusCode::CREATED)
    }

    fn delete_container(&mut self, target: &Target) -> Result<Response<Bytes>> {
        match self.containers.remove(&target.container) {
            Some(_) => empty_response(StatusCode::ACCEPTED),
            None => container_not_found(),
        }
    }

    fn list_blobs(&self, target: &Target) -> Result<Response<Bytes>> {
        let Some(container) = self.containers.get(&target.container) else {
            return container_not_found();
        };
        let with_snapshots = target
            .query("include")
            .split(',')
            .any(|v| v == "snapshots");

        let mut entries = Vec::new();
        for (name, blob) in container.blobs.iter() {
            if with_snapshots {
                for snapshot in blob.snapshots.iter() {
                    entries.push(blob_entry(name, blob, Some(snapshot.clone())));
                }
            }
            entries.push(blob_entry(name, blob, None));
        }
        let (page, next_marker) = paginate(&entries, target)?;

        xml_response(&BlobEnumeration {
            service_endpoint: "memory".to_string(),
            container_name: target.container.clone(),
            blobs: BlobList {
                blob: page.to_vec(),
            },
            next_marker,
        })
    }

    fn put_blob(&mut self, target: &Target, req: Request<Bytes>) -> Result<Response<Bytes>> {
        let blob_type = req
            .headers()
            .get(X_MS_BLOB_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if blob_type != "BlockBlob" {
            return error_response(
                StatusCode::BAD_REQUEST,
                "InvalidHeaderValue",
                "The value for one of the HTTP headers is not in the correct format.",
            );
        }
        if !self.containers.contains_key(&target.container) {
            return container_not_found();
        }

        let etag = self.next_etag();
        let blobs = &mut self
            .containers
            .entry(target.container.clone())
            .or_default()
            .blobs;
        upsert_blob(blobs, &target.blob, req.into_body(), etag.clone());

        let mut resp = empty_response(StatusCode::CREATED)?;
        resp.headers_mut().insert(ETAG, etag.parse()?);
        Ok(resp)
    }

    fn get_blob(&self, target: &Target, req: &Request<Bytes>) -> Result<Response<Bytes>> {
        let Some(container) = self.containers.get(&target.container) else {
            return container_not_found();
        };
        let Some(blob) = container.blobs.get(&target.blob) else {
            return blob_not_found();
        };

        let (status, content) = match req.headers().get(RANGE) {
            None => (StatusCode::OK, blob.content.clone()),
            Some(range) => match parse_range(range.to_str()?, blob.content.len()) {
                Some((start, end)) => (StatusCode::PARTIAL_CONTENT, blob.content.slice(start..end)),
                None => {
                    return error_response(
                        StatusCode::RANGE_NOT_SATISFIABLE,
                        "InvalidRange",
                        "The range specified is invalid for the current size of the resource.",
                    )
                }
            },
        };

        Ok(Response::builder()
            .status(status)
            .header(CONTENT_LENGTH, content.len())
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(ETAG, &blob.etag)
            .header(LAST_MODIFIED, &blob.last_modified)
            .body(content)?)
    }

    fn delete_blob(&mut self, target: &Target) -> Result<Response<Bytes>> {
        let Some(container) = self.containers.get_mut(&target.container) else {
            return container_not_found();
        };
        match container.blobs.remove(&target.blob) {
            Some(_) => empty_response(StatusCode::ACCEPTED),
            None => blob_not_found(),
        }
    }
}

/// Slice `items` by the offset in `marker` and the page size in `maxresults`.
fn paginate<'a, T>(items: &'a [T], target: &Target) -> Result<(&'a [T], Option<String>)> {
    let start = match target.query("marker") {
        "" => 0,
        v => v
            .parse::<usize>()
            .map_err(|e| Error::request_invalid(format!("invalid marker {v:?}")).with_source(e))?,
    };
    let size = match target.query("maxresults") {
        "" => 5000,
        v => v
            .parse::<usize>()
            .map_err(|e| Error::request_invalid(format!("invalid maxresults {v:?}")).with_source(e))?,
    };

    let start = start.min(items.len());
    let end = start.saturating_add(size).min(items.len());
    let next_marker = (end < items.len()).then(|| end.to_string());

    Ok((&items[start..end], next_marker))
}

/// Parse `bytes=a-b` into a half open range.
fn parse_range(value: &str, len: usize) -> Option<(usize, usize)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    let start: usize = start.parse().ok()?;
    let end = match end {
        "" => len.checked_sub(1)?,
        v => v.parse::<usize>().ok()?.min(len.checked_sub(1)?),
    };

    (start <= end).then_some((start, end + 1))
}

fn blob_entry(name: &str, blob: &StoredBlob, snapshot: Option<String>) -> BlobEntry {
    BlobEntry {
        name: name.to_string(),
        snapshot,
        properties: BlobProperties {
            last_modified: blob.last_modified.clone(),
            etag: blob.etag.clone(),
            content_length: blob.content.len() as u64,
            content_type: "application/octet-stream".to_string(),
            blob_type: "BlockBlob".to_string(),
        },
    }
}

fn xml_response<T: Serialize>(value: &T) -> Result<Response<Bytes>> {
    let body = quick_xml::se::to_string(value)
        .map_err(|e| Error::unexpected("serialize xml response").with_source(e))?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/xml")
        .body(Bytes::from(format!(
            "{XML_BOM}<?xml version=\"1.0\" encoding=\"utf-8\"?>{body}"
        )))?)
}

fn empty_response(status: StatusCode) -> Result<Response<Bytes>> {
    Ok(Response::builder().status(status).body(Bytes::new())?)
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Result<Response<Bytes>> {
    let body = quick_xml::se::to_string(&ServiceError {
        code: code.to_string(),
        message: message.to_string(),
    })
    .map_err(|e| Error::unexpected("serialize xml response").with_source(e))?;

    Ok(Response::builder()
        .status(status)
        .header(X_MS_ERROR_CODE, code)
        .header(CONTENT_TYPE, "application/xml")
        .body(Bytes::from(format!(
            "{XML_BOM}<?xml version=\"1.0\" encoding=\"utf-8\"?>{body}"
        )))?)
}

fn container_not_found() -> Result<Response<Bytes>> {
    error_response(
        StatusCode::NOT_FOUND,
        "ContainerNotFound",
        "The specified container does not exist.",
    )
}

fn blob_not_found() -> Result<Response<Bytes>> {
    error_response(
        StatusCode::NOT_FOUND,
        "BlobNotFound",
        "The specified blob does not exist.",
    )
}

fn unsupported() -> Result<Response<Bytes>> {
    error_response(
        StatusCode::BAD_REQUEST,
        "UnsupportedHttpVerb",
        "The resource doesn't support the specified HTTP verb.",
    )
}

#[derive(Serialize)]
#[serde(rename = "Error", rename_all = "PascalCase")]
struct ServiceError {
    code: String,
    message: String,
}

#[derive(Serialize)]
#[serde(rename = "EnumerationResults")]
struct ContainerEnumeration {
    #[serde(rename = "@ServiceEndpoint")]
    service_endpoint: String,
    #[serde(rename = "Prefix")]
    prefix: String,
    #[serde(rename = "Containers")]
    containers: ContainerList,
    #[serde(rename = "NextMarker", skip_serializing_if = "Option::is_none")]
    next_marker: Option<String>,
}

#[derive(Serialize)]
struct ContainerList {
    #[serde(rename = "Container")]
    container: Vec<ContainerEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerEntry {
    name: String,
}

#[derive(Serialize)]
#[serde(rename = "EnumerationResults")]
struct BlobEnumeration {
    #[serde(rename = "@ServiceEndpoint")]
    service_endpoint: String,
    #[serde(rename = "@ContainerName")]
    container_name: String,
    #[serde(rename = "Blobs")]
    blobs: BlobList,
    #[serde(rename = "NextMarker", skip_serializing_if = "Option::is_none")]
    next_marker: Option<String>,
}

#[derive(Serialize)]
struct BlobList {
    #[serde(rename = "Blob")]
    blob: Vec<BlobEntry>,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct BlobEntry {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<String>,
    properties: BlobProperties,
}

#[derive(Clone, Serialize)]
struct BlobProperties {
    #[serde(rename = "Last-Modified")]
    last_modified: String,
    #[serde(rename = "Etag")]
    etag: String,
    #[serde(rename = "Content-Length")]
    content_length: u64,
    #[serde(rename = "Content-Type")]
    content_type: String,
    #[serde(rename = "BlobType")]
    blob_type: String,
}
