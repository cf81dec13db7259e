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
//! The work behind each command.
//!
//! Every handler reports its own outcome on the console and swallows failures: a failed
//! command never stops the tour.

use std::path::PathBuf;
use std::sync::Arc;

use blobtour_azure_storage::{BlobClient, ContainerClient, Location};
use blobtour_core::{Context, Error};
use bytes::Bytes;
use log::warn;

use crate::Console;

/// Upload the sample file to `blob`, replacing its content.
pub async fn upload(ctx: Context, blob: BlobClient, sample: PathBuf, console: Arc<dyn Console>) {
    let result = async {
        let content = ctx.file_read(&sample.to_string_lossy()).await?;
        blob.upload(Bytes::from(content)).await
    }
    .await;

    match result {
        Ok(resp) => {
            console.line("Completed upload request.");
            console.line(&resp.status.as_u16().to_string());
        }
        Err(err) => report(&*console, "putBlob", &err),
    }
}

/// List every blob of `container`, snapshots included, `page_size` per request.
pub async fn list(container: ContainerClient, page_size: usize, console: Arc<dyn Console>) {
    let mut lister = container.list_blobs(Some(page_size));
    loop {
        match lister.next_blob().await {
            Ok(Some(item)) => {
                let mut line = format!("Blob name: {}", item.name);
                if let Some(snapshot) = &item.snapshot {
                    line.push_str(&format!(", Snapshot: {snapshot}"));
                }
                console.line(&line);
            }
            Ok(None) => {
                console.line("There are no more blobs to list.");
                return;
            }
            Err(err) => {
                report(&*console, "listBlobs", &err);
                return;
            }
        }
    }
}

/// Download `blob` into `target` and tell which replica served it.
pub async fn get(blob: BlobClient, target: PathBuf, console: Arc<dyn Console>) {
    let resp = match blob.download().await {
        Ok(resp) => resp,
        Err(err) => return report(&*console, "getBlob", &err),
    };
    if let Err(err) = tokio::fs::write(&target, &resp.content).await {
        let err = Error::unexpected(format!("write {}", target.display())).with_source(err);
        return report(&*console, "getBlob", &err);
    }

    console.line(&format!(
        "The blob is being downloaded to {}",
        target.display()
    ));
    match resp.location() {
        Location::Secondary => console.line("Successfully used secondary pipeline."),
        Location::Primary => console.line("Successfully used primary pipeline."),
    }
}

/// Delete `blob`.
pub async fn delete(blob: BlobClient, console: Arc<dyn Console>) {
    match blob.delete().await {
        Ok(()) => console.line(&format!(">> Blob deleted: {}", blob.url())),
        Err(err) => report(&*console, "deleteBlob", &err),
    }
}

/// Delete the container with everything in it, reporting instead of failing.
pub async fn delete_container(container: &ContainerClient, console: &dyn Console) {
    if let Err(err) = container.delete().await {
        report(console, "cleanup", &err);
    }
}

fn report(console: &dyn Console, operation: &str, err: &Error) {
    warn!("{operation} failed: {err:?}");
    console.line(&format!(
        ">> An error encountered during {operation}: {err}"
    ));
}
