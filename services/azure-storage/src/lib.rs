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
//! Azure Blob Storage client for blobtour.
//!
//! Requests are built with [`http`] types, signed with Shared Key and sent through the
//! [`Context`](blobtour_core::Context), so the transport is whatever `HttpSend` the
//! caller plugs in.
//!
//! ## Example
//!
//! ```no_run
//! use blobtour_azure_storage::{BlobServiceClient, Config, EnvCredentialProvider};
//! use blobtour_core::{Context, OsEnv, Result};
//!
//! # async fn example(ctx: Context) -> Result<()> {
//! let ctx = ctx.with_env(OsEnv);
//! let config = Config::default().from_env(&ctx)?;
//! let service = BlobServiceClient::new(ctx, config, EnvCredentialProvider::new())?;
//!
//! let container = service.ensure_container("tutorial").await?;
//! let blob = container.blob_client("HelloWorld.txt");
//! blob.upload("Hello Azure!".into()).await?;
//!
//! let mut lister = container.list_blobs(Some(10));
//! while let Some(item) = lister.next_blob().await? {
//!     println!("{}", item.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod constants;

mod config;
pub use config::{Config, Endpoints};

mod credential;
pub use credential::Credential;

mod provide_credential;
pub use provide_credential::*;

mod sign_request;
pub use sign_request::RequestSigner;

mod location;
pub use location::Location;

mod error;

mod blob_core;

mod service;
pub use service::BlobServiceClient;

mod container;
pub use container::ContainerClient;

mod blob;
pub use blob::{BlobClient, DownloadResponse, UploadResponse};

mod list;
pub use list::{BlobItem, BlobLister, ContainerItem, ContainerLister};
