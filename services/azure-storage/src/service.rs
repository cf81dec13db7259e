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

use blobtour_core::{Context, ErrorKind, ProvideCredential, Result, Signer};
use log::{debug, warn};

use crate::blob_core::BlobCore;
use crate::{Config, ContainerClient, ContainerLister, Credential, Location, RequestSigner};

/// Entry point to a storage account's blob service.
///
/// Cloning is cheap: every clone, and every container or blob handle derived from it,
/// shares the same context, endpoints and credential cache.
#[derive(Clone, Debug)]
pub struct BlobServiceClient {
    core: Arc<BlobCore>,
}

impl BlobServiceClient {
    /// Create a client for the account described by `config`.
    ///
    /// Fails with [`ErrorKind::ConfigInvalid`] when the endpoints can't be resolved.
    pub fn new(
        ctx: Context,
        config: Config,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Result<Self> {
        let endpoints = config.endpoints()?;
        debug!(
            "blob service at {}, secondary: {:?}, reads from {}",
            endpoints.primary,
            endpoints.secondary,
            config.read_location()
        );

        Ok(Self {
            core: Arc::new(BlobCore {
                signer: Signer::new(ctx.clone(), provider, RequestSigner::new()),
                ctx,
                endpoints,
                read_location: config.read_location(),
            }),
        })
    }

    /// URL of the primary endpoint.
    pub fn url(&self) -> &str {
        &self.core.endpoints.primary
    }

    /// Where reads are sent.
    pub fn read_location(&self) -> Location {
        self.core.read_location
    }

    /// Load the credential without sending anything.
    ///
    /// Returns `None` when the provider has nothing to offer.
    pub async fn credential(&self) -> Result<Option<Credential>> {
        self.core.signer.credential().await
    }

    /// List containers whose name starts with `prefix`.
    pub fn list_containers(&self, prefix: &str, page_size: Option<usize>) -> ContainerLister {
        ContainerLister::new(self.core.clone(), prefix, page_size)
    }

    /// Create a container, failing with [`ErrorKind::AlreadyExists`] if it exists.
    pub async fn create_container(&self, name: &str) -> Result<ContainerClient> {
        let container = self.container_client(name);
        container.create().await?;
        Ok(container)
    }

    /// Bind to the container `name`, creating it when missing.
    ///
    /// The lookup and the creation are two separate requests, so this is not atomic
    /// against other clients: a creation that loses the race to a concurrent creator
    /// (`409 ContainerAlreadyExists`) still binds to the container, but a concurrent
    /// delete between the two steps is not detected.
    pub async fn ensure_container(&self, name: &str) -> Result<ContainerClient> {
        let mut lister = self.list_containers(name, None);
        while let Some(item) = lister.next_container().await? {
            if item.name == name {
                debug!("container {name} exists, binding to it");
                return Ok(self.container_client(name));
            }
        }

        match self.create_container(name).await {
            Ok(container) => {
                debug!("container {name} created");
                Ok(container)
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                warn!("container {name} was created concurrently: {err}");
                Ok(self.container_client(name))
            }
            Err(err) => Err(err),
        }
    }

    /// Bind a handle to the container `name` without any request.
    pub fn container_client(&self, name: &str) -> ContainerClient {
        ContainerClient::new(self.core.clone(), name)
    }
}
