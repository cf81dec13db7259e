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

use async_trait::async_trait;
use blobtour_core::{Context, ProvideCredential, Result};
use log::debug;

use crate::constants::*;
use crate::credential::Credential;

/// Loads a Shared Key credential from the environment.
///
/// - account name: `AZURE_STORAGE_ACCOUNT`, then `AZURE_STORAGE_ACCOUNT_NAME`
/// - account key: `AZURE_STORAGE_ACCESS_KEY`, then `AZURE_STORAGE_ACCOUNT_KEY`
///
/// Returns `None` unless both are present.
#[derive(Clone, Debug, Default)]
pub struct EnvCredentialProvider {}

impl EnvCredentialProvider {
    /// Create a new env credential provider.
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl ProvideCredential for EnvCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let account_name =
            ctx.env_var_any(&[AZURE_STORAGE_ACCOUNT, AZURE_STORAGE_ACCOUNT_NAME]);
        let account_key = ctx.env_var_any(&[AZURE_STORAGE_ACCESS_KEY, AZURE_STORAGE_ACCOUNT_KEY]);

        match (account_name, account_key) {
            (Some(name), Some(key)) => Ok(Some(Credential::with_shared_key(&name, &key))),
            (name, key) => {
                debug!(
                    "no shared key credential in env: account name set: {}, account key set: {}",
                    name.is_some(),
                    key.is_some()
                );
                Ok(None)
            }
        }
    }
}
