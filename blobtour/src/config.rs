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
use blobtour_core::Context;

/// Env value naming the container the tour works in.
pub const BLOBTOUR_CONTAINER: &str = "BLOBTOUR_CONTAINER";

const DEFAULT_CONTAINER: &str = "tutorial";
const DEFAULT_BLOB: &str = "HelloWorld.txt";
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_SAMPLE_CONTENT: &str = "Hello Azure!";

/// What the tour operates on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TutorialConfig {
    /// Container created at startup and deleted at exit.
    pub container: String,
    /// The single blob every command works with.
    pub blob: String,
    /// Page size of blob listings.
    pub page_size: usize,
    /// Content of the local sample file.
    pub sample_content: String,
}

impl Default for TutorialConfig {
    fn default() -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            blob: DEFAULT_BLOB.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            sample_content: DEFAULT_SAMPLE_CONTENT.to_string(),
        }
    }
}

impl TutorialConfig {
    /// Defaults, with the container name taken from [`BLOBTOUR_CONTAINER`] if set.
    pub fn from_env(ctx: &Context) -> Self {
        let mut cfg = Self::default();
        if let Some(container) = ctx.env_var_any(&[BLOBTOUR_CONTAINER]) {
            cfg.container = container;
        }
        cfg
    }
}
