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

use blobtour_azure_storage::{
    constants::{AZURE_STORAGE_ACCESS_KEY, AZURE_STORAGE_ACCOUNT},
    BlobClient, BlobServiceClient, Config, ContainerClient, Credential,
};
use blobtour_core::{Context, Error, ProvideCredential};
use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;

use crate::{handlers, Command, Console, Dispatcher, SampleFiles, TourError, TutorialConfig};

/// The running tour: bound handles, local files and the commands in flight.
#[derive(Debug)]
pub struct Tour {
    ctx: Context,
    config: TutorialConfig,
    container: ContainerClient,
    blob: BlobClient,
    files: SampleFiles,
    console: Arc<dyn Console>,
    tasks: JoinSet<()>,
}

impl Tour {
    /// Create the local files, connect to the account and make sure the container exists.
    ///
    /// The container lookup and creation are awaited here, so the container exists before
    /// the first command is read.
    pub async fn start(
        ctx: Context,
        config: TutorialConfig,
        provider: impl ProvideCredential<Credential = Credential>,
        console: Arc<dyn Console>,
    ) -> Result<Self, TourError> {
        let files = SampleFiles::create(&config.sample_content)?;
        console.line(&format!(
            ">> Creating a sample file at: {}",
            files.sample_path().display()
        ));

        let storage = Config::default()
            .from_env(&ctx)
            .map_err(TourError::StartupConfiguration)?;
        let service = BlobServiceClient::new(ctx.clone(), storage, provider)
            .map_err(TourError::StartupConfiguration)?;
        match service.credential().await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(TourError::StartupConfiguration(Error::config_invalid(
                    format!("no storage credential found, set {AZURE_STORAGE_ACCOUNT} and {AZURE_STORAGE_ACCESS_KEY}"),
                )))
            }
            Err(err) => return Err(TourError::StartupConfiguration(err)),
        }

        let container = service
            .ensure_container(&config.container)
            .await
            .map_err(TourError::Remote)?;
        let blob = container.blob_client(&config.blob);
        info!("tour ready on {}", container.url());

        Ok(Self {
            ctx,
            config,
            container,
            blob,
            files,
            console,
            tasks: JoinSet::new(),
        })
    }

    /// The bound container.
    pub fn container(&self) -> &ContainerClient {
        &self.container
    }

    /// The bound blob.
    pub fn blob(&self) -> &BlobClient {
        &self.blob
    }

    /// The local sample and download files.
    pub fn files(&self) -> &SampleFiles {
        &self.files
    }

    /// Read commands from `input` until `E` or end of input, then clean up.
    pub async fn run<R>(mut self, mut input: R) -> Result<(), TourError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        let mut dispatcher = Dispatcher::new();

        self.console.line("Enter a command");
        self.console.line(&Command::menu());
        loop {
            self.console.line("# Enter a command : ");
            buf.clear();
            let n = input
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| TourError::local_io("read command", e))?;
            self.reap();

            // Undecodable bytes never match a command, so they are ignored like any other input.
            let line = (n > 0).then(|| String::from_utf8_lossy(&buf).into_owned());

            let Some(command) = dispatcher.accept(line.as_deref()) else {
                debug!("ignored input {line:?}");
                continue;
            };
            if dispatcher.is_exiting() {
                return self.exit().await;
            }

            self.dispatch(command);
            dispatcher.dispatched();
        }
    }

    /// Announce `command` and start its handler without waiting for it.
    ///
    /// [`Command::Exit`] is not dispatched, see [`Tour::exit`].
    pub fn dispatch(&mut self, command: Command) {
        let console = self.console.clone();
        match command {
            Command::Upload => {
                console.line(&format!(
                    "Uploading the sample file into the container: {}",
                    self.container.url()
                ));
                self.tasks.spawn(handlers::upload(
                    self.ctx.clone(),
                    self.blob.clone(),
                    self.files.sample_path().to_path_buf(),
                    console,
                ));
            }
            Command::List => {
                console.line(&format!(
                    "Listing blobs in the container: {}",
                    self.container.url()
                ));
                self.tasks.spawn(handlers::list(
                    self.container.clone(),
                    self.config.page_size,
                    console,
                ));
            }
            Command::Get => {
                console.line(&format!("Get the blob: {}", self.blob.url()));
                self.tasks.spawn(handlers::get(
                    self.blob.clone(),
                    self.files.download_path().to_path_buf(),
                    console,
                ));
            }
            Command::Delete => {
                console.line(&format!("Delete the blob: {}", self.blob.url()));
                self.tasks
                    .spawn(handlers::delete(self.blob.clone(), console.clone()));
                console.line("");
            }
            Command::Exit => warn!("exit must go through Tour::exit"),
        }
    }

    /// Wait until every dispatched command has finished.
    pub async fn wait_idle(&mut self) {
        while let Some(res) = self.tasks.join_next().await {
            match res {
                Err(err) if !err.is_cancelled() => warn!("command task failed: {err}"),
                _ => {}
            }
        }
    }

    /// Abort commands in flight, delete the download file and the container.
    ///
    /// Cleanup failures are reported on the console and do not fail the exit.
    pub async fn exit(mut self) -> Result<(), TourError> {
        self.console.line("Cleaning up the sample and exiting!");
        self.tasks.abort_all();
        self.wait_idle().await;

        if let Err(err) = self.files.remove_download() {
            self.console
                .line(&format!(">> An error encountered during cleanup: {err}"));
        }
        handlers::delete_container(&self.container, &*self.console).await;
        Ok(())
    }

    /// Drop finished tasks so the set doesn't grow with every command.
    fn reap(&mut self) {
        while let Some(res) = self.tasks.try_join_next() {
            if let Err(err) = res {
                warn!("command task failed: {err}");
            }
        }
    }
}
