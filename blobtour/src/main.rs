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
use std::process::ExitCode;
use std::sync::Arc;

use blobtour::{StdoutConsole, Tour, TutorialConfig};
use blobtour_azure_storage::EnvCredentialProvider;
use blobtour_core::{Context, OsEnv};
use blobtour_file_read_tokio::TokioFileRead;
use blobtour_http_send_reqwest::ReqwestHttpSend;
use log::error;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenv::dotenv();
    env_logger::init();

    let ctx = Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv);
    let config = TutorialConfig::from_env(&ctx);

    let result = match Tour::start(
        ctx,
        config,
        EnvCredentialProvider::new(),
        Arc::new(StdoutConsole),
    )
    .await
    {
        Ok(tour) => tour.run(BufReader::new(tokio::io::stdin())).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:?}");
            eprintln!("{err}");
            ExitCode::from(&err)
        }
    }
}
