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
use std::time::Duration;

use async_trait::async_trait;
use blobtour::{BufferConsole, Command, Tour, TourError, TutorialConfig};
use blobtour_azure_storage::EnvCredentialProvider;
use blobtour_core::{Context, ErrorKind, HttpSend, StaticEnv};
use blobtour_file_read_tokio::TokioFileRead;
use blobtour_http_send_memory::MemoryHttpSend;
use bytes::Bytes;
use http::{Method, Request, Response};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::Notify;

const CONTAINER_URL: &str = "https://acct.blob.core.windows.net/tutorial";
const BLOB_URL: &str = "https://acct.blob.core.windows.net/tutorial/HelloWorld.txt";

fn context(storage: &MemoryHttpSend, extra: &[(&str, &str)]) -> Context {
    context_with(storage.clone(), extra)
}

fn context_with(http: impl HttpSend, extra: &[(&str, &str)]) -> Context {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut envs = vec![
        ("AZURE_STORAGE_ACCOUNT", "acct"),
        ("AZURE_STORAGE_ACCESS_KEY", "a2V5"),
    ];
    envs.extend_from_slice(extra);

    Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(http)
        .with_env(StaticEnv::from_iter(envs))
}

/// Holds blob uploads until released, passing everything else through.
#[derive(Debug, Clone)]
struct GatedUploads {
    inner: MemoryHttpSend,
    arrived: Arc<Notify>,
    release: Arc<Notify>,
}

impl GatedUploads {
    fn new(inner: MemoryHttpSend) -> Self {
        Self {
            inner,
            arrived: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl HttpSend for GatedUploads {
    async fn http_send(&self, req: Request<Bytes>) -> blobtour_core::Result<Response<Bytes>> {
        if req.method() == Method::PUT && req.headers().contains_key("x-ms-blob-type") {
            self.arrived.notify_one();
            self.release.notified().await;
        }
        self.inner.http_send(req).await
    }
}

async fn wait_for_line(console: &BufferConsole, pred: impl Fn(&str) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !console.lines().iter().any(|l| pred(l)) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("line must show up");
}

async fn start_with(ctx: Context, console: &BufferConsole) -> Result<Tour, TourError> {
    Tour::start(
        ctx,
        TutorialConfig::default(),
        EnvCredentialProvider::new(),
        Arc::new(console.clone()),
    )
    .await
}

async fn start(storage: &MemoryHttpSend, console: &BufferConsole) -> Tour {
    start_with(context(storage, &[]), console)
        .await
        .expect("tour must start")
}

#[tokio::test]
async fn test_start_creates_container() {
    let storage = MemoryHttpSend::new();
    let console = BufferConsole::new();
    let tour = start(&storage, &console).await;

    assert!(storage.container_exists("tutorial"));
    assert_eq!(tour.container().url(), CONTAINER_URL);
    assert_eq!(tour.blob().url(), BLOB_URL);
    assert_eq!(
        console.lines(),
        vec![format!(
            ">> Creating a sample file at: {}",
            tour.files().sample_path().display()
        )]
    );
}

#[tokio::test]
async fn test_upload_then_get() {
    let storage = MemoryHttpSend::new();
    let console = BufferConsole::new();
    let mut tour = start(&storage, &console).await;
    console.clear();

    tour.dispatch(Command::Upload);
    tour.wait_idle().await;
    assert_eq!(
        console.lines(),
        vec![
            format!("Uploading the sample file into the container: {CONTAINER_URL}"),
            "Completed upload request.".to_string(),
            "201".to_string(),
        ]
    );
    console.clear();

    tour.dispatch(Command::Get);
    tour.wait_idle().await;
    let download = tour.files().download_path().to_path_buf();
    assert_eq!(
        console.lines(),
        vec![
            format!("Get the blob: {BLOB_URL}"),
            format!("The blob is being downloaded to {}", download.display()),
            "Successfully used primary pipeline.".to_string(),
        ]
    );
    assert_eq!(
        std::fs::read(&download).unwrap(),
        std::fs::read(tour.files().sample_path()).unwrap()
    );
    assert_eq!(std::fs::read_to_string(&download).unwrap(), "Hello Azure!");
}

#[tokio::test]
async fn test_get_from_secondary() {
    let storage = MemoryHttpSend::new();
    storage.put_blob("tutorial", "HelloWorld.txt", "Hello Azure!");
    let console = BufferConsole::new();
    let ctx = context(&storage, &[("AZURE_STORAGE_READ_LOCATION", "secondary")]);
    let mut tour = start_with(ctx, &console).await.unwrap();
    console.clear();

    tour.dispatch(Command::Get);
    tour.wait_idle().await;

    assert_eq!(
        console.lines().last().map(String::as_str),
        Some("Successfully used secondary pipeline.")
    );
    // Still announced with the primary url.
    assert_eq!(console.lines()[0], format!("Get the blob: {BLOB_URL}"));
}

#[tokio::test]
async fn test_get_missing_blob() {
    let storage = MemoryHttpSend::new();
    let console = BufferConsole::new();
    let mut tour = start(&storage, &console).await;
    console.clear();

    tour.dispatch(Command::Get);
    tour.wait_idle().await;

    let lines = console.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with(">> An error encountered during getBlob: "));
    assert!(lines[1].contains("BlobNotFound"));
}

#[tokio::test]
async fn test_list_empty_container() {
    let storage = MemoryHttpSend::new();
    let console = BufferConsole::new();
    let mut tour = start(&storage, &console).await;
    console.clear();

    tour.dispatch(Command::List);
    tour.wait_idle().await;

    assert_eq!(
        console.lines(),
        vec![
            format!("Listing blobs in the container: {CONTAINER_URL}"),
            "There are no more blobs to list.".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_list_pages_and_snapshots() {
    let storage = MemoryHttpSend::new();
    for i in 0..12 {
        storage.put_blob("tutorial", &format!("blob-{i:02}.txt"), "x");
    }
    storage.snapshot_blob("tutorial", "blob-00.txt", "2022-03-01T08:12:34.0000000Z");
    let console = BufferConsole::new();
    let mut tour = start(&storage, &console).await;
    console.clear();
    let before = storage.requests().len();

    tour.dispatch(Command::List);
    tour.wait_idle().await;

    let lines = console.lines();
    assert_eq!(lines.len(), 1 + 13 + 1);
    assert_eq!(
        lines[1],
        "Blob name: blob-00.txt, Snapshot: 2022-03-01T08:12:34.0000000Z"
    );
    assert_eq!(lines[2], "Blob name: blob-00.txt");
    assert_eq!(lines[13], "Blob name: blob-11.txt");
    assert_eq!(lines[14], "There are no more blobs to list.");

    let list_requests: Vec<_> = storage.requests()[before..]
        .iter()
        .map(|r| r.uri.query().unwrap_or_default().to_string())
        .collect();
    assert_eq!(list_requests.len(), 2);
    assert!(list_requests
        .iter()
        .all(|q| q.contains("maxresults=10") && q.contains("include=snapshots")));
}

#[tokio::test]
async fn test_delete_missing_blob_keeps_going() {
    let storage = MemoryHttpSend::new();
    let console = BufferConsole::new();
    let mut tour = start(&storage, &console).await;
    console.clear();

    tour.dispatch(Command::Delete);
    tour.wait_idle().await;

    let lines = console.lines();
    assert_eq!(lines[0], format!("Delete the blob: {BLOB_URL}"));
    assert_eq!(lines[1], "");
    assert!(lines[2].starts_with(">> An error encountered during deleteBlob: "));
    console.clear();

    tour.dispatch(Command::Upload);
    tour.dispatch(Command::List);
    tour.wait_idle().await;
    assert!(console.lines().contains(&"201".to_string()));

    tour.dispatch(Command::Delete);
    tour.wait_idle().await;
    assert!(console
        .lines()
        .contains(&format!(">> Blob deleted: {BLOB_URL}")));
    assert_eq!(storage.blob("tutorial", "HelloWorld.txt"), None);
}

#[tokio::test]
async fn test_run_ignores_unknown_input() {
    let storage = MemoryHttpSend::new();
    let console = BufferConsole::new();
    let tour = start(&storage, &console).await;
    let download = tour.files().download_path().to_path_buf();
    let startup_requests = storage.requests().len();

    tour.run(&b"x\n\np\nPut\nexit\n"[..]).await.unwrap();

    // Only the container delete of the implicit exit at end of input.
    let requests = storage.requests();
    assert_eq!(requests.len(), startup_requests + 1);
    assert_eq!(requests[startup_requests].method, Method::DELETE);
    assert!(!storage.container_exists("tutorial"));
    assert!(!download.exists());

    let lines = console.lines();
    assert_eq!(lines[1], "Enter a command");
    assert_eq!(
        lines[2],
        "(P)utBlob | (L)istBlobs | (G)etBlob | (D)eleteBlobs | (E)xitSample"
    );
    assert_eq!(
        lines.iter().filter(|l| *l == "# Enter a command : ").count(),
        6
    );
    assert_eq!(
        lines.last().map(String::as_str),
        Some("Cleaning up the sample and exiting!")
    );
}

#[tokio::test]
async fn test_run_exit_command() {
    let storage = MemoryHttpSend::new();
    let console = BufferConsole::new();
    let tour = start(&storage, &console).await;

    tour.run(&b"E\nP\n"[..]).await.unwrap();

    assert!(!storage.container_exists("tutorial"));
    assert!(!console
        .lines()
        .iter()
        .any(|l| l.starts_with("Uploading the sample file")));
}

#[tokio::test]
async fn test_run_ignores_undecodable_input() {
    let storage = MemoryHttpSend::new();
    let console = BufferConsole::new();
    let tour = start(&storage, &console).await;
    let download = tour.files().download_path().to_path_buf();

    tour.run(&b"\xff\xfe\nE\n"[..]).await.unwrap();

    assert!(!storage.container_exists("tutorial"));
    assert!(!download.exists());
    let lines = console.lines();
    assert_eq!(
        lines.iter().filter(|l| *l == "# Enter a command : ").count(),
        2
    );
    assert_eq!(
        lines.last().map(String::as_str),
        Some("Cleaning up the sample and exiting!")
    );
}

#[tokio::test]
async fn test_run_does_not_wait_for_commands() {
    let storage = MemoryHttpSend::new();
    let gate = GatedUploads::new(storage.clone());
    let console = BufferConsole::new();
    let tour = start_with(context_with(gate.clone(), &[]), &console)
        .await
        .unwrap();

    let (mut stdin, input) = tokio::io::duplex(64);
    let running = tokio::spawn(tour.run(BufReader::new(input)));

    stdin.write_all(b"P\n").await.unwrap();
    gate.arrived.notified().await;

    stdin.write_all(b"L\n").await.unwrap();
    wait_for_line(&console, |l| l == "There are no more blobs to list.").await;
    let lines = console.lines();
    assert!(lines.contains(&format!("Listing blobs in the container: {CONTAINER_URL}")));
    assert!(!lines.contains(&"Completed upload request.".to_string()));
    assert_eq!(storage.blob("tutorial", "HelloWorld.txt"), None);

    gate.release.notify_one();
    wait_for_line(&console, |l| l == "201").await;
    assert_eq!(
        storage.blob("tutorial", "HelloWorld.txt"),
        Some(Bytes::from("Hello Azure!"))
    );

    stdin.write_all(b"E\n").await.unwrap();
    running.await.unwrap().unwrap();
    assert!(!storage.container_exists("tutorial"));
}

#[tokio::test]
async fn test_run_keeps_going_after_failed_delete() {
    let storage = MemoryHttpSend::new();
    let console = BufferConsole::new();
    let tour = start(&storage, &console).await;

    let (mut stdin, input) = tokio::io::duplex(64);
    let running = tokio::spawn(tour.run(BufReader::new(input)));

    stdin.write_all(b"D\n").await.unwrap();
    wait_for_line(&console, |l| {
        l.starts_with(">> An error encountered during deleteBlob: ")
    })
    .await;

    stdin.write_all(b"L\n").await.unwrap();
    wait_for_line(&console, |l| l == "There are no more blobs to list.").await;
    assert!(console
        .lines()
        .contains(&format!("Listing blobs in the container: {CONTAINER_URL}")));

    drop(stdin);
    running.await.unwrap().unwrap();
    assert!(!storage.container_exists("tutorial"));
}

#[tokio::test]
async fn test_exit_after_container_deleted() {
    let storage = MemoryHttpSend::new();
    let console = BufferConsole::new();
    let tour = start(&storage, &console).await;
    tour.container().delete().await.unwrap();
    console.clear();

    tour.exit().await.unwrap();

    let lines = console.lines();
    assert_eq!(lines[0], "Cleaning up the sample and exiting!");
    assert!(lines[1].starts_with(">> An error encountered during cleanup: "));
    assert!(lines[1].contains("ContainerNotFound"));
}

#[tokio::test]
async fn test_start_without_credential() {
    let storage = MemoryHttpSend::new();
    let console = BufferConsole::new();
    let ctx = Context::new()
        .with_http_send(storage.clone())
        .with_env(StaticEnv::from_iter([("AZURE_STORAGE_ACCOUNT", "acct")]));

    let err = start_with(ctx, &console).await.unwrap_err();
    assert_eq!(err.exit_code(), 1);
    match err {
        TourError::StartupConfiguration(err) => {
            assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
            assert!(err.to_string().contains("AZURE_STORAGE_ACCESS_KEY"));
        }
        err => panic!("unexpected error: {err:?}"),
    }
    assert!(storage.requests().is_empty());
}

#[tokio::test]
async fn test_start_with_malformed_endpoint() {
    let storage = MemoryHttpSend::new();
    let console = BufferConsole::new();
    let ctx = context(&storage, &[("AZURE_STORAGE_ENDPOINT", "ftp://acct.example.com")]);

    let err = start_with(ctx, &console).await.unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_start_when_service_unreachable() {
    let console = BufferConsole::new();
    let ctx = Context::new().with_env(StaticEnv::from_iter([
        ("AZURE_STORAGE_ACCOUNT", "acct"),
        ("AZURE_STORAGE_ACCESS_KEY", "a2V5"),
    ]));

    let err = start_with(ctx, &console).await.unwrap_err();
    assert!(matches!(err, TourError::Remote(_)));
    assert_eq!(err.exit_code(), 3);
}
