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
use blobtour_azure_storage::{
    BlobServiceClient, Config, EnvCredentialProvider, Location, StaticCredentialProvider,
};
use blobtour_core::{Context, ErrorKind, Result, StaticEnv};
use blobtour_http_send_memory::MemoryHttpSend;
use bytes::Bytes;
use http::{Method, StatusCode};
use pretty_assertions::assert_eq;

fn init_service(storage: &MemoryHttpSend, config: Config) -> BlobServiceClient {
    let _ = env_logger::builder().is_test(true).try_init();

    let ctx = Context::new().with_http_send(storage.clone());
    BlobServiceClient::new(
        ctx,
        config.with_account_name("acct"),
        StaticCredentialProvider::new_shared_key("acct", "a2V5"),
    )
    .expect("config must be valid")
}

#[tokio::test]
async fn test_ensure_container_creates_missing() -> Result<()> {
    let storage = MemoryHttpSend::new();
    let service = init_service(&storage, Config::default());

    let container = service.ensure_container("tutorial").await?;
    assert_eq!(container.name(), "tutorial");
    assert_eq!(container.url(), "https://acct.blob.core.windows.net/tutorial");
    assert!(storage.container_exists("tutorial"));

    let methods: Vec<_> = storage.requests().into_iter().map(|r| r.method).collect();
    assert_eq!(methods, vec![Method::GET, Method::PUT]);
    Ok(())
}

#[tokio::test]
async fn test_ensure_container_binds_existing() -> Result<()> {
    let storage = MemoryHttpSend::new();
    storage.create_container("tutorial-archive");
    storage.create_container("tutorial");
    let service = init_service(&storage, Config::default());

    service.ensure_container("tutorial").await?;

    let requests = storage.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].uri.to_string(),
        "https://acct.blob.core.windows.net/?comp=list&prefix=tutorial"
    );
    Ok(())
}

#[tokio::test]
async fn test_ensure_container_prefix_match_is_not_enough() -> Result<()> {
    let storage = MemoryHttpSend::new();
    storage.create_container("tutorial-archive");
    let service = init_service(&storage, Config::default());

    service.ensure_container("tutorial").await?;
    assert!(storage.container_exists("tutorial"));
    Ok(())
}

#[tokio::test]
async fn test_create_container_conflict() -> Result<()> {
    let storage = MemoryHttpSend::new();
    storage.create_container("tutorial");
    let service = init_service(&storage, Config::default());

    let err = service.create_container("tutorial").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert!(err.to_string().contains("ContainerAlreadyExists"));
    Ok(())
}

#[tokio::test]
async fn test_container_handle_create_and_delete() -> Result<()> {
    let storage = MemoryHttpSend::new();
    let service = init_service(&storage, Config::default());
    let container = service.container_client("scratch");

    container.create().await?;
    assert!(storage.container_exists("scratch"));
    let err = container.create().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    container.delete().await?;
    assert!(!storage.container_exists("scratch"));
    container.create().await?;
    assert!(storage.container_exists("scratch"));
    Ok(())
}

#[tokio::test]
async fn test_upload_then_download() -> Result<()> {
    let storage = MemoryHttpSend::new();
    let service = init_service(&storage, Config::default());
    let blob = service
        .ensure_container("tutorial")
        .await?
        .blob_client("HelloWorld.txt");

    let uploaded = blob.upload(Bytes::from("Hello Azure!")).await?;
    assert_eq!(uploaded.status, StatusCode::CREATED);
    assert!(uploaded.etag.is_some());

    // Uploading again replaces the content.
    blob.upload(Bytes::from("Hello again, Azure!")).await?;

    let downloaded = blob.download().await?;
    assert_eq!(downloaded.status, StatusCode::OK);
    assert_eq!(downloaded.content, Bytes::from("Hello again, Azure!"));
    assert_eq!(downloaded.location(), Location::Primary);

    let part = blob.download_range(6..11).await?;
    assert_eq!(part.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(part.content, Bytes::from("again"));
    Ok(())
}

#[tokio::test]
async fn test_download_from_secondary() -> Result<()> {
    let storage = MemoryHttpSend::new();
    storage.put_blob("tutorial", "HelloWorld.txt", "Hello Azure!");
    let service = init_service(
        &storage,
        Config::default().with_read_location(Location::Secondary),
    );
    let blob = service
        .container_client("tutorial")
        .blob_client("HelloWorld.txt");

    let downloaded = blob.download().await?;
    assert_eq!(downloaded.location(), Location::Secondary);
    assert_eq!(
        downloaded.request_uri.to_string(),
        "https://acct-secondary.blob.core.windows.net/tutorial/HelloWorld.txt"
    );
    assert_eq!(storage.requests().len(), 1);

    // Writes always go to the primary.
    blob.upload(Bytes::from("Hello Azure!")).await?;
    Ok(())
}

#[tokio::test]
async fn test_list_blobs_follows_markers() -> Result<()> {
    let storage = MemoryHttpSend::new();
    for i in 0..23 {
        storage.put_blob("tutorial", &format!("blob-{i:02}.txt"), "x");
    }
    let service = init_service(&storage, Config::default());

    let mut lister = service.container_client("tutorial").list_blobs(Some(10));
    let mut names = vec![];
    while let Some(item) = lister.next_blob().await? {
        names.push(item.name);
    }

    let expected: Vec<_> = (0..23).map(|i| format!("blob-{i:02}.txt")).collect();
    assert_eq!(names, expected);
    assert_eq!(storage.requests().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_list_blobs_with_snapshots() -> Result<()> {
    let storage = MemoryHttpSend::new();
    storage.put_blob("tutorial", "HelloWorld.txt", "Hello Azure!");
    storage.snapshot_blob("tutorial", "HelloWorld.txt", "2022-03-01T08:12:34.0000000Z");
    let service = init_service(&storage, Config::default());

    let mut lister = service.container_client("tutorial").list_blobs(Some(10));
    let page = lister.next_page().await?.expect("first page must exist");
    assert_eq!(page.len(), 2);
    assert_eq!(
        page[0].snapshot.as_deref(),
        Some("2022-03-01T08:12:34.0000000Z")
    );
    assert_eq!(page[1].snapshot, None);
    assert_eq!(page[1].content_length, 12);
    assert!(page[1].last_modified.is_some());

    assert!(lister.next_page().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_list_empty_container() -> Result<()> {
    let storage = MemoryHttpSend::new();
    storage.create_container("tutorial");
    let service = init_service(&storage, Config::default());

    let mut lister = service.container_client("tutorial").list_blobs(Some(10));
    assert_eq!(lister.next_blob().await?, None);
    assert_eq!(lister.next_blob().await?, None);
    assert_eq!(storage.requests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_delete_errors() -> Result<()> {
    let storage = MemoryHttpSend::new();
    storage.create_container("tutorial");
    let service = init_service(&storage, Config::default());
    let container = service.container_client("tutorial");

    let err = container.blob_client("missing.txt").delete().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("BlobNotFound"));

    container.delete().await?;
    let err = container.delete().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_missing_credential() -> Result<()> {
    let storage = MemoryHttpSend::new();
    let ctx = Context::new()
        .with_http_send(storage.clone())
        .with_env(StaticEnv::from_iter([("AZURE_STORAGE_ACCOUNT", "acct")]));
    let config = Config::default().from_env(&ctx)?;
    let service = BlobServiceClient::new(ctx, config, EnvCredentialProvider::new())?;

    assert!(service.credential().await?.is_none());

    let err = service.ensure_container("tutorial").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    assert!(storage.requests().is_empty());
    Ok(())
}
