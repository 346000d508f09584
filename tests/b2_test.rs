mod common;

use axum::http::StatusCode;
use bytes::Bytes;
use std::time::Duration;

use common::{ACCOUNT_TOKEN, b2_server};
use zipbox::storage::{B2Client, B2Config, B2Connector, StorageError, StoreConnector, build_url};

fn b2_config(auth_url: &str) -> B2Config {
    B2Config {
        auth_url: auth_url.to_string(),
        key_id: "key-id".to_string(),
        application_key: "app-key".to_string(),
        bucket_id: "bucket-123".to_string(),
        bucket_name: "media-bucket".to_string(),
        public_host: "files.example.com".to_string(),
        request_timeout: Duration::from_secs(5),
        insecure_skip_verify: false,
    }
}

async fn connect(base: &str) -> Result<B2Client, StorageError> {
    let config = b2_config(base);
    let http = config.http_client().unwrap();
    B2Client::connect(http, config).await
}

#[tokio::test]
async fn test_each_upload_uses_a_fresh_credential() {
    let server = b2_server(StatusCode::OK, StatusCode::OK).await;
    let client = connect(&server.base).await.unwrap();

    assert_eq!(client.session().authorization_token, ACCOUNT_TOKEN);

    let first = client
        .upload(Bytes::from_static(b"first archive"), "job-1.zip")
        .await
        .unwrap();
    let second = client
        .upload(Bytes::from_static(b"second archive"), "job-2.zip")
        .await
        .unwrap();

    assert_eq!(first, "https://files.example.com/file/media-bucket/job-1.zip");
    assert_eq!(second, build_url("files.example.com", "media-bucket", "job-2.zip"));

    assert_eq!(server.authorizations(), 1);
    assert_eq!(server.upload_url_requests(), 2);

    let uploads = server.uploads();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[0].slot, 1);
    assert_eq!(uploads[0].authorization, "upload-token-1");
    assert_eq!(uploads[1].slot, 2);
    assert_eq!(uploads[1].authorization, "upload-token-2");
}

#[tokio::test]
async fn test_upload_headers() {
    let server = b2_server(StatusCode::OK, StatusCode::OK).await;
    let client = connect(&server.base).await.unwrap();

    client
        .upload(Bytes::from_static(b"PK\x03\x04"), "campaign-7.zip")
        .await
        .unwrap();

    let upload = &server.uploads()[0];
    assert_eq!(upload.file_name, "campaign-7.zip");
    assert_eq!(upload.content_sha1, "do_not_verify");
    assert_eq!(upload.author, "zipbox");
    assert_eq!(upload.content_type, "application/octet-stream");
    assert_eq!(upload.body, b"PK\x03\x04");
}

#[tokio::test]
async fn test_rejected_credentials_fail_connect() {
    let server = b2_server(StatusCode::UNAUTHORIZED, StatusCode::OK).await;

    let err = connect(&server.base).await.err().unwrap();

    assert!(matches!(err, StorageError::Authentication(_)));
    assert_eq!(server.upload_url_requests(), 0);
}

#[tokio::test]
async fn test_non_200_upload_is_an_error() {
    let server = b2_server(StatusCode::OK, StatusCode::INTERNAL_SERVER_ERROR).await;
    let client = connect(&server.base).await.unwrap();

    let err = client
        .upload(Bytes::from_static(b"data"), "job.zip")
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::UploadFailed(ref msg) if msg.contains("500")));
    assert_eq!(server.uploads().len(), 1);
}

#[tokio::test]
async fn test_connector_authorizes_per_connect() {
    let server = b2_server(StatusCode::OK, StatusCode::OK).await;
    let connector = B2Connector::new(b2_config(&server.base)).unwrap();

    let store = connector.connect().await.unwrap();
    store.upload(Bytes::from_static(b"a"), "a.zip").await.unwrap();
    let store = connector.connect().await.unwrap();
    store.upload(Bytes::from_static(b"b"), "b.zip").await.unwrap();

    assert_eq!(server.authorizations(), 2);
    assert_eq!(server.upload_url_requests(), 2);
}

#[tokio::test]
async fn test_object_name_is_percent_encoded() {
    let server = b2_server(StatusCode::OK, StatusCode::OK).await;
    let client = connect(&server.base).await.unwrap();

    let download_url = client
        .upload(Bytes::from_static(b"PK\x03\x04"), "spring sale #1.zip")
        .await
        .unwrap();

    assert_eq!(server.uploads()[0].file_name, "spring%20sale%20%231.zip");
    assert_eq!(
        download_url,
        "https://files.example.com/file/media-bucket/spring%20sale%20%231.zip"
    );

    let parsed = reqwest::Url::parse(&download_url).unwrap();
    assert_eq!(parsed.path(), "/file/media-bucket/spring%20sale%20%231.zip");
    assert!(parsed.fragment().is_none());
}

#[tokio::test]
async fn test_expired_session_fails_without_reauthorizing() {
    let server = b2_server(StatusCode::OK, StatusCode::OK).await;
    let client = connect(&server.base).await.unwrap();
    server.expire_session();

    let err = client
        .upload(Bytes::from_static(b"data"), "job.zip")
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Authentication(ref msg) if msg.contains("401")));
    assert_eq!(server.authorizations(), 1);
    assert_eq!(server.upload_url_requests(), 0);
    assert!(server.uploads().is_empty());
}
