use bytes::Bytes;
use depot_client::{
    ApiClient, Auth, ClientError, HttpTransport, SignedUrlApi, UploadApi, UploadFile,
    UploadOrchestrator, UploadStatus, UploadTaskStore,
};
use depot_core::models::IssuePutRequest;
use depot_core::UploadRules;
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const RECORD_ID: &str = "5b0f6c3e-8d2a-4a8e-9a43-3f1f6a2b7c11";

fn client(server: &mockito::Server) -> ApiClient {
    ApiClient::new(server.url(), Auth::Bearer("writer-token".to_string())).unwrap()
}

fn issue_request() -> IssuePutRequest {
    IssuePutRequest {
        group_id: "g1".to_string(),
        file_name: "demo.png".to_string(),
        file_type: "image/png".to_string(),
        file_size: 4,
    }
}

#[tokio::test]
async fn test_error_body_becomes_api_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/v0/uploads/presigned")
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "error": "No write access to group 'g1'",
                "code": "FORBIDDEN",
                "recoverable": false
            })
            .to_string(),
        )
        .create_async()
        .await;

    let err = client(&server).issue_put_url(&issue_request()).await.unwrap_err();
    match err {
        ClientError::Api {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 403);
            assert_eq!(code, "FORBIDDEN");
            assert_eq!(message, "No write access to group 'g1'");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_issue_put_url_sends_bearer_and_decodes() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v0/uploads/presigned")
        .match_header("authorization", "Bearer writer-token")
        .match_body(Matcher::PartialJson(json!({
            "groupId": "g1",
            "fileName": "demo.png",
            "fileType": "image/png",
            "fileSize": 4
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "uploadUrl": "http://store.test/objects/images/g1/1-demo.png?signature=abc",
                "objectKey": "images/g1/1-demo.png",
                "expiresAt": "2030-01-01T00:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let issued = client(&server).issue_put_url(&issue_request()).await.unwrap();
    mock.assert_async().await;
    assert_eq!(issued.object_key, "images/g1/1-demo.png");
    assert!(issued.upload_url.contains("signature=abc"));
}

#[tokio::test]
async fn test_batch_signed_urls_keep_failed_keys() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/v0/urls/signed/batch")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "signedUrls": { "images/g1/a.png": "http://store.test/a" },
                "errors": ["images/g1/gone.png"],
                "expiresAt": "2030-01-01T00:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let response = client(&server)
        .signed_urls(&["images/g1/a.png".to_string(), "images/g1/gone.png".to_string()])
        .await
        .unwrap();
    assert_eq!(response.signed_urls.len(), 1);
    assert_eq!(response.failed_keys(), ["images/g1/gone.png".to_string()]);
}

#[tokio::test]
async fn test_unexpected_body_is_decode_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v0/groups/g1/records")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{\"not\": \"a list\"}")
        .create_async()
        .await;

    let err = client(&server).list_records("g1").await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn test_orchestrator_runs_full_protocol_against_http() {
    let mut server = mockito::Server::new_async().await;
    let upload_url = format!("{}/objects/images/g1/1-demo.png?signature=abc", server.url());

    let issue = server
        .mock("POST", "/api/v0/uploads/presigned")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "uploadUrl": upload_url,
                "objectKey": "images/g1/1-demo.png",
                "expiresAt": "2030-01-01T00:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/objects/images/g1/1-demo.png")
        .match_query(Matcher::UrlEncoded("signature".into(), "abc".into()))
        .match_header("content-type", "image/png")
        .with_status(200)
        .create_async()
        .await;
    let finalize = server
        .mock("POST", "/api/v0/uploads/finalize")
        .match_body(Matcher::PartialJson(json!({
            "groupId": "g1",
            "objectKey": "images/g1/1-demo.png",
            "fileSize": 4
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": RECORD_ID,
                "groupId": "g1",
                "name": "demo.png",
                "objectKey": "images/g1/1-demo.png",
                "byteSize": 4,
                "mimeType": "image/png",
                "createdAt": "2030-01-01T00:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let store = Arc::new(UploadTaskStore::new(UploadRules::default()));
    let orchestrator = UploadOrchestrator::new(
        Arc::new(client(&server)),
        Arc::new(HttpTransport::new().unwrap()),
        store.clone(),
    )
    .with_removal_delay(Duration::from_secs(60));

    let handle = orchestrator.submit(
        "g1",
        vec![UploadFile::new("demo.png", "image/png", Bytes::from_static(b"\x89PNG"))],
    );
    let task_id = handle.task_ids()[0];
    let outcomes = handle.wait().await;

    issue.assert_async().await;
    put.assert_async().await;
    finalize.assert_async().await;

    let record = outcomes[0].result.as_ref().unwrap();
    assert_eq!(record.id.to_string(), RECORD_ID);
    assert_eq!(record.byte_size, 4);

    let task = store.get_task(task_id).unwrap();
    assert_eq!(task.status, UploadStatus::Succeeded);
    assert_eq!(task.progress, 100);
    assert_eq!(task.object_key.as_deref(), Some("images/g1/1-demo.png"));
}
