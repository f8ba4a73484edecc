use bytes::Bytes;
use depot_client::{ClientError, HttpTransport, ObjectTransport, TransferEvent};
use futures::StreamExt;

const OBJECT_PATH: &str = "/objects/images/g1/1700000000000-a.png";

fn payload(len: usize) -> Bytes {
    Bytes::from(vec![7u8; len])
}

async fn run_put(url: &str, data: Bytes) -> Vec<Result<TransferEvent, ClientError>> {
    let transport = HttpTransport::new().unwrap().with_chunk_size(64 * 1024);
    transport.put(url, "image/png", data).collect().await
}

#[tokio::test]
async fn test_put_reports_progress_then_completion() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PUT", OBJECT_PATH)
        .match_header("content-type", "image/png")
        .with_status(200)
        .create_async()
        .await;

    let total = 200_000u64;
    let events = run_put(&format!("{}{}", server.url(), OBJECT_PATH), payload(total as usize)).await;
    mock.assert_async().await;

    let (last, progress) = events.split_last().unwrap();
    assert_eq!(*last.as_ref().unwrap(), TransferEvent::Completed { status: 200 });

    let sent: Vec<u64> = progress
        .iter()
        .map(|event| match event {
            Ok(TransferEvent::Progress { sent, total: t }) => {
                assert_eq!(*t, total);
                *sent
            }
            other => panic!("unexpected event {:?}", other),
        })
        .collect();
    assert_eq!(sent.len(), 4);
    assert!(sent.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(sent.last(), Some(&total));
}

#[tokio::test]
async fn test_rejected_put_completes_with_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("PUT", OBJECT_PATH)
        .with_status(403)
        .with_body("Signed URL has expired")
        .create_async()
        .await;

    let events = run_put(&format!("{}{}", server.url(), OBJECT_PATH), payload(10)).await;
    assert_eq!(
        *events.last().unwrap().as_ref().unwrap(),
        TransferEvent::Completed { status: 403 }
    );
}

#[tokio::test]
async fn test_unreachable_store_ends_with_transport_error() {
    let events = run_put("http://127.0.0.1:1/objects/a.png", payload(10)).await;
    assert!(matches!(events.last(), Some(Err(ClientError::Transport(_)))));
}
