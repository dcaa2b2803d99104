//! Dropping a chunk stream must release the provider connection.

use futures::StreamExt;
use personatalk_core::{ModelService, OpenAiCompatibleService};
use personatalk_types::{ChatMessage, ChatRequest, ServiceConfig};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const SSE_HEAD: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\n\r\n";
const FRAME: &str = "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hi\"}}]}\n\n";

/// Sends one frame of a never-ending chunked SSE body, then reports whether
/// the client closed the socket.
async fn open_ended_provider() -> (String, oneshot::Receiver<bool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0_u8; 8192];
        let _ = socket.read(&mut buf).await;

        let chunk = format!("{}{:x}\r\n{}\r\n", SSE_HEAD, FRAME.len(), FRAME);
        socket.write_all(chunk.as_bytes()).await.unwrap();

        let eof = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(_) => {},
                }
            }
        })
        .await
        .is_ok();
        let _ = closed_tx.send(eof);
    });

    (format!("http://{}", addr), closed_rx)
}

#[tokio::test]
async fn test_dropping_stream_closes_provider_connection() {
    let (url, closed) = open_ended_provider().await;
    let config = ServiceConfig::new("sk-test", url, "m").with_timeout_secs(10).with_retries(1, 0.0);
    let service = OpenAiCompatibleService::new("openai", config).unwrap();

    let mut stream = service
        .chat_completion_stream(&ChatRequest::new(vec![ChatMessage::user("hi")]))
        .await
        .unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.first_content(), Some("Hi"));

    drop(stream);

    assert!(closed.await.unwrap(), "provider socket still open after the stream was dropped");
}
