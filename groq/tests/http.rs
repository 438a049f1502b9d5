//! Transport-level tests against a throwaway local HTTP server.
//!
//! Each server accepts one connection, reads the full request, and answers
//! with a canned status and body.

use groq::{Error, Groq, Message, Request, ToolChoice};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve a single canned response and return the URL to hit.
async fn serve_once(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    format!("http://{addr}/openai/v1/chat/completions")
}

/// Read headers, then as many body bytes as Content-Length announces.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn request() -> Request {
    Request::new(vec![Message::system("You are a guide."), Message::user("hello")])
        .with_tool_choice(ToolChoice::Auto)
        .with_max_tokens(64)
}

#[tokio::test]
async fn test_success_returns_first_choice() {
    let url = serve_once(
        "200 OK",
        r#"{"choices":[{"message":{"role":"assistant","content":"Hey!"},"finish_reason":"stop"},{"message":{"role":"assistant","content":"ignored"}}]}"#,
    )
    .await;

    let client = Groq::new("test-key").with_base_url(url);
    let response = client.complete(request()).await.unwrap();

    assert_eq!(response.text(), Some("Hey!"));
}

#[tokio::test]
async fn test_server_error_status() {
    let url = serve_once(
        "500 Internal Server Error",
        r#"{"error":{"message":"upstream exploded"}}"#,
    )
    .await;

    let client = Groq::new("test-key").with_base_url(url);
    let err = client.complete(request()).await.unwrap_err();

    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_status() {
    let url = serve_once("401 Unauthorized", "").await;

    let client = Groq::new("wrong-key").with_base_url(url);
    let err = client.complete(request()).await.unwrap_err();

    assert!(matches!(err, Error::Api { status: 401, .. }));
}

#[tokio::test]
async fn test_empty_object_is_malformed() {
    let url = serve_once("200 OK", "{}").await;

    let client = Groq::new("test-key").with_base_url(url);
    let err = client.complete(request()).await.unwrap_err();

    assert!(matches!(err, Error::MalformedResponse(_)));
}

#[tokio::test]
async fn test_garbage_body_is_parse_error() {
    let url = serve_once("200 OK", "<html>oops</html>").await;

    let client = Groq::new("test-key").with_base_url(url);
    let err = client.complete(request()).await.unwrap_err();

    assert!(matches!(err, Error::Parse(_)));
}

#[tokio::test]
async fn test_refused_connection_is_network_error() {
    // Bind and drop to get a port nothing is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Groq::new("test-key").with_base_url(format!("http://{addr}/v1/chat/completions"));
    let err = client.complete(request()).await.unwrap_err();

    assert!(matches!(err, Error::Network(_)));
}
