use base64::Engine;
use serde_json::Value;
use snapsense::shell::{CaptionReady, CaptionState, ShellCommand, ShellEvent};
use snapsense::{Caption, CaptionClient, CaptionError, Config, Shell, SystemTools};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

const IMAGE_BYTES: &[u8] = b"not really a png, but not empty either";

/// Accepts one connection, hands back the decoded request body and answers
/// with `status` and `chunks`, written one at a time.
async fn serve_once(status: &'static str, chunks: Vec<&'static str>) -> (String, oneshot::Receiver<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}/api/generate", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let body = read_request_body(&mut socket).await;
        let _ = tx.send(serde_json::from_slice(&body).unwrap_or(Value::Null));

        let length: usize = chunks.iter().map(|c| c.len()).sum();
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/x-ndjson\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status, length
        );
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        for chunk in chunks {
            if socket.write_all(chunk.as_bytes()).await.is_err() {
                return;
            }
            let _ = socket.flush().await;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let _ = socket.shutdown().await;
    });

    (endpoint, rx)
}

async fn read_request_body(socket: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    buf[header_end..(header_end + length).min(buf.len())].to_vec()
}

fn write_image(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn client_for(endpoint: &str) -> CaptionClient {
    CaptionClient::new(reqwest::Client::new(), endpoint, "moondream")
}

#[tokio::test]
async fn fragments_are_concatenated_in_order() {
    let dir = TempDir::new().unwrap();
    let image = write_image(&dir, "photo.png", IMAGE_BYTES);
    let (endpoint, request) = serve_once(
        "200 OK",
        vec![
            "{\"response\":\"A\",\"done\":false}\n{\"respo",
            "nse\":\"B\",\"done\":false}\n",
            "{\"response\":\"\",\"done\":true,\"done_reason\":\"stop\"}\n",
        ],
    )
    .await;

    let result = client_for(&endpoint).retrieve(&image, "Describe this").await;
    assert_eq!(result, Ok(Caption::Text("AB".into())));

    let body = request.await.unwrap();
    assert_eq!(body["model"], "moondream");
    assert_eq!(body["prompt"], "Describe this");
    assert_eq!(body["stream"], true);
    assert_eq!(
        body["images"][0],
        base64::engine::general_purpose::STANDARD.encode(IMAGE_BYTES)
    );
}

#[tokio::test]
async fn malformed_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let image = write_image(&dir, "photo.jpg", IMAGE_BYTES);
    let (endpoint, _request) = serve_once(
        "200 OK",
        vec!["{\"response\":\"Hi\"}\nnot json at all\n{\"done\":true}\n"],
    )
    .await;

    let result = client_for(&endpoint).retrieve(&image, "Describe").await;
    assert_eq!(result, Ok(Caption::Text("Hi".into())));
}

#[tokio::test]
async fn immediate_done_means_no_caption() {
    let dir = TempDir::new().unwrap();
    let image = write_image(&dir, "photo.png", IMAGE_BYTES);
    let (endpoint, _request) = serve_once("200 OK", vec!["{\"done\":true}\n"]).await;

    let result = client_for(&endpoint).retrieve(&image, "Describe").await;
    assert_eq!(result, Ok(Caption::NoCaption));
    assert_eq!(result.unwrap().to_string(), "(No caption returned)");
}

#[tokio::test]
async fn error_line_is_reported_by_service() {
    let dir = TempDir::new().unwrap();
    let image = write_image(&dir, "photo.png", IMAGE_BYTES);
    let (endpoint, _request) = serve_once(
        "200 OK",
        vec!["{\"response\":\"A\"}\n{\"error\":\"model runner crashed\"}\n"],
    )
    .await;

    let result = client_for(&endpoint).retrieve(&image, "Describe").await;
    assert_eq!(
        result,
        Err(CaptionError::Service("model runner crashed".into()))
    );
}

#[tokio::test]
async fn error_status_is_a_network_error() {
    let dir = TempDir::new().unwrap();
    let image = write_image(&dir, "photo.png", IMAGE_BYTES);
    let (endpoint, _request) = serve_once(
        "404 Not Found",
        vec!["{\"error\":\"model 'moondream' not found\"}"],
    )
    .await;

    match client_for(&endpoint).retrieve(&image, "Describe").await {
        Err(CaptionError::Network(message)) => {
            assert!(message.contains("404"), "{}", message);
            assert!(message.contains("model 'moondream' not found"), "{}", message);
        }
        other => panic!("expected a network error, got {:?}", other),
    }
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
    let dir = TempDir::new().unwrap();
    let image = write_image(&dir, "photo.png", IMAGE_BYTES);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}/api/generate", listener.local_addr().unwrap());
    drop(listener);

    let result = client_for(&endpoint).retrieve(&image, "Describe").await;
    let err = result.unwrap_err();
    assert!(matches!(err, CaptionError::Network(_)), "{:?}", err);
    assert!(err.display_text().starts_with("(Error talking to Ollama: "));
}

#[tokio::test]
async fn invalid_images_never_reach_the_service() {
    let dir = TempDir::new().unwrap();
    let empty = write_image(&dir, "empty.png", b"");
    let missing = dir.path().join("missing.png");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = client_for(&format!("http://{}/api/generate", listener.local_addr().unwrap()));

    for path in [empty.as_path(), missing.as_path(), dir.path()] {
        let result = client.retrieve(path, "Describe").await;
        assert_eq!(result, Err(CaptionError::InvalidImage(path.to_path_buf())));
        assert_eq!(
            result.unwrap_err().display_text(),
            format!("(Error: invalid image → {})", path.display())
        );
    }

    let accepted = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
    assert!(accepted.is_err(), "no connection should have been attempted");
}

async fn wait_for_caption(shell: &mut Shell) {
    let event = tokio::time::timeout(Duration::from_secs(10), shell.next_event())
        .await
        .expect("caption did not arrive")
        .expect("event channel closed");
    assert!(matches!(event, ShellEvent::CaptionReady(_)));
    shell.handle_event(event).await.unwrap();
}

fn saved_caption(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn shell_captions_then_saves() {
    let dir = TempDir::new().unwrap();
    let image = write_image(&dir, "scene.png", IMAGE_BYTES);
    let (endpoint, request) = serve_once(
        "200 OK",
        vec!["{\"response\":\"A cat \"}\n{\"response\":\"on a mat.\"}\n{\"done\":true}\n"],
    )
    .await;

    let config = Config::new();
    let default_prompt = config.default_prompt.clone();
    let mut shell = Shell::new(config, client_for(&endpoint), Arc::new(SystemTools::new()));

    shell.execute(ShellCommand::Open(image.clone())).await.unwrap();
    assert_eq!(shell.state().caption(), &CaptionState::Generating);

    wait_for_caption(&mut shell).await;
    assert_eq!(
        shell.state().caption(),
        &CaptionState::Ready("A cat on a mat.".into())
    );
    assert_eq!(request.await.unwrap()["prompt"], Value::String(default_prompt));

    let target = dir.path().join("notes");
    shell
        .execute(ShellCommand::Save(Some(target.clone())))
        .await
        .unwrap();
    let contents = saved_caption(&target.with_extension("txt"));
    assert_eq!(
        contents,
        format!(
            "Image Source: {}\n{}\nA cat on a mat.",
            image.display(),
            "-".repeat(20)
        )
    );
}

#[tokio::test]
async fn shell_keeps_only_the_latest_caption() {
    let dir = TempDir::new().unwrap();
    let first = write_image(&dir, "first.png", IMAGE_BYTES);
    let second = write_image(&dir, "second.png", IMAGE_BYTES);
    // Connections queue on this listener and never get an answer.
    let silent = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}/api/generate", silent.local_addr().unwrap());

    let mut shell = Shell::new(Config::new(), client_for(&endpoint), Arc::new(SystemTools::new()));
    shell.execute(ShellCommand::Open(first.clone())).await.unwrap();
    let stale = shell.state().generation();
    shell.execute(ShellCommand::Open(second.clone())).await.unwrap();
    let current = shell.state().generation();
    assert!(current > stale);

    let events = shell.events();
    events
        .send(ShellEvent::CaptionReady(CaptionReady {
            generation: stale,
            image: first,
            result: Ok(Caption::Text("old".into())),
        }))
        .unwrap();
    wait_for_caption(&mut shell).await;
    assert_eq!(shell.state().caption(), &CaptionState::Generating);
    assert_eq!(shell.state().image(), Some(second.as_path()));

    events
        .send(ShellEvent::CaptionReady(CaptionReady {
            generation: current,
            image: second,
            result: Ok(Caption::Text("new".into())),
        }))
        .unwrap();
    wait_for_caption(&mut shell).await;
    assert_eq!(shell.state().caption(), &CaptionState::Ready("new".into()));
}
