//! End-to-end assistant sessions over a real WebSocket client.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use slugge_engine::{AssistantConfig, ProcessingConfig, ProcessingTracker};
use slugge_server::{start, ServerConfig, ServerHandle};
use slugge_store::documents::DocumentRepo;
use slugge_store::projects::{NewProject, ProjectRepo};
use slugge_store::Database;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Boot a server over a seeded database and return it with the WS URL.
async fn boot_server() -> (ServerHandle, String) {
    let db = Database::in_memory().unwrap();
    let project = ProjectRepo::new(db.clone())
        .create(NewProject {
            name: "P1".into(),
            slug: Some("p1".into()),
            ..Default::default()
        })
        .unwrap();
    let docs = DocumentRepo::new(db.clone());
    docs.create(&project.id, "a.txt", b"alpha notes").unwrap();
    docs.create(&project.id, "b.txt", b"beta").unwrap();

    let tracker = Arc::new(ProcessingTracker::new(db.clone(), ProcessingConfig::default()));
    let config = ServerConfig {
        port: 0,
        ..Default::default()
    };
    let assistant = AssistantConfig {
        token_delay: Duration::from_millis(1),
        ..Default::default()
    };
    let handle = start(config, db, tracker, assistant).await.unwrap();
    let url = format!("ws://127.0.0.1:{}/v1/ws/assistant", handle.port());
    (handle, url)
}

async fn connect(url: &str) -> WsStream {
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

async fn send_json(ws: &mut WsStream, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

/// Next JSON text frame, skipping control frames.
async fn recv_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn recv_until_done(ws: &mut WsStream) -> Vec<Value> {
    let mut out = Vec::new();
    loop {
        let msg = recv_json(ws).await;
        let done = msg["type"] == "done";
        out.push(msg);
        if done {
            return out;
        }
    }
}

fn chunk_text(messages: &[Value]) -> String {
    messages
        .iter()
        .filter(|m| m["type"] == "chunk")
        .map(|m| m["text"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn hello_round_trip() {
    let (_server, url) = boot_server().await;
    let mut ws = connect(&url).await;

    send_json(&mut ws, json!({"type": "user", "project_id": "p1", "text": "hello"})).await;
    let messages = recv_until_done(&mut ws).await;

    assert_eq!(messages[0], json!({"type": "retrieval", "hits": []}));
    assert_eq!(
        chunk_text(&messages),
        "I found 0 related document(s): none. You asked: hello "
    );
    assert_eq!(messages.last().unwrap(), &json!({"type": "done", "cost": 0.000053}));
}

#[tokio::test]
async fn retrieval_finds_matching_documents() {
    let (_server, url) = boot_server().await;
    let mut ws = connect(&url).await;

    send_json(&mut ws, json!({"type": "user", "project_id": "p1", "text": "ALPHA"})).await;
    let messages = recv_until_done(&mut ws).await;
    assert_eq!(messages[0], json!({"type": "retrieval", "hits": ["a.txt"]}));
}

#[tokio::test]
async fn missing_text_reports_error_and_keeps_session() {
    let (_server, url) = boot_server().await;
    let mut ws = connect(&url).await;

    send_json(&mut ws, json!({"type": "user", "project_id": "p1"})).await;
    assert_eq!(
        recv_json(&mut ws).await,
        json!({"type": "error", "message": "project_id and text required"})
    );

    send_json(&mut ws, json!({"type": "user", "project_id": "p1", "text": "beta"})).await;
    let messages = recv_until_done(&mut ws).await;
    assert_eq!(messages[0], json!({"type": "retrieval", "hits": ["b.txt"]}));
}

#[tokio::test]
async fn non_user_frames_are_ignored() {
    let (_server, url) = boot_server().await;
    let mut ws = connect(&url).await;

    send_json(&mut ws, json!({"type": "ping"})).await;
    ws.send(Message::Text("not json".into())).await.unwrap();
    send_json(&mut ws, json!({"type": "user", "project_id": "p1", "text": "hello"})).await;

    // The first reply belongs to the only user frame.
    assert_eq!(recv_json(&mut ws).await["type"], "retrieval");
}

#[tokio::test]
async fn binary_frames_are_decoded() {
    let (_server, url) = boot_server().await;
    let mut ws = connect(&url).await;

    let frame = json!({"type": "user", "projectId": "p1", "text": "alpha"}).to_string();
    ws.send(Message::Binary(frame.into_bytes().into())).await.unwrap();
    let messages = recv_until_done(&mut ws).await;
    assert_eq!(messages[0]["hits"], json!(["a.txt"]));
}

#[tokio::test]
async fn health_counts_open_connections() {
    let (server, url) = boot_server().await;
    let health = format!("http://127.0.0.1:{}/v1/healthz", server.port());
    let mut ws = connect(&url).await;

    // Round trip once so the connection is registered.
    send_json(&mut ws, json!({"type": "user", "project_id": "p1", "text": "x"})).await;
    recv_until_done(&mut ws).await;

    let body: Value = reqwest::get(&health).await.unwrap().json().await.unwrap();
    assert_eq!(body["connections"], 1);

    ws.close(None).await.unwrap();
    let mut connections = 1;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let body: Value = reqwest::get(&health).await.unwrap().json().await.unwrap();
        connections = body["connections"].as_u64().unwrap();
        if connections == 0 {
            break;
        }
    }
    assert_eq!(connections, 0);
}
