//! Integration tests for the WebSocket transport layer: the connected
//! handshake, malformed frames, and the health endpoint.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use village_server::state::AppState;

type WsClient = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

fn test_state() -> AppState {
    AppState {
        connections: village_server::ws::new_connection_registry(),
        groups: Arc::new(village_server::ws::VillageGroups::new()),
        villages: Arc::new(village_server::village::VillageRegistry::new()),
        states: village_server::router::new_connection_states(),
        access_keys: Arc::new(village_server::auth::StaticAccessKeys::new(HashMap::from([
            ("t1".to_string(), "secret-key".to_string()),
        ]))),
        notifier: Arc::new(village_server::notify::LogNotifier),
        bot: Arc::new(village_server::bot::EchoBot),
        default_village_name: "Village ABC".to_string(),
    }
}

/// Start the server on a random port and return its address.
async fn start_test_server(state: AppState) -> String {
    let app = village_server::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr.to_string()
}

async fn connect(addr: &str) -> WsClient {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("Failed to connect");
    ws
}

async fn recv_event(ws: &mut WsClient) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("Timed out waiting for event")
            .expect("Connection closed")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("Invalid JSON from server");
        }
    }
}

#[tokio::test]
async fn connected_handshake_assigns_uuid() {
    let addr = start_test_server(test_state()).await;
    let mut ws = connect(&addr).await;

    let event = recv_event(&mut ws).await;
    assert_eq!(event["event"], "connected");
    let id = event["data"]["connectionId"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn each_connection_gets_a_distinct_id() {
    let addr = start_test_server(test_state()).await;
    let mut first = connect(&addr).await;
    let mut second = connect(&addr).await;

    let first_id = recv_event(&mut first).await["data"]["connectionId"]
        .as_str()
        .unwrap()
        .to_string();
    let second_id = recv_event(&mut second).await["data"]["connectionId"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(first_id, second_id);
}

#[tokio::test]
async fn malformed_frames_yield_error_events() {
    let addr = start_test_server(test_state()).await;
    let mut ws = connect(&addr).await;
    recv_event(&mut ws).await; // connected

    // Not JSON at all.
    ws.send(Message::Text("not json".into())).await.unwrap();
    let error = recv_event(&mut ws).await;
    assert_eq!(error["event"], "error");
    assert_eq!(error["data"]["message"], "Invalid event payload");

    // Valid JSON, unknown event name.
    ws.send(Message::Text(
        json!({ "event": "teleport", "data": {} }).to_string().into(),
    ))
    .await
    .unwrap();
    let error = recv_event(&mut ws).await;
    assert_eq!(error["data"]["message"], "Invalid event payload");
}

#[tokio::test]
async fn binary_frames_are_ignored_and_connection_survives() {
    let addr = start_test_server(test_state()).await;
    let mut ws = connect(&addr).await;
    recv_event(&mut ws).await; // connected

    ws.send(Message::Binary(vec![0, 1, 2, 3].into()))
        .await
        .unwrap();

    // The connection still processes events afterwards.
    ws.send(Message::Text(
        json!({
            "event": "join",
            "data": {
                "name": "Alice",
                "email": "alice@example.com",
                "role": "consumer",
                "villageId": "t1",
                "message": "Hi",
            }
        })
        .to_string()
        .into(),
    ))
    .await
    .unwrap();
    let event = recv_event(&mut ws).await;
    assert_eq!(event["event"], "botTyping");
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let addr = start_test_server(test_state()).await;

    let body: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .error_for_status()
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].as_str().is_some());
}
