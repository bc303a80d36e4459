mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use common::TestApp;
use futures_util::{SinkExt, StreamExt};
use marketplace::{app, store::Role};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(test_app: &TestApp) -> Socket {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let router = app(test_app.state.clone());
    tokio::spawn(async move { axum::serve(listener, router).await });

    let (socket, _) = connect_async(format!("ws://{address}/ws")).await.unwrap();
    socket
}

async fn next_event(socket: &mut Socket) -> Value {
    let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("no frame within 5s")
        .unwrap()
        .unwrap();
    serde_json::from_str(frame.to_text().unwrap()).unwrap()
}

fn register_frame(user_id: &str, user_type: &str) -> Message {
    Message::text(
        json!({ "event": "register", "data": { "userId": user_id, "userType": user_type } }).to_string(),
    )
}

#[tokio::test]
async fn socket_registers_on_request_and_leaves_on_close() {
    let app = TestApp::new().await;
    let presence = app.state.presence.clone();
    let mut socket = connect(&app).await;

    socket.send(Message::text("not json")).await.unwrap();
    socket.send(register_frame("u1", "ngo")).await.unwrap();

    let ack = next_event(&mut socket).await;
    assert_eq!(ack["event"], "registered");
    assert_eq!(ack["data"], json!({ "userId": "u1", "role": "ngo" }));
    assert!(presence.lookup("u1").is_some());
    assert_eq!(presence.role_of("u1"), Some(Role::Ngo));
    assert_eq!(presence.len(), 1);

    socket.close(None).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while presence.lookup("u1").is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("entry still present after close");
    assert!(presence.is_empty());
}

#[tokio::test]
async fn connected_sockets_are_not_registered_until_they_ask() {
    let app = TestApp::new().await;
    let mut socket = connect(&app).await;
    assert!(app.state.presence.is_empty());

    socket.send(Message::text("{\"event\":\"hello\"}")).await.unwrap();
    socket.send(register_frame("late", "donor")).await.unwrap();

    // The ack for the only valid frame proves the first one was ignored.
    let ack = next_event(&mut socket).await;
    assert_eq!(ack["data"]["userId"], "late");
    assert_eq!(app.state.presence.len(), 1);
}

#[tokio::test]
async fn booking_reaches_the_donor_socket() {
    let app = TestApp::new().await;
    let (donor_id, donor_token) = app.register("Bakery", "donor").await;
    let (_, ngo_token) = app.register("Shelter", "ngo").await;

    let mut socket = connect(&app).await;
    socket.send(register_frame(&donor_id, "donor")).await.unwrap();
    assert_eq!(next_event(&mut socket).await["event"], "registered");

    let (_, body) = app
        .request(
            Method::POST,
            "/api/food",
            Some(json!({ "title": "Bread", "quantity": 2, "location": "Main St" })),
            Some(&donor_token),
        )
        .await;
    let food_id = body["food"]["id"].as_str().unwrap().to_owned();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/ngo/book-food",
            Some(json!({ "foodId": food_id })),
            Some(&ngo_token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["notified"], true);

    let pushed = next_event(&mut socket).await;
    assert_eq!(pushed["event"], "foodBooked");
    assert_eq!(pushed["data"]["food"]["id"], food_id.as_str());
    assert_eq!(pushed["data"]["booking"]["id"], body["booking"]["id"]);
}
