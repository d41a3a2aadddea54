use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use crate::fixtures::seed::day;
use crate::fixtures::test_app::TestApp;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(app: &TestApp, token: &str) -> Socket {
    let (socket, _) = connect_async(app.ws_url(token))
        .await
        .expect("WebSocket handshake failed");
    socket
}

/// Next JSON frame of the given type, skipping anything else.
async fn next_of_type(socket: &mut Socket, wanted: &str) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let frame = tokio::time::timeout_at(deadline, socket.next())
            .await
            .unwrap_or_else(|_| panic!("Timed out waiting for '{}'", wanted))
            .expect("Socket closed")
            .expect("Socket error");
        if let Message::Text(text) = frame {
            let json: Value = serde_json::from_str(text.as_str()).unwrap();
            if json["type"] == wanted {
                return json;
            }
        }
    }
}

async fn send_json(socket: &mut Socket, value: Value) {
    socket
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

#[tokio::test]
async fn handshake_rejects_invalid_token() {
    let app = TestApp::spawn().await;
    let result = connect_async(app.ws_url("not-a-jwt")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn session_start_derives_due_notifications() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("wsdue").await;
    app.create_task(&seeded.teacher, &seeded.classroom_id, "Late lab", day(-2))
        .await;

    let mut socket = connect(&app, &seeded.student.access_token).await;
    let connected = next_of_type(&mut socket, "connected").await;
    assert_eq!(connected["data"]["user_id"], seeded.student.id.as_str());
    assert_eq!(connected["data"]["role"], "student");
    assert_eq!(connected["data"]["unread_count"], 1);

    let resp = app
        .auth_get("/api/notification", &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["items"][0]["message"], "\"Late lab\" is overdue!");
}

#[tokio::test]
async fn new_notifications_are_pushed_and_reads_sync() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("wspush").await;

    let mut socket = connect(&app, &seeded.student.access_token).await;
    let connected = next_of_type(&mut socket, "connected").await;
    assert_eq!(connected["data"]["unread_count"], 0);

    app.create_task(&seeded.teacher, &seeded.classroom_id, "Vocab quiz", day(1))
        .await;
    let resp = app
        .auth_post("/api/notification/check-due", &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let pushed = next_of_type(&mut socket, "notification:new").await;
    assert_eq!(pushed["data"]["unread_count"], 1);
    assert_eq!(pushed["data"]["notification"]["type"], "due_soon");
    assert_eq!(pushed["data"]["alert"]["title"], "Task Due Tomorrow");
    assert_eq!(
        pushed["data"]["alert"]["message"],
        "\"Vocab quiz\" is due tomorrow!"
    );

    let id = pushed["data"]["notification"]["id"].as_str().unwrap().to_string();
    send_json(
        &mut socket,
        serde_json::json!({ "type": "notification:read", "data": { "id": id } }),
    )
    .await;

    let read = next_of_type(&mut socket, "notification:read").await;
    assert_eq!(read["data"]["id"], id.as_str());
    assert_eq!(read["data"]["unread_count"], 0);

    let resp = app
        .auth_get("/api/notification", &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["unread_count"], 0);
}

#[tokio::test]
async fn other_users_notifications_are_not_pushed() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("wsquiet").await;
    let classmate = app.register_user("s2@wsquiet.test", "Classmate", "student").await;
    app.join_classroom(&classmate, &seeded.invitation_code).await;

    let mut socket = connect(&app, &seeded.student.access_token).await;
    next_of_type(&mut socket, "connected").await;

    app.create_task(&seeded.teacher, &seeded.classroom_id, "Map work", day(1))
        .await;
    app.auth_post("/api/notification/check-due", &classmate.access_token)
        .send()
        .await
        .unwrap();

    send_json(&mut socket, serde_json::json!({ "type": "ping" })).await;
    // The pong arrives with no notification ahead of it.
    let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let json: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
    assert_eq!(json["type"], "pong");
}

#[tokio::test]
async fn chat_subscription_receives_new_messages() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("wschat").await;

    let resp = app
        .auth_post("/api/chat/conversation", &seeded.student.access_token)
        .json(&serde_json::json!({
            "teacher_id": seeded.teacher.id,
            "classroom_id": seeded.classroom_id,
        }))
        .send()
        .await
        .unwrap();
    let conversation: Value = resp.json().await.unwrap();
    let conversation_id = conversation["id"].as_str().unwrap().to_string();

    let mut socket = connect(&app, &seeded.student.access_token).await;
    next_of_type(&mut socket, "connected").await;

    send_json(
        &mut socket,
        serde_json::json!({
            "type": "chat:subscribe",
            "data": { "conversation_id": conversation_id },
        }),
    )
    .await;
    next_of_type(&mut socket, "chat:subscribed").await;

    let resp = app
        .auth_post(
            &format!("/api/chat/conversation/{}/message", conversation_id),
            &seeded.teacher.access_token,
        )
        .multipart(reqwest::multipart::Form::new().text("content", "Office hours at 3pm"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let pushed = next_of_type(&mut socket, "message:new").await;
    assert_eq!(pushed["data"]["content"], "Office hours at 3pm");
    assert_eq!(pushed["data"]["conversation_id"], conversation_id.as_str());
    assert_eq!(pushed["data"]["sender_id"], seeded.teacher.id.as_str());
}

#[tokio::test]
async fn outsiders_cannot_subscribe_to_a_conversation() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("wssnoop").await;
    let outsider = app.register_user("s2@wssnoop.test", "Snoop", "student").await;

    let resp = app
        .auth_post("/api/chat/conversation", &seeded.student.access_token)
        .json(&serde_json::json!({
            "teacher_id": seeded.teacher.id,
            "classroom_id": seeded.classroom_id,
        }))
        .send()
        .await
        .unwrap();
    let conversation: Value = resp.json().await.unwrap();

    let mut socket = connect(&app, &outsider.access_token).await;
    next_of_type(&mut socket, "connected").await;
    send_json(
        &mut socket,
        serde_json::json!({
            "type": "chat:subscribe",
            "data": { "conversation_id": conversation["id"] },
        }),
    )
    .await;

    let error = next_of_type(&mut socket, "error").await;
    assert!(error["data"]["message"].is_string());
}

#[tokio::test]
async fn pong_goes_only_to_the_pinging_connection() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("wstabs").await;

    let mut first = connect(&app, &seeded.student.access_token).await;
    next_of_type(&mut first, "connected").await;
    let mut second = connect(&app, &seeded.student.access_token).await;
    next_of_type(&mut second, "connected").await;

    send_json(&mut first, serde_json::json!({ "type": "ping" })).await;
    next_of_type(&mut first, "pong").await;

    let stray = tokio::time::timeout(Duration::from_millis(300), second.next()).await;
    assert!(stray.is_err(), "second tab received {:?}", stray);
}
