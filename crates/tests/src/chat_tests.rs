use crate::fixtures::seed::SeededClassroom;
use crate::fixtures::test_app::TestApp;
use serde_json::Value;

async fn open_conversation(app: &TestApp, seeded: &SeededClassroom) -> Value {
    let resp = app
        .auth_post("/api/chat/conversation", &seeded.student.access_token)
        .json(&serde_json::json!({
            "teacher_id": seeded.teacher.id,
            "classroom_id": seeded.classroom_id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn student_sees_teachers_of_joined_classrooms() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("teachers").await;

    let resp = app
        .auth_get("/api/chat/teacher", &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let teachers: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(teachers.len(), 1);
    assert_eq!(teachers[0]["teacher_id"], seeded.teacher.id.as_str());
    assert_eq!(teachers[0]["teacher_name"], "teachers Teacher");
    assert_eq!(teachers[0]["classroom_name"], "teachers Class");
}

#[tokio::test]
async fn opening_a_conversation_is_idempotent() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("open").await;

    let first = open_conversation(&app, &seeded).await;
    let second = open_conversation(&app, &seeded).await;
    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["teacher_name"], "open Teacher");
    assert_eq!(first["student_name"], "open Student");

    let resp = app
        .auth_get("/api/chat/conversation", &seeded.teacher.access_token)
        .send()
        .await
        .unwrap();
    let list: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], first["id"]);
}

#[tokio::test]
async fn conversation_needs_the_classroom_teacher() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("wrongteacher").await;
    let other = app.register_user("t2@wrong.test", "Other", "teacher").await;

    let resp = app
        .auth_post("/api/chat/conversation", &seeded.student.access_token)
        .json(&serde_json::json!({
            "teacher_id": other.id,
            "classroom_id": seeded.classroom_id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn participants_exchange_messages() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("talk").await;
    let conversation = open_conversation(&app, &seeded).await;
    let path = format!(
        "/api/chat/conversation/{}/message",
        conversation["id"].as_str().unwrap()
    );

    let resp = app
        .auth_post(&path, &seeded.student.access_token)
        .multipart(reqwest::multipart::Form::new().text("content", "Is the quiz open-book?"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let resp = app
        .auth_post(&path, &seeded.teacher.access_token)
        .multipart(reqwest::multipart::Form::new().text("content", "Yes, notes allowed."))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let resp = app
        .auth_get(&path, &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    let messages: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "Is the quiz open-book?");
    assert_eq!(messages[0]["sender_id"], seeded.student.id.as_str());
    assert_eq!(messages[1]["sender_id"], seeded.teacher.id.as_str());
}

#[tokio::test]
async fn empty_messages_are_rejected() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("empty").await;
    let conversation = open_conversation(&app, &seeded).await;

    let resp = app
        .auth_post(
            &format!(
                "/api/chat/conversation/{}/message",
                conversation["id"].as_str().unwrap()
            ),
            &seeded.student.access_token,
        )
        .multipart(reqwest::multipart::Form::new().text("content", "   "))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn attachments_get_a_public_url() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("attach").await;
    let conversation = open_conversation(&app, &seeded).await;

    let part = reqwest::multipart::Part::bytes(b"diagram bytes".to_vec())
        .file_name("diagram.png")
        .mime_str("image/png")
        .unwrap();
    let resp = app
        .auth_post(
            &format!(
                "/api/chat/conversation/{}/message",
                conversation["id"].as_str().unwrap()
            ),
            &seeded.student.access_token,
        )
        .multipart(reqwest::multipart::Form::new().part("file", part))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let message: Value = resp.json().await.unwrap();
    assert!(message["content"].is_null());
    assert_eq!(message["attachment"]["name"], "diagram.png");
    let url = message["attachment"]["url"].as_str().unwrap();
    assert!(url.starts_with(&format!("{}/files/chat-files/", app.base_url)));

    // Public bucket: no token needed
    let resp = reqwest::get(url).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["content-type"], "image/png");
    assert_eq!(&resp.bytes().await.unwrap()[..], b"diagram bytes");
}

#[tokio::test]
async fn private_buckets_are_not_served_publicly() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/files/submissions/anything.txt"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn outsiders_cannot_read_conversations() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("snoop").await;
    let outsider = app.register_user("s2@snoop.test", "Snoop", "student").await;
    let conversation = open_conversation(&app, &seeded).await;

    let resp = app
        .auth_get(
            &format!(
                "/api/chat/conversation/{}/message",
                conversation["id"].as_str().unwrap()
            ),
            &outsider.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}
