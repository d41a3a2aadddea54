use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn teacher_creates_classroom_with_invitation_code() {
    let app = TestApp::spawn().await;
    let teacher = app.register_user("t@create.test", "Ms Frizzle", "teacher").await;

    let classroom = app.create_classroom(&teacher, "  Biology 101  ").await;
    assert_eq!(classroom["name"], "Biology 101");
    assert_eq!(classroom["teacher_id"], teacher.id.as_str());

    let code = classroom["invitation_code"].as_str().unwrap();
    assert_eq!(code.len(), 8);
    assert!(
        code.chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
    );

    let resp = app
        .auth_get("/api/classroom", &teacher.access_token)
        .send()
        .await
        .unwrap();
    let list: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["student_count"], 0);
}

#[tokio::test]
async fn classroom_name_is_validated() {
    let app = TestApp::spawn().await;
    let teacher = app.register_user("t@name.test", "Teacher", "teacher").await;

    for name in ["ab", "   ", &"x".repeat(101)] {
        let resp = app
            .auth_post("/api/classroom", &teacher.access_token)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 422, "name {:?} accepted", name);
    }
}

#[tokio::test]
async fn students_cannot_create_classrooms() {
    let app = TestApp::spawn().await;
    let student = app.register_user("s@nocreate.test", "Student", "student").await;

    let resp = app
        .auth_post("/api/classroom", &student.access_token)
        .json(&serde_json::json!({ "name": "Sneaky Class" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn every_classroom_gets_a_distinct_code() {
    let app = TestApp::spawn().await;
    let teacher = app.register_user("t@codes.test", "Teacher", "teacher").await;

    let mut codes = Vec::new();
    for i in 0..10 {
        let classroom = app
            .create_classroom(&teacher, &format!("Section {}", i))
            .await;
        codes.push(classroom["invitation_code"].as_str().unwrap().to_string());
    }
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), 10);
}

#[tokio::test]
async fn student_joins_with_code_in_any_case() {
    let app = TestApp::spawn().await;
    let teacher = app.register_user("t@join.test", "Teacher", "teacher").await;
    let student = app.register_user("s@join.test", "Student", "student").await;

    let classroom = app.create_classroom(&teacher, "Chemistry").await;
    let code = classroom["invitation_code"].as_str().unwrap();

    let resp = app
        .join_classroom(&student, &format!("  {}  ", code.to_lowercase()))
        .await;
    assert_eq!(resp.status().as_u16(), 200);
    let joined: Value = resp.json().await.unwrap();
    assert_eq!(joined["id"], classroom["id"]);

    let resp = app
        .auth_get("/api/classroom", &student.access_token)
        .send()
        .await
        .unwrap();
    let list: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["name"], "Chemistry");
    assert!(list[0]["joined_at"].is_string());

    let resp = app
        .auth_get("/api/classroom", &teacher.access_token)
        .send()
        .await
        .unwrap();
    let list: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(list[0]["student_count"], 1);
}

#[tokio::test]
async fn joining_twice_is_a_conflict() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("twice").await;

    let resp = app
        .join_classroom(&seeded.student, &seeded.invitation_code)
        .await;
    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["message"], "You are already a member of this classroom");
}

#[tokio::test]
async fn unknown_code_is_rejected() {
    let app = TestApp::spawn().await;
    let student = app.register_user("s@badcode.test", "Student", "student").await;

    let resp = app.join_classroom(&student, "ZZZZZZZZ").await;
    assert_eq!(resp.status().as_u16(), 422);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["message"], "Invalid invitation code");
}

#[tokio::test]
async fn invite_info_shows_teacher_and_size() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("invite").await;
    let outsider = app.register_user("s2@invite.test", "Newcomer", "student").await;

    let resp = app
        .auth_get(
            &format!("/api/invite/{}", seeded.invitation_code),
            &outsider.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let info: Value = resp.json().await.unwrap();
    assert_eq!(info["classroom_id"], seeded.classroom_id.as_str());
    assert_eq!(info["name"], "invite Class");
    assert_eq!(info["teacher_name"], "invite Teacher");
    assert_eq!(info["student_count"], 1);

    app.join_classroom(&outsider, &seeded.invitation_code).await;
    let resp = app
        .auth_get(
            &format!("/api/invite/{}", seeded.invitation_code.to_lowercase()),
            &outsider.access_token,
        )
        .send()
        .await
        .unwrap();
    let info: Value = resp.json().await.unwrap();
    assert_eq!(info["student_count"], 2);

    let resp = app
        .auth_get("/api/invite/NOPE0000", &outsider.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn non_members_cannot_open_classroom() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("private").await;
    let outsider = app.register_user("s2@private.test", "Outsider", "student").await;

    let path = format!("/api/classroom/{}", seeded.classroom_id);
    let resp = app
        .auth_get(&path, &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_get(&path, &outsider.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn teacher_lists_members() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("roster").await;

    let path = format!("/api/classroom/{}/member", seeded.classroom_id);
    let resp = app
        .auth_get(&path, &seeded.teacher.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let members: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["student_id"], seeded.student.id.as_str());
    assert_eq!(members[0]["full_name"], "roster Student");

    let resp = app
        .auth_get(&path, &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn student_leaves_classroom() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("leave").await;

    let path = format!("/api/classroom/{}/leave", seeded.classroom_id);
    let resp = app
        .auth_post(&path, &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_get("/api/classroom", &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    let list: Vec<Value> = resp.json().await.unwrap();
    assert!(list.is_empty());

    // Second leave has nothing to remove
    let resp = app
        .auth_post(&path, &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn deleting_classroom_removes_its_tasks() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("cascade").await;
    app.create_task(
        &seeded.teacher,
        &seeded.classroom_id,
        "Lab report",
        crate::fixtures::seed::day(3),
    )
    .await;

    let resp = app
        .auth_delete(
            &format!("/api/classroom/{}", seeded.classroom_id),
            &seeded.student.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_delete(
            &format!("/api/classroom/{}", seeded.classroom_id),
            &seeded.teacher.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_get("/api/task", &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    let tasks: Vec<Value> = resp.json().await.unwrap();
    assert!(tasks.is_empty());

    let resp = app
        .auth_get("/api/classroom", &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    let list: Vec<Value> = resp.json().await.unwrap();
    assert!(list.is_empty());
}
