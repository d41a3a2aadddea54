use crate::fixtures::seed::day;
use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn teacher_creates_task_with_document() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("doc").await;

    let part = reqwest::multipart::Part::bytes(b"%PDF-1.4 worksheet".to_vec())
        .file_name("worksheet.pdf")
        .mime_str("application/pdf")
        .unwrap();
    let form = reqwest::multipart::Form::new()
        .text("classroom_id", seeded.classroom_id.clone())
        .text("title", "Photosynthesis worksheet")
        .text("description", "Answer all questions")
        .text("priority", "high")
        .text("due_date", day(5).to_string())
        .part("document", part);

    let resp = app
        .auth_post("/api/task", &seeded.teacher.access_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let task: Value = resp.json().await.unwrap();
    assert_eq!(task["title"], "Photosynthesis worksheet");
    assert_eq!(task["priority"], "high");
    assert_eq!(task["due_date"], day(5).to_string());
    assert_eq!(task["document"]["name"], "worksheet.pdf");

    let resp = app
        .auth_get(
            &format!("/api/task/{}/document", task["id"].as_str().unwrap()),
            &seeded.student.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["content-type"], "application/pdf");
    let bytes = resp.bytes().await.unwrap();
    assert_eq!(&bytes[..], b"%PDF-1.4 worksheet");
}

#[tokio::test]
async fn task_defaults_to_medium_priority() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("prio").await;

    let task = app
        .create_task(&seeded.teacher, &seeded.classroom_id, "Reading", day(2))
        .await;
    assert_eq!(task["priority"], "medium");
    assert!(task["document"].is_null());
}

#[tokio::test]
async fn task_title_is_validated() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("title").await;

    let form = reqwest::multipart::Form::new()
        .text("classroom_id", seeded.classroom_id.clone())
        .text("title", "t".repeat(201))
        .text("due_date", day(1).to_string());
    let resp = app
        .auth_post("/api/task", &seeded.teacher.access_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);

    let form = reqwest::multipart::Form::new()
        .text("classroom_id", seeded.classroom_id.clone())
        .text("title", "Bad date")
        .text("due_date", "next tuesday");
    let resp = app
        .auth_post("/api/task", &seeded.teacher.access_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn only_the_owner_adds_tasks() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("owner").await;
    let other = app.register_user("t2@owner.test", "Other Teacher", "teacher").await;

    let form = reqwest::multipart::Form::new()
        .text("classroom_id", seeded.classroom_id.clone())
        .text("title", "Intruder task")
        .text("due_date", day(1).to_string());
    let resp = app
        .auth_post("/api/task", &other.access_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let form = reqwest::multipart::Form::new()
        .text("classroom_id", seeded.classroom_id.clone())
        .text("title", "Student task")
        .text("due_date", day(1).to_string());
    let resp = app
        .auth_post("/api/task", &seeded.student.access_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn tasks_listed_by_due_date_for_members_only() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("order").await;
    let outsider = app.register_user("s2@order.test", "Outsider", "student").await;

    app.create_task(&seeded.teacher, &seeded.classroom_id, "Later", day(9))
        .await;
    app.create_task(&seeded.teacher, &seeded.classroom_id, "Sooner", day(1))
        .await;
    app.create_task(&seeded.teacher, &seeded.classroom_id, "Middle", day(4))
        .await;

    let resp = app
        .auth_get("/api/task", &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    let tasks: Vec<Value> = resp.json().await.unwrap();
    let titles: Vec<&str> = tasks.iter().map(|t| t["title"].as_str().unwrap()).collect();
    assert_eq!(titles, ["Sooner", "Middle", "Later"]);
    assert!(tasks.iter().all(|t| t["completed"] == false));

    let resp = app
        .auth_get("/api/task", &seeded.teacher.access_token)
        .send()
        .await
        .unwrap();
    let tasks: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(tasks.len(), 3);
    assert!(tasks[0].get("completed").is_none());

    let resp = app
        .auth_get("/api/task", &outsider.access_token)
        .send()
        .await
        .unwrap();
    let tasks: Vec<Value> = resp.json().await.unwrap();
    assert!(tasks.is_empty());

    let sooner = app
        .auth_get("/api/task", &seeded.student.access_token)
        .send()
        .await
        .unwrap()
        .json::<Vec<Value>>()
        .await
        .unwrap()[0]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let resp = app
        .auth_get(&format!("/api/task/{}", sooner), &outsider.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn search_and_due_filter_narrow_the_list() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("search").await;

    app.create_task(&seeded.teacher, &seeded.classroom_id, "Algebra drills", day(2))
        .await;
    app.create_task(&seeded.teacher, &seeded.classroom_id, "Essay on Hamlet", day(3))
        .await;
    app.create_task(&seeded.teacher, &seeded.classroom_id, "Geometry ALGEBRA mix", day(3))
        .await;

    let resp = app
        .auth_get("/api/task?q=algebra", &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    let tasks: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(tasks.len(), 2);

    let resp = app
        .auth_get(
            &format!("/api/task?due={}", day(3)),
            &seeded.student.access_token,
        )
        .send()
        .await
        .unwrap();
    let tasks: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(tasks.len(), 2);

    let resp = app
        .auth_get(
            &format!("/api/task?q=hamlet&due={}", day(3)),
            &seeded.student.access_token,
        )
        .send()
        .await
        .unwrap();
    let tasks: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "Essay on Hamlet");
}

#[tokio::test]
async fn toggling_completion_flips_state() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("toggle").await;
    let task = app
        .create_task(&seeded.teacher, &seeded.classroom_id, "Flashcards", day(2))
        .await;
    let task_id = task["id"].as_str().unwrap();
    let path = format!("/api/task/{}/completion/toggle", task_id);

    let resp = app
        .auth_post(&path, &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["completed"], true);
    assert!(json["completed_at"].is_string());

    let resp = app
        .auth_get(&format!("/api/task/{}", task_id), &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["completed"], true);

    let resp = app
        .auth_post(&path, &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["completed"], false);
    assert!(json["completed_at"].is_null());

    // Teachers have no completion state
    let resp = app
        .auth_post(&path, &seeded.teacher.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn calendar_groups_tasks_by_day() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_classroom("calendar").await;

    app.create_task(&seeded.teacher, &seeded.classroom_id, "Quiz", day(2))
        .await;
    app.create_task(&seeded.teacher, &seeded.classroom_id, "Project", day(2))
        .await;
    app.create_task(&seeded.teacher, &seeded.classroom_id, "Final", day(20))
        .await;

    let resp = app
        .auth_get("/api/calendar", &seeded.student.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let days: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0]["date"], day(2).to_string());
    assert_eq!(days[0]["tasks"].as_array().unwrap().len(), 2);
    assert_eq!(days[1]["date"], day(20).to_string());

    let resp = app
        .auth_get(
            &format!("/api/calendar?from={}&to={}", day(0), day(7)),
            &seeded.student.access_token,
        )
        .send()
        .await
        .unwrap();
    let days: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(days.len(), 1);

    // Bounds are inclusive on both ends.
    let resp = app
        .auth_get(
            &format!("/api/calendar?from={}&to={}", day(2), day(2)),
            &seeded.teacher.access_token,
        )
        .send()
        .await
        .unwrap();
    let days: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["tasks"].as_array().unwrap().len(), 2);

    let resp = app
        .auth_get(
            &format!("/api/calendar?from={}", day(3)),
            &seeded.student.access_token,
        )
        .send()
        .await
        .unwrap();
    let days: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["tasks"][0]["title"], "Final");
}
