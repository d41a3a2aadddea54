use chrono::{Days, Local, NaiveDate};
use serde_json::Value;

use super::test_app::TestApp;

pub struct SeededUser {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// A teacher's classroom with one student already joined.
pub struct SeededClassroom {
    pub classroom_id: String,
    pub invitation_code: String,
    pub teacher: SeededUser,
    pub student: SeededUser,
}

pub const PASSWORD: &str = "Password123!";

/// Today's date shifted by `offset` days.
pub fn day(offset: i64) -> NaiveDate {
    let today = Local::now().date_naive();
    if offset >= 0 {
        today + Days::new(offset as u64)
    } else {
        today - Days::new(offset.unsigned_abs())
    }
}

impl TestApp {
    /// Register a user and return their auth info.
    pub async fn register_user(&self, email: &str, full_name: &str, role: &str) -> SeededUser {
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({
                "email": email,
                "full_name": full_name,
                "role": role,
                "password": PASSWORD,
                "confirm_password": PASSWORD,
            }))
            .send()
            .await
            .expect("Register request failed");

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        assert_eq!(status, 201, "Register failed: {}", body);

        let json: Value = serde_json::from_str(&body).expect("Failed to parse register response");
        SeededUser {
            id: json["user"]["id"].as_str().unwrap().to_string(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            access_token: json["access_token"].as_str().unwrap().to_string(),
            refresh_token: json["refresh_token"].as_str().unwrap().to_string(),
        }
    }

    /// Login a user and return their auth info.
    pub async fn login_user(&self, email: &str, password: &str) -> SeededUser {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("Login request failed");

        assert!(
            resp.status().is_success(),
            "Login failed: {}",
            resp.text().await.unwrap_or_default()
        );

        let json: Value = resp.json().await.expect("Failed to parse login response");
        SeededUser {
            id: json["user"]["id"].as_str().unwrap().to_string(),
            email: email.to_string(),
            full_name: json["user"]["full_name"].as_str().unwrap().to_string(),
            access_token: json["access_token"].as_str().unwrap().to_string(),
            refresh_token: json["refresh_token"].as_str().unwrap().to_string(),
        }
    }

    /// Create an authenticated request with the given token.
    pub fn auth_get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_post(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_put(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .put(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_delete(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub async fn create_classroom(&self, teacher: &SeededUser, name: &str) -> Value {
        let resp = self
            .auth_post("/api/classroom", &teacher.access_token)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .expect("Create classroom failed");
        assert_eq!(resp.status().as_u16(), 201);
        resp.json().await.unwrap()
    }

    pub async fn join_classroom(&self, student: &SeededUser, code: &str) -> reqwest::Response {
        self.auth_post("/api/classroom/join", &student.access_token)
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await
            .expect("Join classroom failed")
    }

    /// Create a task without a document; returns the created task.
    pub async fn create_task(
        &self,
        teacher: &SeededUser,
        classroom_id: &str,
        title: &str,
        due_date: NaiveDate,
    ) -> Value {
        let form = reqwest::multipart::Form::new()
            .text("classroom_id", classroom_id.to_string())
            .text("title", title.to_string())
            .text("due_date", due_date.to_string());

        let resp = self
            .auth_post("/api/task", &teacher.access_token)
            .multipart(form)
            .send()
            .await
            .expect("Create task failed");

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        assert_eq!(status, 201, "Create task '{}' failed: {}", title, body);
        serde_json::from_str(&body).unwrap()
    }

    /// Seed a teacher, a student and a classroom the student has joined.
    pub async fn seed_classroom(&self, prefix: &str) -> SeededClassroom {
        let teacher = self
            .register_user(
                &format!("teacher@{}.test", prefix),
                &format!("{} Teacher", prefix),
                "teacher",
            )
            .await;
        let student = self
            .register_user(
                &format!("student@{}.test", prefix),
                &format!("{} Student", prefix),
                "student",
            )
            .await;

        let classroom = self
            .create_classroom(&teacher, &format!("{} Class", prefix))
            .await;
        let invitation_code = classroom["invitation_code"].as_str().unwrap().to_string();

        let resp = self.join_classroom(&student, &invitation_code).await;
        assert!(resp.status().is_success(), "Join failed");

        SeededClassroom {
            classroom_id: classroom["id"].as_str().unwrap().to_string(),
            invitation_code,
            teacher,
            student,
        }
    }
}
