use axum::{Json, extract::State, http::{HeaderMap, HeaderValue, StatusCode, header}};
use serde::{Deserialize, Serialize};
use studyx_db::models::{Role, User};
use studyx_services::auth::TokenPair;
use studyx_services::dao::{base::DaoError, user::NewUser};
use tracing::info;
use validator::Validate;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Full name must be 1 to 100 characters"))]
    pub full_name: String,
    #[validate(
        email(message = "Invalid email address"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,
    #[validate(length(max = 20, message = "Mobile number must be at most 20 characters"))]
    pub mobile_number: Option<String>,
    #[validate(range(min = 1, max = 150, message = "Age must be between 1 and 150"))]
    pub age: Option<u32>,
    pub role: Role,
    #[validate(length(min = 6, max = 100, message = "Password must be 6 to 100 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords don't match"))]
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub mobile_number: Option<String>,
    pub age: Option<u32>,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: user.email,
            full_name: user.full_name,
            mobile_number: user.mobile_number,
            age: user.age,
            role: user.role,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

fn auth_response(tokens: TokenPair, user: User) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let mut headers = HeaderMap::new();
    let cookie = format!(
        "access_token={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        tokens.access_token, tokens.expires_in
    );
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.to_string()))?,
    );

    let response = AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        user: user.into(),
    };
    Ok((headers, Json(response)))
}

fn user_id(user: &User) -> Result<bson::oid::ObjectId, ApiError> {
    user.id
        .ok_or_else(|| ApiError::Internal("User without id".to_string()))
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    body.validate()?;
    if body.full_name.trim().is_empty() {
        return Err(ApiError::Validation("Full name is required".to_string()));
    }

    let already_registered = || ApiError::Conflict("This email is already registered".to_string());
    match state.users.find_by_email(&body.email).await {
        Ok(_) => return Err(already_registered()),
        Err(DaoError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    let password_hash = state.auth.hash_password(&body.password)?;
    let profile = NewUser {
        email: body.email,
        full_name: body.full_name,
        mobile_number: body.mobile_number,
        age: body.age,
        role: body.role,
    };
    let user = state
        .users
        .create(profile, password_hash)
        .await
        .map_err(|e| match e {
            DaoError::DuplicateKey(_) => already_registered(),
            other => other.into(),
        })?;

    let id = user_id(&user)?;
    info!(user_id = %id, role = user.role.as_str(), "User registered");
    let tokens = state.auth.generate_tokens(id, &user.email, user.role)?;
    let (headers, body) = auth_response(tokens, user)?;
    Ok((StatusCode::CREATED, headers, body))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = state
        .users
        .find_by_email(&body.email)
        .await
        .map_err(|_| invalid())?;

    let password_hash = user.password_hash.as_ref().ok_or_else(invalid)?;
    if !state.auth.verify_password(&body.password, password_hash)? {
        return Err(invalid());
    }

    let tokens = state
        .auth
        .generate_tokens(user_id(&user)?, &user.email, user.role)?;
    auth_response(tokens, user)
}

pub async fn logout() -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("access_token=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0"),
    );
    Ok(headers)
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.base.find_by_id(auth.user_id).await?;
    Ok(Json(user.into()))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let claims = state.auth.verify_refresh_token(&body.refresh_token)?;
    let session = state.auth.session_from_claims(&claims)?;

    let user = state.users.base.find_by_id(session.user_id).await?;
    let tokens = state
        .auth
        .generate_tokens(session.user_id, &user.email, user.role)?;
    auth_response(tokens, user)
}
