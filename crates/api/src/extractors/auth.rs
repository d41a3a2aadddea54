use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use bson::oid::ObjectId;
use studyx_db::models::Role;
use studyx_services::{Session, auth::Claims};

use crate::{error::ApiError, state::AppState};

/// Extracts the authenticated user from JWT (cookie or Authorization header)
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: ObjectId,
    pub email: String,
    pub role: Role,
    pub claims: Claims,
}

impl AuthUser {
    pub fn session(&self) -> Session {
        Session::new(self.user_id, self.email.clone(), self.role)
    }

    pub fn require_teacher(&self) -> Result<(), ApiError> {
        if self.role != Role::Teacher {
            return Err(ApiError::Forbidden("Only teachers can do this".to_string()));
        }
        Ok(())
    }

    pub fn require_student(&self) -> Result<(), ApiError> {
        if self.role != Role::Student {
            return Err(ApiError::Forbidden("Only students can do this".to_string()));
        }
        Ok(())
    }
}

/// Bearer token first, then the `access_token` cookie.
pub fn token_from_parts(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
        .or_else(|| {
            parts
                .headers
                .get(header::COOKIE)
                .and_then(|v| v.to_str().ok())
                .and_then(|cookies| {
                    cookies.split(';').find_map(|cookie| {
                        cookie
                            .trim()
                            .strip_prefix("access_token=")
                            .map(|s| s.to_string())
                    })
                })
        })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)
            .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

        let claims = state.auth.verify_access_token(&token)?;
        let session = state.auth.session_from_claims(&claims)?;

        Ok(AuthUser {
            user_id: session.user_id,
            email: session.email,
            role: session.role,
            claims,
        })
    }
}
