//! Authentication stubs. Only demo mode is supported.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

impl User {
    pub fn demo() -> Self {
        Self {
            id: "demo".into(),
            email: "demo@slugge.dev".into(),
            name: Some("Demo User".into()),
        }
    }
}

/// Credentials are accepted and ignored.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn me(State(state): State<AppState>) -> Result<Json<User>, ApiError> {
    if state.config.demo_mode {
        return Ok(Json(User::demo()));
    }
    Err(ApiError::Unauthorized("Not implemented".into()))
}

pub async fn login(
    State(state): State<AppState>,
    Json(_body): Json<LoginRequest>,
) -> Result<Json<User>, ApiError> {
    if state.config.demo_mode {
        return Ok(Json(User::demo()));
    }
    Err(ApiError::Unimplemented("Login not implemented".into()))
}

pub async fn signup(
    State(state): State<AppState>,
    Json(_body): Json<serde_json::Value>,
) -> Result<Json<User>, ApiError> {
    if state.config.demo_mode {
        return Ok(Json(User::demo()));
    }
    Err(ApiError::Unimplemented("Signup not implemented".into()))
}
