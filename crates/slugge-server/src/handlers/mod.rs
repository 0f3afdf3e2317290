//! HTTP route handlers, mounted under `/v1`.

pub mod assistant;
pub mod auth;
pub mod billing;
pub mod documents;
pub mod health;
pub mod processing;
pub mod projects;
pub mod share;
pub mod snapshots;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use serde::Serialize;

use crate::state::AppState;

/// Largest accepted document upload.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// `{"ok": true}` acknowledgement for deletes.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// All `/v1` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/me", get(auth::me))
        .route("/auth/login", post(auth::login))
        .route("/auth/signup", post(auth::signup))
        .route("/projects", get(projects::list).post(projects::create))
        .route(
            "/projects/{project_id}",
            get(projects::get).delete(projects::delete),
        )
        .route(
            "/projects/{project_id}/documents",
            get(documents::list)
                .post(documents::upload)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/projects/{project_id}/documents/{document_id}",
            delete(documents::delete),
        )
        .route(
            "/projects/{project_id}/processing/start",
            post(processing::start),
        )
        .route(
            "/projects/{project_id}/processing/status",
            get(processing::status),
        )
        .route(
            "/projects/{project_id}/board/snapshots",
            get(snapshots::list).post(snapshots::create),
        )
        .route(
            "/projects/{project_id}/board/snapshots/{snapshot_id}",
            get(snapshots::get),
        )
        .route("/projects/{project_id}/share/mint", post(share::mint))
        .route("/share/{token}", get(share::resolve).delete(share::revoke))
        .route("/billing/checkout", post(billing::checkout))
        .route("/billing/portal", post(billing::portal))
        .route("/ws/assistant", get(assistant::upgrade))
}
