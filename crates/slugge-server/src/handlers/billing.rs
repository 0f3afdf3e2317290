//! Billing stubs returning placeholder URLs.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RedirectUrl {
    pub url: String,
}

pub async fn checkout(State(state): State<AppState>) -> Json<RedirectUrl> {
    Json(RedirectUrl {
        url: state.config.billing_url("checkout/demo"),
    })
}

pub async fn portal(State(state): State<AppState>) -> Json<RedirectUrl> {
    Json(RedirectUrl {
        url: state.config.billing_url("portal/demo"),
    })
}
