use axum::{
    Router,
    routing::{get, post},
};
use checkbot_github::credentials::CredentialProvider;

use crate::AppState;

mod setup;
mod webhook;

pub fn build_router<P: CredentialProvider>() -> Router<AppState<P>> {
    Router::new()
        .route("/github/events", post(webhook::webhook::<P>))
        .route("/setup", get(setup::setup).post(setup::setup))
}
