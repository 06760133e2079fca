use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use checkbot_core::AppError;
use checkbot_github::{
    credentials::CredentialProvider, handlers::HandleEvent, webhook::GitHubEvent,
};

use crate::AppState;

/// Handles a verified delivery inline. Only check run completion outlives the request.
pub async fn webhook<P: CredentialProvider>(
    State(state): State<AppState<P>>,
    GitHubEvent { delivery, event }: GitHubEvent,
) -> Result<Response, AppError> {
    match (event.repository(), event.installation_id()) {
        (Some(repository), Some(installation_id)) => tracing::info!(
            "Handling {} event from repository {} (installation {})",
            event.kind(),
            repository.coords(),
            installation_id
        ),
        _ => tracing::info!("Handling {} event", event.kind()),
    }
    event.handle(&state.events).await.with_context(|| {
        format!(
            "Failed to handle {} event (delivery {})",
            event.kind(),
            delivery.as_deref().unwrap_or("[unknown]")
        )
    })?;
    Ok((StatusCode::OK, "Event processed").into_response())
}
