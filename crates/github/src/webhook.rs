use std::{fmt::Display, sync::Arc};

use axum::{
    body::Bytes,
    extract::{FromRef, FromRequest, Request},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use checkbot_core::config::Config;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::events::WebhookEvent;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum IngressError {
    #[error("X-GitHub-Event header missing")]
    MissingEvent,
    #[error("X-Hub-Signature-256 missing")]
    MissingSignature,
    #[error("X-Hub-Signature-256 sha256= prefix missing")]
    SignaturePrefix,
    #[error("X-Hub-Signature-256 malformed")]
    MalformedSignature,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("unsupported content type {0}")]
    ContentType(String),
    #[error("payload form field missing")]
    MissingPayload,
}

/// An authenticated delivery, before classification.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// `X-GitHub-Event`
    pub kind: String,
    /// `X-GitHub-Delivery`
    pub id: Option<String>,
    pub payload: Bytes,
}

impl Delivery {
    /// Checks event framing and, when `secret` is set, the body signature.
    pub fn verify(
        secret: Option<&str>,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Self, IngressError> {
        let kind = headers
            .get("X-GitHub-Event")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(IngressError::MissingEvent)?
            .to_string();
        let id =
            headers.get("X-GitHub-Delivery").and_then(|v| v.to_str().ok()).map(str::to_string);
        if let Some(secret) = secret {
            let signature_sha256 = headers
                .get("X-Hub-Signature-256")
                .and_then(|v| v.to_str().ok())
                .ok_or(IngressError::MissingSignature)?
                .strip_prefix("sha256=")
                .ok_or(IngressError::SignaturePrefix)?;
            let signature =
                hex::decode(signature_sha256).map_err(|_| IngressError::MalformedSignature)?;
            let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
                .expect("HMAC can take key of any size");
            mac.update(&body);
            if mac.verify_slice(&signature).is_err() {
                return Err(IngressError::SignatureMismatch);
            }
        }
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json");
        let mime = content_type.split(';').next().unwrap_or_default().trim();
        let payload = match mime {
            "application/json" => body,
            "application/x-www-form-urlencoded" => url::form_urlencoded::parse(&body)
                .find(|(k, _)| k == "payload")
                .map(|(_, v)| Bytes::from(v.into_owned()))
                .ok_or(IngressError::MissingPayload)?,
            _ => return Err(IngressError::ContentType(content_type.to_string())),
        };
        Ok(Self { kind, id, payload })
    }
}

/// Verify and extract GitHub Event Payload.
#[derive(Debug, Clone)]
#[must_use]
pub struct GitHubEvent {
    pub delivery: Option<String>,
    pub event: WebhookEvent,
}

impl<S> FromRequest<S> for GitHubEvent
where
    Arc<Config>: FromRef<S>,
    S: Send + Sync + Clone,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        fn err(m: impl Display) -> Response {
            tracing::error!("{m}");
            (StatusCode::BAD_REQUEST, m.to_string()).into_response()
        }
        let config = <Arc<Config>>::from_ref(state);
        let headers = req.headers().clone();
        let body = Bytes::from_request(req, state).await.map_err(|_| err("error reading body"))?;
        let delivery =
            Delivery::verify(config.github.webhook_secret.as_deref(), &headers, body).map_err(err)?;
        tracing::info!(
            "Received webhook event {} (delivery {})",
            delivery.kind,
            delivery.id.as_deref().unwrap_or("[unknown]")
        );
        let event = WebhookEvent::parse(&delivery.kind, &delivery.payload)
            .map_err(|e| err(format!("error parsing body: {e}: {}", e.source)))?;
        Ok(GitHubEvent { delivery: delivery.id, event })
    }
}
