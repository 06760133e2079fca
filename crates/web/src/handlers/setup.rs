use axum::{body::Bytes, http::Method};

/// Installation setup callback. Only logged.
pub async fn setup(method: Method, body: Bytes) {
    tracing::info!("{} setup", method);
    tracing::info!("{}", String::from_utf8_lossy(&body));
}
