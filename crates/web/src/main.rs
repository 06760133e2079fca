mod handlers;

use std::{
    fs::File,
    io::BufReader,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use axum::{
    Router,
    extract::FromRef,
    http::{Request, StatusCode},
};
use checkbot_core::config::Config;
use checkbot_github::{
    credentials::{AppCredentials, CredentialProvider},
    handlers::EventContext,
    workflow::CheckRunWorkflow,
};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    normalize_path::NormalizePathLayer,
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, MakeSpan, TraceLayer},
};
use tracing::{Level, Span};
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::handlers::build_router;

pub struct AppState<P = AppCredentials> {
    config: Arc<Config>,
    events: EventContext<P>,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self { Self { config: self.config.clone(), events: self.events.clone() } }
}

impl<P> FromRef<AppState<P>> for Arc<Config> {
    fn from_ref(state: &AppState<P>) -> Self { state.config.clone() }
}

impl<P> AppState<P> {
    pub fn new(config: Arc<Config>, credentials: Arc<P>) -> Self {
        let workflow = CheckRunWorkflow::from(&config.workflow);
        Self { config, events: EventContext { credentials, workflow } }
    }
}

#[tokio::main]
async fn main() {
    let env_filter = EnvFilter::builder()
        // Default to info level
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let config_path = std::env::var("CHECKBOT_CONFIG").unwrap_or_else(|_| "config.yml".into());
    let config: Arc<Config> = {
        let file = BufReader::new(File::open(&config_path).expect("Failed to open config file"));
        Arc::new(serde_yaml::from_reader(file).expect("Failed to parse config file"))
    };
    if config.github.webhook_secret.is_none() {
        tracing::warn!("No webhook secret configured, deliveries will not be verified");
    }
    tracing::info!(
        "GitHub App {} (key {})",
        config.github.app_id,
        config.github.private_key_path.display()
    );

    let credentials = Arc::new(AppCredentials::new(Arc::new(config.github.clone())));
    let state = AppState::new(config.clone(), credentials);

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.server.port));
    tracing::info!("Web server: Listening on {}", addr);
    let listener = TcpListener::bind(addr).await.expect("bind error");
    let result = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error");
    if let Err(e) = result {
        tracing::error!("{e:?}");
    }
    tracing::info!("Shut down gracefully");
}

fn app<P: CredentialProvider>(state: AppState<P>) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DeliverySpan { level: Level::INFO })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(30)))
        .layer(NormalizePathLayer::trim_trailing_slash());
    build_router().with_state(state).layer(middleware)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.ok();
    }
}

/// Request span tagged with the GitHub event kind and delivery ID.
#[derive(Debug, Clone)]
pub struct DeliverySpan {
    level: Level,
}

impl<B> MakeSpan<B> for DeliverySpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let header = |name: &str| {
            request.headers().get(name).and_then(|v| v.to_str().ok()).unwrap_or("-").to_string()
        };
        let event = header("X-GitHub-Event");
        let delivery = header("X-GitHub-Delivery");
        macro_rules! make_span {
            ($level:expr) => {
                tracing::span!(
                    $level,
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    event = %event,
                    delivery = %delivery,
                )
            }
        }
        match self.level {
            Level::ERROR => make_span!(Level::ERROR),
            Level::WARN => make_span!(Level::WARN),
            Level::INFO => make_span!(Level::INFO),
            Level::DEBUG => make_span!(Level::DEBUG),
            Level::TRACE => make_span!(Level::TRACE),
        }
    }
}
