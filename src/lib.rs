//! Account registration, lookup and email/password authentication.

#![forbid(unsafe_code)]

pub mod account;
pub mod config;
pub mod crypto;
mod database;
pub mod error;
mod middleware;
mod router;
pub mod telemetry;
pub mod token;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderName, Method, StatusCode, header};
use axum::routing::get;
use axum::{Router, middleware as AxumMiddleware};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer,
};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

use account::{AccountService, AccountStore, MemoryAccountStore, PgAccountStore};
use crypto::Argon2Hasher;
use token::TokenManager;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// MUST NEVER be used in production.
///
/// With a `state`, the request carries a bearer token for account 1.
#[cfg(test)]
pub async fn make_request(
    state: Option<&AppState>,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(state) = state {
        let account = account::Account {
            id: 1,
            name: "admin".into(),
            email: "admin@example.com".into(),
            password_hash: String::default(),
            account_type: account::AccountType::Normal,
            created_at: chrono::Utc::now(),
        };
        let token = state.token.create(&account).expect("cannot create JWT");
        request = request.header(
            header::AUTHORIZATION,
            format!("{} {}", token.token_type, token.token),
        );
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub accounts: AccountService,
    pub token: TokenManager,
    pub metrics: Option<PrometheusHandle>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Tag every request, and echo the identifier back.
        .layer(SetRequestIdLayer::new(REQUEST_ID, MakeRequestUuid))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        .layer(PropagateRequestIdLayer::new(REQUEST_ID))
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `GET /metrics` goes to Prometheus.
        .route("/metrics", get(router::metrics::handler))
        .nest("/accounts", router::accounts::router(state.clone()))
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state(
    config: Arc<config::Configuration>,
    metrics: Option<PrometheusHandle>,
) -> Result<AppState, Box<dyn std::error::Error>> {
    let store: Arc<dyn AccountStore> = match &config.postgres {
        Some(postgres) => Arc::new(PgAccountStore::new(database::connect(postgres).await?)),
        None => {
            tracing::warn!("missing `postgres` entry on configuration, accounts are kept in memory");
            Arc::new(MemoryAccountStore::new())
        },
    };

    let hasher = Arc::new(Argon2Hasher::new(&config.argon2)?);

    let Some(secret) = config.token.secret.as_deref().filter(|s| !s.is_empty()) else {
        return Err("missing token secret, set `TOKEN_SECRET` or `token.secret`".into());
    };
    let mut token = TokenManager::new(&config.name, secret.as_bytes(), config.token.expiration);
    if let Some(audience) = &config.token.audience {
        token = token.audience(audience);
    }

    tracing::info!(policy = ?config.security.account_lookup, "account lookup access policy");

    Ok(AppState {
        accounts: AccountService::new(store, hasher, token.clone()),
        config,
        token,
        metrics,
    })
}
