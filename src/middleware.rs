//! Middlewares for routes.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::AppState;
use crate::config::AccessPolicy;
use crate::error::{Result, ServerError};

const BEARER: &str = "Bearer ";

/// Apply `security.account_lookup` to the wrapped routes.
///
/// On success the decoded [`crate::token::Claims`] are available as a request
/// extension.
pub async fn authorize(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    if state.config.security.account_lookup == AccessPolicy::Public {
        return Ok(next.run(req).await);
    }

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix(BEARER))
        .ok_or(ServerError::Unauthorized)?;

    let claims = state.token.decode(token).map_err(|err| {
        tracing::debug!(error = %err, "bearer token rejected");
        ServerError::Unauthorized
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
