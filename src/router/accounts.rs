//! Accounts-related HTTP API.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};

use crate::AppState;
use crate::account::Account;
use crate::error::Result;

/// Handler to read an account.
pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Account>> {
    Ok(Json(state.accounts.find_by_id(id).await?))
}

pub fn router(state: AppState) -> Router<AppState> {
    let lookup = Router::new()
        // `GET /accounts/{id}` goes to `get_account`.
        .route("/{id}", get(get_account))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::authorize,
        ));

    Router::new()
        // `POST /accounts/register` goes to `register`.
        .route("/register", post(crate::router::register::handler))
        // `POST /accounts/login` goes to `login`.
        .route("/login", post(crate::router::login::handler))
        .merge(lookup)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;

    use super::*;
    use crate::config::AccessPolicy;
    use crate::*;

    async fn register(state: &AppState) -> Account {
        state
            .accounts
            .register(account::Registration {
                name: "Antônio Bandeira".into(),
                email: "bandeira@example.com".into(),
                password: "Fortaleza 1922".into(),
                account_type: "organizer".into(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_account_handler() {
        let state = router::state();
        let account = register(&state).await;

        let response = make_request(
            Some(&state),
            app(state.clone()),
            Method::GET,
            &format!("/accounts/{}", account.id),
            String::default(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["id"], account.id);
        assert_eq!(body["email"], "bandeira@example.com");
        assert_eq!(body["accountType"], "ORGANIZER");
        assert!(body.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_get_missing_account() {
        let state = router::state();

        let response = make_request(
            Some(&state),
            app(state.clone()),
            Method::GET,
            "/accounts/404",
            String::default(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_account_requires_token() {
        let state = router::state();
        let account = register(&state).await;
        let path = format!("/accounts/{}", account.id);

        let response = make_request(
            None,
            app(state.clone()),
            Method::GET,
            &path,
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let public = router::state_with(AccessPolicy::Public);
        let account = register(&public).await;
        let response = make_request(
            None,
            app(public),
            Method::GET,
            &format!("/accounts/{}", account.id),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_account_rejects_bad_token() {
        use axum::body::Body;
        use axum::extract::Request;
        use axum::http::header;
        use tower::util::ServiceExt;

        use crate::token::TokenManager;

        let state = router::state();
        let account = register(&state).await;
        let path = format!("/accounts/{}", account.id);

        let forged = TokenManager::new(&state.config.name, b"forged secret", 60)
            .create(&account)
            .unwrap();
        let other_audience = state
            .token
            .clone()
            .audience("somewhere-else")
            .create(&account)
            .unwrap();

        for token in [forged.token, other_audience.token, "not.a.jwt".to_owned()] {
            let request = Request::builder()
                .method(Method::GET)
                .uri(&path)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap();

            let response = app(state.clone()).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        let request = Request::builder()
            .method(Method::GET)
            .uri(&path)
            .header(header::AUTHORIZATION, "Basic YWRtaW46YWRtaW4=")
            .body(Body::empty())
            .unwrap();
        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_get_account_invalid_id() {
        let state = router::state_with(AccessPolicy::Public);

        let response = make_request(
            None,
            app(state),
            Method::GET,
            "/accounts/not-a-number",
            String::default(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
