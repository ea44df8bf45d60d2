use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;
use crate::token::Token;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(min = 1, message = "Missing email."))]
    pub email: String,
    #[validate(length(min = 1, max = 255, message = "Missing password."))]
    pub password: String,
}

/// Handler to log into an account.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Token>> {
    let token = state
        .accounts
        .authenticate(&body.email, body.password.into())
        .await?;

    Ok(Json(token))
}
