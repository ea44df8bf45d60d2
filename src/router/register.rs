use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::account::{Account, Registration};
use crate::error::Result;
use crate::router::Valid;

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(
        length(
            min = 1,
            max = 255,
            message = "Name must contain between 1 and 255 characters."
        ),
        custom(
            function = "crate::router::validate_not_blank",
            message = "Name must not be blank."
        )
    )]
    pub name: String,
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must contain at least 8 characters."
    ))]
    pub password: String,
    pub account_type: String,
}

/// Handler to register an account.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<Account>)> {
    let account = state
        .accounts
        .register(Registration {
            name: body.name,
            email: body.email,
            password: body.password.into(),
            account_type: body.account_type,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(account)))
}
