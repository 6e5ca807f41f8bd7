use axum::extract::FromRequestParts;
use axum::http::{HeaderValue, header, request::Parts};
use tower_cookies::Cookies;

use super::cookies::access_token_from;
use super::tokens::BEARER_PREFIX;
use crate::app::AppState;
use crate::db::models::user::User;
use crate::db::uow::UnitOfWork;
use crate::error::AppError;

/// Authenticated caller for protected routes.
///
/// The access token comes from `Authorization: Bearer <JWT>` when that header
/// is present, otherwise from the `access_token` cookie.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<U> FromRequestParts<AppState<U>> for CurrentUser
where
    U: UnitOfWork + 'static,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<U>,
    ) -> Result<Self, Self::Rejection> {
        let token = match parts.headers.get(header::AUTHORIZATION) {
            Some(value) => bearer_token(value)?,
            None => {
                let cookies = Cookies::from_request_parts(parts, state)
                    .await
                    .map_err(|(_, msg)| AppError::internal(msg))?;
                access_token_from(&cookies)
                    .ok_or_else(|| AppError::authentication("Access token missing"))?
            }
        };

        let user = state
            .run(move |auth| auth.get_current_user(&token))
            .await?;
        Ok(CurrentUser(user))
    }
}

fn bearer_token(value: &HeaderValue) -> Result<String, AppError> {
    let raw = value
        .to_str()
        .map_err(|_| AppError::token("Invalid Authorization header"))?;

    raw.strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::token("Authorization header must use the Bearer scheme"))
}
