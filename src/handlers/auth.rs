// src/handlers/auth.rs

use auth_session_api::{LoginRequest, RegisterRequest, TokenResponse, UserResponse};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::cookies::refresh_token_from;
use crate::auth::extractors::CurrentUser;
use crate::db::uow::UnitOfWork;
use crate::error::AppError;
use crate::response::AppResponse;

/// POST /auth/register
/// Inscription d'un nouvel utilisateur
pub async fn register<U: UnitOfWork + 'static>(
    State(state): State<AppState<U>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<AppResponse<UserResponse>, AppError> {
    let Json(payload) = payload?;
    let user = state
        .run(move |auth| auth.register(&payload.email, &payload.password))
        .await?;
    Ok(AppResponse::created(user.into()))
}

/// POST /auth/login
/// Connexion d'un utilisateur
pub async fn login<U: UnitOfWork + 'static>(
    State(state): State<AppState<U>>,
    cookies: Cookies,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<AppResponse<TokenResponse>, AppError> {
    let Json(payload) = payload?;
    let tokens = state
        .run(move |auth| auth.login(&payload.email, &payload.password))
        .await?;

    state.cookies.set_tokens(&cookies, &tokens);
    Ok(AppResponse::ok(tokens.into()))
}

/// PATCH /auth/refresh
/// Rafraîchissement des tokens à partir du cookie `refresh_token`
pub async fn refresh<U: UnitOfWork + 'static>(
    State(state): State<AppState<U>>,
    cookies: Cookies,
) -> Result<AppResponse<TokenResponse>, AppError> {
    let refresh_token = refresh_token_cookie(&cookies)?;
    let tokens = state.run(move |auth| auth.refresh(refresh_token)).await?;

    state.cookies.set_tokens(&cookies, &tokens);
    Ok(AppResponse::ok(tokens.into()))
}

/// DELETE /auth/logout
/// Déconnexion de la session portée par le cookie `refresh_token`
pub async fn logout<U: UnitOfWork + 'static>(
    State(state): State<AppState<U>>,
    CurrentUser(user): CurrentUser,
    cookies: Cookies,
) -> Result<AppResponse<()>, AppError> {
    let refresh_token = refresh_token_cookie(&cookies)?;
    state.run(move |auth| auth.logout(refresh_token)).await?;

    tracing::debug!(email = %user.email, "Cookies cleared on logout");
    state.cookies.clear_tokens(&cookies);
    Ok(AppResponse::no_content())
}

fn refresh_token_cookie(cookies: &Cookies) -> Result<Uuid, AppError> {
    let raw = refresh_token_from(cookies)
        .ok_or_else(|| AppError::refresh_token("Refresh token missing"))?;
    Uuid::parse_str(&raw).map_err(|_| AppError::refresh_token("Invalid refresh token"))
}
