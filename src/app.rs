// src/app.rs

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::auth::cookies::CookiePolicy;
use crate::auth::services::AuthService;
use crate::db::uow::UnitOfWork;
use crate::error::AppError;
use crate::handlers::auth::{login, logout, refresh, register};
use crate::handlers::health::health;
use crate::handlers::not_found;
use crate::handlers::user::me;

pub struct AppState<U> {
    pub auth: Arc<AuthService<U>>,
    pub cookies: CookiePolicy,
}

// derive(Clone) would require `U: Clone`
impl<U> Clone for AppState<U> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            cookies: self.cookies,
        }
    }
}

impl<U: UnitOfWork + 'static> AppState<U> {
    /// Runs a workflow on the blocking pool. Hashing and database round trips
    /// stay off the async workers, and the transaction runs to completion even
    /// if the request future is dropped.
    pub async fn run<T, F>(&self, work: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&AuthService<U>) -> Result<T, AppError> + Send + 'static,
    {
        let auth = Arc::clone(&self.auth);
        tokio::task::spawn_blocking(move || work(auth.as_ref()))
            .await
            .map_err(|e| AppError::internal(format!("Workflow task failed: {e}")))?
    }
}

/// Configure les routes d'authentification
fn auth_routes<U: UnitOfWork + 'static>() -> Router<AppState<U>> {
    Router::new()
        .route("/register", post(register::<U>))
        .route("/login", post(login::<U>))
        .route("/refresh", patch(refresh::<U>))
        .route("/logout", delete(logout::<U>))
}

/// Configure les routes utilisateur
fn user_routes<U: UnitOfWork + 'static>() -> Router<AppState<U>> {
    Router::new().route("/me", get(me))
}

/// Construit l'application complète
pub fn build_router<U: UnitOfWork + 'static>(
    service: AuthService<U>,
    cookies: CookiePolicy,
) -> Router {
    let state = AppState {
        auth: Arc::new(service),
        cookies,
    };

    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .fallback(not_found)
        .with_state(state)
        .layer(CookieManagerLayer::new())
        // Middleware global de tracing
        .layer(TraceLayer::new_for_http())
}
