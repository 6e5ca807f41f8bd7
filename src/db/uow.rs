//! Store contracts and the transaction boundary the auth workflow runs in.
//!
//! A workflow operation calls [`UnitOfWork::transaction`] once and performs
//! every read and write through the [`Repositories`] handle it receives.
//! Returning `Ok` commits, returning `Err` (or panicking) rolls back.

use chrono::{DateTime, Utc};
use diesel::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use super::DbPool;
use super::error::RepositoryError;
use super::models::auth_session::{AuthSession, NewAuthSession};
use super::models::user::{NewUser, User};
use super::repositories::auth_session_repository::AuthSessionRepository;
use super::repositories::user_repository::UserRepository;
use crate::error::AppError;

pub trait UserStore {
    fn find_by_email(&mut self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Fails with [`RepositoryError::UniqueViolation`] if the email is taken.
    fn create_user(&mut self, new_user: &NewUser) -> Result<User, RepositoryError>;
}

pub trait SessionStore {
    /// Fails with [`RepositoryError::UniqueViolation`] if the refresh token exists.
    fn add(&mut self, session: &NewAuthSession) -> Result<AuthSession, RepositoryError>;

    fn find_by_refresh_token(
        &mut self,
        refresh_token: Uuid,
    ) -> Result<Option<AuthSession>, RepositoryError>;

    /// Fails with [`RepositoryError::NotFound`] if `session_id` is unknown.
    fn update_refresh_token(
        &mut self,
        session_id: Uuid,
        new_refresh_token: Uuid,
        new_expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// No-op when the token is absent.
    fn delete_by_refresh_token(&mut self, refresh_token: Uuid) -> Result<(), RepositoryError>;

    /// No-op when the id is absent.
    fn remove(&mut self, session_id: Uuid) -> Result<(), RepositoryError>;
}

/// Both stores, bound to one open transaction.
pub trait Repositories {
    fn users(&mut self) -> &mut dyn UserStore;
    fn auth_sessions(&mut self) -> &mut dyn SessionStore;
}

pub trait UnitOfWork: Send + Sync {
    fn transaction<T, F>(&self, work: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut dyn Repositories) -> Result<T, AppError>;
}

// ============================================
// PostgreSQL
// ============================================

pub struct PgUnitOfWork {
    pool: DbPool,
}

impl PgUnitOfWork {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UnitOfWork for PgUnitOfWork {
    fn transaction<T, F>(&self, work: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut dyn Repositories) -> Result<T, AppError>,
    {
        let mut pooled = self.pool.get().map_err(RepositoryError::from)?;
        let conn: &mut PgConnection = &mut pooled;

        let result = conn.transaction::<T, AppError, _>(|conn| {
            let mut repos = PgRepositories { conn };
            work(&mut repos)
        });

        match &result {
            Ok(_) => tracing::debug!("transaction committed"),
            Err(e) => tracing::debug!(error = %e, "transaction rolled back"),
        }
        result
    }
}

struct PgRepositories<'c> {
    conn: &'c mut PgConnection,
}

impl Repositories for PgRepositories<'_> {
    fn users(&mut self) -> &mut dyn UserStore {
        self
    }

    fn auth_sessions(&mut self) -> &mut dyn SessionStore {
        self
    }
}

impl UserStore for PgRepositories<'_> {
    fn find_by_email(&mut self, email: &str) -> Result<Option<User>, RepositoryError> {
        UserRepository::find_by_email(self.conn, email)
    }

    fn create_user(&mut self, new_user: &NewUser) -> Result<User, RepositoryError> {
        UserRepository::create(self.conn, new_user)
    }
}

impl SessionStore for PgRepositories<'_> {
    fn add(&mut self, session: &NewAuthSession) -> Result<AuthSession, RepositoryError> {
        AuthSessionRepository::create(self.conn, session)
    }

    fn find_by_refresh_token(
        &mut self,
        refresh_token: Uuid,
    ) -> Result<Option<AuthSession>, RepositoryError> {
        AuthSessionRepository::find_by_refresh_token_for_update(self.conn, refresh_token)
    }

    fn update_refresh_token(
        &mut self,
        session_id: Uuid,
        new_refresh_token: Uuid,
        new_expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        AuthSessionRepository::update_refresh_token(
            self.conn,
            session_id,
            new_refresh_token,
            new_expires_at,
        )
    }

    fn delete_by_refresh_token(&mut self, refresh_token: Uuid) -> Result<(), RepositoryError> {
        AuthSessionRepository::delete_by_refresh_token(self.conn, refresh_token)
    }

    fn remove(&mut self, session_id: Uuid) -> Result<(), RepositoryError> {
        AuthSessionRepository::delete(self.conn, session_id)
    }
}
