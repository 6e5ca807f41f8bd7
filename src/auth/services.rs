// src/auth/services.rs

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::password::PasswordManager;
use super::tokens::TokenIssuer;
use crate::db::error::RepositoryError;
use crate::db::models::auth_session::NewAuthSession;
use crate::db::models::user::{NewUser, User};
use crate::db::uow::UnitOfWork;
use crate::error::AppError;

// Login uses one message for unknown email and wrong password so the
// response does not reveal which emails are registered.
const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";
const REFRESH_TOKEN_EXPIRED: &str = "Refresh token expired";
const SESSION_NOT_FOUND: &str = "Session not found";
const USER_NOT_FOUND: &str = "User not found";
const INVALID_ACCESS_TOKEN: &str = "Invalid or expired access token";
const ACCOUNT_INACTIVE: &str = "Account is inactive";

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_EMAIL_LENGTH: usize = 320;

/// Result of a login or refresh. Never persisted as such: the refresh token
/// lives in `auth_sessions`, the access token nowhere.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Uuid,
    /// Expiry of `refresh_token`.
    pub expires_at: DateTime<Utc>,
}

impl From<TokenPair> for auth_session_api::TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_at: pair.expires_at,
        }
    }
}

enum RefreshOutcome {
    Rotated(TokenPair),
    Expired,
}

pub struct AuthService<U> {
    uow: U,
    tokens: TokenIssuer,
    passwords: PasswordManager,
    /// Hash of a random secret at the configured cost, verified against when
    /// the email is unknown.
    dummy_hash: String,
}

impl<U: UnitOfWork> AuthService<U> {
    pub fn new(uow: U, tokens: TokenIssuer, passwords: PasswordManager) -> Self {
        let dummy_hash = passwords
            .hash(&Uuid::now_v7().to_string())
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Could not prepare the dummy password hash");
                String::new()
            });

        Self {
            uow,
            tokens,
            passwords,
            dummy_hash,
        }
    }

    /// Inscription d'un nouvel utilisateur
    pub fn register(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = email.trim();
        if !Self::is_valid_email(email) {
            return Err(AppError::validation_with(
                "Invalid email format",
                serde_json::json!({ "field": "email" }),
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::validation_with(
                format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
                serde_json::json!({ "field": "password", "min_length": MIN_PASSWORD_LENGTH }),
            ));
        }

        let hashed_password = self.passwords.hash(password)?;
        let new_user = NewUser {
            email: email.to_string(),
            hashed_password,
        };

        let user = self.uow.transaction(|repos| {
            if repos.users().find_by_email(&new_user.email)?.is_some() {
                return Err(AppError::validation("User already exists"));
            }

            repos.users().create_user(&new_user).map_err(|e| match e {
                // lost a race with a concurrent registration
                RepositoryError::UniqueViolation(_) => AppError::validation("User already exists"),
                other => other.into(),
            })
        });

        match &user {
            Ok(u) => tracing::info!(email = %u.email, "User registered"),
            Err(e) => tracing::warn!(email, error = %e, "Registration rejected"),
        }
        user
    }

    /// Connexion d'un utilisateur
    pub fn login(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let email = email.trim();

        let result = self
            .authenticate(email, password)
            .and_then(|user| self.open_session(&user));

        match &result {
            Ok(_) => tracing::info!(email, "User logged in"),
            Err(e) => tracing::warn!(email, error = %e, "Login rejected"),
        }
        result
    }

    /// bcrypt runs outside any transaction. Unknown emails are checked
    /// against `dummy_hash`, so both failure paths cost one verification.
    fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .uow
            .transaction(|repos| Ok(repos.users().find_by_email(email)?))?;

        let stored_hash = user
            .as_ref()
            .map_or(self.dummy_hash.as_str(), |u| u.hashed_password.as_str());
        let matches = PasswordManager::verify(password, stored_hash);

        let user = user
            .filter(|_| matches)
            .ok_or_else(|| AppError::authentication(INVALID_CREDENTIALS))?;
        if !user.is_active {
            return Err(AppError::authorization(ACCOUNT_INACTIVE));
        }
        Ok(user)
    }

    fn open_session(&self, user: &User) -> Result<TokenPair, AppError> {
        let pair = self.issue_pair(&user.email)?;
        self.uow.transaction(|repos| {
            repos.auth_sessions().add(&NewAuthSession {
                id: Uuid::now_v7(),
                refresh_token: pair.refresh_token,
                user_email: user.email.clone(),
                expires_at: pair.expires_at,
                created_at: Utc::now(),
            })?;
            Ok(())
        })?;
        Ok(pair)
    }

    /// Rotates the session holding `refresh_token`.
    ///
    /// An expired session is deleted and that deletion is committed before
    /// the error is returned, so the next attempt reports an invalid token.
    pub fn refresh(&self, refresh_token: Uuid) -> Result<TokenPair, AppError> {
        let outcome = self.uow.transaction(|repos| {
            let session = repos
                .auth_sessions()
                .find_by_refresh_token(refresh_token)?
                .ok_or_else(|| AppError::refresh_token(INVALID_REFRESH_TOKEN))?;

            if session.is_expired_at(Utc::now()) {
                repos.auth_sessions().remove(session.id)?;
                return Ok(RefreshOutcome::Expired);
            }

            let user = repos
                .users()
                .find_by_email(&session.user_email)?
                .ok_or_else(|| AppError::authentication(USER_NOT_FOUND))?;
            if !user.is_active {
                return Err(AppError::authorization(ACCOUNT_INACTIVE));
            }

            let pair = self.issue_pair(&user.email)?;
            repos
                .auth_sessions()
                .update_refresh_token(session.id, pair.refresh_token, pair.expires_at)
                .map_err(|e| match e {
                    RepositoryError::NotFound(_) => AppError::refresh_token(INVALID_REFRESH_TOKEN),
                    other => other.into(),
                })?;

            tracing::debug!(session_id = %session.id, "Refresh token rotated");
            Ok(RefreshOutcome::Rotated(pair))
        });

        match outcome {
            Ok(RefreshOutcome::Rotated(pair)) => Ok(pair),
            Ok(RefreshOutcome::Expired) => {
                tracing::info!("Expired session removed on refresh");
                Err(AppError::refresh_token(REFRESH_TOKEN_EXPIRED))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Refresh rejected");
                Err(e)
            }
        }
    }

    /// Deletes the session. A second call with the same token fails with
    /// "Session not found" instead of succeeding silently.
    pub fn logout(&self, refresh_token: Uuid) -> Result<(), AppError> {
        self.uow.transaction(|repos| {
            let store = repos.auth_sessions();
            if store.find_by_refresh_token(refresh_token)?.is_none() {
                return Err(AppError::refresh_token(SESSION_NOT_FOUND));
            }
            store.delete_by_refresh_token(refresh_token)?;
            Ok(())
        })?;

        tracing::info!("Session closed");
        Ok(())
    }

    pub fn get_current_user(&self, access_token: &str) -> Result<User, AppError> {
        if access_token.trim().is_empty() {
            return Err(AppError::authentication("Access token missing"));
        }

        let claims = self.tokens.decode_access_token(access_token).map_err(|e| {
            tracing::debug!(error = %e, "Access token rejected");
            AppError::authentication(INVALID_ACCESS_TOKEN)
        })?;
        let email = claims
            .sub
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::authentication(INVALID_ACCESS_TOKEN))?;

        // Inactive users still resolve so they can log out; login and
        // refresh are where `is_active` is enforced.
        self.uow
            .transaction(|repos| Ok(repos.users().find_by_email(&email)?))?
            .ok_or_else(|| AppError::authentication(USER_NOT_FOUND))
    }

    fn issue_pair(&self, subject: &str) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.tokens.generate_access_token(subject)?,
            refresh_token: self.tokens.generate_refresh_token(),
            expires_at: self.tokens.refresh_token_expires_at()?,
        })
    }

    // === Helpers de validation ===

    fn is_valid_email(email: &str) -> bool {
        if email.len() > MAX_EMAIL_LENGTH || email.chars().any(char::is_whitespace) {
            return false;
        }
        match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain
                        .split_once('.')
                        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
            }
            None => false,
        }
    }
}
