//! In-process implementation of the store contracts.
//!
//! Used for `STORAGE_BACKEND=memory` during local development and by every
//! workflow and router test. A transaction reads the committed state and
//! copies it on its first write; the copy is swapped in only when the work
//! returns `Ok`. The lock is held for the whole transaction, so transactions
//! are serializable.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::RepositoryError;
use super::models::auth_session::{AuthSession, NewAuthSession};
use super::models::user::{NewUser, User};
use super::uow::{Repositories, SessionStore, UnitOfWork, UserStore};
use crate::error::AppError;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<String, User>,
    sessions: HashMap<Uuid, AuthSession>,
}

#[derive(Debug, Default)]
pub struct InMemoryUnitOfWork {
    state: Mutex<MemoryState>,
}

impl InMemoryUnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed sessions, for assertions in tests.
    #[cfg(test)]
    pub fn sessions(&self) -> Vec<AuthSession> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.sessions.values().cloned().collect()
    }

    #[cfg(test)]
    pub fn set_user_active(&self, email: &str, active: bool) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(user) = state.users.get_mut(email) {
            user.is_active = active;
        }
    }

    /// Drops the user row but keeps its sessions, which the foreign key
    /// would normally prevent.
    #[cfg(test)]
    pub fn forget_user(&self, email: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.users.remove(email);
    }
}

impl UnitOfWork for InMemoryUnitOfWork {
    fn transaction<T, F>(&self, work: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut dyn Repositories) -> Result<T, AppError>,
    {
        // A panic inside `work` poisons the lock but never touches the
        // committed state, which is only replaced on success below.
        let mut committed = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let mut repos = MemoryRepositories {
            state: Cow::Borrowed(&*committed),
        };
        let result = work(&mut repos);
        let written = match repos.state {
            Cow::Owned(state) => Some(state),
            Cow::Borrowed(_) => None,
        };

        if let (Ok(_), Some(state)) = (&result, written) {
            *committed = state;
        }
        result
    }
}

struct MemoryRepositories<'s> {
    state: Cow<'s, MemoryState>,
}

impl Repositories for MemoryRepositories<'_> {
    fn users(&mut self) -> &mut dyn UserStore {
        self
    }

    fn auth_sessions(&mut self) -> &mut dyn SessionStore {
        self
    }
}

impl UserStore for MemoryRepositories<'_> {
    fn find_by_email(&mut self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.state.users.get(email).cloned())
    }

    fn create_user(&mut self, new_user: &NewUser) -> Result<User, RepositoryError> {
        if self.state.users.contains_key(&new_user.email) {
            return Err(RepositoryError::UniqueViolation(format!(
                "users.email = {}",
                new_user.email
            )));
        }

        let now = Utc::now();
        let user = User {
            email: new_user.email.clone(),
            hashed_password: new_user.hashed_password.clone(),
            is_active: true,
            is_verified: false,
            created_at: now,
            updated_at: now,
        };
        self.state
            .to_mut()
            .users
            .insert(user.email.clone(), user.clone());
        Ok(user)
    }
}

impl SessionStore for MemoryRepositories<'_> {
    fn add(&mut self, session: &NewAuthSession) -> Result<AuthSession, RepositoryError> {
        if self.state.sessions.contains_key(&session.id) {
            return Err(RepositoryError::UniqueViolation(format!(
                "auth_sessions.id = {}",
                session.id
            )));
        }
        if self
            .state
            .sessions
            .values()
            .any(|s| s.refresh_token == session.refresh_token)
        {
            return Err(RepositoryError::UniqueViolation(
                "auth_sessions.refresh_token".to_string(),
            ));
        }
        if !self.state.users.contains_key(&session.user_email) {
            return Err(RepositoryError::ForeignKeyViolation(
                "auth_sessions.user_email".to_string(),
            ));
        }

        let created = AuthSession {
            id: session.id,
            refresh_token: session.refresh_token,
            user_email: session.user_email.clone(),
            expires_at: session.expires_at,
            created_at: session.created_at,
            updated_at: session.created_at,
        };
        self.state
            .to_mut()
            .sessions
            .insert(created.id, created.clone());
        Ok(created)
    }

    fn find_by_refresh_token(
        &mut self,
        refresh_token: Uuid,
    ) -> Result<Option<AuthSession>, RepositoryError> {
        Ok(self
            .state
            .sessions
            .values()
            .find(|s| s.refresh_token == refresh_token)
            .cloned())
    }

    fn update_refresh_token(
        &mut self,
        session_id: Uuid,
        new_refresh_token: Uuid,
        new_expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        if self
            .state
            .sessions
            .values()
            .any(|s| s.id != session_id && s.refresh_token == new_refresh_token)
        {
            return Err(RepositoryError::UniqueViolation(
                "auth_sessions.refresh_token".to_string(),
            ));
        }

        if !self.state.sessions.contains_key(&session_id) {
            return Err(RepositoryError::NotFound(format!("auth session {session_id}")));
        }
        let session = self
            .state
            .to_mut()
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("auth session {session_id}")))?;
        session.refresh_token = new_refresh_token;
        session.expires_at = new_expires_at;
        session.updated_at = Utc::now();
        Ok(())
    }

    fn delete_by_refresh_token(&mut self, refresh_token: Uuid) -> Result<(), RepositoryError> {
        if self
            .state
            .sessions
            .values()
            .any(|s| s.refresh_token == refresh_token)
        {
            self.state
                .to_mut()
                .sessions
                .retain(|_, s| s.refresh_token != refresh_token);
        }
        Ok(())
    }

    fn remove(&mut self, session_id: Uuid) -> Result<(), RepositoryError> {
        if self.state.sessions.contains_key(&session_id) {
            self.state.to_mut().sessions.remove(&session_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            hashed_password: "test_hash".to_string(),
        }
    }

    fn new_session(email: &str) -> NewAuthSession {
        NewAuthSession {
            id: Uuid::now_v7(),
            refresh_token: Uuid::now_v7(),
            user_email: email.to_string(),
            expires_at: Utc::now() + Duration::days(7),
            created_at: Utc::now(),
        }
    }

    fn seeded(email: &str) -> InMemoryUnitOfWork {
        let uow = InMemoryUnitOfWork::new();
        uow.transaction(|repos| {
            repos.users().create_user(&new_user(email))?;
            Ok(())
        })
        .unwrap();
        uow
    }

    #[test]
    fn committed_writes_are_visible_to_later_transactions() {
        let uow = seeded("a@x.com");
        let session = new_session("a@x.com");
        uow.transaction(|repos| {
            repos.auth_sessions().add(&session)?;
            Ok(())
        })
        .unwrap();

        let found = uow
            .transaction(|repos| Ok(repos.auth_sessions().find_by_refresh_token(session.refresh_token)?))
            .unwrap();
        assert_eq!(found.map(|s| s.id), Some(session.id));
    }

    #[test]
    fn failed_transaction_discards_every_write() {
        let uow = seeded("a@x.com");
        let result: Result<(), AppError> = uow.transaction(|repos| {
            repos.users().create_user(&new_user("b@x.com"))?;
            repos.auth_sessions().add(&new_session("a@x.com"))?;
            Err(AppError::internal("boom"))
        });

        assert!(result.is_err());
        assert!(uow.sessions().is_empty());
        let b = uow
            .transaction(|repos| Ok(repos.users().find_by_email("b@x.com")?))
            .unwrap();
        assert!(b.is_none());
    }

    #[test]
    fn panicking_transaction_leaves_state_untouched() {
        let uow = seeded("a@x.com");
        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = uow.transaction::<(), _>(|repos| {
                repos.auth_sessions().add(&new_session("a@x.com"))?;
                panic!("aborted mid-operation");
            });
        }));

        assert!(caught.is_err());
        assert!(uow.sessions().is_empty());
    }

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let uow = seeded("a@x.com");
        let result = uow.transaction(|repos| Ok(repos.users().create_user(&new_user("a@x.com"))?));
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn add_rejects_a_reused_refresh_token() {
        let uow = seeded("a@x.com");
        let first = new_session("a@x.com");
        let mut second = new_session("a@x.com");
        second.refresh_token = first.refresh_token;

        uow.transaction(|repos| {
            repos.auth_sessions().add(&first)?;
            Ok(())
        })
        .unwrap();
        let conflict = uow.transaction(|repos| {
            let outcome = repos.auth_sessions().add(&second);
            Ok(matches!(outcome, Err(RepositoryError::UniqueViolation(_))))
        });
        assert_eq!(conflict.ok(), Some(true));
    }

    #[test]
    fn add_rejects_unknown_owner() {
        let uow = InMemoryUnitOfWork::new();
        let outcome = uow.transaction(|repos| {
            let added = repos.auth_sessions().add(&new_session("ghost@x.com"));
            Ok(matches!(added, Err(RepositoryError::ForeignKeyViolation(_))))
        });
        assert_eq!(outcome.ok(), Some(true));
    }

    #[test]
    fn update_refresh_token_keeps_the_row_and_drops_the_old_value() {
        let uow = seeded("a@x.com");
        let session = new_session("a@x.com");
        let rotated = Uuid::now_v7();

        uow.transaction(|repos| {
            repos.auth_sessions().add(&session)?;
            repos.auth_sessions().update_refresh_token(
                session.id,
                rotated,
                Utc::now() + Duration::days(7),
            )?;
            Ok(())
        })
        .unwrap();

        let (old, new) = uow
            .transaction(|repos| {
                let store = repos.auth_sessions();
                Ok((
                    store.find_by_refresh_token(session.refresh_token)?,
                    store.find_by_refresh_token(rotated)?,
                ))
            })
            .unwrap();
        assert!(old.is_none());
        assert_eq!(new.map(|s| s.id), Some(session.id));
    }

    #[test]
    fn update_refresh_token_fails_for_unknown_session() {
        let uow = InMemoryUnitOfWork::new();
        let outcome = uow.transaction(|repos| {
            let updated = repos.auth_sessions().update_refresh_token(
                Uuid::now_v7(),
                Uuid::now_v7(),
                Utc::now(),
            );
            Ok(matches!(updated, Err(RepositoryError::NotFound(_))))
        });
        assert_eq!(outcome.ok(), Some(true));
    }

    #[test]
    fn deletes_are_idempotent() {
        let uow = seeded("a@x.com");
        let session = new_session("a@x.com");
        uow.transaction(|repos| {
            let store = repos.auth_sessions();
            store.add(&session)?;
            store.delete_by_refresh_token(session.refresh_token)?;
            store.delete_by_refresh_token(session.refresh_token)?;
            store.remove(session.id)?;
            Ok(())
        })
        .unwrap();
        assert!(uow.sessions().is_empty());
    }
}
