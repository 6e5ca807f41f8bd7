use crate::db::error::RepositoryError;
use crate::db::models::auth_session::{AuthSession, NewAuthSession};
use crate::db::schema::auth_sessions;
use chrono::{DateTime, Utc};
use diesel::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

pub struct AuthSessionRepository;

impl AuthSessionRepository {
    pub fn create(
        conn: &mut PgConnection,
        new_session: &NewAuthSession,
    ) -> Result<AuthSession, RepositoryError> {
        diesel::insert_into(auth_sessions::table)
            .values(new_session)
            .returning(AuthSession::as_returning())
            .get_result(conn)
            .map_err(Into::into)
    }

    /// Locks the matching row until the surrounding transaction ends, so a
    /// concurrent rotation of the same token waits and then sees no row.
    pub fn find_by_refresh_token_for_update(
        conn: &mut PgConnection,
        refresh_token: Uuid,
    ) -> Result<Option<AuthSession>, RepositoryError> {
        auth_sessions::table
            .filter(auth_sessions::refresh_token.eq(refresh_token))
            .select(AuthSession::as_select())
            .for_update()
            .get_result(conn)
            .optional()
            .map_err(Into::into)
    }

    pub fn update_refresh_token(
        conn: &mut PgConnection,
        session_id: Uuid,
        new_refresh_token: Uuid,
        new_expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let updated = diesel::update(auth_sessions::table.find(session_id))
            .set((
                auth_sessions::refresh_token.eq(new_refresh_token),
                auth_sessions::expires_at.eq(new_expires_at),
                auth_sessions::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;

        if updated == 0 {
            return Err(RepositoryError::NotFound(format!(
                "auth session {session_id}"
            )));
        }
        Ok(())
    }

    pub fn delete_by_refresh_token(
        conn: &mut PgConnection,
        refresh_token: Uuid,
    ) -> Result<(), RepositoryError> {
        diesel::delete(
            auth_sessions::table.filter(auth_sessions::refresh_token.eq(refresh_token)),
        )
        .execute(conn)?;

        Ok(())
    }

    pub fn delete(conn: &mut PgConnection, session_id: Uuid) -> Result<(), RepositoryError> {
        diesel::delete(auth_sessions::table.find(session_id)).execute(conn)?;

        Ok(())
    }
}
