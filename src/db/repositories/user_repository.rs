use crate::db::error::RepositoryError;
use crate::db::models::user::{NewUser, User};
use crate::db::schema::users;
use diesel::PgConnection;
use diesel::prelude::*;

pub struct UserRepository;

impl UserRepository {
    pub fn find_by_email(
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Option<User>, RepositoryError> {
        users::table
            .find(email)
            .select(User::as_select())
            .first(conn)
            .optional()
            .map_err(Into::into)
    }

    /// Créer un nouvel utilisateur
    pub fn create(conn: &mut PgConnection, new_user: &NewUser) -> Result<User, RepositoryError> {
        diesel::insert_into(users::table)
            .values(new_user)
            .returning(User::as_returning())
            .get_result(conn)
            .map_err(Into::into)
    }
}

/// These run against a real PostgreSQL with the migrations applied:
/// `DATABASE_URL=... cargo test -- --ignored`
#[cfg(test)]
mod tests {
    use super::*;

    fn connect() -> PgConnection {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        PgConnection::establish(&url).expect("connect")
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            hashed_password: "test_hash".to_string(),
        }
    }

    #[test]
    #[ignore = "requires a PostgreSQL database"]
    fn create_then_find_by_email() {
        let mut conn = connect();
        conn.test_transaction::<_, RepositoryError, _>(|conn| {
            let created = UserRepository::create(conn, &new_user("repo_find@example.com"))?;
            assert!(created.is_active);
            assert!(!created.is_verified);

            let found = UserRepository::find_by_email(conn, "repo_find@example.com")?;
            assert_eq!(found, Some(created));
            Ok(())
        });
    }

    #[test]
    #[ignore = "requires a PostgreSQL database"]
    fn find_by_email_returns_none_for_unknown_email() {
        let mut conn = connect();
        conn.test_transaction::<_, RepositoryError, _>(|conn| {
            let found = UserRepository::find_by_email(conn, "nobody_12345@example.com")?;
            assert!(found.is_none());
            Ok(())
        });
    }

    #[test]
    #[ignore = "requires a PostgreSQL database"]
    fn duplicate_email_is_a_unique_violation() {
        let mut conn = connect();
        conn.test_transaction::<_, RepositoryError, _>(|conn| {
            UserRepository::create(conn, &new_user("repo_dup@example.com"))?;
            let second = UserRepository::create(conn, &new_user("repo_dup@example.com"));
            assert!(matches!(second, Err(RepositoryError::UniqueViolation(_))));
            Ok(())
        });
    }
}
