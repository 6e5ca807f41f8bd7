use crate::db::schema::auth_sessions;
use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use uuid::Uuid;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = auth_sessions)]
pub struct NewAuthSession {
    pub id: Uuid,
    pub refresh_token: Uuid,
    pub user_email: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One refresh cycle of a user. The row keeps its `id` across rotations;
/// only `refresh_token` and `expires_at` change.
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = auth_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AuthSession {
    pub id: Uuid,
    pub refresh_token: Uuid,
    pub user_email: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session_expiring_at(expires_at: DateTime<Utc>) -> AuthSession {
        let now = Utc::now();
        AuthSession {
            id: Uuid::now_v7(),
            refresh_token: Uuid::now_v7(),
            user_email: "a@x.com".to_string(),
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn session_is_valid_strictly_before_expiry() {
        let now = Utc::now();
        assert!(!session_expiring_at(now + Duration::seconds(1)).is_expired_at(now));
        assert!(session_expiring_at(now).is_expired_at(now));
        assert!(session_expiring_at(now - Duration::days(1)).is_expired_at(now));
    }
}
