use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::auth::stores::{CredentialStore, NewUser};
use crate::db::entities::{prelude::User, user};

#[derive(Clone)]
pub struct UserDao {
    db: DatabaseConnection,
}

impl DaoBase for UserDao {
    type Entity = User;

    fn from_db(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl CredentialStore for UserDao {
    async fn find_by_email(&self, email: &str) -> DaoResult<Option<user::Model>> {
        let email = email.to_string();
        self.find_one(move |query| query.filter(user::Column::Email.eq(email)))
            .await
    }

    async fn find_user(&self, id: Uuid) -> DaoResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    async fn create_user(&self, new_user: NewUser) -> DaoResult<user::Model> {
        let model = user::ActiveModel {
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            name: Set(new_user.name),
            role: Set(new_user.role.as_str().to_string()),
            email_verified: Set(new_user.email_verified),
            last_login_at: Set(None),
            ..Default::default()
        };
        self.create(model).await
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> DaoResult<()> {
        let password_hash = password_hash.to_string();
        self.update(id, move |active| {
            active.password_hash = Set(password_hash);
        })
        .await
        .map(|_| ())
    }

    async fn mark_email_verified(&self, id: Uuid) -> DaoResult<()> {
        self.update(id, |active| {
            active.email_verified = Set(true);
        })
        .await
        .map(|_| ())
    }

    async fn set_last_login(&self, id: Uuid, at: DateTime<FixedOffset>) -> DaoResult<()> {
        self.update(id, move |active| {
            active.last_login_at = Set(Some(at));
        })
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};
    use uuid::Uuid;

    use super::UserDao;
    use crate::auth::stores::CredentialStore;
    use crate::db::dao::{DaoBase, DaoLayerError};
    use crate::db::entities::user;

    fn ts() -> chrono::DateTime<chrono::FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("offset should be valid")
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("timestamp should be valid")
    }

    fn user_model(id: Uuid, email: &str) -> user::Model {
        let now = ts();
        user::Model {
            id,
            created_at: now,
            updated_at: now,
            email: email.to_string(),
            password_hash: "hash".to_string(),
            name: "Alice".to_string(),
            role: "USER".to_string(),
            email_verified: false,
            last_login_at: None,
        }
    }

    #[tokio::test]
    async fn find_by_email_returns_first_match() {
        let id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user_model(id, "alice@example.com")]])
            .into_connection();
        let dao = UserDao::new(&db);

        let result = dao
            .find_by_email("alice@example.com")
            .await
            .expect("query should succeed");
        assert_eq!(result.map(|u| u.id), Some(id));
    }

    #[tokio::test]
    async fn exists_by_email_is_false_when_missing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let dao = UserDao::new(&db);

        let exists = dao
            .exists_by_email("missing@example.com")
            .await
            .expect("query should succeed");
        assert!(!exists);
    }

    #[tokio::test]
    async fn find_user_returns_none_for_unknown_id() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let dao = UserDao::new(&db);

        let result = dao
            .find_user(Uuid::new_v4())
            .await
            .expect("query should succeed");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn mark_email_verified_propagates_not_found() {
        let missing_id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let dao = UserDao::new(&db);

        let err = dao
            .mark_email_verified(missing_id)
            .await
            .expect_err("update should fail");
        assert!(matches!(
            err,
            DaoLayerError::NotFound { id, .. } if id == missing_id
        ));
    }

    #[tokio::test]
    async fn find_by_email_maps_database_errors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("select failed".to_string())])
            .into_connection();
        let dao = UserDao::new(&db);

        let err = dao
            .find_by_email("alice@example.com")
            .await
            .expect_err("query should fail");
        assert!(matches!(err, DaoLayerError::Db(_)));
    }
}
