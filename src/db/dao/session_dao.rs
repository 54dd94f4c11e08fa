use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::auth::stores::SessionStore;
use crate::db::entities::{prelude::Session, session};

#[derive(Clone)]
pub struct SessionDao {
    db: DatabaseConnection,
}

impl DaoBase for SessionDao {
    type Entity = Session;

    fn from_db(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl SessionStore for SessionDao {
    async fn create_session(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<FixedOffset>,
    ) -> DaoResult<session::Model> {
        let model = session::ActiveModel {
            token: Set(token.to_string()),
            user_id: Set(user_id),
            expires_at: Set(expires_at),
            ..Default::default()
        };
        self.create(model).await
    }

    async fn find_by_token(&self, token: &str) -> DaoResult<Option<session::Model>> {
        let token = token.to_string();
        let now = Utc::now().fixed_offset();
        self.find_one(move |query| {
            query
                .filter(session::Column::Token.eq(token))
                .filter(session::Column::ExpiresAt.gt(now))
        })
        .await
    }

    async fn delete_by_token(&self, token: &str) -> DaoResult<u64> {
        Session::delete_many()
            .filter(session::Column::Token.eq(token))
            .exec(&self.db)
            .await
            .map(|result| result.rows_affected)
            .map_err(DaoLayerError::from)
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> DaoResult<u64> {
        self.delete_owned_by(user_id).await
    }

    async fn delete_all_for_user_except(
        &self,
        user_id: Uuid,
        keep_token: &str,
    ) -> DaoResult<u64> {
        Session::delete_many()
            .filter(session::Column::UserId.eq(user_id))
            .filter(session::Column::Token.ne(keep_token))
            .exec(&self.db)
            .await
            .map(|result| result.rows_affected)
            .map_err(DaoLayerError::from)
    }

    async fn delete_expired(&self, now: DateTime<FixedOffset>) -> DaoResult<u64> {
        self.delete_expired_before(now).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset, TimeZone};
    use sea_orm::{DatabaseBackend, DbErr, IntoMockRow, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::SessionDao;
    use crate::auth::stores::SessionStore;
    use crate::db::dao::{DaoBase, DaoLayerError};
    use crate::db::entities::session;

    struct DaoFixture {
        mock: MockDatabase,
    }

    impl DaoFixture {
        fn new() -> Self {
            Self {
                mock: MockDatabase::new(DatabaseBackend::Postgres),
            }
        }

        fn with_query_results<T, I, II>(mut self, sets: II) -> Self
        where
            T: IntoMockRow,
            I: IntoIterator<Item = T>,
            II: IntoIterator<Item = I>,
        {
            self.mock = self.mock.append_query_results(sets);
            self
        }

        fn with_exec_result(mut self, rows_affected: u64) -> Self {
            self.mock = self.mock.append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected,
            }]);
            self
        }

        fn with_exec_error(mut self, error: DbErr) -> Self {
            self.mock = self.mock.append_exec_errors([error]);
            self
        }

        fn build(self) -> SessionDao {
            SessionDao::new(&self.mock.into_connection())
        }
    }

    fn ts() -> chrono::DateTime<chrono::FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("offset should be valid")
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("timestamp should be valid")
    }

    fn session_model(token: &str, user_id: Uuid) -> session::Model {
        let now = ts();
        session::Model {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            token: token.to_string(),
            user_id,
            expires_at: now + Duration::hours(24),
        }
    }

    #[tokio::test]
    async fn find_by_token_returns_session_when_present() {
        let user_id = Uuid::new_v4();
        let dao = DaoFixture::new()
            .with_query_results([[session_model("token-1", user_id)]])
            .build();

        let session = dao
            .find_by_token("token-1")
            .await
            .expect("query should succeed")
            .expect("session should exist");
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.token, "token-1");
    }

    #[tokio::test]
    async fn find_by_token_returns_none_when_missing() {
        let dao = DaoFixture::new()
            .with_query_results([Vec::<session::Model>::new()])
            .build();

        let result = dao
            .find_by_token("missing-token")
            .await
            .expect("query should succeed");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn bulk_deletes_report_affected_rows() {
        let dao = DaoFixture::new()
            .with_exec_result(3)
            .with_exec_result(2)
            .with_exec_result(0)
            .build();
        let user_id = Uuid::new_v4();

        assert_eq!(dao.delete_all_for_user(user_id).await.expect("delete"), 3);
        assert_eq!(
            dao.delete_all_for_user_except(user_id, "keep")
                .await
                .expect("delete"),
            2
        );
        assert_eq!(dao.delete_by_token("gone").await.expect("delete"), 0);
    }

    #[tokio::test]
    async fn delete_expired_maps_database_errors() {
        let dao = DaoFixture::new()
            .with_exec_error(DbErr::Custom("delete failed".to_string()))
            .build();

        let err = dao
            .delete_expired(ts())
            .await
            .expect_err("delete should fail");
        assert!(matches!(err, DaoLayerError::Db(_)));
    }
}
