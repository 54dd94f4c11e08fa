use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::auth::stores::PasswordResetTokenStore;
use crate::db::entities::{password_reset_token, prelude::PasswordResetToken};

#[derive(Clone)]
pub struct PasswordResetTokenDao {
    db: DatabaseConnection,
}

impl DaoBase for PasswordResetTokenDao {
    type Entity = PasswordResetToken;

    fn from_db(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl PasswordResetTokenStore for PasswordResetTokenDao {
    async fn create_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<FixedOffset>,
    ) -> DaoResult<password_reset_token::Model> {
        let model = password_reset_token::ActiveModel {
            token: Set(token.to_string()),
            user_id: Set(user_id),
            expires_at: Set(expires_at),
            consumed: Set(false),
            ..Default::default()
        };
        self.create(model).await
    }

    async fn find_by_token(
        &self,
        token: &str,
    ) -> DaoResult<Option<password_reset_token::Model>> {
        let token = token.to_string();
        self.find_one(move |query| query.filter(password_reset_token::Column::Token.eq(token)))
            .await
    }

    async fn delete_by_token(&self, token: &str) -> DaoResult<u64> {
        PasswordResetToken::delete_many()
            .filter(password_reset_token::Column::Token.eq(token))
            .exec(&self.db)
            .await
            .map(|result| result.rows_affected)
            .map_err(DaoLayerError::from)
    }

    async fn delete_unused_for_user(&self, user_id: Uuid) -> DaoResult<u64> {
        PasswordResetToken::delete_many()
            .filter(password_reset_token::Column::UserId.eq(user_id))
            .filter(password_reset_token::Column::Consumed.eq(false))
            .exec(&self.db)
            .await
            .map(|result| result.rows_affected)
            .map_err(DaoLayerError::from)
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> DaoResult<u64> {
        self.delete_owned_by(user_id).await
    }

    async fn delete_expired(&self, now: DateTime<FixedOffset>) -> DaoResult<u64> {
        self.delete_expired_before(now).await
    }
}
