use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, sea_query::Expr,
};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::auth::stores::VerificationTokenStore;
use crate::db::entities::{prelude::VerificationToken, verification_token};

#[derive(Clone)]
pub struct VerificationTokenDao {
    db: DatabaseConnection,
}

impl DaoBase for VerificationTokenDao {
    type Entity = VerificationToken;

    fn from_db(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl VerificationTokenStore for VerificationTokenDao {
    async fn create_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<FixedOffset>,
    ) -> DaoResult<verification_token::Model> {
        let model = verification_token::ActiveModel {
            token: Set(token.to_string()),
            user_id: Set(user_id),
            expires_at: Set(expires_at),
            consumed: Set(false),
            ..Default::default()
        };
        self.create(model).await
    }

    async fn find_by_token(&self, token: &str) -> DaoResult<Option<verification_token::Model>> {
        let token = token.to_string();
        self.find_one(move |query| query.filter(verification_token::Column::Token.eq(token)))
            .await
    }

    async fn mark_consumed(&self, id: Uuid) -> DaoResult<bool> {
        let result = VerificationToken::update_many()
            .col_expr(verification_token::Column::Consumed, Expr::value(true))
            .col_expr(
                verification_token::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(verification_token::Column::Id.eq(id))
            .filter(verification_token::Column::Consumed.eq(false))
            .exec(&self.db)
            .await
            .map_err(DaoLayerError::from)?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_expired(&self, now: DateTime<FixedOffset>) -> DaoResult<u64> {
        self.delete_expired_before(now).await
    }
}
