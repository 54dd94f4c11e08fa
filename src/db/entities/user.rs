use base_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

#[base_entity]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
    #[sea_orm(default_value = false)]
    pub email_verified: bool,
    pub last_login_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(has_many)]
    pub sessions: HasMany<super::session::Entity>,
    #[sea_orm(has_many)]
    pub verification_tokens: HasMany<super::verification_token::Entity>,
    #[sea_orm(has_many)]
    pub password_reset_tokens: HasMany<super::password_reset_token::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
