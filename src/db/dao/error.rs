use sea_orm::{DbErr, SqlErr};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum DaoLayerError {
    #[error("Database error: {0}")]
    Db(DbErr),
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("{entity} not found (id={id})")]
    NotFound { entity: &'static str, id: Uuid },
}

pub type DaoResult<T> = Result<T, DaoLayerError>;

impl From<DbErr> for DaoLayerError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => Self::UniqueViolation(detail),
            _ => Self::Db(err),
        }
    }
}
