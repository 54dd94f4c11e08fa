use sea_orm::DatabaseConnection;

use super::{DaoBase, PasswordResetTokenDao, SessionDao, UserDao, VerificationTokenDao};

#[derive(Clone)]
pub struct DaoContext {
    db: DatabaseConnection,
}

impl DaoContext {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub fn user(&self) -> UserDao {
        DaoBase::new(&self.db)
    }

    pub fn session(&self) -> SessionDao {
        DaoBase::new(&self.db)
    }

    pub fn verification_token(&self) -> VerificationTokenDao {
        DaoBase::new(&self.db)
    }

    pub fn password_reset_token(&self) -> PasswordResetTokenDao {
        DaoBase::new(&self.db)
    }
}
