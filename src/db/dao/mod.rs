pub mod base;
pub mod base_traits;
mod context;
pub mod error;
pub mod password_reset_token_dao;
pub mod session_dao;
pub mod user_dao;
pub mod verification_token_dao;

pub use base::DaoBase;
pub use base_traits::{
    HasCreatedAtColumn, HasExpiryColumn, HasIdActiveModel, HasOwnerColumn,
    TimestampedActiveModel,
};
pub use context::DaoContext;
pub use error::{DaoLayerError, DaoResult};
pub use password_reset_token_dao::PasswordResetTokenDao;
pub use session_dao::SessionDao;
pub use user_dao::UserDao;
pub use verification_token_dao::VerificationTokenDao;
