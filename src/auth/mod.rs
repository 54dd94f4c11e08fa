pub mod bootstrap;
mod error;
pub mod password;
pub mod resolver;
pub mod stores;
pub mod token;
mod types;

pub use error::AuthError;
pub use resolver::SessionResolver;
pub use types::{
    AdminRole, BearerToken, IssuedSession, Principal, PublicUser, RequiredRole, Role, UserRole,
};
