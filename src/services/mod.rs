pub mod auth_service;
pub mod context;
pub mod sweeper;

pub use auth_service::{AuthPolicy, AuthService, SweepReport};
pub use context::ServiceContext;
