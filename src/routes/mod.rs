pub mod api;
mod entry;
pub mod middleware;

pub use entry::{API_PREFIX, app, router};
pub use middleware::{AuthGuard, AuthRoleGuard};
