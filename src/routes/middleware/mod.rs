mod guards;

pub use guards::{AuthGuard, AuthRoleGuard};
