#[allow(unused_imports)]
pub mod prelude {
    pub use super::password_reset_token::Entity as PasswordResetToken;
    pub use super::session::Entity as Session;
    pub use super::user::Entity as User;
    pub use super::verification_token::Entity as VerificationToken;
}

pub mod password_reset_token;
pub mod session;
pub mod user;
pub mod verification_token;
