pub mod admin;
pub mod auth;
pub mod public;
mod router;
pub mod settings;

pub use router::router;
