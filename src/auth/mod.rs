//! Credential and session layer
pub mod extract;
pub mod password;
pub mod token;

pub use extract::{AdminUser, AuthUser};
pub use token::{Claims, TokenKind};
