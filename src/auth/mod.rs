//! Authentication
//!
//! Stateless HMAC-signed session tokens plus Argon2 password hashing.
//! The resource guards in the API layer build on the `CurrentUser`
//! extractor; everything else about account management is ordinary CRUD.

pub mod middleware;
pub mod password;
pub mod session;

pub use middleware::CurrentUser;
pub use session::{Session, create_session_token, verify_session_token};
