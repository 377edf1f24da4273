//! Authentication: password hashing and signed, stateless session tokens.
//!
//! A session is a token carried in the `session` cookie (or a bearer header).
//! Nothing is stored server-side; signing out just clears the cookie.

pub mod password;
pub mod session;

pub use password::{hash_password, verify_password, DEFAULT_ROUNDS};
pub use session::{SessionClaims, SessionKeys, SESSION_COOKIE};
