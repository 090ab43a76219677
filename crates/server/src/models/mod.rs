//! Types stored in the session.

pub mod session;

pub use session::{CurrentProfile, keys as session_keys};
