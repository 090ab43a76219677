//! Sign-in workflow services.
//!
//! # Services
//!
//! - [`session`] - Resolve the principal behind an access token
//! - [`profiles`] - Create or refresh the profile for a principal
//! - [`elevation`] - Admin elevation requests and the approver's transitions
//! - [`sign_in`] - The full callback workflow and its degrade rules
//!
//! Services borrow the store and provider from `AppState` for the duration of
//! one request; they hold no state of their own.

pub mod elevation;
pub mod error;
pub mod profiles;
pub mod session;
pub mod sign_in;

pub use elevation::ElevationRequestManager;
pub use error::{ApprovalError, SignInError};
pub use profiles::ProfileReconciler;
pub use session::SessionResolver;
pub use sign_in::{SignInFlow, SignInOutcome};
