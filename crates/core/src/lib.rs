//! Tourvisto Core - Shared identity and role types.
//!
//! This crate provides the types used across all Tourvisto components:
//! - `server` - Sign-in callback, session handling and guarded pages
//! - `cli` - Migrations and the approver's elevation commands
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. The role merge rule and the redirect
//! policy live here so that every store implementation and every caller
//! agrees on them.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, statuses, principals and account records
//! - [`policy`] - Redirect decision for a finished sign-in

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod policy;
pub mod types;

pub use policy::{Decision, Route, decide};
pub use types::*;
