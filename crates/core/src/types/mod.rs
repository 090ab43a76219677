//! Core types for Tourvisto.
//!
//! This module provides type-safe wrappers for identity and role concepts.

pub mod email;
pub mod id;
pub mod principal;
pub mod profile;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use principal::Principal;
pub use profile::{ElevationRequest, Profile, RoleResolution};
pub use status::*;
