//! Core types for Launchpad.
//!
//! This module provides type-safe wrappers for the launch booking domain.

pub mod credential;
pub mod email;
pub mod id;
pub mod launch;
pub mod page;
pub mod user;

pub use credential::{Credential, CredentialError};
pub use email::{Email, EmailError};
pub use id::*;
pub use launch::{Launch, Mission, PatchSize, Rocket};
pub use page::{Cursor, Page};
pub use user::User;
