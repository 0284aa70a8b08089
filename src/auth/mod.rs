//! Credential resolution and authorization.
//!
//! The flow for every request is linear: extract the credential material
//! into a [`credential::Credential`] variant, resolve it against the stores
//! into a [`resolver::Resolved`] principal, then let [`arbiter::decide`]
//! compare it with the target feed's visibility and ownership. Each step
//! returns a typed outcome; nothing is thrown past this module.

pub mod arbiter;
pub mod credential;
pub mod resolver;
pub mod session;
