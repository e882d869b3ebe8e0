//! Data models for the roster backend.
//!
//! Field names serialize in camelCase to match the web client.

mod account;
mod member;
mod roster;

pub use account::*;
pub use member::*;
pub use roster::*;
