//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod auth;
pub mod categories;
pub mod patterns;
pub mod statements;
pub mod transactions;

// Re-export all handlers for use in router
pub use auth::*;
pub use categories::*;
pub use patterns::*;
pub use statements::*;
pub use transactions::*;
