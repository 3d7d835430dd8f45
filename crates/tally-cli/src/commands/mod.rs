//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, local user)
//! - `correct` - Category corrections
//! - `import` - Statement import
//! - `patterns` - Learned pattern commands (list, add, delete, test)
//! - `serve` - Web server command
//! - `statements` - Statement commands (list, show, delete)

pub mod core;
pub mod correct;
pub mod import;
pub mod patterns;
pub mod serve;
pub mod statements;

// Re-export command functions for main.rs
pub use core::*;
pub use correct::*;
pub use import::*;
pub use patterns::*;
pub use serve::*;
pub use statements::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
