//! # Gather Domain
//!
//! Business domain types and models for Gather.
//!
//! This crate contains:
//! - Canonical event, source, and calendar types
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Pure utility functions (title similarity, prompt date ranges)
//!
//! ## Architecture
//! - No dependencies on other Gather crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
// Re-export the similarity helpers used by the dedup engine
pub use utils::similarity::{normalize_promo_title, normalize_title, title_similarity};
