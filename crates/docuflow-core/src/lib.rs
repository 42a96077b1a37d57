//! Core crate for the docuflow platform.
//!
//! Shared configuration, error taxonomy, and domain types used by every
//! other crate: templates, sessions, execution plans, questions, progress,
//! and validation outcomes.

pub mod config;
pub mod error;
pub mod types;

pub use config::DocuflowConfig;
pub use error::{DocuflowError, Result};
pub use types::*;
