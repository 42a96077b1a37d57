//! Relational persistence for the docuflow platform.
//!
//! SQLite-backed storage for template metadata, conversation sessions, and
//! generated-document records. Template structure and prompt configurations
//! themselves live in blob storage; this crate only tracks metadata and
//! session state.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{DocumentRepository, SessionRepository, TemplateRepository};
