//! Document rendering for the docuflow platform.
//!
//! Fills a document template with collected session data (LLM-assisted with
//! a deterministic fallback), renders the filled structure to HTML or plain
//! text, and persists the artifact to blob storage.

pub mod fill;
pub mod generator;
pub mod html;

pub use fill::TemplateFiller;
pub use generator::{DocumentGenerator, GeneratedArtifact};
