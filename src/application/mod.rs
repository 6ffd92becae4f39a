//! Application layer - Use cases and orchestration

pub mod project;

pub use project::{DocumentEvent, DocumentHandle, Project};
