//! folio - Markup parsing and cross-document label numbering
//!
//! Parses custom `@tag[attributes]{content}` markup into tag trees and numbers
//! the headings, figures and tables of a multi-document project consistently,
//! however its documents are edited, reordered or reloaded.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::FolioError;
