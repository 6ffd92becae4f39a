//! Tag trees and the markup parser

pub mod factory;
pub mod node;
pub mod parser;
pub mod syntax;
pub mod validate;

// Re-export main types
pub use factory::{StandardTagFactory, TagFactory};
pub use node::{Node, Tag, TagContent, ROOT_TAG};
pub use parser::Parser;
pub use syntax::{TagMatch, TagSyntax};
pub use validate::{LineValidator, NoValidation, ParseValidator};
