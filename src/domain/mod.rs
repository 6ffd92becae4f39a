//! Domain layer - Tag trees, labels and project structure

pub mod ast;
pub mod labels;
pub mod project;
pub mod signals;

pub use ast::{Node, Parser, Tag, TagContent};
pub use labels::{Label, LabelKey, LabelManager, LabelVariant};
pub use project::{DocumentContext, DocumentTree, ProjectTree};
pub use signals::{Signal, SignalRegistry};
