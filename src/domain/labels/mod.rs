//! Labels and their registration across a project

pub mod hierarchy;
pub mod label;
pub mod manager;
pub mod ordering;
pub mod pipeline;

pub use label::{HeadingLevel, HeadingRef, Hierarchy, Label, LabelKey, LabelVariant};
pub use manager::LabelManager;
pub use pipeline::RegistrationPass;
