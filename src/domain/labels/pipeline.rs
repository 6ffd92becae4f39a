//! The label registration pipeline
//!
//! Registration runs as receivers of the manager's `label.register` signal.
//! Each stage takes the [`RegistrationPass`] and leaves it for the next one:
//!
//! | order | stage                                  |
//! |-------|----------------------------------------|
//! | 100   | [`check_duplicates`]                   |
//! | 200   | [`transfer_labels`]                    |
//! | 300   | [`order_labels`]                       |
//! | 1000  | [`link_hierarchy`]                     |
//!
//! Callers may connect their own stages at any free order.

use super::hierarchy::link_content_labels;
use super::label::Label;
use super::ordering::{assign_orders, reorder_and_purge};
use crate::domain::signals::Signal;
use crate::error::{FolioError, Result};
use crate::infrastructure::LabelResets;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::mem;

pub const REGISTER_SIGNAL: &str = "label.register";

pub const DUPLICATE_CHECK_ORDER: i32 = 100;
pub const TRANSFER_ORDER: i32 = 200;
pub const ORDERING_ORDER: i32 = 300;
pub const HIERARCHY_ORDER: i32 = 1000;

/// The work handed from stage to stage during one registration
#[derive(Debug, Clone, Default)]
pub struct RegistrationPass {
    /// Labels from earlier passes, then the merged result
    pub registered: Vec<Label>,
    /// Labels collected since the last pass, by doc_id
    pub collected: HashMap<String, Vec<Label>>,
    /// Current project document order
    pub doc_ids: Vec<String>,
    pub resets: LabelResets,
}

/// A signal with the standard stages connected
pub fn standard_pipeline() -> Result<Signal<RegistrationPass>> {
    let signal = Signal::new(REGISTER_SIGNAL);
    signal.connect(check_duplicates, DUPLICATE_CHECK_ORDER)?;
    signal.connect(transfer_labels, TRANSFER_ORDER)?;
    signal.connect(order_labels, ORDERING_ORDER)?;
    signal.connect(link_hierarchy, HIERARCHY_ORDER)?;
    Ok(signal)
}

/// Fail if a collected label id is already owned by a different document.
///
/// Ownership is taken from registered labels of documents that are still in
/// the project and are not being replaced by this pass, and from collected
/// labels of documents in the project. Every offending id is named in the error.
pub fn check_duplicates(pass: &mut RegistrationPass) -> Result<()> {
    let live: HashSet<&str> = pass.doc_ids.iter().map(String::as_str).collect();

    let mut owners: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for label in &pass.registered {
        let doc_id = label.doc_id.as_str();
        if live.contains(doc_id) && !pass.collected.contains_key(doc_id) {
            owners.entry(label.id.as_str()).or_default().insert(doc_id);
        }
    }
    for (doc_id, labels) in &pass.collected {
        if !live.contains(doc_id.as_str()) {
            continue;
        }
        for label in labels {
            owners.entry(label.id.as_str()).or_default().insert(doc_id.as_str());
        }
    }

    let mut duplicates: Vec<String> = owners
        .into_iter()
        .filter(|(_, docs)| docs.len() > 1)
        .map(|(id, _)| id.to_string())
        .collect();

    if duplicates.is_empty() {
        Ok(())
    } else {
        duplicates.sort();
        Err(FolioError::DuplicateLabel(duplicates))
    }
}

/// Splice collected labels into the registered list by document order.
///
/// A document with collected labels has all its registered labels replaced
/// by them. Labels of documents outside the project are dropped.
pub fn transfer_labels(pass: &mut RegistrationPass) -> Result<()> {
    let mut registered: HashMap<String, Vec<Label>> = HashMap::new();
    for label in mem::take(&mut pass.registered) {
        registered.entry(label.doc_id.clone()).or_default().push(label);
    }

    let mut merged = Vec::new();
    for doc_id in &pass.doc_ids {
        if let Some(collected) = pass.collected.remove(doc_id) {
            registered.remove(doc_id);
            merged.extend(collected);
        } else if let Some(labels) = registered.remove(doc_id) {
            merged.extend(labels);
        }
    }

    for (doc_id, labels) in pass.collected.drain() {
        tracing::warn!(
            doc_id = %doc_id,
            count = labels.len(),
            "dropping labels of a document outside the project"
        );
    }

    pass.registered = merged;
    Ok(())
}

/// Reorder, purge and count
pub fn order_labels(pass: &mut RegistrationPass) -> Result<()> {
    let purged = reorder_and_purge(&mut pass.registered, &pass.doc_ids);
    if purged > 0 {
        tracing::debug!(purged, "purged labels of removed documents");
    }
    assign_orders(&mut pass.registered, &pass.resets);
    Ok(())
}

pub fn link_hierarchy(pass: &mut RegistrationPass) -> Result<()> {
    link_content_labels(&mut pass.registered);
    Ok(())
}
