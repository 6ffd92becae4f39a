//! Label ordering: document sequence and hierarchical counters

use super::label::Label;
use crate::infrastructure::LabelResets;
use std::collections::HashMap;

/// Re-sequence `labels` by project document order and drop labels whose
/// document is no longer in the project.
///
/// The sort is stable, so labels keep their relative order within a
/// document, except that a document label always comes first. Returns the
/// number of labels purged.
pub fn reorder_and_purge(labels: &mut Vec<Label>, doc_ids: &[String]) -> usize {
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(doc_ids.len());
    for (i, doc_id) in doc_ids.iter().enumerate() {
        positions.entry(doc_id.as_str()).or_insert(i);
    }

    let before = labels.len();
    labels.retain(|label| positions.contains_key(label.doc_id.as_str()));
    labels.sort_by_key(|label| (positions[label.doc_id.as_str()], !label.is_document()));
    before - labels.len()
}

/// Assign `order` to every label by walking them in sequence with one
/// counter per kind.
///
/// For each kind entry the counter is incremented and every category the
/// reset table lists for that kind is zeroed; the incremented value is
/// recorded.
pub fn assign_orders(labels: &mut [Label], resets: &LabelResets) {
    let mut counters: HashMap<String, u32> = HashMap::new();

    for label in labels.iter_mut() {
        let mut order = Vec::with_capacity(label.kind.len());
        for kind in &label.kind {
            let counter = counters.entry(kind.clone()).or_insert(0);
            *counter += 1;
            let value = *counter;

            if let Some(targets) = resets.get(kind) {
                for target in targets.iter().filter(|t| *t != kind) {
                    counters.insert(target.clone(), 0);
                }
            }
            order.push(value);
        }
        label.order = Some(order);
    }
}
