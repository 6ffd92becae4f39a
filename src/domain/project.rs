//! Project document trees and per-document context

use crate::infrastructure::{LabelResets, Settings};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

/// Source of the authoritative document order for a project
pub trait DocumentTree: Send + Sync {
    /// Every doc_id in the project, depth-first in include order, each once
    fn doc_ids(&self) -> Vec<String>;
}

impl DocumentTree for Vec<String> {
    fn doc_ids(&self) -> Vec<String> {
        self.clone()
    }
}

/// Include graph of a project, rooted at one document
#[derive(Debug)]
pub struct ProjectTree {
    state: RwLock<TreeState>,
}

#[derive(Debug)]
struct TreeState {
    root: String,
    includes: HashMap<String, Vec<String>>,
}

impl ProjectTree {
    pub fn new(root: impl Into<String>) -> Self {
        ProjectTree {
            state: RwLock::new(TreeState {
                root: root.into(),
                includes: HashMap::new(),
            }),
        }
    }

    pub fn root(&self) -> String {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .root
            .clone()
    }

    /// Replace the documents included by `doc_id`, in order
    pub fn set_includes(&self, doc_id: &str, includes: Vec<String>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .includes
            .insert(doc_id.to_string(), includes);
    }

    pub fn includes(&self, doc_id: &str) -> Vec<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .includes
            .get(doc_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop a document and every reference to it
    pub fn remove(&self, doc_id: &str) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.includes.remove(doc_id);
        for includes in state.includes.values_mut() {
            includes.retain(|id| id != doc_id);
        }
    }

    pub fn contains(&self, doc_id: &str) -> bool {
        self.doc_ids().iter().any(|id| id == doc_id)
    }

    /// Include depth of a document: 1 for the root, 2 for its includes, ...
    pub fn level(&self, doc_id: &str) -> Option<usize> {
        self.walk()
            .into_iter()
            .find(|(id, _)| id == doc_id)
            .map(|(_, level)| level)
    }

    /// Depth-first listing with include depth
    fn walk(&self) -> Vec<(String, usize)> {
        fn visit(
            doc_id: &str,
            level: usize,
            includes: &HashMap<String, Vec<String>>,
            seen: &mut HashSet<String>,
            out: &mut Vec<(String, usize)>,
        ) {
            // Each document appears once, at its first inclusion
            if !seen.insert(doc_id.to_string()) {
                return;
            }
            out.push((doc_id.to_string(), level));
            for child in includes.get(doc_id).into_iter().flatten() {
                visit(child, level + 1, includes, seen, out);
            }
        }

        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut out = Vec::new();
        visit(&state.root, 1, &state.includes, &mut HashSet::new(), &mut out);
        out
    }
}

impl DocumentTree for ProjectTree {
    fn doc_ids(&self) -> Vec<String> {
        self.walk().into_iter().map(|(doc_id, _)| doc_id).collect()
    }
}

/// What the parser and label manager need to know about a document
#[derive(Clone)]
pub struct DocumentContext {
    pub doc_id: String,
    pub label_sep: String,
    pub label_resets: LabelResets,
    tree: Arc<dyn DocumentTree>,
}

impl DocumentContext {
    pub fn new(
        doc_id: impl Into<String>,
        settings: &Settings,
        tree: Arc<dyn DocumentTree>,
    ) -> Self {
        DocumentContext {
            doc_id: doc_id.into(),
            label_sep: settings.label_sep.clone(),
            label_resets: settings.label_resets.clone(),
            tree,
        }
    }

    /// A context for a single-document project with default settings
    pub fn standalone(doc_id: &str) -> Self {
        Self::new(
            doc_id,
            &Settings::default(),
            Arc::new(vec![doc_id.to_string()]),
        )
    }

    /// A context for another document of the same project
    pub fn for_document(&self, doc_id: impl Into<String>) -> Self {
        DocumentContext {
            doc_id: doc_id.into(),
            ..self.clone()
        }
    }

    /// The project's document order
    pub fn doc_ids(&self) -> Vec<String> {
        self.tree.doc_ids()
    }

    pub fn tree(&self) -> Arc<dyn DocumentTree> {
        Arc::clone(&self.tree)
    }
}

impl std::fmt::Debug for DocumentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentContext")
            .field("doc_id", &self.doc_id)
            .field("label_sep", &self.label_sep)
            .finish_non_exhaustive()
    }
}
