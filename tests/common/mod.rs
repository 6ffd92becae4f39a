#![allow(dead_code)]

use folio::domain::{DocumentContext, LabelManager, Parser, ProjectTree};
use folio::infrastructure::Settings;
use std::sync::Arc;

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// A project tree, the root's context and a label manager over them
pub struct Fixture {
    pub tree: Arc<ProjectTree>,
    pub context: DocumentContext,
    pub labels: LabelManager,
}

impl Fixture {
    pub fn doc(&self, doc_id: &str) -> DocumentContext {
        self.context.for_document(doc_id)
    }
}

pub fn fixture(root: &str, includes: &[&str]) -> Fixture {
    let tree = Arc::new(ProjectTree::new(root));
    tree.set_includes(root, strings(includes));
    let context = DocumentContext::new(root, &Settings::default(), tree.clone());
    let labels = LabelManager::new(&context).unwrap();
    Fixture {
        tree,
        context,
        labels,
    }
}

pub fn parser() -> Parser {
    Parser::from_settings(&Settings::default()).unwrap()
}
