//! Project session use case
//!
//! Loads documents into a project: parses their markup and collects the
//! labels of their headings, figures and tables, so that numbering follows
//! the project's document order.

use crate::domain::ast::{Parser, StandardTagFactory, Tag, TagFactory};
use crate::domain::labels::{HeadingLevel, Label, LabelKey, LabelManager};
use crate::domain::project::{DocumentContext, ProjectTree};
use crate::domain::signals::SignalRegistry;
use crate::error::{FolioError, Result};
use crate::infrastructure::Settings;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

/// Emitted after a document was parsed and its labels collected
pub const DOCUMENT_LOADED: &str = "document.loaded";

/// Emitted after a document left the project
pub const DOCUMENT_DELETED: &str = "document.deleted";

const RESET_LABELS_ORDER: i32 = 100;

/// Arguments of the project's document signals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEvent {
    pub doc_id: String,
}

/// A loaded document.
///
/// The handle does not keep the project's label manager alive;
/// [`DocumentHandle::label_manager`] returns `None` once the project is gone.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    context: DocumentContext,
    root: Tag,
    label_keys: Vec<LabelKey>,
    manager: Weak<LabelManager>,
}

impl DocumentHandle {
    pub fn doc_id(&self) -> &str {
        &self.context.doc_id
    }

    pub fn context(&self) -> &DocumentContext {
        &self.context
    }

    /// The parsed tag tree
    pub fn root(&self) -> &Tag {
        &self.root
    }

    /// Keys of the labels collected when the document was loaded
    pub fn label_keys(&self) -> &[LabelKey] {
        &self.label_keys
    }

    pub fn label_manager(&self) -> Option<Arc<LabelManager>> {
        self.manager.upgrade()
    }

    /// The document's labels as currently registered.
    ///
    /// Labels purged since loading are skipped; with the project gone the
    /// result is empty.
    pub fn labels(&self) -> Result<Vec<Label>> {
        let Some(manager) = self.label_manager() else {
            return Ok(Vec::new());
        };
        manager.register_labels()?;
        Ok(self
            .label_keys
            .iter()
            .filter_map(|key| manager.resolve(key))
            .collect())
    }
}

/// One project: a tree of documents sharing label numbering
pub struct Project {
    settings: Settings,
    parser: Parser,
    tree: Arc<ProjectTree>,
    labels: Arc<LabelManager>,
    signals: SignalRegistry<DocumentEvent>,
}

impl Project {
    /// Create a project rooted at `root` with the standard tag factory
    pub fn new(root: &str, settings: Settings) -> Result<Self> {
        let factory = StandardTagFactory::new(settings.verbatim_tags.iter().cloned());
        Self::with_factory(root, settings, Arc::new(factory))
    }

    /// Create a project whose tags are built by `factory`
    pub fn with_factory(
        root: &str,
        settings: Settings,
        factory: Arc<dyn TagFactory>,
    ) -> Result<Self> {
        let parser = Parser::new(&settings, factory)?;
        let tree = Arc::new(ProjectTree::new(root));
        let context = DocumentContext::new(root, &settings, tree.clone());
        let labels = Arc::new(
            LabelManager::new(&context)?
                .with_timeout(Duration::from_millis(settings.registration_timeout_ms)),
        );

        let signals: SignalRegistry<DocumentEvent> = SignalRegistry::new();
        let manager = Arc::downgrade(&labels);
        signals.signal(DOCUMENT_DELETED).connect(
            move |event: &mut DocumentEvent| {
                if let Some(manager) = manager.upgrade() {
                    manager.reset(Some(&[event.doc_id.as_str()]));
                }
                Ok(())
            },
            RESET_LABELS_ORDER,
        )?;

        Ok(Project {
            settings,
            parser,
            tree,
            labels,
            signals,
        })
    }

    /// Create a project with settings read from a TOML file
    pub fn from_config_file(root: &str, path: &Path) -> Result<Self> {
        Self::new(root, Settings::load_from_file(path)?)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn tree(&self) -> &Arc<ProjectTree> {
        &self.tree
    }

    pub fn label_manager(&self) -> &Arc<LabelManager> {
        &self.labels
    }

    /// The project's document signals, for connecting receivers
    pub fn signals(&self) -> &SignalRegistry<DocumentEvent> {
        &self.signals
    }

    /// Context for a document of this project
    pub fn context(&self, doc_id: &str) -> DocumentContext {
        DocumentContext::new(doc_id, &self.settings, self.tree.clone())
    }

    /// Replace the documents included by `doc_id`, in order
    pub fn set_includes(&self, doc_id: &str, includes: &[&str]) {
        self.tree
            .set_includes(doc_id, includes.iter().map(|s| s.to_string()).collect());
    }

    /// Parse `markup` as the document `doc_id` and collect its labels.
    ///
    /// Loading a document again replaces its labels. Label ids come from the
    /// tag's `id` attribute, or are derived from its `short` attribute or its
    /// title.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The markup has a syntax error or nests too deeply
    /// - Two tags in the document resolve to the same label id
    pub fn load_document(&self, doc_id: &str, markup: &str) -> Result<DocumentHandle> {
        let context = self.context(doc_id);

        // 1. Parse
        let root = self.parser.parse(markup, &context)?;

        // 2. Work out every label before touching the manager, so a
        //    rejected document leaves its registered labels alone
        let pending = content_labels(&root, doc_id)?;

        // 3. Collect labels, the document's own first
        self.labels.start_collection(doc_id);
        let mut label_keys = vec![self.collect_document_label(&root, &context)?];
        for (id, kind, title) in &pending {
            let label = self.labels.add_content_label(id, kind, title, &context)?;
            label_keys.push(label.key());
        }

        tracing::debug!(doc_id, labels = label_keys.len(), "loaded document");

        // 4. Notify
        self.signals.signal(DOCUMENT_LOADED).emit(&mut DocumentEvent {
            doc_id: doc_id.to_string(),
        })?;

        Ok(DocumentHandle {
            context,
            root,
            label_keys,
            manager: Arc::downgrade(&self.labels),
        })
    }

    /// Drop a document from the project and forget its labels
    pub fn remove_document(&self, doc_id: &str) -> Result<()> {
        self.tree.remove(doc_id);
        self.signals.signal(DOCUMENT_DELETED).emit(&mut DocumentEvent {
            doc_id: doc_id.to_string(),
        })?;
        tracing::debug!(doc_id, "removed document");
        Ok(())
    }

    fn collect_document_label(&self, root: &Tag, context: &DocumentContext) -> Result<LabelKey> {
        let doc_id = context.doc_id.as_str();

        let mut title = None;
        root.walk(&mut |tag| {
            if title.is_none() && tag.name == "title" {
                title = Some(tag.title());
            }
        });
        let title = title.unwrap_or_else(|| doc_id.to_string());

        let level = self.tree.level(doc_id).unwrap_or(1);
        let level_kind = format!("document-level-{}", level);
        let label = self.labels.add_document_label(
            &format!("doc:{}", slugify(doc_id)),
            &["document", level_kind.as_str()],
            &title,
            context,
        )?;
        Ok(label.key())
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("root", &self.tree.root())
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

/// Id, kind and title of every labeled tag under `root`, in document order.
///
/// Fails with `DuplicateLabel` if two tags resolve to the same id.
fn content_labels<'a>(
    root: &'a Tag,
    doc_id: &str,
) -> Result<Vec<(String, Vec<&'a str>, String)>> {
    let mut tags = Vec::new();
    root.walk(&mut |tag| tags.push(tag));

    let mut generated = 0;
    let mut seen = HashSet::new();
    let mut labels = Vec::new();
    for tag in tags {
        let Some(kind) = label_kind(&tag.name) else {
            continue;
        };
        let id = label_id(tag, doc_id, &mut generated);
        if !seen.insert(id.clone()) {
            return Err(FolioError::DuplicateLabel(vec![id]));
        }
        let title = tag
            .attribute("short")
            .map(str::to_string)
            .unwrap_or_else(|| tag.title());
        labels.push((id, kind, title));
    }
    Ok(labels)
}

/// The label kind for a tag, if the tag is labeled
fn label_kind(name: &str) -> Option<Vec<&str>> {
    if let Some(level) = HeadingLevel::from_name(name) {
        return Some(vec!["heading", level.name()]);
    }
    match name {
        "figure" | "table" => Some(vec![name]),
        _ => None,
    }
}

fn label_id(tag: &Tag, doc_id: &str, generated: &mut usize) -> String {
    if let Some(id) = tag.attribute("id").filter(|id| !id.is_empty()) {
        return id.to_string();
    }
    if let Some(short) = tag.attribute("short").filter(|s| !s.is_empty()) {
        return slugify(&format!("{}-{}", doc_id, short));
    }

    let title = tag.title();
    if title.is_empty() {
        *generated += 1;
        format!("{}-{}", slugify(doc_id), generated)
    } else {
        slugify(&format!("{}-{}", doc_id, title))
    }
}

/// Lowercase, with runs of anything but letters and digits replaced by '-'
fn slugify(s: &str) -> String {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let re = SEPARATORS.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap());
    re.replace_all(&s.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project::new("main", Settings::default()).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Sub/File1.dm"), "sub-file1-dm");
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
        assert_eq!(slugify("main-Intro Text"), "main-intro-text");
    }

    #[test]
    fn test_label_kind() {
        assert_eq!(label_kind("chapter"), Some(vec!["heading", "chapter"]));
        assert_eq!(label_kind("figure"), Some(vec!["figure"]));
        assert_eq!(label_kind("b"), None);
    }

    #[test]
    fn test_label_id_sources() {
        let mut generated = 0;
        let with_id = Tag::pending("figure", "x").with_attributes("id=fig:1");
        assert_eq!(label_id(&with_id, "main", &mut generated), "fig:1");

        let with_short =
            Tag::with_children("chapter", vec![]).with_attributes("short=\"Intro Part\"");
        assert_eq!(label_id(&with_short, "main", &mut generated), "main-intro-part");

        let titled = Tag::with_children("section", vec!["Getting Started".into()]);
        assert_eq!(label_id(&titled, "main", &mut generated), "main-getting-started");

        let empty = Tag::with_children("figure", vec![]);
        assert_eq!(label_id(&empty, "main", &mut generated), "main-1");
        assert_eq!(label_id(&empty, "main", &mut generated), "main-2");
    }

    #[test]
    fn test_load_collects_labels_in_order() {
        let project = project();
        let doc = project
            .load_document(
                "main",
                "@title{My Book}\n@chapter[id=ch:one]{One}\n@figure[id=fig:a]{A plot}\n",
            )
            .unwrap();

        let ids: Vec<&str> = doc.label_keys().iter().map(|k| k.id.as_str()).collect();
        assert_eq!(ids, vec!["doc:main", "ch:one", "fig:a"]);

        let labels = doc.labels().unwrap();
        assert_eq!(labels[0].title(), Some("My Book"));
        assert_eq!(labels[0].kind, vec!["document", "document-level-1"]);
        assert_eq!(labels[2].chapter_title(), Some("One"));
    }

    #[test]
    fn test_reload_replaces_labels() {
        let project = project();
        project
            .load_document("main", "@figure[id=a]{A} @figure[id=b]{B}")
            .unwrap();
        project.load_document("main", "@figure[id=b]{B}").unwrap();

        let figures = project
            .label_manager()
            .get_labels_by_kind(None, Some(&["figure"]))
            .unwrap();
        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].id, "b");
        assert_eq!(figures[0].number(), Some(1));
    }

    #[test]
    fn test_duplicate_ids_in_one_document() {
        let project = project();
        let result = project.load_document("main", "@figure[id=x]{A} @table[id=x]{B}");
        assert!(matches!(result, Err(FolioError::DuplicateLabel(_))));
    }

    #[test]
    fn test_content_labels_rejects_repeated_id() {
        let root = Tag::with_children(
            "root",
            vec![
                Tag::pending("figure", "A").with_attributes("id=x").into(),
                Tag::pending("table", "B").with_attributes("id=x").into(),
            ],
        );
        assert!(matches!(
            content_labels(&root, "main"),
            Err(FolioError::DuplicateLabel(ids)) if ids == vec!["x"]
        ));
    }

    #[test]
    fn test_remove_document_resets_labels() {
        let project = project();
        project.set_includes("main", &["a"]);
        project.load_document("main", "@chapter{Main}").unwrap();
        let a = project.load_document("a", "@chapter{In A}").unwrap();
        assert_eq!(a.labels().unwrap().len(), 2);

        project.remove_document("a").unwrap();
        assert!(a.labels().unwrap().is_empty());
        assert!(project
            .label_manager()
            .get_labels_by_kind(Some("a"), None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_loaded_signal() {
        let project = project();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        project
            .signals()
            .signal(DOCUMENT_LOADED)
            .connect(
                move |event: &mut DocumentEvent| {
                    sink.lock().unwrap().push(event.doc_id.clone());
                    Ok(())
                },
                1,
            )
            .unwrap();

        project.load_document("main", "text").unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["main"]);
    }

    #[test]
    fn test_handle_outlives_project() {
        let doc = project().load_document("main", "@chapter{One}").unwrap();
        assert!(doc.label_manager().is_none());
        assert!(doc.labels().unwrap().is_empty());
        assert_eq!(doc.root().children().len(), 1);
    }

    #[test]
    fn test_restricted_factory() {
        let factory = StandardTagFactory::new(["verb"]).restrict_to(["chapter", "verb"]);
        let project =
            Project::with_factory("main", Settings::default(), Arc::new(factory)).unwrap();
        assert!(project.load_document("main", "@chapter{One}").is_ok());
        assert!(matches!(
            project.load_document("main", "@bogus{x}"),
            Err(FolioError::UnknownTag(_))
        ));
    }
}
