//! Label collection, registration and lookup for one project

use super::label::{Label, LabelKey, LabelVariant};
use super::pipeline::{standard_pipeline, RegistrationPass};
use crate::domain::project::{DocumentContext, DocumentTree};
use crate::domain::signals::Signal;
use crate::error::{FolioError, Result};
use crate::infrastructure::LabelResets;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

/// Default bounded wait for the registration lock
pub const DEFAULT_REGISTRATION_TIMEOUT: Duration = Duration::from_millis(50);

/// Passes to run before giving up on labels that change under registration
const MAX_REGISTRATION_ATTEMPTS: usize = 3;

#[derive(Debug, Default)]
struct LabelStore {
    /// Registered labels in project document order
    registered: Vec<Label>,
    /// Labels collected since the last registration, by doc_id
    collected: HashMap<String, Vec<Label>>,
    /// Something changed since the last registration
    stale: bool,
    /// Document order used by the last registration
    registered_order: Vec<String>,
    /// Bumped by every change to the collected or registered labels
    revision: u64,
}

impl LabelStore {
    fn is_current(&self, doc_ids: &[String]) -> bool {
        !self.stale && self.registered_order == doc_ids
    }

    fn touch(&mut self) {
        self.stale = true;
        self.revision += 1;
    }
}

/// Owns every label of a project.
///
/// Labels are collected as documents are processed and registered lazily:
/// queries run the registration pipeline first whenever labels changed or
/// the project's document order moved.
pub struct LabelManager {
    store: RwLock<LabelStore>,
    registration: Mutex<()>,
    timeout: Duration,
    pipeline: Arc<Signal<RegistrationPass>>,
    tree: Arc<dyn DocumentTree>,
    label_sep: String,
    resets: LabelResets,
}

impl LabelManager {
    /// Create a manager for the project of `root`, with the standard
    /// registration pipeline
    pub fn new(root: &DocumentContext) -> Result<Self> {
        Ok(Self::with_pipeline(root, Arc::new(standard_pipeline()?)))
    }

    /// Create a manager that registers through `pipeline`
    pub fn with_pipeline(root: &DocumentContext, pipeline: Arc<Signal<RegistrationPass>>) -> Self {
        LabelManager {
            store: RwLock::new(LabelStore::default()),
            registration: Mutex::new(()),
            timeout: DEFAULT_REGISTRATION_TIMEOUT,
            pipeline,
            tree: root.tree(),
            label_sep: root.label_sep.clone(),
            resets: root.label_resets.clone(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The registration signal, for connecting extra stages
    pub fn pipeline(&self) -> Arc<Signal<RegistrationPass>> {
        Arc::clone(&self.pipeline)
    }

    /// Collect a label for the next registration.
    ///
    /// `id` may be qualified with a doc_id (`"ch1::fig:a"`); otherwise the
    /// label belongs to `context.doc_id`. Adding a label that was already
    /// collected since the last registration updates that label instead of
    /// creating a second one. A registered label with the same id keeps its
    /// kind and numbering until the next registration replaces it. Collisions
    /// with labels of other documents are reported at registration.
    pub fn add_label(
        &self,
        id: &str,
        kind: &[&str],
        variant: LabelVariant,
        context: &DocumentContext,
    ) -> Result<Label> {
        let (doc_id, label_id) = match self.split_id(id) {
            (Some(doc_id), label_id) => (doc_id.to_string(), label_id),
            (None, label_id) => (context.doc_id.clone(), label_id),
        };
        let kind: Vec<String> = kind.iter().map(|k| k.to_string()).collect();

        let mut store = self.write_store();
        store.touch();

        let collected = store.collected.entry(doc_id.clone()).or_default();
        if let Some(existing) = collected.iter_mut().find(|l| l.id == label_id) {
            existing.kind = kind;
            existing.variant = variant;
            return Ok(existing.clone());
        }

        // Registered labels keep their numbering until the next pass replaces them
        let label = Label::new(&doc_id, label_id, kind, variant);
        tracing::trace!(doc_id = %doc_id, id = label_id, "collected label");
        collected.push(label.clone());
        Ok(label)
    }

    /// Begin a new update cycle for `doc_id`.
    ///
    /// Pending labels of the document are dropped, and on the next
    /// registration the labels collected from here on replace all of its
    /// registered labels, even if none are collected.
    pub fn start_collection(&self, doc_id: &str) {
        let mut store = self.write_store();
        store.collected.insert(doc_id.to_string(), Vec::new());
        store.touch();
    }

    /// Collect a heading, figure, table or other titled label
    pub fn add_content_label(
        &self,
        id: &str,
        kind: &[&str],
        title: &str,
        context: &DocumentContext,
    ) -> Result<Label> {
        self.add_label(id, kind, LabelVariant::content(title), context)
    }

    /// Collect the label of the context's document
    pub fn add_document_label(
        &self,
        id: &str,
        kind: &[&str],
        title: &str,
        context: &DocumentContext,
    ) -> Result<Label> {
        self.add_label(id, kind, LabelVariant::document(title), context)
    }

    /// Look up a label by qualified or bare id.
    ///
    /// A bare id resolves to the first label with that id in project
    /// document order.
    pub fn get_label(&self, id: &str) -> Result<Label> {
        self.register_labels()?;
        self.find(id)
    }

    pub fn get_labels_by_id(&self, ids: &[&str]) -> Result<Vec<Label>> {
        self.register_labels()?;
        ids.iter().map(|id| self.find(id)).collect()
    }

    /// Registered labels, optionally restricted to one document and to labels
    /// having any of `kinds`, in registration order
    pub fn get_labels_by_kind(
        &self,
        doc_id: Option<&str>,
        kinds: Option<&[&str]>,
    ) -> Result<Vec<Label>> {
        self.register_labels()?;
        let store = self.read_store();
        Ok(store
            .registered
            .iter()
            .filter(|l| doc_id.map_or(true, |d| l.doc_id == d))
            .filter(|l| kinds.map_or(true, |ks| ks.iter().any(|k| l.has_kind(k))))
            .cloned()
            .collect())
    }

    /// Every registered label
    pub fn labels(&self) -> Result<Vec<Label>> {
        self.get_labels_by_kind(None, None)
    }

    /// The current state of a label, or `None` if it was purged
    pub fn resolve(&self, key: &LabelKey) -> Option<Label> {
        self.read_store()
            .registered
            .iter()
            .find(|l| l.doc_id == key.doc_id && l.id == key.id)
            .cloned()
    }

    /// Forget the labels of `doc_ids`, or every label when `None`
    pub fn reset(&self, doc_ids: Option<&[&str]>) {
        let mut store = self.write_store();
        match doc_ids {
            None => {
                store.registered.clear();
                store.collected.clear();
            }
            Some(doc_ids) => {
                store
                    .registered
                    .retain(|l| !doc_ids.contains(&l.doc_id.as_str()));
                store
                    .collected
                    .retain(|doc_id, _| !doc_ids.contains(&doc_id.as_str()));
            }
        }
        store.touch();
        tracing::debug!(?doc_ids, "reset labels");
    }

    /// Run the registration pipeline if labels or document order changed.
    ///
    /// The pipeline runs on a copy of the labels, so other callers keep
    /// reading the last completed pass meanwhile. If another registration
    /// holds the lock past the timeout, this logs a warning and returns
    /// without registering; queries then see those stale labels.
    pub fn register_labels(&self) -> Result<()> {
        if self.read_store().is_current(&self.tree.doc_ids()) {
            return Ok(());
        }

        let Some(_guard) = self.lock_registration() else {
            tracing::warn!(
                timeout_ms = self.timeout.as_millis() as u64,
                "timed out waiting for label registration; serving stale labels"
            );
            return Ok(());
        };

        for _ in 0..MAX_REGISTRATION_ATTEMPTS {
            let doc_ids = self.tree.doc_ids();
            let (mut pass, revision) = {
                let store = self.read_store();
                if store.is_current(&doc_ids) {
                    return Ok(());
                }
                let pass = RegistrationPass {
                    registered: store.registered.clone(),
                    collected: store.collected.clone(),
                    doc_ids: doc_ids.clone(),
                    resets: self.resets.clone(),
                };
                (pass, store.revision)
            };

            self.pipeline.emit(&mut pass)?;

            let mut store = self.write_store();
            if store.revision != revision {
                tracing::debug!("labels changed during registration; registering again");
                continue;
            }
            store.registered = pass.registered;
            store.collected = pass.collected;
            store.stale = false;
            store.registered_order = doc_ids;
            tracing::debug!(
                labels = store.registered.len(),
                documents = store.registered_order.len(),
                "registered labels"
            );
            return Ok(());
        }

        tracing::warn!(
            attempts = MAX_REGISTRATION_ATTEMPTS,
            "labels kept changing during registration; serving stale labels"
        );
        Ok(())
    }

    fn find(&self, id: &str) -> Result<Label> {
        let store = self.read_store();
        let found = match self.split_id(id) {
            (Some(doc_id), label_id) => store
                .registered
                .iter()
                .find(|l| l.doc_id == doc_id && l.id == label_id),
            (None, label_id) => store.registered.iter().find(|l| l.id == label_id),
        };
        found
            .cloned()
            .ok_or_else(|| FolioError::LabelNotFound(id.to_string()))
    }

    fn split_id<'a>(&self, id: &'a str) -> (Option<&'a str>, &'a str) {
        match id.split_once(self.label_sep.as_str()) {
            Some((doc_id, label_id)) => (Some(doc_id), label_id),
            None => (None, id),
        }
    }

    fn lock_registration(&self) -> Option<MutexGuard<'_, ()>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match self.registration.try_lock() {
                Ok(guard) => return Some(guard),
                Err(TryLockError::Poisoned(poisoned)) => return Some(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return None;
                    }
                    thread::sleep(Duration::from_millis(1));
                }
            }
        }
    }

    fn read_store(&self) -> std::sync::RwLockReadGuard<'_, LabelStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> std::sync::RwLockWriteGuard<'_, LabelStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for LabelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.read_store();
        f.debug_struct("LabelManager")
            .field("registered", &store.registered.len())
            .field("stale", &store.stale)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
