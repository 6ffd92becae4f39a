//! Named, ordered publish/subscribe channels
//!
//! A [`SignalRegistry`] maps names to [`Signal`]s. Receivers connect to a
//! signal at a unique integer order and run in ascending order when the
//! signal is emitted, synchronously, on the emitting thread.

use crate::error::{FolioError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// A receiver callback. Receivers get mutable access to the emitted arguments
/// so that pipeline stages can hand their work to the next stage.
pub type ReceiverFn<A, R> = dyn Fn(&mut A) -> Result<R> + Send + Sync;

enum Receiver<A, R> {
    Owned(Arc<ReceiverFn<A, R>>),
    Borrowed(Weak<ReceiverFn<A, R>>),
}

impl<A, R> Receiver<A, R> {
    fn upgrade(&self) -> Option<Arc<ReceiverFn<A, R>>> {
        match self {
            Receiver::Owned(f) => Some(Arc::clone(f)),
            Receiver::Borrowed(f) => f.upgrade(),
        }
    }
}

/// A notification emitter with receivers keyed by their run order
pub struct Signal<A, R = ()> {
    name: String,
    receivers: Mutex<BTreeMap<i32, Receiver<A, R>>>,
}

impl<A, R> Signal<A, R> {
    pub fn new(name: impl Into<String>) -> Self {
        Signal {
            name: name.into(),
            receivers: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Connect a receiver that this signal owns.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateRegistration` if another receiver already runs at
    /// `order`.
    pub fn connect<F>(&self, receiver: F, order: i32) -> Result<()>
    where
        F: Fn(&mut A) -> Result<R> + Send + Sync + 'static,
    {
        self.insert(Receiver::Owned(Arc::new(receiver)), order)
    }

    /// Connect a receiver without taking ownership of it.
    ///
    /// The receiver is skipped once every `Arc` to it has been dropped, so its
    /// lifetime stays scoped to whichever component registered it.
    pub fn connect_weak(&self, receiver: &Arc<ReceiverFn<A, R>>, order: i32) -> Result<()> {
        self.insert(Receiver::Borrowed(Arc::downgrade(receiver)), order)
    }

    fn insert(&self, receiver: Receiver<A, R>, order: i32) -> Result<()> {
        let mut receivers = self.receivers.lock().unwrap_or_else(PoisonError::into_inner);
        if receivers.contains_key(&order) {
            return Err(FolioError::DuplicateRegistration {
                signal: self.name.clone(),
                order,
            });
        }
        receivers.insert(order, receiver);
        Ok(())
    }

    /// Remove the receiver at `order`. Returns whether one was connected.
    pub fn disconnect(&self, order: i32) -> bool {
        self.receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&order)
            .is_some()
    }

    /// Remove every receiver
    pub fn reset(&self) {
        self.receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Orders of the connected receivers, ascending
    pub fn orders(&self) -> Vec<i32> {
        self.receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    /// Run every receiver in ascending order with the same arguments.
    ///
    /// Returns one entry per receiver; receivers whose target has been
    /// dropped yield `None`. The first receiver error stops the emit and is
    /// returned as is.
    pub fn emit(&self, args: &mut A) -> Result<Vec<Option<R>>> {
        // Snapshot so receivers may connect or disconnect while running
        let receivers: Vec<(i32, Option<Arc<ReceiverFn<A, R>>>)> = self
            .receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(order, r)| (*order, r.upgrade()))
            .collect();

        let mut results = Vec::with_capacity(receivers.len());
        for (order, receiver) in receivers {
            match receiver {
                Some(f) => results.push(Some(f(args)?)),
                None => {
                    tracing::trace!(signal = %self.name, order, "skipping dropped receiver");
                    results.push(None);
                }
            }
        }
        Ok(results)
    }
}

impl<A, R> std::fmt::Debug for Signal<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("orders", &self.orders())
            .finish()
    }
}

/// A namespace of signals sharing one argument and result type
pub struct SignalRegistry<A, R = ()> {
    signals: Mutex<HashMap<String, Arc<Signal<A, R>>>>,
}

impl<A, R> SignalRegistry<A, R> {
    pub fn new() -> Self {
        SignalRegistry {
            signals: Mutex::new(HashMap::new()),
        }
    }

    /// Return the signal with the given name, creating it on first use
    pub fn signal(&self, name: &str) -> Arc<Signal<A, R>> {
        let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            signals
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Signal::new(name))),
        )
    }

    /// Names of the signals created so far, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl<A, R> Default for SignalRegistry<A, R> {
    fn default() -> Self {
        Self::new()
    }
}
