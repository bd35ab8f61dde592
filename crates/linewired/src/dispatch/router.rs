//! Method-name routing for command dispatch.
//!
//! Lookup is by substring containment: an entry matches when its registered
//! name occurs anywhere in the requested method, and the first match in
//! registration order wins. `quit` is registered first by the engine, so any
//! method containing `quit` stops the engine before user handlers are
//! consulted.

use std::sync::Arc;

use tracing::debug;

use super::DISPATCH_TARGET;
use super::handler::MethodHandler;

/// Ordered method table.
#[derive(Default)]
pub struct MethodTable {
    entries: Vec<Entry>,
}

struct Entry {
    name: String,
    handler: Arc<dyn MethodHandler>,
}

impl MethodTable {
    /// Registers `handler` under `name`.
    ///
    /// Re-registering an existing name swaps the handler in place, keeping
    /// its position. Returns `true` when an entry was replaced.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn MethodHandler>) -> bool {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.name == name) {
            debug!(target: DISPATCH_TARGET, method = %name, "method handler replaced");
            entry.handler = handler;
            return true;
        }
        debug!(target: DISPATCH_TARGET, method = %name, "method handler registered");
        self.entries.push(Entry { name, handler });
        false
    }

    /// Finds the first entry whose name occurs in `method`.
    #[must_use]
    pub fn resolve(&self, method: &str) -> Option<(&str, Arc<dyn MethodHandler>)> {
        self.entries
            .iter()
            .find(|entry| method.contains(entry.name.as_str()))
            .map(|entry| (entry.name.as_str(), Arc::clone(&entry.handler)))
    }

    /// Registered names in lookup order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no methods are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
