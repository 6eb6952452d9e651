//! Pairing of collectors with renderers.
//!
//! Rendering lives outside this crate; the types here only fix the seam.
//! A handler owns one collector and one renderer, and a registry caches
//! handlers by name so each is instantiated once per documentation run and
//! reused for every instruction that asks for it.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::collector::Collector;
use crate::tree::DocNode;

/// Renders one reconstructed documentation tree to output markup.
pub trait Renderer: Send + Sync {
    /// Render `node` with the given rendering options.
    fn render(&self, node: &DocNode, options: &Map<String, Value>) -> String;
}

/// A pairing of a collector and a renderer.
pub struct Handler {
    /// Collects documentation trees from the worker.
    pub collector: Box<dyn Collector>,
    /// Turns collected trees into output markup.
    pub renderer: Box<dyn Renderer>,
}

impl Handler {
    /// Pair a collector with a renderer.
    pub fn new(collector: Box<dyn Collector>, renderer: Box<dyn Renderer>) -> Self {
        Self {
            collector,
            renderer,
        }
    }
}

/// Cache of handlers, keyed by name, for one documentation run.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, handler: Handler) {
        self.handlers.insert(name.into(), handler);
    }

    /// Look up a cached handler.
    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }

    /// Number of cached handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Tear down every cached handler's collector and clear the cache.
    pub fn teardown(&mut self) {
        for handler in self.handlers.values() {
            handler.collector.teardown();
        }
        self.handlers.clear();
    }
}
