//! CSS selector translation with a process-wide cache.
//!
//! Every query the pipeline runs is written as a CSS selector and compiled
//! into a [`scraper::Selector`] on first use. Compiled selectors are shared
//! between concurrent requests through [`translate`], which never compiles
//! the same selector twice.
//!
//! # Example
//!
//! ```rust
//! use folio_core::selector::translate;
//!
//! let first = translate("header h1 a.topic");
//! let second = translate("header h1 a.topic");
//! assert!(std::sync::Arc::ptr_eq(&first, &second));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use scraper::Selector;

static GLOBAL: LazyLock<SelectorCache> = LazyLock::new(SelectorCache::new);

/// Append-only map from selector text to its compiled form.
#[derive(Debug, Default)]
pub struct SelectorCache {
    compiled: RwLock<HashMap<String, Arc<Selector>>>,
}

impl SelectorCache {
    /// Creates an empty cache.
    ///
    /// The pipeline uses the global cache behind [`translate`]; separate
    /// instances are mostly useful in tests.
    pub fn new() -> Self {
        Self { compiled: RwLock::new(HashMap::new()) }
    }

    /// Returns the compiled form of `selector`, compiling it on first use.
    ///
    /// # Panics
    ///
    /// Panics if `selector` is not valid CSS. Selectors are constants of
    /// this crate, so a parse failure is a bug rather than a runtime
    /// condition.
    pub fn translate(&self, selector: &str) -> Arc<Selector> {
        if let Some(found) = self.compiled.read().unwrap_or_else(PoisonError::into_inner).get(selector) {
            return Arc::clone(found);
        }

        let mut compiled = self.compiled.write().unwrap_or_else(PoisonError::into_inner);
        // Another request may have compiled it between the two locks.
        let entry = compiled
            .entry(selector.to_string())
            .or_insert_with(|| Arc::new(compile(selector)));
        Arc::clone(entry)
    }

    /// Number of distinct selectors compiled so far.
    pub fn len(&self) -> usize {
        self.compiled.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn compile(selector: &str) -> Selector {
    tracing::trace!(selector, "compiling selector");
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid selector {selector:?}: {e}"))
}

/// Translates `selector` through the process-wide cache.
pub fn translate(selector: &str) -> Arc<Selector> {
    GLOBAL.translate(selector)
}
