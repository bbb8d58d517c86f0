//! Registry of collectors, rendered in registration order.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{Result, TallyError};
use crate::metrics::{Collector, CONTENT_TYPE};

#[derive(Default)]
pub struct Registry {
    collectors: RwLock<Vec<Arc<dyn Collector>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collector. Fails if any of its family names is already taken.
    pub fn register(&self, collector: Arc<dyn Collector>) -> Result<()> {
        let mut guard = self.collectors.write().unwrap_or_else(PoisonError::into_inner);

        let taken: HashSet<String> = guard.iter().flat_map(|c| c.names()).collect();
        let names = collector.names();
        if let Some(dup) = names.iter().find(|n| taken.contains(*n)) {
            return Err(TallyError::DuplicateMetric(dup.clone()));
        }

        tracing::debug!(families = ?names, "collector registered");
        guard.push(collector);
        Ok(())
    }

    /// Render every family. Empty registry renders an empty body.
    pub fn metrics(&self) -> String {
        let collectors: Vec<Arc<dyn Collector>> = self
            .collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut blocks = Vec::new();
        for c in &collectors {
            c.render(&mut blocks);
        }
        blocks.join("\n")
    }

    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    /// `(content type, body)` pair for a scrape response.
    pub fn render(&self) -> (&'static str, String) {
        (self.content_type(), self.metrics())
    }
}
