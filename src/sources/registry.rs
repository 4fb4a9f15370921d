//! Registry for the adapters a run can use.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Source, SourceError};

bitflags::bitflags! {
    /// Capabilities that an adapter can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const WORK_SEARCH = 1 << 0;
        const PAPER_LOOKUP = 1 << 1;
        const CHART = 1 << 2;
        const SYNTHESIS = 1 << 3;
        const PAPER_SEARCH = 1 << 4;
    }
}

impl SourceCapabilities {
    /// Short labels for display
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.contains(Self::WORK_SEARCH) {
            labels.push("work search");
        }
        if self.contains(Self::PAPER_LOOKUP) {
            labels.push("paper lookup");
        }
        if self.contains(Self::PAPER_SEARCH) {
            labels.push("paper search");
        }
        if self.contains(Self::CHART) {
            labels.push("chart");
        }
        if self.contains(Self::SYNTHESIS) {
            labels.push("synthesis");
        }
        labels
    }
}

/// Registry of adapters, kept in registration order
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn Source>>,
    index: HashMap<String, usize>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any previous one with the same id
    pub fn register(&mut self, source: Arc<dyn Source>) {
        let id = source.id().to_string();
        match self.index.get(&id) {
            Some(&slot) => self.sources[slot] = source,
            None => {
                self.index.insert(id, self.sources.len());
                self.sources.push(source);
            }
        }
    }

    /// Get an adapter by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Source>> {
        self.index.get(id).map(|&slot| &self.sources[slot])
    }

    /// Get an adapter by ID, returning an error if not found
    pub fn get_required(&self, id: &str) -> Result<&Arc<dyn Source>, SourceError> {
        self.get(id)
            .ok_or_else(|| SourceError::NotFound(format!("Source '{}' not found", id)))
    }

    /// All registered adapters
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.iter()
    }

    /// All adapter IDs
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.id())
    }

    /// Adapters that support a specific capability
    pub fn with_capability(&self, capability: SourceCapabilities) -> Vec<&Arc<dyn Source>> {
        self.all()
            .filter(|s| s.capabilities().contains(capability))
            .collect()
    }

    /// Check if an adapter exists
    pub fn has(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
