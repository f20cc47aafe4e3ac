//! Extension seam for plugin-contributed form sections.
//!
//! Item detail responses carry extra configuration sections supplied by
//! installed extensions. The registry only collects and forwards; it never
//! interprets section content.

use crate::entities::Item;
use crate::ids::EventId;
use serde::Serialize;
use std::sync::Arc;

/// One extension-owned block on the item detail page.
#[derive(Debug, Clone, Serialize)]
pub struct FormSection {
    /// Stable identifier, unique per provider.
    pub id: String,
    /// Heading shown above the section.
    pub title: String,
    /// Provider-defined body, passed through untouched.
    pub content: serde_json::Value,
}

/// Contributes sections for an item.
pub trait SectionProvider: Send + Sync {
    /// Sections to show for the given item, in display order.
    fn sections(&self, event: EventId, item: &Item) -> Vec<FormSection>;
}

/// Registry of installed section providers.
#[derive(Default, Clone)]
pub struct ExtensionRegistry {
    providers: Vec<Arc<dyn SectionProvider>>,
}

impl ExtensionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider. Providers contribute in registration order.
    pub fn register(&mut self, provider: Arc<dyn SectionProvider>) {
        self.providers.push(provider);
    }

    /// Collects every provider's sections for the item.
    #[must_use]
    pub fn sections_for(&self, event: EventId, item: &Item) -> Vec<FormSection> {
        self.providers
            .iter()
            .flat_map(|provider| provider.sections(event, item))
            .collect()
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("providers", &self.providers.len())
            .finish()
    }
}
