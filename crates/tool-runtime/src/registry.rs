use crate::tool::{ToolDescriptor, ToolKind};
use indexmap::IndexMap;

/// Maps tool names to their descriptors.
///
/// Populated once at startup, then shared read-only (typically behind an
/// `Arc`) for the lifetime of the process. Iteration follows registration
/// order, so discovery output is stable.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
        }
    }

    /// Registry holding the three Selector tools.
    pub fn selector() -> Self {
        let mut registry = Self::new();
        for kind in ToolKind::ALL {
            // Names in ToolKind::ALL are distinct, so registration cannot collide.
            if let Err(e) = registry.register(kind.descriptor()) {
                tracing::error!(error = %e, "Skipping tool");
            }
        }
        registry
    }

    /// Register a tool. Returns error if name already registered.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        if self.tools.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateName(descriptor.name));
        }
        tracing::debug!(tool = %descriptor.name, "Registered tool");
        self.tools.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// All registered descriptors, in registration order.
    pub fn list(&self) -> Vec<&ToolDescriptor> {
        self.tools.values().collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool with name '{0}' is already registered")]
    DuplicateName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolKind::AskSelector.descriptor()).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.get("ask_selector").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolKind::AskSelector.descriptor()).unwrap();
        assert!(registry.register(ToolKind::AskSelector.descriptor()).is_err());
    }

    #[test]
    fn test_selector_registry_order() {
        let registry = ToolRegistry::selector();
        let names: Vec<&str> = registry.list().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["ask_selector", "query_selector", "get_selector_phrases"]);
        assert_eq!(
            registry.get("query_selector").map(|d| d.kind),
            Some(ToolKind::QuerySelector)
        );
    }
}
