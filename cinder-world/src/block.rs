//! Blocks and block handlers.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use fastnbt::Value;

/// Arbitrary tagged data attached to a block.
pub type Compound = BTreeMap<String, Value>;

/// Behavior attached to a block (chests, signs, spawners, ...).
pub trait BlockHandler: Send + Sync {
    /// Namespaced identifier, e.g. `minecraft:chest`.
    fn namespace_id(&self) -> &str;
}

/// A handler that is nothing more than its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedHandler {
    id: String,
}

impl NamedHandler {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl BlockHandler for NamedHandler {
    fn namespace_id(&self) -> &str {
        &self.id
    }
}

/// One block: its type name, state properties, and optional handler and
/// custom data.
#[derive(Clone)]
pub struct Block {
    name: Cow<'static, str>,
    properties: BTreeMap<String, String>,
    handler: Option<Arc<dyn BlockHandler>>,
    data: Option<Compound>,
}

impl Block {
    pub const AIR: Block = Block::from_static("minecraft:air");

    pub const fn from_static(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            properties: BTreeMap::new(),
            handler: None,
            data: None,
        }
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            properties: BTreeMap::new(),
            handler: None,
            data: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn handler(&self) -> Option<&Arc<dyn BlockHandler>> {
        self.handler.as_ref()
    }

    pub fn data(&self) -> Option<&Compound> {
        self.data.as_ref()
    }

    pub fn is_air(&self) -> bool {
        matches!(self.name(), "minecraft:air" | "minecraft:cave_air" | "minecraft:void_air")
    }

    /// Same block with the given properties merged over the current ones.
    pub fn with_properties(mut self, properties: &BTreeMap<String, String>) -> Self {
        self.properties
            .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn BlockHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn with_data(mut self, data: Compound) -> Self {
        self.data = Some(data);
        self
    }
}

impl Default for Block {
    fn default() -> Self {
        Block::AIR
    }
}

// Handlers compare by identifier.
impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.properties == other.properties
            && self.handler.as_ref().map(|h| h.namespace_id())
                == other.handler.as_ref().map(|h| h.namespace_id())
            && self.data == other.data
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Block");
        s.field("name", &self.name);
        if !self.properties.is_empty() {
            s.field("properties", &self.properties);
        }
        if let Some(handler) = &self.handler {
            s.field("handler", &handler.namespace_id());
        }
        if let Some(data) = &self.data {
            s.field("data", data);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_properties_merges() {
        let block = Block::new("minecraft:oak_stairs").with_property("facing", "north");
        let mut extra = BTreeMap::new();
        extra.insert("half".to_string(), "top".to_string());
        extra.insert("facing".to_string(), "south".to_string());
        let block = block.with_properties(&extra);
        assert_eq!(block.property("facing"), Some("south"));
        assert_eq!(block.property("half"), Some("top"));
    }

    #[test]
    fn test_handlers_compare_by_id() {
        let a = Block::new("minecraft:chest").with_handler(Arc::new(NamedHandler::new("minecraft:chest")));
        let b = Block::new("minecraft:chest").with_handler(Arc::new(NamedHandler::new("minecraft:chest")));
        let c = Block::new("minecraft:chest");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_default_is_air() {
        assert!(Block::default().is_air());
        assert_eq!(Block::default(), Block::new("minecraft:air"));
    }
}
