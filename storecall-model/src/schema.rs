use crate::EntityTransform;
use std::fmt;
use std::sync::Arc;

/// Key used to index entities when a schema names none.
pub const DEFAULT_KEY: &str = "id";

/// Describes how a response is keyed into an entity collection.
#[derive(Clone)]
pub struct EntitySchema {
    /// Entity collection name, the top-level key under `entities`.
    pub name: String,
    /// Field holding each entity's id. Defaults to [`DEFAULT_KEY`].
    pub key: Option<String>,
    transform: Option<(String, Arc<dyn EntityTransform>)>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: None,
            transform: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attaches a named transform; the name is only used in error reports.
    #[must_use]
    pub fn with_transform(
        mut self,
        name: impl Into<String>,
        transform: Arc<dyn EntityTransform>,
    ) -> Self {
        self.transform = Some((name.into(), transform));
        self
    }

    /// The effective id key.
    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(DEFAULT_KEY)
    }

    pub fn transform(&self) -> Option<(&str, &dyn EntityTransform)> {
        self.transform
            .as_ref()
            .map(|(name, t)| (name.as_str(), t.as_ref()))
    }
}

impl fmt::Debug for EntitySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySchema")
            .field("name", &self.name)
            .field("key", &self.key())
            .field("transform", &self.transform.as_ref().map(|(name, _)| name))
            .finish()
    }
}
