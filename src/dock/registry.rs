use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::DockError;
use crate::common::collections::{HashMap, HashSet};

/// Logical identifier of a content payload, stable across sessions.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self { ContentId(id.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self { ContentId(s.to_owned()) }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "ContentId({})", self.0) }
}

/// Opaque payload hosted inside a tab.
///
/// The layout core never looks inside; it only moves ownership between
/// panel groups and hands the payload back to the host for rendering.
pub trait Content {
    fn title(&self) -> &str;

    /// Called once when the payload leaves the system for good.
    fn dispose(&mut self) {}
}

pub type ContentFactory = Box<dyn Fn() -> Box<dyn Content>>;

struct RegistryEntry {
    title: String,
    singleton: bool,
    factory: ContentFactory,
}

/// Registry of creatable content, and the single source of truth for which
/// content ids currently have a live instance in some panel.
///
/// Payloads released by `close_tab` are pooled here so a later request for
/// the same id reuses the instance instead of rebuilding it.
#[derive(Default)]
pub struct ContentRegistry {
    entries: HashMap<ContentId, RegistryEntry>,
    live: HashSet<ContentId>,
    pool: HashMap<ContentId, Box<dyn Content>>,
}

impl ContentRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn register(
        &mut self,
        content_id: impl Into<ContentId>,
        factory: ContentFactory,
        title: impl Into<String>,
        singleton: bool,
    ) {
        let content_id = content_id.into();
        debug!(%content_id, singleton, "registering content");
        self.entries
            .insert(content_id, RegistryEntry { title: title.into(), singleton, factory });
    }

    pub fn unregister(&mut self, content_id: &ContentId) {
        self.entries.remove(content_id);
        if let Some(mut payload) = self.pool.remove(content_id) {
            payload.dispose();
        }
    }

    pub fn contains(&self, content_id: &ContentId) -> bool {
        self.entries.contains_key(content_id)
    }

    pub fn title(&self, content_id: &ContentId) -> Option<&str> {
        self.entries.get(content_id).map(|e| e.title.as_str())
    }

    pub fn is_singleton(&self, content_id: &ContentId) -> bool {
        self.entries.get(content_id).is_some_and(|e| e.singleton)
    }

    pub fn is_live(&self, content_id: &ContentId) -> bool { self.live.contains(content_id) }

    /// Takes a payload for `content_id`, reusing a pooled instance when one
    /// exists and invoking the factory otherwise. Marks the id live.
    pub fn acquire(&mut self, content_id: &ContentId) -> Result<Box<dyn Content>, DockError> {
        let entry = self
            .entries
            .get(content_id)
            .ok_or_else(|| DockError::UnknownContentId(content_id.clone()))?;
        let payload = match self.pool.remove(content_id) {
            Some(pooled) => pooled,
            None => (entry.factory)(),
        };
        self.live.insert(content_id.clone());
        Ok(payload)
    }

    /// Returns a payload to the registry after its tab closed. Singleton
    /// payloads are pooled for reuse; everything else is disposed.
    pub fn release(&mut self, content_id: &ContentId, mut payload: Box<dyn Content>) {
        self.live.remove(content_id);
        if self.is_singleton(content_id) {
            self.pool.insert(content_id.clone(), payload);
        } else {
            payload.dispose();
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    pub struct TestContent {
        pub title: String,
        pub disposed: Rc<Cell<bool>>,
    }

    impl Content for TestContent {
        fn title(&self) -> &str { &self.title }

        fn dispose(&mut self) { self.disposed.set(true); }
    }

    pub fn register(registry: &mut ContentRegistry, id: &str, singleton: bool) {
        let title = id.to_owned();
        registry.register(
            id,
            Box::new(move || {
                Box::new(TestContent {
                    title: title.clone(),
                    disposed: Rc::new(Cell::new(false)),
                })
            }),
            id,
            singleton,
        );
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::test_support::*;
    use super::*;

    #[test]
    fn acquire_unknown_id_fails() {
        let mut registry = ContentRegistry::new();
        let err = registry.acquire(&"ghost".into()).map(|_| ()).unwrap_err();
        assert_eq!(DockError::UnknownContentId("ghost".into()), err);
    }

    #[test]
    fn acquire_marks_live_and_release_clears() {
        let mut registry = ContentRegistry::new();
        register(&mut registry, "logs", false);
        let id: ContentId = "logs".into();

        let payload = registry.acquire(&id).unwrap();
        assert!(registry.is_live(&id));
        registry.release(&id, payload);
        assert!(!registry.is_live(&id));
    }

    #[test]
    fn singleton_release_pools_the_instance() {
        let mut registry = ContentRegistry::new();
        let disposed = Rc::new(Cell::new(false));
        let outer = disposed.clone();
        registry.register(
            "outline",
            Box::new(move || {
                Box::new(TestContent {
                    title: "Outline".into(),
                    disposed: outer.clone(),
                })
            }),
            "Outline",
            true,
        );
        let id: ContentId = "outline".into();

        let payload = registry.acquire(&id).unwrap();
        registry.release(&id, payload);
        assert!(!disposed.get(), "singleton must be pooled, not disposed");

        // The pooled instance comes back instead of a fresh factory call.
        let again = registry.acquire(&id).unwrap();
        assert_eq!("Outline", again.title());
    }

    #[test]
    fn non_singleton_release_disposes() {
        let mut registry = ContentRegistry::new();
        let disposed = Rc::new(Cell::new(false));
        let outer = disposed.clone();
        registry.register(
            "scratch",
            Box::new(move || {
                Box::new(TestContent {
                    title: "Scratch".into(),
                    disposed: outer.clone(),
                })
            }),
            "Scratch",
            false,
        );
        let id: ContentId = "scratch".into();
        let payload = registry.acquire(&id).unwrap();
        registry.release(&id, payload);
        assert!(disposed.get());
    }

    #[test]
    fn unregister_disposes_pooled_payload() {
        let mut registry = ContentRegistry::new();
        let disposed = Rc::new(Cell::new(false));
        let outer = disposed.clone();
        registry.register(
            "outline",
            Box::new(move || {
                Box::new(TestContent {
                    title: "Outline".into(),
                    disposed: outer.clone(),
                })
            }),
            "Outline",
            true,
        );
        let id: ContentId = "outline".into();
        let payload = registry.acquire(&id).unwrap();
        registry.release(&id, payload);

        registry.unregister(&id);
        assert!(!registry.contains(&id));
        assert!(disposed.get());
    }
}
