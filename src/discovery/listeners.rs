//! Global listener discovery

use std::any::TypeId;
use std::sync::Arc;

use crate::listener::{ListenerSet, RegisteredListener, TestListener};

type ListenerFactory = Arc<dyn Fn() -> RegisteredListener + Send + Sync>;

/// Listener types registered at startup, instantiated once per run
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    factories: Vec<(TypeId, ListenerFactory)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<L: TestListener + Default>(&mut self) -> &mut Self {
        self.register_with(L::default)
    }

    pub fn register_with<L, F>(&mut self, factory: F) -> &mut Self
    where
        L: TestListener,
        F: Fn() -> L + Send + Sync + 'static,
    {
        let id = TypeId::of::<L>();
        if !self.factories.iter().any(|(existing, _)| *existing == id) {
            self.factories
                .push((id, Arc::new(move || RegisteredListener::new(factory()))));
        }
        self
    }

    /// Fresh instances of every registered listener type
    pub fn discover(&self) -> ListenerSet {
        let mut set = ListenerSet::new();
        for (_, factory) in &self.factories {
            set.attach(factory());
        }
        set
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Console;
    impl TestListener for Console {}

    #[derive(Default)]
    struct Junit;
    impl TestListener for Junit {}

    #[test]
    fn test_discover_dedups_by_type() {
        let mut registry = ListenerRegistry::new();
        registry.register::<Console>().register::<Junit>().register::<Console>();

        let set = registry.discover();
        assert_eq!(registry.len(), 2);
        assert_eq!(set.type_names(), vec!["Console", "Junit"]);
    }
}
