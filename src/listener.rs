//! Test listeners
//!
//! Listeners are notified by a task at fixed points of its lifecycle. A class
//! carries a `ListenerSet` holding at most one listener per concrete type.

use async_trait::async_trait;
use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::models::{TestResult, TestStatus};

/// Receives notifications about test execution events
#[async_trait]
pub trait TestListener: Send + Sync + 'static {
    /// Called before the before-method hooks of an enabled test run
    async fn on_test_start(&self, _result: &TestResult) {}

    /// Called when a test finished without raising an error
    async fn on_test_success(&self, _result: &TestResult) {}

    /// Called when a test failed on an assertion or an unexpected error
    async fn on_test_failure(&self, _result: &TestResult) {}

    /// Called when a test was skipped
    async fn on_test_skipped(&self, _result: &TestResult) {}
}

/// A listener instance tagged with its concrete type
#[derive(Clone)]
pub struct RegisteredListener {
    type_id: TypeId,
    type_name: &'static str,
    listener: Arc<dyn TestListener>,
}

impl RegisteredListener {
    pub fn new<L: TestListener>(listener: L) -> Self {
        Self::from_arc(Arc::new(listener))
    }

    pub fn from_arc<L: TestListener>(listener: Arc<L>) -> Self {
        Self {
            type_id: TypeId::of::<L>(),
            type_name: type_name::<L>(),
            listener,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Short type name, without the module path
    pub fn type_name(&self) -> &'static str {
        self.type_name
            .rsplit("::")
            .next()
            .unwrap_or(self.type_name)
    }

    pub fn listener(&self) -> &Arc<dyn TestListener> {
        &self.listener
    }
}

impl fmt::Debug for RegisteredListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredListener")
            .field("type", &self.type_name)
            .finish()
    }
}

/// Ordered listeners, deduplicated by runtime type
#[derive(Clone, Debug, Default)]
pub struct ListenerSet {
    entries: Vec<RegisteredListener>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener unless one of the same type is already attached.
    /// Returns whether it was added.
    pub fn attach(&mut self, entry: RegisteredListener) -> bool {
        if self.entries.iter().any(|e| e.type_id == entry.type_id) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn attach_listener<L: TestListener>(&mut self, listener: L) -> bool {
        self.attach(RegisteredListener::new(listener))
    }

    /// Attach every listener of `other` whose type is not yet present
    pub fn merge(&mut self, other: &ListenerSet) -> usize {
        other
            .entries
            .iter()
            .filter(|entry| self.attach((*entry).clone()))
            .count()
    }

    pub fn contains<L: TestListener>(&self) -> bool {
        let wanted = TypeId::of::<L>();
        self.entries.iter().any(|e| e.type_id == wanted)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredListener> {
        self.entries.iter()
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.type_name()).collect()
    }

    pub async fn notify_start(&self, result: &TestResult) {
        for entry in &self.entries {
            entry.listener.on_test_start(result).await;
        }
    }

    /// Send each listener the one notification matching the final status
    pub async fn notify_outcome(&self, result: &TestResult) {
        for entry in &self.entries {
            match result.status() {
                TestStatus::Success => entry.listener.on_test_success(result).await,
                TestStatus::Failure => entry.listener.on_test_failure(result).await,
                TestStatus::Skipped => entry.listener.on_test_skipped(result).await,
                TestStatus::Created => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ListenerA;
    #[derive(Default)]
    struct ListenerB;
    #[derive(Default)]
    struct ListenerC;

    impl TestListener for ListenerA {}
    impl TestListener for ListenerB {}
    impl TestListener for ListenerC {}

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TestListener for Recording {
        async fn on_test_start(&self, result: &TestResult) {
            self.events.lock().unwrap().push(format!("start:{}", result.method_name));
        }
        async fn on_test_success(&self, result: &TestResult) {
            self.events.lock().unwrap().push(format!("success:{}", result.method_name));
        }
        async fn on_test_failure(&self, result: &TestResult) {
            self.events.lock().unwrap().push(format!("failure:{}", result.method_name));
        }
        async fn on_test_skipped(&self, result: &TestResult) {
            self.events.lock().unwrap().push(format!("skipped:{}", result.method_name));
        }
    }

    #[test]
    fn test_dedup_by_type_not_identity() {
        let mut set = ListenerSet::new();
        assert!(set.attach_listener(ListenerA));
        assert!(set.attach_listener(ListenerB));

        let mut second = ListenerSet::new();
        second.attach_listener(ListenerA);
        second.attach_listener(ListenerC);

        assert_eq!(set.merge(&second), 1);
        assert_eq!(set.len(), 3);
        assert_eq!(set.type_names(), vec!["ListenerA", "ListenerB", "ListenerC"]);
        assert!(set.contains::<ListenerC>());
    }

    #[test]
    fn test_attach_same_type_twice() {
        let mut set = ListenerSet::new();
        assert!(set.attach_listener(ListenerA));
        assert!(!set.attach_listener(ListenerA));
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_notify_outcome_matches_status() {
        let recording = Arc::new(Recording::default());
        let mut set = ListenerSet::new();
        set.attach(RegisteredListener::from_arc(recording.clone()));

        let mut result = TestResult::new("test_a", "pkg.Cls");
        set.notify_start(&result).await;
        result.finish(TestStatus::Failure, None);
        set.notify_outcome(&result).await;

        let events = recording.events.lock().unwrap().clone();
        assert_eq!(events, vec!["start:test_a", "failure:test_a"]);
    }
}
