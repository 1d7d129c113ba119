//! Test task
//!
//! A task is one schedulable unit: a test method bound to its context, a
//! fresh result, the class listeners and the class method-level hooks.

use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::discovery::{ClassHooks, TestContext, TestMethod, TestReturn};
use crate::error::HookError;
use crate::listener::ListenerSet;
use crate::models::{CaughtError, HookRole, TestResult, TestStatus};
use crate::utils::now_millis;

/// Returned when a before-method hook failed. The result carries timestamps
/// but no verdict.
#[derive(Debug)]
pub struct TaskAborted {
    pub result: TestResult,
    pub error: HookError,
}

impl fmt::Display for TaskAborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} aborted: {}", self.result.name(), self.error)
    }
}

impl std::error::Error for TaskAborted {}

pub struct TestTask {
    name: String,
    method: TestMethod,
    context: TestContext,
    result: TestResult,
    listeners: Arc<ListenerSet>,
    hooks: Arc<ClassHooks>,
    lock: Option<Arc<Mutex<()>>>,
}

impl TestTask {
    /// `case_name` is the method name, or `method[label]` for a data row
    pub fn new(
        method: TestMethod,
        context: TestContext,
        case_name: impl Into<String>,
        listeners: Arc<ListenerSet>,
        hooks: Arc<ClassHooks>,
    ) -> Self {
        let case_name = case_name.into();
        let result = TestResult::new(case_name.clone(), context.class_name.clone());
        Self {
            name: format!("{}.{}", context.class_name, case_name),
            method,
            context,
            result,
            listeners,
            hooks,
            lock: None,
        }
    }

    /// Serialise this task with every other task holding the same lock
    pub fn with_lock(mut self, lock: Arc<Mutex<()>>) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.method.descriptor().enabled
    }

    pub fn listeners(&self) -> &Arc<ListenerSet> {
        &self.listeners
    }

    /// Run the task to completion.
    ///
    /// The whole lifecycle runs under the task lock when one is set; the
    /// guard is released on every exit path.
    pub async fn execute(mut self) -> Result<TestResult, TaskAborted> {
        let _guard = match self.lock.take() {
            Some(lock) => Some(lock.lock_owned().await),
            None => None,
        };

        match self.run_lifecycle().await {
            Ok(()) => Ok(self.result),
            Err(error) => Err(TaskAborted {
                result: self.result,
                error,
            }),
        }
    }

    /// Finish as SKIPPED without running hooks or the body
    pub async fn skip(mut self, error: Option<CaughtError>) -> TestResult {
        self.result.start_time_millis = now_millis();
        self.result.finish(TestStatus::Skipped, error);
        self.listeners.notify_outcome(&self.result).await;
        self.result.end_time_millis = now_millis();
        self.result
    }

    async fn run_lifecycle(&mut self) -> Result<(), HookError> {
        self.result.start_time_millis = now_millis();
        debug!("Starting {}", self.name);

        if self.method.descriptor().enabled {
            self.listeners.notify_start(&self.result).await;
        }

        for hook in self.hooks.get(HookRole::BeforeMethod) {
            if let Err(error) = hook.invoke(&self.result.test_class).await {
                self.result.end_time_millis = now_millis();
                return Err(error);
            }
        }

        match self.method.invoke(self.context.clone()).await {
            TestReturn::Unit => self.result.finish(TestStatus::Success, None),
            TestReturn::Verdict(status, error) => {
                let status = if status.is_terminal() {
                    status
                } else {
                    TestStatus::Success
                };
                self.result.finish(status, error);
            }
            TestReturn::Result(built) => self.result.adopt(built),
        }

        if self.result.status() != TestStatus::Skipped {
            for hook in self.hooks.get(HookRole::AfterMethod) {
                if let Err(error) = hook.invoke(&self.result.test_class).await {
                    warn!("{}", error);
                    self.result.teardown_errors.push(CaughtError::hook(&error));
                }
            }
        }

        self.listeners.notify_outcome(&self.result).await;
        self.result.end_time_millis = now_millis();
        debug!("Finished {} as {}", self.name, self.result.status());
        Ok(())
    }
}

impl fmt::Debug for TestTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestTask")
            .field("name", &self.name)
            .field("locked", &self.lock.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::fail_test;
    use crate::discovery::Hook;
    use crate::listener::{RegisteredListener, TestListener};
    use crate::models::{FailureKind, TestDescriptor};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Events {
        log: std::sync::Mutex<Vec<String>>,
    }

    impl Events {
        fn push(&self, event: impl Into<String>) {
            self.log.lock().unwrap().push(event.into());
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.log.lock().unwrap())
        }
    }

    struct EventListener(Arc<Events>);

    #[async_trait]
    impl TestListener for EventListener {
        async fn on_test_start(&self, _: &TestResult) {
            self.0.push("start");
        }
        async fn on_test_success(&self, _: &TestResult) {
            self.0.push("success");
        }
        async fn on_test_failure(&self, _: &TestResult) {
            self.0.push("failure");
        }
        async fn on_test_skipped(&self, _: &TestResult) {
            self.0.push("skipped");
        }
    }

    fn listeners(events: &Arc<Events>) -> Arc<ListenerSet> {
        let mut set = ListenerSet::new();
        set.attach(RegisteredListener::new(EventListener(events.clone())));
        Arc::new(set)
    }

    fn hooks(events: &Arc<Events>) -> Arc<ClassHooks> {
        let mut hooks = ClassHooks::default();
        let before = events.clone();
        hooks.push(Hook::blocking(HookRole::BeforeMethod, "setup", move || {
            before.push("before");
            Ok(())
        }));
        let after = events.clone();
        hooks.push(Hook::blocking(HookRole::AfterMethod, "teardown", move || {
            after.push("after");
            Ok(())
        }));
        Arc::new(hooks)
    }

    fn task(method: TestMethod, events: &Arc<Events>) -> TestTask {
        let ctx = TestContext::new("pkg.Cls", method.name());
        let case = method.name().to_string();
        TestTask::new(method, ctx, case, listeners(events), hooks(events))
    }

    #[tokio::test]
    async fn test_lifecycle_order() {
        let events = Arc::new(Events::default());
        let body_events = events.clone();
        let method = TestMethod::blocking("test_ok", TestDescriptor::test(), move |_| {
            body_events.push("body");
            Ok(())
        });

        let result = task(method, &events).execute().await.unwrap();
        assert_eq!(result.status(), TestStatus::Success);
        assert!(result.caught_error.is_none());
        assert!(result.end_time_millis >= result.start_time_millis);
        assert!(result.start_time_millis > 0);
        assert_eq!(events.take(), vec!["start", "before", "body", "after", "success"]);
    }

    #[tokio::test]
    async fn test_disabled_skips_body_and_after_hooks() {
        let events = Arc::new(Events::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let method = TestMethod::blocking("test_off", TestDescriptor::test().enabled(false), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let result = task(method, &events).execute().await.unwrap();
        assert_eq!(result.status(), TestStatus::Skipped);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(events.take(), vec!["before", "skipped"]);
    }

    #[tokio::test]
    async fn test_failure_is_captured() {
        let events = Arc::new(Events::default());
        let method = TestMethod::blocking("test_fail", TestDescriptor::test(), |_| -> anyhow::Result<()> {
            Err(fail_test("Intentional failure"))
        });

        let result = task(method, &events).execute().await.unwrap();
        assert_eq!(result.status(), TestStatus::Failure);
        let error = result.caught_error.as_ref().unwrap();
        assert_eq!(error.kind, FailureKind::Assertion);
        assert_eq!(error.message, "Intentional failure");
        assert_eq!(events.take(), vec!["start", "before", "after", "failure"]);
    }

    #[tokio::test]
    async fn test_prebuilt_result_replaces_verdict() {
        let events = Arc::new(Events::default());
        let method = TestMethod::new("test_built", TestDescriptor::test(), |_| async {
            let mut built = TestResult::new("", "");
            built.finish(TestStatus::Skipped, None);
            Ok(built)
        });

        let result = task(method, &events).execute().await.unwrap();
        assert_eq!(result.status(), TestStatus::Skipped);
        assert_eq!(result.name(), "pkg.Cls.test_built");
        assert_eq!(events.take(), vec!["start", "before", "skipped"]);
    }

    #[tokio::test]
    async fn test_before_hook_failure_aborts_task() {
        let events = Arc::new(Events::default());
        let mut hooks = ClassHooks::default();
        hooks.push(Hook::blocking(HookRole::BeforeMethod, "connect", || {
            anyhow::bail!("connection refused")
        }));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let method = TestMethod::blocking("test_a", TestDescriptor::test(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let ctx = TestContext::new("pkg.Cls", "test_a");
        let task = TestTask::new(method, ctx, "test_a", listeners(&events), Arc::new(hooks));
        let aborted = task.execute().await.unwrap_err();

        assert_eq!(aborted.error.hook, "connect");
        assert_eq!(aborted.result.status(), TestStatus::Created);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(events.take(), vec!["start"]);
    }

    #[tokio::test]
    async fn test_after_hook_failure_keeps_verdict() {
        let events = Arc::new(Events::default());
        let mut hooks = ClassHooks::default();
        hooks.push(Hook::blocking(HookRole::AfterMethod, "cleanup", || {
            anyhow::bail!("disk full")
        }));
        let second = events.clone();
        hooks.push(Hook::blocking(HookRole::AfterMethod, "close", move || {
            second.push("close");
            Ok(())
        }));
        let method = TestMethod::blocking("test_a", TestDescriptor::test(), |_| Ok(()));

        let ctx = TestContext::new("pkg.Cls", "test_a");
        let task = TestTask::new(method, ctx, "test_a", listeners(&events), Arc::new(hooks));
        let result = task.execute().await.unwrap();

        assert_eq!(result.status(), TestStatus::Success);
        assert_eq!(result.teardown_errors.len(), 1);
        assert_eq!(result.teardown_errors[0].kind, FailureKind::Hook);
        assert_eq!(events.take(), vec!["start", "close", "success"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shared_lock_serialises_lifecycles() {
        let depth = Arc::new(AtomicUsize::new(0));
        let max_depth = Arc::new(AtomicUsize::new(0));
        let lock = Arc::new(Mutex::new(()));

        let enter = {
            let depth = depth.clone();
            let max_depth = max_depth.clone();
            move || {
                let now = depth.fetch_add(1, Ordering::SeqCst) + 1;
                max_depth.fetch_max(now, Ordering::SeqCst);
            }
        };

        let mut handles = Vec::new();
        for i in 0..4 {
            let mut hooks = ClassHooks::default();
            let (hook_enter, hook_depth) = (enter.clone(), depth.clone());
            hooks.push(Hook::new(HookRole::BeforeMethod, "setup", move || {
                let (hook_enter, hook_depth) = (hook_enter.clone(), hook_depth.clone());
                async move {
                    hook_enter();
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    hook_depth.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            }));

            let (body_enter, body_depth) = (enter.clone(), depth.clone());
            let method = TestMethod::new(format!("test_{i}"), TestDescriptor::test(), move |_| {
                let (body_enter, body_depth) = (body_enter.clone(), body_depth.clone());
                async move {
                    body_enter();
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    body_depth.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            });

            let ctx = TestContext::new("pkg.Cls", method.name());
            let case = method.name().to_string();
            let task = TestTask::new(method, ctx, case, Arc::new(ListenerSet::new()), Arc::new(hooks))
                .with_lock(lock.clone());
            handles.push(tokio::spawn(task.execute()));
        }

        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.status(), TestStatus::Success);
        }
        assert_eq!(max_depth.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_skip_notifies_once() {
        let events = Arc::new(Events::default());
        let method = TestMethod::blocking("test_a", TestDescriptor::test(), |_| Ok(()));
        let result = task(method, &events)
            .skip(Some(CaughtError::setup("class aborted")))
            .await;

        assert_eq!(result.status(), TestStatus::Skipped);
        assert_eq!(result.caught_error.unwrap().kind, FailureKind::Setup);
        assert_eq!(events.take(), vec!["skipped"]);
    }
}
