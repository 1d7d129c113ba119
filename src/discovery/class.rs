//! Test class definitions
//!
//! A `TestClass` is the explicit counterpart of an annotated class: its test
//! methods carry a `TestDescriptor`, its hooks carry a `HookRole`, and its
//! listeners are attached through a type-deduplicated `ListenerSet`.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::HookError;
use crate::listener::{ListenerSet, TestListener};
use crate::models::{CaughtError, HookRole, TestDescriptor, TestResult, TestStatus};

type TestBody = Arc<dyn Fn(TestContext) -> BoxFuture<'static, anyhow::Result<TestReturn>> + Send + Sync>;
type HookBody = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// What a test body hands back
#[derive(Clone, Debug)]
pub enum TestReturn {
    /// Plain completion; counts as success
    Unit,
    /// Explicit `(status, error)` verdict, stored verbatim
    Verdict(TestStatus, Option<CaughtError>),
    /// A complete result whose verdict replaces the task's own
    Result(TestResult),
}

impl From<()> for TestReturn {
    fn from(_: ()) -> Self {
        TestReturn::Unit
    }
}

impl From<(TestStatus, Option<CaughtError>)> for TestReturn {
    fn from((status, error): (TestStatus, Option<CaughtError>)) -> Self {
        TestReturn::Verdict(status, error)
    }
}

impl From<TestResult> for TestReturn {
    fn from(result: TestResult) -> Self {
        TestReturn::Result(result)
    }
}

/// Per-invocation data handed to a test body
#[derive(Clone, Debug)]
pub struct TestContext {
    pub class_name: String,
    pub method_name: String,
    row: Option<Value>,
}

impl TestContext {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            row: None,
        }
    }

    pub fn with_row(mut self, row: Value) -> Self {
        self.row = Some(row);
        self
    }

    /// Data provider row, if this invocation was parameterised
    pub fn row(&self) -> Option<&Value> {
        self.row.as_ref()
    }

    /// Keyword parameter from an object row
    pub fn param<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<T> {
        let value = self
            .row
            .as_ref()
            .and_then(|row| row.get(key))
            .ok_or_else(|| anyhow::anyhow!("missing parameter '{key}' for {}", self.method_name))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Positional parameter from an array row
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> anyhow::Result<T> {
        let value = self
            .row
            .as_ref()
            .and_then(|row| row.get(index))
            .ok_or_else(|| anyhow::anyhow!("missing argument {index} for {}", self.method_name))?;
        Ok(serde_json::from_value(value.clone())?)
    }
}

/// A test body bound to its descriptor
#[derive(Clone)]
pub struct TestMethod {
    name: String,
    descriptor: TestDescriptor,
    body: TestBody,
}

impl TestMethod {
    pub fn new<F, Fut, R>(name: impl Into<String>, descriptor: TestDescriptor, body: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Into<TestReturn>,
    {
        Self {
            name: name.into(),
            descriptor,
            body: Arc::new(move |ctx| {
                body(ctx)
                    .map(|r| r.map(Into::<TestReturn>::into))
                    .boxed()
            }),
        }
    }

    /// Synchronous body; it runs inside the future so panics are contained
    pub fn blocking<F, R>(name: impl Into<String>, descriptor: TestDescriptor, body: F) -> Self
    where
        F: Fn(TestContext) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<TestReturn>,
    {
        let body = Arc::new(body);
        Self {
            name: name.into(),
            descriptor,
            body: Arc::new(move |ctx| {
                let body = body.clone();
                async move { body(ctx).map(Into::<TestReturn>::into) }.boxed()
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &TestDescriptor {
        &self.descriptor
    }

    /// Run the body under the test wrapper.
    ///
    /// A disabled test yields `(SKIPPED, None)` without touching the body.
    /// Errors and panics become `(FAILURE, error)`; plain completion becomes
    /// `(SUCCESS, None)`. Explicit verdicts and results pass through.
    pub async fn invoke(&self, ctx: TestContext) -> TestReturn {
        if !self.descriptor.enabled {
            return TestReturn::Verdict(TestStatus::Skipped, None);
        }

        let future = match panic::catch_unwind(AssertUnwindSafe(|| (self.body)(ctx))) {
            Ok(future) => future,
            Err(payload) => {
                return TestReturn::Verdict(
                    TestStatus::Failure,
                    Some(CaughtError::panic(panic_message(payload.as_ref()))),
                )
            }
        };

        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(TestReturn::Unit)) => TestReturn::Verdict(TestStatus::Success, None),
            Ok(Ok(other)) => other,
            Ok(Err(error)) => {
                TestReturn::Verdict(TestStatus::Failure, Some(CaughtError::from_error(error)))
            }
            Err(payload) => TestReturn::Verdict(
                TestStatus::Failure,
                Some(CaughtError::panic(panic_message(payload.as_ref()))),
            ),
        }
    }
}

impl fmt::Debug for TestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestMethod")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// A setup/teardown callable marked with its role
#[derive(Clone)]
pub struct Hook {
    name: String,
    role: HookRole,
    body: HookBody,
}

impl Hook {
    pub fn new<F, Fut>(role: HookRole, name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            role,
            body: Arc::new(move || body().boxed()),
        }
    }

    pub fn blocking<F>(role: HookRole, name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let body = Arc::new(body);
        Self {
            name: name.into(),
            role,
            body: Arc::new(move || {
                let body = body.clone();
                async move { body() }.boxed()
            }),
        }
    }

    pub fn before_class<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(HookRole::BeforeClass, name, body)
    }

    pub fn after_class<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(HookRole::AfterClass, name, body)
    }

    pub fn before_method<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(HookRole::BeforeMethod, name, body)
    }

    pub fn after_method<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(HookRole::AfterMethod, name, body)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> HookRole {
        self.role
    }

    /// Run the hook; errors and panics are returned, never contained
    pub async fn invoke(&self, class_name: &str) -> Result<(), HookError> {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| (self.body)())) {
            Ok(future) => match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => result.map_err(|e| format!("{e:#}")),
                Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
            },
            Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
        };

        outcome.map_err(|message| HookError {
            class_name: class_name.to_string(),
            hook: self.name.clone(),
            role: self.role,
            message,
        })
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("role", &self.role)
            .finish()
    }
}

/// Hooks of a class grouped by role, each in declaration order
#[derive(Clone, Debug, Default)]
pub struct ClassHooks {
    before_class: Vec<Hook>,
    after_class: Vec<Hook>,
    before_method: Vec<Hook>,
    after_method: Vec<Hook>,
}

impl ClassHooks {
    pub fn push(&mut self, hook: Hook) {
        match hook.role {
            HookRole::BeforeClass => self.before_class.push(hook),
            HookRole::AfterClass => self.after_class.push(hook),
            HookRole::BeforeMethod => self.before_method.push(hook),
            HookRole::AfterMethod => self.after_method.push(hook),
        }
    }

    pub fn get(&self, role: HookRole) -> &[Hook] {
        match role {
            HookRole::BeforeClass => &self.before_class,
            HookRole::AfterClass => &self.after_class,
            HookRole::BeforeMethod => &self.before_method,
            HookRole::AfterMethod => &self.after_method,
        }
    }
}

/// A test class: tests, hooks and listeners
#[derive(Clone, Debug)]
pub struct TestClass {
    name: String,
    tests: Vec<TestMethod>,
    hooks: ClassHooks,
    listeners: ListenerSet,
}

impl TestClass {
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            class: TestClass {
                name: name.into(),
                tests: Vec::new(),
                hooks: ClassHooks::default(),
                listeners: ListenerSet::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short name, without the dotted path
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Test methods in declaration order
    pub fn tests(&self) -> &[TestMethod] {
        &self.tests
    }

    pub fn test(&self, name: &str) -> Option<&TestMethod> {
        self.tests.iter().find(|t| t.name == name)
    }

    pub fn hooks(&self) -> &ClassHooks {
        &self.hooks
    }

    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    pub fn listeners_mut(&mut self) -> &mut ListenerSet {
        &mut self.listeners
    }

    pub(crate) fn into_parts(self) -> (String, Vec<TestMethod>, ClassHooks, ListenerSet) {
        (self.name, self.tests, self.hooks, self.listeners)
    }
}

/// Builder for `TestClass`
pub struct ClassBuilder {
    class: TestClass,
}

impl ClassBuilder {
    /// Add an async test method
    pub fn test<F, Fut, R>(mut self, name: impl Into<String>, descriptor: TestDescriptor, body: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Into<TestReturn>,
    {
        self.class.tests.push(TestMethod::new(name, descriptor, body));
        self
    }

    /// Add a synchronous test method
    pub fn test_blocking<F, R>(mut self, name: impl Into<String>, descriptor: TestDescriptor, body: F) -> Self
    where
        F: Fn(TestContext) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<TestReturn>,
    {
        self.class.tests.push(TestMethod::blocking(name, descriptor, body));
        self
    }

    pub fn method(mut self, method: TestMethod) -> Self {
        self.class.tests.push(method);
        self
    }

    pub fn hook(mut self, hook: Hook) -> Self {
        self.class.hooks.push(hook);
        self
    }

    /// Attach a listener; ignored when one of the same type is attached
    pub fn listener<L: TestListener>(mut self, listener: L) -> Self {
        self.class.listeners.attach_listener(listener);
        self
    }

    pub fn listeners(mut self, listeners: &ListenerSet) -> Self {
        self.class.listeners.merge(listeners);
        self
    }

    pub fn build(self) -> TestClass {
        self.class
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::fail_test;
    use crate::error::TestFailure;
    use crate::models::FailureKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx() -> TestContext {
        TestContext::new("pkg.Cls", "test_method")
    }

    #[tokio::test]
    async fn test_disabled_never_invokes_body() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let method = TestMethod::blocking("off", TestDescriptor::test().enabled(false), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        match method.invoke(ctx()).await {
            TestReturn::Verdict(status, error) => {
                assert_eq!(status, TestStatus::Skipped);
                assert!(error.is_none());
            }
            other => panic!("unexpected return {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_and_failures() {
        let ok = TestMethod::new("ok", TestDescriptor::test(), |_| async { Ok(()) });
        assert!(matches!(
            ok.invoke(ctx()).await,
            TestReturn::Verdict(TestStatus::Success, None)
        ));

        let failing = TestMethod::blocking("fail", TestDescriptor::test(), |_| -> anyhow::Result<()> {
            Err(fail_test("Intentional failure"))
        });
        let TestReturn::Verdict(status, Some(error)) = failing.invoke(ctx()).await else {
            panic!("expected a failure verdict");
        };
        assert_eq!(status, TestStatus::Failure);
        assert_eq!(error.kind, FailureKind::Assertion);
        assert_eq!(
            error.downcast_ref::<TestFailure>(),
            Some(&TestFailure::new("Intentional failure"))
        );

        let erroring = TestMethod::new("err", TestDescriptor::test(), |_| async {
            Err::<(), _>(anyhow::anyhow!("division by zero"))
        });
        let TestReturn::Verdict(status, Some(error)) = erroring.invoke(ctx()).await else {
            panic!("expected a failure verdict");
        };
        assert_eq!(status, TestStatus::Failure);
        assert_eq!(error.kind, FailureKind::Unexpected);
        assert_eq!(error.message, "division by zero");
    }

    #[tokio::test]
    async fn test_panicking_body_is_contained() {
        let method = TestMethod::blocking("boom", TestDescriptor::test(), |_| -> anyhow::Result<()> {
            panic!("index out of bounds");
        });
        let TestReturn::Verdict(status, Some(error)) = method.invoke(ctx()).await else {
            panic!("expected a failure verdict");
        };
        assert_eq!(status, TestStatus::Failure);
        assert_eq!(error.kind, FailureKind::Unexpected);
        assert!(error.message.contains("index out of bounds"));
    }

    #[tokio::test]
    async fn test_explicit_verdict_passes_through() {
        let method = TestMethod::new("verdict", TestDescriptor::test(), |_| async {
            Ok((TestStatus::Skipped, None::<CaughtError>))
        });
        assert!(matches!(
            method.invoke(ctx()).await,
            TestReturn::Verdict(TestStatus::Skipped, None)
        ));
    }

    #[tokio::test]
    async fn test_hook_error_propagates() {
        let hook = Hook::blocking(HookRole::BeforeMethod, "setup", || {
            anyhow::bail!("database unavailable")
        });
        let error = hook.invoke("pkg.Cls").await.unwrap_err();
        assert_eq!(error.role, HookRole::BeforeMethod);
        assert_eq!(error.hook, "setup");
        assert_eq!(error.message, "database unavailable");
    }

    #[test]
    fn test_builder_groups_hooks_by_role() {
        let class = TestClass::builder("pkg.ExampleTest")
            .hook(Hook::before_class("connect", || async { Ok(()) }))
            .hook(Hook::before_method("reset", || async { Ok(()) }))
            .hook(Hook::before_method("seed", || async { Ok(()) }))
            .test("test_a", TestDescriptor::test(), |_| async { Ok(()) })
            .test_blocking("test_b", TestDescriptor::test().parallel(true), |_| Ok(()))
            .build();

        assert_eq!(class.short_name(), "ExampleTest");
        assert_eq!(class.tests().len(), 2);
        assert_eq!(class.hooks().get(HookRole::BeforeClass).len(), 1);
        let names: Vec<_> = class
            .hooks()
            .get(HookRole::BeforeMethod)
            .iter()
            .map(|h| h.name().to_string())
            .collect();
        assert_eq!(names, vec!["reset", "seed"]);
        assert!(class.test("test_b").unwrap().descriptor().run_in_parallel);
    }

    #[test]
    fn test_context_params() {
        let keyed = ctx().with_row(serde_json::json!({"user": "admin", "age": 42}));
        assert_eq!(keyed.param::<String>("user").unwrap(), "admin");
        assert_eq!(keyed.param::<u32>("age").unwrap(), 42);
        assert!(keyed.param::<String>("missing").is_err());

        let positional = ctx().with_row(serde_json::json!([1, "two"]));
        assert_eq!(positional.arg::<i32>(0).unwrap(), 1);
        assert_eq!(positional.arg::<String>(1).unwrap(), "two");
    }
}
