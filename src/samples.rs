//! Bundled sample classes
//!
//! Registered by the shipped binary so a suite can be run out of the box.
//! `suites/sample_suite.yaml` exercises every class here.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use crate::assertions::{fail_test, Assertions};
use crate::cli::Registries;
use crate::discovery::{
    ClassRegistry, DataProviderRegistry, Hook, ListenerRegistry, TestClass, TestContext,
};
use crate::listener::TestListener;
use crate::models::{TestDescriptor, TestResult};

/// Logs every verdict of the classes it is attached to
#[derive(Debug, Default)]
pub struct ConsoleListener;

#[async_trait]
impl TestListener for ConsoleListener {
    async fn on_test_start(&self, result: &TestResult) {
        info!("[START] {}", result.name());
    }

    async fn on_test_success(&self, result: &TestResult) {
        info!("[PASS] {} ({}ms)", result.name(), result.duration_ms());
    }

    async fn on_test_failure(&self, result: &TestResult) {
        let reason = result
            .caught_error
            .as_ref()
            .map(|e| e.message.as_str())
            .unwrap_or("unknown");
        info!("[FAIL] {}: {}", result.name(), reason);
    }

    async fn on_test_skipped(&self, result: &TestResult) {
        info!("[SKIP] {}", result.name());
    }
}

/// Globally discovered listener
#[derive(Debug, Default)]
pub struct AllListener;

#[async_trait]
impl TestListener for AllListener {
    async fn on_test_start(&self, result: &TestResult) {
        debug!("global on_test_start {}", result.name());
    }

    async fn on_test_success(&self, result: &TestResult) {
        debug!("global on_test_success {}", result.name());
    }

    async fn on_test_failure(&self, result: &TestResult) {
        debug!("global on_test_failure {}", result.name());
    }

    async fn on_test_skipped(&self, result: &TestResult) {
        debug!("global on_test_skipped {}", result.name());
    }
}

/// Hooks around a mix of passing, failing and disabled tests
pub fn example_test() -> TestClass {
    TestClass::builder("samples.ExampleTest")
        .listener(ConsoleListener)
        .hook(Hook::before_class("setup_class", || async {
            info!("Connecting to database...");
            Ok(())
        }))
        .hook(Hook::after_class("teardown_class", || async {
            info!("Disconnecting from database...");
            Ok(())
        }))
        .hook(Hook::before_method("setup", || async {
            debug!("Calling before method...");
            Ok(())
        }))
        .hook(Hook::after_method("teardown", || async {
            debug!("Calling after method...");
            Ok(())
        }))
        .test("test_success", TestDescriptor::test(), |_| async {
            tokio::time::sleep(Duration::from_millis(700)).await;
            Ok(())
        })
        .test(
            "test_failure",
            TestDescriptor::test().parallel(true),
            |_| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Err::<(), _>(fail_test("Intentional failure"))
            },
        )
        .test_blocking("test_exception", TestDescriptor::test(), |_| {
            let divisor = 0u32;
            let value = 1u32
                .checked_div(divisor)
                .ok_or_else(|| anyhow::anyhow!("division by zero"))?;
            debug!("value: {value}");
            Ok(())
        })
        .test_blocking(
            "test_skipped",
            TestDescriptor::test().enabled(false),
            |_| Err::<(), _>(fail_test("This test should never run")),
        )
        .test(
            "test_excluded",
            TestDescriptor::test().parallel(true),
            |_| async { Err::<(), _>(fail_test("Test should be excluded")) },
        )
        .build()
}

/// Sequential tests selected by method name in the suite
pub fn method_specific_test() -> TestClass {
    TestClass::builder("samples.MethodSpecificTest")
        .test("remove_item", TestDescriptor::test(), |_| async {
            tokio::time::sleep(Duration::from_millis(700)).await;
            Ok(())
        })
        .test("add_item", TestDescriptor::test(), |_| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .build()
}

/// A parameterised test over the `credentials` provider, using soft assertions
pub fn login_test() -> TestClass {
    TestClass::builder("samples.LoginTest")
        .test_blocking(
            "test_login",
            TestDescriptor::test().provider("credentials"),
            |ctx: TestContext| {
                let user: String = ctx.param("user")?;
                let password: String = ctx.param("password")?;
                let expect_ok: bool = ctx.param("expect_ok")?;

                let soft = Assertions::soft();
                soft.assert_that(user.as_str(), "user").matches(|u| !u.is_empty(), Some("is empty"))?;
                soft.assert_that(password.len() >= 8, "password length >= 8")
                    .is_equal_to(expect_ok)?;
                soft.summarise()?;
                Ok(())
            },
        )
        .build()
}

pub fn classes() -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    registry
        .register("samples.ExampleTest", example_test)
        .register("samples.MethodSpecificTest", method_specific_test)
        .register("samples.LoginTest", login_test);
    registry
}

pub fn listeners() -> ListenerRegistry {
    let mut registry = ListenerRegistry::new();
    registry.register::<AllListener>();
    registry
}

pub fn providers() -> DataProviderRegistry {
    let mut registry = DataProviderRegistry::new();
    registry.register_rows(
        "credentials",
        vec![
            json!({"name": "admin", "user": "admin", "password": "correct-horse", "expect_ok": true}),
            json!({"name": "short", "user": "guest", "password": "guest", "expect_ok": false}),
        ],
    );
    registry
}

/// All sample registrations
pub fn registries() -> Registries {
    Registries {
        classes: classes(),
        listeners: listeners(),
        providers: providers(),
    }
}
