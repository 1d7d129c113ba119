//! Test scheduler
//!
//! Builds tasks from a normalised suite and runs them on two lanes at once:
//! a sequential lane serialised by one shared lock, and a parallel lane of
//! spawned tasks bounded by semaphores sized to the effective thread count.
//! Whole classes (`classes` mode) and whole test entries (`tests` mode) run
//! as units on the parallel lane.

use futures::future::join_all;
use futures::FutureExt;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::report::{RunReport, SetupFailure, SetupScope};
use super::task::{TaskAborted, TestTask};
use crate::discovery::{
    expand_rows, panic_message, ClassHooks, ClassRegistry, DataProviderRegistry, TestContext,
    TestMethod,
};
use crate::error::HookError;
use crate::listener::ListenerSet;
use crate::models::{CaughtError, HookRole, TestResult, TestStatus};
use crate::suite::{ClassConfig, ParallelMode, Suite, SuiteConfig, TestConfig};
use crate::utils::{now_millis, Timer};

pub const DEFAULT_MAX_WORKERS: usize = 3;

/// Runs suites and class lists against a class registry
pub struct TestExecutor {
    registry: Arc<ClassRegistry>,
    providers: Arc<DataProviderRegistry>,
    global_listeners: ListenerSet,
    max_workers: usize,
}

impl TestExecutor {
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        Self {
            registry,
            providers: Arc::new(DataProviderRegistry::new()),
            global_listeners: ListenerSet::new(),
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }

    pub fn with_providers(mut self, providers: Arc<DataProviderRegistry>) -> Self {
        self.providers = providers;
        self
    }

    /// Listeners merged into every resolved class
    pub fn with_listeners(mut self, listeners: ListenerSet) -> Self {
        self.global_listeners = listeners;
        self
    }

    /// Thread count used by `run_classes`
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Run every class with its default configuration
    pub async fn run_classes(&self, class_names: &[&str]) -> RunReport {
        let suite = Suite {
            settings: SuiteConfig {
                name: None,
                parallel: ParallelMode::None,
                thread_count: self.max_workers,
            },
            tests: vec![TestConfig {
                name: "classes".to_string(),
                classes: class_names
                    .iter()
                    .map(|name| ClassConfig::all_methods(*name))
                    .collect(),
                parallel: ParallelMode::None,
                thread_count: self.max_workers,
                enabled: true,
            }],
        };
        self.run_tests(&suite).await
    }

    /// Run a normalised suite and aggregate one result per task
    pub async fn run_tests(&self, suite: &Suite) -> RunReport {
        let timer = Timer::start("suite run");
        let mut report = RunReport {
            started_millis: timer.started_millis(),
            ..RunReport::default()
        };
        info!(
            "Running suite {} ({} test entries)",
            suite.settings.name.as_deref().unwrap_or("<unnamed>"),
            suite.tests.len()
        );

        let plan = self.collect(suite, &mut report).await;
        let mut output = plan.ready;

        // Class hooks of lane classes bracket both lanes
        for class in &plan.lane_classes {
            output.hook_failures.extend(class.before_class().await);
        }

        let lock = Arc::new(Mutex::new(()));
        let handles = spawn_parallel_lane(plan.parallel, plan.units);
        let sequential = run_sequential_lane(plan.sequential, lock);
        let (sequential_output, parallel_outputs) = tokio::join!(sequential, join_all(handles));

        output.merge(sequential_output);
        for joined in parallel_outputs {
            match joined {
                Ok(lane) => output.merge(lane),
                Err(e) => error!("Parallel lane task failed to join: {}", e),
            }
        }

        for class in &plan.lane_classes {
            output.hook_failures.extend(class.after_class().await);
        }

        for (name, result) in output.results {
            report.results.insert(name, result);
        }
        report.hook_failures.extend(output.hook_failures);
        report.finished_millis = now_millis();

        let summary = report.summary();
        info!(
            "Suite finished in {}ms - {}",
            timer.stop().as_millis(),
            summary
        );
        report
    }

    async fn collect(&self, suite: &Suite, report: &mut RunReport) -> RunPlan {
        let mut plan = RunPlan::default();
        let mut taken = HashSet::new();
        let suite_slots = Arc::new(Semaphore::new(suite.settings.thread_count.max(1)));

        for entry in &suite.tests {
            debug!(
                "Collecting test entry {} (parallel: {}, threads: {})",
                entry.name, entry.parallel, entry.thread_count
            );
            let entry_slots = Arc::new(Semaphore::new(entry.thread_count.max(1)));
            let mut entry_classes = Vec::new();

            for class_config in &entry.classes {
                if let Some(prepared) = self.prepare_class(entry, class_config, &mut taken, report).await {
                    plan.ready.merge(prepared.ready);
                    entry_classes.push(PreparedUnit {
                        class: prepared.class,
                        tasks: prepared.tasks,
                    });
                }
            }

            match entry.parallel {
                ParallelMode::None | ParallelMode::Methods => {
                    for unit in entry_classes {
                        plan.lane_classes.push(unit.class.clone());
                        for planned in unit.tasks {
                            if planned.parallel {
                                plan.parallel
                                    .push((planned.task, unit.class.clone(), entry_slots.clone()));
                            } else {
                                plan.sequential.push((planned.task, unit.class.clone()));
                            }
                        }
                    }
                }
                ParallelMode::Classes => {
                    for unit in entry_classes {
                        plan.units.push((vec![unit], entry_slots.clone()));
                    }
                }
                ParallelMode::Tests => {
                    plan.units.push((entry_classes, suite_slots.clone()));
                }
            }
        }

        debug!(
            "Planned {} sequential tasks, {} parallel tasks, {} units",
            plan.sequential.len(),
            plan.parallel.len(),
            plan.units.len()
        );
        plan
    }

    async fn prepare_class(
        &self,
        entry: &TestConfig,
        config: &ClassConfig,
        taken: &mut HashSet<String>,
        report: &mut RunReport,
    ) -> Option<PreparedClass> {
        let mut class = match self.registry.resolve(&config.name) {
            Ok(class) => class,
            Err(e) => {
                error!("{}", e);
                report.setup_failures.push(SetupFailure {
                    scope: SetupScope::Class,
                    target: config.name.clone(),
                    message: e.to_string(),
                });
                return None;
            }
        };

        let added = class.listeners_mut().merge(&self.global_listeners);
        if added > 0 {
            debug!("Merged {} global listeners into {}", added, class.name());
        }

        let (class_name, methods, hooks, listeners) = class.into_parts();
        let selected: Vec<_> = methods
            .into_iter()
            .filter(|m| config.methods.selects(m.name()))
            .collect();
        if selected.is_empty() {
            warn!("No test methods of {} selected", class_name);
        }

        let hooks_enabled = entry.enabled && selected.iter().any(|m| m.descriptor().enabled);
        let class_run = Arc::new(ClassRun {
            name: class_name.clone(),
            hooks: Arc::new(hooks),
            listeners: Arc::new(listeners),
            hooks_enabled,
            aborted: OnceLock::new(),
        });

        let mut ready = LaneOutput::default();
        let mut tasks = Vec::new();

        for method in selected {
            let parallel = match entry.parallel {
                ParallelMode::Methods => true,
                ParallelMode::None => method.descriptor().run_in_parallel,
                ParallelMode::Classes | ParallelMode::Tests => false,
            };

            let provider = method
                .descriptor()
                .data_provider
                .clone()
                .filter(|_| entry.enabled && method.descriptor().enabled);

            let Some(provider) = provider else {
                let ctx = TestContext::new(class_name.clone(), method.name());
                let case = claim_case(taken, &class_name, method.name().to_string());
                tasks.push(PlannedTask {
                    task: class_run.task(method, ctx, case),
                    parallel,
                });
                continue;
            };

            match self.providers.rows(&provider).await {
                Ok(rows) => {
                    debug!(
                        "Data provider {} produced {} rows for {}.{}",
                        provider,
                        rows.len(),
                        class_name,
                        method.name()
                    );
                    for case in expand_rows(method.name(), rows) {
                        let ctx = TestContext::new(class_name.clone(), method.name())
                            .with_row(case.row);
                        let case = claim_case(taken, &class_name, case.case_name);
                        tasks.push(PlannedTask {
                            task: class_run.task(method.clone(), ctx, case),
                            parallel,
                        });
                    }
                }
                Err(e) => {
                    let message = format!("Data provider '{provider}' failed: {e:#}");
                    error!("{}.{}: {}", class_name, method.name(), message);
                    report.setup_failures.push(SetupFailure {
                        scope: SetupScope::Method,
                        target: format!("{}.{}", class_name, method.name()),
                        message: message.clone(),
                    });
                    let result = TestResult::skipped(
                        claim_case(taken, &class_name, method.name().to_string()),
                        class_name.clone(),
                        Some(CaughtError::setup(message)),
                    );
                    ready.push(result.name(), result);
                }
            }
        }

        if !entry.enabled {
            info!("Test entry {} is disabled, skipping {}", entry.name, class_name);
            for planned in tasks.drain(..) {
                let name = planned.task.name().to_string();
                ready.push(name, planned.task.skip(None).await);
            }
        }

        Some(PreparedClass {
            class: class_run,
            tasks,
            ready,
        })
    }
}

/// Shared per-class state: hooks, listeners and the abort flag
struct ClassRun {
    name: String,
    hooks: Arc<ClassHooks>,
    listeners: Arc<ListenerSet>,
    hooks_enabled: bool,
    aborted: OnceLock<CaughtError>,
}

impl ClassRun {
    fn task(&self, method: TestMethod, ctx: TestContext, case: String) -> TestTask {
        TestTask::new(method, ctx, case, self.listeners.clone(), self.hooks.clone())
    }

    fn abort(&self, error: &HookError) {
        if self.aborted.set(CaughtError::hook(error)).is_ok() {
            warn!("Aborting remaining tests of {}: {}", self.name, error);
        }
    }

    fn aborted(&self) -> Option<CaughtError> {
        self.aborted.get().cloned()
    }

    /// Before-class hooks in order; the first failure aborts the class
    async fn before_class(&self) -> Vec<HookError> {
        if !self.hooks_enabled {
            return Vec::new();
        }
        for hook in self.hooks.get(HookRole::BeforeClass) {
            if let Err(error) = hook.invoke(&self.name).await {
                self.abort(&error);
                return vec![error];
            }
        }
        Vec::new()
    }

    /// Every after-class hook runs; failures are only logged and returned
    async fn after_class(&self) -> Vec<HookError> {
        if !self.hooks_enabled {
            return Vec::new();
        }
        let mut failures = Vec::new();
        for hook in self.hooks.get(HookRole::AfterClass) {
            if let Err(error) = hook.invoke(&self.name).await {
                warn!("{}", error);
                failures.push(error);
            }
        }
        failures
    }

    /// Run one task. A panic escaping the task, a listener included, becomes
    /// that task's FAILURE entry so the rest of the lane keeps going.
    async fn run(&self, task: TestTask) -> LaneOutput {
        let name = task.name().to_string();
        match AssertUnwindSafe(self.run_task(task)).catch_unwind().await {
            Ok(output) => output,
            Err(payload) => panicked(name, &self.name, payload.as_ref()),
        }
    }

    async fn run_task(&self, task: TestTask) -> LaneOutput {
        let mut output = LaneOutput::default();
        let name = task.name().to_string();

        if let Some(error) = self.aborted() {
            output.push(name, task.skip(Some(error)).await);
            return output;
        }

        match task.execute().await {
            Ok(result) => {
                for teardown in &result.teardown_errors {
                    if let Some(hook_error) = teardown.downcast_ref::<HookError>() {
                        output.hook_failures.push(hook_error.clone());
                    }
                }
                output.push(name, result);
            }
            Err(TaskAborted { mut result, error }) => {
                self.abort(&error);
                result.finish(TestStatus::Skipped, Some(CaughtError::hook(&error)));
                self.listeners.notify_outcome(&result).await;
                output.hook_failures.push(error);
                output.push(name, result);
            }
        }
        output
    }
}

struct PlannedTask {
    task: TestTask,
    parallel: bool,
}

struct PreparedClass {
    class: Arc<ClassRun>,
    tasks: Vec<PlannedTask>,
    ready: LaneOutput,
}

struct PreparedUnit {
    class: Arc<ClassRun>,
    tasks: Vec<PlannedTask>,
}

#[derive(Default)]
struct RunPlan {
    ready: LaneOutput,
    lane_classes: Vec<Arc<ClassRun>>,
    sequential: Vec<(TestTask, Arc<ClassRun>)>,
    parallel: Vec<(TestTask, Arc<ClassRun>, Arc<Semaphore>)>,
    units: Vec<(Vec<PreparedUnit>, Arc<Semaphore>)>,
}

/// Results and hook failures gathered by one lane or unit
#[derive(Default)]
struct LaneOutput {
    results: Vec<(String, TestResult)>,
    hook_failures: Vec<HookError>,
}

impl LaneOutput {
    fn push(&mut self, name: impl Into<String>, result: TestResult) {
        self.results.push((name.into(), result));
    }

    fn merge(&mut self, other: LaneOutput) {
        self.results.extend(other.results);
        self.hook_failures.extend(other.hook_failures);
    }
}

async fn run_sequential_lane(tasks: Vec<(TestTask, Arc<ClassRun>)>, lock: Arc<Mutex<()>>) -> LaneOutput {
    let mut output = LaneOutput::default();
    if tasks.is_empty() {
        return output;
    }
    debug!("Sequential lane started with {} tasks", tasks.len());
    for (task, class) in tasks {
        output.merge(class.run(task.with_lock(lock.clone())).await);
    }
    debug!("Sequential lane finished");
    output
}

fn spawn_parallel_lane(
    tasks: Vec<(TestTask, Arc<ClassRun>, Arc<Semaphore>)>,
    units: Vec<(Vec<PreparedUnit>, Arc<Semaphore>)>,
) -> Vec<JoinHandle<LaneOutput>> {
    let mut handles = Vec::with_capacity(tasks.len() + units.len());

    for (task, class, slots) in tasks {
        handles.push(tokio::spawn(async move {
            let _permit = slots.acquire_owned().await.ok();
            class.run(task).await
        }));
    }

    for (classes, slots) in units {
        handles.push(tokio::spawn(async move {
            let _permit = slots.acquire_owned().await.ok();
            let mut output = LaneOutput::default();
            for unit in classes {
                output.merge(run_unit(unit).await);
            }
            output
        }));
    }

    handles
}

/// A class run as one unit: hooks around its tasks in declaration order
async fn run_unit(unit: PreparedUnit) -> LaneOutput {
    let mut output = LaneOutput::default();
    debug!("Running {} as a unit", unit.class.name);
    output.hook_failures.extend(unit.class.before_class().await);
    for planned in unit.tasks {
        output.merge(unit.class.run(planned.task).await);
    }
    output.hook_failures.extend(unit.class.after_class().await);
    output
}

/// Reserve a unique `Class.case` report key, suffixing `#<n>` on repeats
fn claim_case(taken: &mut HashSet<String>, class_name: &str, case: String) -> String {
    let mut candidate = case.clone();
    let mut n = 2;
    while !taken.insert(format!("{class_name}.{candidate}")) {
        candidate = format!("{case}#{n}");
        n += 1;
    }
    if candidate != case {
        warn!("Duplicate test {}.{} reported as {}", class_name, case, candidate);
    }
    candidate
}

// A listener panicked after the body was contained; keep the entry
fn panicked(name: String, class_name: &str, payload: &(dyn std::any::Any + Send)) -> LaneOutput {
    let message = panic_message(payload);
    error!("{} panicked outside its body: {}", name, message);
    let method = name
        .strip_prefix(class_name)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(&name)
        .to_string();
    let mut result = TestResult::new(method, class_name);
    result.finish(TestStatus::Failure, Some(CaughtError::panic(message)));
    let mut output = LaneOutput::default();
    output.push(name, result);
    output
}
