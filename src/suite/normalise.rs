//! Suite normalisation
//!
//! Fills in suite defaults, propagates them to test entries and merges class
//! entries by name. Normalising an already normalised document changes
//! nothing.

use std::collections::HashMap;

use super::model::{
    ClassConfig, MethodFilter, OneOrMany, ParallelMode, RawClassEntry, RawMethodFilter,
    RawParallel, SuiteConfig, SuiteDocument, Suite, TestConfig,
};

pub const DEFAULT_PARALLEL: ParallelMode = ParallelMode::None;
pub const DEFAULT_THREAD_COUNT: u32 = 1;

/// Resolve every inherited field of a suite document
pub fn normalise(mut document: SuiteDocument) -> SuiteDocument {
    let suite_parallel = document
        .suite
        .parallel
        .map(RawParallel::mode)
        .unwrap_or(DEFAULT_PARALLEL);
    let suite_threads = document.suite.thread_count.unwrap_or(DEFAULT_THREAD_COUNT);

    document.suite.parallel = Some(RawParallel::Mode(suite_parallel));
    document.suite.thread_count = Some(suite_threads);

    for test in &mut document.tests {
        let parallel = test.parallel.map(RawParallel::mode).unwrap_or(suite_parallel);
        test.parallel = Some(RawParallel::Mode(parallel));
        test.thread_count = Some(test.thread_count.unwrap_or(suite_threads));
        test.enabled = Some(test.enabled.unwrap_or(true));
        test.classes = normalise_classes(std::mem::take(&mut test.classes));
    }

    document
}

/// Merge class entries by name, first-seen order, deduplicating filters
pub fn normalise_classes(raw: Vec<RawClassEntry>) -> Vec<RawClassEntry> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, (Vec<String>, Vec<String>)> = HashMap::new();

    for entry in raw {
        let (name, filter) = match entry {
            RawClassEntry::Name(name) => (name, RawMethodFilter::default()),
            RawClassEntry::Detailed { name, methods } => (name, methods.unwrap_or_default()),
        };

        let slot = merged.entry(name.clone()).or_insert_with(|| {
            order.push(name.clone());
            (Vec::new(), Vec::new())
        });

        extend_unique(&mut slot.0, filter.include.map(OneOrMany::into_vec));
        extend_unique(&mut slot.1, filter.exclude.map(OneOrMany::into_vec));
    }

    order
        .into_iter()
        .filter_map(|name| {
            let (include, exclude) = merged.remove(&name)?;
            Some(RawClassEntry::Detailed {
                name,
                methods: Some(RawMethodFilter {
                    include: Some(OneOrMany::Many(include)),
                    exclude: Some(OneOrMany::Many(exclude)),
                }),
            })
        })
        .collect()
}

fn extend_unique(dst: &mut Vec<String>, src: Option<Vec<String>>) {
    for item in src.unwrap_or_default() {
        if !dst.contains(&item) {
            dst.push(item);
        }
    }
}

impl From<SuiteDocument> for Suite {
    fn from(document: SuiteDocument) -> Self {
        let document = normalise(document);

        let settings = SuiteConfig {
            name: document.suite.name.clone(),
            parallel: document.suite.parallel.map(RawParallel::mode).unwrap_or_default(),
            thread_count: thread_count(document.suite.thread_count),
        };

        let tests = document
            .tests
            .into_iter()
            .enumerate()
            .map(|(index, test)| TestConfig {
                name: test.name.unwrap_or_else(|| format!("test-{}", index + 1)),
                parallel: test.parallel.map(RawParallel::mode).unwrap_or_default(),
                thread_count: thread_count(test.thread_count),
                enabled: test.enabled.unwrap_or(true),
                classes: test
                    .classes
                    .into_iter()
                    .map(|entry| match entry {
                        RawClassEntry::Name(name) => ClassConfig::all_methods(name),
                        RawClassEntry::Detailed { name, methods } => {
                            let methods = methods.unwrap_or_default();
                            ClassConfig {
                                name,
                                methods: MethodFilter {
                                    include: methods.include.map(OneOrMany::into_vec).unwrap_or_default(),
                                    exclude: methods.exclude.map(OneOrMany::into_vec).unwrap_or_default(),
                                },
                            }
                        }
                    })
                    .collect(),
            })
            .collect();

        Suite { settings, tests }
    }
}

// A zero count would never admit a task
fn thread_count(count: Option<u32>) -> usize {
    count.unwrap_or(DEFAULT_THREAD_COUNT).max(1) as usize
}
