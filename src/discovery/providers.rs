//! Data providers
//!
//! A provider produces the rows a parameterised test runs over. The registry
//! is built once at startup and shared with the executor by `Arc`.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

type ProviderFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Vec<Value>>> + Send + Sync>;

#[derive(Clone, Default)]
pub struct DataProviderRegistry {
    providers: HashMap<String, ProviderFn>,
}

impl DataProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&mut self, name: impl Into<String>, provider: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<Value>>> + Send + 'static,
    {
        self.providers
            .insert(name.into(), Arc::new(move || provider().boxed()));
        self
    }

    /// Register a fixed set of rows
    pub fn register_rows(&mut self, name: impl Into<String>, rows: Vec<Value>) -> &mut Self {
        self.register(name, move || {
            let rows = rows.clone();
            async move { Ok(rows) }
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Produce the rows of the named provider
    pub async fn rows(&self, name: &str) -> anyhow::Result<Vec<Value>> {
        let provider = self
            .providers
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Data provider '{name}' is not registered"))?;
        provider().await
    }
}

/// One expanded invocation of a parameterised test
#[derive(Clone, Debug, PartialEq)]
pub struct DataCase {
    pub label: String,
    /// `method[label]`
    pub case_name: String,
    pub row: Value,
}

/// Expand provider rows into named cases.
///
/// A row's label is its `name` field, or its index when it has none. A label
/// already taken by an earlier row gets `#<index>` appended.
pub fn expand_rows(method: &str, rows: Vec<Value>) -> Vec<DataCase> {
    let mut taken = HashSet::new();
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let (mut label, row) = match row {
                Value::Object(mut map) => match map.remove("name") {
                    Some(Value::String(name)) => (name, Value::Object(map)),
                    Some(other) => (other.to_string(), Value::Object(map)),
                    None => (index.to_string(), Value::Object(map)),
                },
                other => (index.to_string(), other),
            };
            while !taken.insert(label.clone()) {
                label = format!("{label}#{index}");
            }
            DataCase {
                case_name: format!("{method}[{label}]"),
                label,
                row,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expand_rows_labels() {
        let cases = expand_rows(
            "test_login",
            vec![
                json!({"name": "admin", "user": "root"}),
                json!({"user": "guest"}),
                json!([1, 2]),
            ],
        );

        let names: Vec<_> = cases.iter().map(|c| c.case_name.as_str()).collect();
        assert_eq!(names, vec!["test_login[admin]", "test_login[1]", "test_login[2]"]);
        assert_eq!(cases[0].row, json!({"user": "root"}));
        assert_eq!(cases[2].row, json!([1, 2]));
    }

    #[test]
    fn test_expand_rows_repeated_labels() {
        let cases = expand_rows(
            "test_login",
            vec![
                json!({"name": "dup", "ok": false}),
                json!({"name": "dup", "ok": true}),
                json!({"name": 2}),
                json!({"user": "guest"}),
            ],
        );

        let labels: Vec<_> = cases.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["dup", "dup#1", "2", "3"]);

        let cases = expand_rows("test_login", vec![json!({"user": "a"}), json!({"name": 0})]);
        let labels: Vec<_> = cases.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["0", "0#1"]);
    }

    #[tokio::test]
    async fn test_rows_lookup() {
        let mut registry = DataProviderRegistry::new();
        registry.register_rows("users", vec![json!({"user": "a"})]);

        assert_eq!(registry.rows("users").await.unwrap().len(), 1);
        let err = registry.rows("missing").await.unwrap_err();
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn test_failing_provider() {
        let mut registry = DataProviderRegistry::new();
        registry.register("flaky", || async { anyhow::bail!("database offline") });

        let err = tokio_test::block_on(registry.rows("flaky")).unwrap_err();
        assert_eq!(err.to_string(), "database offline");
    }
}
