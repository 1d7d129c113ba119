//! Test discovery
//!
//! Explicit registries standing in for reflection: classes, global listeners
//! and data providers are registered once at startup and looked up by name.

mod class;
mod listeners;
mod providers;
mod registry;

pub use class::{ClassBuilder, ClassHooks, Hook, TestClass, TestContext, TestMethod, TestReturn};
pub use listeners::ListenerRegistry;
pub use providers::{expand_rows, DataCase, DataProviderRegistry};
pub use registry::ClassRegistry;

pub(crate) use class::panic_message;
