use core::fmt;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("invalid parameters '{parameters}': {reason}")]
    InvalidParameters { parameters: String, reason: String },
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("{0}")]
    Failed(String),
}

/// Builds a `T` from a creation context.
pub trait Factory<T, Ctx>: Send + Sync {
    fn create(&self, ctx: &Ctx) -> Result<T, FactoryError>;
}

impl<T, Ctx, F> Factory<T, Ctx> for F
where
    F: Fn(&Ctx) -> Result<T, FactoryError> + Send + Sync,
{
    fn create(&self, ctx: &Ctx) -> Result<T, FactoryError> {
        self(ctx)
    }
}

/// Name to factory table.
///
/// Registration is expected at start-up or script load; lookups dominate afterwards. Objects
/// created earlier keep working after their factory is unregistered because they never hold a
/// reference to the registry.
pub struct FactoryRegistry<T, Ctx> {
    kind: &'static str,
    factories: RwLock<HashMap<String, Arc<dyn Factory<T, Ctx>>>>,
}

impl<T, Ctx> FactoryRegistry<T, Ctx> {
    /// `kind` only shows up in log output ("node", "condition", ...).
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Returns `false` and keeps the existing factory if `name` is taken.
    pub fn register(&self, name: impl Into<String>, factory: Arc<dyn Factory<T, Ctx>>) -> bool {
        let name = name.into();
        let mut factories = self.factories.write().unwrap_or_else(PoisonError::into_inner);
        if factories.contains_key(&name) {
            debug!(kind = self.kind, name = %name, "factory already registered");
            return false;
        }
        factories.insert(name, factory);
        true
    }

    pub fn register_fn<F>(&self, name: impl Into<String>, factory: F) -> bool
    where
        F: Fn(&Ctx) -> Result<T, FactoryError> + Send + Sync + 'static,
        T: 'static,
        Ctx: 'static,
    {
        self.register(name, Arc::new(factory))
    }

    /// Returns `false` if nothing was registered under `name`.
    pub fn unregister(&self, name: &str) -> bool {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Creates an instance. Unknown names, factory errors and factory panics all yield `None`
    /// and a warning.
    pub fn create(&self, name: &str, ctx: &Ctx) -> Option<T> {
        // The lock is released before the factory runs so factories may register others.
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        let Some(factory) = factory else {
            warn!(kind = self.kind, name, "no factory registered");
            return None;
        };

        match catch_unwind(AssertUnwindSafe(|| factory.create(ctx))) {
            Ok(Ok(instance)) => Some(instance),
            Ok(Err(err)) => {
                warn!(kind = self.kind, name, error = %err, "factory failed");
                None
            }
            Err(_) => {
                warn!(kind = self.kind, name, "factory panicked");
                None
            }
        }
    }
}

impl<T, Ctx> fmt::Debug for FactoryRegistry<T, Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("kind", &self.kind)
            .field("names", &self.names())
            .finish()
    }
}
