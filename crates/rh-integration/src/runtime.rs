//! Process runtime
//!
//! Holds what every session shares: the configuration and the registry of
//! available cores. Created explicitly once; sessions keep it alive.

use crate::session::Session;
use rh_core::Config;
use rh_loader::CoreRegistry;
use std::sync::Arc;

pub struct Runtime {
    config: Config,
    registry: CoreRegistry,
}

impl Runtime {
    /// Runtime with the built-in cores registered
    pub fn new(config: Config) -> Arc<Self> {
        Self::with_registry(config, CoreRegistry::with_builtin())
    }

    pub fn with_registry(config: Config, registry: CoreRegistry) -> Arc<Self> {
        tracing::info!(
            "Runtime initialized with cores: {}",
            registry.names().join(", ")
        );
        Arc::new(Self { config, registry })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &CoreRegistry {
        &self.registry
    }

    /// New session in the `Uninitialized` state
    pub fn new_session(self: &Arc<Self>) -> Session {
        Session::new(Arc::clone(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;

    #[test]
    fn test_runtime_creates_independent_sessions() {
        let runtime = Runtime::new(Config::default());
        assert!(runtime.registry().contains("testpattern"));

        let a = runtime.new_session();
        let b = runtime.new_session();
        assert_eq!(a.state(), SessionState::Uninitialized);
        assert_eq!(b.state(), SessionState::Uninitialized);
        assert_eq!(Arc::strong_count(&runtime), 3);
    }
}
