//! Core registry
//!
//! Maps core names to factories. A core file path resolves to a name by
//! stripping the directory, the extension and the usual libretro suffixes.

use crate::core::Core;
use crate::testpattern::TestPatternCore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Builds a fresh, unloaded core instance
pub type CoreFactory = Arc<dyn Fn() -> Box<dyn Core> + Send + Sync>;

const CORE_SUFFIXES: [&str; 2] = ["_libretro_android", "_libretro"];

/// Registry name for a core file path
///
/// `/data/cores/libsnes9x_libretro_android.so` and `snes9x_libretro.dll`
/// both resolve to `snes9x`.
pub fn normalize_core_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let mut name = stem.as_str();
    for suffix in CORE_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            name = stripped;
            break;
        }
    }
    if let Some(stripped) = name.strip_prefix("lib") {
        if !stripped.is_empty() {
            name = stripped;
        }
    }
    name.to_string()
}

/// Known cores, by name
pub struct CoreRegistry {
    factories: RwLock<HashMap<String, CoreFactory>>,
}

impl CoreRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Registry with the cores shipped in this crate
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register(TestPatternCore::NAME, || {
            Box::new(TestPatternCore::new()) as Box<dyn Core>
        });
        registry
    }

    /// Register a factory, replacing any previous one with the same name
    pub fn register<F>(&self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Core> + Send + Sync + 'static,
    {
        let name = name.to_ascii_lowercase();
        tracing::debug!("Registering core '{}'", name);
        self.factories.write().insert(name, Arc::new(factory));
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.factories.write().remove(&name.to_ascii_lowercase()).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(&name.to_ascii_lowercase())
    }

    /// Create a new instance of the named core
    pub fn instantiate(&self, name: &str) -> Option<Box<dyn Core>> {
        let factory = self.factories.read().get(&name.to_ascii_lowercase()).cloned()?;
        Some(factory())
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for CoreRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
