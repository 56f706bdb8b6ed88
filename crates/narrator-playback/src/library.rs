//! Script lookup by name.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use narrator_core::error::EngineError;
use narrator_script::Script;
use tracing::{info, warn};

/// File extension of script sources on disk.
pub const SCRIPT_EXTENSION: &str = "nani";

/// Resolves scripts by name for navigation and preloading.
#[async_trait]
pub trait ScriptProvider: Send + Sync {
    /// Loads (or returns the cached) parse of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ScriptNotFound`] when no source exists.
    async fn load_script(&self, name: &str) -> Result<Arc<Script>, EngineError>;
}

/// In-memory script cache, optionally backed by a directory of
/// `<name>.nani` files.
#[derive(Debug, Default)]
pub struct ScriptLibrary {
    root: Option<PathBuf>,
    scripts: RwLock<HashMap<String, Arc<Script>>>,
}

impl ScriptLibrary {
    /// A library holding only inserted sources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A library that reads unknown scripts from `root`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            scripts: RwLock::default(),
        }
    }

    /// Parses `source` and replaces any cached script of that name.
    pub fn insert_source(&self, name: &str, source: &str) -> Arc<Script> {
        let script = Arc::new(Script::parse(name, source));
        let errors = script.parse_errors().count();
        if errors > 0 {
            warn!(script = name, errors, "script parsed with errors");
        }
        self.scripts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_owned(), script.clone());
        script
    }

    /// Names of cached scripts, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .scripts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn cached(&self, name: &str) -> Option<Arc<Script>> {
        self.scripts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.starts_with('/')
        && !name.contains('\\')
}

#[async_trait]
impl ScriptProvider for ScriptLibrary {
    async fn load_script(&self, name: &str) -> Result<Arc<Script>, EngineError> {
        if let Some(script) = self.cached(name) {
            return Ok(script);
        }
        let not_found = || EngineError::ScriptNotFound(name.to_owned());
        let Some(root) = &self.root else {
            return Err(not_found());
        };
        if !is_safe_name(name) {
            return Err(not_found());
        }

        let path = root.join(format!("{name}.{SCRIPT_EXTENSION}"));
        let source = match tokio::fs::read_to_string(&path).await {
            Ok(source) => source,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(err) => return Err(EngineError::Infrastructure(err.to_string())),
        };
        info!(script = name, path = %path.display(), "script loaded");
        Ok(self.insert_source(name, &source))
    }
}
