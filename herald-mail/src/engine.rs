//! Template engine registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::TemplateEngine;

/// Maps template file extensions (`hbs`, `tera`, `j2`, ...) to engines.
///
/// Only files whose last extension has a registered engine take part in
/// template lookup.
#[derive(Clone)]
pub struct EngineRegistry {
    engines: BTreeMap<String, Arc<dyn TemplateEngine>>,
}

impl EngineRegistry {
    /// Create a registry without any engine.
    pub fn empty() -> Self {
        Self {
            engines: BTreeMap::new(),
        }
    }

    /// Create a registry with every engine enabled by crate features.
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::empty();

        #[cfg(feature = "handlebars")]
        {
            let engine: Arc<dyn TemplateEngine> = Arc::new(crate::HandlebarsEngine::new());
            registry.insert_shared(&["hbs", "handlebars"], engine);
        }

        #[cfg(feature = "tera")]
        {
            let engine: Arc<dyn TemplateEngine> = Arc::new(crate::TeraEngine::new());
            registry.insert_shared(&["tera"], engine);
        }

        #[cfg(feature = "minijinja")]
        {
            let engine: Arc<dyn TemplateEngine> = Arc::new(crate::MiniJinjaEngine::new());
            registry.insert_shared(&["j2", "jinja", "jinja2"], engine);
        }

        registry
    }

    /// Register an engine for an extension, replacing any previous one.
    pub fn register(mut self, extension: &str, engine: impl TemplateEngine + 'static) -> Self {
        self.insert(extension, Arc::new(engine));
        self
    }

    /// Register a shared engine for an extension.
    pub fn insert(&mut self, extension: &str, engine: Arc<dyn TemplateEngine>) {
        self.engines
            .insert(extension.trim_start_matches('.').to_lowercase(), engine);
    }

    #[allow(dead_code)]
    fn insert_shared(&mut self, extensions: &[&str], engine: Arc<dyn TemplateEngine>) {
        for extension in extensions {
            self.insert(extension, Arc::clone(&engine));
        }
    }

    /// Look up the engine for an extension.
    pub fn get(&self, extension: &str) -> Option<Arc<dyn TemplateEngine>> {
        self.engines.get(&extension.to_lowercase()).cloned()
    }

    /// Check if an extension has an engine.
    pub fn supports(&self, extension: &str) -> bool {
        self.engines.contains_key(&extension.to_lowercase())
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("extensions", &self.engines.keys().collect::<Vec<_>>())
            .finish()
    }
}
