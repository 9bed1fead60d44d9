//! Located templates and the per-mailer template set.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::{template_name, Format, Result, TemplateEngine, TemplatesFinder};

/// A template file found on disk, bound to the engine for its extension.
///
/// The source is read and handed to the engine's
/// [`prepare`](TemplateEngine::prepare) when the template is located.
#[derive(Clone)]
pub struct Template {
    format: Format,
    path: PathBuf,
    extension: String,
    source: Arc<str>,
    engine: Arc<dyn TemplateEngine>,
}

impl Template {
    /// Load a template file.
    pub fn load(
        path: PathBuf,
        format: Format,
        extension: String,
        engine: Arc<dyn TemplateEngine>,
    ) -> Result<Self> {
        let source = std::fs::read_to_string(&path)?;
        Self::from_source(path, format, extension, source, engine)
    }

    /// Build a template from a source already in memory.
    ///
    /// `path` names the template towards the engine; it is not read.
    pub fn from_source(
        path: impl Into<PathBuf>,
        format: Format,
        extension: impl Into<String>,
        source: impl Into<Arc<str>>,
        engine: Arc<dyn TemplateEngine>,
    ) -> Result<Self> {
        let template = Self {
            format,
            path: path.into(),
            extension: extension.into(),
            source: source.into(),
            engine,
        };
        template.engine.prepare(&template)?;
        Ok(template)
    }

    /// Render with the given context.
    pub fn render(&self, context: &serde_json::Value) -> Result<String> {
        self.engine.render(self, context)
    }

    /// The format of this template.
    pub fn format(&self) -> &Format {
        &self.format
    }

    /// The absolute path of the template file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The engine extension (`hbs`, `tera`, ...).
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// The template source.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("format", &self.format)
            .field("path", &self.path)
            .field("extension", &self.extension)
            .finish()
    }
}

/// Templates and layouts discovered for one mailer.
#[derive(Debug, Default)]
pub struct Templates {
    /// The template key the files were looked up with.
    pub name: String,
    /// Templates by format.
    pub templates: BTreeMap<Format, Template>,
    /// Layouts by format (empty without a declared layout).
    pub layouts: BTreeMap<Format, Template>,
}

/// The lazily discovered, memoized templates of a mailer definition.
///
/// Discovery happens on first access. Concurrent first accesses may each
/// scan the filesystem, but only one result is stored and every caller
/// observes that same value afterwards.
pub struct TemplateSet {
    identifier: Option<String>,
    layout: Option<String>,
    namespace: String,
    finder: Arc<TemplatesFinder>,
    cache: RwLock<Option<Arc<Templates>>>,
}

impl TemplateSet {
    /// Create a template set; nothing is read until first access.
    pub fn new(
        identifier: Option<String>,
        layout: Option<String>,
        namespace: impl Into<String>,
        finder: Arc<TemplatesFinder>,
    ) -> Self {
        Self {
            identifier,
            layout,
            namespace: namespace.into(),
            finder,
            cache: RwLock::new(None),
        }
    }

    /// The resolved template key.
    pub fn template_name(&self) -> Result<String> {
        template_name::resolve(self.identifier.as_deref(), &self.namespace)
    }

    /// Every template and layout, discovering them if needed.
    pub fn load(&self) -> Result<Arc<Templates>> {
        if let Some(templates) = self.cache.read().as_ref() {
            return Ok(Arc::clone(templates));
        }

        let discovered = Arc::new(self.discover()?);

        let mut cache = self.cache.write();
        let stored = cache.get_or_insert(discovered);
        Ok(Arc::clone(stored))
    }

    /// Templates by format.
    pub fn all(&self) -> Result<BTreeMap<Format, Template>> {
        Ok(self.load()?.templates.clone())
    }

    /// The template for a format, if one exists.
    pub fn get(&self, format: &Format) -> Result<Option<Template>> {
        Ok(self.load()?.templates.get(format).cloned())
    }

    /// The layout for a format, if a layout is declared and exists.
    pub fn layout(&self, format: &Format) -> Result<Option<Template>> {
        Ok(self.load()?.layouts.get(format).cloned())
    }

    /// Check if discovery already ran.
    pub fn is_loaded(&self) -> bool {
        self.cache.read().is_some()
    }

    /// Forget the discovered templates; the next access scans again.
    pub fn invalidate(&self) {
        self.cache.write().take();
    }

    fn discover(&self) -> Result<Templates> {
        let name = self.template_name()?;
        let templates = self.finder.find(&name)?;

        let layouts = match &self.layout {
            Some(layout) => {
                let layout_name = template_name::resolve(Some(layout), &self.namespace)?;
                self.finder.find_layout(&layout_name)?
            }
            None => BTreeMap::new(),
        };

        debug!(
            template = %name,
            formats = ?templates.keys().map(Format::as_str).collect::<Vec<_>>(),
            layouts = ?layouts.keys().map(Format::as_str).collect::<Vec<_>>(),
            "Discovered mailer templates"
        );

        Ok(Templates {
            name,
            templates,
            layouts,
        })
    }
}

impl fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateSet")
            .field("identifier", &self.identifier)
            .field("layout", &self.layout)
            .field("namespace", &self.namespace)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
