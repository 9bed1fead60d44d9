//! Handlebars template engine integration.

use handlebars::{Handlebars, HelperDef};
use parking_lot::RwLock;

use crate::{Format, Result, Template, TemplateEngine};

/// Handlebars-based template engine for emails.
///
/// Registered for the `hbs` and `handlebars` extensions. Strict mode is on,
/// so a template referencing a missing local fails instead of rendering an
/// empty string.
///
/// HTML templates are rendered with HTML escaping; text and other formats
/// are rendered verbatim. Located templates are compiled once and kept,
/// registered under their path.
pub struct HandlebarsEngine {
    html: RwLock<Handlebars<'static>>,
    text: RwLock<Handlebars<'static>>,
}

impl HandlebarsEngine {
    /// Create a new Handlebars engine.
    pub fn new() -> Self {
        let mut html = Handlebars::new();
        html.set_strict_mode(true);

        let mut text = Handlebars::new();
        text.set_strict_mode(true);
        text.register_escape_fn(handlebars::no_escape);

        Self {
            html: RwLock::new(html),
            text: RwLock::new(text),
        }
    }

    /// Disable strict mode.
    pub fn lenient(mut self) -> Self {
        self.html.get_mut().set_strict_mode(false);
        self.text.get_mut().set_strict_mode(false);
        self
    }

    /// Register helpers.
    pub fn register_helper<H: HelperDef + Clone + Send + Sync + 'static>(
        mut self,
        name: &str,
        helper: H,
    ) -> Self {
        self.html.get_mut().register_helper(name, Box::new(helper.clone()));
        self.text.get_mut().register_helper(name, Box::new(helper));
        self
    }

    /// Register a partial template.
    pub fn register_partial(mut self, name: &str, content: &str) -> Result<Self> {
        self.html.get_mut().register_partial(name, content)?;
        self.text.get_mut().register_partial(name, content)?;
        Ok(self)
    }

    /// Check if a template was compiled and registered.
    pub fn is_compiled(&self, template: &Template) -> bool {
        self.registry(template.format())
            .read()
            .has_template(&registered_name(template))
    }

    fn registry(&self, format: &Format) -> &RwLock<Handlebars<'static>> {
        match format {
            Format::Html => &self.html,
            _ => &self.text,
        }
    }
}

fn registered_name(template: &Template) -> String {
    template.path().to_string_lossy().into_owned()
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn render(&self, template: &Template, context: &serde_json::Value) -> Result<String> {
        let registry = self.registry(template.format()).read();
        let name = registered_name(template);

        if registry.has_template(&name) {
            Ok(registry.render(&name, context)?)
        } else {
            Ok(registry.render_template(template.source(), context)?)
        }
    }

    fn prepare(&self, template: &Template) -> Result<()> {
        self.registry(template.format())
            .write()
            .register_template_string(&registered_name(template), template.source())?;
        Ok(())
    }
}
