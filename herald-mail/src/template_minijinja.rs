//! MiniJinja template engine integration for email templates
//!
//! This module requires the `minijinja` feature to be enabled:
//!
//! ```toml
//! [dependencies]
//! herald-mail = { version = "0.1", features = ["minijinja"] }
//! ```

use minijinja::Environment;

use crate::{Format, Result, Template, TemplateEngine};

/// MiniJinja template engine for email rendering.
///
/// Registered for the `j2`, `jinja` and `jinja2` extensions. HTML templates
/// are autoescaped; other formats render verbatim.
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    /// Create a new MiniJinja engine.
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    /// Create an engine from a configured environment (filters, globals).
    pub fn with_environment(env: Environment<'static>) -> Self {
        Self { env }
    }
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// MiniJinja picks autoescaping from the name suffix.
fn render_name(template: &Template) -> String {
    let path = template.path().display();
    match template.format() {
        Format::Html => format!("{path}.html"),
        _ => path.to_string(),
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn render(&self, template: &Template, context: &serde_json::Value) -> Result<String> {
        Ok(self
            .env
            .render_named_str(&render_name(template), template.source(), context)?)
    }

    fn prepare(&self, template: &Template) -> Result<()> {
        Environment::new().template_from_str(template.source())?;
        Ok(())
    }
}
