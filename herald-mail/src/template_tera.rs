//! Tera template engine integration for email templates
//!
//! This module requires the `tera` feature to be enabled:
//!
//! ```toml
//! [dependencies]
//! herald-mail = { version = "0.1", features = ["tera"] }
//! ```

use parking_lot::RwLock;
use tera::{Context, Tera};

use crate::{Format, Result, Template, TemplateEngine};

/// Tera template engine, registered for the `tera` extension.
///
/// Autoescaping applies to HTML templates only, so plain text parts keep
/// their characters. Located templates are compiled into one shared `Tera`
/// instance.
#[derive(Debug)]
pub struct TeraEngine {
    tera: RwLock<Tera>,
}

impl TeraEngine {
    /// Create a new Tera engine.
    pub fn new() -> Self {
        Self {
            tera: RwLock::new(Tera::default()),
        }
    }

    /// Turn HTML autoescaping off for HTML templates as well.
    pub fn without_autoescape(mut self) -> Self {
        self.tera.get_mut().autoescape_on(Vec::new());
        self
    }
}

impl Default for TeraEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Tera autoescapes by name suffix; HTML templates get an `.html` suffix.
fn registered_name(template: &Template) -> String {
    let path = template.path().display();
    match template.format() {
        Format::Html => format!("{path}.html"),
        _ => path.to_string(),
    }
}

impl TemplateEngine for TeraEngine {
    fn render(&self, template: &Template, context: &serde_json::Value) -> Result<String> {
        let context = Context::from_value(context.clone())?;
        let name = registered_name(template);

        let tera = self.tera.read();
        if tera.get_template_names().any(|registered| registered == name) {
            Ok(tera.render(&name, &context)?)
        } else {
            let autoescape = *template.format() == Format::Html;
            Ok(Tera::one_off(template.source(), &context, autoescape)?)
        }
    }

    fn prepare(&self, template: &Template) -> Result<()> {
        self.tera
            .write()
            .add_raw_template(&registered_name(template), template.source())?;
        Ok(())
    }
}
