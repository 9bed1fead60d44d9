//! # Herald Mail
//!
//! Declarative mailers whose bodies come from templates found by naming
//! convention, assembled into multipart messages and handed to a transport.
//!
//! ## Features
//!
//! - **Mailer definitions**: literal or deferred `from`/`to`/`cc`/`bcc`/
//!   `reply_to`/`return_path`/`subject`, evaluated per delivery
//! - **Convention-based templates**: `<root>/**/<template_name>.<format>.<engine>`,
//!   with the template name derived from the mailer name
//! - **Template engines**: Handlebars (default), Tera or MiniJinja
//! - **Layouts**: optional per-format layouts under `<root>/layouts`
//! - **Transports**: SMTP, `.eml` files, in-memory test deliveries or your own
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use herald_mail::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // templates/welcome_mailer.html.hbs and templates/welcome_mailer.txt.hbs
//!     let config = Configuration::builder()
//!         .root("templates")
//!         .delivery_method(DeliveryMethod::Smtp(SmtpConfig::new("smtp.example.com")))
//!         .mailer(
//!             MailerDefinition::new("WelcomeMailer")
//!                 .from("noreply@example.com")
//!                 .to(HeaderField::deferred(|locals: &Locals| {
//!                     Ok(locals.fetch_str("email")?.to_string())
//!                 }))
//!                 .subject("Welcome!"),
//!         )
//!         .finalize()?;
//!
//!     let mailer = config.mailer("WelcomeMailer")?;
//!     mailer
//!         .deliver(Locals::new().with("email", "user@example.com").with("name", "Ada"))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! Pass `format` in the locals to render a single part, and `charset` to
//! override the configured default charset.

mod address;
mod attachment;
mod config;
mod definition;
mod email;
mod engine;
mod error;
mod finder;
mod format;
mod header;
mod locals;
mod mailer;
mod settings;
mod template;
pub mod template_name;
mod transport;

#[cfg(feature = "handlebars")]
mod template_handlebars;

#[cfg(feature = "tera")]
mod template_tera;

#[cfg(feature = "minijinja")]
mod template_minijinja;

pub use address::{Address, IntoAddress};
pub use attachment::{Attachment, ContentDisposition};
pub use config::{Configuration, ConfigurationBuilder, DeliveryMethod};
pub use definition::MailerDefinition;
pub use email::{BodyPart, Email, DEFAULT_CHARSET};
pub use engine::EngineRegistry;
pub use error::{MailError, Result};
pub use finder::{TemplatesFinder, LAYOUTS_DIR};
pub use format::Format;
pub use header::{FieldValue, HeaderField};
pub use locals::{Locals, CHARSET_KEY, FORMAT_KEY};
pub use mailer::{Mailer, SentMessage, LAYOUT_CONTENT_KEY};
pub use settings::{DeliveryKind, MailerSettings, SmtpSettings, ENV_PREFIX};
pub use template::{Template, TemplateSet, Templates};
pub use transport::{
    FileTransport, SmtpConfig, SmtpSecurity, SmtpTransport, TestTransport, Transport,
};

#[cfg(feature = "handlebars")]
pub use template_handlebars::HandlebarsEngine;

#[cfg(feature = "tera")]
pub use template_tera::TeraEngine;

#[cfg(feature = "minijinja")]
pub use template_minijinja::MiniJinjaEngine;

/// Template engine trait for rendering email templates.
///
/// Engines are registered per file extension in an [`EngineRegistry`].
/// HTML escaping applies to [`Format::Html`] templates only; every other
/// format is rendered verbatim.
pub trait TemplateEngine: Send + Sync {
    /// Render a located template with the given context (a JSON object).
    fn render(&self, template: &Template, context: &serde_json::Value) -> Result<String>;

    /// Called once when a template is located: check its syntax and keep
    /// whatever compiled form [`render`](Self::render) can reuse.
    fn prepare(&self, _template: &Template) -> Result<()> {
        Ok(())
    }
}

/// Prelude for common imports.
///
/// ```
/// use herald_mail::prelude::*;
/// ```
pub mod prelude {
    pub use crate::address::{Address, IntoAddress};
    pub use crate::attachment::{Attachment, ContentDisposition};
    pub use crate::config::{Configuration, ConfigurationBuilder, DeliveryMethod};
    pub use crate::definition::MailerDefinition;
    pub use crate::email::{BodyPart, Email};
    pub use crate::error::{MailError, Result};
    pub use crate::format::Format;
    pub use crate::header::{FieldValue, HeaderField};
    pub use crate::locals::Locals;
    pub use crate::template::Template;
    pub use crate::mailer::{Mailer, SentMessage};
    pub use crate::settings::MailerSettings;
    pub use crate::transport::{
        FileTransport, SmtpConfig, SmtpSecurity, SmtpTransport, TestTransport, Transport,
    };
    pub use crate::TemplateEngine;

    #[cfg(feature = "handlebars")]
    pub use crate::HandlebarsEngine;

    #[cfg(feature = "tera")]
    pub use crate::TeraEngine;

    #[cfg(feature = "minijinja")]
    pub use crate::MiniJinjaEngine;
}
