//! Rendering and delivering declared mailers.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::definition::Field;
use crate::{
    Address, BodyPart, Configuration, Email, FieldValue, Format, Locals, MailError,
    MailerDefinition, Result, Template, TemplateSet,
};

/// Name under which a layout receives the rendered template.
pub const LAYOUT_CONTENT_KEY: &str = "content";

/// Outcome of a successful delivery.
#[derive(Debug, Clone)]
pub struct SentMessage {
    message_id: String,
    email: Email,
}

impl SentMessage {
    /// The generated `Message-ID`.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// The message handed to the transport.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Take the delivered message.
    pub fn into_email(self) -> Email {
        self.email
    }
}

/// A mailer bound to a finalized configuration.
///
/// Holds no per-delivery state: one instance can serve concurrent
/// deliveries, each with its own [`Locals`].
#[derive(Clone)]
pub struct Mailer {
    config: Arc<Configuration>,
    definition: Arc<MailerDefinition>,
}

impl Mailer {
    /// Bind a definition to a configuration.
    ///
    /// The definition must be the one registered before the configuration
    /// was finalized (as returned by [`Configuration::definition`]),
    /// otherwise rendering and delivery fail with [`MailError::UnknownMailer`].
    pub fn new(config: Arc<Configuration>, definition: Arc<MailerDefinition>) -> Self {
        Self { config, definition }
    }

    /// The mailer definition.
    pub fn definition(&self) -> &MailerDefinition {
        &self.definition
    }

    /// The configuration this mailer delivers with.
    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.config
    }

    /// The templates of this mailer.
    ///
    /// Fails with [`MailError::UnknownMailer`] unless this exact definition
    /// was registered; another definition sharing its name does not count.
    pub fn templates(&self) -> Result<&TemplateSet> {
        let name = self.definition.registry_key();
        let registered = self.config.definition(&name)?;
        if !Arc::ptr_eq(&registered, &self.definition) {
            return Err(MailError::UnknownMailer(name));
        }
        self.config.templates(&name)
    }

    /// Render one format without delivering.
    pub fn render(&self, format: impl Into<Format>, locals: &Locals) -> Result<String> {
        let format = format.into();
        let templates = self.templates()?.load()?;

        let template = templates
            .templates
            .get(&format)
            .ok_or_else(|| MailError::TemplateNotFound(format!("{}.{}", templates.name, format)))?;

        self.render_template(template, templates.layouts.get(&format), locals)
    }

    /// Assemble the message for `locals` without handing it to the transport.
    ///
    /// Header fields are resolved first, then every requested format that
    /// has a template is rendered, then the `before` hook runs on the result.
    pub fn build(&self, locals: &Locals) -> Result<Email> {
        let templates = self.templates()?;

        let from = self.addresses(Field::From, locals)?;
        let to = self.addresses(Field::To, locals)?;
        let cc = self.addresses(Field::Cc, locals)?;
        let bcc = self.addresses(Field::Bcc, locals)?;
        let reply_to = self.addresses(Field::ReplyTo, locals)?;
        let return_path = self.addresses(Field::ReturnPath, locals)?.into_iter().next();
        let subject = self
            .resolve(Field::Subject, locals)?
            .and_then(|value| value.first().map(str::to_string));

        let charset = locals
            .requested_charset()
            .unwrap_or_else(|| self.config.default_charset())
            .to_string();

        let loaded = templates.load()?;
        let plan: Vec<Format> = match locals.requested_format() {
            Some(format) => vec![format],
            None => loaded.templates.keys().cloned().collect(),
        };

        let mut email = Email::new().charset(charset.as_str());
        for format in plan {
            match loaded.templates.get(&format) {
                Some(template) => {
                    let body =
                        self.render_template(template, loaded.layouts.get(&format), locals)?;
                    email.set_part(BodyPart::new(format, body, charset.as_str()));
                }
                None => debug!(
                    template = %loaded.name,
                    format = %format,
                    "No template for requested format, skipping part"
                ),
            }
        }

        email.from = from;
        email.to = to;
        email.cc = cc;
        email.bcc = bcc;
        email.reply_to = reply_to;
        email.return_path = return_path;
        email.subject = subject;
        email.delivery_method = Some(self.config.delivery_method().name().to_string());

        self.definition.run_before(&mut email, locals)?;

        Ok(email)
    }

    /// Assemble the message and hand it to the configured transport.
    ///
    /// A transport rejection naming a missing sender or recipient becomes
    /// [`MailError::MissingDeliveryData`]; every other error is returned
    /// as is.
    pub async fn deliver(&self, locals: Locals) -> Result<SentMessage> {
        let mut email = self.build(&locals)?;

        let message_id = format!("<{}@herald>", uuid::Uuid::new_v4());
        email.message_id = Some(message_id.clone());

        debug!(
            mailer = %self.definition.registry_key(),
            formats = ?email.parts.iter().map(|p| p.format.as_str()).collect::<Vec<_>>(),
            charset = %email.charset,
            attachments = email.attachments.len(),
            "Delivering email"
        );

        match self.config.transport().send(&email).await {
            Ok(()) => Ok(SentMessage { message_id, email }),
            Err(err) if err.is_missing_address() => {
                debug!(error = %err, "Transport rejected message without sender or recipient");
                Err(MailError::MissingDeliveryData)
            }
            Err(err) => Err(err),
        }
    }

    fn resolve(&self, field: Field, locals: &Locals) -> Result<Option<FieldValue>> {
        match self.definition.field(field) {
            Some(header) => header.resolve(locals),
            None => Ok(None),
        }
    }

    fn addresses(&self, field: Field, locals: &Locals) -> Result<Vec<Address>> {
        match self.resolve(field, locals)? {
            Some(value) => Address::parse_all(&value),
            None => Ok(Vec::new()),
        }
    }

    /// Mailer scope overlaid by the caller's locals, reserved keys excluded.
    fn context(&self, locals: &Locals) -> Map<String, Value> {
        let mut context = self.definition.scope().clone();
        context.extend(locals.template_context());
        context
    }

    fn render_template(
        &self,
        template: &Template,
        layout: Option<&Template>,
        locals: &Locals,
    ) -> Result<String> {
        let mut context = self.context(locals);
        let body = template.render(&Value::Object(context.clone()))?;

        match layout {
            Some(layout) => {
                context.insert(LAYOUT_CONTENT_KEY.to_string(), Value::String(body));
                layout.render(&Value::Object(context))
            }
            None => Ok(body),
        }
    }
}

impl fmt::Debug for Mailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailer")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, feature = "handlebars"))]
mod tests {
    use super::*;
    use crate::{DeliveryMethod, TestTransport};
    use std::fs;
    use tempfile::TempDir;

    fn configure(dir: &TempDir, definition: MailerDefinition) -> Mailer {
        let name = definition.registry_key();
        let config = Configuration::builder()
            .root(dir.path())
            .delivery_method(DeliveryMethod::Test(TestTransport::new()))
            .mailer(definition)
            .finalize()
            .unwrap();
        config.mailer(&name).unwrap()
    }

    #[test]
    fn test_render_with_scope_and_locals() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("greeting.txt.hbs"),
            "{{greeting}}, {{name}}",
        )
        .unwrap();

        let mailer = configure(
            &dir,
            MailerDefinition::new("Greeting")
                .context("greeting", "Hello")
                .context("name", "nobody"),
        );

        let locals = Locals::new().with("name", "Ada").format("txt");
        assert_eq!(mailer.render("txt", &locals).unwrap(), "Hello, Ada");
    }

    #[test]
    fn test_render_missing_format() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("greeting.html.hbs"), "<p>hi</p>").unwrap();

        let mailer = configure(&dir, MailerDefinition::new("Greeting"));
        let err = mailer.render(Format::Txt, &Locals::new()).unwrap_err();
        assert!(matches!(err, MailError::TemplateNotFound(name) if name == "greeting.txt"));
    }

    #[test]
    fn test_layout_wraps_content() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("layouts")).unwrap();
        fs::write(dir.path().join("layouts/mailer.html.hbs"), "<body>{{{content}}}</body>").unwrap();
        fs::write(dir.path().join("invoice.html.hbs"), "<p>{{total}}</p>").unwrap();
        fs::write(dir.path().join("invoice.txt.hbs"), "Total: {{total}}").unwrap();

        let mailer = configure(&dir, MailerDefinition::new("Invoice").layout("mailer"));
        let locals = Locals::new().with("total", 42);

        assert_eq!(mailer.render("html", &locals).unwrap(), "<body><p>42</p></body>");
        assert_eq!(mailer.render("txt", &locals).unwrap(), "Total: 42");
    }

    #[test]
    fn test_layout_sharing_the_template_name() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("layouts")).unwrap();
        fs::write(dir.path().join("layouts/notice.html.hbs"), "<body>{{{content}}}</body>").unwrap();
        fs::write(dir.path().join("notice.html.hbs"), "<p>{{title}}</p>").unwrap();

        let plain = configure(&dir, MailerDefinition::new("Notice"));
        let locals = Locals::new().with("title", "Closed");
        assert_eq!(plain.render("html", &locals).unwrap(), "<p>Closed</p>");

        let wrapped = configure(&dir, MailerDefinition::new("Notice").layout("notice"));
        assert_eq!(wrapped.render("html", &locals).unwrap(), "<body><p>Closed</p></body>");
    }

    #[test]
    fn test_build_uses_registered_templates() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("welcome.html.hbs"), "<h1>Hi</h1>").unwrap();

        let mailer = configure(
            &dir,
            MailerDefinition::new("Welcome")
                .from("a@x.com")
                .to(["b@x.com", "c@x.com"])
                .return_path("bounces@x.com"),
        );

        let email = mailer.build(&Locals::new()).unwrap();
        assert_eq!(email.to.len(), 2);
        assert_eq!(email.return_path.unwrap().email, "bounces@x.com");
        assert_eq!(email.delivery_method.as_deref(), Some("test"));
        assert!(email.message_id.is_none());
    }

    #[test]
    fn test_unregistered_definition() {
        let dir = TempDir::new().unwrap();
        let config = Configuration::builder()
            .root(dir.path())
            .delivery_method(DeliveryMethod::Test(TestTransport::new()))
            .finalize()
            .unwrap();

        let mailer = Mailer::new(config, Arc::new(MailerDefinition::new("Stray")));
        assert!(matches!(mailer.build(&Locals::new()), Err(MailError::UnknownMailer(_))));
    }

    #[tokio::test]
    async fn test_definition_sharing_a_registered_name_is_unknown() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("welcome.txt.hbs"), "welcome body").unwrap();
        let outbox = TestTransport::new();
        let config = Configuration::builder()
            .root(dir.path())
            .delivery_method(DeliveryMethod::Test(outbox.clone()))
            .mailer(MailerDefinition::new("Welcome").from("a@x.com").to("b@x.com"))
            .finalize()
            .unwrap();

        let lookalike = MailerDefinition::new("Welcome")
            .template("other")
            .from("z@x.com")
            .to("b@x.com");
        let mailer = Mailer::new(Arc::clone(&config), Arc::new(lookalike));

        let err = mailer.deliver(Locals::new()).await.unwrap_err();
        assert!(matches!(err, MailError::UnknownMailer(name) if name == "Welcome"));
        assert!(matches!(mailer.render("txt", &Locals::new()), Err(MailError::UnknownMailer(_))));
        assert!(outbox.is_empty());

        let registered = Mailer::new(Arc::clone(&config), config.definition("Welcome").unwrap());
        registered.deliver(Locals::new()).await.unwrap();
        assert_eq!(outbox.last().unwrap().from[0].email(), "a@x.com");
    }
}
