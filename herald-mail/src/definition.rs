//! Mailer declarations.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{Email, HeaderField, Locals, Result};

type BeforeHook = dyn Fn(&mut Email, &Locals) -> Result<()> + Send + Sync;

/// The static declaration of a mailer: header rules, template binding and a
/// pre-delivery hook.
///
/// ```
/// use herald_mail::{HeaderField, Locals, MailerDefinition};
///
/// let welcome = MailerDefinition::new("Users::WelcomeMailer")
///     .from("noreply@example.com")
///     .to(HeaderField::deferred(|locals: &Locals| {
///         Ok(locals.fetch("user")?["email"].as_str().unwrap_or_default().to_string())
///     }))
///     .subject("Welcome")
///     .layout("mailer");
///
/// assert_eq!(welcome.name(), Some("Users::WelcomeMailer"));
/// ```
#[derive(Clone, Default)]
pub struct MailerDefinition {
    name: Option<String>,
    template: Option<String>,
    layout: Option<String>,
    from: Option<HeaderField>,
    to: Option<HeaderField>,
    cc: Option<HeaderField>,
    bcc: Option<HeaderField>,
    reply_to: Option<HeaderField>,
    return_path: Option<HeaderField>,
    subject: Option<HeaderField>,
    context: Map<String, Value>,
    before: Option<Arc<BeforeHook>>,
}

impl MailerDefinition {
    /// Declare a mailer identified by `name` (e.g. `Web::Mailers::SignupMailer`).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Declare a mailer without an identifier.
    ///
    /// It can only be used with an explicit [`template`](Self::template).
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Set the sender.
    pub fn from(mut self, value: impl Into<HeaderField>) -> Self {
        self.from = Some(value.into());
        self
    }

    /// Set the to recipients.
    pub fn to(mut self, value: impl Into<HeaderField>) -> Self {
        self.to = Some(value.into());
        self
    }

    /// Set the cc recipients.
    pub fn cc(mut self, value: impl Into<HeaderField>) -> Self {
        self.cc = Some(value.into());
        self
    }

    /// Set the bcc recipients.
    pub fn bcc(mut self, value: impl Into<HeaderField>) -> Self {
        self.bcc = Some(value.into());
        self
    }

    /// Set the reply-to addresses.
    pub fn reply_to(mut self, value: impl Into<HeaderField>) -> Self {
        self.reply_to = Some(value.into());
        self
    }

    /// Set the return path (envelope sender).
    pub fn return_path(mut self, value: impl Into<HeaderField>) -> Self {
        self.return_path = Some(value.into());
        self
    }

    /// Set the subject.
    pub fn subject(mut self, value: impl Into<HeaderField>) -> Self {
        self.subject = Some(value.into());
        self
    }

    /// Use an explicit template name instead of the one derived from the
    /// mailer name.
    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self
    }

    /// Render parts inside the layout with this name.
    pub fn layout(mut self, name: impl Into<String>) -> Self {
        self.layout = Some(name.into());
        self
    }

    /// Expose a value to every template of this mailer.
    ///
    /// Locals with the same key take precedence.
    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Run a hook on the assembled message before delivery, typically to add
    /// attachments.
    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Email, &Locals) -> Result<()> + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(hook));
        self
    }

    /// The mailer identifier.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The identifier template lookup starts from: the explicit template if
    /// declared, the mailer name otherwise.
    pub fn template_identifier(&self) -> Option<&str> {
        self.template.as_deref().or(self.name.as_deref())
    }

    /// The declared layout.
    pub fn layout_name(&self) -> Option<&str> {
        self.layout.as_deref()
    }

    /// The key this mailer is registered under.
    pub fn registry_key(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.template.as_ref().map(|t| format!("<template:{}>", t)))
            .unwrap_or_else(|| "<anonymous>".to_string())
    }

    pub(crate) fn field(&self, field: Field) -> Option<&HeaderField> {
        match field {
            Field::From => self.from.as_ref(),
            Field::To => self.to.as_ref(),
            Field::Cc => self.cc.as_ref(),
            Field::Bcc => self.bcc.as_ref(),
            Field::ReplyTo => self.reply_to.as_ref(),
            Field::ReturnPath => self.return_path.as_ref(),
            Field::Subject => self.subject.as_ref(),
        }
    }

    pub(crate) fn scope(&self) -> &Map<String, Value> {
        &self.context
    }

    pub(crate) fn run_before(&self, email: &mut Email, locals: &Locals) -> Result<()> {
        match &self.before {
            Some(hook) => hook(email, locals),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for MailerDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailerDefinition")
            .field("name", &self.name)
            .field("template", &self.template)
            .field("layout", &self.layout)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("cc", &self.cc)
            .field("bcc", &self.bcc)
            .field("reply_to", &self.reply_to)
            .field("return_path", &self.return_path)
            .field("subject", &self.subject)
            .field("before", &self.before.is_some())
            .finish()
    }
}

/// Header fields a mailer can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    From,
    To,
    Cc,
    Bcc,
    ReplyTo,
    ReturnPath,
    Subject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_identifier_prefers_explicit_template() {
        let mailer = MailerDefinition::new("InvoiceMailer").template("invoice");
        assert_eq!(mailer.template_identifier(), Some("invoice"));

        let mailer = MailerDefinition::new("LazyMailer");
        assert_eq!(mailer.template_identifier(), Some("LazyMailer"));

        assert_eq!(MailerDefinition::anonymous().template_identifier(), None);
    }

    #[test]
    fn test_registry_key() {
        assert_eq!(MailerDefinition::new("A").registry_key(), "A");
        assert_eq!(
            MailerDefinition::anonymous().template("invoice").registry_key(),
            "<template:invoice>"
        );
        assert_eq!(MailerDefinition::anonymous().registry_key(), "<anonymous>");
    }

    #[test]
    fn test_before_hook_runs() {
        let mailer = MailerDefinition::new("Hooked").before(|email, _| {
            email.subject = Some("set by hook".into());
            Ok(())
        });

        let mut email = Email::new();
        mailer.run_before(&mut email, &Locals::new()).unwrap();
        assert_eq!(email.subject.as_deref(), Some("set by hook"));
    }
}
