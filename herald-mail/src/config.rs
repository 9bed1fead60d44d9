//! Mailer configuration and the finalized mailer registry.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    EngineRegistry, FileTransport, MailError, Mailer, MailerDefinition, Result, SmtpConfig,
    SmtpTransport, TemplateEngine, TemplateSet, TemplatesFinder, TestTransport, Transport,
    DEFAULT_CHARSET,
};

/// Where assembled messages go.
#[derive(Clone)]
pub enum DeliveryMethod {
    /// Send over SMTP.
    Smtp(SmtpConfig),
    /// Write `.eml` files into a directory.
    File(PathBuf),
    /// Keep messages in memory.
    Test(TestTransport),
    /// Any other transport.
    Custom(Arc<dyn Transport>),
}

impl DeliveryMethod {
    /// Short name of the method (`smtp`, `file`, `test`, `custom`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Smtp(_) => "smtp",
            Self::File(_) => "file",
            Self::Test(_) => "test",
            Self::Custom(_) => "custom",
        }
    }

    fn transport(&self) -> Result<Arc<dyn Transport>> {
        let transport: Arc<dyn Transport> = match self {
            Self::Smtp(config) => Arc::new(SmtpTransport::new(config.clone())?),
            Self::File(location) => Arc::new(FileTransport::new(location)),
            Self::Test(transport) => Arc::new(transport.clone()),
            Self::Custom(transport) => Arc::clone(transport),
        };
        Ok(transport)
    }
}

impl Default for DeliveryMethod {
    fn default() -> Self {
        Self::Smtp(SmtpConfig::localhost())
    }
}

impl fmt::Debug for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smtp(config) => f.debug_tuple("Smtp").field(config).finish(),
            Self::File(location) => f.debug_tuple("File").field(location).finish(),
            Self::Test(transport) => f.debug_tuple("Test").field(&transport.len()).finish(),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Collects settings and mailer declarations until [`finalize`](Self::finalize).
#[derive(Debug)]
pub struct ConfigurationBuilder {
    root: PathBuf,
    namespace: String,
    default_charset: String,
    delivery_method: DeliveryMethod,
    engines: EngineRegistry,
    mailers: Vec<MailerDefinition>,
}

impl ConfigurationBuilder {
    /// Create a builder with the defaults: current directory as template
    /// root, no namespace, `UTF-8`, SMTP on `localhost:25`.
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("."),
            namespace: String::new(),
            default_charset: DEFAULT_CHARSET.to_string(),
            delivery_method: DeliveryMethod::default(),
            engines: EngineRegistry::new(),
            mailers: Vec::new(),
        }
    }

    /// Directory templates are looked up in.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Namespace stripped from mailer names before deriving template names.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Charset used when a delivery doesn't ask for one.
    pub fn default_charset(mut self, charset: impl Into<String>) -> Self {
        self.default_charset = charset.into();
        self
    }

    /// How messages are delivered.
    pub fn delivery_method(mut self, method: DeliveryMethod) -> Self {
        self.delivery_method = method;
        self
    }

    /// Register a template engine for a file extension.
    pub fn engine(mut self, extension: &str, engine: impl TemplateEngine + 'static) -> Self {
        self.engines.insert(extension, Arc::new(engine));
        self
    }

    /// Replace the whole engine registry.
    pub fn engines(mut self, engines: EngineRegistry) -> Self {
        self.engines = engines;
        self
    }

    /// Register a mailer.
    pub fn mailer(mut self, definition: MailerDefinition) -> Self {
        self.mailers.push(definition);
        self
    }

    /// Freeze the configuration.
    ///
    /// Resolves the template root, builds the transport and discovers the
    /// templates of every registered mailer, so filesystem problems surface
    /// here rather than at delivery time. Mailers sharing a name collapse
    /// into the last one registered.
    pub fn finalize(self) -> Result<Arc<Configuration>> {
        let finder = Arc::new(TemplatesFinder::new(&self.root, self.engines)?);
        let transport = self.delivery_method.transport()?;

        let mut mailers = HashMap::with_capacity(self.mailers.len());
        for definition in self.mailers {
            let key = definition.registry_key();
            let templates = TemplateSet::new(
                definition.template_identifier().map(str::to_string),
                definition.layout_name().map(str::to_string),
                self.namespace.clone(),
                Arc::clone(&finder),
            );
            templates.load()?;

            if mailers.contains_key(&key) {
                debug!(mailer = %key, "Replacing previously registered mailer");
            }
            mailers.insert(
                key,
                Registration {
                    definition: Arc::new(definition),
                    templates,
                },
            );
        }

        info!(
            root = %finder.root().display(),
            mailers = mailers.len(),
            delivery = self.delivery_method.name(),
            "Mailer configuration finalized"
        );

        Ok(Arc::new(Configuration {
            namespace: self.namespace,
            default_charset: self.default_charset,
            delivery_method: self.delivery_method,
            transport,
            finder,
            mailers,
        }))
    }
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Registration {
    definition: Arc<MailerDefinition>,
    templates: TemplateSet,
}

/// A finalized, immutable mailer configuration.
///
/// Shared by every [`Mailer`] through an `Arc`; deliveries never mutate it.
pub struct Configuration {
    namespace: String,
    default_charset: String,
    delivery_method: DeliveryMethod,
    transport: Arc<dyn Transport>,
    finder: Arc<TemplatesFinder>,
    mailers: HashMap<String, Registration>,
}

impl Configuration {
    /// Start a new configuration.
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }

    /// The canonical template root.
    pub fn root(&self) -> &Path {
        self.finder.root()
    }

    /// The namespace stripped from mailer names.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The default charset.
    pub fn default_charset(&self) -> &str {
        &self.default_charset
    }

    /// The configured delivery method.
    pub fn delivery_method(&self) -> &DeliveryMethod {
        &self.delivery_method
    }

    /// The transport messages are handed to.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// The template finder.
    pub fn finder(&self) -> &TemplatesFinder {
        &self.finder
    }

    /// Names of the registered mailers, sorted.
    pub fn mailer_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.mailers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check if a mailer is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.mailers.contains_key(name)
    }

    /// The registered definition for a mailer name.
    pub fn definition(&self, name: &str) -> Result<Arc<MailerDefinition>> {
        self.registration(name)
            .map(|registration| Arc::clone(&registration.definition))
    }

    /// The template set of a registered mailer.
    pub fn templates(&self, name: &str) -> Result<&TemplateSet> {
        self.registration(name)
            .map(|registration| &registration.templates)
    }

    /// A mailer for a registered definition.
    pub fn mailer(self: &Arc<Self>, name: &str) -> Result<Mailer> {
        Ok(Mailer::new(Arc::clone(self), self.definition(name)?))
    }

    /// Forget every discovered template; the next access scans the
    /// filesystem again.
    pub fn reset(&self) {
        for registration in self.mailers.values() {
            registration.templates.invalidate();
        }
        debug!(mailers = self.mailers.len(), "Mailer templates reset");
    }

    fn registration(&self, name: &str) -> Result<&Registration> {
        self.mailers
            .get(name)
            .ok_or_else(|| MailError::UnknownMailer(name.to_string()))
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("root", &self.finder.root())
            .field("namespace", &self.namespace)
            .field("default_charset", &self.default_charset)
            .field("delivery_method", &self.delivery_method)
            .field("mailers", &self.mailer_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Format;
    use std::fs;
    use tempfile::TempDir;

    fn builder(dir: &TempDir) -> ConfigurationBuilder {
        Configuration::builder()
            .root(dir.path())
            .delivery_method(DeliveryMethod::Test(TestTransport::new()))
    }

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Configuration::builder().root(dir.path()).finalize().unwrap();

        assert_eq!(config.default_charset(), "UTF-8");
        assert_eq!(config.delivery_method().name(), "smtp");
        assert_eq!(config.namespace(), "");
        assert_eq!(config.root(), dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_missing_root_fails_at_finalize() {
        let result = Configuration::builder()
            .root("/path/to/nowhere")
            .delivery_method(DeliveryMethod::Test(TestTransport::new()))
            .finalize();
        assert!(matches!(result, Err(MailError::Io(_))));
    }

    #[test]
    fn test_unknown_mailer() {
        let dir = TempDir::new().unwrap();
        let config = builder(&dir).finalize().unwrap();

        assert!(matches!(config.templates("Nope"), Err(MailError::UnknownMailer(name)) if name == "Nope"));
        assert!(matches!(config.mailer("Nope"), Err(MailError::UnknownMailer(_))));
    }

    #[test]
    fn test_duplicate_mailers_collapse() {
        let dir = TempDir::new().unwrap();
        let config = builder(&dir)
            .mailer(MailerDefinition::new("Welcome").subject("first"))
            .mailer(MailerDefinition::new("Welcome").subject("second"))
            .finalize()
            .unwrap();

        assert_eq!(config.mailer_names(), vec!["Welcome"]);
        let definition = config.definition("Welcome").unwrap();
        assert!(format!("{:?}", definition).contains("second"));
    }

    #[test]
    fn test_anonymous_mailer_without_template_fails_at_finalize() {
        let dir = TempDir::new().unwrap();
        let result = builder(&dir).mailer(MailerDefinition::anonymous()).finalize();
        assert!(matches!(result, Err(MailError::InvalidIdentifier)));
    }

    #[cfg(feature = "handlebars")]
    #[test]
    fn test_finalize_warms_and_reset_invalidates() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("welcome.html.hbs"), "<h1>Hi</h1>").unwrap();

        let config = builder(&dir)
            .mailer(MailerDefinition::new("Welcome"))
            .finalize()
            .unwrap();
        let templates = config.templates("Welcome").unwrap();
        assert!(templates.is_loaded());
        assert!(templates.get(&Format::Txt).unwrap().is_none());

        fs::write(dir.path().join("welcome.txt.hbs"), "Hi").unwrap();
        config.reset();
        assert!(!templates.is_loaded());
        assert!(templates.get(&Format::Txt).unwrap().is_some());
    }
}
