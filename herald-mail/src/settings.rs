//! Loading mailer settings from files and the environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ConfigurationBuilder, DeliveryMethod, MailError, Result, SmtpConfig, SmtpSecurity,
    TestTransport, DEFAULT_CHARSET,
};

/// Prefix of the environment variables read by [`MailerSettings::from_env`].
pub const ENV_PREFIX: &str = "HERALD_MAILER_";

/// Delivery method names accepted in settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryKind {
    /// SMTP.
    #[default]
    Smtp,
    /// `.eml` files.
    File,
    /// In memory.
    Test,
}

/// Serializable mailer settings.
///
/// ```toml
/// root = "templates/mailers"
/// namespace = "Web::Mailers"
/// default_charset = "UTF-8"
/// delivery_method = "smtp"
///
/// [smtp]
/// host = "smtp.example.com"
/// port = 587
/// security = "starttls"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailerSettings {
    /// Template root.
    pub root: PathBuf,
    /// Namespace stripped from mailer names.
    pub namespace: String,
    /// Charset used when a delivery doesn't ask for one.
    pub default_charset: String,
    /// Delivery method.
    pub delivery_method: DeliveryKind,
    /// SMTP settings.
    pub smtp: SmtpSettings,
    /// Output directory for the file delivery method.
    pub file_location: Option<PathBuf>,
}

/// SMTP part of [`MailerSettings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: SmtpSecurity,
    /// Username.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25,
            security: SmtpSecurity::None,
            username: None,
            password: None,
        }
    }
}

impl Default for MailerSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            namespace: String::new(),
            default_charset: DEFAULT_CHARSET.to_string(),
            delivery_method: DeliveryKind::default(),
            smtp: SmtpSettings::default(),
            file_location: None,
        }
    }
}

impl MailerSettings {
    /// Load settings from a `.toml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| MailError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::from_toml(&content),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(MailError::Config(format!("Unsupported format: {}", ext))),
            None => Err(MailError::Config("No file extension found".to_string())),
        }
    }

    /// Parse TOML settings.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from `HERALD_MAILER_*` environment variables, reading a
    /// `.env` file first if there is one.
    pub fn from_env() -> Result<Self> {
        if dotenvy::dotenv().is_err() {
            debug!("No .env file loaded");
        }
        Self::from_vars(std::env::vars())
    }

    /// Load settings from the `HERALD_MAILER_*` entries of a dotenv file,
    /// without touching the process environment.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let vars = dotenvy::from_path_iter(path)
            .map_err(|e| MailError::Config(format!("{}: {}", path.display(), e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| MailError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_vars(vars)
    }

    /// Build settings from key/value pairs; only `HERALD_MAILER_*` keys
    /// are read.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                key.as_ref()
                    .strip_prefix(ENV_PREFIX)
                    .map(|name| (name.to_uppercase(), value.into()))
            })
            .collect();

        let mut settings = Self::default();

        if let Some(root) = vars.get("ROOT") {
            settings.root = PathBuf::from(root);
        }
        if let Some(namespace) = vars.get("NAMESPACE") {
            settings.namespace = namespace.clone();
        }
        if let Some(charset) = vars.get("DEFAULT_CHARSET") {
            settings.default_charset = charset.clone();
        }
        if let Some(method) = vars.get("DELIVERY_METHOD") {
            settings.delivery_method = parse_enum("DELIVERY_METHOD", method)?;
        }
        if let Some(host) = vars.get("SMTP_HOST") {
            settings.smtp.host = host.clone();
        }
        if let Some(port) = vars.get("SMTP_PORT") {
            settings.smtp.port = port
                .parse()
                .map_err(|_| MailError::Config(format!("Invalid SMTP_PORT: {}", port)))?;
        }
        if let Some(security) = vars.get("SMTP_SECURITY") {
            settings.smtp.security = parse_enum("SMTP_SECURITY", security)?;
        }
        if let Some(username) = vars.get("SMTP_USERNAME") {
            settings.smtp.username = Some(username.clone());
        }
        if let Some(password) = vars.get("SMTP_PASSWORD") {
            settings.smtp.password = Some(password.clone());
        }
        if let Some(location) = vars.get("FILE_LOCATION") {
            settings.file_location = Some(PathBuf::from(location));
        }

        Ok(settings)
    }

    /// The delivery method these settings describe.
    pub fn delivery(&self) -> Result<DeliveryMethod> {
        Ok(match self.delivery_method {
            DeliveryKind::Smtp => {
                let mut config = SmtpConfig::new(&self.smtp.host)
                    .security(self.smtp.security)
                    .port(self.smtp.port);
                if let (Some(username), Some(password)) = (&self.smtp.username, &self.smtp.password) {
                    config = config.credentials(username, password);
                }
                DeliveryMethod::Smtp(config)
            }
            DeliveryKind::File => DeliveryMethod::File(self.file_location.clone().ok_or_else(|| {
                MailError::Config("The file delivery method needs a file_location".to_string())
            })?),
            DeliveryKind::Test => DeliveryMethod::Test(TestTransport::new()),
        })
    }

    /// A configuration builder seeded with these settings.
    pub fn into_builder(self) -> Result<ConfigurationBuilder> {
        let delivery = self.delivery()?;
        Ok(ConfigurationBuilder::new()
            .root(self.root)
            .namespace(self.namespace)
            .default_charset(self.default_charset)
            .delivery_method(delivery))
    }
}

fn parse_enum<T: serde::de::DeserializeOwned>(key: &str, value: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_lowercase()))
        .map_err(|_| MailError::Config(format!("Invalid {}: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = MailerSettings::default();
        assert_eq!(settings.default_charset, "UTF-8");
        assert_eq!(settings.delivery_method, DeliveryKind::Smtp);
        assert_eq!(settings.smtp.port, 25);
    }

    #[test]
    fn test_from_toml() {
        let settings = MailerSettings::from_toml(
            r#"
            root = "templates/mailers"
            namespace = "Web::Mailers"
            delivery_method = "smtp"

            [smtp]
            host = "smtp.example.com"
            port = 587
            security = "starttls"
            username = "user"
            password = "pass"
            "#,
        )
        .unwrap();

        assert_eq!(settings.root, PathBuf::from("templates/mailers"));
        assert_eq!(settings.namespace, "Web::Mailers");
        assert_eq!(settings.default_charset, "UTF-8");

        match settings.delivery().unwrap() {
            DeliveryMethod::Smtp(config) => {
                assert_eq!(config.host, "smtp.example.com");
                assert_eq!(config.port, 587);
                assert_eq!(config.security, SmtpSecurity::StartTls);
                assert_eq!(config.username.as_deref(), Some("user"));
            }
            other => panic!("unexpected delivery method: {:?}", other),
        }
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mailer.json");
        std::fs::write(&path, r#"{"default_charset": "iso-2022-jp", "delivery_method": "test"}"#)
            .unwrap();

        let settings = MailerSettings::from_file(&path).unwrap();
        assert_eq!(settings.default_charset, "iso-2022-jp");
        assert!(matches!(settings.delivery().unwrap(), DeliveryMethod::Test(_)));
    }

    #[test]
    fn test_unsupported_file_format() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mailer.yaml");
        std::fs::write(&path, "root: .").unwrap();

        assert!(matches!(MailerSettings::from_file(&path), Err(MailError::Config(_))));
    }

    #[test]
    fn test_from_vars_reads_prefixed_keys_only() {
        let settings = MailerSettings::from_vars([
            ("HERALD_MAILER_ROOT", "/srv/mailers"),
            ("HERALD_MAILER_DELIVERY_METHOD", "File"),
            ("HERALD_MAILER_FILE_LOCATION", "/tmp/mail"),
            ("HERALD_MAILER_SMTP_PORT", "2525"),
            ("ROOT", "/ignored"),
        ])
        .unwrap();

        assert_eq!(settings.root, PathBuf::from("/srv/mailers"));
        assert_eq!(settings.delivery_method, DeliveryKind::File);
        assert_eq!(settings.smtp.port, 2525);
        assert!(matches!(settings.delivery().unwrap(), DeliveryMethod::File(p) if p == Path::new("/tmp/mail")));
    }

    #[test]
    fn test_invalid_values() {
        assert!(MailerSettings::from_vars([("HERALD_MAILER_SMTP_PORT", "many")]).is_err());
        assert!(MailerSettings::from_vars([("HERALD_MAILER_DELIVERY_METHOD", "pigeon")]).is_err());

        let settings = MailerSettings::from_vars([("HERALD_MAILER_DELIVERY_METHOD", "file")]).unwrap();
        assert!(matches!(settings.delivery(), Err(MailError::Config(_))));
    }

    #[test]
    fn test_from_env_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "HERALD_MAILER_NAMESPACE=Web::Mailers\nHERALD_MAILER_SMTP_SECURITY=tls\nOTHER=1\n",
        )
        .unwrap();

        let settings = MailerSettings::from_env_file(&path).unwrap();
        assert_eq!(settings.namespace, "Web::Mailers");
        assert_eq!(settings.smtp.security, SmtpSecurity::Tls);
    }
}
