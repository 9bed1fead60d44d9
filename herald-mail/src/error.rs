//! Mail error types.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Result type for mail operations.
pub type Result<T> = std::result::Result<T, MailError>;

/// Transport rejections that name a missing envelope address.
///
/// Matches lettre's `missing source address` / `missing destination address`
/// as well as the `SMTP From address may not be blank` style used by other
/// delivery backends.
static MISSING_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"missing (source|destination) address|SMTP (From|To) address").unwrap()
});

/// Mail errors.
#[derive(Debug, Error)]
pub enum MailError {
    /// Delivery attempted with a mailer that the configuration doesn't know.
    #[error("Unknown mailer: {0}. Please finalize the configuration before using it")]
    UnknownMailer(String),

    /// The transport refused the message because `from` or `to` is missing.
    #[error("Missing delivery data, please check 'from', or 'to'")]
    MissingDeliveryData,

    /// A template name was requested for a mailer without an identifier.
    #[error("Invalid mailer identifier: a template name can't be derived from nothing")]
    InvalidIdentifier,

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// A deferred header or hook asked for a local that wasn't provided.
    #[error("Missing local: {0}")]
    MissingLocal(String),

    /// Template error.
    #[error("Template error: {0}")]
    Template(String),

    /// Template not found.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// No engine is registered for a template extension.
    #[error("No template engine registered for extension: {0}")]
    UnsupportedEngine(String),

    /// Attachment error.
    #[error("Attachment error: {0}")]
    Attachment(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// SMTP (or message building) error.
    #[error("SMTP error: {0}")]
    Smtp(String),

    /// Error raised by a non-SMTP delivery backend.
    #[error("Provider error: {0}")]
    Provider(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl MailError {
    /// Check if this is a transport rejection caused by a missing `From` or `To`.
    pub fn is_missing_address(&self) -> bool {
        match self {
            Self::Smtp(msg) | Self::Provider(msg) => MISSING_ADDRESS.is_match(msg),
            _ => false,
        }
    }
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        Self::Smtp(err.to_string())
    }
}

impl From<lettre::transport::file::Error> for MailError {
    fn from(err: lettre::transport::file::Error) -> Self {
        Self::Provider(err.to_string())
    }
}

impl From<lettre::address::AddressError> for MailError {
    fn from(err: lettre::address::AddressError) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        Self::Smtp(err.to_string())
    }
}

impl From<serde_json::Error> for MailError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for MailError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<walkdir::Error> for MailError {
    fn from(err: walkdir::Error) -> Self {
        match err.into_io_error() {
            Some(io) => Self::Io(io),
            None => Self::Config("Filesystem loop detected under template root".to_string()),
        }
    }
}

#[cfg(feature = "handlebars")]
impl From<handlebars::RenderError> for MailError {
    fn from(err: handlebars::RenderError) -> Self {
        Self::Template(err.to_string())
    }
}

#[cfg(feature = "handlebars")]
impl From<handlebars::TemplateError> for MailError {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::Template(err.to_string())
    }
}

#[cfg(feature = "tera")]
impl From<tera::Error> for MailError {
    fn from(err: tera::Error) -> Self {
        Self::Template(err.to_string())
    }
}

#[cfg(feature = "minijinja")]
impl From<minijinja::Error> for MailError {
    fn from(err: minijinja::Error) -> Self {
        Self::Template(err.to_string())
    }
}
