//! Email transport implementations.

use async_trait::async_trait;
use lettre::{
    transport::smtp::authentication::Credentials, AsyncFileTransport, AsyncSmtpTransport,
    AsyncTransport, Tokio1Executor,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::{Email, MailError, Result};

/// Email transport trait.
///
/// Transports surface their own rejections. A rejection naming a missing
/// sender or recipient is turned into
/// [`MailError::MissingDeliveryData`] by the mailer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an email.
    async fn send(&self, email: &Email) -> Result<()>;

    /// Check if the transport is healthy.
    async fn is_healthy(&self) -> bool {
        true
    }
}

/// SMTP security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// No encryption.
    None,
    /// STARTTLS upgrade (port 587).
    #[default]
    StartTls,
    /// Implicit TLS (port 465).
    Tls,
}

/// SMTP configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SmtpConfig {
    /// SMTP server host.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// Security mode.
    pub security: SmtpSecurity,
    /// Username for authentication.
    pub username: Option<String>,
    /// Password for authentication.
    pub password: Option<String>,
    /// Connection timeout.
    pub timeout: Duration,
}

impl SmtpConfig {
    /// Create a new SMTP configuration (STARTTLS on port 587).
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 587,
            security: SmtpSecurity::StartTls,
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Plain SMTP on `localhost:25`, the delivery default.
    pub fn localhost() -> Self {
        Self::new("localhost").insecure()
    }

    /// Set credentials.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the security mode, keeping the current port.
    pub fn security(mut self, security: SmtpSecurity) -> Self {
        self.security = security;
        self
    }

    /// Use STARTTLS security (port 587).
    pub fn starttls(mut self) -> Self {
        self.security = SmtpSecurity::StartTls;
        self.port = 587;
        self
    }

    /// Use implicit TLS security (port 465).
    pub fn tls(mut self) -> Self {
        self.security = SmtpSecurity::Tls;
        self.port = 465;
        self
    }

    /// Use no encryption (port 25).
    pub fn insecure(mut self) -> Self {
        self.security = SmtpSecurity::None;
        self.port = 25;
        self
    }

    /// Set the connection timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self::localhost()
    }
}

/// SMTP transport.
///
/// No connection is opened until the first message is sent.
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: SmtpConfig,
}

impl SmtpTransport {
    /// Create a new SMTP transport.
    pub fn new(config: SmtpConfig) -> Result<Self> {
        let mut builder = match config.security {
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?,
        };

        builder = builder.port(config.port).timeout(Some(config.timeout));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let transport = builder.build();

        info!(
            host = %config.host,
            port = config.port,
            security = ?config.security,
            "SMTP transport initialized"
        );

        Ok(Self { transport, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &SmtpConfig {
        &self.config
    }

    /// Test the SMTP connection.
    pub async fn test_connection(&self) -> Result<bool> {
        self.transport
            .test_connection()
            .await
            .map_err(MailError::from)
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn send(&self, email: &Email) -> Result<()> {
        let message = email.to_lettre()?;

        debug!(
            to = ?email.to.iter().map(|a| &a.email).collect::<Vec<_>>(),
            subject = ?email.subject,
            "Sending email via SMTP"
        );

        self.transport.send(message).await?;

        debug!("Email sent successfully");
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        self.test_connection().await.unwrap_or(false)
    }
}

/// Writes each message as an `.eml` file into a directory.
pub struct FileTransport {
    transport: AsyncFileTransport<Tokio1Executor>,
    location: PathBuf,
}

impl FileTransport {
    /// Create a file transport writing into `location`.
    pub fn new(location: impl AsRef<Path>) -> Self {
        let location = location.as_ref().to_path_buf();
        Self {
            transport: AsyncFileTransport::new(&location),
            location,
        }
    }

    /// The directory messages are written to.
    pub fn location(&self) -> &Path {
        &self.location
    }
}

#[async_trait]
impl Transport for FileTransport {
    async fn send(&self, email: &Email) -> Result<()> {
        let message = email.to_lettre()?;
        let id = self.transport.send(message).await?;

        debug!(
            id = %id,
            location = %self.location.display(),
            "Email written to file"
        );
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        self.location.is_dir()
    }
}

/// Keeps delivered messages in memory.
///
/// The message is still converted for the wire, so a missing sender or
/// recipient is rejected exactly as the SMTP transport would reject it.
/// Clones share the same delivery list.
#[derive(Debug, Clone, Default)]
pub struct TestTransport {
    deliveries: Arc<Mutex<Vec<Email>>>,
}

impl TestTransport {
    /// Create an empty test transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message delivered so far, oldest first.
    pub fn deliveries(&self) -> Vec<Email> {
        self.deliveries.lock().clone()
    }

    /// The most recent delivery.
    pub fn last(&self) -> Option<Email> {
        self.deliveries.lock().last().cloned()
    }

    /// Number of deliveries.
    pub fn len(&self) -> usize {
        self.deliveries.lock().len()
    }

    /// Check if nothing was delivered.
    pub fn is_empty(&self) -> bool {
        self.deliveries.lock().is_empty()
    }

    /// Forget every delivery.
    pub fn clear(&self) {
        self.deliveries.lock().clear();
    }
}

#[async_trait]
impl Transport for TestTransport {
    async fn send(&self, email: &Email) -> Result<()> {
        email.to_lettre()?;
        self.deliveries.lock().push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::new()
            .from("sender@example.com")
            .to("recipient@example.com")
            .subject("Test")
            .text("Hello")
    }

    #[test]
    fn test_smtp_config_builder() {
        let config = SmtpConfig::new("smtp.example.com")
            .starttls()
            .credentials("user", "pass");

        assert_eq!(config.host, "smtp.example.com");
        assert_eq!(config.port, 587);
        assert_eq!(config.security, SmtpSecurity::StartTls);
        assert_eq!(config.username.as_deref(), Some("user"));
    }

    #[test]
    fn test_smtp_default_is_localhost() {
        let config = SmtpConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 25);
        assert_eq!(config.security, SmtpSecurity::None);
    }

    #[tokio::test]
    async fn test_test_transport_records_deliveries() {
        let transport = TestTransport::new();
        let shared = transport.clone();

        transport.send(&email()).await.unwrap();

        assert_eq!(shared.len(), 1);
        assert_eq!(shared.last().unwrap().subject.as_deref(), Some("Test"));

        shared.clear();
        assert!(transport.is_empty());
    }

    #[tokio::test]
    async fn test_test_transport_rejects_missing_recipient() {
        let transport = TestTransport::new();
        let email = Email::new().from("sender@example.com").text("Hello");

        let err = transport.send(&email).await.unwrap_err();
        assert!(err.is_missing_address());
        assert!(transport.is_empty());
    }

    #[tokio::test]
    async fn test_file_transport_writes_eml() {
        let dir = tempfile::TempDir::new().unwrap();
        let transport = FileTransport::new(dir.path());

        transport.send(&email()).await.unwrap();

        let written: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "eml"))
            .collect();
        assert_eq!(written.len(), 1);
        assert!(transport.is_healthy().await);
    }
}
