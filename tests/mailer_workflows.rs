//! Integration tests for common Herald workflows.
//!
//! These tests drive the facade crate the way an application would.

#![cfg(feature = "handlebars")]

use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use herald::prelude::*;
use tempfile::TempDir;

/// Rejects every message with a fixed reason.
struct RejectingTransport(&'static str);

#[async_trait]
impl Transport for RejectingTransport {
    async fn send(&self, _email: &Email) -> Result<()> {
        Err(MailError::Provider(self.0.to_string()))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn template_root(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let path = dir.path().join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    dir
}

// =============================================================================
// Delivery Tests
// =============================================================================

#[tokio::test]
async fn test_signup_workflow() {
    let dir = template_root(&[
        ("mailers/signup_mailer.html.hbs", "<p>Welcome, {{name}}!</p>"),
        ("mailers/signup_mailer.txt.hbs", "Welcome, {{name}}!"),
    ]);
    let outbox = TestTransport::new();

    let config = Configuration::builder()
        .root(dir.path())
        .namespace("App")
        .delivery_method(DeliveryMethod::Test(outbox.clone()))
        .mailer(
            MailerDefinition::new("App::SignupMailer")
                .from("Herald <noreply@example.com>")
                .to(HeaderField::deferred(|locals: &Locals| {
                    Ok(locals.fetch_str("email")?.to_string())
                }))
                .reply_to("support@example.com")
                .subject(HeaderField::deferred(|locals: &Locals| {
                    Ok(format!("Welcome, {}", locals.fetch_str("name")?))
                })),
        )
        .finalize()
        .unwrap();

    let mailer = config.mailer("App::SignupMailer").unwrap();
    let locals = Locals::new().with("email", "ada@example.com").with("name", "Ada");

    assert_eq!(mailer.render("txt", &locals).unwrap(), "Welcome, Ada!");

    mailer.deliver(locals).await.unwrap();

    let email = outbox.last().unwrap();
    assert_eq!(email.from[0].name(), Some("Herald"));
    assert_eq!(email.reply_to[0].email(), "support@example.com");
    assert_eq!(email.subject.as_deref(), Some("Welcome, Ada"));
    assert_eq!(email.parts[0].format, Format::Txt);
    assert_eq!(email.parts[1].body, "<p>Welcome, Ada!</p>");
}

#[tokio::test]
async fn test_custom_transport_rejections() {
    let dir = template_root(&[("notice.txt.hbs", "Notice")]);

    let missing = Configuration::builder()
        .root(dir.path())
        .delivery_method(DeliveryMethod::Custom(Arc::new(RejectingTransport(
            "SMTP To address may not be blank: []",
        ))))
        .mailer(MailerDefinition::new("Notice").from("a@example.com").to("b@example.com"))
        .finalize()
        .unwrap();
    let err = missing.mailer("Notice").unwrap().deliver(Locals::new()).await.unwrap_err();
    assert!(matches!(err, MailError::MissingDeliveryData));

    let refused = Configuration::builder()
        .root(dir.path())
        .delivery_method(DeliveryMethod::Custom(Arc::new(RejectingTransport("connection refused"))))
        .mailer(MailerDefinition::new("Notice").from("a@example.com").to("b@example.com"))
        .finalize()
        .unwrap();
    let err = refused.mailer("Notice").unwrap().deliver(Locals::new()).await.unwrap_err();
    assert!(matches!(err, MailError::Provider(reason) if reason == "connection refused"));
}

#[tokio::test]
async fn test_custom_engine_and_format() {
    struct Shout;

    impl TemplateEngine for Shout {
        fn render(&self, template: &Template, _context: &serde_json::Value) -> Result<String> {
            Ok(template.source().to_uppercase())
        }
    }

    let dir = template_root(&[("reminder.ics.shout", "begin:vcalendar")]);
    let outbox = TestTransport::new();

    let config = Configuration::builder()
        .root(dir.path())
        .engine("shout", Shout)
        .delivery_method(DeliveryMethod::Test(outbox.clone()))
        .mailer(MailerDefinition::new("Reminder").from("a@example.com").to("b@example.com"))
        .finalize()
        .unwrap();

    let sent = config.mailer("Reminder").unwrap().deliver(Locals::new()).await.unwrap();
    let part = sent.email().part(&Format::from("ics")).unwrap();
    assert_eq!(part.body, "BEGIN:VCALENDAR");
    assert_eq!(part.content_type, "text/calendar; charset=UTF-8");
}

#[test]
fn test_template_name_resolution() {
    use herald::template_name::resolve;

    assert_eq!(resolve(Some("Web::Mailers::SignupMailer"), "Web::Mailers").unwrap(), "signup_mailer");
    assert_eq!(resolve(Some("Admin::HTTPReport"), "").unwrap(), "admin/http_report");
    assert_eq!(resolve(Some(""), "").unwrap(), "");
    assert!(matches!(resolve(None, ""), Err(MailError::InvalidIdentifier)));
}

#[cfg(feature = "tera")]
#[tokio::test]
async fn test_tera_templates() {
    let dir = template_root(&[("digest.html.tera", "<ul>{% for item in items %}<li>{{ item }}</li>{% endfor %}</ul>")]);
    let outbox = TestTransport::new();

    let config = Configuration::builder()
        .root(dir.path())
        .delivery_method(DeliveryMethod::Test(outbox.clone()))
        .mailer(MailerDefinition::new("Digest").from("a@example.com").to("b@example.com"))
        .finalize()
        .unwrap();

    let locals = Locals::new().with("items", serde_json::json!(["one", "two"]));
    let sent = config.mailer("Digest").unwrap().deliver(locals).await.unwrap();
    assert_eq!(sent.email().html_part().unwrap().body, "<ul><li>one</li><li>two</li></ul>");
}

#[cfg(feature = "minijinja")]
#[tokio::test]
async fn test_minijinja_templates() {
    let dir = template_root(&[("digest.txt.j2", "{{ items | join(', ') }}")]);
    let outbox = TestTransport::new();

    let config = Configuration::builder()
        .root(dir.path())
        .delivery_method(DeliveryMethod::Test(outbox.clone()))
        .mailer(MailerDefinition::new("Digest").from("a@example.com").to("b@example.com"))
        .finalize()
        .unwrap();

    let locals = Locals::new().with("items", serde_json::json!(["one", "two"]));
    let sent = config.mailer("Digest").unwrap().deliver(locals).await.unwrap();
    assert_eq!(sent.email().text_part().unwrap().body, "one, two");
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_settings_from_env_file() {
    let dir = template_root(&[("ping.txt.hbs", "pong")]);
    let env = dir.path().join("mailer.env");
    fs::write(
        &env,
        format!(
            "HERALD_MAILER_ROOT={}\nHERALD_MAILER_DELIVERY_METHOD=test\nHERALD_MAILER_DEFAULT_CHARSET=iso-8859-1\n",
            dir.path().display()
        ),
    )
    .unwrap();

    let config = MailerSettings::from_env_file(&env)
        .unwrap()
        .into_builder()
        .unwrap()
        .mailer(MailerDefinition::new("Ping"))
        .finalize()
        .unwrap();

    assert_eq!(config.default_charset(), "iso-8859-1");
    assert_eq!(config.delivery_method().name(), "test");
    assert_eq!(config.templates("Ping").unwrap().all().unwrap().len(), 1);
}

#[test]
fn test_reset_picks_up_new_templates() {
    let dir = template_root(&[("ping.txt.hbs", "pong")]);
    let config = Configuration::builder()
        .root(dir.path())
        .delivery_method(DeliveryMethod::Test(TestTransport::new()))
        .mailer(MailerDefinition::new("Ping"))
        .finalize()
        .unwrap();
    let mailer = config.mailer("Ping").unwrap();

    fs::write(dir.path().join("ping.html.hbs"), "<b>pong</b>").unwrap();
    assert!(mailer.render("html", &Locals::new()).is_err());

    config.reset();
    assert_eq!(mailer.render("html", &Locals::new()).unwrap(), "<b>pong</b>");
}
