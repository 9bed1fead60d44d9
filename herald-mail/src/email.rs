//! Email message types.

use lettre::message::header::ContentType;
use lettre::message::{MultiPart, SinglePart};
use serde::{Deserialize, Serialize};

use crate::{Address, Attachment, Format, IntoAddress, MailError, Result};

/// Charset used when nothing else is configured.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// One rendered alternative of the message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyPart {
    /// The format the part was rendered from.
    pub format: Format,
    /// Full `Content-Type` value, charset included.
    pub content_type: String,
    /// Charset of the part.
    pub charset: String,
    /// Rendered content.
    pub body: String,
}

impl BodyPart {
    /// Create a part for a format, deriving the content type.
    pub fn new(format: Format, body: impl Into<String>, charset: impl Into<String>) -> Self {
        let charset = charset.into();
        Self {
            content_type: format.content_type(&charset),
            format,
            charset,
            body: body.into(),
        }
    }

    fn to_lettre(&self) -> Result<SinglePart> {
        let content_type = ContentType::parse(&self.content_type)
            .map_err(|e| MailError::Smtp(format!("{}: {}", self.content_type, e)))?;
        Ok(SinglePart::builder()
            .header(content_type)
            .body(self.body.clone()))
    }
}

/// Email message.
///
/// Built fresh for each delivery by a [`Mailer`](crate::Mailer) and handed to
/// a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    /// Sender addresses.
    pub from: Vec<Address>,
    /// To recipients.
    pub to: Vec<Address>,
    /// CC recipients.
    pub cc: Vec<Address>,
    /// BCC recipients.
    pub bcc: Vec<Address>,
    /// Reply-to addresses.
    pub reply_to: Vec<Address>,
    /// Envelope sender (bounce address).
    pub return_path: Option<Address>,
    /// Email subject.
    pub subject: Option<String>,
    /// Rendered body parts, at most one per format.
    pub parts: Vec<BodyPart>,
    /// Attachments.
    pub attachments: Vec<Attachment>,
    /// Message charset.
    pub charset: String,
    /// Message ID.
    pub message_id: Option<String>,
    /// Name of the delivery method the message was assembled for.
    pub delivery_method: Option<String>,
}

impl Email {
    /// Create a new empty email.
    pub fn new() -> Self {
        Self {
            from: Vec::new(),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            reply_to: Vec::new(),
            return_path: None,
            subject: None,
            parts: Vec::new(),
            attachments: Vec::new(),
            charset: DEFAULT_CHARSET.to_string(),
            message_id: None,
            delivery_method: None,
        }
    }

    /// Add a sender. Unparseable addresses are ignored.
    pub fn from(mut self, from: impl IntoAddress) -> Self {
        if let Ok(addr) = from.into_address() {
            self.from.push(addr);
        }
        self
    }

    /// Add a to recipient. Unparseable addresses are ignored.
    pub fn to(mut self, to: impl IntoAddress) -> Self {
        if let Ok(addr) = to.into_address() {
            self.to.push(addr);
        }
        self
    }

    /// Add a CC recipient.
    pub fn cc(mut self, cc: impl IntoAddress) -> Self {
        if let Ok(addr) = cc.into_address() {
            self.cc.push(addr);
        }
        self
    }

    /// Add a BCC recipient.
    pub fn bcc(mut self, bcc: impl IntoAddress) -> Self {
        if let Ok(addr) = bcc.into_address() {
            self.bcc.push(addr);
        }
        self
    }

    /// Set the subject.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the charset.
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Set the plain text body in the message charset.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        let part = BodyPart::new(Format::Txt, text, self.charset.clone());
        self.set_part(part);
        self
    }

    /// Set the HTML body in the message charset.
    pub fn html(mut self, html: impl Into<String>) -> Self {
        let part = BodyPart::new(Format::Html, html, self.charset.clone());
        self.set_part(part);
        self
    }

    /// Add an attachment.
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Add an attachment in place (for `before` hooks).
    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Insert a body part, replacing any part of the same format.
    /// Parts stay ordered by format.
    pub fn set_part(&mut self, part: BodyPart) {
        self.parts.retain(|p| p.format != part.format);
        self.parts.push(part);
        self.parts.sort_by(|a, b| a.format.cmp(&b.format));
    }

    /// The part rendered for a format.
    pub fn part(&self, format: &Format) -> Option<&BodyPart> {
        self.parts.iter().find(|p| &p.format == format)
    }

    /// The HTML part.
    pub fn html_part(&self) -> Option<&BodyPart> {
        self.part(&Format::Html)
    }

    /// The plain text part.
    pub fn text_part(&self) -> Option<&BodyPart> {
        self.part(&Format::Txt)
    }

    /// Find an attachment by file name.
    pub fn attachment(&self, filename: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.filename == filename)
    }

    /// The RFC 5322 representation of the message.
    pub fn formatted(&self) -> Result<Vec<u8>> {
        Ok(self.to_lettre()?.formatted())
    }

    /// Build a lettre message.
    ///
    /// Nothing is validated up front: a missing sender or recipient surfaces
    /// as lettre's envelope error, which the mailer recognizes.
    pub(crate) fn to_lettre(&self) -> Result<lettre::Message> {
        let mut builder = lettre::Message::builder();

        for addr in &self.from {
            builder = builder.from(addr.to_mailbox()?);
        }
        for addr in &self.reply_to {
            builder = builder.reply_to(addr.to_mailbox()?);
        }
        for addr in &self.to {
            builder = builder.to(addr.to_mailbox()?);
        }
        for addr in &self.cc {
            builder = builder.cc(addr.to_mailbox()?);
        }
        for addr in &self.bcc {
            builder = builder.bcc(addr.to_mailbox()?);
        }

        if let Some(subject) = &self.subject {
            builder = builder.subject(subject.clone());
        }

        if let Some(msg_id) = &self.message_id {
            builder = builder.message_id(Some(msg_id.clone()));
        }

        if let Some(return_path) = &self.return_path {
            let recipients = self
                .to
                .iter()
                .chain(&self.cc)
                .chain(&self.bcc)
                .map(Address::to_lettre)
                .collect::<Result<Vec<_>>>()?;

            if !recipients.is_empty() {
                let envelope =
                    lettre::address::Envelope::new(Some(return_path.to_lettre()?), recipients)?;
                builder = builder.envelope(envelope);
            }
        }

        let mut alternatives = self
            .parts
            .iter()
            .map(BodyPart::to_lettre)
            .collect::<Result<Vec<_>>>()?;

        let content = match alternatives.len() {
            0 => None,
            1 => Some(Content::Single(alternatives.remove(0))),
            _ => {
                let mut parts = alternatives.into_iter();
                let first = parts.next().ok_or_else(|| MailError::Smtp("empty body".into()))?;
                let alternative = parts.fold(MultiPart::alternative().singlepart(first), |mp, p| {
                    mp.singlepart(p)
                });
                Some(Content::Multi(alternative))
            }
        };

        let message = if self.attachments.is_empty() {
            match content {
                Some(Content::Single(part)) => builder.singlepart(part),
                Some(Content::Multi(multi)) => builder.multipart(multi),
                None => {
                    let content_type = ContentType::parse(&Format::Txt.content_type(&self.charset))
                        .unwrap_or(ContentType::TEXT_PLAIN);
                    builder.header(content_type).body(String::new())
                }
            }
        } else {
            let mut attachments = self.attachments.iter().map(Attachment::to_lettre);
            let mixed = match content {
                Some(Content::Single(part)) => MultiPart::mixed().singlepart(part),
                Some(Content::Multi(multi)) => MultiPart::mixed().multipart(multi),
                None => match attachments.next() {
                    Some(first) => MultiPart::mixed().singlepart(first),
                    None => return Err(MailError::Attachment("no attachment to send".into())),
                },
            };
            builder.multipart(attachments.fold(mixed, |mp, att| mp.singlepart(att)))
        };

        Ok(message?)
    }
}

impl Default for Email {
    fn default() -> Self {
        Self::new()
    }
}

enum Content {
    Single(SinglePart),
    Multi(MultiPart),
}
