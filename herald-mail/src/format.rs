//! Template formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A MIME alternative of a multipart message, named after the middle
/// segment of a template file (`welcome.html.hbs` is [`Format::Html`]).
///
/// The ordering puts `Txt` before `Html` so that the plain alternative is
/// written first in `multipart/alternative` bodies. Custom formats sort last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Format {
    /// Plain text (`txt`).
    Txt,
    /// HTML (`html`).
    Html,
    /// Any other format, e.g. `ics` or `md`.
    Other(String),
}

impl Format {
    /// The file-name segment for this format.
    pub fn as_str(&self) -> &str {
        match self {
            Format::Txt => "txt",
            Format::Html => "html",
            Format::Other(name) => name,
        }
    }

    /// The MIME type used for parts rendered in this format.
    pub fn mime_type(&self) -> mime::Mime {
        match self {
            Format::Txt => mime::TEXT_PLAIN,
            Format::Html => mime::TEXT_HTML,
            Format::Other(name) => mime_guess::from_ext(name).first_or_text_plain(),
        }
    }

    /// The `Content-Type` header value for a part in the given charset.
    pub fn content_type(&self, charset: &str) -> String {
        let mime = self.mime_type();
        format!("{}/{}; charset={}", mime.type_(), mime.subtype(), charset)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Format {
    fn from(s: &str) -> Self {
        match s {
            "txt" => Format::Txt,
            "html" => Format::Html,
            other => Format::Other(other.to_string()),
        }
    }
}

impl From<String> for Format {
    fn from(s: String) -> Self {
        Format::from(s.as_str())
    }
}

impl From<Format> for String {
    fn from(format: Format) -> Self {
        format.as_str().to_string()
    }
}

impl FromStr for Format {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Format::from(s))
    }
}
