//! Template name resolution.
//!
//! Turns a mailer identifier such as `Web::Mailers::SignupMailer` into the
//! key used to look up its template files (`signup_mailer` when the
//! namespace is `Web::Mailers`).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{MailError, Result};

/// Separator between namespace segments in a mailer identifier.
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Separator between directories in a template key.
pub const PATH_SEPARATOR: &str = "/";

static ACRONYM_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z\d]+)([A-Z][a-z])").unwrap());

static CASE_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z\d])([A-Z])").unwrap());

static WORD_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-.]").unwrap());

/// Resolve the template key for a mailer identifier.
///
/// The namespace prefix is removed when it matches whole `::` segments, the
/// remaining segments become directories, and each segment is snake-cased:
///
/// ```
/// use herald_mail::template_name;
///
/// assert_eq!(template_name::resolve(Some("ATemplate"), "").unwrap(), "a_template");
/// assert_eq!(
///     template_name::resolve(Some("Mailers::WelcomeMailer"), "").unwrap(),
///     "mailers/welcome_mailer"
/// );
/// assert_eq!(
///     template_name::resolve(Some("Web::Mailers::SignupMailer"), "Web::Mailers").unwrap(),
///     "signup_mailer"
/// );
/// ```
///
/// An empty identifier resolves to an empty key. A missing identifier is an
/// [`MailError::InvalidIdentifier`].
pub fn resolve(identifier: Option<&str>, namespace: &str) -> Result<String> {
    let identifier = identifier.ok_or(MailError::InvalidIdentifier)?;
    Ok(underscore(strip_namespace(identifier, namespace)))
}

/// Remove a leading namespace (and the separators after it).
fn strip_namespace<'a>(identifier: &'a str, namespace: &str) -> &'a str {
    let namespace = namespace.trim_end_matches(NAMESPACE_SEPARATOR);
    if namespace.is_empty() {
        return identifier;
    }

    match identifier.strip_prefix(namespace) {
        Some("") => "",
        Some(rest) if rest.starts_with(NAMESPACE_SEPARATOR) => {
            rest.trim_start_matches(NAMESPACE_SEPARATOR)
        }
        _ => identifier,
    }
}

fn underscore(name: &str) -> String {
    let name = name.replace(NAMESPACE_SEPARATOR, PATH_SEPARATOR);
    let name = ACRONYM_BOUNDARY.replace_all(&name, "${1}_${2}");
    let name = CASE_BOUNDARY.replace_all(&name, "${1}_${2}");
    let name = WORD_SEPARATOR.replace_all(&name, "_");
    name.to_lowercase()
}
