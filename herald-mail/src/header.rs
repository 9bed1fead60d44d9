//! Header field declarations.

use std::fmt;
use std::sync::Arc;

use crate::{Locals, Result};

/// A resolved header value: one string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A single value.
    One(String),
    /// Several values (e.g. multiple recipients).
    Many(Vec<String>),
}

impl FieldValue {
    /// The non-blank values, in declaration order.
    pub fn values(&self) -> Vec<&str> {
        let raw: Vec<&str> = match self {
            FieldValue::One(value) => vec![value.as_str()],
            FieldValue::Many(values) => values.iter().map(String::as_str).collect(),
        };

        raw.into_iter()
            .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect()
    }

    /// Check if the value resolves to nothing.
    pub fn is_blank(&self) -> bool {
        self.values().is_empty()
    }

    /// The first non-blank value.
    pub fn first(&self) -> Option<&str> {
        self.values().into_iter().next()
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::One(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::One(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        FieldValue::One(value.clone())
    }
}

impl<S: Into<String>> From<Vec<S>> for FieldValue {
    fn from(values: Vec<S>) -> Self {
        FieldValue::Many(values.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for FieldValue {
    fn from(values: [S; N]) -> Self {
        FieldValue::Many(values.into_iter().map(Into::into).collect())
    }
}

type DeferredFn = dyn Fn(&Locals) -> Result<FieldValue> + Send + Sync;

/// A header declaration: fixed at definition time, or computed per delivery.
#[derive(Clone)]
pub enum HeaderField {
    /// A value known when the mailer is declared.
    Literal(FieldValue),
    /// A value computed from the locals of each delivery.
    Deferred(Arc<DeferredFn>),
}

impl HeaderField {
    /// Declare a computed value.
    ///
    /// ```
    /// use herald_mail::{HeaderField, Locals};
    ///
    /// let subject = HeaderField::deferred(|locals: &Locals| {
    ///     Ok(format!("Hello, {}", locals.fetch_str("name")?))
    /// });
    /// let value = subject.resolve(&Locals::new().with("name", "Ada")).unwrap();
    /// assert_eq!(value.unwrap().first(), Some("Hello, Ada"));
    /// ```
    pub fn deferred<F, V>(f: F) -> Self
    where
        F: Fn(&Locals) -> Result<V> + Send + Sync + 'static,
        V: Into<FieldValue>,
    {
        HeaderField::Deferred(Arc::new(move |locals| f(locals).map(Into::into)))
    }

    /// Resolve against the locals of a delivery.
    ///
    /// Errors from a deferred computation are returned untouched. Blank
    /// values resolve to `None`.
    pub fn resolve(&self, locals: &Locals) -> Result<Option<FieldValue>> {
        let value = match self {
            HeaderField::Literal(value) => value.clone(),
            HeaderField::Deferred(f) => f(locals)?,
        };

        Ok(if value.is_blank() { None } else { Some(value) })
    }
}

impl fmt::Debug for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderField::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            HeaderField::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<FieldValue> for HeaderField {
    fn from(value: FieldValue) -> Self {
        HeaderField::Literal(value)
    }
}

impl From<&str> for HeaderField {
    fn from(value: &str) -> Self {
        HeaderField::Literal(value.into())
    }
}

impl From<String> for HeaderField {
    fn from(value: String) -> Self {
        HeaderField::Literal(value.into())
    }
}

impl<S: Into<String>> From<Vec<S>> for HeaderField {
    fn from(values: Vec<S>) -> Self {
        HeaderField::Literal(values.into())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for HeaderField {
    fn from(values: [S; N]) -> Self {
        HeaderField::Literal(values.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MailError;

    #[test]
    fn test_literal_resolution() {
        let field = HeaderField::from(vec!["a@example.com", "b@example.com"]);
        let value = field.resolve(&Locals::new()).unwrap().unwrap();
        assert_eq!(value.values(), vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn test_blank_literal_resolves_to_none() {
        assert!(HeaderField::from("  ").resolve(&Locals::new()).unwrap().is_none());
        assert!(HeaderField::from(Vec::<String>::new())
            .resolve(&Locals::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_deferred_errors_propagate() {
        let field = HeaderField::deferred(|locals: &Locals| {
            locals.fetch_str("email").map(str::to_string)
        });

        match field.resolve(&Locals::new()) {
            Err(MailError::MissingLocal(key)) => assert_eq!(key, "email"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
