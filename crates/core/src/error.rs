use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

const DEFAULT_MESSAGE: &str = "error occurred while processing the document tree";

type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// General wrapping failure for callers that do not care which layer failed.
///
/// The reported message is the root cause's message when a cause is
/// attached, otherwise the message given at construction. The choice is
/// made every time the error is displayed.
#[derive(Debug)]
pub struct Error {
    message: String,
    root_cause: Option<Cause>,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), root_cause: None }
    }

    pub fn with_cause(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self { message: message.into(), root_cause: Some(cause.into()) }
    }

    /// Effective message: the root cause's message if present.
    pub fn message(&self) -> String {
        match &self.root_cause {
            Some(cause) => cause.to_string(),
            None => self.message.clone(),
        }
    }

    /// The message supplied at construction, ignoring any cause.
    pub fn own_message(&self) -> &str {
        &self.message
    }

    pub fn root_cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.root_cause.as_deref()
    }
}

impl Default for Error {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root_cause {
            Some(cause) => fmt::Display::fmt(cause, f),
            None => f.write_str(&self.message),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.root_cause.as_deref().map(|cause| cause as &(dyn StdError + 'static))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    #[error("namespace prefix '{0}' is not a valid NCName")]
    InvalidPrefix(String),
    #[error("namespace prefix '{0}' must be bound to a non-empty URI")]
    EmptyUri(String),
    #[error("the prefix 'xml' can only be bound to http://www.w3.org/XML/1998/namespace, not '{0}'")]
    ReservedXmlPrefix(String),
    #[error("http://www.w3.org/XML/1998/namespace can only be bound to the prefix 'xml', not '{0}'")]
    ReservedXmlUri(String),
    #[error("the prefix 'xmlns' cannot be bound")]
    ReservedXmlnsPrefix,
    #[error("http://www.w3.org/2000/xmlns/ cannot be bound")]
    ReservedXmlnsUri,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("invalid name '{0}'")]
    InvalidName(String),
    #[error("namespace collision on prefix '{prefix}': '{existing}' vs '{conflicting}'")]
    NamespaceCollision { prefix: String, existing: String, conflicting: String },
    #[error("attribute '{0}' cannot use the default namespace")]
    DefaultNamespaceAttribute(String),
    #[error("duplicate attribute '{0}'")]
    DuplicateAttribute(String),
    #[error("{kind} nodes cannot have {what}")]
    NotAllowed { kind: &'static str, what: &'static str },
    #[error("document must have exactly one root element, found {0}")]
    RootElementCount(usize),
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, Error)]
    #[error("inner")]
    struct Inner;

    #[rstest]
    fn message_prefers_root_cause() {
        let err = Error::with_cause("outer", Inner);
        assert_eq!(err.message(), "inner");
        assert_eq!(err.to_string(), "inner");
        assert_eq!(err.own_message(), "outer");
        assert_eq!(err.root_cause().map(ToString::to_string).as_deref(), Some("inner"));
        assert!(err.source().is_some());
    }

    #[rstest]
    fn message_without_cause_is_own() {
        let err = Error::new("outer");
        assert_eq!(err.message(), "outer");
        assert_eq!(err.to_string(), "outer");
        assert!(err.root_cause().is_none());
        assert!(err.source().is_none());
    }

    #[rstest]
    fn default_message() {
        assert_eq!(Error::default().to_string(), DEFAULT_MESSAGE);
    }

    #[rstest]
    fn string_causes_are_accepted() {
        let err = Error::with_cause("outer", "boxed text");
        assert_eq!(err.to_string(), "boxed text");
    }
}
