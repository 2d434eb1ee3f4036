use std::fmt;
use std::sync::Arc;

use crate::error::NamespaceError;

pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_URI: &str = "http://www.w3.org/2000/xmlns/";

/// An immutable prefix to URI binding.
///
/// The empty prefix denotes the default namespace. `("", "")` is the
/// "no namespace" binding every unqualified element lives in.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    prefix: Arc<str>,
    uri: Arc<str>,
}

impl Namespace {
    /// Validates and creates a binding.
    pub fn new(prefix: impl AsRef<str>, uri: impl AsRef<str>) -> Result<Self, NamespaceError> {
        let prefix = prefix.as_ref();
        let uri = uri.as_ref();

        if prefix.is_empty() && uri.is_empty() {
            return Ok(Self::no_namespace());
        }
        if prefix == "xml" {
            return if uri == XML_URI {
                Ok(Self::xml())
            } else {
                Err(NamespaceError::ReservedXmlPrefix(uri.to_string()))
            };
        }
        if uri == XML_URI {
            return Err(NamespaceError::ReservedXmlUri(prefix.to_string()));
        }
        if prefix == "xmlns" {
            return Err(NamespaceError::ReservedXmlnsPrefix);
        }
        if uri == XMLNS_URI {
            return Err(NamespaceError::ReservedXmlnsUri);
        }
        if !prefix.is_empty() {
            if !is_ncname(prefix) {
                return Err(NamespaceError::InvalidPrefix(prefix.to_string()));
            }
            if uri.is_empty() {
                return Err(NamespaceError::EmptyUri(prefix.to_string()));
            }
        }
        Ok(Self { prefix: Arc::from(prefix), uri: Arc::from(uri) })
    }

    pub fn no_namespace() -> Self {
        Self { prefix: Arc::from(""), uri: Arc::from("") }
    }

    pub fn xml() -> Self {
        Self { prefix: Arc::from("xml"), uri: Arc::from(XML_URI) }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn is_no_namespace(&self) -> bool {
        self.prefix.is_empty() && self.uri.is_empty()
    }

    pub fn is_xml(&self) -> bool {
        &*self.prefix == "xml"
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace({:?} => {:?})", self.prefix, self.uri)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "xmlns=\"{}\"", self.uri)
        } else {
            write!(f, "xmlns:{}=\"{}\"", self.prefix, self.uri)
        }
    }
}

/// Checks the NCName production (a name without colons).
pub fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start) && chars.all(is_name_char)
}

// NameStartChar of XML 1.1 without ':'
fn is_name_start(c: char) -> bool {
    matches!(c,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}
