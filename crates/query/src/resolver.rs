//! Namespace and variable bindings of a query, and the callbacks that answer
//! the engine's prefix and variable lookups from them.

use std::collections::BTreeMap;
use std::fmt;

use arbor_core::namespace::is_ncname;
use arbor_core::{Namespace, XML_URI};
use arbor_xpath::{NamespaceContext, UnresolvableVariable, VariableContext};
use tracing::trace;

use crate::error::QueryError;
use crate::navigator::XPathNode;
use crate::value::Value;

/// How a variable is named when it is bound or looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableName {
    /// `local` or `prefix:local`, the prefix resolved against the query's
    /// namespaces.
    Qualified(String),
    Expanded { namespace_uri: String, local: String },
}

impl VariableName {
    pub fn expanded(namespace_uri: impl Into<String>, local: impl Into<String>) -> Self {
        VariableName::Expanded { namespace_uri: namespace_uri.into(), local: local.into() }
    }
}

impl From<&str> for VariableName {
    fn from(name: &str) -> Self {
        VariableName::Qualified(name.to_string())
    }
}

impl From<String> for VariableName {
    fn from(name: String) -> Self {
        VariableName::Qualified(name)
    }
}

impl fmt::Display for VariableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableName::Qualified(name) => write!(f, "${name}"),
            VariableName::Expanded { namespace_uri, local } if namespace_uri.is_empty() => {
                write!(f, "${local}")
            }
            VariableName::Expanded { namespace_uri, local } => {
                write!(f, "${{{namespace_uri}}}{local}")
            }
        }
    }
}

/// Validated namespace and variable bindings.
///
/// The empty prefix is always bound to the empty URI. Variables are keyed by
/// (namespace URI, local name).
#[derive(Debug, Clone, PartialEq)]
pub struct Bindings {
    namespaces: Vec<Namespace>,
    variables: BTreeMap<(String, String), Value>,
}

impl Default for Bindings {
    fn default() -> Self {
        Self { namespaces: vec![Namespace::no_namespace()], variables: BTreeMap::new() }
    }
}

impl Bindings {
    pub fn new(
        namespaces: impl IntoIterator<Item = Namespace>,
        variables: impl IntoIterator<Item = (VariableName, Value)>,
    ) -> Result<Self, QueryError> {
        let mut bindings = Self::default();
        for ns in namespaces {
            bindings.bind_namespace(ns)?;
        }
        for (name, value) in variables {
            let key = bindings.key_of(&name).map_err(|err| match err {
                QueryError::UnknownPrefix(prefix) => QueryError::InvalidBinding(format!(
                    "variable {name} uses unbound prefix '{prefix}'"
                )),
                other => other,
            })?;
            if bindings.variables.contains_key(&key) {
                return Err(QueryError::InvalidBinding(format!(
                    "variable {name} is bound more than once"
                )));
            }
            bindings.variables.insert(key, value);
        }
        Ok(bindings)
    }

    fn bind_namespace(&mut self, ns: Namespace) -> Result<(), QueryError> {
        match self.namespaces.iter().find(|bound| bound.prefix() == ns.prefix()) {
            Some(bound) if bound.uri() == ns.uri() => Ok(()),
            Some(bound) if bound.prefix().is_empty() => Err(QueryError::InvalidBinding(format!(
                "the empty prefix is reserved for the empty namespace URI, cannot bind it to '{}'",
                ns.uri()
            ))),
            Some(bound) => Err(QueryError::InvalidBinding(format!(
                "prefix '{}' is bound to both '{}' and '{}'",
                ns.prefix(),
                bound.uri(),
                ns.uri()
            ))),
            None => {
                self.namespaces.push(ns);
                Ok(())
            }
        }
    }

    /// The (namespace URI, local name) key a variable name refers to.
    pub(crate) fn key_of(&self, name: &VariableName) -> Result<(String, String), QueryError> {
        let (namespace_uri, local) = match name {
            VariableName::Expanded { namespace_uri, local } => {
                (namespace_uri.clone(), local.clone())
            }
            VariableName::Qualified(qualified) => match qualified.split_once(':') {
                Some((prefix, local)) => {
                    if !is_ncname(prefix) {
                        return Err(QueryError::InvalidBinding(format!(
                            "invalid variable name '{qualified}'"
                        )));
                    }
                    let ns = self
                        .namespace(prefix)
                        .ok_or_else(|| QueryError::UnknownPrefix(prefix.to_string()))?;
                    (ns.uri().to_string(), local.to_string())
                }
                None => (String::new(), qualified.clone()),
            },
        };
        if !is_ncname(&local) {
            return Err(QueryError::InvalidBinding(format!("invalid variable name '{local}'")));
        }
        Ok((namespace_uri, local))
    }

    pub fn namespace(&self, prefix: &str) -> Option<&Namespace> {
        self.namespaces.iter().find(|ns| ns.prefix() == prefix)
    }

    /// All namespace bindings, starting with the empty default binding.
    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    pub fn variable(&self, namespace_uri: &str, local: &str) -> Option<&Value> {
        self.variables.get(&(namespace_uri.to_string(), local.to_string()))
    }

    pub fn variable_names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables.keys().map(|(uri, local)| (uri.as_str(), local.as_str()))
    }

    /// Copy with an existing variable rebound.
    pub(crate) fn rebind(&self, name: &VariableName, value: Value) -> Result<Self, QueryError> {
        let key = self.key_of(name)?;
        if !self.variables.contains_key(&key) {
            return Err(QueryError::UnknownVariable(name.to_string()));
        }
        let mut rebound = self.clone();
        rebound.variables.insert(key, value);
        Ok(rebound)
    }
}

/// Answers the engine's lookups during one evaluation.
pub(crate) struct BindingResolver<'b> {
    bindings: &'b Bindings,
}

impl<'b> BindingResolver<'b> {
    pub(crate) fn new(bindings: &'b Bindings) -> Self {
        Self { bindings }
    }

    fn uri_of(&self, prefix: &str) -> String {
        match self.bindings.namespace(prefix) {
            Some(ns) => ns.uri().to_string(),
            None if prefix == "xml" => XML_URI.to_string(),
            None => {
                trace!(prefix, "unbound prefix resolved to the empty namespace");
                String::new()
            }
        }
    }
}

impl NamespaceContext for BindingResolver<'_> {
    fn translate_prefix(&self, prefix: &str) -> Option<String> {
        Some(self.uri_of(prefix))
    }
}

impl VariableContext<XPathNode> for BindingResolver<'_> {
    fn variable_value(
        &self,
        namespace_uri: Option<&str>,
        prefix: Option<&str>,
        local_name: &str,
    ) -> Result<arbor_xpath::Value<XPathNode>, UnresolvableVariable> {
        // the empty-URI fallback applies to name tests only
        if let Some(prefix) = prefix.filter(|p| !p.is_empty() && *p != "xml")
            && self.bindings.namespace(prefix).is_none()
        {
            return Err(UnresolvableVariable::new("", local_name).with_message(format!(
                "unable to resolve variable {prefix}:{local_name}, prefix '{prefix}' is not bound"
            )));
        }
        let mut uri = namespace_uri.unwrap_or_default().to_string();
        if uri.is_empty() {
            uri = self.uri_of(prefix.unwrap_or_default());
        }
        match self.bindings.variable(&uri, local_name) {
            Some(value) => Ok(engine_value(value)),
            None => Err(UnresolvableVariable::new(uri.as_str(), local_name).with_message(format!(
                "unable to resolve variable {local_name} in namespace '{uri}' to a value"
            ))),
        }
    }
}

fn engine_value(value: &Value) -> arbor_xpath::Value<XPathNode> {
    match value {
        Value::Nodes(nodes) => {
            arbor_xpath::Value::NodeSet(nodes.iter().cloned().map(XPathNode::Tree).collect())
        }
        Value::String(s) => arbor_xpath::Value::String(s.clone()),
        Value::Number(n) => arbor_xpath::Value::Number(*n),
        Value::Boolean(b) => arbor_xpath::Value::Boolean(*b),
    }
}
