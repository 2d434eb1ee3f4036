use std::collections::HashMap;

use crate::model::Navigator;
use crate::value::Value;

/// Resolves namespace prefixes used in name tests, variable references and
/// function names. Called during evaluation, not at compile time.
pub trait NamespaceContext {
    /// `None` means the prefix is unbound.
    fn translate_prefix(&self, prefix: &str) -> Option<String>;
}

/// Signal returned by a [`VariableContext`] that has no value for a name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct UnresolvableVariable {
    pub namespace_uri: String,
    pub local_name: String,
    pub message: String,
}

impl UnresolvableVariable {
    pub fn new(namespace_uri: impl Into<String>, local_name: impl Into<String>) -> Self {
        let namespace_uri = namespace_uri.into();
        let local_name = local_name.into();
        let message = if namespace_uri.is_empty() {
            format!("unable to resolve variable ${local_name}")
        } else {
            format!("unable to resolve variable ${{{namespace_uri}}}{local_name}")
        };
        Self { namespace_uri, local_name, message }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

pub trait VariableContext<N> {
    /// `namespace_uri` is `None` for unprefixed references; for prefixed ones
    /// it is the URI the prefix was translated to.
    fn variable_value(
        &self,
        namespace_uri: Option<&str>,
        prefix: Option<&str>,
        local_name: &str,
    ) -> Result<Value<N>, UnresolvableVariable>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoNamespaces;

impl NamespaceContext for NoNamespaces {
    fn translate_prefix(&self, _prefix: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoVariables;

impl<N> VariableContext<N> for NoVariables {
    fn variable_value(
        &self,
        namespace_uri: Option<&str>,
        _prefix: Option<&str>,
        local_name: &str,
    ) -> Result<Value<N>, UnresolvableVariable> {
        Err(UnresolvableVariable::new(namespace_uri.unwrap_or_default(), local_name))
    }
}

/// Prefix map backed namespace context.
#[derive(Debug, Clone, Default)]
pub struct SimpleNamespaceContext {
    by_prefix: HashMap<String, String>,
}

impl SimpleNamespaceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.by_prefix.insert(prefix.into(), uri.into());
        self
    }
}

impl NamespaceContext for SimpleNamespaceContext {
    fn translate_prefix(&self, prefix: &str) -> Option<String> {
        self.by_prefix.get(prefix).cloned()
    }
}

/// Variables keyed by (namespace URI, local name).
#[derive(Debug, Clone)]
pub struct SimpleVariableContext<N> {
    values: HashMap<(String, String), Value<N>>,
}

impl<N> Default for SimpleVariableContext<N> {
    fn default() -> Self {
        Self { values: HashMap::new() }
    }
}

impl<N> SimpleVariableContext<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, local: impl Into<String>, value: impl Into<Value<N>>) -> Self {
        self.values.insert((String::new(), local.into()), value.into());
        self
    }

    pub fn with_variable_ns(
        mut self,
        namespace_uri: impl Into<String>,
        local: impl Into<String>,
        value: impl Into<Value<N>>,
    ) -> Self {
        self.values.insert((namespace_uri.into(), local.into()), value.into());
        self
    }
}

impl<N: Clone> VariableContext<N> for SimpleVariableContext<N> {
    fn variable_value(
        &self,
        namespace_uri: Option<&str>,
        _prefix: Option<&str>,
        local_name: &str,
    ) -> Result<Value<N>, UnresolvableVariable> {
        let uri = namespace_uri.unwrap_or_default();
        self.values
            .get(&(uri.to_string(), local_name.to_string()))
            .cloned()
            .ok_or_else(|| UnresolvableVariable::new(uri, local_name))
    }
}

/// Everything an evaluation needs besides the compiled expression.
pub struct DynamicContext<'a, N: Navigator> {
    pub(crate) navigator: &'a N,
    pub(crate) node: N::Node,
    pub(crate) namespaces: &'a dyn NamespaceContext,
    pub(crate) variables: &'a dyn VariableContext<N::Node>,
}

impl<N: Navigator> DynamicContext<'_, N> {
    pub fn context_node(&self) -> &N::Node {
        &self.node
    }
}

pub struct DynamicContextBuilder<'a, N: Navigator> {
    navigator: &'a N,
    node: N::Node,
    namespaces: &'a dyn NamespaceContext,
    variables: &'a dyn VariableContext<N::Node>,
}

impl<'a, N: Navigator> DynamicContextBuilder<'a, N> {
    pub fn new(navigator: &'a N, node: N::Node) -> Self {
        Self { navigator, node, namespaces: &NoNamespaces, variables: &NoVariables }
    }

    pub fn with_namespaces(mut self, namespaces: &'a dyn NamespaceContext) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn with_variables(mut self, variables: &'a dyn VariableContext<N::Node>) -> Self {
        self.variables = variables;
        self
    }

    pub fn build(self) -> DynamicContext<'a, N> {
        DynamicContext {
            navigator: self.navigator,
            node: self.node,
            namespaces: self.namespaces,
            variables: self.variables,
        }
    }
}
