use std::fmt;
use std::sync::Arc;

use arbor_core::{Namespace, Node};
use tracing::trace;

use crate::backend::XPathFactory;
use crate::error::{QueryError, evaluation_failed};
use crate::filter::{Filter, everything};
use crate::resolver::{Bindings, VariableName};
use crate::value::{Item, Value};

/// An expression compiled by some engine, evaluated against tree nodes.
///
/// Implementations unwrap engine-specific results into [`Item`]s and report
/// engine failures as [`QueryError::EvaluationFailed`].
pub trait CompiledExpression: Send + Sync + fmt::Debug {
    fn expression(&self) -> &str;

    /// Every result, in the order the engine produced them.
    fn evaluate_raw(&self, context: &Node, bindings: &Bindings) -> Result<Vec<Item>, QueryError>;

    /// The first result the engine produces, computed as cheaply as it can.
    fn evaluate_raw_first(
        &self,
        context: &Node,
        bindings: &Bindings,
    ) -> Result<Option<Item>, QueryError>;
}

/// Engine entry point: turns expression text into a [`CompiledExpression`].
pub trait QueryFactory {
    fn compile_expression(
        &self,
        expression: &str,
    ) -> Result<Arc<dyn CompiledExpression>, QueryError>;

    fn compile<T>(
        &self,
        expression: &str,
        filter: impl Filter<T> + 'static,
        variables: impl IntoIterator<Item = (VariableName, Value)>,
        namespaces: impl IntoIterator<Item = Namespace>,
    ) -> Result<CompiledQuery<T>, QueryError>
    where
        Self: Sized,
    {
        let bindings = Bindings::new(namespaces, variables)?;
        let handle = self.compile_expression(expression)?;
        Ok(CompiledQuery::from_parts(Arc::new(filter), Arc::new(bindings), handle))
    }
}

/// A reusable query: compiled expression, result filter and bindings.
///
/// Immutable once built and safe to share between threads. Cloning shares
/// the compiled expression.
pub struct CompiledQuery<T> {
    filter: Arc<dyn Filter<T>>,
    bindings: Arc<Bindings>,
    handle: Arc<dyn CompiledExpression>,
}

impl<T> Clone for CompiledQuery<T> {
    fn clone(&self) -> Self {
        Self {
            filter: Arc::clone(&self.filter),
            bindings: Arc::clone(&self.bindings),
            handle: Arc::clone(&self.handle),
        }
    }
}

impl<T> fmt::Debug for CompiledQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledQuery")
            .field("expression", &self.expression())
            .field("namespaces", &self.bindings.namespaces())
            .field("variables", &self.bindings.variable_names().collect::<Vec<_>>())
            .finish()
    }
}

/// What one evaluation produced before and after filtering.
#[derive(Debug, Clone)]
pub struct Diagnostic<T> {
    pub context: Node,
    pub first_only: bool,
    /// Unfiltered results.
    pub raw: Vec<Item>,
    /// Results the filter kept, already converted.
    pub results: Vec<T>,
    /// Results the filter dropped or rejected.
    pub filtered: Vec<Item>,
}

impl<T> CompiledQuery<T> {
    pub(crate) fn from_parts(
        filter: Arc<dyn Filter<T>>,
        bindings: Arc<Bindings>,
        handle: Arc<dyn CompiledExpression>,
    ) -> Self {
        Self { filter, bindings, handle }
    }

    pub fn expression(&self) -> &str {
        self.handle.expression()
    }

    /// Evaluates against `context` and filters every result.
    pub fn evaluate(&self, context: &Node) -> Result<Vec<T>, QueryError> {
        let raw = self.handle.evaluate_raw(context, &self.bindings)?;
        let mut results = Vec::with_capacity(raw.len());
        for item in raw {
            if let Some(value) = self.accept(item)? {
                results.push(value);
            }
        }
        trace!(expression = self.expression(), results = results.len(), "query evaluated");
        Ok(results)
    }

    /// First result that passes the filter, if any.
    pub fn evaluate_first(&self, context: &Node) -> Result<Option<T>, QueryError> {
        let Some(first) = self.handle.evaluate_raw_first(context, &self.bindings)? else {
            return Ok(None);
        };
        if let Some(value) = self.accept(first)? {
            return Ok(Some(value));
        }
        // the engine's first result was dropped, later ones may still pass
        let rest = self.handle.evaluate_raw(context, &self.bindings)?;
        for item in rest.into_iter().skip(1) {
            if let Some(value) = self.accept(item)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Evaluates and reports raw, kept and filtered results side by side.
    /// Rejections are listed as filtered rather than failing the call.
    pub fn diagnose(&self, context: &Node, first_only: bool) -> Result<Diagnostic<T>, QueryError> {
        let raw = if first_only {
            self.handle.evaluate_raw_first(context, &self.bindings)?.into_iter().collect()
        } else {
            self.handle.evaluate_raw(context, &self.bindings)?
        };
        let mut results = Vec::new();
        let mut filtered = Vec::new();
        for item in &raw {
            match self.filter.filter(item.clone()) {
                Ok(Some(value)) => results.push(value),
                Ok(None) | Err(_) => filtered.push(item.clone()),
            }
        }
        Ok(Diagnostic { context: context.clone(), first_only, raw, results, filtered })
    }

    fn accept(&self, item: Item) -> Result<Option<T>, QueryError> {
        self.filter.filter(item).map_err(|rejected| evaluation_failed(self.expression(), rejected))
    }

    pub fn filter(&self) -> &dyn Filter<T> {
        self.filter.as_ref()
    }

    pub fn namespace(&self, prefix: &str) -> Result<&Namespace, QueryError> {
        self.bindings.namespace(prefix).ok_or_else(|| QueryError::UnknownPrefix(prefix.to_string()))
    }

    pub fn namespaces(&self) -> &[Namespace] {
        self.bindings.namespaces()
    }

    /// Value of a variable given as `local` or `prefix:local`.
    pub fn variable(&self, name: &str) -> Result<&Value, QueryError> {
        self.variable_by(&VariableName::from(name))
    }

    pub fn variable_ns(&self, namespace_uri: &str, local: &str) -> Result<&Value, QueryError> {
        self.variable_by(&VariableName::expanded(namespace_uri, local))
    }

    fn variable_by(&self, name: &VariableName) -> Result<&Value, QueryError> {
        let (uri, local) = self.bindings.key_of(name)?;
        self.bindings
            .variable(&uri, &local)
            .ok_or_else(|| QueryError::UnknownVariable(name.to_string()))
    }

    /// (namespace URI, local name) of every bound variable.
    pub fn variable_names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.variable_names()
    }

    /// A new query with the variable `name` rebound; this one is unchanged.
    pub fn with_variable(
        &self,
        name: impl Into<VariableName>,
        value: impl Into<Value>,
    ) -> Result<Self, QueryError> {
        let bindings = self.bindings.rebind(&name.into(), value.into())?;
        Ok(Self {
            filter: Arc::clone(&self.filter),
            bindings: Arc::new(bindings),
            handle: Arc::clone(&self.handle),
        })
    }
}

/// Incremental setup of a [`CompiledQuery`].
///
/// ```
/// use arbor_core::{Namespace, doc, elem_ns};
/// use arbor_query::{QueryBuilder, filter};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let ns = Namespace::new("x", "urn:x")?;
/// let tree = doc().child(elem_ns("item", ns.clone())).build()?;
/// let query = QueryBuilder::new("//x:item[$n]")
///     .with_filter(filter::elements())
///     .with_namespace(ns)
///     .with_variable("n", 1)
///     .compile()?;
/// assert_eq!(query.evaluate(&tree)?.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct QueryBuilder<T> {
    expression: String,
    filter: Arc<dyn Filter<T>>,
    variables: Vec<(VariableName, Value)>,
    namespaces: Vec<Namespace>,
}

impl QueryBuilder<Item> {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            filter: Arc::new(everything()),
            variables: Vec::new(),
            namespaces: Vec::new(),
        }
    }
}

impl<T> QueryBuilder<T> {
    pub fn with_filter<U>(self, filter: impl Filter<U> + 'static) -> QueryBuilder<U> {
        QueryBuilder {
            expression: self.expression,
            filter: Arc::new(filter),
            variables: self.variables,
            namespaces: self.namespaces,
        }
    }

    pub fn with_variable(mut self, name: impl Into<VariableName>, value: impl Into<Value>) -> Self {
        self.variables.push((name.into(), value.into()));
        self
    }

    pub fn with_variable_ns(
        mut self,
        namespace_uri: impl Into<String>,
        local: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.variables.push((VariableName::expanded(namespace_uri, local), value.into()));
        self
    }

    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.namespaces.push(namespace);
        self
    }

    pub fn with_namespaces(mut self, namespaces: impl IntoIterator<Item = Namespace>) -> Self {
        self.namespaces.extend(namespaces);
        self
    }

    /// Compiles with the bundled XPath engine.
    pub fn compile(self) -> Result<CompiledQuery<T>, QueryError> {
        self.compile_with(&XPathFactory)
    }

    pub fn compile_with(self, factory: &impl QueryFactory) -> Result<CompiledQuery<T>, QueryError> {
        let bindings = Bindings::new(self.namespaces, self.variables)?;
        let handle = factory.compile_expression(&self.expression)?;
        Ok(CompiledQuery::from_parts(self.filter, Arc::new(bindings), handle))
    }
}
