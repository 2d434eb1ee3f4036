//! [`QueryFactory`] backed by `arbor-xpath`.

use std::fmt;
use std::sync::{Arc, Mutex};

use arbor_core::Node;
use arbor_xpath::{DynamicContextBuilder, XPathExpr, compile_xpath};
use tracing::{debug, trace};

use crate::compiled::{CompiledExpression, QueryFactory};
use crate::error::{QueryError, evaluation_failed, invalid_expression};
use crate::navigator::{NavigatorLease, TreeNavigator, XPathNode};
use crate::resolver::{BindingResolver, Bindings};
use crate::value::Item;

#[derive(Debug, Clone, Copy, Default)]
pub struct XPathFactory;

impl QueryFactory for XPathFactory {
    fn compile_expression(
        &self,
        expression: &str,
    ) -> Result<Arc<dyn CompiledExpression>, QueryError> {
        let xpath = compile_xpath(expression).map_err(|err| {
            debug!(expression, error = %err, "query rejected");
            invalid_expression(expression, err)
        })?;
        debug!(expression, "query compiled");
        Ok(Arc::new(EngineExpression { xpath, navigator: Mutex::new(TreeNavigator::default()) }))
    }
}

struct EngineExpression {
    xpath: XPathExpr,
    navigator: Mutex<TreeNavigator>,
}

impl fmt::Debug for EngineExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineExpression").field("expression", &self.xpath.source()).finish()
    }
}

impl CompiledExpression for EngineExpression {
    fn expression(&self) -> &str {
        self.xpath.source()
    }

    fn evaluate_raw(&self, context: &Node, bindings: &Bindings) -> Result<Vec<Item>, QueryError> {
        let lease = NavigatorLease::acquire(&self.navigator, context);
        let resolver = BindingResolver::new(bindings);
        let ctx = DynamicContextBuilder::new(&*lease, XPathNode::Tree(context.clone()))
            .with_namespaces(&resolver)
            .with_variables(&resolver)
            .build();
        let raw = self.xpath.select(&ctx).map_err(|err| evaluation_failed(self.expression(), err))?;
        trace!(expression = self.expression(), items = raw.len(), "raw evaluation");
        Ok(raw.into_iter().map(unwrap_item).collect())
    }

    fn evaluate_raw_first(
        &self,
        context: &Node,
        bindings: &Bindings,
    ) -> Result<Option<Item>, QueryError> {
        let lease = NavigatorLease::acquire(&self.navigator, context);
        let resolver = BindingResolver::new(bindings);
        let ctx = DynamicContextBuilder::new(&*lease, XPathNode::Tree(context.clone()))
            .with_namespaces(&resolver)
            .with_variables(&resolver)
            .build();
        let first = self
            .xpath
            .select_first(&ctx)
            .map_err(|err| evaluation_failed(self.expression(), err))?;
        Ok(first.map(unwrap_item))
    }
}

/// The only place engine items turn into caller items. Namespace
/// pseudo-nodes become plain bindings here.
pub(crate) fn unwrap_item(item: arbor_xpath::Item<XPathNode>) -> Item {
    match item {
        arbor_xpath::Item::Node(XPathNode::Tree(node)) => Item::Node(node),
        arbor_xpath::Item::Node(XPathNode::Namespace(ns)) => Item::Namespace(ns.into_namespace()),
        arbor_xpath::Item::String(s) => Item::String(s),
        arbor_xpath::Item::Number(n) => Item::Number(n),
        arbor_xpath::Item::Boolean(b) => Item::Boolean(b),
    }
}
