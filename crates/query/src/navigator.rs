//! Exposes [`arbor_core`] trees to the XPath engine.
//!
//! The tree keeps namespace declarations off the node graph, while the
//! engine expects a `namespace` axis of real nodes. [`TreeNavigator`]
//! synthesizes [`NamespaceNode`]s for that axis from the element's scope and
//! memoizes the scope per element for the duration of one evaluation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arbor_core::{Namespace, Node};
use arbor_xpath::{Navigator, NodeKind, QName};
use tracing::trace;

use crate::namespace_node::NamespaceNode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum XPathNode {
    Tree(Node),
    Namespace(NamespaceNode),
}

/// Per-evaluation navigation state. Reset between evaluations, see
/// [`NavigatorLease`].
#[derive(Debug, Default)]
pub(crate) struct TreeNavigator {
    scopes: RefCell<HashMap<Node, Arc<[Namespace]>>>,
}

impl TreeNavigator {
    /// Memoizes the scope of the element the context node lives in.
    pub(crate) fn preload(&self, context: &Node) {
        let element = if context.is_element() {
            Some(context.clone())
        } else {
            context.parent().filter(Node::is_element)
        };
        if let Some(element) = element {
            self.scope_of(&element);
        }
    }

    pub(crate) fn reset(&self) {
        self.scopes.borrow_mut().clear();
    }

    #[cfg(test)]
    pub(crate) fn is_clean(&self) -> bool {
        self.scopes.borrow().is_empty()
    }

    #[cfg(test)]
    pub(crate) fn is_memoized(&self, element: &Node) -> bool {
        self.scopes.borrow().contains_key(element)
    }

    /// Bindings reported on the namespace axis of `element`.
    ///
    /// The implicit `xml` binding and the empty default binding are left out.
    pub(crate) fn scope_of(&self, element: &Node) -> Arc<[Namespace]> {
        if let Some(scope) = self.scopes.borrow().get(element) {
            return Arc::clone(scope);
        }
        let scope: Arc<[Namespace]> = element
            .in_scope_namespaces()
            .into_iter()
            .filter(|ns| !ns.is_xml() && !ns.is_no_namespace())
            .collect();
        trace!(element = ?element, bindings = scope.len(), "memoized namespace scope");
        self.scopes.borrow_mut().insert(element.clone(), Arc::clone(&scope));
        scope
    }
}

/// Restartable axis iterator. Holds the node it walks and an index, never a
/// shared cursor.
pub(crate) enum TreeAxis {
    Children { parent: Node, index: usize },
    Attributes { owner: Node, index: usize },
    Namespaces { owner: Node, scope: Arc<[Namespace]>, index: usize },
    Empty,
}

impl Iterator for TreeAxis {
    type Item = XPathNode;

    fn next(&mut self) -> Option<XPathNode> {
        match self {
            TreeAxis::Children { parent, index } => {
                let child = parent.children().get(*index)?.clone();
                *index += 1;
                Some(XPathNode::Tree(child))
            }
            TreeAxis::Attributes { owner, index } => {
                let attribute = owner.attributes().get(*index)?.clone();
                *index += 1;
                Some(XPathNode::Tree(attribute))
            }
            TreeAxis::Namespaces { owner, scope, index } => {
                let namespace = scope.get(*index)?.clone();
                *index += 1;
                Some(XPathNode::Namespace(NamespaceNode::new(namespace, owner)))
            }
            TreeAxis::Empty => None,
        }
    }
}

fn qualified(local: &str, namespace: Option<&Namespace>) -> QName {
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
    QName {
        prefix: namespace.and_then(|ns| non_empty(ns.prefix())),
        local: local.to_string(),
        ns_uri: namespace.and_then(|ns| non_empty(ns.uri())),
    }
}

impl Navigator for TreeNavigator {
    type Node = XPathNode;
    type Axis<'a>
        = TreeAxis
    where
        Self: 'a;

    fn kind(&self, node: &XPathNode) -> NodeKind {
        match node {
            XPathNode::Namespace(_) => NodeKind::Namespace,
            XPathNode::Tree(node) => match node.kind() {
                arbor_core::NodeKind::Document => NodeKind::Document,
                arbor_core::NodeKind::Element => NodeKind::Element,
                arbor_core::NodeKind::Attribute => NodeKind::Attribute,
                arbor_core::NodeKind::Text => NodeKind::Text,
                arbor_core::NodeKind::Comment => NodeKind::Comment,
                arbor_core::NodeKind::ProcessingInstruction => NodeKind::ProcessingInstruction,
            },
        }
    }

    fn name(&self, node: &XPathNode) -> Option<QName> {
        match node {
            XPathNode::Namespace(ns) => Some(QName::local(ns.namespace().prefix())),
            XPathNode::Tree(node) => match node.kind() {
                arbor_core::NodeKind::Element | arbor_core::NodeKind::Attribute => {
                    node.local_name().map(|local| qualified(local, node.namespace()))
                }
                arbor_core::NodeKind::ProcessingInstruction => node.local_name().map(QName::local),
                _ => None,
            },
        }
    }

    fn string_value(&self, node: &XPathNode) -> String {
        match node {
            XPathNode::Namespace(ns) => ns.namespace().uri().to_string(),
            XPathNode::Tree(node) => node.string_value(),
        }
    }

    fn parent(&self, node: &XPathNode) -> Option<XPathNode> {
        match node {
            XPathNode::Namespace(ns) => ns.owner().map(XPathNode::Tree),
            XPathNode::Tree(node) => node.parent().map(XPathNode::Tree),
        }
    }

    fn children(&self, node: &XPathNode) -> Self::Axis<'_> {
        match node {
            XPathNode::Tree(node) if !node.children().is_empty() => {
                TreeAxis::Children { parent: node.clone(), index: 0 }
            }
            _ => TreeAxis::Empty,
        }
    }

    fn attributes(&self, node: &XPathNode) -> Self::Axis<'_> {
        match node {
            XPathNode::Tree(node) if node.is_element() => {
                TreeAxis::Attributes { owner: node.clone(), index: 0 }
            }
            _ => TreeAxis::Empty,
        }
    }

    fn namespaces(&self, node: &XPathNode) -> Self::Axis<'_> {
        match node {
            XPathNode::Tree(node) if node.is_element() => {
                TreeAxis::Namespaces { owner: node.clone(), scope: self.scope_of(node), index: 0 }
            }
            _ => TreeAxis::Empty,
        }
    }
}

/// Exclusive, scoped use of a query's navigator.
///
/// Acquiring resets the navigator and preloads the context; dropping resets
/// it again, so no scope survives into the next evaluation on any exit path.
pub(crate) struct NavigatorLease<'a> {
    guard: MutexGuard<'a, TreeNavigator>,
}

impl<'a> NavigatorLease<'a> {
    pub(crate) fn acquire(navigator: &'a Mutex<TreeNavigator>, context: &Node) -> Self {
        // a panic mid-evaluation poisons the lock; the state is reset below anyway
        let guard = navigator.lock().unwrap_or_else(PoisonError::into_inner);
        guard.reset();
        guard.preload(context);
        trace!(context = ?context, "navigator acquired");
        Self { guard }
    }
}

impl Deref for NavigatorLease<'_> {
    type Target = TreeNavigator;

    fn deref(&self) -> &TreeNavigator {
        &self.guard
    }
}

impl Drop for NavigatorLease<'_> {
    fn drop(&mut self) {
        self.guard.reset();
        trace!("navigator released");
    }
}
