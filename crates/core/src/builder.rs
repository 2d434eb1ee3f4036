//! Fluent construction of document trees.
//!
//! ```
//! use arbor_core::{Namespace, attr, doc, elem_ns, text};
//!
//! let ns = Namespace::new("p", "urn:p").unwrap();
//! let tree = doc()
//!     .child(elem_ns("root", ns).attr(attr("id", "r")).child(text("hello")))
//!     .build()
//!     .unwrap();
//! assert_eq!(tree.string_value(), "hello");
//! ```

use std::sync::{Arc, OnceLock};

use crate::error::TreeError;
use crate::namespace::{Namespace, is_ncname};
use crate::node::{Inner, Node, NodeKind};

#[derive(Debug, Clone)]
pub struct NodeBuilder {
    kind: NodeKind,
    local: Option<String>,
    namespace: Option<Namespace>,
    value: Option<String>,
    declarations: Vec<Namespace>,
    attributes: Vec<NodeBuilder>,
    children: Vec<NodeBuilder>,
}

impl NodeBuilder {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            local: None,
            namespace: None,
            value: None,
            declarations: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn child(mut self, child: NodeBuilder) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = NodeBuilder>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn attr(mut self, attribute: NodeBuilder) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Adds a namespace declaration to an element.
    pub fn namespace(mut self, namespace: Namespace) -> Self {
        self.declarations.push(namespace);
        self
    }

    pub fn build(self) -> Result<Node, TreeError> {
        self.validate()?;
        let attributes = self
            .attributes
            .into_iter()
            .map(NodeBuilder::build)
            .collect::<Result<Vec<_>, _>>()?;
        let children = self
            .children
            .into_iter()
            .map(NodeBuilder::build)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node::from_inner(Inner {
            kind: self.kind,
            local: self.local.map(Arc::from),
            namespace: self.namespace,
            value: self.value,
            declarations: self.declarations,
            attributes,
            children,
            parent: OnceLock::new(),
        }))
    }

    fn validate(&self) -> Result<(), TreeError> {
        let kind = self.kind.as_str();
        if self.kind != NodeKind::Element {
            if !self.attributes.is_empty() {
                return Err(TreeError::NotAllowed { kind, what: "attributes" });
            }
            if !self.declarations.is_empty() {
                return Err(TreeError::NotAllowed { kind, what: "namespace declarations" });
            }
        }
        if !matches!(self.kind, NodeKind::Element | NodeKind::Document)
            && !self.children.is_empty()
        {
            return Err(TreeError::NotAllowed { kind, what: "children" });
        }
        if let Some(local) = &self.local
            && !is_ncname(local)
        {
            return Err(TreeError::InvalidName(local.clone()));
        }
        match self.kind {
            NodeKind::Element => self.validate_element(),
            NodeKind::Document => {
                let roots = self
                    .children
                    .iter()
                    .filter(|child| child.kind == NodeKind::Element)
                    .count();
                if roots > 1 {
                    return Err(TreeError::RootElementCount(roots));
                }
                if self.children.iter().any(|child| child.kind == NodeKind::Text) {
                    return Err(TreeError::NotAllowed { kind, what: "text children" });
                }
                Ok(())
            }
            NodeKind::Attribute => match &self.namespace {
                Some(ns) if ns.prefix().is_empty() && !ns.uri().is_empty() => Err(
                    TreeError::DefaultNamespaceAttribute(self.local.clone().unwrap_or_default()),
                ),
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }

    fn validate_element(&self) -> Result<(), TreeError> {
        let mut bindings: Vec<&Namespace> = self.namespace.iter().collect();
        let attribute_namespaces = self
            .attributes
            .iter()
            .filter_map(|attr| attr.namespace.as_ref())
            .filter(|ns| !ns.is_no_namespace());
        for ns in self.declarations.iter().chain(attribute_namespaces) {
            match bindings.iter().find(|bound| bound.prefix() == ns.prefix()) {
                Some(bound) if bound.uri() != ns.uri() => {
                    return Err(TreeError::NamespaceCollision {
                        prefix: ns.prefix().to_string(),
                        existing: bound.uri().to_string(),
                        conflicting: ns.uri().to_string(),
                    });
                }
                Some(_) => {}
                None => bindings.push(ns),
            }
        }
        for (index, attribute) in self.attributes.iter().enumerate() {
            if attribute.kind != NodeKind::Attribute {
                return Err(TreeError::NotAllowed {
                    kind: attribute.kind.as_str(),
                    what: "an attribute slot",
                });
            }
            let duplicate = self.attributes[..index].iter().any(|other| {
                other.local == attribute.local && other.namespace_uri() == attribute.namespace_uri()
            });
            if duplicate {
                let local = attribute.local.clone().unwrap_or_default();
                return Err(TreeError::DuplicateAttribute(local));
            }
        }
        let misplaced = self
            .children
            .iter()
            .any(|child| matches!(child.kind, NodeKind::Attribute | NodeKind::Document));
        if misplaced {
            return Err(TreeError::NotAllowed {
                kind: "element",
                what: "attribute or document children",
            });
        }
        Ok(())
    }

    fn namespace_uri(&self) -> &str {
        self.namespace.as_ref().map_or("", Namespace::uri)
    }
}

pub fn doc() -> NodeBuilder {
    NodeBuilder::new(NodeKind::Document)
}

/// Element in no namespace.
pub fn elem(local: &str) -> NodeBuilder {
    elem_ns(local, Namespace::no_namespace())
}

pub fn elem_ns(local: &str, namespace: Namespace) -> NodeBuilder {
    let mut builder = NodeBuilder::new(NodeKind::Element);
    builder.local = Some(local.to_string());
    builder.namespace = Some(namespace);
    builder
}

/// Attribute in no namespace. `xml:`-prefixed names bind the xml namespace.
pub fn attr(name: &str, value: &str) -> NodeBuilder {
    match name.strip_prefix("xml:") {
        Some(local) => attr_ns(local, Namespace::xml(), value),
        None => attr_ns(name, Namespace::no_namespace(), value),
    }
}

pub fn attr_ns(local: &str, namespace: Namespace, value: &str) -> NodeBuilder {
    let mut builder = NodeBuilder::new(NodeKind::Attribute);
    builder.local = Some(local.to_string());
    builder.namespace = Some(namespace);
    builder.value = Some(value.to_string());
    builder
}

pub fn text(value: &str) -> NodeBuilder {
    let mut builder = NodeBuilder::new(NodeKind::Text);
    builder.value = Some(value.to_string());
    builder
}

pub fn comment(value: &str) -> NodeBuilder {
    let mut builder = NodeBuilder::new(NodeKind::Comment);
    builder.value = Some(value.to_string());
    builder
}

pub fn pi(target: &str, data: &str) -> NodeBuilder {
    let mut builder = NodeBuilder::new(NodeKind::ProcessingInstruction);
    builder.local = Some(target.to_string());
    builder.value = Some(data.to_string());
    builder
}
