use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock, Weak};

use crate::namespace::Namespace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Element => "element",
            NodeKind::Attribute => "attribute",
            NodeKind::Text => "text",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing-instruction",
        }
    }
}

pub(crate) struct Inner {
    pub(crate) kind: NodeKind,
    pub(crate) local: Option<Arc<str>>,
    pub(crate) namespace: Option<Namespace>,
    pub(crate) value: Option<String>,
    pub(crate) declarations: Vec<Namespace>,
    pub(crate) attributes: Vec<Node>,
    pub(crate) children: Vec<Node>,
    pub(crate) parent: OnceLock<Weak<Inner>>,
}

/// Handle to a node of an immutable document tree.
///
/// Cloning is cheap. Equality and hashing use node identity, so two
/// structurally identical elements are still different nodes.
#[derive(Clone)]
pub struct Node(pub(crate) Arc<Inner>);

/// Non-owning handle, used for back references that must not keep a tree alive.
#[derive(Clone, Default)]
pub struct WeakNode(Weak<Inner>);

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }

    pub fn ptr_eq(&self, other: &WeakNode) -> bool {
        self.0.ptr_eq(&other.0)
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(node) => f.debug_tuple("WeakNode").field(&node).finish(),
            None => f.write_str("WeakNode(<dropped>)"),
        }
    }
}

impl Node {
    pub(crate) fn from_inner(inner: Inner) -> Self {
        let node = Node(Arc::new(inner));
        let weak = Arc::downgrade(&node.0);
        for child in node.0.attributes.iter().chain(node.0.children.iter()) {
            // fresh subtrees only; a node never changes its parent
            let _ = child.0.parent.set(weak.clone());
        }
        node
    }

    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    pub fn is_element(&self) -> bool {
        self.0.kind == NodeKind::Element
    }

    pub fn is_attribute(&self) -> bool {
        self.0.kind == NodeKind::Attribute
    }

    /// Local part of an element or attribute name, or the target of a
    /// processing instruction.
    pub fn local_name(&self) -> Option<&str> {
        self.0.local.as_deref()
    }

    /// `prefix:local` or `local` when the prefix is empty.
    pub fn qualified_name(&self) -> Option<String> {
        let local = self.local_name()?;
        Some(match self.namespace_prefix() {
            "" => local.to_string(),
            prefix => format!("{prefix}:{local}"),
        })
    }

    pub fn namespace(&self) -> Option<&Namespace> {
        self.0.namespace.as_ref()
    }

    pub fn namespace_prefix(&self) -> &str {
        self.namespace().map_or("", Namespace::prefix)
    }

    pub fn namespace_uri(&self) -> &str {
        self.namespace().map_or("", Namespace::uri)
    }

    /// Attribute value, character data or processing instruction data.
    pub fn value(&self) -> Option<&str> {
        self.0.value.as_deref()
    }

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.get().and_then(Weak::upgrade).map(Node)
    }

    pub fn children(&self) -> &[Node] {
        &self.0.children
    }

    pub fn attributes(&self) -> &[Node] {
        &self.0.attributes
    }

    pub fn attribute(&self, local: &str, namespace_uri: &str) -> Option<&Node> {
        self.0
            .attributes
            .iter()
            .find(|attr| attr.local_name() == Some(local) && attr.namespace_uri() == namespace_uri)
    }

    /// Namespace declarations added to this element beyond its own namespace
    /// and those of its attributes.
    pub fn declared_namespaces(&self) -> &[Namespace] {
        &self.0.declarations
    }

    /// Bindings introduced at this element: its own namespace, additional
    /// declarations, then attribute namespaces. Duplicates are skipped.
    pub fn introduced_namespaces(&self) -> Vec<Namespace> {
        let mut out: Vec<Namespace> = Vec::new();
        if self.kind() != NodeKind::Element {
            return out;
        }
        let attribute_namespaces = self.0.attributes.iter().filter_map(Node::namespace);
        let declared = self.0.namespace.iter().chain(self.0.declarations.iter());
        for ns in declared.chain(attribute_namespaces) {
            if ns.is_no_namespace() && !self.namespace().is_some_and(Namespace::is_no_namespace) {
                // unqualified attributes do not undeclare the default namespace
                continue;
            }
            if !out.iter().any(|seen| seen.prefix() == ns.prefix()) {
                out.push(ns.clone());
            }
        }
        out
    }

    /// Every binding in scope at this node, inner declarations first.
    ///
    /// The list always ends with the implicit `xml` binding and contains the
    /// empty default binding when no default namespace is in effect.
    /// Non-element nodes report the scope of their parent element.
    pub fn in_scope_namespaces(&self) -> Vec<Namespace> {
        let mut scope: Vec<Namespace> = Vec::new();
        let mut current = Some(self.clone());
        while let Some(node) = current {
            for ns in node.introduced_namespaces() {
                if !scope.iter().any(|seen| seen.prefix() == ns.prefix()) {
                    scope.push(ns);
                }
            }
            current = node.parent();
        }
        if !scope.iter().any(|ns| ns.prefix().is_empty()) {
            scope.push(Namespace::no_namespace());
        }
        if !scope.iter().any(Namespace::is_xml) {
            scope.push(Namespace::xml());
        }
        scope
    }

    /// Resolves a prefix against the bindings in scope at this node.
    pub fn lookup_namespace(&self, prefix: &str) -> Option<Namespace> {
        match prefix {
            "xml" => return Some(Namespace::xml()),
            "xmlns" => return None,
            _ => {}
        }
        let mut current = Some(self.clone());
        while let Some(node) = current {
            let introduced = node.introduced_namespaces();
            if let Some(ns) = introduced.into_iter().find(|ns| ns.prefix() == prefix) {
                return Some(ns);
            }
            current = node.parent();
        }
        prefix.is_empty().then(Namespace::no_namespace)
    }

    /// XPath string value: concatenated descendant text for documents and
    /// elements, the node's own value otherwise.
    pub fn string_value(&self) -> String {
        match self.kind() {
            NodeKind::Document | NodeKind::Element => {
                let mut out = String::new();
                collect_text(self, &mut out);
                out
            }
            _ => self.value().unwrap_or_default().to_string(),
        }
    }

    pub fn root(&self) -> Node {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// The owning document, if this node is attached to one.
    pub fn document(&self) -> Option<Node> {
        let root = self.root();
        (root.kind() == NodeKind::Document).then_some(root)
    }

    pub fn root_element(&self) -> Option<Node> {
        match self.kind() {
            NodeKind::Document => self.children().iter().find(|child| child.is_element()).cloned(),
            _ => {
                let root = self.root();
                match root.kind() {
                    NodeKind::Document => root.root_element(),
                    NodeKind::Element => Some(root),
                    _ => None,
                }
            }
        }
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Arc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

fn collect_text(node: &Node, out: &mut String) {
    for child in node.children() {
        match child.kind() {
            NodeKind::Text => out.push_str(child.value().unwrap_or_default()),
            NodeKind::Element => collect_text(child, out),
            _ => {}
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            NodeKind::Document => f.write_str("Document"),
            NodeKind::Element => {
                write!(f, "Element({})", self.qualified_name().unwrap_or_default())
            }
            NodeKind::Attribute => write!(
                f,
                "Attribute({}={:?})",
                self.qualified_name().unwrap_or_default(),
                self.value().unwrap_or_default()
            ),
            NodeKind::Text => write!(f, "Text({:?})", self.value().unwrap_or_default()),
            NodeKind::Comment => write!(f, "Comment({:?})", self.value().unwrap_or_default()),
            NodeKind::ProcessingInstruction => {
                write!(f, "ProcessingInstruction({})", self.local_name().unwrap_or_default())
            }
        }
    }
}
