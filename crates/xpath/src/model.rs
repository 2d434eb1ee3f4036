use core::cmp::Ordering;
use core::fmt;

use smallvec::SmallVec;

use crate::error::{Error, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    Namespace,
}

/// Expanded name of a node as reported by a navigator.
///
/// Namespace nodes carry their prefix in `local` and no namespace URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub ns_uri: Option<String>,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        Self { prefix: None, local: local.into(), ns_uri: None }
    }

    pub fn namespace_uri(&self) -> &str {
        self.ns_uri.as_deref().unwrap_or("")
    }

    /// `prefix:local`, or just `local` without a prefix.
    pub fn lexical(&self) -> String {
        match self.prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", self.local),
            _ => self.local.clone(),
        }
    }
}

/// Read access to a tree, as needed by the evaluator.
///
/// Navigation is on `&self` so one navigator can serve a whole evaluation;
/// any memoization the implementation needs goes behind interior mutability.
/// Axis iterators must not borrow the node they were created from.
pub trait Navigator {
    type Node: Clone + Eq + fmt::Debug + 'static;
    type Axis<'a>: Iterator<Item = Self::Node> + 'a
    where
        Self: 'a;

    fn kind(&self, node: &Self::Node) -> NodeKind;
    fn name(&self, node: &Self::Node) -> Option<QName>;
    fn string_value(&self, node: &Self::Node) -> String;
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
    fn children(&self, node: &Self::Node) -> Self::Axis<'_>;
    fn attributes(&self, node: &Self::Node) -> Self::Axis<'_>;
    fn namespaces(&self, node: &Self::Node) -> Self::Axis<'_>;

    /// Looks up an element by ID for `id()`. Trees without ID information
    /// keep the default.
    fn element_by_id(&self, _context: &Self::Node, _id: &str) -> Option<Self::Node> {
        None
    }

    fn root(&self, node: &Self::Node) -> Self::Node {
        let mut current = node.clone();
        while let Some(parent) = self.parent(&current) {
            current = parent;
        }
        current
    }

    fn compare_document_order(&self, a: &Self::Node, b: &Self::Node) -> Result<Ordering, Error> {
        compare_by_ancestry(self, a, b)
    }
}

/// Document order derived from ancestry and sibling position.
///
/// An ancestor precedes its descendants. Among the nodes hanging off one
/// parent, namespaces come first, then attributes, then children, each group
/// in the order the navigator yields it. Nodes from different roots have no
/// order and produce `err:FOER0000`.
pub fn compare_by_ancestry<N: Navigator + ?Sized>(
    nav: &N,
    a: &N::Node,
    b: &N::Node,
) -> Result<Ordering, Error> {
    if a == b {
        return Ok(Ordering::Equal);
    }
    let pa = path_to_root(nav, a);
    let pb = path_to_root(nav, b);
    let len = pa.len().min(pb.len());
    let mut i = 0usize;
    while i < len && pa[i] == pb[i] {
        i += 1;
    }
    if i == len {
        return Ok(pa.len().cmp(&pb.len()));
    }
    if i == 0 {
        return Err(Error::from_code(
            ErrorCode::FOER0000,
            "document order is undefined for nodes from different roots",
        ));
    }
    let parent = &pa[i - 1];
    let (na, nb) = (&pa[i], &pb[i]);
    let siblings =
        nav.namespaces(parent).chain(nav.attributes(parent)).chain(nav.children(parent));
    for sibling in siblings {
        if sibling == *na {
            return Ok(Ordering::Less);
        }
        if sibling == *nb {
            return Ok(Ordering::Greater);
        }
    }
    Ok(Ordering::Equal)
}

fn path_to_root<N: Navigator + ?Sized>(nav: &N, node: &N::Node) -> SmallVec<[N::Node; 16]> {
    let mut path: SmallVec<[N::Node; 16]> = SmallVec::new();
    path.push(node.clone());
    let mut current = node.clone();
    while let Some(parent) = nav.parent(&current) {
        path.push(parent.clone());
        current = parent;
    }
    path.reverse();
    path
}
