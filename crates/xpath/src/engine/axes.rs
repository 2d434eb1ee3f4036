//! Axis traversal on top of the navigator primitives.
//!
//! Forward axes are lazy. Reverse axes yield in reverse document order, as
//! proximity positions in predicates require.

use std::iter;

use crate::model::{Navigator, NodeKind};
use crate::parser::ast::Axis;

pub(crate) type AxisIter<'a, T> = Box<dyn Iterator<Item = T> + 'a>;

pub(crate) fn traverse<'a, N: Navigator>(
    nav: &'a N,
    axis: Axis,
    node: &N::Node,
) -> AxisIter<'a, N::Node> {
    match axis {
        Axis::Child => Box::new(nav.children(node)),
        Axis::Attribute => match nav.kind(node) {
            NodeKind::Element => Box::new(nav.attributes(node)),
            _ => Box::new(iter::empty()),
        },
        Axis::Namespace => match nav.kind(node) {
            NodeKind::Element => Box::new(nav.namespaces(node)),
            _ => Box::new(iter::empty()),
        },
        Axis::SelfAxis => Box::new(iter::once(node.clone())),
        Axis::Parent => Box::new(nav.parent(node).into_iter()),
        Axis::Ancestor => Box::new(iter::successors(nav.parent(node), move |n| nav.parent(n))),
        Axis::AncestorOrSelf => {
            Box::new(iter::successors(Some(node.clone()), move |n| nav.parent(n)))
        }
        Axis::Descendant => Box::new(Descendants::new(nav, node, false)),
        Axis::DescendantOrSelf => Box::new(Descendants::new(nav, node, true)),
        Axis::FollowingSibling => Box::new(following_siblings(nav, node)),
        Axis::PrecedingSibling => Box::new(preceding_siblings(nav, node).into_iter().rev()),
        Axis::Following => Box::new(following(nav, node)),
        Axis::Preceding => Box::new(preceding(nav, node).into_iter()),
    }
}

/// Pre-order walk over children, one pending child iterator per level.
pub(crate) struct Descendants<'a, N: Navigator + 'a> {
    nav: &'a N,
    pending_self: Option<N::Node>,
    stack: Vec<N::Axis<'a>>,
}

impl<'a, N: Navigator> Descendants<'a, N> {
    pub(crate) fn new(nav: &'a N, node: &N::Node, include_self: bool) -> Self {
        Self {
            nav,
            pending_self: include_self.then(|| node.clone()),
            stack: vec![nav.children(node)],
        }
    }
}

impl<N: Navigator> Iterator for Descendants<'_, N> {
    type Item = N::Node;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(node) = self.pending_self.take() {
            return Some(node);
        }
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(child) => {
                    self.stack.push(self.nav.children(&child));
                    return Some(child);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

fn is_tree_child<N: Navigator>(nav: &N, node: &N::Node) -> bool {
    !matches!(nav.kind(node), NodeKind::Attribute | NodeKind::Namespace)
}

fn following_siblings<'a, N: Navigator>(nav: &'a N, node: &N::Node) -> AxisIter<'a, N::Node> {
    match nav.parent(node) {
        Some(parent) if is_tree_child(nav, node) => {
            let node = node.clone();
            Box::new(nav.children(&parent).skip_while(move |sibling| *sibling != node).skip(1))
        }
        _ => Box::new(iter::empty()),
    }
}

/// Preceding siblings in document order.
fn preceding_siblings<N: Navigator>(nav: &N, node: &N::Node) -> Vec<N::Node> {
    match nav.parent(node) {
        Some(parent) if is_tree_child(nav, node) => {
            nav.children(&parent).take_while(|sibling| sibling != node).collect()
        }
        _ => Vec::new(),
    }
}

/// Everything after the node in document order, minus its descendants.
/// For attributes and namespace nodes that includes the owner's content.
fn following<'a, N: Navigator>(nav: &'a N, node: &N::Node) -> AxisIter<'a, N::Node> {
    let (start, owner_content): (N::Node, AxisIter<'a, N::Node>) = if is_tree_child(nav, node) {
        (node.clone(), Box::new(iter::empty()))
    } else {
        match nav.parent(node) {
            Some(owner) => (owner.clone(), Box::new(Descendants::new(nav, &owner, false))),
            None => return Box::new(iter::empty()),
        }
    };
    let after = iter::successors(Some(start), move |n| nav.parent(n))
        .flat_map(move |ancestor| following_siblings(nav, &ancestor))
        .flat_map(move |sibling| Descendants::new(nav, &sibling, true));
    Box::new(owner_content.chain(after))
}

/// Everything before the node in document order, minus its ancestors, in
/// reverse document order.
fn preceding<N: Navigator>(nav: &N, node: &N::Node) -> Vec<N::Node> {
    let start = if is_tree_child(nav, node) {
        node.clone()
    } else {
        match nav.parent(node) {
            Some(owner) => owner,
            None => return Vec::new(),
        }
    };
    let mut out = Vec::new();
    for ancestor in iter::successors(Some(start), |n| nav.parent(n)) {
        for sibling in preceding_siblings(nav, &ancestor).into_iter().rev() {
            let mut subtree: Vec<N::Node> = Descendants::new(nav, &sibling, true).collect();
            subtree.reverse();
            out.extend(subtree);
        }
    }
    out
}
