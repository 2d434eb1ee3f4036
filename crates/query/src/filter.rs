//! Result filters.
//!
//! A filter sees every raw result of a query and decides whether it is kept
//! (`Ok(Some(_))`), silently dropped (`Ok(None)`) or rejected (`Err`). A
//! rejection aborts the evaluation.

use arbor_core::{Namespace, Node, NodeKind};

use crate::value::Item;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct Rejected {
    pub message: String,
    pub item: Item,
}

impl Rejected {
    pub fn new(item: Item, message: impl Into<String>) -> Self {
        Self { message: message.into(), item }
    }
}

pub trait Filter<T>: Send + Sync {
    fn filter(&self, item: Item) -> Result<Option<T>, Rejected>;
}

impl<T, F> Filter<T> for F
where
    F: Fn(Item) -> Result<Option<T>, Rejected> + Send + Sync,
{
    fn filter(&self, item: Item) -> Result<Option<T>, Rejected> {
        self(item)
    }
}

/// Builds a filter from a closure, pinning down its signature.
pub fn from_fn<T, F>(f: F) -> F
where
    F: Fn(Item) -> Result<Option<T>, Rejected> + Send + Sync,
{
    f
}

/// Keeps every result as is.
pub fn everything() -> impl Filter<Item> + Clone {
    from_fn(|item| Ok(Some(item)))
}

/// Tree nodes of any kind.
pub fn nodes() -> impl Filter<Node> + Clone {
    from_fn(|item| match item {
        Item::Node(node) => Ok(Some(node)),
        _ => Ok(None),
    })
}

fn node_kind(kind: NodeKind) -> impl Filter<Node> + Clone {
    from_fn(move |item| match item {
        Item::Node(node) if node.kind() == kind => Ok(Some(node)),
        _ => Ok(None),
    })
}

pub fn elements() -> impl Filter<Node> + Clone {
    node_kind(NodeKind::Element)
}

pub fn attributes() -> impl Filter<Node> + Clone {
    node_kind(NodeKind::Attribute)
}

pub fn texts() -> impl Filter<Node> + Clone {
    node_kind(NodeKind::Text)
}

pub fn comments() -> impl Filter<Node> + Clone {
    node_kind(NodeKind::Comment)
}

pub fn namespaces() -> impl Filter<Namespace> + Clone {
    from_fn(|item| match item {
        Item::Namespace(ns) => Ok(Some(ns)),
        _ => Ok(None),
    })
}

pub fn strings() -> impl Filter<String> + Clone {
    from_fn(|item| match item {
        Item::String(s) => Ok(Some(s)),
        _ => Ok(None),
    })
}

pub fn numbers() -> impl Filter<f64> + Clone {
    from_fn(|item| match item {
        Item::Number(n) => Ok(Some(n)),
        _ => Ok(None),
    })
}

pub fn booleans() -> impl Filter<bool> + Clone {
    from_fn(|item| match item {
        Item::Boolean(b) => Ok(Some(b)),
        _ => Ok(None),
    })
}

/// Turns every drop of `inner` into a rejection.
pub fn strict<T, F>(inner: F) -> impl Filter<T>
where
    F: Filter<T>,
{
    from_fn(move |item| {
        let kept = item.clone();
        match inner.filter(item)? {
            Some(value) => Ok(Some(value)),
            None => {
                let message = format!("unexpected {} in query result", kept.type_name());
                Err(Rejected::new(kept, message))
            }
        }
    })
}
