//! Immutable in-memory document tree.
//!
//! Namespace declarations are not nodes of this tree. They are attached to
//! elements and resolved by scope: [`Node::in_scope_namespaces`] lists what
//! is visible at an element, inner declarations shadowing outer ones.

pub mod builder;
pub mod error;
pub mod namespace;
pub mod node;

pub use builder::{NodeBuilder, attr, attr_ns, comment, doc, elem, elem_ns, pi, text};
pub use error::{Error, NamespaceError, TreeError};
pub use namespace::{Namespace, XML_URI, XMLNS_URI};
pub use node::{Node, NodeKind, WeakNode};
