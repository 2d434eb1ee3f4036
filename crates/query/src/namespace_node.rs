use std::fmt;

use arbor_core::{Namespace, Node, WeakNode};

/// A namespace binding posing as a node, as seen on the `namespace` axis.
///
/// Only the navigator creates these; results are unwrapped back to the plain
/// [`Namespace`] before they leave the crate.
#[derive(Clone)]
pub(crate) struct NamespaceNode {
    namespace: Namespace,
    owner: WeakNode,
}

impl NamespaceNode {
    pub(crate) fn new(namespace: Namespace, owner: &Node) -> Self {
        Self { namespace, owner: owner.downgrade() }
    }

    pub(crate) fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The element exposing this binding, if it is still alive.
    pub(crate) fn owner(&self) -> Option<Node> {
        self.owner.upgrade()
    }

    pub(crate) fn into_namespace(self) -> Namespace {
        self.namespace
    }
}

impl PartialEq for NamespaceNode {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.owner.ptr_eq(&other.owner)
    }
}

impl Eq for NamespaceNode {}

impl fmt::Debug for NamespaceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceNode")
            .field("namespace", &self.namespace)
            .field("owner", &self.owner)
            .finish()
    }
}
