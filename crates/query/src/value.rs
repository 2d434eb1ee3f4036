use arbor_core::{Namespace, Node};

/// One query result, after namespace pseudo-nodes have been unwrapped.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Node(Node),
    /// A binding reached through the `namespace` axis.
    Namespace(Namespace),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Item {
    pub fn type_name(&self) -> &'static str {
        match self {
            Item::Node(node) => node.kind().as_str(),
            Item::Namespace(_) => "namespace",
            Item::String(_) => "string",
            Item::Number(_) => "number",
            Item::Boolean(_) => "boolean",
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Item::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&Namespace> {
        match self {
            Item::Namespace(ns) => Some(ns),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Item::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Item::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Item::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<Node> for Item {
    fn from(node: Node) -> Self {
        Item::Node(node)
    }
}

impl From<Namespace> for Item {
    fn from(ns: Namespace) -> Self {
        Item::Namespace(ns)
    }
}

/// Value bound to a query variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nodes(Vec<Node>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nodes(_) => "node-set",
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Nodes(vec![node])
    }
}

impl From<Vec<Node>> for Value {
    fn from(nodes: Vec<Node>) -> Self {
        Value::Nodes(nodes)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}
