//! Arena-backed tree used to exercise the engine through the `Navigator` contract.
#![allow(dead_code)]

use std::fmt;
use std::sync::Arc;

use arbor_xpath::{
    DynamicContextBuilder, Error, Item, Navigator, NodeKind, QName, Value, compile_xpath,
};

#[derive(Debug)]
struct Record {
    kind: NodeKind,
    name: Option<QName>,
    value: String,
    parent: Option<usize>,
    children: Vec<usize>,
    attributes: Vec<usize>,
    namespaces: Vec<usize>,
}

#[derive(Debug, Default)]
pub struct Dom {
    records: Vec<Record>,
}

#[derive(Clone)]
pub struct Node {
    dom: Arc<Dom>,
    index: usize,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.dom, &other.dom) && self.index == other.index
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record();
        match &record.name {
            Some(name) => write!(f, "{:?}({})", record.kind, name.lexical()),
            None => write!(f, "{:?}({:?})", record.kind, record.value),
        }
    }
}

impl Node {
    fn record(&self) -> &Record {
        &self.dom.records[self.index]
    }

    fn at(&self, index: usize) -> Node {
        Node { dom: Arc::clone(&self.dom), index }
    }

    /// Local name of an element or attribute, or the value of a text node.
    pub fn label(&self) -> String {
        let record = self.record();
        record.name.as_ref().map_or_else(|| record.value.clone(), |name| name.local.clone())
    }

    pub fn root_element(&self) -> Node {
        let doc = self.at(0);
        let index = doc
            .record()
            .children
            .iter()
            .copied()
            .find(|i| self.dom.records[*i].kind == NodeKind::Element);
        self.at(index.unwrap_or(0))
    }
}

pub struct DomNavigator;

impl Navigator for DomNavigator {
    type Node = Node;
    type Axis<'a> = std::vec::IntoIter<Node>;

    fn kind(&self, node: &Node) -> NodeKind {
        node.record().kind
    }

    fn name(&self, node: &Node) -> Option<QName> {
        node.record().name.clone()
    }

    fn string_value(&self, node: &Node) -> String {
        match node.record().kind {
            NodeKind::Document | NodeKind::Element => node
                .record()
                .children
                .iter()
                .map(|i| node.at(*i))
                .filter(|child| matches!(child.record().kind, NodeKind::Element | NodeKind::Text))
                .map(|child| self.string_value(&child))
                .collect(),
            _ => node.record().value.clone(),
        }
    }

    fn parent(&self, node: &Node) -> Option<Node> {
        node.record().parent.map(|p| node.at(p))
    }

    fn children(&self, node: &Node) -> Self::Axis<'_> {
        node.record().children.iter().map(|i| node.at(*i)).collect::<Vec<_>>().into_iter()
    }

    fn attributes(&self, node: &Node) -> Self::Axis<'_> {
        node.record().attributes.iter().map(|i| node.at(*i)).collect::<Vec<_>>().into_iter()
    }

    fn namespaces(&self, node: &Node) -> Self::Axis<'_> {
        node.record().namespaces.iter().map(|i| node.at(*i)).collect::<Vec<_>>().into_iter()
    }

    fn element_by_id(&self, context: &Node, id: &str) -> Option<Node> {
        (0..context.dom.records.len()).map(|i| context.at(i)).find(|candidate| {
            candidate.record().kind == NodeKind::Element
                && candidate.record().attributes.iter().any(|a| {
                    let attr = &context.dom.records[*a];
                    attr.name.as_ref().is_some_and(|n| n.local == "id") && attr.value == id
                })
        })
    }
}

pub enum Spec {
    Element {
        name: QName,
        attributes: Vec<(QName, String)>,
        namespaces: Vec<(String, String)>,
        children: Vec<Spec>,
    },
    Text(String),
    Comment(String),
    Pi(String, String),
}

impl Spec {
    pub fn attr(mut self, local: &str, value: &str) -> Self {
        if let Spec::Element { attributes, .. } = &mut self {
            attributes.push((QName::local(local), value.to_string()));
        }
        self
    }

    pub fn attr_ns(mut self, prefix: &str, local: &str, uri: &str, value: &str) -> Self {
        if let Spec::Element { attributes, .. } = &mut self {
            attributes.push((qualified(prefix, local, uri), value.to_string()));
        }
        self
    }

    pub fn ns(mut self, prefix: &str, uri: &str) -> Self {
        if let Spec::Element { namespaces, .. } = &mut self {
            namespaces.push((prefix.to_string(), uri.to_string()));
        }
        self
    }

    pub fn child(mut self, child: Spec) -> Self {
        if let Spec::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }
}

fn qualified(prefix: &str, local: &str, uri: &str) -> QName {
    QName { prefix: Some(prefix.into()), local: local.into(), ns_uri: Some(uri.into()) }
}

fn element(name: QName) -> Spec {
    Spec::Element { name, attributes: Vec::new(), namespaces: Vec::new(), children: Vec::new() }
}

pub fn elem(local: &str) -> Spec {
    element(QName::local(local))
}

pub fn elem_ns(prefix: &str, local: &str, uri: &str) -> Spec {
    element(qualified(prefix, local, uri))
}

pub fn text(value: &str) -> Spec {
    Spec::Text(value.to_string())
}

pub fn comment(value: &str) -> Spec {
    Spec::Comment(value.to_string())
}

pub fn pi(target: &str, data: &str) -> Spec {
    Spec::Pi(target.to_string(), data.to_string())
}

/// Builds a document around the given top-level nodes and returns the document node.
pub fn document(top: Vec<Spec>) -> Node {
    let mut dom = Dom::default();
    dom.records.push(Record {
        kind: NodeKind::Document,
        name: None,
        value: String::new(),
        parent: None,
        children: Vec::new(),
        attributes: Vec::new(),
        namespaces: Vec::new(),
    });
    for spec in top {
        let index = insert(&mut dom, spec, 0);
        dom.records[0].children.push(index);
    }
    Node { dom: Arc::new(dom), index: 0 }
}

fn push(dom: &mut Dom, kind: NodeKind, name: Option<QName>, value: String, parent: usize) -> usize {
    dom.records.push(Record {
        kind,
        name,
        value,
        parent: Some(parent),
        children: Vec::new(),
        attributes: Vec::new(),
        namespaces: Vec::new(),
    });
    dom.records.len() - 1
}

fn insert(dom: &mut Dom, spec: Spec, parent: usize) -> usize {
    match spec {
        Spec::Text(value) => push(dom, NodeKind::Text, None, value, parent),
        Spec::Comment(value) => push(dom, NodeKind::Comment, None, value, parent),
        Spec::Pi(target, data) => {
            let name = Some(QName::local(target));
            push(dom, NodeKind::ProcessingInstruction, name, data, parent)
        }
        Spec::Element { name, attributes, namespaces, children } => {
            let index = push(dom, NodeKind::Element, Some(name), String::new(), parent);
            for (prefix, uri) in namespaces {
                let ns = push(dom, NodeKind::Namespace, Some(QName::local(prefix)), uri, index);
                dom.records[index].namespaces.push(ns);
            }
            for (attr, value) in attributes {
                let a = push(dom, NodeKind::Attribute, Some(attr), value, index);
                dom.records[index].attributes.push(a);
            }
            for child in children {
                let c = insert(dom, child, index);
                dom.records[index].children.push(c);
            }
            index
        }
    }
}

pub fn eval(context: &Node, expr: &str) -> Result<Value<Node>, Error> {
    let compiled = compile_xpath(expr)?;
    let ctx = DynamicContextBuilder::new(&DomNavigator, context.clone()).build();
    compiled.evaluate(&ctx)
}

pub fn select(context: &Node, expr: &str) -> Result<Vec<Item<Node>>, Error> {
    let compiled = compile_xpath(expr)?;
    let ctx = DynamicContextBuilder::new(&DomNavigator, context.clone()).build();
    compiled.select(&ctx)
}

/// Labels of the nodes a path selects, in result order.
pub fn labels(context: &Node, expr: &str) -> Vec<String> {
    match eval(context, expr) {
        Ok(Value::NodeSet(nodes)) => nodes.iter().map(Node::label).collect(),
        other => panic!("{expr}: expected node-set, got {other:?}"),
    }
}

pub fn string(context: &Node, expr: &str) -> String {
    match eval(context, expr) {
        Ok(Value::String(s)) => s,
        other => panic!("{expr}: expected string, got {other:?}"),
    }
}

pub fn number(context: &Node, expr: &str) -> f64 {
    match eval(context, expr) {
        Ok(Value::Number(n)) => n,
        other => panic!("{expr}: expected number, got {other:?}"),
    }
}

pub fn boolean(context: &Node, expr: &str) -> bool {
    match eval(context, expr) {
        Ok(Value::Boolean(b)) => b,
        other => panic!("{expr}: expected boolean, got {other:?}"),
    }
}
