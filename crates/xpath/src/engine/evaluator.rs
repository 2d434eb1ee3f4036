use core::cmp::Ordering;

use crate::compiler::ir::{ArithOp, CompareOp, Expr, NodeTest, PathStart, QName, Step};
use crate::context::DynamicContext;
use crate::engine::{XML_NS, axes, functions};
use crate::error::{Error, ErrorCode};
use crate::model::{Navigator, NodeKind};
use crate::parser::ast::Axis;
use crate::value::{Item, Value, format_number, parse_number};

pub(crate) fn evaluate<N: Navigator>(
    expr: &Expr,
    ctx: &DynamicContext<'_, N>,
) -> Result<Value<N::Node>, Error> {
    let evaluator = Evaluator { ctx };
    evaluator.eval(expr, &evaluator.initial_focus())
}

/// Evaluates as little as possible to produce the first result item.
///
/// A path whose final step has no predicates and walks a forward axis from a
/// single node yields its first match in document order, so the walk stops
/// there.
pub(crate) fn evaluate_first<N: Navigator>(
    expr: &Expr,
    ctx: &DynamicContext<'_, N>,
) -> Result<Option<Item<N::Node>>, Error> {
    let evaluator = Evaluator { ctx };
    let focus = evaluator.initial_focus();
    if let Expr::Path { start, steps } = expr
        && let Some((last, init)) = steps.split_last()
        && last.predicates.is_empty()
        && !last.axis.is_reverse()
    {
        let nodes = evaluator.path(start, init, &focus)?;
        if let [single] = nodes.as_slice() {
            let matcher = evaluator.matcher(last)?;
            let nav = ctx.navigator;
            let first = axes::traverse(nav, last.axis, single).find(|n| matcher.matches(nav, n));
            return Ok(first.map(Item::Node));
        }
        let nodes = evaluator.apply_steps(nodes, core::slice::from_ref(last))?;
        return Ok(nodes.into_iter().next().map(Item::Node));
    }
    Ok(evaluator.eval(expr, &focus)?.first_item())
}

/// Context item, position and size for one evaluation step.
#[derive(Debug, Clone)]
pub(crate) struct Focus<T> {
    pub(crate) node: T,
    pub(crate) position: usize,
    pub(crate) size: usize,
}

pub(crate) struct Evaluator<'c, 'a, N: Navigator> {
    pub(crate) ctx: &'c DynamicContext<'a, N>,
}

impl<'a, N: Navigator> Evaluator<'_, 'a, N> {
    pub(crate) fn nav(&self) -> &'a N {
        self.ctx.navigator
    }

    fn initial_focus(&self) -> Focus<N::Node> {
        Focus { node: self.ctx.node.clone(), position: 1, size: 1 }
    }

    pub(crate) fn eval(
        &self,
        expr: &Expr,
        focus: &Focus<N::Node>,
    ) -> Result<Value<N::Node>, Error> {
        match expr {
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Variable(name) => self.variable(name),
            Expr::Call { name, function, args } => {
                functions::call(self, name, *function, args, focus)
            }
            Expr::Or(left, right) => Ok(Value::Boolean(
                self.eval_boolean(left, focus)? || self.eval_boolean(right, focus)?,
            )),
            Expr::And(left, right) => Ok(Value::Boolean(
                self.eval_boolean(left, focus)? && self.eval_boolean(right, focus)?,
            )),
            Expr::Compare(op, left, right) => {
                let l = self.eval(left, focus)?;
                let r = self.eval(right, focus)?;
                Ok(Value::Boolean(self.compare(*op, &l, &r)))
            }
            Expr::Arithmetic(op, left, right) => {
                let l = self.eval_number(left, focus)?;
                let r = self.eval_number(right, focus)?;
                Ok(Value::Number(match op {
                    ArithOp::Add => l + r,
                    ArithOp::Sub => l - r,
                    ArithOp::Mul => l * r,
                    ArithOp::Div => l / r,
                    // truncating remainder: the result takes the sign of the dividend
                    ArithOp::Mod => l % r,
                }))
            }
            Expr::Negate(inner) => Ok(Value::Number(-self.eval_number(inner, focus)?)),
            Expr::Union(left, right) => {
                let mut nodes = self.eval_node_set(left, focus, "|")?;
                nodes.extend(self.eval_node_set(right, focus, "|")?);
                self.sort_document_order(&mut nodes)?;
                Ok(Value::NodeSet(nodes))
            }
            Expr::Path { start, steps } => Ok(Value::NodeSet(self.path(start, steps, focus)?)),
            Expr::Filter { base, predicates } => {
                let mut nodes = match self.eval(base, focus)? {
                    Value::NodeSet(nodes) => nodes,
                    other => {
                        let message = format!(
                            "predicates can only filter node-sets, not a {}",
                            other.type_name()
                        );
                        return Err(Error::from_code(ErrorCode::XPTY0004, message));
                    }
                };
                for predicate in predicates {
                    nodes = self.filter(nodes, predicate)?;
                }
                Ok(Value::NodeSet(nodes))
            }
        }
    }

    fn variable(&self, name: &QName) -> Result<Value<N::Node>, Error> {
        let namespace_uri =
            name.prefix.as_deref().map(|prefix| self.resolve_prefix(prefix)).transpose()?;
        let value = self
            .ctx
            .variables
            .variable_value(namespace_uri.as_deref(), name.prefix.as_deref(), &name.local)
            .map_err(|signal| {
                Error::from_code(ErrorCode::XPST0008, format!("variable ${name} is not bound"))
                    .with_source(signal)
            })?;
        match value {
            Value::NodeSet(mut nodes) => {
                self.sort_document_order(&mut nodes)?;
                Ok(Value::NodeSet(nodes))
            }
            scalar => Ok(scalar),
        }
    }

    /// Prefix to URI through the namespace context; `xml` is always bound.
    pub(crate) fn resolve_prefix(&self, prefix: &str) -> Result<String, Error> {
        match self.ctx.namespaces.translate_prefix(prefix) {
            Some(uri) => Ok(uri),
            None if prefix == "xml" => Ok(XML_NS.to_string()),
            None => Err(Error::from_code(
                ErrorCode::XPST0081,
                format!("namespace prefix '{prefix}' is not bound"),
            )),
        }
    }

    fn path(
        &self,
        start: &PathStart,
        steps: &[Step],
        focus: &Focus<N::Node>,
    ) -> Result<Vec<N::Node>, Error> {
        let initial = match start {
            PathStart::Context => vec![focus.node.clone()],
            PathStart::Root => vec![self.nav().root(&focus.node)],
            PathStart::Expr(base) => self.eval_node_set(base, focus, "/")?,
        };
        self.apply_steps(initial, steps)
    }

    fn apply_steps(&self, mut nodes: Vec<N::Node>, steps: &[Step]) -> Result<Vec<N::Node>, Error> {
        let nav = self.nav();
        for step in steps {
            let matcher = self.matcher(step)?;
            let mut out = Vec::new();
            for node in &nodes {
                let mut selected: Vec<N::Node> = axes::traverse(nav, step.axis, node)
                    .filter(|n| matcher.matches(nav, n))
                    .collect();
                for predicate in &step.predicates {
                    selected = self.filter(selected, predicate)?;
                }
                if step.axis.is_reverse() {
                    selected.reverse();
                }
                out.extend(selected);
            }
            if nodes.len() > 1 {
                self.sort_document_order(&mut out)?;
            }
            nodes = out;
        }
        Ok(nodes)
    }

    /// Keeps the nodes for which the predicate holds; a numeric predicate
    /// compares against the proximity position.
    fn filter(&self, nodes: Vec<N::Node>, predicate: &Expr) -> Result<Vec<N::Node>, Error> {
        let size = nodes.len();
        let mut kept = Vec::with_capacity(size);
        for (index, node) in nodes.into_iter().enumerate() {
            let focus = Focus { node, position: index + 1, size };
            let keep = match self.eval(predicate, &focus)? {
                #[allow(clippy::cast_precision_loss)]
                Value::Number(n) => n == (index + 1) as f64,
                other => self.boolean(&other),
            };
            if keep {
                kept.push(focus.node);
            }
        }
        Ok(kept)
    }

    fn matcher(&self, step: &Step) -> Result<Matcher, Error> {
        let principal = step.axis.principal_kind();
        let test = match &step.test {
            NodeTest::Node => Test::AnyNode,
            NodeTest::Text => Test::Kind(NodeKind::Text),
            NodeTest::Comment => Test::Kind(NodeKind::Comment),
            NodeTest::ProcessingInstruction(target) => Test::ProcessingInstruction(target.clone()),
            NodeTest::Wildcard => Test::Principal,
            NodeTest::NamespaceWildcard(prefix) => Test::Namespace(self.resolve_prefix(prefix)?),
            NodeTest::Name(name) => {
                // namespace nodes have no namespace URI, whatever the prefix
                let uri = match (&name.prefix, step.axis) {
                    (Some(prefix), axis) if axis != Axis::Namespace => self.resolve_prefix(prefix)?,
                    _ => String::new(),
                };
                Test::Name { uri, local: name.local.clone() }
            }
        };
        Ok(Matcher { principal, test })
    }

    pub(crate) fn sort_document_order(&self, nodes: &mut Vec<N::Node>) -> Result<(), Error> {
        if nodes.len() < 2 {
            return Ok(());
        }
        let nav = self.nav();
        let mut failure = None;
        nodes.sort_by(|a, b| match nav.compare_document_order(a, b) {
            Ok(ordering) => ordering,
            Err(err) => {
                failure.get_or_insert(err);
                Ordering::Equal
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }
        nodes.dedup();
        Ok(())
    }

    pub(crate) fn eval_boolean(&self, expr: &Expr, focus: &Focus<N::Node>) -> Result<bool, Error> {
        Ok(self.boolean(&self.eval(expr, focus)?))
    }

    pub(crate) fn eval_number(&self, expr: &Expr, focus: &Focus<N::Node>) -> Result<f64, Error> {
        Ok(self.number(&self.eval(expr, focus)?))
    }

    pub(crate) fn eval_string(&self, expr: &Expr, focus: &Focus<N::Node>) -> Result<String, Error> {
        Ok(self.string(&self.eval(expr, focus)?))
    }

    pub(crate) fn eval_node_set(
        &self,
        expr: &Expr,
        focus: &Focus<N::Node>,
        what: &str,
    ) -> Result<Vec<N::Node>, Error> {
        match self.eval(expr, focus)? {
            Value::NodeSet(nodes) => Ok(nodes),
            other => Err(Error::from_code(
                ErrorCode::XPTY0004,
                format!("{what} requires a node-set, got a {}", other.type_name()),
            )),
        }
    }

    pub(crate) fn boolean(&self, value: &Value<N::Node>) -> bool {
        match value {
            Value::NodeSet(nodes) => !nodes.is_empty(),
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
        }
    }

    pub(crate) fn number(&self, value: &Value<N::Node>) -> f64 {
        match value {
            Value::Number(n) => *n,
            Value::Boolean(b) => f64::from(u8::from(*b)),
            _ => parse_number(&self.string(value)),
        }
    }

    pub(crate) fn string(&self, value: &Value<N::Node>) -> String {
        match value {
            Value::NodeSet(nodes) => {
                nodes.first().map(|n| self.nav().string_value(n)).unwrap_or_default()
            }
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
        }
    }

    fn compare(&self, op: CompareOp, left: &Value<N::Node>, right: &Value<N::Node>) -> bool {
        let nav = self.nav();
        match (left, right) {
            (Value::NodeSet(l), Value::NodeSet(r)) => {
                let rights: Vec<String> = r.iter().map(|n| nav.string_value(n)).collect();
                l.iter().any(|n| {
                    let s = nav.string_value(n);
                    rights
                        .iter()
                        .any(|other| compare_atomic(op, &Atomic::Str(&s), &Atomic::Str(other)))
                })
            }
            (Value::NodeSet(nodes), Value::Boolean(b)) => {
                compare_atomic(op, &Atomic::Bool(!nodes.is_empty()), &Atomic::Bool(*b))
            }
            (Value::Boolean(b), Value::NodeSet(nodes)) => {
                compare_atomic(op, &Atomic::Bool(*b), &Atomic::Bool(!nodes.is_empty()))
            }
            (Value::NodeSet(nodes), other) => {
                let other = Atomic::of(other);
                nodes.iter().any(|n| compare_atomic(op, &Atomic::Str(&nav.string_value(n)), &other))
            }
            (other, Value::NodeSet(nodes)) => {
                let other = Atomic::of(other);
                nodes.iter().any(|n| compare_atomic(op, &other, &Atomic::Str(&nav.string_value(n))))
            }
            (l, r) => compare_atomic(op, &Atomic::of(l), &Atomic::of(r)),
        }
    }
}

/// Scalar operand of a comparison.
enum Atomic<'s> {
    Str(&'s str),
    Num(f64),
    Bool(bool),
}

impl<'s> Atomic<'s> {
    fn of<N>(value: &'s Value<N>) -> Self {
        match value {
            Value::String(s) => Atomic::Str(s),
            Value::Number(n) => Atomic::Num(*n),
            Value::Boolean(b) => Atomic::Bool(*b),
            Value::NodeSet(nodes) => Atomic::Bool(!nodes.is_empty()),
        }
    }

    fn number(&self) -> f64 {
        match self {
            Atomic::Str(s) => parse_number(s),
            Atomic::Num(n) => *n,
            Atomic::Bool(b) => f64::from(u8::from(*b)),
        }
    }

    fn boolean(&self) -> bool {
        match self {
            Atomic::Str(s) => !s.is_empty(),
            Atomic::Num(n) => *n != 0.0 && !n.is_nan(),
            Atomic::Bool(b) => *b,
        }
    }
}

#[allow(clippy::float_cmp)]
fn compare_atomic(op: CompareOp, left: &Atomic<'_>, right: &Atomic<'_>) -> bool {
    match op {
        CompareOp::Eq | CompareOp::Ne => {
            let equal = match (left, right) {
                (Atomic::Bool(_), _) | (_, Atomic::Bool(_)) => left.boolean() == right.boolean(),
                (Atomic::Num(_), _) | (_, Atomic::Num(_)) => left.number() == right.number(),
                (Atomic::Str(l), Atomic::Str(r)) => l == r,
            };
            if op == CompareOp::Eq { equal } else { !equal }
        }
        CompareOp::Lt => left.number() < right.number(),
        CompareOp::Le => left.number() <= right.number(),
        CompareOp::Gt => left.number() > right.number(),
        CompareOp::Ge => left.number() >= right.number(),
    }
}

enum Test {
    AnyNode,
    Principal,
    Kind(NodeKind),
    ProcessingInstruction(Option<String>),
    Namespace(String),
    Name { uri: String, local: String },
}

struct Matcher {
    principal: NodeKind,
    test: Test,
}

impl Matcher {
    fn matches<N: Navigator>(&self, nav: &N, node: &N::Node) -> bool {
        let kind = nav.kind(node);
        match &self.test {
            Test::AnyNode => true,
            Test::Kind(expected) => kind == *expected,
            Test::ProcessingInstruction(target) => {
                kind == NodeKind::ProcessingInstruction
                    && target
                        .as_ref()
                        .is_none_or(|t| nav.name(node).is_some_and(|name| name.local == *t))
            }
            Test::Principal => kind == self.principal,
            Test::Namespace(uri) => {
                kind == self.principal
                    && nav.name(node).is_some_and(|name| name.namespace_uri() == uri)
            }
            Test::Name { uri, local } => {
                kind == self.principal
                    && nav
                        .name(node)
                        .is_some_and(|name| name.local == *local && name.namespace_uri() == uri)
            }
        }
    }
}
