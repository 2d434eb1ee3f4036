use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::context::DynamicContext;
use crate::engine::evaluator;
use crate::error::Error;
use crate::model::Navigator;
use crate::parser::ast;
use crate::parser::parse_xpath;
use crate::value::{Item, Value};

pub mod ir;

use ir::{ArithOp, CompareOp, Expr, Function, PathStart, Step};

/// A parsed and lowered expression. Immutable and cheap to clone, so one
/// instance can be evaluated from many threads at once.
#[derive(Clone)]
pub struct XPathExpr {
    source: Arc<str>,
    ir: Arc<Expr>,
}

impl XPathExpr {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ir(&self) -> &Expr {
        &self.ir
    }

    pub fn evaluate<N: Navigator>(
        &self,
        ctx: &DynamicContext<'_, N>,
    ) -> Result<Value<N::Node>, Error> {
        evaluator::evaluate(&self.ir, ctx)
    }

    /// All result items, node-sets flattened in document order.
    pub fn select<N: Navigator>(
        &self,
        ctx: &DynamicContext<'_, N>,
    ) -> Result<Vec<Item<N::Node>>, Error> {
        let items = self.evaluate(ctx)?.into_items();
        trace!(expr = %self.source, count = items.len(), "selected items");
        Ok(items)
    }

    /// The first item of [`XPathExpr::select`], stopping early where the
    /// final step allows it.
    pub fn select_first<N: Navigator>(
        &self,
        ctx: &DynamicContext<'_, N>,
    ) -> Result<Option<Item<N::Node>>, Error> {
        evaluator::evaluate_first(&self.ir, ctx)
    }
}

impl fmt::Debug for XPathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("XPathExpr").field(&self.source).finish()
    }
}

/// Parses and lowers an expression. Only syntax is checked here; prefixes,
/// variables and functions are resolved when the expression is evaluated.
pub fn compile_xpath(source: &str) -> Result<XPathExpr, Error> {
    let ast = parse_xpath(source)
        .inspect_err(|err| debug!(expr = source, error = %err, "compile failed"))?;
    let ir = lower(ast);
    debug!(expr = source, "compiled");
    Ok(XPathExpr { source: Arc::from(source), ir: Arc::new(ir) })
}

fn lower(expr: ast::Expr) -> Expr {
    match expr {
        ast::Expr::Literal(ast::Literal::String(s)) => Expr::String(s),
        ast::Expr::Literal(ast::Literal::Number(n)) => Expr::Number(n),
        ast::Expr::VarRef(name) => Expr::Variable(name),
        ast::Expr::FunctionCall { name, args } => {
            let function = Function::lookup(&name);
            Expr::Call { name, function, args: args.into_iter().map(lower).collect() }
        }
        ast::Expr::Binary { op, left, right } => {
            let (l, r) = (Box::new(lower(*left)), Box::new(lower(*right)));
            match op {
                ast::BinaryOp::Or => Expr::Or(l, r),
                ast::BinaryOp::And => Expr::And(l, r),
                ast::BinaryOp::Eq => Expr::Compare(CompareOp::Eq, l, r),
                ast::BinaryOp::Ne => Expr::Compare(CompareOp::Ne, l, r),
                ast::BinaryOp::Lt => Expr::Compare(CompareOp::Lt, l, r),
                ast::BinaryOp::Le => Expr::Compare(CompareOp::Le, l, r),
                ast::BinaryOp::Gt => Expr::Compare(CompareOp::Gt, l, r),
                ast::BinaryOp::Ge => Expr::Compare(CompareOp::Ge, l, r),
                ast::BinaryOp::Add => Expr::Arithmetic(ArithOp::Add, l, r),
                ast::BinaryOp::Sub => Expr::Arithmetic(ArithOp::Sub, l, r),
                ast::BinaryOp::Mul => Expr::Arithmetic(ArithOp::Mul, l, r),
                ast::BinaryOp::Div => Expr::Arithmetic(ArithOp::Div, l, r),
                ast::BinaryOp::Mod => Expr::Arithmetic(ArithOp::Mod, l, r),
                ast::BinaryOp::Union => Expr::Union(l, r),
            }
        }
        ast::Expr::Negate(inner) => Expr::Negate(Box::new(lower(*inner))),
        ast::Expr::Path(path) => {
            let start = match path.start {
                ast::PathStart::Context => PathStart::Context,
                ast::PathStart::Root => PathStart::Root,
                ast::PathStart::Expr(base) => PathStart::Expr(Box::new(lower(*base))),
            };
            let steps = path.steps.into_iter().map(lower_step).collect();
            Expr::Path { start, steps: fuse_descendant_steps(steps) }
        }
        ast::Expr::Filter { base, predicates } => Expr::Filter {
            base: Box::new(lower(*base)),
            predicates: predicates.into_iter().map(lower).collect(),
        },
    }
}

fn lower_step(step: ast::Step) -> Step {
    Step {
        axis: step.axis,
        test: step.test,
        predicates: step.predicates.into_iter().map(lower).collect(),
    }
}

/// `descendant-or-self::node()/child::t` selects the same nodes as
/// `descendant::t` as long as the child step has no predicates.
fn fuse_descendant_steps(steps: Vec<Step>) -> Vec<Step> {
    let mut out: Vec<Step> = Vec::with_capacity(steps.len());
    for step in steps {
        let fusable = step.axis == ast::Axis::Child
            && step.predicates.is_empty()
            && out.last().is_some_and(|prev| *prev == lower_step(ast::Step::descendant_or_self()));
        if fusable {
            out.pop();
            out.push(Step { axis: ast::Axis::Descendant, ..step });
        } else {
            out.push(step);
        }
    }
    out
}
