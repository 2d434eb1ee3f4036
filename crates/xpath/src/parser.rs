use pest::Parser;
use pest::iterators::Pair;

use crate::error::{Error, ErrorCode};

pub mod ast;

use ast::{Axis, BinaryOp, Expr, Literal, NodeTest, PathExpr, PathStart, QName, Step};

#[derive(pest_derive::Parser)]
#[grammar = "xpath.pest"]
pub struct XPathParser;

/// Parses an XPath 1.0 expression into its AST.
pub fn parse_xpath(input: &str) -> Result<Expr, Error> {
    let mut pairs = XPathParser::parse(Rule::xpath, input).map_err(|err| {
        Error::from_code(ErrorCode::XPST0003, format!("syntax error in '{input}'")).with_source(err)
    })?;
    let xpath = pairs.next().ok_or_else(|| internal("empty parse result"))?;
    let expr = xpath.into_inner().next().ok_or_else(|| internal("missing expression"))?;
    build_expr(expr)
}

fn internal(message: &str) -> Error {
    Error::from_code(ErrorCode::XPST0003, format!("malformed parse tree: {message}"))
}

fn first_inner(pair: Pair<'_, Rule>) -> Result<Pair<'_, Rule>, Error> {
    let rule = pair.as_rule();
    pair.into_inner().next().ok_or_else(|| internal(&format!("{rule:?} has no content")))
}

fn build_expr(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    match pair.as_rule() {
        Rule::expr | Rule::path_expr | Rule::primary_expr | Rule::parenthesized_expr => {
            build_expr(first_inner(pair)?)
        }
        Rule::or_expr
        | Rule::and_expr
        | Rule::equality_expr
        | Rule::relational_expr
        | Rule::additive_expr
        | Rule::multiplicative_expr
        | Rule::union_expr => build_binary_chain(pair),
        Rule::unary_expr => {
            let mut negations = 0usize;
            let mut operand = None;
            for inner in pair.into_inner() {
                match inner.as_rule() {
                    Rule::OP_MINUS => negations += 1,
                    _ => operand = Some(build_expr(inner)?),
                }
            }
            let mut expr = operand.ok_or_else(|| internal("unary expression without operand"))?;
            for _ in 0..negations {
                expr = Expr::Negate(Box::new(expr));
            }
            Ok(expr)
        }
        Rule::filter_path => build_filter_path(pair),
        Rule::filter_expr => {
            let mut inner = pair.into_inner();
            let base = build_expr(inner.next().ok_or_else(|| internal("filter without primary"))?)?;
            let predicates = inner.map(build_predicate).collect::<Result<Vec<_>, _>>()?;
            if predicates.is_empty() {
                Ok(base)
            } else {
                Ok(Expr::Filter { base: Box::new(base), predicates })
            }
        }
        Rule::literal => {
            let content = first_inner(pair)?;
            Ok(Expr::Literal(Literal::String(content.as_str().to_string())))
        }
        Rule::number => {
            let value = pair.as_str().parse::<f64>().map_err(|err| {
                Error::from_code(ErrorCode::XPST0003, format!("invalid number '{}'", pair.as_str()))
                    .with_source(err)
            })?;
            Ok(Expr::Literal(Literal::Number(value)))
        }
        Rule::variable_ref => Ok(Expr::VarRef(QName::parse(first_inner(pair)?.as_str()))),
        Rule::function_call => {
            let mut inner = pair.into_inner();
            let name = inner.next().ok_or_else(|| internal("function without name"))?;
            let name = QName::parse(name.as_str());
            let args = inner.map(build_expr).collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::FunctionCall { name, args })
        }
        Rule::location_path => build_expr(first_inner(pair)?),
        Rule::absolute_location_path => {
            let mut steps = Vec::new();
            for inner in pair.into_inner() {
                match inner.as_rule() {
                    Rule::DOUBLE_SLASH => steps.push(Step::descendant_or_self()),
                    Rule::SLASH => {}
                    _ => steps.extend(build_relative_path(inner)?),
                }
            }
            Ok(Expr::Path(PathExpr { start: PathStart::Root, steps }))
        }
        Rule::relative_location_path => {
            let steps = build_relative_path(pair)?;
            Ok(Expr::Path(PathExpr { start: PathStart::Context, steps }))
        }
        rule => Err(internal(&format!("unexpected rule {rule:?}"))),
    }
}

fn build_binary_chain(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    let mut inner = pair.into_inner();
    let first = inner.next().ok_or_else(|| internal("operator chain without operand"))?;
    let mut left = build_expr(first)?;
    while let Some(operator) = inner.next() {
        let op = match operator.as_rule() {
            Rule::K_OR => BinaryOp::Or,
            Rule::K_AND => BinaryOp::And,
            Rule::OP_EQ => BinaryOp::Eq,
            Rule::OP_NE => BinaryOp::Ne,
            Rule::OP_LT => BinaryOp::Lt,
            Rule::OP_LE => BinaryOp::Le,
            Rule::OP_GT => BinaryOp::Gt,
            Rule::OP_GE => BinaryOp::Ge,
            Rule::OP_PLUS => BinaryOp::Add,
            Rule::OP_MINUS => BinaryOp::Sub,
            Rule::OP_STAR => BinaryOp::Mul,
            Rule::K_DIV => BinaryOp::Div,
            Rule::K_MOD => BinaryOp::Mod,
            Rule::OP_PIPE => BinaryOp::Union,
            rule => return Err(internal(&format!("unexpected operator {rule:?}"))),
        };
        let right = inner.next().ok_or_else(|| internal("operator without right operand"))?;
        let right = build_expr(right)?;
        left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
    }
    Ok(left)
}

fn build_filter_path(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    let mut inner = pair.into_inner();
    let base = build_expr(inner.next().ok_or_else(|| internal("path without filter"))?)?;
    let Some(separator) = inner.next() else {
        return Ok(base);
    };
    let mut steps = Vec::new();
    if separator.as_rule() == Rule::DOUBLE_SLASH {
        steps.push(Step::descendant_or_self());
    }
    let relative = inner.next().ok_or_else(|| internal("separator without path"))?;
    steps.extend(build_relative_path(relative)?);
    Ok(Expr::Path(PathExpr { start: PathStart::Expr(Box::new(base)), steps }))
}

fn build_relative_path(pair: Pair<'_, Rule>) -> Result<Vec<Step>, Error> {
    let mut steps = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::step => steps.push(build_step(inner)?),
            Rule::DOUBLE_SLASH => steps.push(Step::descendant_or_self()),
            Rule::SLASH => {}
            rule => return Err(internal(&format!("unexpected rule {rule:?} in path"))),
        }
    }
    Ok(steps)
}

fn build_step(pair: Pair<'_, Rule>) -> Result<Step, Error> {
    let mut axis = Axis::Child;
    let mut test = None;
    let mut predicates = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::abbreviated_step => {
                let token = first_inner(inner)?;
                let axis = match token.as_rule() {
                    Rule::PARENT_STEP => Axis::Parent,
                    _ => Axis::SelfAxis,
                };
                return Ok(Step { axis, test: NodeTest::Node, predicates: Vec::new() });
            }
            Rule::axis_specifier => {
                let spec = first_inner(inner)?;
                axis = match spec.as_rule() {
                    Rule::AT => Axis::Attribute,
                    _ => Axis::from_name(spec.as_str())
                        .ok_or_else(|| internal(&format!("unknown axis '{}'", spec.as_str())))?,
                };
            }
            Rule::node_test => test = Some(build_node_test(inner)?),
            Rule::predicate => predicates.push(build_predicate(inner)?),
            rule => return Err(internal(&format!("unexpected rule {rule:?} in step"))),
        }
    }
    let test = test.ok_or_else(|| internal("step without node test"))?;
    Ok(Step { axis, test, predicates })
}

fn build_node_test(pair: Pair<'_, Rule>) -> Result<NodeTest, Error> {
    let test = first_inner(pair)?;
    match test.as_rule() {
        Rule::kind_test => {
            let mut inner = test.into_inner();
            let head = inner.next().ok_or_else(|| internal("empty kind test"))?;
            match head.as_rule() {
                Rule::pi_test => {
                    let target = head
                        .into_inner()
                        .find(|p| p.as_rule() == Rule::literal)
                        .map(|literal| {
                            first_inner(literal).map(|content| content.as_str().trim().to_string())
                        })
                        .transpose()?;
                    Ok(NodeTest::ProcessingInstruction(target))
                }
                Rule::node_type => match head.as_str() {
                    "comment" => Ok(NodeTest::Comment),
                    "text" => Ok(NodeTest::Text),
                    _ => Ok(NodeTest::Node),
                },
                rule => Err(internal(&format!("unexpected rule {rule:?} in kind test"))),
            }
        }
        Rule::name_test => {
            let name = first_inner(test)?;
            match name.as_rule() {
                Rule::wildcard => Ok(NodeTest::Wildcard),
                Rule::ns_wildcard => {
                    let prefix = name.as_str().trim_end_matches('*').trim_end_matches(':');
                    Ok(NodeTest::NamespaceWildcard(prefix.to_string()))
                }
                _ => Ok(NodeTest::Name(QName::parse(name.as_str()))),
            }
        }
        rule => Err(internal(&format!("unexpected rule {rule:?} in node test"))),
    }
}

fn build_predicate(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    build_expr(first_inner(pair)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn path(expr: &Expr) -> &PathExpr {
        match expr {
            Expr::Path(path) => path,
            other => panic!("expected path, got {other:?}"),
        }
    }

    #[rstest]
    fn abbreviated_descendant_expands() {
        let expr = parse_xpath("//a").unwrap();
        let path = path(&expr);
        assert_eq!(path.start, PathStart::Root);
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.steps[0], Step::descendant_or_self());
        assert_eq!(path.steps[1].test, NodeTest::Name(QName::parse("a")));
    }

    #[rstest]
    #[case("child::a", Axis::Child)]
    #[case("@id", Axis::Attribute)]
    #[case("ancestor-or-self::*", Axis::AncestorOrSelf)]
    #[case("namespace::*", Axis::Namespace)]
    #[case("..", Axis::Parent)]
    #[case(".", Axis::SelfAxis)]
    #[case("preceding-sibling :: node()", Axis::PrecedingSibling)]
    fn axes(#[case] input: &str, #[case] axis: Axis) {
        let expr = parse_xpath(input).unwrap();
        assert_eq!(path(&expr).steps[0].axis, axis);
    }

    #[rstest]
    fn operator_precedence() {
        let expr = parse_xpath("1 + 2 * 3 = 7 or false()").unwrap();
        let Expr::Binary { op: BinaryOp::Or, left, .. } = expr else { panic!("expected or") };
        let Expr::Binary { op: BinaryOp::Eq, left, .. } = *left else { panic!("expected =") };
        let Expr::Binary { op: BinaryOp::Add, right, .. } = *left else { panic!("expected +") };
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[rstest]
    fn keywords_can_be_element_names() {
        let expr = parse_xpath("div div mod").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Div, .. }));
        assert!(parse_xpath("or or and").is_ok());
    }

    #[rstest]
    fn kind_tests_are_not_function_calls() {
        let expr = parse_xpath("text()").unwrap();
        assert_eq!(path(&expr).steps[0].test, NodeTest::Text);
        let expr = parse_xpath("processing-instruction('x')").unwrap();
        assert_eq!(path(&expr).steps[0].test, NodeTest::ProcessingInstruction(Some("x".into())));
        assert!(matches!(parse_xpath("count(x)").unwrap(), Expr::FunctionCall { .. }));
    }

    #[rstest]
    fn filter_expression_path() {
        let expr = parse_xpath("$nodes[1]//b").unwrap();
        let path = path(&expr);
        assert!(matches!(path.start, PathStart::Expr(_)));
        assert_eq!(path.steps.len(), 2);
    }

    #[rstest]
    fn names_and_literals() {
        assert!(parse_xpath("'it''s'").is_err());
        assert_eq!(parse_xpath("\"it's\"").unwrap(), Expr::Literal(Literal::String("it's".into())));
        assert_eq!(parse_xpath(".5").unwrap(), Expr::Literal(Literal::Number(0.5)));
        let negated = Expr::Negate(Box::new(Expr::Literal(Literal::Number(2.0))));
        assert_eq!(parse_xpath("-2").unwrap(), negated);
        let expr = parse_xpath("p:*").unwrap();
        assert_eq!(path(&expr).steps[0].test, NodeTest::NamespaceWildcard("p".into()));
    }

    #[rstest]
    #[case("//[")]
    #[case("")]
    #[case("a/")]
    #[case("1 +")]
    #[case("foo::bar")]
    #[case("a[1")]
    fn syntax_errors(#[case] input: &str) {
        let err = parse_xpath(input).unwrap_err();
        assert_eq!(err.code, ErrorCode::XPST0003);
        assert!(std::error::Error::source(&err).is_some());
    }
}
