//! XPath 1.0 core function library.

use crate::compiler::ir::{Expr, Function, QName};
use crate::engine::XML_NS;
use crate::engine::evaluator::{Evaluator, Focus};
use crate::error::{Error, ErrorCode};
use crate::model::{Navigator, NodeKind};
use crate::value::{Value, is_xml_whitespace};

pub(crate) fn call<N: Navigator>(
    ev: &Evaluator<'_, '_, N>,
    name: &QName,
    function: Option<Function>,
    args: &[Expr],
    focus: &Focus<N::Node>,
) -> Result<Value<N::Node>, Error> {
    let function = function.ok_or_else(|| {
        Error::from_code(ErrorCode::XPST0017, format!("unknown function {name}()"))
    })?;
    let (min, max) = function.arity();
    if args.len() < min || max.is_some_and(|max| args.len() > max) {
        return Err(Error::from_code(
            ErrorCode::XPST0017,
            format!("{name}() does not accept {} argument(s)", args.len()),
        ));
    }
    let nav = ev.nav();
    // string argument, or the string value of the context node when omitted
    let string_or_context = |index: usize| -> Result<String, Error> {
        match args.get(index) {
            Some(arg) => ev.eval_string(arg, focus),
            None => Ok(nav.string_value(&focus.node)),
        }
    };

    Ok(match function {
        #[allow(clippy::cast_precision_loss)]
        Function::Last => Value::Number(focus.size as f64),
        #[allow(clippy::cast_precision_loss)]
        Function::Position => Value::Number(focus.position as f64),
        #[allow(clippy::cast_precision_loss)]
        Function::Count => {
            Value::Number(ev.eval_node_set(&args[0], focus, "count()")?.len() as f64)
        }
        Function::Id => {
            let tokens: Vec<String> = match ev.eval(&args[0], focus)? {
                Value::NodeSet(nodes) => nodes
                    .iter()
                    .flat_map(|n| {
                        split_whitespace(&nav.string_value(n))
                            .map(str::to_string)
                            .collect::<Vec<_>>()
                    })
                    .collect(),
                other => split_whitespace(&ev.string(&other)).map(str::to_string).collect(),
            };
            let mut found: Vec<N::Node> =
                tokens.iter().filter_map(|token| nav.element_by_id(&focus.node, token)).collect();
            ev.sort_document_order(&mut found)?;
            Value::NodeSet(found)
        }
        Function::LocalName | Function::NamespaceUri | Function::Name => {
            let node = match args.first() {
                Some(arg) => {
                    ev.eval_node_set(arg, focus, "node name functions")?.into_iter().next()
                }
                None => Some(focus.node.clone()),
            };
            let qname = node.as_ref().and_then(|n| nav.name(n));
            Value::String(match (function, qname) {
                (_, None) => String::new(),
                (Function::LocalName, Some(q)) => q.local,
                (Function::NamespaceUri, Some(q)) => q.ns_uri.unwrap_or_default(),
                (_, Some(q)) => q.lexical(),
            })
        }
        Function::String => Value::String(string_or_context(0)?),
        Function::Concat => {
            let mut out = String::new();
            for arg in args {
                out.push_str(&ev.eval_string(arg, focus)?);
            }
            Value::String(out)
        }
        Function::StartsWith => {
            let (s, prefix) = (ev.eval_string(&args[0], focus)?, ev.eval_string(&args[1], focus)?);
            Value::Boolean(s.starts_with(&prefix))
        }
        Function::Contains => {
            let (s, needle) = (ev.eval_string(&args[0], focus)?, ev.eval_string(&args[1], focus)?);
            Value::Boolean(s.contains(&needle))
        }
        Function::SubstringBefore => {
            let (s, needle) = (ev.eval_string(&args[0], focus)?, ev.eval_string(&args[1], focus)?);
            let before = s.split_once(needle.as_str()).map(|(before, _)| before);
            Value::String(before.unwrap_or_default().to_string())
        }
        Function::SubstringAfter => {
            let (s, needle) = (ev.eval_string(&args[0], focus)?, ev.eval_string(&args[1], focus)?);
            let after = s.split_once(needle.as_str()).map(|(_, after)| after);
            Value::String(after.unwrap_or_default().to_string())
        }
        Function::Substring => {
            let s = ev.eval_string(&args[0], focus)?;
            let start = ev.eval_number(&args[1], focus)?;
            let length = args.get(2).map(|arg| ev.eval_number(arg, focus)).transpose()?;
            Value::String(substring(&s, start, length))
        }
        #[allow(clippy::cast_precision_loss)]
        Function::StringLength => Value::Number(string_or_context(0)?.chars().count() as f64),
        Function::NormalizeSpace => {
            Value::String(split_whitespace(&string_or_context(0)?).collect::<Vec<_>>().join(" "))
        }
        Function::Translate => {
            let s = ev.eval_string(&args[0], focus)?;
            let from: Vec<char> = ev.eval_string(&args[1], focus)?.chars().collect();
            let to: Vec<char> = ev.eval_string(&args[2], focus)?.chars().collect();
            Value::String(translate(&s, &from, &to))
        }
        Function::Boolean => Value::Boolean(ev.eval_boolean(&args[0], focus)?),
        Function::Not => Value::Boolean(!ev.eval_boolean(&args[0], focus)?),
        Function::True => Value::Boolean(true),
        Function::False => Value::Boolean(false),
        Function::Lang => {
            let wanted = ev.eval_string(&args[0], focus)?;
            let lang = lang_of(nav, &focus.node);
            Value::Boolean(lang.is_some_and(|lang| lang_matches(&lang, &wanted)))
        }
        Function::Number => Value::Number(match args.first() {
            Some(arg) => ev.eval_number(arg, focus)?,
            None => ev.number(&Value::String(nav.string_value(&focus.node))),
        }),
        Function::Sum => {
            let nodes = ev.eval_node_set(&args[0], focus, "sum()")?;
            let values = nodes.iter().map(|n| ev.number(&Value::String(nav.string_value(n))));
            Value::Number(values.sum())
        }
        Function::Floor => Value::Number(ev.eval_number(&args[0], focus)?.floor()),
        Function::Ceiling => Value::Number(ev.eval_number(&args[0], focus)?.ceil()),
        Function::Round => Value::Number(round(ev.eval_number(&args[0], focus)?)),
    })
}

fn split_whitespace(s: &str) -> impl Iterator<Item = &str> {
    s.split(is_xml_whitespace).filter(|part| !part.is_empty())
}

/// XPath rounding: halves round towards positive infinity.
pub(crate) fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else if (-0.5..0.0).contains(&n) {
        -0.0
    } else {
        (n + 0.5).floor()
    }
}

/// Characters at positions p with `round(start) <= p < round(start) + round(length)`,
/// positions counted from 1.
fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    let first = round(start);
    let end = length.map_or(f64::INFINITY, |len| first + round(len));
    s.chars()
        .enumerate()
        .filter(|(index, _)| {
            #[allow(clippy::cast_precision_loss)]
            let position = (index + 1) as f64;
            position >= first && position < end
        })
        .map(|(_, c)| c)
        .collect()
}

fn translate(s: &str, from: &[char], to: &[char]) -> String {
    s.chars()
        .filter_map(|c| match from.iter().position(|f| *f == c) {
            Some(index) => to.get(index).copied(),
            None => Some(c),
        })
        .collect()
}

/// Nearest `xml:lang` on the node or its ancestors.
fn lang_of<N: Navigator>(nav: &N, node: &N::Node) -> Option<String> {
    let mut current = match nav.kind(node) {
        NodeKind::Element => Some(node.clone()),
        _ => nav.parent(node),
    };
    while let Some(element) = current {
        if nav.kind(&element) == NodeKind::Element {
            let lang = nav.attributes(&element).find(|attr| {
                nav.name(attr)
                    .is_some_and(|name| name.local == "lang" && name.namespace_uri() == XML_NS)
            });
            if let Some(attr) = lang {
                return Some(nav.string_value(&attr));
            }
        }
        current = nav.parent(&element);
    }
    None
}

fn lang_matches(lang: &str, wanted: &str) -> bool {
    let lang = lang.to_ascii_lowercase();
    let wanted = wanted.to_ascii_lowercase();
    lang == wanted || lang.strip_prefix(&wanted).is_some_and(|rest| rest.starts_with('-'))
}
