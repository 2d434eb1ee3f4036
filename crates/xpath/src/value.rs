/// Result of evaluating an XPath 1.0 expression.
///
/// Node-sets produced by the evaluator are in document order without
/// duplicates.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<N> {
    NodeSet(Vec<N>),
    Boolean(bool),
    Number(f64),
    String(String),
}

/// One member of a flattened result.
#[derive(Debug, Clone, PartialEq)]
pub enum Item<N> {
    Node(N),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl<N> Value<N> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::NodeSet(_) => "node-set",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }

    /// Node-sets become one item per node; scalars a single item.
    pub fn into_items(self) -> Vec<Item<N>> {
        match self {
            Value::NodeSet(nodes) => nodes.into_iter().map(Item::Node).collect(),
            Value::Boolean(b) => vec![Item::Boolean(b)],
            Value::Number(n) => vec![Item::Number(n)],
            Value::String(s) => vec![Item::String(s)],
        }
    }

    pub fn first_item(self) -> Option<Item<N>> {
        match self {
            Value::NodeSet(nodes) => nodes.into_iter().next().map(Item::Node),
            Value::Boolean(b) => Some(Item::Boolean(b)),
            Value::Number(n) => Some(Item::Number(n)),
            Value::String(s) => Some(Item::String(s)),
        }
    }
}

impl<N> From<bool> for Value<N> {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl<N> From<f64> for Value<N> {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl<N> From<String> for Value<N> {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl<N> From<&str> for Value<N> {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl<N> From<Vec<N>> for Value<N> {
    fn from(value: Vec<N>) -> Self {
        Value::NodeSet(value)
    }
}

/// XPath 1.0 `string()` of a number.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{n}")
    }
}

/// XPath 1.0 `number()` of a string: optional whitespace, optional minus,
/// digits with at most one decimal point. Anything else is NaN.
pub fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(is_xml_whitespace);
    let body = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let digits = body.chars().filter(char::is_ascii_digit).count();
    let dots = body.chars().filter(|c| *c == '.').count();
    if digits == 0 || dots > 1 || digits + dots != body.chars().count() {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

pub(crate) fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}
