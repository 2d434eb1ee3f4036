use std::error::Error as _;

use arbor_core::{Namespace, Node, attr, comment, doc, elem, elem_ns, text};
use arbor_query::{
    CompiledQuery, Filter, Item, QueryBuilder, QueryError, QueryFactory, Value, VariableName,
    XPathFactory, filter,
};
use arbor_xpath::{ErrorCode, UnresolvableVariable};
use rstest::{fixture, rstest};

fn ns(prefix: &str, uri: &str) -> Namespace {
    Namespace::new(prefix, uri).unwrap()
}

#[fixture]
fn catalog() -> Node {
    doc()
        .child(comment("generated"))
        .child(
            elem("catalog")
                .namespace(ns("a", "urn:a"))
                .namespace(ns("b", "urn:b"))
                .child(elem("book").attr(attr("id", "b1")).child(text("First")))
                .child(elem("book").attr(attr("id", "b2")).child(text("Second")))
                .child(
                    elem("shelf")
                        .namespace(ns("a", "urn:shadow"))
                        .child(elem("book").attr(attr("id", "b3")).child(text("Third")))
                        .child(elem_ns("note", ns("a", "urn:shadow"))),
                ),
        )
        .build()
        .unwrap()
}

fn ids(nodes: &[Node]) -> Vec<&str> {
    nodes.iter().map(|n| n.attribute("id", "").and_then(Node::value).unwrap_or_default()).collect()
}

fn filtered<T>(expression: &str, filter: impl Filter<T> + 'static) -> CompiledQuery<T> {
    QueryBuilder::new(expression).with_filter(filter).compile().unwrap()
}

fn element_query(expression: &str) -> CompiledQuery<Node> {
    filtered(expression, filter::elements())
}

#[rstest]
fn results_keep_engine_order_across_calls(catalog: Node) {
    let query = element_query("//book");
    let first = query.evaluate(&catalog).unwrap();
    assert_eq!(ids(&first), vec!["b1", "b2", "b3"]);
    for _ in 0..5 {
        assert_eq!(query.evaluate(&catalog).unwrap(), first);
    }
}

#[rstest]
fn namespace_results_are_plain_bindings(catalog: Node) {
    let query = arbor_query::compile("//namespace::*").unwrap();
    let results = query.evaluate(&catalog.root_element().unwrap()).unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|item| matches!(item, Item::Namespace(_))));
}

#[rstest]
fn namespace_axis_reports_declared_bindings(catalog: Node) {
    let query = filtered("namespace::*", filter::namespaces());
    let root = catalog.root_element().unwrap();
    assert_eq!(query.evaluate(&root).unwrap(), vec![ns("a", "urn:a"), ns("b", "urn:b")]);

    let shelf = root.children()[2].clone();
    assert_eq!(query.evaluate(&shelf).unwrap(), vec![ns("a", "urn:shadow"), ns("b", "urn:b")]);
    // the parent's view is unaffected by the shadowing below it
    assert_eq!(query.evaluate(&root).unwrap(), vec![ns("a", "urn:a"), ns("b", "urn:b")]);
}

#[rstest]
fn namespace_values_are_their_uris(catalog: Node) {
    let root = catalog.root_element().unwrap();
    let query = filtered("string(shelf/namespace::a)", filter::strings());
    assert_eq!(query.evaluate(&root).unwrap(), vec!["urn:shadow".to_string()]);
    let query = filtered("name(namespace::*[. = 'urn:b'])", filter::strings());
    assert_eq!(query.evaluate(&root).unwrap(), vec!["b".to_string()]);
}

#[rstest]
fn variables_are_resolved(catalog: Node) {
    let query = QueryBuilder::new("$x").with_variable("x", 42).compile().unwrap();
    assert_eq!(query.evaluate(&catalog).unwrap(), vec![Item::Number(42.0)]);

    let query = QueryBuilder::new("//book[@id = $wanted]")
        .with_filter(filter::elements())
        .with_variable("wanted", "b2")
        .compile()
        .unwrap();
    assert_eq!(ids(&query.evaluate(&catalog).unwrap()), vec!["b2"]);
}

#[rstest]
fn namespaced_variables_are_resolved(catalog: Node) {
    let query = QueryBuilder::new("$v:limit + $v:offset")
        .with_namespace(ns("v", "urn:vars"))
        .with_variable("v:limit", 3)
        .with_variable_ns("urn:vars", "offset", 0.5)
        .compile()
        .unwrap();
    assert_eq!(query.evaluate(&catalog).unwrap(), vec![Item::Number(3.5)]);
}

#[rstest]
fn node_set_variables(catalog: Node) {
    let books: Vec<Node> = element_query("//book").evaluate(&catalog).unwrap();
    let query = QueryBuilder::new("count($books) + count($books[1]/following-sibling::*)")
        .with_filter(filter::numbers())
        .with_variable("books", books)
        .compile()
        .unwrap();
    assert_eq!(query.evaluate(&catalog).unwrap(), vec![5.0]);
}

#[rstest]
fn unbound_variable_fails_with_signal_in_chain(catalog: Node) {
    let query = QueryBuilder::new("$y").with_variable("x", 42).compile().unwrap();
    let err = query.evaluate(&catalog).unwrap_err();
    assert!(matches!(err, QueryError::EvaluationFailed { .. }), "{err:?}");

    let engine = err.source().and_then(|s| s.downcast_ref::<arbor_xpath::Error>()).unwrap();
    assert_eq!(engine.code, ErrorCode::XPST0008);
    let signal = engine.source().and_then(|s| s.downcast_ref::<UnresolvableVariable>()).unwrap();
    assert_eq!(signal.local_name, "y");
}

#[rstest]
fn variable_with_unbound_prefix_fails(catalog: Node) {
    let query = QueryBuilder::new("$q:x").with_variable("x", 42).compile().unwrap();
    let err = query.evaluate(&catalog).unwrap_err();
    assert!(matches!(err, QueryError::EvaluationFailed { .. }), "{err:?}");
    let engine = err.source().and_then(|s| s.downcast_ref::<arbor_xpath::Error>()).unwrap();
    assert_eq!(engine.code, ErrorCode::XPST0008);
    assert!(query.evaluate_first(&catalog).is_err());
}

#[rstest]
fn namespace_nodes_precede_attributes_in_results(catalog: Node) {
    let book = catalog.root_element().unwrap().children()[0].clone();
    let kinds: Vec<_> = arbor_query::compile("@* | namespace::* | text()")
        .unwrap()
        .evaluate(&book)
        .unwrap()
        .iter()
        .map(Item::type_name)
        .collect();
    assert_eq!(kinds, vec!["namespace", "namespace", "attribute", "text"]);
}

#[rstest]
#[case("//[")]
#[case("book[")]
#[case("1 +")]
#[case("")]
fn invalid_expressions_are_reported(#[case] expression: &str) {
    let err = arbor_query::compile(expression).unwrap_err();
    let QueryError::InvalidExpression { expression: reported, source } = &err else {
        panic!("{err:?}")
    };
    assert_eq!(reported, expression);
    assert_eq!(source.code, ErrorCode::XPST0003);
    assert!(err.source().is_some());
}

#[rstest]
fn evaluation_errors_are_reported(catalog: Node) {
    let err = arbor_query::compile("count('x')").unwrap().evaluate(&catalog).unwrap_err();
    let QueryError::EvaluationFailed { expression, .. } = &err else { panic!("{err:?}") };
    assert_eq!(expression, "count('x')");
    let err = arbor_query::compile("no-such-function()").unwrap().evaluate(&catalog).unwrap_err();
    assert!(err.to_string().contains("no-such-function"), "{err}");
}

#[rstest]
fn evaluate_first_matches_evaluate(catalog: Node) {
    let query = element_query("//book");
    let first = query.evaluate_first(&catalog).unwrap();
    assert_eq!(first.as_ref(), query.evaluate(&catalog).unwrap().first());
    assert_eq!(ids(&[first.unwrap()]), vec!["b1"]);
    assert_eq!(element_query("//magazine").evaluate_first(&catalog).unwrap(), None);
}

#[rstest]
fn evaluate_first_skips_dropped_items(catalog: Node) {
    // the first raw result is a comment, which the element filter drops
    let query = element_query("/node()");
    let first = query.evaluate_first(&catalog).unwrap().unwrap();
    assert_eq!(first.local_name(), Some("catalog"));
    assert_eq!(Some(&first), query.evaluate(&catalog).unwrap().first());
}

#[rstest]
fn unprefixed_query_namespace_falls_back_to_empty_uri(catalog: Node) {
    // an unbound prefix resolves to the empty namespace instead of failing
    let query = element_query("//zz:book");
    assert_eq!(ids(&query.evaluate(&catalog).unwrap()), vec!["b1", "b2", "b3"]);
}

#[rstest]
fn prefixed_name_tests_use_query_namespaces(catalog: Node) {
    let query = QueryBuilder::new("//s:note")
        .with_filter(filter::elements())
        .with_namespace(ns("s", "urn:shadow"))
        .compile()
        .unwrap();
    assert_eq!(query.evaluate(&catalog).unwrap().len(), 1);
}

#[rstest]
fn accessors_report_bindings() {
    let query = QueryBuilder::new("$p:x")
        .with_namespace(ns("p", "urn:p"))
        .with_variable("p:x", true)
        .with_variable("y", "text")
        .compile()
        .unwrap();

    assert_eq!(query.expression(), "$p:x");
    assert_eq!(query.namespace("p").unwrap(), &ns("p", "urn:p"));
    assert_eq!(query.namespace("").unwrap(), &Namespace::no_namespace());
    assert!(matches!(query.namespace("q"), Err(QueryError::UnknownPrefix(p)) if p == "q"));
    assert_eq!(query.namespaces(), &[Namespace::no_namespace(), ns("p", "urn:p")]);
    assert_eq!(query.variable("p:x").unwrap(), &Value::Boolean(true));
    assert_eq!(query.variable_ns("urn:p", "x").unwrap(), &Value::Boolean(true));
    assert_eq!(query.variable("y").unwrap(), &Value::from("text"));
    assert!(matches!(query.variable("z"), Err(QueryError::UnknownVariable(_))));
    assert!(matches!(query.variable("q:x"), Err(QueryError::UnknownPrefix(_))));
    assert_eq!(query.variable_names().collect::<Vec<_>>(), vec![("", "y"), ("urn:p", "x")]);
}

#[rstest]
fn with_variable_returns_a_new_query(catalog: Node) {
    let query = QueryBuilder::new("$n * 2")
        .with_filter(filter::numbers())
        .with_variable("n", 1)
        .compile()
        .unwrap();
    let rebound = query.with_variable("n", 21).unwrap();
    assert_eq!(rebound.evaluate(&catalog).unwrap(), vec![42.0]);
    assert_eq!(query.evaluate(&catalog).unwrap(), vec![2.0]);
    assert!(matches!(query.with_variable("m", 1), Err(QueryError::UnknownVariable(_))));
}

#[rstest]
fn invalid_bindings_are_rejected() {
    let conflicting = QueryBuilder::new("1")
        .with_namespace(ns("p", "urn:a"))
        .with_namespace(ns("p", "urn:b"))
        .compile();
    assert!(matches!(conflicting, Err(QueryError::InvalidBinding(_))));

    let default = QueryBuilder::new("1").with_namespace(ns("", "urn:default")).compile();
    assert!(matches!(default, Err(QueryError::InvalidBinding(_))));

    let unbound = QueryBuilder::new("1").with_variable("p:x", 1).compile();
    assert!(matches!(unbound, Err(QueryError::InvalidBinding(_))));

    let duplicate =
        QueryBuilder::new("1").with_variable("x", 1).with_variable_ns("", "x", 2).compile();
    assert!(matches!(duplicate, Err(QueryError::InvalidBinding(_))));
}

#[rstest]
fn factory_compile_takes_all_parts(catalog: Node) {
    let query = XPathFactory
        .compile(
            "count(//book[@id != $skip])",
            filter::numbers(),
            [(VariableName::from("skip"), Value::from("b1"))],
            [ns("a", "urn:a")],
        )
        .unwrap();
    assert_eq!(query.evaluate(&catalog).unwrap(), vec![2.0]);
    assert_eq!(query.namespace("a").unwrap().uri(), "urn:a");
}

#[rstest]
fn query_errors_wrap_into_core_error(catalog: Node) {
    let err = arbor_query::compile("$missing").unwrap().evaluate(&catalog).unwrap_err();
    let detail = err.to_string();
    let wrapped = arbor_core::Error::from(err);
    assert_eq!(wrapped.message(), detail);
    assert_eq!(wrapped.own_message(), "query failed");
}
