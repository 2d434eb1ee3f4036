mod common;

use arbor_xpath::{ErrorCode, Value};
use common::*;
use rstest::{fixture, rstest};

#[fixture]
fn library() -> Node {
    document(vec![
        comment("prolog"),
        elem("library")
            .ns("bk", "urn:books")
            .child(
                elem("section")
                    .attr("name", "alpha")
                    .child(elem("item").attr("id", "i1").attr("type", "a").child(text("Alpha One")))
                    .child(elem("item").attr("id", "i2").attr("type", "b").child(text("Alpha Two")))
                    .child(comment("note"))
                    .child(
                        elem("item").attr("id", "i3").attr("type", "a").child(text("Alpha Three")),
                    ),
            )
            .child(
                elem("section")
                    .attr("name", "beta")
                    .child(elem("item").attr("id", "i4").attr("type", "b").child(text("Beta One")))
                    .child(elem_ns("bk", "item", "urn:books").attr("id", "b1").child(text("Book")))
                    .child(pi("render", "fast")),
            ),
    ])
}

fn ids(context: &Node, expr: &str) -> Vec<String> {
    match eval(context, expr) {
        Ok(Value::NodeSet(nodes)) => nodes
            .iter()
            .map(|n| match eval(n, "string(@id)") {
                Ok(Value::String(s)) => s,
                other => panic!("{other:?}"),
            })
            .collect(),
        other => panic!("{expr}: {other:?}"),
    }
}

#[rstest]
fn absolute_and_relative_paths(library: Node) {
    assert_eq!(labels(&library, "/library/section"), vec!["section", "section"]);
    let root = library.root_element();
    assert_eq!(labels(&root, "section/item"), vec!["item"; 4]);
    assert_eq!(labels(&root, "/"), vec![""]);
}

#[rstest]
fn descendant_shortcut_keeps_document_order(library: Node) {
    assert_eq!(ids(&library, "//item"), vec!["i1", "i2", "i3", "i4"]);
    assert_eq!(ids(&library, "//*[@id]"), vec!["i1", "i2", "i3", "i4", "b1"]);
}

#[rstest]
fn positional_predicates_are_per_step(library: Node) {
    assert_eq!(ids(&library, "//item[1]"), vec!["i1", "i4"]);
    assert_eq!(ids(&library, "(//item)[1]"), vec!["i1"]);
    assert_eq!(ids(&library, "//section/item[last()]"), vec!["i3", "i4"]);
    assert_eq!(ids(&library, "//item[@type='a'][2]"), vec!["i3"]);
    assert_eq!(ids(&library, "//item[position() > 1 and @type = 'a']"), vec!["i3"]);
}

#[rstest]
fn reverse_axes_count_positions_backwards(library: Node) {
    let root = &library.root_element();
    assert_eq!(ids(root, "section[1]/item[3]/preceding-sibling::item[1]"), vec!["i2"]);
    assert_eq!(ids(root, "section[2]/item[1]/preceding::item[1]"), vec!["i3"]);
    assert_eq!(ids(root, "section[2]/item[1]/preceding::item"), vec!["i1", "i2", "i3"]);
    assert_eq!(labels(root, "section[1]/item[1]/ancestor::*"), vec!["library", "section"]);
    assert_eq!(labels(root, "section[1]/item[1]/ancestor-or-self::*[1]"), vec!["item"]);
}

#[rstest]
fn following_axes(library: Node) {
    let root = library.root_element();
    assert_eq!(ids(&root, "section[1]/item[2]/following-sibling::item"), vec!["i3"]);
    assert_eq!(ids(&root, "section[1]/item[3]/following::*[@id]"), vec!["i4", "b1"]);
    assert_eq!(ids(&root, "section[1]/@name/following::item[1]"), vec!["i1"]);
}

#[rstest]
fn kind_tests(library: Node) {
    let root = library.root_element();
    assert_eq!(labels(&library, "/comment()"), vec!["prolog"]);
    assert_eq!(labels(&root, "section[1]/comment()"), vec!["note"]);
    assert_eq!(labels(&root, "//processing-instruction('render')"), vec!["render"]);
    assert!(labels(&root, "//processing-instruction('other')").is_empty());
    assert_eq!(labels(&root, "section[2]/item/text()"), vec!["Beta One"]);
    assert_eq!(labels(&root, "section[2]/node()").len(), 3);
}

#[rstest]
fn attributes_and_abbreviations(library: Node) {
    let root = library.root_element();
    assert_eq!(string(&root, "string(section[2]/@name)"), "beta");
    assert_eq!(labels(&root, "section[1]/item[1]/@*"), vec!["id", "type"]);
    assert_eq!(labels(&root, "section[1]/item[1]/.."), vec!["section"]);
    assert_eq!(labels(&root, "./section[1]/./item[1]/self::item"), vec!["item"]);
    assert_eq!(ids(&root, "section//@id/.."), vec!["i1", "i2", "i3", "i4", "b1"]);
}

#[rstest]
fn union_is_sorted_and_deduplicated(library: Node) {
    assert_eq!(ids(&library, "//item[@id='i4'] | //item[@id='i1'] | //item[1]"), vec!["i1", "i4"]);
}

#[rstest]
fn unprefixed_names_only_match_no_namespace(library: Node) {
    assert_eq!(ids(&library, "//section[2]/*"), vec!["i4", "b1"]);
    assert_eq!(ids(&library, "//section[2]/item"), vec!["i4"]);
}

#[rstest]
fn unbound_prefix_fails_at_evaluation(library: Node) {
    let err = eval(&library, "//bk:item").unwrap_err();
    assert_eq!(err.code, ErrorCode::XPST0081);
}

#[rstest]
fn union_of_scalars_is_a_type_error(library: Node) {
    let err = eval(&library, "1 | //item").unwrap_err();
    assert_eq!(err.code, ErrorCode::XPTY0004);
    let err = eval(&library, "'a'[1]").unwrap_err();
    assert_eq!(err.code, ErrorCode::XPTY0004);
}

#[rstest]
fn comparisons_follow_node_set_rules(library: Node) {
    assert!(boolean(&library, "//item/@type = 'b'"));
    assert!(boolean(&library, "//item/@type != 'b'"));
    assert!(!boolean(&library, "//item/@type = 'c'"));
    assert!(boolean(&library, "//section[1]/item = //section[1]/item[2]"));
    assert!(boolean(&library, "count(//item) > 3"));
    assert!(boolean(&library, "//nothing = false()"));
    assert!(boolean(&library, "'2' < 10"));
    assert!(!boolean(&library, "'abc' = 1"));
    assert!(boolean(&library, "1 = true()"));
}

#[rstest]
#[case("1 + 2 * 3", 7.0)]
#[case("7 mod 3", 1.0)]
#[case("-7 mod 3", -1.0)]
#[case("7 div 2", 3.5)]
#[case("--3", 3.0)]
#[case("count(//item) - 1", 3.0)]
fn arithmetic(library: Node, #[case] expr: &str, #[case] expected: f64) {
    assert_eq!(number(&library, expr), expected);
}

#[rstest]
fn division_by_zero_is_infinite(library: Node) {
    assert_eq!(number(&library, "1 div 0"), f64::INFINITY);
    assert!(number(&library, "0 div 0").is_nan());
    assert_eq!(string(&library, "string(-1 div 0)"), "-Infinity");
}
