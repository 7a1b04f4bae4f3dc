mod common;

use common::fixtures::{CATALOG, LIBRARY};
use common::{TestResult, eval, number};
use oxpath::{XPathEngine, XPathValue, XmlDocument};

fn value(query: &str) -> XPathValue {
    let doc = XmlDocument::parse(LIBRARY).unwrap_or_else(|e| panic!("bad fixture: {}", e));
    let engine = XPathEngine::new();
    eval(&engine, &doc, query).unwrap_or_else(|e| panic!("{} failed: {}", query, e))
}

fn string(query: &str) -> String {
    match value(query) {
        XPathValue::String(s) => s,
        other => panic!("{}: expected a string, got {:?}", query, other),
    }
}

fn boolean(query: &str) -> bool {
    match value(query) {
        XPathValue::Boolean(b) => b,
        other => panic!("{}: expected a boolean, got {:?}", query, other),
    }
}

#[test]
fn test_string_functions() {
    assert_eq!(number(&value("string-length('')")), 0.0);
    assert_eq!(number(&value("string-length('Hello世界')")), 7.0);
    assert_eq!(string("substring('Hello World', 7)"), "World");
    assert_eq!(string("substring('Hello', 20, 5)"), "");
    assert_eq!(string("substring('12345', 1.5, 2.6)"), "234");
    assert_eq!(string("translate('abc', 'abc', '12')"), "12");
    assert_eq!(string("normalize-space('  Hello \t\n World  ')"), "Hello World");
    assert_eq!(string("concat('a', 1, true())"), "a1true");
    assert_eq!(string("substring-before('2024-06-01', '-')"), "2024");
    assert_eq!(string("substring-after('2024-06-01', '-')"), "06-01");
    assert!(boolean("starts-with(//book[1]/title, 'Du')"));
    assert!(boolean("contains(//shelf, 'Dick')"));
    assert_eq!(string("string(//book[2]/author)"), "Austen");
}

#[test]
fn test_number_functions() {
    assert_eq!(number(&value("sum(//nothing)")), 0.0);
    assert_eq!(number(&value("count(//nothing)")), 0.0);
    assert_eq!(number(&value("count(//book)")), 3.0);
    assert_eq!(number(&value("floor(-1.5)")), -2.0);
    assert_eq!(number(&value("ceiling(1.2)")), 2.0);
    assert_eq!(number(&value("round(2.5)")), 3.0);
    assert_eq!(number(&value("round(-3.5)")), -3.0);
    assert!(number(&value("number('abc')")).is_nan());
    assert!(number(&value("number(//title)")).is_nan());
    assert_eq!(number(&value("number(' 42 ')")), 42.0);
}

#[test]
fn test_number_to_string_formatting() {
    assert_eq!(string("string(1 div 0)"), "Infinity");
    assert_eq!(string("string(-1 div 0)"), "-Infinity");
    assert_eq!(string("string(0 div 0)"), "NaN");
    assert_eq!(string("string(-0)"), "0");
    assert_eq!(string("string(3.0)"), "3");
    assert_eq!(string("string(0.1 + 0.2 = 0.3)"), "false");
    assert_eq!(string("string(1000000 * 1000000)"), "1000000000000");
}

#[test]
fn test_boolean_functions_and_comparisons() {
    assert!(!boolean("boolean(//nothing)"));
    assert!(boolean("boolean(//book)"));
    assert!(boolean("not('')"));
    assert!(boolean("true() and not(false())"));
    assert!(boolean("1 = 1.0"));
    assert!(boolean("'1' = 1"));
    assert!(boolean("true() = 'x'"));
    assert!(boolean("//title = 'Emma'"));
    assert!(boolean("//title != 'Emma'"));
    assert!(!boolean("//nothing = //nothing"));
    assert!(boolean("'10' > '9'"));
    assert!(!boolean("(0 div 0) = (0 div 0)"));
}

#[test]
fn test_node_name_functions() -> TestResult {
    let doc = XmlDocument::parse(CATALOG)?;
    let engine = XPathEngine::new();
    assert_eq!(
        eval(&engine, &doc, "name(/*)")?,
        XPathValue::String("catalog".into())
    );
    assert_eq!(
        eval(&engine, &doc, "name(//*[local-name() = 'author'])")?,
        XPathValue::String("p:author".into())
    );
    assert_eq!(
        eval(&engine, &doc, "namespace-uri(/*)")?,
        XPathValue::String("urn:books".into())
    );
    assert_eq!(
        eval(&engine, &doc, "local-name(//@year)")?,
        XPathValue::String("year".into())
    );
    assert_eq!(
        eval(&engine, &doc, "namespace-uri(//@year)")?,
        XPathValue::String(String::new())
    );
    assert_eq!(
        eval(&engine, &doc, "name(//nothing)")?,
        XPathValue::String(String::new())
    );
    Ok(())
}

#[test]
fn test_type_errors_surface_as_evaluation_errors() -> TestResult {
    let doc = XmlDocument::parse(LIBRARY)?;
    let engine = XPathEngine::new();
    for query in ["count('x')", "sum(3)", "1 | //book", "name(1)", "'a'/b"] {
        let err = eval(&engine, &doc, query).unwrap_err();
        assert!(err.is_evaluation(), "{}: {}", query, err);
    }
    Ok(())
}
