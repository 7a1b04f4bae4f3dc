#![allow(dead_code)]

pub mod fixtures;

use oxpath::{DataSource, XPathEngine, XPathError, XPathValue, XmlDocument};
use std::collections::HashMap;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Evaluate with the document node as context and no namespace bindings.
pub fn eval(engine: &XPathEngine, doc: &XmlDocument<'_>, query: &str) -> Result<XPathValue, XPathError> {
    engine.evaluate(query, doc, doc.root(), &HashMap::new())
}

/// Evaluate with the given `prefix -> uri` bindings.
pub fn eval_ns(
    engine: &XPathEngine,
    doc: &XmlDocument<'_>,
    query: &str,
    bindings: &[(&str, &str)],
) -> Result<XPathValue, XPathError> {
    let namespaces: HashMap<String, String> = bindings
        .iter()
        .map(|(p, u)| (p.to_string(), u.to_string()))
        .collect();
    engine.evaluate(query, doc, doc.root(), &namespaces)
}

/// The string-value of every node in a node-set result.
pub fn strings(doc: &XmlDocument<'_>, value: &XPathValue) -> Vec<String> {
    value
        .as_node_set()
        .unwrap_or_else(|| panic!("expected a node-set, got {:?}", value))
        .iter()
        .map(|&n| doc.string_value(n))
        .collect()
}

/// The qualified name of every node in a node-set result.
pub fn names(doc: &XmlDocument<'_>, value: &XPathValue) -> Vec<String> {
    value
        .as_node_set()
        .unwrap_or_else(|| panic!("expected a node-set, got {:?}", value))
        .iter()
        .map(|&n| doc.name(n).map(|q| q.to_string()).unwrap_or_default())
        .collect()
}

pub fn number(value: &XPathValue) -> f64 {
    match value {
        XPathValue::Number(n) => *n,
        other => panic!("expected a number, got {:?}", other),
    }
}
