//! XPath 1.0 queries over XML documents.
//!
//! The engine lives in `oxpath-xpath1` and works against any
//! [`DataSource`]; `oxpath-xml` supplies the `roxmltree` backend. This crate
//! re-exports both and adds a few string-in, string-out helpers.

use std::collections::HashMap;
use thiserror::Error;

pub use oxpath_xml::{ParseError, XmlDocument};
pub use oxpath_xpath1::{
    CompiledExpression, DataSource, EngineConfig, EvaluationContext, EvaluationErrorKind,
    ExpressionCache, FunctionDef, FunctionRegistry, NodeId, NodeType, QName, XML_NAMESPACE,
    XPathEngine, XPathError, XPathValue, parse_expression, sort_document_order,
};

/// Re-export the engine crate for callers that need the AST or lexer.
pub use oxpath_xpath1 as xpath1;

#[derive(Error, Debug)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    Xml(#[from] ParseError),

    #[error(transparent)]
    XPath(#[from] XPathError),
}

/// Parses `xml` and evaluates `query` with the document node as context.
///
/// A node-set yields the string-value of each node in document order; any
/// other result yields a single string.
pub fn evaluate_to_strings(
    engine: &XPathEngine,
    xml: &str,
    query: &str,
    namespaces: &HashMap<String, String>,
) -> Result<Vec<String>, Error> {
    let doc = XmlDocument::parse(xml)?;
    let value = engine.evaluate(query, &doc, doc.root(), namespaces)?;
    Ok(match value {
        XPathValue::NodeSet(nodes) => nodes.iter().map(|&n| doc.string_value(n)).collect(),
        other => vec![other.to_string_value(&doc)],
    })
}

/// Describes a node the way the command line tool prints it.
pub fn describe_node(source: &dyn DataSource, node: NodeId) -> String {
    let kind = source.node_type(node);
    match (kind, source.name(node)) {
        (NodeType::Element, Some(name)) => format!("<{}>", name),
        (NodeType::Attribute, Some(name)) => format!("@{}={:?}", name, source.string_value(node)),
        (NodeType::Namespace, Some(name)) => {
            format!("xmlns:{}={:?}", name.local_part, source.string_value(node))
        }
        (NodeType::ProcessingInstruction, Some(name)) => {
            format!("<?{} {}?>", name, source.string_value(node))
        }
        (NodeType::Comment, _) => format!("<!--{}-->", source.string_value(node)),
        (NodeType::Root, _) => "/".to_string(),
        _ => format!("{:?}", source.string_value(node)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_to_strings() {
        let engine = XPathEngine::new();
        let xml = "<a><b>1</b><b>2</b></a>";
        let none = HashMap::new();
        assert_eq!(
            evaluate_to_strings(&engine, xml, "//b", &none).unwrap(),
            vec!["1", "2"]
        );
        assert_eq!(
            evaluate_to_strings(&engine, xml, "sum(//b) * 2", &none).unwrap(),
            vec!["6"]
        );
        assert!(matches!(
            evaluate_to_strings(&engine, "<a>", "//b", &none),
            Err(Error::Xml(_))
        ));
        assert!(matches!(
            evaluate_to_strings(&engine, xml, "//b[", &none),
            Err(Error::XPath(XPathError::Syntax { .. }))
        ));
    }

    #[test]
    fn test_describe_node() {
        let doc = XmlDocument::parse(r#"<a id="x"><!--c-->t</a>"#).unwrap();
        let a = doc.document_element();
        let attr = doc.attributes(a).next().unwrap();
        let kids: Vec<_> = doc.children(a).collect();
        assert_eq!(describe_node(&doc, a), "<a>");
        assert_eq!(describe_node(&doc, attr), "@id=\"x\"");
        assert_eq!(describe_node(&doc, kids[0]), "<!--c-->");
        assert_eq!(describe_node(&doc, kids[1]), "\"t\"");
        assert_eq!(describe_node(&doc, doc.root()), "/");
    }
}
