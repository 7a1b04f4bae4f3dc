use oxpath::{Error, XPathEngine, XPathValue, XmlDocument, describe_node};
use std::collections::HashMap;
use std::env;
use std::fs;

/// A small CLI that runs one XPath query against an XML file.
///
/// Namespace bindings are passed as `prefix=uri` arguments after the query.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        usage();
    }
    let namespaces = match parse_bindings(&args[3..]) {
        Ok(namespaces) => namespaces,
        Err(binding) => {
            eprintln!("Malformed namespace binding '{}', expected prefix=uri", binding);
            eprintln!();
            usage();
        }
    };

    let xml = fs::read_to_string(&args[1])?;
    let query = &args[2];

    let doc = XmlDocument::parse(&xml).map_err(Error::from)?;
    let engine = XPathEngine::new();
    let value = engine
        .evaluate(query, &doc, doc.root(), &namespaces)
        .map_err(Error::from)?;

    match value {
        XPathValue::NodeSet(nodes) => {
            log::info!("{} node(s) selected", nodes.len());
            for node in nodes {
                println!("{}", describe_node(&doc, node));
            }
        }
        other => println!("{}", other.to_string_value(&doc)),
    }
    Ok(())
}

fn usage() -> ! {
    eprintln!("Evaluates an XPath 1.0 expression against an XML document.");
    eprintln!();
    eprintln!("Usage: oxpath <path/to/doc.xml> <expression> [prefix=uri ...]");
    std::process::exit(1);
}

/// Reads `prefix=uri` arguments. Returns the first malformed one as the error.
fn parse_bindings(args: &[String]) -> Result<HashMap<String, String>, &str> {
    args.iter()
        .map(|binding| match binding.split_once('=') {
            Some((prefix, uri)) if !prefix.is_empty() => {
                Ok((prefix.to_string(), uri.to_string()))
            }
            _ => Err(binding.as_str()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_bindings() {
        let bound = parse_bindings(&args(&["b=urn:books", "p=urn:a=b"])).unwrap();
        assert_eq!(bound["b"], "urn:books");
        assert_eq!(bound["p"], "urn:a=b");
        assert!(parse_bindings(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_binding_is_rejected() {
        let given = args(&["b=urn:books", "urn:people", "x=y"]);
        assert_eq!(parse_bindings(&given), Err("urn:people"));
        let given = args(&["=urn:empty"]);
        assert_eq!(parse_bindings(&given), Err("=urn:empty"));
    }
}
