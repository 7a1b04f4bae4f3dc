//! XML documents for the XPath engine, parsed with `roxmltree`.

mod document;

pub use document::XmlDocument;
pub use roxmltree::Error as ParseError;
