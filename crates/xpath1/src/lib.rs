//! An XPath 1.0 engine over any tree that implements [`DataSource`].
//!
//! Queries are tokenized, parsed into an [`Expression`], compiled into
//! closures and then evaluated. [`XPathEngine`] caches the parsed and compiled
//! forms by query string so repeated queries skip straight to evaluation.

pub mod ast;
pub mod axes;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod datasource;
pub mod engine;
pub mod error;
pub mod functions;
pub mod lexer;
pub mod operators;
pub mod parser;

pub use ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, NodeTypeTest, Step};
pub use cache::ExpressionCache;
pub use compiler::{CompiledExpression, compile};
pub use config::EngineConfig;
pub use datasource::{DataSource, NodeId, NodeType, QName, sort_document_order};
pub use engine::{EvaluationContext, XML_NAMESPACE, XPathEngine, XPathValue};
pub use error::{EvaluationErrorKind, XPathError};
pub use functions::{FunctionDef, FunctionRegistry, XPathFunction};
pub use lexer::tokenize;
pub use parser::parse_expression;

// Re-export test utilities for integration testing in downstream crates
pub use datasource::tests;
