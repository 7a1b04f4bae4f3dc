//! Values, the evaluation context, and the caching engine facade.

use crate::ast::Expression;
use crate::cache::ExpressionCache;
use crate::compiler::{self, CompiledExpression};
use crate::config::EngineConfig;
use crate::datasource::{DataSource, NodeId};
use crate::error::{EvaluationErrorKind, XPathError};
use crate::functions::{FunctionDef, FunctionRegistry};
use crate::parser::parse_expression;
use std::collections::HashMap;
use std::sync::Arc;

/// The URI permanently bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Represents the possible result types of an XPath expression evaluation.
///
/// A `NodeSet` is always in document order without duplicates.
#[derive(Debug, Clone, PartialEq)]
pub enum XPathValue {
    NodeSet(Vec<NodeId>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl XPathValue {
    /// Coerces the XPath value to a boolean as per XPath 1.0 rules.
    pub fn to_bool(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::Boolean(b) => *b,
        }
    }

    /// Coerces the XPath value to a number as per XPath 1.0 rules.
    pub fn to_number(&self, source: &dyn DataSource) -> f64 {
        match self {
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => parse_number(s),
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::NodeSet(_) => parse_number(&self.to_string_value(source)),
        }
    }

    /// Coerces the XPath value to a string as per XPath 1.0 rules.
    pub fn to_string_value(&self, source: &dyn DataSource) -> String {
        match self {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|n| source.string_value(*n))
                .unwrap_or_default(),
            XPathValue::String(s) => s.clone(),
            XPathValue::Number(n) => format_number(*n),
            XPathValue::Boolean(b) => b.to_string(),
        }
    }

    pub fn as_node_set(&self) -> Option<&[NodeId]> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn into_node_set(self) -> Option<Vec<NodeId>> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::String(_) => "string",
            XPathValue::Number(_) => "number",
            XPathValue::Boolean(_) => "boolean",
        }
    }
}

/// Formats a number the way XPath 1.0 `string()` does: no exponent, integral
/// values without a fraction, `NaN`/`Infinity`/`-Infinity` for the specials.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        // Also covers negative zero.
        "0".to_string()
    } else {
        // f64's Display is shortest-round-trip and never uses exponent notation.
        format!("{}", n)
    }
}

pub(crate) fn is_xpath_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Parses a string the way XPath 1.0 `number()` does. Anything other than an
/// optionally negative decimal surrounded by whitespace is `NaN`.
pub fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(is_xpath_whitespace);
    let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let mut seen_digit = false;
    let mut seen_dot = false;
    for c in unsigned.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return f64::NAN,
        }
    }
    if !seen_digit {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// A container for all state needed during expression evaluation.
///
/// Created fresh for every top-level evaluation. Stepping into a predicate
/// derives a new context via [`EvaluationContext::focus`]; nothing is shared
/// between evaluations.
#[derive(Clone, Copy)]
pub struct EvaluationContext<'d> {
    pub source: &'d dyn DataSource,
    pub context_node: NodeId,
    /// 1-based position within the current node-set; `None` outside predicates.
    pub context_position: Option<usize>,
    pub context_size: Option<usize>,
    pub namespaces: &'d HashMap<String, String>,
    pub variables: &'d HashMap<String, XPathValue>,
    /// If true, an unbound variable is an error.
    pub strict: bool,
}

impl<'d> EvaluationContext<'d> {
    pub fn new(
        source: &'d dyn DataSource,
        context_node: NodeId,
        namespaces: &'d HashMap<String, String>,
        variables: &'d HashMap<String, XPathValue>,
    ) -> Self {
        Self {
            source,
            context_node,
            context_position: None,
            context_size: None,
            namespaces,
            variables,
            strict: true,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// A context focused on `node` at `position` of `size`, for predicate evaluation.
    pub fn focus(&self, node: NodeId, position: usize, size: usize) -> Self {
        Self {
            context_node: node,
            context_position: Some(position),
            context_size: Some(size),
            ..*self
        }
    }

    /// Resolves a namespace prefix against the active bindings.
    pub fn resolve_prefix(&self, prefix: &str) -> Result<&'d str, EvaluationErrorKind> {
        if let Some(uri) = self.namespaces.get(prefix) {
            return Ok(uri.as_str());
        }
        if prefix == "xml" {
            return Ok(XML_NAMESPACE);
        }
        Err(EvaluationErrorKind::UndeclaredPrefix(prefix.to_string()))
    }
}

/// Parses, compiles and evaluates queries, caching both stages by query string.
///
/// The engine is `Send + Sync`; share one behind an `Arc` (or a `static`) to
/// pay parse and compile cost once per distinct query across all documents.
#[derive(Debug, Default)]
pub struct XPathEngine {
    config: EngineConfig,
    functions: FunctionRegistry,
    cache: ExpressionCache,
}

impl XPathEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn cache(&self) -> &ExpressionCache {
        &self.cache
    }

    /// Adds or replaces a function. Cached compilations may have bound the old
    /// definition, so the cache is cleared.
    pub fn register_function(&mut self, def: FunctionDef) {
        self.functions.register(def);
        self.clear_cache();
    }

    pub fn clear_cache(&self) {
        log::debug!(
            "Clearing XPath cache ({} parsed, {} compiled)",
            self.cache.parsed_len(),
            self.cache.compiled_len()
        );
        self.cache.clear();
    }

    /// Parses `query`, returning the cached tree when one exists.
    pub fn parse(&self, query: &str) -> Result<Arc<Expression>, XPathError> {
        if !self.config.cache_expressions {
            return parse_expression(query).map(Arc::new);
        }
        if let Some(expr) = self.cache.get_parsed(query) {
            log::trace!("XPath parse cache hit for '{}'", query);
            return Ok(expr);
        }
        log::debug!("Parsing XPath '{}'", query);
        let expr = Arc::new(parse_expression(query)?);
        Ok(self.cache.insert_parsed(query, expr))
    }

    /// Compiles `query`, returning the cached closure when one exists.
    pub fn compile(&self, query: &str) -> Result<Arc<CompiledExpression>, XPathError> {
        if self.config.cache_expressions {
            if let Some(compiled) = self.cache.get_compiled(query) {
                log::trace!("XPath compile cache hit for '{}'", query);
                return Ok(compiled);
            }
        }
        let expr = self.parse(query)?;
        log::debug!("Compiling XPath '{}'", query);
        let compiled = Arc::new(compiler::compile(query, &expr, &self.functions)?);
        if self.config.cache_expressions {
            Ok(self.cache.insert_compiled(query, compiled))
        } else {
            Ok(compiled)
        }
    }

    /// Evaluates `query` with `node` as the context node.
    pub fn evaluate(
        &self,
        query: &str,
        source: &dyn DataSource,
        node: NodeId,
        namespaces: &HashMap<String, String>,
    ) -> Result<XPathValue, XPathError> {
        self.evaluate_with_variables(query, source, node, namespaces, &HashMap::new())
    }

    pub fn evaluate_with_variables(
        &self,
        query: &str,
        source: &dyn DataSource,
        node: NodeId,
        namespaces: &HashMap<String, String>,
        variables: &HashMap<String, XPathValue>,
    ) -> Result<XPathValue, XPathError> {
        let compiled = self.compile(query)?;
        let e_ctx = EvaluationContext::new(source, node, namespaces, variables)
            .with_strict(self.config.strict_variables);
        compiled.evaluate(&e_ctx)
    }
}
