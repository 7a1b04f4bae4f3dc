//! Defines the registry and built-in implementations for XPath 1.0 functions.

use crate::datasource::{NodeId, NodeType};
use crate::engine::{
    EvaluationContext, XML_NAMESPACE, XPathValue, is_xpath_whitespace, parse_number,
};
use crate::error::EvaluationErrorKind;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// The signature every XPath function implements. Arguments arrive evaluated,
/// left to right, and have already been checked against the declared arity.
pub type XPathFunction =
    fn(Vec<XPathValue>, &EvaluationContext<'_>) -> Result<XPathValue, EvaluationErrorKind>;

/// A named function together with the number of arguments it accepts.
#[derive(Clone, Copy)]
pub struct FunctionDef {
    pub name: &'static str,
    pub min_args: usize,
    /// `None` means any number of arguments from `min_args` up.
    pub max_args: Option<usize>,
    pub func: XPathFunction,
}

impl FunctionDef {
    pub const fn new(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        func: XPathFunction,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            func,
        }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.is_none_or(|max| count <= max)
    }

    pub fn check_arity(&self, count: usize) -> Result<(), EvaluationErrorKind> {
        if self.accepts(count) {
            return Ok(());
        }
        let expected = match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        };
        Err(EvaluationErrorKind::Arity {
            function: self.name.to_string(),
            expected,
            found: count,
        })
    }

    /// Checks the arity and invokes the function.
    pub fn call(
        &self,
        args: Vec<XPathValue>,
        e_ctx: &EvaluationContext<'_>,
    ) -> Result<XPathValue, EvaluationErrorKind> {
        self.check_arity(args.len())?;
        (self.func)(args, e_ctx)
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish_non_exhaustive()
    }
}

/// Maps function names (as written in the query, prefix included) to definitions.
///
/// `FunctionRegistry::default()` holds the XPath 1.0 core library;
/// `FunctionRegistry::new()` is empty.
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<&'static str, FunctionDef>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Adds a function, replacing any existing one with the same name.
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        for def in BUILTINS {
            registry.register(*def);
        }
        registry
    }
}

const BUILTINS: &[FunctionDef] = &[
    // Node-set
    FunctionDef::new("last", 0, Some(0), func_last),
    FunctionDef::new("position", 0, Some(0), func_position),
    FunctionDef::new("count", 1, Some(1), func_count),
    FunctionDef::new("id", 1, Some(1), func_id),
    FunctionDef::new("local-name", 0, Some(1), func_local_name),
    FunctionDef::new("namespace-uri", 0, Some(1), func_namespace_uri),
    FunctionDef::new("name", 0, Some(1), func_name),
    // String
    FunctionDef::new("string", 0, Some(1), func_string),
    FunctionDef::new("concat", 2, None, func_concat),
    FunctionDef::new("starts-with", 2, Some(2), func_starts_with),
    FunctionDef::new("contains", 2, Some(2), func_contains),
    FunctionDef::new("substring-before", 2, Some(2), func_substring_before),
    FunctionDef::new("substring-after", 2, Some(2), func_substring_after),
    FunctionDef::new("substring", 2, Some(3), func_substring),
    FunctionDef::new("string-length", 0, Some(1), func_string_length),
    FunctionDef::new("normalize-space", 0, Some(1), func_normalize_space),
    FunctionDef::new("translate", 3, Some(3), func_translate),
    // Boolean
    FunctionDef::new("boolean", 1, Some(1), func_boolean),
    FunctionDef::new("not", 1, Some(1), func_not),
    FunctionDef::new("true", 0, Some(0), func_true),
    FunctionDef::new("false", 0, Some(0), func_false),
    FunctionDef::new("lang", 1, Some(1), func_lang),
    // Number
    FunctionDef::new("number", 0, Some(1), func_number),
    FunctionDef::new("sum", 1, Some(1), func_sum),
    FunctionDef::new("floor", 1, Some(1), func_floor),
    FunctionDef::new("ceiling", 1, Some(1), func_ceiling),
    FunctionDef::new("round", 1, Some(1), func_round),
];

// --- Argument helpers ---

fn missing(function: &str) -> EvaluationErrorKind {
    EvaluationErrorKind::function(function, "missing argument")
}

fn next_value(
    args: &mut impl Iterator<Item = XPathValue>,
    function: &str,
) -> Result<XPathValue, EvaluationErrorKind> {
    args.next().ok_or_else(|| missing(function))
}

fn next_string(
    args: &mut impl Iterator<Item = XPathValue>,
    e_ctx: &EvaluationContext<'_>,
    function: &str,
) -> Result<String, EvaluationErrorKind> {
    Ok(next_value(args, function)?.to_string_value(e_ctx.source))
}

fn next_number(
    args: &mut impl Iterator<Item = XPathValue>,
    e_ctx: &EvaluationContext<'_>,
    function: &str,
) -> Result<f64, EvaluationErrorKind> {
    Ok(next_value(args, function)?.to_number(e_ctx.source))
}

/// The string argument, or the context node's string-value when omitted.
fn string_or_context(arg: Option<XPathValue>, e_ctx: &EvaluationContext<'_>) -> String {
    match arg {
        Some(value) => value.to_string_value(e_ctx.source),
        None => e_ctx.source.string_value(e_ctx.context_node),
    }
}

fn node_set(value: XPathValue, function: &str) -> Result<Vec<NodeId>, EvaluationErrorKind> {
    match value {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(EvaluationErrorKind::type_error(format!(
            "{}() argument must be a node-set, got {}",
            function,
            other.type_name()
        ))),
    }
}

/// The first node of an optional node-set argument, defaulting to the context node.
fn first_node_or_context(
    arg: Option<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
    function: &str,
) -> Result<Option<NodeId>, EvaluationErrorKind> {
    match arg {
        None => Ok(Some(e_ctx.context_node)),
        Some(value) => Ok(node_set(value, function)?.first().copied()),
    }
}

/// XPath `round()`: nearest integer, halves towards positive infinity.
pub(crate) fn xpath_round(n: f64) -> f64 {
    if !n.is_finite() {
        return n;
    }
    let floor = n.floor();
    let rounded = if n - floor >= 0.5 { floor + 1.0 } else { floor };
    if rounded == 0.0 && n.is_sign_negative() {
        -0.0
    } else {
        rounded
    }
}

// --- Node-set functions ---

fn func_last(
    _args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let size = e_ctx
        .context_size
        .ok_or_else(|| EvaluationErrorKind::OutsidePredicate {
            function: "last".to_string(),
        })?;
    Ok(XPathValue::Number(size as f64))
}

fn func_position(
    _args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let position = e_ctx
        .context_position
        .ok_or_else(|| EvaluationErrorKind::OutsidePredicate {
            function: "position".to_string(),
        })?;
    Ok(XPathValue::Number(position as f64))
}

fn func_count(
    args: Vec<XPathValue>,
    _e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let mut args = args.into_iter();
    let nodes = node_set(next_value(&mut args, "count")?, "count")?;
    Ok(XPathValue::Number(nodes.len() as f64))
}

/// Selects elements by ID. An attribute counts as an ID when it is an
/// unqualified `id` or `xml:id`; no DTD information is consulted.
fn func_id(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let source = e_ctx.source;
    let mut args = args.into_iter();
    let tokens: Vec<String> = match next_value(&mut args, "id")? {
        XPathValue::NodeSet(nodes) => nodes.into_iter().map(|n| source.string_value(n)).collect(),
        other => vec![other.to_string_value(source)],
    };
    let ids_to_find: HashSet<&str> = tokens
        .iter()
        .flat_map(|t| t.split(is_xpath_whitespace))
        .filter(|t| !t.is_empty())
        .collect();
    if ids_to_find.is_empty() {
        return Ok(XPathValue::NodeSet(vec![]));
    }

    // Pre-order walk, so results come out in document order.
    let mut results = Vec::new();
    let mut stack = vec![source.root_of(e_ctx.context_node)];
    while let Some(node) = stack.pop() {
        if source.node_type(node) == NodeType::Element {
            let matched = source.attributes(node).any(|attr| {
                let is_id_attr = source.name(attr).is_some_and(|q| q.local_part == "id")
                    && matches!(source.namespace_uri(attr), None | Some("") | Some(XML_NAMESPACE));
                is_id_attr && ids_to_find.contains(source.string_value(attr).as_str())
            });
            if matched {
                results.push(node);
            }
        }
        let mut children: Vec<NodeId> = source.children(node).collect();
        children.reverse();
        stack.extend(children);
    }
    Ok(XPathValue::NodeSet(results))
}

fn func_local_name(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let node = first_node_or_context(args.into_iter().next(), e_ctx, "local-name")?;
    let name = node
        .and_then(|n| e_ctx.source.name(n).map(|q| q.local_part.to_string()))
        .unwrap_or_default();
    Ok(XPathValue::String(name))
}

fn func_namespace_uri(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let node = first_node_or_context(args.into_iter().next(), e_ctx, "namespace-uri")?;
    let uri = node
        .and_then(|n| e_ctx.source.namespace_uri(n).map(str::to_string))
        .unwrap_or_default();
    Ok(XPathValue::String(uri))
}

fn func_name(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let node = first_node_or_context(args.into_iter().next(), e_ctx, "name")?;
    let name = node
        .and_then(|n| e_ctx.source.name(n).map(|q| q.to_string()))
        .unwrap_or_default();
    Ok(XPathValue::String(name))
}

// --- String functions ---

fn func_string(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    Ok(XPathValue::String(string_or_context(
        args.into_iter().next(),
        e_ctx,
    )))
}

fn func_concat(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let result = args
        .iter()
        .map(|v| v.to_string_value(e_ctx.source))
        .collect::<String>();
    Ok(XPathValue::String(result))
}

fn func_starts_with(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let mut args = args.into_iter();
    let s1 = next_string(&mut args, e_ctx, "starts-with")?;
    let s2 = next_string(&mut args, e_ctx, "starts-with")?;
    Ok(XPathValue::Boolean(s1.starts_with(&s2)))
}

fn func_contains(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let mut args = args.into_iter();
    let s1 = next_string(&mut args, e_ctx, "contains")?;
    let s2 = next_string(&mut args, e_ctx, "contains")?;
    Ok(XPathValue::Boolean(s1.contains(&s2)))
}

fn func_substring_before(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let mut args = args.into_iter();
    let s1 = next_string(&mut args, e_ctx, "substring-before")?;
    let s2 = next_string(&mut args, e_ctx, "substring-before")?;
    let result = match s1.find(&s2) {
        Some(index) => s1[..index].to_string(),
        None => String::new(),
    };
    Ok(XPathValue::String(result))
}

fn func_substring_after(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let mut args = args.into_iter();
    let s1 = next_string(&mut args, e_ctx, "substring-after")?;
    let s2 = next_string(&mut args, e_ctx, "substring-after")?;
    let result = match s1.find(&s2) {
        Some(index) => s1[index + s2.len()..].to_string(),
        None => String::new(),
    };
    Ok(XPathValue::String(result))
}

/// Keeps the characters whose 1-based position `p` satisfies
/// `round(start) <= p < round(start) + round(length)`. NaN bounds select nothing.
fn func_substring(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let mut args = args.into_iter();
    let s = next_string(&mut args, e_ctx, "substring")?;
    let first = xpath_round(next_number(&mut args, e_ctx, "substring")?);
    let last = match args.next() {
        Some(length) => first + xpath_round(length.to_number(e_ctx.source)),
        None => f64::INFINITY,
    };

    let result = s
        .chars()
        .enumerate()
        .filter_map(|(i, c)| {
            let pos = (i + 1) as f64;
            (pos >= first && pos < last).then_some(c)
        })
        .collect::<String>();
    Ok(XPathValue::String(result))
}

fn func_string_length(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let s = string_or_context(args.into_iter().next(), e_ctx);
    Ok(XPathValue::Number(s.chars().count() as f64))
}

fn func_normalize_space(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let s = string_or_context(args.into_iter().next(), e_ctx);
    let normalized = s
        .split(is_xpath_whitespace)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(XPathValue::String(normalized))
}

fn func_translate(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let mut args = args.into_iter();
    let source_str = next_string(&mut args, e_ctx, "translate")?;
    let from_str: Vec<char> = next_string(&mut args, e_ctx, "translate")?.chars().collect();
    let to_str: Vec<char> = next_string(&mut args, e_ctx, "translate")?.chars().collect();
    let result = source_str
        .chars()
        .filter_map(|c| match from_str.iter().position(|&fc| fc == c) {
            Some(pos) => to_str.get(pos).copied(),
            None => Some(c),
        })
        .collect::<String>();
    Ok(XPathValue::String(result))
}

// --- Boolean functions ---

fn func_boolean(
    args: Vec<XPathValue>,
    _e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let mut args = args.into_iter();
    Ok(XPathValue::Boolean(next_value(&mut args, "boolean")?.to_bool()))
}

fn func_not(
    args: Vec<XPathValue>,
    _e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let mut args = args.into_iter();
    Ok(XPathValue::Boolean(!next_value(&mut args, "not")?.to_bool()))
}

fn func_true(
    _args: Vec<XPathValue>,
    _e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    Ok(XPathValue::Boolean(true))
}

fn func_false(
    _args: Vec<XPathValue>,
    _e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    Ok(XPathValue::Boolean(false))
}

fn func_lang(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let source = e_ctx.source;
    let mut args = args.into_iter();
    let test_lang = next_string(&mut args, e_ctx, "lang")?.to_ascii_lowercase();

    let mut current = Some(e_ctx.context_node);
    // Non-elements take their language from the nearest element.
    if source.node_type(e_ctx.context_node) != NodeType::Element {
        current = source.parent(e_ctx.context_node);
    }

    while let Some(node) = current {
        let lang_attr = source.attributes(node).find(|&attr| {
            source.namespace_uri(attr) == Some(XML_NAMESPACE)
                && source.name(attr).is_some_and(|q| q.local_part == "lang")
        });
        if let Some(attr) = lang_attr {
            let node_lang = source.string_value(attr).to_ascii_lowercase();
            // "en" matches "en" and "en-GB", but not "english".
            let matches = node_lang == test_lang
                || node_lang
                    .strip_prefix(test_lang.as_str())
                    .is_some_and(|rest| rest.starts_with('-'));
            return Ok(XPathValue::Boolean(matches));
        }
        current = source.parent(node);
    }
    Ok(XPathValue::Boolean(false))
}

// --- Number functions ---

fn func_number(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let n = match args.into_iter().next() {
        Some(value) => value.to_number(e_ctx.source),
        None => parse_number(&e_ctx.source.string_value(e_ctx.context_node)),
    };
    Ok(XPathValue::Number(n))
}

fn func_sum(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let mut args = args.into_iter();
    let nodes = node_set(next_value(&mut args, "sum")?, "sum")?;
    let sum = nodes
        .iter()
        .map(|&node| parse_number(&e_ctx.source.string_value(node)))
        .sum();
    Ok(XPathValue::Number(sum))
}

fn func_floor(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let mut args = args.into_iter();
    Ok(XPathValue::Number(
        next_number(&mut args, e_ctx, "floor")?.floor(),
    ))
}

fn func_ceiling(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let mut args = args.into_iter();
    Ok(XPathValue::Number(
        next_number(&mut args, e_ctx, "ceiling")?.ceil(),
    ))
}

fn func_round(
    args: Vec<XPathValue>,
    e_ctx: &EvaluationContext<'_>,
) -> Result<XPathValue, EvaluationErrorKind> {
    let mut args = args.into_iter();
    Ok(XPathValue::Number(xpath_round(next_number(
        &mut args, e_ctx, "round",
    )?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::tests::{MockTree, TestNodes, create_test_tree};

    // Owns everything an EvaluationContext borrows.
    struct TestSetup {
        tree: MockTree,
        nodes: TestNodes,
        funcs: FunctionRegistry,
        namespaces: HashMap<String, String>,
        vars: HashMap<String, XPathValue>,
    }

    impl TestSetup {
        fn new() -> Self {
            let (tree, nodes) = create_test_tree();
            Self {
                tree,
                nodes,
                funcs: FunctionRegistry::default(),
                namespaces: HashMap::new(),
                vars: HashMap::new(),
            }
        }

        fn context(&self, node: NodeId) -> EvaluationContext<'_> {
            EvaluationContext::new(&self.tree, node, &self.namespaces, &self.vars)
        }

        fn call(
            &self,
            name: &str,
            args: Vec<XPathValue>,
            e_ctx: &EvaluationContext<'_>,
        ) -> Result<XPathValue, EvaluationErrorKind> {
            self.funcs
                .get(name)
                .unwrap_or_else(|| panic!("{} is not registered", name))
                .call(args, e_ctx)
        }

        fn eval(&self, name: &str, args: Vec<XPathValue>) -> XPathValue {
            let e_ctx = self.context(self.nodes.root);
            self.call(name, args, &e_ctx).unwrap()
        }
    }

    fn s(value: &str) -> XPathValue {
        XPathValue::String(value.to_string())
    }

    fn num(value: f64) -> XPathValue {
        XPathValue::Number(value)
    }

    // --- String Function Tests ---

    #[test]
    fn test_func_concat() {
        let setup = TestSetup::new();
        let result = setup.eval("concat", vec![s("Hello"), s(" "), s("World"), num(42.0)]);
        assert_eq!(result, s("Hello World42"));
    }

    #[test]
    fn test_func_starts_with_and_contains() {
        let setup = TestSetup::new();
        assert!(setup.eval("starts-with", vec![s("abcdef"), s("abc")]).to_bool());
        assert!(!setup.eval("starts-with", vec![s("abcdef"), s("def")]).to_bool());
        assert!(setup.eval("contains", vec![s("abcdef"), s("cd")]).to_bool());
        assert!(setup.eval("contains", vec![s("abc"), s("")]).to_bool());
    }

    #[test]
    fn test_func_substring_before_and_after() {
        let setup = TestSetup::new();
        assert_eq!(
            setup.eval("substring-before", vec![s("1999/04/01"), s("/")]),
            s("1999")
        );
        assert_eq!(
            setup.eval("substring-after", vec![s("1999/04/01"), s("/")]),
            s("04/01")
        );
        assert_eq!(setup.eval("substring-after", vec![s("abc"), s("x")]), s(""));
        assert_eq!(setup.eval("substring-after", vec![s("abc"), s("")]), s("abc"));
    }

    #[test]
    fn test_func_substring() {
        let setup = TestSetup::new();
        assert_eq!(setup.eval("substring", vec![s("12345"), num(2.0), num(3.0)]), s("234"));
        assert_eq!(setup.eval("substring", vec![s("12345"), num(2.0)]), s("2345"));
        assert_eq!(setup.eval("substring", vec![s("12345"), num(1.5), num(2.6)]), s("234"));
        assert_eq!(setup.eval("substring", vec![s("12345"), num(0.0), num(3.0)]), s("12"));
        assert_eq!(setup.eval("substring", vec![s("Hello World"), num(7.0)]), s("World"));
        assert_eq!(setup.eval("substring", vec![s("Hello"), num(20.0), num(5.0)]), s(""));
        assert_eq!(
            setup.eval("substring", vec![s("12345"), num(f64::NAN), num(3.0)]),
            s("")
        );
        assert_eq!(
            setup.eval(
                "substring",
                vec![s("12345"), num(f64::NEG_INFINITY), num(f64::INFINITY)]
            ),
            s("")
        );
    }

    #[test]
    fn test_func_string_length_counts_characters() {
        let setup = TestSetup::new();
        assert_eq!(setup.eval("string-length", vec![s("Hello世界")]), num(7.0));
        let e_ctx = setup.context(setup.nodes.para1);
        assert_eq!(
            setup.call("string-length", vec![], &e_ctx).unwrap(),
            num(5.0)
        );
    }

    #[test]
    fn test_func_normalize_space() {
        let setup = TestSetup::new();
        assert_eq!(
            setup.eval("normalize-space", vec![s("  leading \n and   \t trailing  ")]),
            s("leading and trailing")
        );
        // Only the four XML whitespace characters collapse.
        assert_eq!(
            setup.eval("normalize-space", vec![s("a\u{a0}b")]),
            s("a\u{a0}b")
        );
    }

    #[test]
    fn test_func_translate() {
        let setup = TestSetup::new();
        assert_eq!(setup.eval("translate", vec![s("abc"), s("abc"), s("12")]), s("12"));
        assert_eq!(
            setup.eval("translate", vec![s("--aaa--"), s("abc-"), s("ABC")]),
            s("AAA")
        );
    }

    #[test]
    fn test_func_string_defaults_to_context_node() {
        let setup = TestSetup::new();
        let e_ctx = setup.context(setup.nodes.para2);
        assert_eq!(setup.call("string", vec![], &e_ctx).unwrap(), s("World"));
        assert_eq!(setup.eval("string", vec![num(2.5)]), s("2.5"));
    }

    // --- Node-set Function Tests ---

    #[test]
    fn test_func_position_and_last_require_a_predicate() {
        let setup = TestSetup::new();
        let e_ctx = setup.context(setup.nodes.para1);
        assert!(matches!(
            setup.call("position", vec![], &e_ctx),
            Err(EvaluationErrorKind::OutsidePredicate { .. })
        ));
        assert!(matches!(
            setup.call("last", vec![], &e_ctx),
            Err(EvaluationErrorKind::OutsidePredicate { .. })
        ));

        let focused = e_ctx.focus(setup.nodes.para2, 2, 3);
        assert_eq!(setup.call("position", vec![], &focused).unwrap(), num(2.0));
        assert_eq!(setup.call("last", vec![], &focused).unwrap(), num(3.0));
    }

    #[test]
    fn test_func_count_and_sum() {
        let setup = TestSetup::new();
        let n = &setup.nodes;
        assert_eq!(setup.eval("count", vec![XPathValue::NodeSet(vec![])]), num(0.0));
        assert_eq!(setup.eval("sum", vec![XPathValue::NodeSet(vec![])]), num(0.0));
        assert_eq!(
            setup.eval("count", vec![XPathValue::NodeSet(vec![n.para1, n.para2])]),
            num(2.0)
        );
        let e_ctx = setup.context(n.root);
        assert!(matches!(
            setup.call("count", vec![s("x")], &e_ctx),
            Err(EvaluationErrorKind::TypeError(_))
        ));
        assert!(matches!(
            setup.call("sum", vec![num(1.0)], &e_ctx),
            Err(EvaluationErrorKind::TypeError(_))
        ));
        // Non-numeric string-values make the sum NaN.
        let result = setup.eval("sum", vec![XPathValue::NodeSet(vec![n.para1])]);
        assert!(matches!(result, XPathValue::Number(v) if v.is_nan()));
    }

    #[test]
    fn test_func_names() {
        let setup = TestSetup::new();
        let n = &setup.nodes;
        assert_eq!(
            setup.eval("name", vec![XPathValue::NodeSet(vec![n.para1_lang])]),
            s("xml:lang")
        );
        assert_eq!(
            setup.eval("local-name", vec![XPathValue::NodeSet(vec![n.para1_lang])]),
            s("lang")
        );
        assert_eq!(
            setup.eval("namespace-uri", vec![XPathValue::NodeSet(vec![n.para1_lang])]),
            s(XML_NAMESPACE)
        );
        assert_eq!(setup.eval("name", vec![XPathValue::NodeSet(vec![])]), s(""));
        let e_ctx = setup.context(n.hello);
        assert_eq!(setup.call("name", vec![], &e_ctx).unwrap(), s(""));
        let e_ctx = setup.context(n.div);
        assert_eq!(setup.call("local-name", vec![], &e_ctx).unwrap(), s("div"));
    }

    #[test]
    fn test_func_id() {
        let setup = TestSetup::new();
        let n = &setup.nodes;
        assert_eq!(
            setup.eval("id", vec![s(" p1  missing ")]),
            XPathValue::NodeSet(vec![n.para1])
        );
        assert_eq!(setup.eval("id", vec![s("")]), XPathValue::NodeSet(vec![]));
        // Node-set arguments contribute every node's string-value.
        assert_eq!(
            setup.eval("id", vec![XPathValue::NodeSet(vec![n.para1_id])]),
            XPathValue::NodeSet(vec![n.para1])
        );
    }

    // --- Boolean Function Tests ---

    #[test]
    fn test_func_boolean_not_true_false() {
        let setup = TestSetup::new();
        assert_eq!(setup.eval("boolean", vec![s("")]), XPathValue::Boolean(false));
        assert_eq!(setup.eval("boolean", vec![num(2.0)]), XPathValue::Boolean(true));
        assert_eq!(setup.eval("not", vec![s("x")]), XPathValue::Boolean(false));
        assert_eq!(setup.eval("true", vec![]), XPathValue::Boolean(true));
        assert_eq!(setup.eval("false", vec![]), XPathValue::Boolean(false));
    }

    #[test]
    fn test_func_lang() {
        let setup = TestSetup::new();
        let n = &setup.nodes;
        let e_ctx = setup.context(n.hello);
        assert_eq!(setup.call("lang", vec![s("EN")], &e_ctx).unwrap(), XPathValue::Boolean(true));
        assert_eq!(setup.call("lang", vec![s("e")], &e_ctx).unwrap(), XPathValue::Boolean(false));
        let e_ctx = setup.context(n.para2);
        assert_eq!(setup.call("lang", vec![s("en")], &e_ctx).unwrap(), XPathValue::Boolean(false));
    }

    // --- Number Function Tests ---

    #[test]
    fn test_func_number() {
        let setup = TestSetup::new();
        assert_eq!(setup.eval("number", vec![s(" 12.5 ")]), num(12.5));
        assert_eq!(setup.eval("number", vec![XPathValue::Boolean(true)]), num(1.0));
        let e_ctx = setup.context(setup.nodes.para1_id);
        let result = setup.call("number", vec![], &e_ctx).unwrap();
        assert!(matches!(result, XPathValue::Number(v) if v.is_nan()));
    }

    #[test]
    fn test_func_floor_ceiling_round() {
        let setup = TestSetup::new();
        assert_eq!(setup.eval("floor", vec![num(2.7)]), num(2.0));
        assert_eq!(setup.eval("ceiling", vec![num(-2.7)]), num(-2.0));
        assert_eq!(setup.eval("round", vec![num(2.5)]), num(3.0));
        assert_eq!(setup.eval("round", vec![num(-3.5)]), num(-3.0));
        assert_eq!(setup.eval("round", vec![num(-2.6)]), num(-3.0));
        assert_eq!(setup.eval("round", vec![num(f64::INFINITY)]), num(f64::INFINITY));

        let negative_zero = setup.eval("round", vec![num(-0.4)]);
        assert!(matches!(negative_zero, XPathValue::Number(v) if v == 0.0 && v.is_sign_negative()));
        let nan = setup.eval("round", vec![num(f64::NAN)]);
        assert!(matches!(nan, XPathValue::Number(v) if v.is_nan()));
    }

    // --- Registry Tests ---

    #[test]
    fn test_registry_arity_checks() {
        let setup = TestSetup::new();
        let e_ctx = setup.context(setup.nodes.root);
        let err = setup.call("concat", vec![s("a")], &e_ctx).unwrap_err();
        assert_eq!(
            err,
            EvaluationErrorKind::Arity {
                function: "concat".to_string(),
                expected: "at least 2".to_string(),
                found: 1,
            }
        );
        let err = setup.call("substring", vec![s("a")], &e_ctx).unwrap_err();
        assert!(err.to_string().contains("2 to 3"));
        assert!(setup.call("true", vec![num(1.0)], &e_ctx).is_err());
    }

    #[test]
    fn test_registry_register_replaces_and_new_is_empty() {
        fn always_one(
            _args: Vec<XPathValue>,
            _e_ctx: &EvaluationContext<'_>,
        ) -> Result<XPathValue, EvaluationErrorKind> {
            Ok(XPathValue::Number(1.0))
        }

        assert!(FunctionRegistry::new().is_empty());
        let mut registry = FunctionRegistry::default();
        let builtin_count = registry.len();
        assert!(registry.contains("normalize-space"));
        registry.register(FunctionDef::new("count", 0, None, always_one));
        assert_eq!(registry.len(), builtin_count);
        assert_eq!(registry.get("count").map(|d| d.min_args), Some(0));
    }
}
