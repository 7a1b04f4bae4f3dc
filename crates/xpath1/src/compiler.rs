//! Turns a parsed [`Expression`] into a tree of closures.
//!
//! Everything that does not depend on the document is settled here: function
//! lookup and arity, axis collectors, node tests and constant positional
//! predicates. Namespace bindings arrive with each evaluation, so every prefix
//! the expression mentions is checked against them before anything runs.

use crate::ast::{
    Axis, BinaryOperator, Expression, LocationPath, NodeTest, NodeTypeTest, Step, UnaryOperator,
};
use crate::axes::{self, AxisCollector};
use crate::datasource::{DataSource, NodeId, NodeType, sort_document_order};
use crate::engine::{EvaluationContext, XPathValue};
use crate::error::{EvaluationErrorKind, XPathError};
use crate::functions::FunctionRegistry;
use crate::operators;
use std::collections::BTreeSet;
use std::fmt;

type EvalFn = Box<
    dyn Fn(&EvaluationContext<'_>) -> Result<XPathValue, EvaluationErrorKind> + Send + Sync,
>;

type StepFn = Box<
    dyn Fn(&EvaluationContext<'_>, &[NodeId]) -> Result<Vec<NodeId>, EvaluationErrorKind>
        + Send
        + Sync,
>;

fn boxed<F>(f: F) -> EvalFn
where
    F: Fn(&EvaluationContext<'_>) -> Result<XPathValue, EvaluationErrorKind>
        + Send
        + Sync
        + 'static,
{
    Box::new(f)
}

fn boxed_step<F>(f: F) -> StepFn
where
    F: Fn(&EvaluationContext<'_>, &[NodeId]) -> Result<Vec<NodeId>, EvaluationErrorKind>
        + Send
        + Sync
        + 'static,
{
    Box::new(f)
}

/// A ready-to-run expression. It holds no document state, so one instance can
/// be evaluated against any number of documents, from any number of threads.
pub struct CompiledExpression {
    source: String,
    prefixes: Vec<String>,
    eval: EvalFn,
}

impl CompiledExpression {
    /// The query text this expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Namespace prefixes used by name tests anywhere in the expression.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Fails with `UndeclaredPrefix` if any prefix lacks a binding, even one
    /// whose step would never be reached.
    pub fn evaluate(&self, e_ctx: &EvaluationContext<'_>) -> Result<XPathValue, XPathError> {
        let result = self
            .prefixes
            .iter()
            .try_for_each(|prefix| e_ctx.resolve_prefix(prefix).map(|_| ()))
            .and_then(|()| (self.eval)(e_ctx));
        result.map_err(|kind| XPathError::evaluation(&self.source, kind))
    }
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source", &self.source)
            .field("prefixes", &self.prefixes)
            .finish_non_exhaustive()
    }
}

/// Compiles `expr`, the parse of `source`, against the given function library.
pub fn compile(
    source: &str,
    expr: &Expression,
    functions: &FunctionRegistry,
) -> Result<CompiledExpression, XPathError> {
    let eval =
        compile_expr(expr, functions).map_err(|kind| XPathError::evaluation(source, kind))?;
    let mut prefixes = BTreeSet::new();
    collect_prefixes(expr, &mut prefixes);
    Ok(CompiledExpression {
        source: source.to_string(),
        prefixes: prefixes.into_iter().collect(),
        eval,
    })
}

fn collect_prefixes(expr: &Expression, prefixes: &mut BTreeSet<String>) {
    match expr {
        Expression::Literal(_) | Expression::Number(_) | Expression::Variable(_) => {}
        Expression::FunctionCall { args, .. } => {
            for arg in args {
                collect_prefixes(arg, prefixes);
            }
        }
        Expression::Filter {
            primary,
            predicates,
        } => {
            collect_prefixes(primary, prefixes);
            for predicate in predicates {
                collect_prefixes(predicate, prefixes);
            }
        }
        Expression::BinaryOp { left, right, .. } => {
            collect_prefixes(left, prefixes);
            collect_prefixes(right, prefixes);
        }
        Expression::UnaryOp { expr, .. } => collect_prefixes(expr, prefixes),
        Expression::LocationPath(path) => {
            if let Some(start) = &path.start_point {
                collect_prefixes(start, prefixes);
            }
            for step in &path.steps {
                if let NodeTest::Name {
                    prefix: Some(prefix),
                    ..
                }
                | NodeTest::Wildcard {
                    prefix: Some(prefix),
                } = &step.node_test
                {
                    prefixes.insert(prefix.clone());
                }
                for predicate in &step.predicates {
                    collect_prefixes(predicate, prefixes);
                }
            }
        }
    }
}

fn compile_expr(
    expr: &Expression,
    functions: &FunctionRegistry,
) -> Result<EvalFn, EvaluationErrorKind> {
    match expr {
        Expression::Literal(s) => {
            let s = s.clone();
            Ok(boxed(move |_| Ok(XPathValue::String(s.clone()))))
        }
        Expression::Number(n) => {
            let n = *n;
            Ok(boxed(move |_| Ok(XPathValue::Number(n))))
        }
        Expression::Variable(name) => {
            let name = name.clone();
            Ok(boxed(move |e_ctx| match e_ctx.variables.get(&name) {
                Some(value) => Ok(value.clone()),
                None if e_ctx.strict => Err(EvaluationErrorKind::UnknownVariable(name.clone())),
                None => Ok(XPathValue::String(String::new())),
            }))
        }
        Expression::FunctionCall { name, args } => {
            let def = functions
                .get(name)
                .ok_or_else(|| EvaluationErrorKind::UnknownFunction(name.clone()))?;
            def.check_arity(args.len())?;
            let func = def.func;
            let args = args
                .iter()
                .map(|arg| compile_expr(arg, functions))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(boxed(move |e_ctx| {
                let values = args
                    .iter()
                    .map(|arg| arg(e_ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                func(values, e_ctx)
            }))
        }
        Expression::Filter {
            primary,
            predicates,
        } => {
            let primary = compile_expr(primary, functions)?;
            let predicates = compile_predicates(predicates, functions)?;
            Ok(boxed(move |e_ctx| {
                let value = primary(e_ctx)?;
                let type_name = value.type_name();
                let nodes = value.into_node_set().ok_or_else(|| {
                    EvaluationErrorKind::type_error(format!(
                        "predicates can only filter a node-set, got {}",
                        type_name
                    ))
                })?;
                Ok(XPathValue::NodeSet(apply_predicates(
                    &predicates,
                    e_ctx,
                    nodes,
                )?))
            }))
        }
        Expression::BinaryOp { left, op, right } => {
            let op = *op;
            let left = compile_expr(left, functions)?;
            let right = compile_expr(right, functions)?;
            Ok(match op {
                BinaryOperator::And => boxed(move |e_ctx| {
                    Ok(XPathValue::Boolean(
                        left(e_ctx)?.to_bool() && right(e_ctx)?.to_bool(),
                    ))
                }),
                BinaryOperator::Or => boxed(move |e_ctx| {
                    Ok(XPathValue::Boolean(
                        left(e_ctx)?.to_bool() || right(e_ctx)?.to_bool(),
                    ))
                }),
                _ => boxed(move |e_ctx| {
                    let l = left(e_ctx)?;
                    let r = right(e_ctx)?;
                    operators::evaluate(op, l, r, e_ctx.source)
                }),
            })
        }
        Expression::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => {
            let inner = compile_expr(expr, functions)?;
            Ok(boxed(move |e_ctx| {
                Ok(XPathValue::Number(-inner(e_ctx)?.to_number(e_ctx.source)))
            }))
        }
        Expression::LocationPath(path) => compile_location_path(path, functions),
    }
}

enum PathStart {
    Context,
    Root,
    Expr(EvalFn),
}

fn compile_location_path(
    path: &LocationPath,
    functions: &FunctionRegistry,
) -> Result<EvalFn, EvaluationErrorKind> {
    let start = match &path.start_point {
        Some(expr) => PathStart::Expr(compile_expr(expr, functions)?),
        None if path.is_absolute => PathStart::Root,
        None => PathStart::Context,
    };
    let steps = path
        .steps
        .iter()
        .map(|step| compile_step(step, functions))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(boxed(move |e_ctx| {
        let mut nodes = match &start {
            PathStart::Context => vec![e_ctx.context_node],
            PathStart::Root => vec![e_ctx.source.root_of(e_ctx.context_node)],
            PathStart::Expr(f) => {
                let value = f(e_ctx)?;
                let type_name = value.type_name();
                value.into_node_set().ok_or_else(|| {
                    EvaluationErrorKind::type_error(format!(
                        "a path can only continue from a node-set, got {}",
                        type_name
                    ))
                })?
            }
        };
        for step in &steps {
            if nodes.is_empty() {
                break;
            }
            nodes = step(e_ctx, &nodes)?;
        }
        Ok(XPathValue::NodeSet(nodes))
    }))
}

fn compile_step(step: &Step, functions: &FunctionRegistry) -> Result<StepFn, EvaluationErrorKind> {
    let axis = step.axis;
    let collect: AxisCollector = axes::collector(axis);
    let reverse = axis.is_reverse();
    let test = CompiledNodeTest::new(&step.node_test, step.axis);
    let predicates = compile_predicates(&step.predicates, functions)?;

    Ok(boxed_step(move |e_ctx, input| {
        let source = e_ctx.source;
        let uri = test.resolve(e_ctx)?;
        let mut output = Vec::new();
        let mut candidates = Vec::new();
        for &node in input {
            candidates.clear();
            collect(source, node, &mut candidates);
            let matched: Vec<NodeId> = candidates
                .iter()
                .copied()
                .filter(|&c| test.matches(source, c, uri))
                .collect();
            // Positions count along the axis, per context node.
            output.extend(apply_predicates(&predicates, e_ctx, matched)?);
        }
        if input.len() > 1 {
            sort_document_order(source, &mut output);
        } else if reverse {
            output.reverse();
        }
        log::trace!(
            "{:?} step selected {} node(s) from {} context node(s)",
            axis,
            output.len(),
            input.len()
        );
        Ok(output)
    }))
}

enum CompiledNodeTest {
    Name {
        prefix: Option<String>,
        local_name: String,
        principal: NodeType,
    },
    Wildcard {
        prefix: Option<String>,
        principal: NodeType,
    },
    Kind(NodeTypeTest),
}

impl CompiledNodeTest {
    fn new(test: &NodeTest, axis: Axis) -> Self {
        let principal = match axis {
            Axis::Attribute => NodeType::Attribute,
            Axis::Namespace => NodeType::Namespace,
            _ => NodeType::Element,
        };
        match test {
            NodeTest::Name { prefix, local_name } => CompiledNodeTest::Name {
                prefix: prefix.clone(),
                local_name: local_name.clone(),
                principal,
            },
            NodeTest::Wildcard { prefix } => CompiledNodeTest::Wildcard {
                prefix: prefix.clone(),
                principal,
            },
            NodeTest::NodeType(kind) => CompiledNodeTest::Kind(kind.clone()),
        }
    }

    /// Looks up the namespace URI for a prefixed test.
    fn resolve<'d>(
        &self,
        e_ctx: &EvaluationContext<'d>,
    ) -> Result<Option<&'d str>, EvaluationErrorKind> {
        match self {
            CompiledNodeTest::Name {
                prefix: Some(prefix),
                ..
            }
            | CompiledNodeTest::Wildcard {
                prefix: Some(prefix),
                ..
            } => e_ctx.resolve_prefix(prefix).map(Some),
            _ => Ok(None),
        }
    }

    fn matches(&self, source: &dyn DataSource, node: NodeId, uri: Option<&str>) -> bool {
        match self {
            CompiledNodeTest::Name {
                local_name,
                principal,
                ..
            } => {
                source.node_type(node) == *principal
                    && source
                        .name(node)
                        .is_some_and(|q| q.local_part == local_name)
                    && same_namespace(source.namespace_uri(node), uri)
            }
            CompiledNodeTest::Wildcard { prefix, principal } => {
                source.node_type(node) == *principal
                    && (prefix.is_none() || same_namespace(source.namespace_uri(node), uri))
            }
            CompiledNodeTest::Kind(kind) => {
                let node_type = source.node_type(node);
                match kind {
                    NodeTypeTest::Node => true,
                    NodeTypeTest::Text => node_type == NodeType::Text,
                    NodeTypeTest::Comment => node_type == NodeType::Comment,
                    NodeTypeTest::ProcessingInstruction(target) => {
                        node_type == NodeType::ProcessingInstruction
                            && target.as_deref().is_none_or(|t| {
                                source.name(node).is_some_and(|q| q.local_part == t)
                            })
                    }
                }
            }
        }
    }
}

// An empty URI and no URI are the same null namespace.
fn same_namespace(actual: Option<&str>, expected: Option<&str>) -> bool {
    actual.filter(|u| !u.is_empty()) == expected.filter(|u| !u.is_empty())
}

enum CompiledPredicate {
    /// A numeric literal like `[2]`: a direct pick, no per-node evaluation.
    Position(f64),
    Expr(EvalFn),
}

fn compile_predicates(
    predicates: &[Expression],
    functions: &FunctionRegistry,
) -> Result<Vec<CompiledPredicate>, EvaluationErrorKind> {
    predicates
        .iter()
        .map(|p| match p {
            Expression::Number(n) => Ok(CompiledPredicate::Position(*n)),
            other => compile_expr(other, functions).map(CompiledPredicate::Expr),
        })
        .collect()
}

/// Filters `nodes` through each predicate in turn. Each predicate sees the
/// survivors of the previous one, renumbered from 1.
fn apply_predicates(
    predicates: &[CompiledPredicate],
    e_ctx: &EvaluationContext<'_>,
    mut nodes: Vec<NodeId>,
) -> Result<Vec<NodeId>, EvaluationErrorKind> {
    for predicate in predicates {
        let size = nodes.len();
        nodes = match predicate {
            CompiledPredicate::Position(n) => {
                let position = *n;
                if position.fract() == 0.0 && position >= 1.0 && position <= size as f64 {
                    vec![nodes[position as usize - 1]]
                } else {
                    Vec::new()
                }
            }
            CompiledPredicate::Expr(f) => {
                let mut kept = Vec::with_capacity(size);
                for (i, &node) in nodes.iter().enumerate() {
                    let position = i + 1;
                    let focused = e_ctx.focus(node, position, size);
                    let keep = match f(&focused)? {
                        XPathValue::Number(n) => n == position as f64,
                        other => other.to_bool(),
                    };
                    if keep {
                        kept.push(node);
                    }
                }
                kept
            }
        };
    }
    Ok(nodes)
}
