//! Binary operator semantics: comparisons, arithmetic and node-set union.

use crate::ast::BinaryOperator;
use crate::datasource::{DataSource, sort_document_order};
use crate::engine::XPathValue;
use crate::error::EvaluationErrorKind;

/// Applies `op` to two already-evaluated operands.
///
/// `and`/`or` are accepted for completeness; compiled expressions short-circuit
/// them before reaching this function.
pub fn evaluate(
    op: BinaryOperator,
    left: XPathValue,
    right: XPathValue,
    source: &dyn DataSource,
) -> Result<XPathValue, EvaluationErrorKind> {
    let result = match op {
        BinaryOperator::Or => XPathValue::Boolean(left.to_bool() || right.to_bool()),
        BinaryOperator::And => XPathValue::Boolean(left.to_bool() && right.to_bool()),
        BinaryOperator::Equals
        | BinaryOperator::NotEquals
        | BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => {
            XPathValue::Boolean(compare(op, &left, &right, source))
        }
        BinaryOperator::Plus
        | BinaryOperator::Minus
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => {
            let l = left.to_number(source);
            let r = right.to_number(source);
            XPathValue::Number(arithmetic(op, l, r))
        }
        BinaryOperator::Union => match (left, right) {
            (XPathValue::NodeSet(mut l), XPathValue::NodeSet(r)) => {
                l.extend(r);
                sort_document_order(source, &mut l);
                XPathValue::NodeSet(l)
            }
            (l, r) => {
                return Err(EvaluationErrorKind::type_error(format!(
                    "'|' requires node-set operands, got {} and {}",
                    l.type_name(),
                    r.type_name()
                )));
            }
        },
    };
    Ok(result)
}

fn arithmetic(op: BinaryOperator, l: f64, r: f64) -> f64 {
    match op {
        BinaryOperator::Plus => l + r,
        BinaryOperator::Minus => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => l / r,
        // Truncating remainder, sign follows the dividend.
        BinaryOperator::Modulo => l % r,
        _ => f64::NAN,
    }
}

/// XPath 1.0 §3.4 comparison, including the existential node-set rules.
pub fn compare(
    op: BinaryOperator,
    left: &XPathValue,
    right: &XPathValue,
    source: &dyn DataSource,
) -> bool {
    match (left, right) {
        (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
            let right_values: Vec<XPathValue> = r
                .iter()
                .map(|n| XPathValue::String(source.string_value(*n)))
                .collect();
            l.iter().any(|n| {
                let lv = XPathValue::String(source.string_value(*n));
                right_values
                    .iter()
                    .any(|rv| compare_atomic(op, &lv, rv, source))
            })
        }
        (XPathValue::NodeSet(_), XPathValue::Boolean(_))
        | (XPathValue::Boolean(_), XPathValue::NodeSet(_)) => compare_atomic(
            op,
            &XPathValue::Boolean(left.to_bool()),
            &XPathValue::Boolean(right.to_bool()),
            source,
        ),
        (XPathValue::NodeSet(l), other) => l.iter().any(|n| {
            compare_atomic(op, &XPathValue::String(source.string_value(*n)), other, source)
        }),
        (other, XPathValue::NodeSet(r)) => r.iter().any(|n| {
            compare_atomic(op, other, &XPathValue::String(source.string_value(*n)), source)
        }),
        _ => compare_atomic(op, left, right, source),
    }
}

fn compare_atomic(
    op: BinaryOperator,
    left: &XPathValue,
    right: &XPathValue,
    source: &dyn DataSource,
) -> bool {
    match op {
        BinaryOperator::Equals | BinaryOperator::NotEquals => {
            let negate = op == BinaryOperator::NotEquals;
            match (left, right) {
                (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => {
                    (left.to_bool() == right.to_bool()) != negate
                }
                (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => {
                    let (l, r) = (left.to_number(source), right.to_number(source));
                    // NaN compares unequal to everything, itself included.
                    if negate { l != r } else { l == r }
                }
                _ => (left.to_string_value(source) == right.to_string_value(source)) != negate,
            }
        }
        _ => {
            let l = left.to_number(source);
            let r = right.to_number(source);
            match op {
                BinaryOperator::LessThan => l < r,
                BinaryOperator::LessThanOrEqual => l <= r,
                BinaryOperator::GreaterThan => l > r,
                BinaryOperator::GreaterThanOrEqual => l >= r,
                _ => false,
            }
        }
    }
}
