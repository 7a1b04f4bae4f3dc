use thiserror::Error;

/// Errors surfaced to callers of the engine. Both variants carry the query text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum XPathError {
    #[error("XPath syntax error in '{expression}' at offset {offset}: {message}{}", display_hint(.hint))]
    Syntax {
        expression: String,
        offset: usize,
        message: String,
        hint: Option<String>,
    },

    #[error("XPath evaluation error in '{expression}': {kind}")]
    Evaluation {
        expression: String,
        kind: EvaluationErrorKind,
    },
}

/// What went wrong while compiling or running a structurally valid expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationErrorKind {
    #[error("Function '{function}' error: {message}")]
    FunctionError { function: String, message: String },

    #[error("Function '{function}()' expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("{function}() can only be used in a predicate")]
    OutsidePredicate { function: String },

    #[error("Unknown XPath function '{0}'")]
    UnknownFunction(String),

    #[error("Unknown axis '{0}'")]
    UnknownAxis(String),

    #[error("Variable '${0}' not found")]
    UnknownVariable(String),

    #[error("Undeclared namespace prefix '{0}'")]
    UndeclaredPrefix(String),

    #[error("Type error: {0}")]
    TypeError(String),
}

fn display_hint(hint: &Option<String>) -> String {
    hint.as_ref()
        .map(|h| format!(" (hint: {h})"))
        .unwrap_or_default()
}

impl XPathError {
    pub fn syntax(
        expression: impl Into<String>,
        offset: usize,
        message: impl Into<String>,
        hint: Option<&str>,
    ) -> Self {
        Self::Syntax {
            expression: expression.into(),
            offset,
            message: message.into(),
            hint: hint.map(str::to_string),
        }
    }

    pub fn evaluation(expression: impl Into<String>, kind: EvaluationErrorKind) -> Self {
        Self::Evaluation {
            expression: expression.into(),
            kind,
        }
    }

    /// The query text that produced this error.
    pub fn expression(&self) -> &str {
        match self {
            XPathError::Syntax { expression, .. } | XPathError::Evaluation { expression, .. } => {
                expression
            }
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, XPathError::Syntax { .. })
    }

    pub fn is_evaluation(&self) -> bool {
        matches!(self, XPathError::Evaluation { .. })
    }
}

impl EvaluationErrorKind {
    pub fn function(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FunctionError {
            function: function.into(),
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display_includes_hint() {
        let err = XPathError::syntax("foo[1", 5, "expected ']'", Some("unbalanced brackets"));
        assert_eq!(
            err.to_string(),
            "XPath syntax error in 'foo[1' at offset 5: expected ']' (hint: unbalanced brackets)"
        );
        assert_eq!(err.expression(), "foo[1");
        assert!(err.is_syntax());
    }

    #[test]
    fn test_evaluation_error_display_names_function() {
        let err = XPathError::evaluation(
            "position()",
            EvaluationErrorKind::OutsidePredicate {
                function: "position".to_string(),
            },
        );
        assert!(err.to_string().contains("position() can only be used in a predicate"));
        assert!(err.is_evaluation());
    }
}
