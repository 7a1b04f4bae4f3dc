//! Engine-wide settings.

/// Options controlling how an [`crate::XPathEngine`] parses and evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Keep parsed and compiled expressions keyed by query string.
    /// When off, every call re-parses and re-compiles.
    pub cache_expressions: bool,
    /// An unbound `$variable` is an error. When off it evaluates to `""`.
    pub strict_variables: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_expressions: true,
            strict_variables: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_expressions(mut self, enabled: bool) -> Self {
        self.cache_expressions = enabled;
        self
    }

    pub fn with_strict_variables(mut self, strict: bool) -> Self {
        self.strict_variables = strict;
        self
    }
}
