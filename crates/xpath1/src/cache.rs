//! Process-lifetime caches for parsed and compiled expressions.

use crate::ast::Expression;
use crate::compiler::CompiledExpression;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Two read-mostly maps keyed by the exact query string (whitespace included).
///
/// Reads take a shared lock; a miss takes the write lock only for the insert.
/// Entries never expire; [`ExpressionCache::clear`] is the only invalidation.
/// A poisoned lock behaves like an empty cache.
#[derive(Debug)]
pub struct ExpressionCache {
    parsed: RwLock<HashMap<String, Arc<Expression>>>,
    compiled: RwLock<HashMap<String, Arc<CompiledExpression>>>,
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self {
            parsed: RwLock::new(HashMap::new()),
            compiled: RwLock::new(HashMap::new()),
        }
    }
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_parsed(&self, query: &str) -> Option<Arc<Expression>> {
        self.parsed.read().ok()?.get(query).cloned()
    }

    /// Stores `expr` unless another caller won the race, returning the cached entry.
    pub fn insert_parsed(&self, query: &str, expr: Arc<Expression>) -> Arc<Expression> {
        match self.parsed.write() {
            Ok(mut c) => c.entry(query.to_string()).or_insert(expr).clone(),
            Err(_) => expr,
        }
    }

    pub fn get_compiled(&self, query: &str) -> Option<Arc<CompiledExpression>> {
        self.compiled.read().ok()?.get(query).cloned()
    }

    pub fn insert_compiled(
        &self,
        query: &str,
        compiled: Arc<CompiledExpression>,
    ) -> Arc<CompiledExpression> {
        match self.compiled.write() {
            Ok(mut c) => c.entry(query.to_string()).or_insert(compiled).clone(),
            Err(_) => compiled,
        }
    }

    pub fn parsed_len(&self) -> usize {
        self.parsed.read().map_or(0, |c| c.len())
    }

    pub fn compiled_len(&self) -> usize {
        self.compiled.read().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.parsed_len() == 0 && self.compiled_len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut c) = self.parsed.write() {
            c.clear();
        }
        if let Ok(mut c) = self.compiled.write() {
            c.clear();
        }
    }
}
