//! Variable scopes backing `%{...}` template resolution
//!
//! A scope maps names to values, where a value is a string, an ordered list
//! of strings, or a nested scope (addressed with dotted names like
//! `env.CC`). Scopes are searched as a chain: the package scope first, then
//! the enclosing profile scope.

use std::collections::HashMap;

/// A value bound to a name in a [`VariableScope`]
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    List(Vec<String>),
    Scope(VariableScope),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(list: Vec<String>) -> Self {
        Value::List(list)
    }
}

impl From<VariableScope> for Value {
    fn from(scope: VariableScope) -> Self {
        Value::Scope(scope)
    }
}

/// A flat mapping of names to values
#[derive(Debug, Clone, Default)]
pub struct VariableScope {
    vars: HashMap<String, Value>,
}

impl VariableScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Resolve a possibly-dotted name (`env.CC`) inside this scope
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let mut segments = name.split('.');
        let mut current = self.vars.get(segments.next()?)?;

        for segment in segments {
            match current {
                Value::Scope(inner) => current = inner.get(segment)?,
                _ => return None,
            }
        }

        Some(current)
    }
}

/// An ordered lookup chain over borrowed scopes
///
/// The first scope that binds a name wins; later scopes are fallbacks.
#[derive(Debug, Clone, Default)]
pub struct ScopeChain<'a> {
    scopes: Vec<&'a VariableScope>,
}

impl<'a> ScopeChain<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scope as the next fallback in the chain
    pub fn push(mut self, scope: &'a VariableScope) -> Self {
        self.scopes.push(scope);
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&'a Value> {
        self.scopes.iter().find_map(|scope| scope.lookup(name))
    }
}
