//! `%{...}` placeholder expansion
//!
//! Grammar: placeholder := `%{` identifier (`[` index `]`)? `}` where an
//! identifier may be dotted (`env.CC`) and the index addresses an element of
//! a list-valued variable. Indexing is zero-based, so `%{sources[1]}` is the
//! second source. Resolution is recursive: a resolved value containing
//! placeholders is expanded again, bounded by a fixed depth so cycles fail
//! instead of looping.

use crate::error::{BrauError, Result};
use crate::scope::{ScopeChain, Value};

/// Recursion bound for nested expansion; anything deeper is a cycle
const MAX_DEPTH: usize = 32;

/// Expand every placeholder in `template` against the scope chain
///
/// Pure: the same template and scope snapshot always produce the same
/// output. Fails rather than returning a partially-expanded string.
pub fn expand(template: &str, scope: &ScopeChain) -> Result<String> {
    expand_at_depth(template, scope, 0)
}

fn expand_at_depth(template: &str, scope: &ScopeChain, depth: usize) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("%{") {
        out.push_str(&rest[..start]);
        let body = &rest[start + 2..];
        let end = body
            .find('}')
            .ok_or_else(|| BrauError::MalformedTemplate(template.to_string()))?;

        let (name, index) = parse_placeholder(&body[..end], template)?;
        let raw = resolve(name, index, scope)?;

        if depth >= MAX_DEPTH {
            return Err(BrauError::TemplateCycle(name.to_string()));
        }
        out.push_str(&expand_at_depth(&raw, scope, depth + 1)?);

        rest = &body[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Split a placeholder body into its identifier and optional `[n]` index
fn parse_placeholder<'a>(body: &'a str, template: &str) -> Result<(&'a str, Option<usize>)> {
    let malformed = || BrauError::MalformedTemplate(template.to_string());

    let (name, index) = match body.find('[') {
        Some(bracket) => {
            let rest = &body[bracket + 1..];
            let close = rest.find(']').ok_or_else(malformed)?;
            if !rest[close + 1..].is_empty() {
                return Err(malformed());
            }
            let index: usize = rest[..close].parse().map_err(|_| malformed())?;
            (&body[..bracket], Some(index))
        }
        None => (body, None),
    };

    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(malformed());
    }

    Ok((name, index))
}

/// Look up a name in the chain and render it as a string
///
/// Lists render space-joined when unindexed (so `%{configure_flags}` works
/// inline in a command), or as the addressed element when indexed. A
/// scope-valued name with no trailing field cannot render as a string and
/// counts as unresolved.
fn resolve(name: &str, index: Option<usize>, scope: &ScopeChain) -> Result<String> {
    let value = scope
        .lookup(name)
        .ok_or_else(|| BrauError::UnresolvedVariable(name.to_string()))?;

    match (value, index) {
        (Value::Str(s), None) => Ok(s.clone()),
        (Value::List(list), None) => Ok(list.join(" ")),
        (Value::List(list), Some(i)) => {
            list.get(i).cloned().ok_or_else(|| BrauError::IndexOutOfRange {
                name: name.to_string(),
                index: i,
                len: list.len(),
            })
        }
        (Value::Str(_), Some(i)) => Err(BrauError::IndexOutOfRange {
            name: name.to_string(),
            index: i,
            len: 0,
        }),
        (Value::Scope(_), _) => Err(BrauError::UnresolvedVariable(name.to_string())),
    }
}
