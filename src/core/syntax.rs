//! Bracketed call-syntax splitting
//!
//! Construction requests arrive either as pre-built child nodes or as raw
//! text like `max(a, b)`, `g[i]`, or a plain token. This module does the
//! bracket work only: find the call head, check bracket nesting, and split
//! the argument list at depth-zero commas. It never interprets operators
//! or literals; that belongs to leaf resolution.

use crate::error::BuildError;

/// A raw call split into its head and argument texts
#[derive(Debug, Clone, PartialEq)]
pub struct CallParts {
    pub name: String,
    pub args: Vec<String>,
    /// `name[...]` (array/interval indexing) rather than `name(...)`
    pub indexed: bool,
}

/// An equation header: `f`, `f(x, y)`, or the array form `g[i]`
#[derive(Debug, Clone, PartialEq)]
pub struct EquationHeader {
    pub name: String,
    pub args: Vec<String>,
    pub array: bool,
}

/// True for tokens usable as equation, argument, or unit-free leaf names.
/// Alphabetic covers the Greek letters calculator documents lean on.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Split `name(args...)` / `name[args...]` into parts. Returns `Ok(None)`
/// for a bracket-free token, which the caller treats as a leaf.
pub fn split_call(text: &str) -> Result<Option<CallParts>, BuildError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(BuildError::EmptyTerm);
    }

    let open_at = match text.find(['(', '[']) {
        Some(at) => at,
        None => {
            if text.contains([')', ']']) {
                return Err(BuildError::UnbalancedBrackets(text.to_string()));
            }
            return Ok(None);
        }
    };

    let name = text[..open_at].trim();
    if name.is_empty() || !is_identifier(name) {
        return Err(BuildError::InvalidIdentifier(text.to_string()));
    }

    let indexed = text[open_at..].starts_with('[');
    let close = if indexed { ']' } else { ')' };
    if !text.ends_with(close) {
        return Err(BuildError::UnbalancedBrackets(text.to_string()));
    }

    let inner = &text[open_at + 1..text.len() - 1];
    let args = split_arguments(inner, text)?;
    Ok(Some(CallParts {
        name: name.to_string(),
        args,
        indexed,
    }))
}

/// Split an argument list at depth-zero commas, verifying bracket nesting
/// along the way. An entirely empty list is legal (`f()`); an empty piece
/// between commas is not.
pub fn split_arguments(inner: &str, whole: &str) -> Result<Vec<String>, BuildError> {
    let mut args = Vec::new();
    let mut stack: Vec<char> = Vec::new();
    let mut piece = String::new();
    let mut saw_comma = false;

    for c in inner.chars() {
        match c {
            '(' => {
                stack.push(')');
                piece.push(c);
            }
            '[' => {
                stack.push(']');
                piece.push(c);
            }
            ')' | ']' => {
                match stack.pop() {
                    Some(expected) if expected == c => {}
                    Some(_) => return Err(BuildError::MisorderedBrackets(whole.to_string())),
                    None => return Err(BuildError::UnbalancedBrackets(whole.to_string())),
                }
                piece.push(c);
            }
            ',' if stack.is_empty() => {
                saw_comma = true;
                push_piece(&mut args, &mut piece, whole)?;
            }
            _ => piece.push(c),
        }
    }

    if !stack.is_empty() {
        return Err(BuildError::UnbalancedBrackets(whole.to_string()));
    }
    if saw_comma || !piece.trim().is_empty() {
        push_piece(&mut args, &mut piece, whole)?;
    }
    Ok(args)
}

fn push_piece(args: &mut Vec<String>, piece: &mut String, whole: &str) -> Result<(), BuildError> {
    let text = piece.trim();
    if text.is_empty() {
        return Err(BuildError::EmptyArgument(whole.to_string()));
    }
    args.push(text.to_string());
    piece.clear();
    Ok(())
}

/// Parse an equation header. `f` declares a constant, `f(x, y)` a function,
/// and `g[i]` an array over interval `i`.
pub fn parse_header(text: &str) -> Result<EquationHeader, BuildError> {
    match split_call(text)? {
        None => {
            let name = text.trim();
            if !is_identifier(name) {
                return Err(BuildError::InvalidIdentifier(name.to_string()));
            }
            Ok(EquationHeader {
                name: name.to_string(),
                args: Vec::new(),
                array: false,
            })
        }
        Some(parts) => {
            if parts.indexed && parts.args.is_empty() {
                return Err(BuildError::EmptyArgument(text.to_string()));
            }
            for arg in &parts.args {
                if !is_identifier(arg) {
                    return Err(BuildError::InvalidIdentifier(arg.clone()));
                }
            }
            Ok(EquationHeader {
                name: parts.name,
                args: parts.args,
                array: parts.indexed,
            })
        }
    }
}
