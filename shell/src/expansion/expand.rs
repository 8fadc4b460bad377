// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Variable expansion of a single fragment (one raw token). This is one left to right
//! pass, tracked by [`ExpandMode`]:
//!
//! | Input           | Result                                             |
//! |:----------------|:---------------------------------------------------|
//! | `\c`            | `c`, copied literally                              |
//! | `$NAME`         | value of `NAME`, name is `[A-Za-z_][A-Za-z0-9_]*`  |
//! | `${NAME}`       | value of `NAME`                                    |
//! | `$?`, `${?}`    | decimal exit status of the last foreground command |
//! | `"..."`         | outer double quotes are stripped                   |
//!
//! Unset variables expand to the empty string. A `$` that doesn't start a reference is
//! kept as is. The result is never expanded again.

use crate::{Environment, is_name_char};

const LAST_STATUS_NAME: &str = "?";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum ExpandError {
    #[error("missing '}}' after '${{{partial_name}'")]
    #[diagnostic(
        code(r3bl_shell::expansion::no_close_brace),
        help("The reference was dropped, the rest of the fragment is ignored")
    )]
    NoCloseBrace { partial_name: String },
}

/// The expanded text, plus the error that truncated it (if any). Expansion never fails
/// outright; a malformed `${` is recovered from by dropping the rest of the fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Expansion {
    pub value: String,
    pub error: Option<ExpandError>,
}

/// Where the variable values come from.
pub trait VariableLookup {
    fn lookup(&self, name: &str) -> Option<&str>;
    /// Exit status of the last foreground command, for `$?`.
    fn last_status(&self) -> i32;
}

/// An [`Environment`] plus the last exit status.
#[derive(Clone, Copy, Debug)]
pub struct ExpandContext<'a> {
    pub env: &'a Environment,
    pub last_status: i32,
}

impl VariableLookup for ExpandContext<'_> {
    fn lookup(&self, name: &str) -> Option<&str> { self.env.get(name) }

    fn last_status(&self) -> i32 { self.last_status }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExpandMode {
    Literal,
    /// Previous char was `\`.
    Protected,
    /// Previous char was an unprotected `$`.
    Dollar,
    /// Inside `$NAME`, the name started at this byte offset.
    Name(usize),
    /// Inside `${NAME}`, the name started at this byte offset.
    BracedName(usize),
}

#[must_use]
pub fn expand_fragment(fragment: &str, vars: &impl VariableLookup) -> Expansion {
    let body = strip_outer_quotes(fragment);
    let mut value = String::with_capacity(body.len());
    let mut mode = ExpandMode::Literal;

    let mut chars = body.char_indices().peekable();
    while let Some(&(offset, ch)) = chars.peek() {
        let mut consumed = true;
        mode = match mode {
            ExpandMode::Literal => match ch {
                '\\' => ExpandMode::Protected,
                '$' => ExpandMode::Dollar,
                _ => {
                    value.push(ch);
                    ExpandMode::Literal
                }
            },
            ExpandMode::Protected => {
                value.push(ch);
                ExpandMode::Literal
            }
            ExpandMode::Dollar => match ch {
                '{' => ExpandMode::BracedName(offset + ch.len_utf8()),
                '?' => {
                    push_lookup(&mut value, LAST_STATUS_NAME, vars);
                    ExpandMode::Literal
                }
                _ if ch.is_ascii_alphabetic() || ch == '_' => ExpandMode::Name(offset),
                _ => {
                    // Not a reference, so the `$` is plain text.
                    value.push('$');
                    consumed = false;
                    ExpandMode::Literal
                }
            },
            ExpandMode::Name(start) => {
                if is_name_char(ch) {
                    ExpandMode::Name(start)
                } else {
                    push_lookup(&mut value, &body[start..offset], vars);
                    consumed = false;
                    ExpandMode::Literal
                }
            }
            ExpandMode::BracedName(start) => {
                if ch == '}' {
                    push_lookup(&mut value, &body[start..offset], vars);
                    ExpandMode::Literal
                } else {
                    ExpandMode::BracedName(start)
                }
            }
        };
        if consumed {
            chars.next();
        }
    }

    let error = match mode {
        ExpandMode::Dollar => {
            value.push('$');
            None
        }
        ExpandMode::Name(start) => {
            push_lookup(&mut value, &body[start..], vars);
            None
        }
        ExpandMode::BracedName(start) => {
            let partial_name = body[start..].to_string();
            tracing::debug!(message = "unterminated ${", partial_name = %partial_name);
            Some(ExpandError::NoCloseBrace { partial_name })
        }
        ExpandMode::Literal | ExpandMode::Protected => None,
    };

    Expansion { value, error }
}

fn push_lookup(acc: &mut String, name: &str, vars: &impl VariableLookup) {
    if name == LAST_STATUS_NAME {
        acc.push_str(&vars.last_status().to_string());
    } else if let Some(value) = vars.lookup(name) {
        acc.push_str(value);
    }
}

/// Strip one leading and one trailing `"`. An escaped trailing quote (`\"`) is kept.
fn strip_outer_quotes(fragment: &str) -> &str {
    let mut it = fragment;
    if let Some(rest) = it.strip_prefix('"') {
        it = rest;
    }
    if it.ends_with('"') && !ends_with_escape(&it[..it.len() - 1]) {
        it = &it[..it.len() - 1];
    }
    it
}

/// `true` if `text` ends with an odd number of backslashes.
fn ends_with_escape(text: &str) -> bool {
    text.bytes().rev().take_while(|it| *it == b'\\').count() % 2 == 1
}
