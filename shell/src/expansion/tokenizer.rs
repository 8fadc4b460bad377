// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{ExpandError, VariableLookup, expand_fragment};

/// The argument vector of one dispatch.
pub type Argv = Vec<String>;

/// Argument separators. Runs of them collapse.
#[must_use]
pub fn is_separator(ch: char) -> bool { matches!(ch, ' ' | '\t' | '\n' | '\r' | '\0') }

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenizedLine {
    pub argv: Argv,
    /// One per argv element: `true` if it was typed as is, with no quotes, no `\`, and
    /// nothing expanded. Only a bare element can be `&` or a redirection operator.
    pub bare: Vec<bool>,
    /// Expansion problems, one per affected token. These never stop a dispatch.
    pub errors: Vec<ExpandError>,
}

/// Split a line into raw (unexpanded) tokens. A separator inside double quotes, or
/// escaped with `\`, does not split. The quotes and backslashes are left in place for
/// [`expand_fragment`] to deal with.
#[must_use]
pub fn split_raw_tokens(line: &str) -> Vec<&str> {
    let mut tokens = vec![];
    let mut start: Option<usize> = None;
    let mut in_quotes = false;
    let mut escaped = false;

    for (offset, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => {
                start.get_or_insert(offset);
                escaped = true;
            }
            '"' => {
                start.get_or_insert(offset);
                in_quotes = !in_quotes;
            }
            _ if is_separator(ch) && !in_quotes => {
                if let Some(begin) = start.take() {
                    tokens.push(&line[begin..offset]);
                }
            }
            _ => {
                start.get_or_insert(offset);
            }
        }
    }
    if let Some(begin) = start {
        tokens.push(&line[begin..]);
    }

    tokens
}

/// Split, then expand every raw token into one argv element. A token that expands to
/// nothing still produces an (empty) element, and a trailing `&` is kept for the job
/// driver.
#[must_use]
pub fn tokenize(line: &str, vars: &impl VariableLookup) -> TokenizedLine {
    let mut it = TokenizedLine::default();
    for raw in split_raw_tokens(line) {
        let expansion = expand_fragment(raw, vars);
        if let Some(error) = expansion.error {
            it.errors.push(error);
        }
        it.bare.push(raw == expansion.value);
        it.argv.push(expansion.value);
    }
    it
}

#[cfg(test)]
mod tests_tokenizer {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Environment, ExpandContext};

    fn tokenize_with(line: &str, env: &Environment, last_status: i32) -> TokenizedLine {
        tokenize(line, &ExpandContext { env, last_status })
    }

    #[test]
    fn test_split_collapses_separators() {
        assert_eq!(
            split_raw_tokens("  ls \t -la\r\n /tmp\0x "),
            vec!["ls", "-la", "/tmp", "x"]
        );
        assert!(split_raw_tokens(" \t\n").is_empty());
    }

    #[test]
    fn test_split_respects_quotes_and_escapes() {
        assert_eq!(
            split_raw_tokens(r#"echo "a b" c\ d "#),
            vec!["echo", r#""a b""#, r"c\ d"]
        );
    }

    #[test]
    fn test_cd_home_set_and_unset() {
        let env = Environment::from(vec![("HOME".to_string(), "/root".to_string())]);
        assert_eq!(tokenize_with("cd $HOME", &env, 0).argv, vec!["cd", "/root"]);

        let env = Environment::new();
        assert_eq!(tokenize_with("cd $HOME", &env, 0).argv, vec!["cd", ""]);
    }

    #[test]
    fn test_trailing_ampersand_is_kept() {
        let env = Environment::new();
        assert_eq!(
            tokenize_with("cmd arg > /tmp/out &", &env, 0).argv,
            vec!["cmd", "arg", ">", "/tmp/out", "&"]
        );
    }

    #[test]
    fn test_only_typed_operators_are_bare() {
        let env = Environment::from(vec![("OP".to_string(), ">".to_string())]);
        let it = tokenize_with(r#"echo ">" \> $OP > out "&" &"#, &env, 0);
        assert_eq!(it.argv, vec!["echo", ">", ">", ">", ">", "out", "&", "&"]);
        assert_eq!(it.bare, vec![true, false, false, false, true, true, false, true]);
    }

    #[test]
    fn test_quoted_and_escaped_tokens_expand() {
        let env = Environment::from(vec![("NAME".to_string(), "x y".to_string())]);
        assert_eq!(
            tokenize_with(r#"echo "hi $NAME" a\ b \$NAME $?"#, &env, 2).argv,
            vec!["echo", "hi x y", "a b", "$NAME", "2"]
        );
    }

    #[test]
    fn test_errors_are_collected() {
        let env = Environment::new();
        let it = tokenize_with("echo ${A b", &env, 0);
        assert_eq!(it.argv, vec!["echo", "", "b"]);
        assert_eq!(it.errors.len(), 1);
    }

    #[test]
    fn test_round_trip_plain_argv() {
        let env = Environment::new();
        let argvs = [
            vec!["ls"],
            vec!["ls", "-la", "/usr/bin"],
            vec!["grep", "-r", "needle", "./src", "--include=*.rs"],
        ];
        for argv in argvs {
            let line = argv.join(" ");
            assert_eq!(tokenize_with(&line, &env, 0).argv, argv);
        }
    }
}
