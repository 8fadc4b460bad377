// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{ffi::CString,
          io,
          os::fd::RawFd};

use nix::{fcntl::{OFlag, open},
          sys::stat::Mode,
          unistd::{close, dup2}};
use strum_macros::{Display, EnumString};

use crate::{Argv, ShellError, ShellResult, ok};

/// The stream(s) a redirection replaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedirectTarget {
    Stdout,
    Stderr,
    StdoutAndStderr,
}

impl RedirectTarget {
    #[must_use]
    pub fn fds(self) -> &'static [RawFd] {
        match self {
            RedirectTarget::Stdout => &[STDOUT_FD],
            RedirectTarget::Stderr => &[STDERR_FD],
            RedirectTarget::StdoutAndStderr => &[STDOUT_FD, STDERR_FD],
        }
    }
}

const STDOUT_FD: RawFd = 1;
const STDERR_FD: RawFd = 2;

#[derive(Debug, Display, EnumString, Copy, Clone, PartialEq, Eq)]
pub enum RedirectOp {
    #[strum(serialize = ">")]
    StdoutTruncate,
    #[strum(serialize = ">>")]
    StdoutAppend,
    #[strum(serialize = "2>")]
    StderrTruncate,
    #[strum(serialize = "2>>")]
    StderrAppend,
    #[strum(serialize = "&>")]
    BothTruncate,
    #[strum(serialize = "&>>")]
    BothAppend,
}

impl RedirectOp {
    #[must_use]
    pub fn target(self) -> RedirectTarget {
        match self {
            RedirectOp::StdoutTruncate | RedirectOp::StdoutAppend => RedirectTarget::Stdout,
            RedirectOp::StderrTruncate | RedirectOp::StderrAppend => RedirectTarget::Stderr,
            RedirectOp::BothTruncate | RedirectOp::BothAppend => {
                RedirectTarget::StdoutAndStderr
            }
        }
    }

    #[must_use]
    pub fn is_append(self) -> bool {
        matches!(
            self,
            RedirectOp::StdoutAppend | RedirectOp::StderrAppend | RedirectOp::BothAppend
        )
    }

    /// create + write + (truncate | append).
    #[must_use]
    pub fn open_flags(self) -> OFlag {
        let mode_flag = if self.is_append() {
            OFlag::O_APPEND
        } else {
            OFlag::O_TRUNC
        };
        OFlag::O_CREAT | OFlag::O_WRONLY | mode_flag
    }
}

/// Permissions for a file created by a redirection: read + write for owner and group.
#[must_use]
pub fn redirect_file_mode() -> Mode {
    Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IWGRP
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redirection {
    pub op: RedirectOp,
    pub path: String,
}

/// `false` only if `bare` says the element at `index` was quoted, escaped, or expanded.
/// See [`crate::TokenizedLine::bare`].
#[must_use]
pub fn is_bare(bare: &[bool], index: usize) -> bool { bare.get(index).copied().unwrap_or(true) }

/// Remove every `(op, path)` pair from `argv`, and return the remaining arguments plus
/// the redirections in the order they appeared. An operator without a following path is
/// left in `argv`, and so is one that was not typed bare (eg: `">"`).
#[must_use]
pub fn extract_redirections(argv: Argv, bare: &[bool]) -> (Argv, Vec<Redirection>) {
    let mut remaining = Argv::with_capacity(argv.len());
    let mut redirections = vec![];

    let mut iter = argv.into_iter().enumerate().peekable();
    while let Some((index, arg)) = iter.next() {
        let op = if is_bare(bare, index) {
            arg.parse::<RedirectOp>().ok()
        } else {
            None
        };
        match (op, iter.peek()) {
            (Some(op), Some(_)) => {
                if let Some((_, path)) = iter.next() {
                    redirections.push(Redirection { op, path });
                }
            }
            _ => remaining.push(arg),
        }
    }

    (remaining, redirections)
}

/// A [`Redirection`] with everything allocated up front, so that it can be applied in a
/// forked child without allocating.
#[derive(Debug)]
pub struct PreparedRedirection {
    pub redirection: Redirection,
    c_path: CString,
    failure_message: Vec<u8>,
}

impl PreparedRedirection {
    /// # Errors
    ///
    /// Returns an error if the path contains a NUL byte.
    pub fn try_new(redirection: Redirection) -> ShellResult<Self> {
        let c_path = CString::new(redirection.path.as_bytes()).map_err(|_| {
            ShellError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("redirect path contains NUL: {:?}", redirection.path),
            ))
        })?;
        let failure_message =
            format!("shell: cannot open '{}' for redirection\n", redirection.path)
                .into_bytes();
        Ok(Self {
            redirection,
            c_path,
            failure_message,
        })
    }

    /// Open the file and dup it onto the target stream(s), then close the original fd.
    /// Only meant to be called in the forked child.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::OpenRedirectFailed`] if the file can't be opened, or
    /// [`ShellError::Sys`] if `dup2` fails.
    pub fn apply(&self) -> ShellResult<()> {
        let op = self.redirection.op;
        let fd = open(self.c_path.as_c_str(), op.open_flags(), redirect_file_mode())
            .map_err(|source| ShellError::OpenRedirectFailed {
                path: self.redirection.path.clone(),
                source,
            })?;

        for target_fd in op.target().fds() {
            dup2(fd, *target_fd)?;
        }
        if !op.target().fds().contains(&fd) {
            close(fd)?;
        }

        ok!()
    }

    /// The message written to stderr by the child when [`Self::apply`] fails.
    #[must_use]
    pub fn failure_message(&self) -> &[u8] { &self.failure_message }
}

#[cfg(test)]
mod tests_redirect {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    fn argv(items: &[&str]) -> Argv { items.iter().map(ToString::to_string).collect() }

    #[test_case(">", RedirectOp::StdoutTruncate, RedirectTarget::Stdout, false)]
    #[test_case(">>", RedirectOp::StdoutAppend, RedirectTarget::Stdout, true)]
    #[test_case("2>", RedirectOp::StderrTruncate, RedirectTarget::Stderr, false)]
    #[test_case("2>>", RedirectOp::StderrAppend, RedirectTarget::Stderr, true)]
    #[test_case("&>", RedirectOp::BothTruncate, RedirectTarget::StdoutAndStderr, false)]
    #[test_case("&>>", RedirectOp::BothAppend, RedirectTarget::StdoutAndStderr, true)]
    fn test_parse_op(text: &str, op: RedirectOp, target: RedirectTarget, append: bool) {
        let parsed: RedirectOp = text.parse().unwrap();
        assert_eq!(parsed, op);
        assert_eq!(parsed.to_string(), text);
        assert_eq!(parsed.target(), target);
        assert_eq!(parsed.is_append(), append);
        assert!(parsed.open_flags().contains(OFlag::O_CREAT | OFlag::O_WRONLY));
    }

    #[test]
    fn test_extract_removes_pairs() {
        let (rest, redirections) = extract_redirections(
            argv(&["cmd", "arg", ">", "/tmp/out", "2>>", "err.log"]),
            &[],
        );
        assert_eq!(rest, argv(&["cmd", "arg"]));
        assert_eq!(
            redirections,
            vec![
                Redirection {
                    op: RedirectOp::StdoutTruncate,
                    path: "/tmp/out".into()
                },
                Redirection {
                    op: RedirectOp::StderrAppend,
                    path: "err.log".into()
                },
            ]
        );
    }

    #[test]
    fn test_extract_keeps_dangling_op_and_lookalikes() {
        let (rest, redirections) = extract_redirections(argv(&["echo", "a>b", ">"]), &[]);
        assert_eq!(rest, argv(&["echo", "a>b", ">"]));
        assert!(redirections.is_empty());
    }

    #[test]
    fn test_quoted_op_is_an_argument() {
        let (rest, redirections) = extract_redirections(
            argv(&["echo", ">", "x", ">", "out"]),
            &[true, false, true, true, true],
        );
        assert_eq!(rest, argv(&["echo", ">", "x"]));
        assert_eq!(
            redirections,
            vec![Redirection {
                op: RedirectOp::StdoutTruncate,
                path: "out".into()
            }]
        );
    }

    #[test]
    fn test_later_redirections_come_last() {
        let (_, redirections) =
            extract_redirections(argv(&["cmd", ">", "one", "&>", "two"]), &[]);
        let paths: Vec<_> = redirections.iter().map(|it| it.path.as_str()).collect();
        assert_eq!(paths, vec!["one", "two"]);
    }

    #[test]
    fn test_prepared_redirection_rejects_nul() {
        let it = PreparedRedirection::try_new(Redirection {
            op: RedirectOp::StdoutTruncate,
            path: "bad\0path".into(),
        });
        assert!(it.is_err());
    }

    #[test]
    fn test_file_mode_is_owner_and_group_rw() {
        assert_eq!(redirect_file_mode().bits() & 0o777, 0o660);
    }
}
