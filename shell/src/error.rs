// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::io;

/// Errors surfaced while dispatching a command line. None of these terminate the shell;
/// each one is reported and turned into an exit status (see [`ShellError::exit_status`]).
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ShellError {
    #[error("Unknown command: {command}")]
    #[diagnostic(
        code(r3bl_shell::job::path_not_found),
        help("The program was not found in any `$PATH` directory, and is not a path itself")
    )]
    PathNotFound { command: String },

    #[error("cannot open '{path}' for redirection")]
    #[diagnostic(code(r3bl_shell::job::open_redirect_failed))]
    OpenRedirectFailed {
        path: String,
        #[source]
        source: nix::Error,
    },

    #[error("{builtin}: too many arguments, usage: {usage}")]
    #[diagnostic(code(r3bl_shell::builtin::too_many_args))]
    TooManyArgs {
        builtin: &'static str,
        usage: &'static str,
    },

    #[error("cd: HOME not set")]
    #[diagnostic(
        code(r3bl_shell::builtin::no_home),
        help("Pass a directory to `cd`, or `export HOME=<dir>`")
    )]
    NoHome,

    #[error("cd: {path}: not a directory")]
    #[diagnostic(code(r3bl_shell::builtin::not_a_directory))]
    NotADirectory { path: String },

    #[error("exit: {arg}: numeric argument required")]
    #[diagnostic(code(r3bl_shell::builtin::invalid_exit_code))]
    InvalidExitCode { arg: String },

    #[error("invalid environment assignment '{assignment}'")]
    #[diagnostic(
        code(r3bl_shell::env::invalid_env),
        help("Use NAME=VALUE, where NAME is [A-Za-z_][A-Za-z0-9_]*")
    )]
    InvalidEnv { assignment: String },

    #[error(transparent)]
    #[diagnostic(code(r3bl_shell::io))]
    Io(#[from] io::Error),

    #[error("system call failed: {0}")]
    #[diagnostic(code(r3bl_shell::sys))]
    Sys(#[from] nix::Error),
}

pub type ShellResult<T> = Result<T, ShellError>;

/// Status used when a program can't be found or executed.
pub const EXIT_STATUS_NOT_FOUND: i32 = 127;

impl ShellError {
    /// The value `$?` takes when a command fails with this error.
    #[must_use]
    pub fn exit_status(&self) -> i32 {
        match self {
            ShellError::PathNotFound { .. } => EXIT_STATUS_NOT_FOUND,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_error_messages_and_status() {
        let it = ShellError::PathNotFound {
            command: "nosuchcmd".into(),
        };
        assert_eq!(it.to_string(), "Unknown command: nosuchcmd");
        assert_eq!(it.exit_status(), 127);

        let it = ShellError::TooManyArgs {
            builtin: "cd",
            usage: "cd [dir]",
        };
        assert_eq!(it.to_string(), "cd: too many arguments, usage: cd [dir]");
        assert_eq!(it.exit_status(), 1);
        assert_eq!(ShellError::NoHome.exit_status(), 1);
    }
}
