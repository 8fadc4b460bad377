// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Commands the shell runs itself, before any `PATH` search. Built-ins ignore
//! redirections and `&`.

use std::{env::set_current_dir,
          fs,
          io::{self, Write},
          path::PathBuf,
          str::FromStr};

use strum_macros::{Display, EnumString};

use super::DEBUG_DISPATCH_MOD;
use crate::{EnvKeys, Environment, HistoryRing, ShellError, ShellResult};

const CD_USAGE: &str = "cd [dir]";
const EXIT_USAGE: &str = "exit [code]";

#[derive(Debug, Display, EnumString, Copy, Clone, PartialEq, Eq)]
pub enum Builtin {
    #[strum(serialize = "cd")]
    Cd,
    /// Same as `cd ..`.
    #[strum(serialize = "..")]
    Up,
    #[strum(serialize = "export")]
    Export,
    /// Does nothing.
    #[strum(serialize = "init")]
    Init,
    #[strum(serialize = "exit")]
    Exit,
    #[strum(serialize = "history")]
    History,
}

impl Builtin {
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> { Self::from_str(name).ok() }
}

/// Change the working directory of the shell process and update `$PWD`.
///
/// A missing or empty argument means `$HOME`. The target is resolved to its real path
/// (symlinks followed), so `$PWD` never holds a link. Returns the new directory.
///
/// # Errors
///
/// - [`ShellError::TooManyArgs`] for more than one argument.
/// - [`ShellError::NoHome`] if `$HOME` is needed and not set.
/// - [`ShellError::NotADirectory`] if the target does not resolve to a directory.
pub fn builtin_cd(args: &[String], env: &mut Environment) -> ShellResult<PathBuf> {
    if args.len() > 1 {
        return Err(ShellError::TooManyArgs {
            builtin: "cd",
            usage: CD_USAGE,
        });
    }

    let target = match args.first().map(String::as_str) {
        Some(dir) if !dir.is_empty() => dir.to_string(),
        _ => env.home().ok_or(ShellError::NoHome)?.to_string(),
    };

    let not_a_directory = || ShellError::NotADirectory {
        path: target.clone(),
    };
    let real_path = fs::canonicalize(&target).map_err(|_| not_a_directory())?;
    if !real_path.is_dir() {
        return Err(not_a_directory());
    }

    set_current_dir(&real_path)?;
    env.set_key(EnvKeys::Pwd, &real_path.to_string_lossy())?;

    DEBUG_DISPATCH_MOD.then(|| {
        // % is Display, ? is Debug.
        tracing::debug!(message = "cd", target = %target, pwd = %real_path.display());
    });

    Ok(real_path)
}

/// `export NAME=VALUE ...`. The values arrive already expanded. Malformed assignments
/// (no `=` or more than one, an invalid name, an empty value) are skipped without a
/// message. Returns how many variables were set.
pub fn builtin_export(args: &[String], env: &mut Environment) -> usize {
    let mut count = 0;
    for arg in args {
        let assignment = match arg.split_once('=') {
            Some((name, value))
                if !name.is_empty() && !value.is_empty() && !value.contains('=') =>
            {
                env.set(name, value)
            }
            _ => Err(ShellError::InvalidEnv {
                assignment: arg.clone(),
            }),
        };
        match assignment {
            Ok(()) => count += 1,
            Err(error) => {
                DEBUG_DISPATCH_MOD.then(|| {
                    tracing::debug!(message = "export skipped", error = %error);
                });
            }
        }
    }
    count
}

/// `exit [code]`. No argument exits with the last status.
///
/// # Errors
///
/// - [`ShellError::TooManyArgs`] for more than one argument.
/// - [`ShellError::InvalidExitCode`] if the argument is not a number.
pub fn builtin_exit(args: &[String], last_status: i32) -> ShellResult<i32> {
    match args {
        [] => Ok(last_status),
        [code] => code
            .parse::<i32>()
            .map(|it| it & 0xff)
            .map_err(|_| ShellError::InvalidExitCode { arg: code.clone() }),
        _ => Err(ShellError::TooManyArgs {
            builtin: "exit",
            usage: EXIT_USAGE,
        }),
    }
}

/// One line per entry, oldest first, with its logical index.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn builtin_history(history: &HistoryRing, out: &mut dyn Write) -> io::Result<()> {
    for (index, entry) in history.iter().enumerate() {
        writeln!(out, "{index:>5}  {entry}")?;
    }
    Ok(())
}
