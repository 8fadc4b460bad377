// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::ffi::CString;

use strum_macros::{Display, EnumString};

use super::DEBUG_ENV_MOD;
use crate::{ShellError, ShellResult, ok};

const ENV_PATH_SEPARATOR: char = ':';

/// Used when `PATH` is not set.
pub const DEFAULT_PATH: &str = "/bin:/usr/bin";

/// The variables the shell itself reads or writes.
#[derive(Debug, Display, EnumString, Copy, Clone, PartialEq, Eq)]
pub enum EnvKeys {
    #[strum(serialize = "USER")]
    User,
    #[strum(serialize = "HOSTNAME")]
    Hostname,
    #[strum(serialize = "HOME")]
    Home,
    #[strum(serialize = "PATH")]
    Path,
    #[strum(serialize = "PWD")]
    Pwd,
    #[strum(serialize = "SHELL")]
    Shell,
}

pub type EnvVars = Vec<(String, String)>;
pub type EnvVarsSlice<'a> = &'a [(String, String)];

/// The shell's variables, in insertion order. This is owned by the shell, and a forked
/// child gets a copy of it by value (see [`Environment::to_envp`]). The process
/// environment of the shell itself is never mutated.
///
/// `?` is not stored here; the dispatcher supplies the last exit status when expanding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: EnvVars,
}

impl From<EnvVars> for Environment {
    fn from(vars: EnvVars) -> Self {
        let mut it = Self::default();
        for (name, value) in vars {
            // Invalid names from the outside world are dropped.
            let _ = it.set(&name, &value);
        }
        it
    }
}

impl Environment {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Snapshot of the process environment. Non UTF-8 entries are skipped.
    #[must_use]
    pub fn from_process() -> Self {
        let vars: EnvVars = std::env::vars_os()
            .filter_map(|(name, value)| {
                Some((name.into_string().ok()?, value.into_string().ok()?))
            })
            .collect();
        Self::from(vars)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(it, _)| it.as_str() == name)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn get_key(&self, key: EnvKeys) -> Option<&str> { self.get(&key.to_string()) }

    /// Insert or overwrite. An existing variable keeps its position.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::InvalidEnv`] if `name` is not a valid variable name.
    pub fn set(&mut self, name: &str, value: &str) -> ShellResult<()> {
        if !is_valid_name(name) {
            return Err(ShellError::InvalidEnv {
                assignment: format!("{name}={value}"),
            });
        }

        match self.vars.iter_mut().find(|(it, _)| it.as_str() == name) {
            Some((_, it)) => value.clone_into(it),
            None => self.vars.push((name.to_string(), value.to_string())),
        }

        DEBUG_ENV_MOD.then(|| {
            // % is Display, ? is Debug.
            tracing::debug!(message = "env set", name = %name, value = %value);
        });

        ok!()
    }

    /// # Errors
    ///
    /// Returns [`ShellError::InvalidEnv`] if `key` can't be set (never for [`EnvKeys`]).
    pub fn set_key(&mut self, key: EnvKeys, value: &str) -> ShellResult<()> {
        self.set(&key.to_string(), value)
    }

    pub fn unset(&mut self, name: &str) -> Option<String> {
        let index = self.vars.iter().position(|(it, _)| it.as_str() == name)?;
        Some(self.vars.remove(index).1)
    }

    /// `PATH`, or [`DEFAULT_PATH`] when it is not set.
    #[must_use]
    pub fn path_value(&self) -> &str { self.get_key(EnvKeys::Path).unwrap_or(DEFAULT_PATH) }

    /// The directories of `PATH`, in search order. An empty entry means the current
    /// directory.
    pub fn path_dirs(&self) -> impl Iterator<Item = &str> + '_ {
        self.path_value()
            .split(ENV_PATH_SEPARATOR)
            .map(|it| if it.is_empty() { "." } else { it })
    }

    /// `HOME`, only if it is set to something.
    #[must_use]
    pub fn home(&self) -> Option<&str> {
        self.get_key(EnvKeys::Home).filter(|it| !it.is_empty())
    }

    #[must_use]
    pub fn as_slice(&self) -> EnvVarsSlice<'_> { &self.vars }

    #[must_use]
    pub fn len(&self) -> usize { self.vars.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.vars.is_empty() }

    /// `NAME=VALUE` strings for `execve`. Values containing a NUL byte can't be passed
    /// to a child and are left out.
    #[must_use]
    pub fn to_envp(&self) -> Vec<CString> {
        self.vars
            .iter()
            .filter_map(|(name, value)| CString::new(format!("{name}={value}")).ok())
            .collect()
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(is_name_char)
        }
        _ => false,
    }
}

#[must_use]
pub fn is_name_char(ch: char) -> bool { ch.is_ascii_alphanumeric() || ch == '_' }
