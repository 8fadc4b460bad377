// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Command line arguments, and the settings derived from them.

use std::{ffi::OsStr, path::PathBuf};

use clap::{Parser, ValueEnum};
use tracing_core::LevelFilter;

use crate::{DEFAULT_HISTORY_CAPACITY, DEFAULT_HISTORY_ENTRY_SIZE, DEFAULT_LINE_CAPACITY,
            DelKeyBehavior, ReadlineOptions, TracingConfig};

/// Commands in this file (in the current directory) run before the first prompt.
pub const RC_FILE_NAME: &str = ".shellrc";

/// The binary name that means "I am the shell". Anything else is an interpreter
/// invocation, eg: through a `#!` line or a link with another name.
pub const SHELL_BINARY_NAME: &str = "shell";

/// More info: <https://docs.rs/clap/latest/clap/_derive/_tutorial/chapter_2/index.html>
#[derive(Debug, Parser)]
#[command(bin_name = "shell")]
#[command(about = "A small interactive command shell with job control")]
#[command(version)]
#[command(next_line_help = true)]
#[command(arg_required_else_help(false))]
pub struct ShellCliArgs {
    /// Script files to run in order. No files starts an interactive session.
    #[arg(name = "script files")]
    pub script_files: Vec<PathBuf>,

    #[arg(long, help = "Write log output to this file")]
    pub log_file: Option<String>,

    #[arg(long, value_enum, default_value_t = LogLevel::Off, help = "Log level, used with --log-file")]
    pub log_level: LogLevel,

    #[arg(long, default_value_t = DEFAULT_HISTORY_CAPACITY, help = "Number of history entries kept")]
    pub history_size: usize,

    #[arg(long, default_value_t = DEFAULT_LINE_CAPACITY, help = "Longest line the editor accepts, in bytes, including one reserved byte")]
    pub line_max: usize,

    #[arg(long, help = "Treat the DEL byte (0x7f) as backspace instead of delete")]
    pub del_is_backspace: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    #[default]
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(it: LogLevel) -> Self {
        match it {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShellMode {
    Interactive,
    /// Run each file in order, then exit.
    Script(Vec<PathBuf>),
}

/// Settings of one shell session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShellConfig {
    pub history_capacity: usize,
    pub history_entry_size: usize,
    pub readline_options: ReadlineOptions,
    pub rc_file_name: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            history_entry_size: DEFAULT_HISTORY_ENTRY_SIZE,
            readline_options: ReadlineOptions::default(),
            rc_file_name: RC_FILE_NAME.to_string(),
        }
    }
}

impl From<&ShellCliArgs> for ShellConfig {
    fn from(args: &ShellCliArgs) -> Self {
        let del_key = if args.del_is_backspace {
            DelKeyBehavior::Backspace
        } else {
            DelKeyBehavior::DeleteForward
        };
        Self {
            history_capacity: args.history_size,
            readline_options: ReadlineOptions {
                line_capacity: args.line_max,
                del_key,
            },
            ..Self::default()
        }
    }
}

impl ShellCliArgs {
    /// When the binary was not invoked as the shell, only the first file is run.
    #[must_use]
    pub fn mode(&self, argv0: &OsStr) -> ShellMode {
        match self.script_files.as_slice() {
            [] => ShellMode::Interactive,
            [first, ..] if !invoked_as_shell(argv0) => ShellMode::Script(vec![first.clone()]),
            files => ShellMode::Script(files.to_vec()),
        }
    }

    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        match &self.log_file {
            Some(path) => TracingConfig::new_file(path.clone(), self.log_level.into()),
            None => TracingConfig::default(),
        }
    }
}

/// `true` if the file name part of `argv0` contains [`SHELL_BINARY_NAME`].
#[must_use]
pub fn invoked_as_shell(argv0: &OsStr) -> bool {
    let path = std::path::Path::new(argv0);
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|it| it.contains(SHELL_BINARY_NAME))
}
