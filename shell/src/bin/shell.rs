// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{ffi::OsString,
          io,
          sync::{Arc, Mutex as StdMutex}};

use clap::Parser;
use r3bl_shell::{Environment, ForegroundTerminal, Readline, SafeRawTerminal, Shell,
                 ShellCliArgs, ShellConfig, ShellMode, SignalPolicy, install_signal_policy,
                 prepare_environment, try_initialize_logging_global};

fn main() -> miette::Result<()> {
    let cli_args = ShellCliArgs::parse();
    try_initialize_logging_global(cli_args.tracing_config())?;

    let argv0 = std::env::args_os().next().unwrap_or_else(OsString::new);
    let mode = cli_args.mode(&argv0);
    let config = ShellConfig::from(&cli_args);

    let mut env = Environment::from_process();
    prepare_environment(&mut env);

    let out: SafeRawTerminal = Arc::new(StdMutex::new(io::stdout()));
    let err: SafeRawTerminal = Arc::new(StdMutex::new(io::stderr()));

    tracing::debug!(message = "starting", mode = ?mode, config = ?config);

    let exit_code = match mode {
        ShellMode::Script(files) => {
            let signal_flags = install_signal_policy(SignalPolicy::Script)?;
            let mut shell = Shell::new(config, env, out, err).with_signal_flags(signal_flags);
            shell.run_script_files(&files)
        }
        ShellMode::Interactive => {
            let signal_flags = install_signal_policy(SignalPolicy::Interactive)?;
            let terminal = ForegroundTerminal::try_acquire()?;
            let mut readline = Readline::new(
                Box::new(io::stdin()),
                out.clone(),
                config.readline_options,
            );
            let mut shell = Shell::new(config, env, out, err)
                .with_foreground_terminal(terminal)
                .with_signal_flags(signal_flags);
            shell.run_interactive(&mut readline)
        }
    };

    tracing::debug!(message = "exiting", exit_code = %exit_code);
    std::process::exit(exit_code)
}
