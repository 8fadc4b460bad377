// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Editing mode for the controlling terminal: no canonical line buffering and no echo,
//! but signal generation stays on, so `Ctrl+C` still raises `SIGINT`.

use std::{fs::File,
          io,
          sync::{LazyLock, Mutex}};

use miette::miette;
use rustix::{fd::{AsFd, BorrowedFd},
             termios::{self, LocalModes, OptionalActions, SpecialCodeIndex, Termios}};

/// The settings in place before editing mode was first enabled.
static ORIGINAL_TERMIOS: LazyLock<Mutex<Option<Termios>>> = LazyLock::new(|| Mutex::new(None));

enum TerminalFd {
    Stdin(io::Stdin),
    /// stdin is redirected.
    DevTty(File),
}

impl AsFd for TerminalFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            TerminalFd::Stdin(stdin) => stdin.as_fd(),
            TerminalFd::DevTty(file) => file.as_fd(),
        }
    }
}

fn get_terminal_fd() -> io::Result<TerminalFd> {
    let stdin = io::stdin();
    if termios::isatty(&stdin) {
        Ok(TerminalFd::Stdin(stdin))
    } else {
        let file = File::options().read(true).write(true).open("/dev/tty")?;
        Ok(TerminalFd::DevTty(file))
    }
}

/// `true` if stdin is a terminal.
#[must_use]
pub fn stdin_is_terminal() -> bool { termios::isatty(io::stdin()) }

/// Turn off `ICANON` and `ECHO`, keep `ISIG`, and make reads return after every byte
/// (`VMIN=1`, `VTIME=0`). The original settings are saved the first time.
///
/// # Errors
///
/// Returns an error if there is no terminal, or its attributes can't be read or set.
pub fn enable_editing_mode() -> miette::Result<()> {
    let fd =
        get_terminal_fd().map_err(|e| miette!("failed to get terminal file descriptor: {e}"))?;

    let mut termios = termios::tcgetattr(&fd)
        .map_err(|e| miette!("failed to retrieve terminal attributes: {e}"))?;

    {
        let mut original = ORIGINAL_TERMIOS
            .lock()
            .map_err(|e| miette!("terminal settings lock poisoned: {e}"))?;
        if original.is_none() {
            *original = Some(termios.clone());
        }
    }

    termios.local_modes.remove(LocalModes::ICANON | LocalModes::ECHO);
    termios.local_modes.insert(LocalModes::ISIG);
    termios.special_codes[SpecialCodeIndex::VMIN] = 1;
    termios.special_codes[SpecialCodeIndex::VTIME] = 0;

    termios::tcsetattr(&fd, OptionalActions::Now, &termios)
        .map_err(|e| miette!("failed to set terminal attributes: {e}"))?;

    Ok(())
}

/// Put back the settings saved by [`enable_editing_mode`]. No-op if it never ran.
///
/// # Errors
///
/// Returns an error if the terminal attributes can't be set.
pub fn disable_editing_mode() -> miette::Result<()> {
    let original = ORIGINAL_TERMIOS
        .lock()
        .map_err(|e| miette!("terminal settings lock poisoned: {e}"))?;

    if let Some(ref termios) = *original {
        let fd = get_terminal_fd()
            .map_err(|e| miette!("failed to get terminal file descriptor: {e}"))?;
        termios::tcsetattr(&fd, OptionalActions::Now, termios)
            .map_err(|e| miette!("failed to set terminal attributes: {e}"))?;
    }
    Ok(())
}

/// Editing mode for as long as this lives. Children must see the original settings, so
/// the shell drops the guard before running a command line.
#[derive(Debug)]
pub struct TerminalModeGuard {
    _private: (),
}

impl TerminalModeGuard {
    /// # Errors
    ///
    /// See [`enable_editing_mode`].
    pub fn try_new() -> miette::Result<Self> {
        enable_editing_mode()?;
        Ok(Self { _private: () })
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        if let Err(report) = disable_editing_mode() {
            tracing::warn!(message = "failed to restore terminal settings", error = %report);
        }
    }
}

#[cfg(test)]
mod tests_terminal_mode {
    use super::*;

    #[test]
    fn test_disable_without_enable_is_noop() {
        if ORIGINAL_TERMIOS.lock().unwrap().is_none() {
            assert!(disable_editing_mode().is_ok());
        }
    }

    #[test]
    fn test_guard_round_trip_on_real_terminal() {
        // CI has no terminal.
        if !stdin_is_terminal() {
            return;
        }
        let fd = get_terminal_fd().unwrap();
        let before = termios::tcgetattr(&fd).unwrap();
        {
            let _guard = TerminalModeGuard::try_new().unwrap();
            let during = termios::tcgetattr(&fd).unwrap();
            assert!(!during.local_modes.contains(LocalModes::ICANON));
            assert!(during.local_modes.contains(LocalModes::ISIG));
        }
        let after = termios::tcgetattr(&fd).unwrap();
        assert_eq!(before.local_modes, after.local_modes);
    }
}
