// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{io::{IsTerminal, stdin},
          os::fd::AsFd};

use nix::unistd::{Pid, getpgrp, setpgid, tcsetpgrp};

use crate::{ShellResult, ok};

/// Which process group owns the controlling terminal. The interactive shell gives it
/// to a foreground job, so that `Ctrl+C` reaches the job and not the shell, and takes
/// it back once the job is done.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForegroundTerminal {
    shell_pgid: Pid,
}

impl ForegroundTerminal {
    /// Make the shell a process group leader and take the terminal. `None` if stdin is
    /// not a terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal can't be taken.
    pub fn try_acquire() -> ShellResult<Option<Self>> {
        if !stdin().is_terminal() {
            return Ok(None);
        }
        // Fails with EPERM for a session leader, which is already a group leader.
        let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
        let it = Self {
            shell_pgid: getpgrp(),
        };
        it.reclaim()?;
        Ok(Some(it))
    }

    #[must_use]
    pub fn shell_pgid(&self) -> Pid { self.shell_pgid }

    /// # Errors
    ///
    /// Returns an error if `tcsetpgrp` fails.
    pub fn give_to(&self, pgid: Pid) -> ShellResult<()> { set_foreground_pgid(stdin(), pgid) }

    /// # Errors
    ///
    /// Returns an error if `tcsetpgrp` fails.
    pub fn reclaim(&self) -> ShellResult<()> {
        set_foreground_pgid(stdin(), self.shell_pgid)
    }
}

fn set_foreground_pgid(terminal: impl AsFd, pgid: Pid) -> ShellResult<()> {
    tcsetpgrp(terminal, pgid)?;
    ok!()
}

#[cfg(test)]
mod tests_foreground_terminal {
    use nix::{errno::Errno, unistd::pipe};

    use super::*;
    use crate::ShellError;

    #[test]
    fn test_not_a_terminal_is_an_error() {
        let (read_end, _write_end) = pipe().unwrap();
        let result = set_foreground_pgid(&read_end, getpgrp());
        assert!(matches!(result, Err(ShellError::Sys(Errno::ENOTTY))));
    }
}
