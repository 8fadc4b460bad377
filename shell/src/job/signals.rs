// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Signal handlers only set flags. The line editor and the main loop poll those flags
//! between keystrokes and before each prompt, so nothing is ever re-entered from a
//! handler.

use std::sync::{Arc,
                atomic::{AtomicBool, Ordering}};

use miette::IntoDiagnostic;
use nix::{libc,
          sys::signal::{SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal,
                        sigaction, signal, sigprocmask}};

use crate::{ShellResult, ok};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signal: libc::c_int) { request_interrupt(); }

/// What the `SIGINT` handler does. Async signal safe.
pub fn request_interrupt() { INTERRUPTED.store(true, Ordering::SeqCst); }

/// `true` if `SIGINT` arrived since the last call.
pub fn take_interrupt() -> bool { INTERRUPTED.swap(false, Ordering::SeqCst) }

/// Signals the interactive shell ignores, and that its children get back as default.
const JOB_CONTROL_SIGNALS: [Signal; 4] = [
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalPolicy {
    /// `SIGINT` interrupts the terminal read, job control signals are ignored.
    Interactive,
    /// Only `SIGCHLD` is watched. `SIGINT` keeps its default action.
    Script,
}

/// Flags set by the signal handlers.
#[derive(Clone, Debug, Default)]
pub struct SignalFlags {
    child_exited: Arc<AtomicBool>,
}

impl SignalFlags {
    /// `true` if `SIGCHLD` arrived since the last call.
    #[must_use]
    pub fn take_child_exited(&self) -> bool { self.child_exited.swap(false, Ordering::SeqCst) }
}

/// Install the handlers for the given policy.
///
/// `SIGCHLD` is registered with `SA_RESTART`, so it never interrupts the terminal read.
/// A background job that ends while the editor waits stays a zombie until the next
/// keystroke (the editor's idle hook) or the next prompt, whichever comes first, and is
/// reaped there.
///
/// # Errors
///
/// Returns an error if a handler can't be installed.
pub fn install_signal_policy(policy: SignalPolicy) -> miette::Result<SignalFlags> {
    let flags = SignalFlags::default();
    signal_hook::flag::register(signal_hook::consts::SIGCHLD, Arc::clone(&flags.child_exited))
        .into_diagnostic()?;

    if policy == SignalPolicy::Interactive {
        // No SA_RESTART, so that a blocked `read` returns EINTR.
        let action = SigAction::new(
            SigHandler::Handler(on_sigint),
            SaFlags::empty(),
            SigSet::empty(),
        );
        // SAFETY: the handler only stores to an atomic.
        unsafe { sigaction(Signal::SIGINT, &action) }.into_diagnostic()?;

        for it in JOB_CONTROL_SIGNALS {
            // SAFETY: SIG_IGN has no handler code.
            unsafe { signal(it, SigHandler::SigIgn) }.into_diagnostic()?;
        }
    }

    tracing::debug!(message = "signal policy installed", policy = ?policy);
    Ok(flags)
}

/// Put every signal the shell touches back to its default action, and unblock
/// `SIGCHLD`. Called in a forked child before `execve`.
pub fn reset_signals_for_child() {
    let all = [Signal::SIGINT, Signal::SIGCHLD]
        .into_iter()
        .chain(JOB_CONTROL_SIGNALS);
    for it in all {
        // SAFETY: SIG_DFL has no handler code.
        let _ = unsafe { signal(it, SigHandler::SigDfl) };
    }
    let _ = unblock_sigchld();
}

fn sigchld_set() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGCHLD);
    set
}

/// # Errors
///
/// Returns an error if the signal mask can't be changed.
pub fn unblock_sigchld() -> ShellResult<()> {
    sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&sigchld_set()), None)?;
    ok!()
}

/// Blocks `SIGCHLD` until dropped, so that a child can't terminate (and be reported)
/// between `fork` and `waitpid`. The previous mask is restored on drop.
#[derive(Debug)]
pub struct SigchldBlockGuard {
    previous_mask: SigSet,
}

impl SigchldBlockGuard {
    /// # Errors
    ///
    /// Returns an error if the signal mask can't be changed.
    pub fn try_block() -> ShellResult<Self> {
        let mut previous_mask = SigSet::empty();
        sigprocmask(
            SigmaskHow::SIG_BLOCK,
            Some(&sigchld_set()),
            Some(&mut previous_mask),
        )?;
        Ok(Self { previous_mask })
    }
}

impl Drop for SigchldBlockGuard {
    fn drop(&mut self) {
        let _ = sigprocmask(SigmaskHow::SIG_SETMASK, Some(&self.previous_mask), None);
    }
}

#[cfg(test)]
mod tests_signals {
    use super::*;

    #[test]
    #[serial_test::serial(interrupt_flag)]
    fn test_take_interrupt_resets() {
        request_interrupt();
        assert!(take_interrupt());
        assert!(!take_interrupt());
    }

    #[test]
    fn test_child_exit_sets_flag() {
        let flags = install_signal_policy(SignalPolicy::Script).unwrap();
        let _ = flags.take_child_exited();

        let status = std::process::Command::new("true").status().unwrap();
        assert!(status.success());

        // Delivery is asynchronous, and may land on another test thread.
        let give_up_at = std::time::Instant::now() + std::time::Duration::from_secs(2);
        while !flags.take_child_exited() {
            assert!(std::time::Instant::now() < give_up_at, "no SIGCHLD seen");
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
    }

    #[test]
    fn test_block_guard_restores_mask() {
        let before = SigSet::thread_get_mask().unwrap();
        {
            let _guard = SigchldBlockGuard::try_block().unwrap();
            let during = SigSet::thread_get_mask().unwrap();
            assert!(during.contains(Signal::SIGCHLD));
        }
        let after = SigSet::thread_get_mask().unwrap();
        assert_eq!(
            before.contains(Signal::SIGCHLD),
            after.contains(Signal::SIGCHLD)
        );
    }
}
