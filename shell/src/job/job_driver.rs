// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Runs one external command: resolve it in `PATH`, fork, put the child in its own
//! process group, install its redirections, exec. The parent either waits for it
//! (foreground) or records it and returns right away (background).

use std::{ffi::CString,
          fs, io,
          os::unix::{ffi::OsStrExt, fs::PermissionsExt},
          path::{Path, PathBuf}};

use nix::{errno::Errno,
          sys::wait::{WaitPidFlag, waitpid},
          unistd::{ForkResult, Pid, execve, fork, setpgid, write}};
use strum_macros::Display;

use super::{DEBUG_JOB_MOD, ForegroundTerminal, JobStatus, PreparedRedirection,
            Redirection, SigchldBlockGuard, extract_redirections, is_bare,
            reset_signals_for_child};
use crate::{Argv, EXIT_STATUS_NOT_FOUND, Environment, ShellError, ShellResult,
            TokenizedLine};

/// The last argument that sends a job to the background.
pub const BACKGROUND_MARKER: &str = "&";

#[derive(Debug, Display, Copy, Clone, PartialEq, Eq)]
pub enum JobClass {
    Foreground,
    Background,
}

/// An argv that has been split into the program arguments, its redirections and its
/// class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobRequest {
    pub argv: Argv,
    pub class: JobClass,
    pub redirections: Vec<Redirection>,
}

impl JobRequest {
    /// Strip a trailing `&`, then pull out the redirection pairs. Every element counts as
    /// typed bare.
    #[must_use]
    pub fn from_argv(argv: Argv) -> Self { Self::from_words(argv, &[]) }

    /// Like [`Self::from_argv`], but a quoted `&` or operator stays an argument.
    #[must_use]
    pub fn from_tokens(tokens: TokenizedLine) -> Self {
        Self::from_words(tokens.argv, &tokens.bare)
    }

    fn from_words(mut argv: Argv, bare: &[bool]) -> Self {
        let last_index = argv.len().saturating_sub(1);
        let class = if argv.last().is_some_and(|it| it == BACKGROUND_MARKER)
            && is_bare(bare, last_index)
        {
            argv.pop();
            JobClass::Background
        } else {
            JobClass::Foreground
        };
        let (argv, redirections) = extract_redirections(argv, bare);
        Self {
            argv,
            class,
            redirections,
        }
    }

    #[must_use]
    pub fn program(&self) -> Option<&str> { self.argv.first().map(String::as_str) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// A foreground job that exited, was killed, or was stopped.
    Completed { pid: Pid, status: JobStatus },
    /// A background job that is now running. Nobody waits for it here.
    Backgrounded { pid: Pid },
}

/// A name with a `/` is used as is. Otherwise every `PATH` directory is searched in
/// order, and the first executable regular file wins.
#[must_use]
pub fn resolve_program(name: &str, env: &Environment) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    if name.contains('/') {
        let path = PathBuf::from(name);
        return is_executable_file(&path).then_some(path);
    }
    env.path_dirs()
        .map(|dir| Path::new(dir).join(name))
        .find(|path| is_executable_file(path))
}

fn is_executable_file(path: &Path) -> bool {
    fs::metadata(path)
        .is_ok_and(|it| it.is_file() && it.permissions().mode() & 0o111 != 0)
}

/// Everything the child needs, allocated before `fork`.
#[derive(Debug)]
struct ExecPlan {
    program: CString,
    argv: Vec<CString>,
    envp: Vec<CString>,
    redirections: Vec<PreparedRedirection>,
    exec_failure_message: Vec<u8>,
}

impl ExecPlan {
    fn try_new(request: &JobRequest, program: &Path, env: &Environment) -> ShellResult<Self> {
        let program = CString::new(program.as_os_str().as_bytes()).map_err(nul_error)?;
        let argv = request
            .argv
            .iter()
            .map(|it| CString::new(it.as_bytes()).map_err(nul_error))
            .collect::<ShellResult<Vec<_>>>()?;
        let redirections = request
            .redirections
            .iter()
            .cloned()
            .map(PreparedRedirection::try_new)
            .collect::<ShellResult<Vec<_>>>()?;
        let exec_failure_message =
            format!("shell: cannot execute '{}'\n", program.to_string_lossy()).into_bytes();
        Ok(Self {
            program,
            argv,
            envp: env.to_envp(),
            redirections,
            exec_failure_message,
        })
    }
}

fn nul_error(error: std::ffi::NulError) -> ShellError {
    ShellError::Io(io::Error::new(io::ErrorKind::InvalidInput, error))
}

/// Fork and exec `request`.
///
/// `terminal` is `Some` in interactive mode, and then a foreground job owns the
/// terminal until it exits or stops.
///
/// # Errors
///
/// - [`ShellError::PathNotFound`] if the program can't be resolved. Nothing is forked.
/// - [`ShellError::Sys`] if `fork` or `waitpid` fail.
///
/// A redirection that can't be opened is not an error here: the child exits with `1`.
pub fn run_job(
    request: &JobRequest,
    env: &Environment,
    terminal: Option<&ForegroundTerminal>,
) -> ShellResult<JobOutcome> {
    let name = request.program().unwrap_or_default();
    let Some(program) = resolve_program(name, env) else {
        return Err(ShellError::PathNotFound {
            command: name.to_string(),
        });
    };
    let plan = ExecPlan::try_new(request, &program, env)?;

    let sigchld_guard = SigchldBlockGuard::try_block()?;

    // SAFETY: the child branch only makes async-signal-safe calls on memory that was
    // allocated before the fork, and then execs or exits.
    let child = match unsafe { fork() }? {
        ForkResult::Child => exec_child(&plan),
        ForkResult::Parent { child } => child,
    };

    // Also done in the child, whichever runs first wins. EACCES after the child has
    // exec'd is harmless.
    let _ = setpgid(child, child);

    DEBUG_JOB_MOD.then(|| {
        // % is Display, ? is Debug.
        tracing::debug!(
            message = "forked",
            pid = %child,
            program = %program.display(),
            class = %request.class,
            redirections = ?request.redirections
        );
    });

    match request.class {
        JobClass::Background => {
            drop(sigchld_guard);
            Ok(JobOutcome::Backgrounded { pid: child })
        }
        JobClass::Foreground => {
            if let Some(terminal) = terminal {
                terminal.give_to(child)?;
            }
            let status = wait_for_foreground(child);
            if let Some(terminal) = terminal {
                terminal.reclaim()?;
            }
            drop(sigchld_guard);
            let status = status?;
            DEBUG_JOB_MOD.then(|| {
                tracing::debug!(message = "foreground job done", pid = %child, status = %status);
            });
            Ok(JobOutcome::Completed { pid: child, status })
        }
    }
}

fn wait_for_foreground(pid: Pid) -> ShellResult<JobStatus> {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Ok(wait_status) => {
                if let Some(status) = JobStatus::from_wait_status(wait_status) {
                    return Ok(status);
                }
            }
            Err(Errno::EINTR) => {}
            Err(error) => return Err(error.into()),
        }
    }
}

fn exec_child(plan: &ExecPlan) -> ! {
    let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
    reset_signals_for_child();

    for it in &plan.redirections {
        if it.apply().is_err() {
            write_stderr(it.failure_message());
            unsafe { nix::libc::_exit(1) };
        }
    }

    let _ = execve::<CString, CString>(plan.program.as_c_str(), &plan.argv, &plan.envp);
    write_stderr(&plan.exec_failure_message);
    unsafe { nix::libc::_exit(EXIT_STATUS_NOT_FOUND) }
}

/// Raw `write(2)`. The child must not take the lock behind [`std::io::stderr`], and
/// [`std::os::fd::AsFd`] on it does not.
fn write_stderr(bytes: &[u8]) { let _unused = write(io::stderr(), bytes); }

#[cfg(test)]
mod tests_job_driver {
    use std::fs;

    use pretty_assertions::assert_eq;
    use r3bl_test_fixtures::create_temp_dir;

    use super::*;
    use crate::{EnvKeys, RedirectOp};

    fn argv(items: &[&str]) -> Argv { items.iter().map(ToString::to_string).collect() }

    fn test_env() -> Environment {
        let mut env = Environment::new();
        env.set_key(EnvKeys::Path, "/bin:/usr/bin").unwrap();
        env
    }

    #[test]
    fn test_request_from_argv() {
        let it = JobRequest::from_argv(argv(&["cmd", "arg", ">", "/tmp/out", "&"]));
        assert_eq!(it.argv, argv(&["cmd", "arg"]));
        assert_eq!(it.class, JobClass::Background);
        assert_eq!(
            it.redirections,
            vec![Redirection {
                op: RedirectOp::StdoutTruncate,
                path: "/tmp/out".into()
            }]
        );
        assert_eq!(it.program(), Some("cmd"));

        let it = JobRequest::from_argv(argv(&["ls", "a&"]));
        assert_eq!(it.class, JobClass::Foreground);
        assert_eq!(it.argv, argv(&["ls", "a&"]));
    }

    #[test]
    fn test_request_from_tokens_keeps_quoted_markers() {
        let tokens = TokenizedLine {
            argv: argv(&["echo", ">", "x", "&"]),
            bare: vec![true, false, true, false],
            errors: vec![],
        };
        let it = JobRequest::from_tokens(tokens);
        assert_eq!(it.argv, argv(&["echo", ">", "x", "&"]));
        assert_eq!(it.class, JobClass::Foreground);
        assert!(it.redirections.is_empty());
    }

    #[test]
    fn test_resolve_program() {
        let env = test_env();
        assert!(resolve_program("sh", &env).is_some());
        assert_eq!(resolve_program("/bin/sh", &env), Some(PathBuf::from("/bin/sh")));
        assert_eq!(resolve_program("definitely-not-a-command-xyz", &env), None);
        assert_eq!(resolve_program("", &env), None);
        assert_eq!(resolve_program("/etc/hostname-not-there", &env), None);
    }

    #[test]
    fn test_unknown_command_does_not_fork() {
        let request = JobRequest::from_argv(argv(&["definitely-not-a-command-xyz"]));
        let result = run_job(&request, &test_env(), None);
        assert!(matches!(result, Err(ShellError::PathNotFound { .. })));
    }

    #[test]
    fn test_foreground_exit_codes() {
        let env = test_env();
        let status = |line: &[&str]| match run_job(&JobRequest::from_argv(argv(line)), &env, None) {
            Ok(JobOutcome::Completed { status, .. }) => status,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(status(&["true"]), JobStatus::Exited(0));
        assert_eq!(status(&["false"]), JobStatus::Exited(1));
        assert_eq!(status(&["sh", "-c", "exit 42"]), JobStatus::Exited(42));
        assert_eq!(status(&["sh", "-c", "kill -9 $$"]), JobStatus::Signaled(9));
    }

    #[test]
    fn test_redirect_stdout_truncate_then_append() {
        let dir = create_temp_dir().unwrap();
        let out = dir.join("out.txt");
        let out_str = out.to_str().unwrap();
        let env = test_env();

        let run = |line: &[&str]| run_job(&JobRequest::from_argv(argv(line)), &env, None).unwrap();
        run(&["echo", "one", ">", out_str]);
        run(&["echo", "two", ">>", out_str]);
        assert_eq!(fs::read_to_string(&out).unwrap(), "one\ntwo\n");

        run(&["echo", "three", ">", out_str]);
        assert_eq!(fs::read_to_string(&out).unwrap(), "three\n");
    }

    #[test]
    fn test_redirect_both_streams() {
        let dir = create_temp_dir().unwrap();
        let out = dir.join("both.txt");
        let env = test_env();

        let request = JobRequest::from_argv(argv(&[
            "sh",
            "-c",
            "echo out; echo err 1>&2",
            "&>",
            out.to_str().unwrap(),
        ]));
        run_job(&request, &env, None).unwrap();

        let contents = fs::read_to_string(&out).unwrap();
        assert!(contents.contains("out\n"));
        assert!(contents.contains("err\n"));
    }

    #[test]
    fn test_redirect_open_failure_exits_1() {
        let env = test_env();
        let request = JobRequest::from_argv(argv(&[
            "echo",
            "x",
            ">",
            "/definitely/not/a/dir/out.txt",
        ]));
        let outcome = run_job(&request, &env, None).unwrap();
        assert!(matches!(
            outcome,
            JobOutcome::Completed {
                status: JobStatus::Exited(1),
                ..
            }
        ));
    }

    #[test]
    fn test_background_returns_immediately() {
        let env = test_env();
        let request = JobRequest::from_argv(argv(&["sleep", "0.2", "&"]));
        let start = std::time::Instant::now();
        let outcome = run_job(&request, &env, None).unwrap();
        assert!(start.elapsed() < std::time::Duration::from_millis(150));

        let JobOutcome::Backgrounded { pid } = outcome else {
            panic!("expected background job");
        };
        let status = waitpid(pid, None).unwrap();
        assert_eq!(JobStatus::from_wait_status(status), Some(JobStatus::Exited(0)));
    }
}
