// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! One dispatch is: read a line, tokenize it, run it, record the status. [`Shell`]
//! owns everything that lives across dispatches.

use std::{fs::File,
          io::{BufRead, BufReader, Write},
          path::{Path, PathBuf},
          sync::PoisonError};

use chrono::Local;
use nix::unistd::Pid;

use super::{Builtin, DEBUG_DISPATCH_MOD, builtin_cd, builtin_exit, builtin_export,
            builtin_history, render_prompt};
use crate::{CompletionContext, EnvKeys, Environment, ExpandContext, ForegroundTerminal,
            HistoryRing, JobOutcome, JobRequest, JobStatus, JobTable, Readline,
            ReadlineError, ReadlineEvent, SafeRawTerminal, ShellConfig, ShellError,
            ShellResult, SignalFlags, TerminalModeGuard, is_separator, run_job, tokenize};

/// A line whose first non blank character is this is ignored.
pub const COMMENT_MARKER: char = '#';

/// The interactive loop gives up after this many terminal read failures in a row.
const MAX_CONSECUTIVE_READ_ERRORS: usize = 3;

const PARENT_DIR: &str = "..";

/// What happened to one line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchFlow {
    /// Blank line or comment.
    Skipped,
    /// A command ran in the foreground (or failed to start) with this status.
    Ran(i32),
    /// A background job was started. `$?` is untouched.
    Backgrounded(Pid),
    /// The `exit` built-in ran.
    Exit(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptOutcome {
    /// Every line ran. `last_failure` is the last non zero status, else `0`.
    Completed { last_failure: i32 },
    /// The script ran `exit`.
    Exited(i32),
}

/// Set the variables the shell provides to its children.
pub fn prepare_environment(env: &mut Environment) {
    if let Ok(exe) = std::env::current_exe() {
        let _ = env.set_key(EnvKeys::Shell, &exe.to_string_lossy());
    }
    if let Ok(cwd) = std::env::current_dir() {
        let _ = env.set_key(EnvKeys::Pwd, &cwd.to_string_lossy());
    }
}

pub struct Shell {
    pub config: ShellConfig,
    pub env: Environment,
    pub history: HistoryRing,
    pub jobs: JobTable,
    /// `$?`: status of the most recent foreground command.
    pub last_status: i32,
    out: SafeRawTerminal,
    err: SafeRawTerminal,
    /// `Some` when the shell controls a terminal (interactive on a tty).
    terminal: Option<ForegroundTerminal>,
    signal_flags: Option<SignalFlags>,
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("config", &self.config)
            .field("env", &self.env)
            .field("history", &self.history)
            .field("jobs", &self.jobs)
            .field("last_status", &self.last_status)
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

impl Shell {
    #[must_use]
    pub fn new(
        config: ShellConfig,
        env: Environment,
        out: SafeRawTerminal,
        err: SafeRawTerminal,
    ) -> Self {
        let history = HistoryRing::new(config.history_capacity, config.history_entry_size);
        Self {
            config,
            env,
            history,
            jobs: JobTable::default(),
            last_status: 0,
            out,
            err,
            terminal: None,
            signal_flags: None,
        }
    }

    #[must_use]
    pub fn with_foreground_terminal(mut self, terminal: Option<ForegroundTerminal>) -> Self {
        self.terminal = terminal;
        self
    }

    /// Without flags, background jobs are reaped on every idle tick.
    #[must_use]
    pub fn with_signal_flags(mut self, signal_flags: SignalFlags) -> Self {
        self.signal_flags = Some(signal_flags);
        self
    }

    /// Run one line as if it was typed.
    pub fn dispatch_line(&mut self, line: &str) -> DispatchFlow {
        let trimmed = line.trim_start_matches(is_separator);
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
            return DispatchFlow::Skipped;
        }

        let tokenized = tokenize(line, &ExpandContext {
            env: &self.env,
            last_status: self.last_status,
        });
        for error in &tokenized.errors {
            // Malformed `${` only truncates the token.
            tracing::debug!(message = "expansion error", error = %error);
        }

        let request = JobRequest::from_tokens(tokenized);
        if request.argv.iter().all(String::is_empty) {
            return DispatchFlow::Skipped;
        }

        DEBUG_DISPATCH_MOD.then(|| {
            // % is Display, ? is Debug.
            tracing::debug!(
                message = "dispatch",
                argv = ?request.argv,
                class = %request.class,
                redirections = ?request.redirections,
                last_status = %self.last_status
            );
        });

        match request.program().and_then(Builtin::parse) {
            Some(builtin) => self.run_builtin(builtin, &request.argv[1..]),
            None => self.run_external(&request),
        }
    }

    fn run_builtin(&mut self, builtin: Builtin, args: &[String]) -> DispatchFlow {
        let result: ShellResult<i32> = match builtin {
            Builtin::Cd => builtin_cd(args, &mut self.env).map(|_| 0),
            Builtin::Up => builtin_cd(&[PARENT_DIR.to_string()], &mut self.env).map(|_| 0),
            Builtin::Export => {
                builtin_export(args, &mut self.env);
                Ok(0)
            }
            Builtin::Init => Ok(0),
            Builtin::History => {
                let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
                builtin_history(&self.history, &mut *out)
                    .and_then(|()| out.flush())
                    .map(|()| 0)
                    .map_err(ShellError::from)
            }
            Builtin::Exit => builtin_exit(args, self.last_status),
        };

        match (builtin, result) {
            (Builtin::Exit, Ok(code)) => DispatchFlow::Exit(code),
            (_, Ok(status)) => {
                self.last_status = status;
                DispatchFlow::Ran(status)
            }
            (_, Err(error)) => self.fail(&error),
        }
    }

    fn run_external(&mut self, request: &JobRequest) -> DispatchFlow {
        let command = request.argv.join(" ");
        match run_job(request, &self.env, self.terminal.as_ref()) {
            Ok(JobOutcome::Backgrounded { pid }) => {
                self.jobs.add(pid, command);
                self.write_out(&format!("[{pid}]\n"));
                DispatchFlow::Backgrounded(pid)
            }
            Ok(JobOutcome::Completed { pid, status }) => match status {
                JobStatus::Exited(code) => {
                    self.last_status = code;
                    DispatchFlow::Ran(code)
                }
                JobStatus::Signaled(_) => {
                    self.write_err(&format!("\n[{pid}] {status}  {command}\n"));
                    DispatchFlow::Ran(status.exit_code())
                }
                JobStatus::Stopped(_) => {
                    self.write_err(&format!("\n[{pid}] {status}  {command}\n"));
                    self.jobs.add(pid, command);
                    DispatchFlow::Ran(status.exit_code())
                }
            },
            Err(error) => self.fail(&error),
        }
    }

    /// Report `error`, and make its status the new `$?`. Usage errors go to stdout.
    fn fail(&mut self, error: &ShellError) -> DispatchFlow {
        let message = format!("{error}\n");
        match error {
            ShellError::TooManyArgs { .. } => self.write_out(&message),
            _ => self.write_err(&message),
        }
        let status = error.exit_status();
        self.last_status = status;
        DispatchFlow::Ran(status)
    }

    /// Reap, then print a line per background job that finished since the last call.
    pub fn report_finished_jobs(&mut self) {
        self.jobs.reap();
        for job in self.jobs.drain_finished() {
            self.write_out(&format!("{job}\n"));
        }
    }

    /// Read, dispatch, repeat, until end of input or `exit`. Returns the exit status of
    /// the shell.
    pub fn run_interactive(&mut self, readline: &mut Readline) -> i32 {
        self.run_rc_file();

        let mut consecutive_read_errors = 0;
        loop {
            self.report_finished_jobs();

            let cwd = current_dir_or_pwd(&self.env);
            self.write_out(&render_prompt(&self.env, &cwd, Local::now()));
            let completion = CompletionContext {
                cwd,
                path_var: self.env.path_value().to_string(),
            };

            let event = {
                let _mode_guard = self.terminal.is_some().then(|| {
                    TerminalModeGuard::try_new()
                        .inspect_err(|report| {
                            tracing::warn!(message = "no editing mode", error = %report);
                        })
                        .ok()
                });
                let jobs = &mut self.jobs;
                let signal_flags = self.signal_flags.as_ref();
                let mut on_idle = || {
                    if signal_flags.is_none_or(SignalFlags::take_child_exited) {
                        jobs.reap();
                    }
                };
                readline.readline(&self.history, &completion, &mut on_idle)
            };

            match event {
                Ok(ReadlineEvent::Line(line)) => {
                    consecutive_read_errors = 0;
                    let flow = self.dispatch_line(&line);
                    if !line.trim_matches(is_separator).is_empty() {
                        self.history.push_back(&line);
                    }
                    if let DispatchFlow::Exit(code) = flow {
                        return code;
                    }
                }
                Ok(ReadlineEvent::Interrupted) => consecutive_read_errors = 0,
                Ok(ReadlineEvent::Eof) | Err(ReadlineError::Closed) => return self.last_status,
                Err(ReadlineError::IO(error)) => {
                    tracing::warn!(message = "terminal read failed", error = %error);
                    self.write_err(&format!("{error}\n"));
                    consecutive_read_errors += 1;
                    if consecutive_read_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                        return self.last_status;
                    }
                }
            }
        }
    }

    /// Run the rc file from the current directory, if there is one.
    fn run_rc_file(&mut self) {
        let path = current_dir_or_pwd(&self.env).join(&self.config.rc_file_name);
        if !path.is_file() {
            return;
        }
        DEBUG_DISPATCH_MOD.then(|| {
            tracing::debug!(message = "running rc file", path = %path.display());
        });
        if let Err(error) = self.run_script_file(&path) {
            self.write_err(&format!("{}: {error}\n", path.display()));
        }
    }

    /// Dispatch every line of `reader`. A failing line is reported as
    /// `<name>:<line>: exit status <n>` on stderr, and the script goes on.
    pub fn run_script(&mut self, name: &str, reader: impl BufRead) -> ScriptOutcome {
        let mut last_failure = 0;
        for (index, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(it) => it,
                Err(error) => {
                    self.write_err(&format!("{name}: {error}\n"));
                    last_failure = 1;
                    break;
                }
            };
            match self.dispatch_line(&line) {
                DispatchFlow::Exit(code) => return ScriptOutcome::Exited(code),
                DispatchFlow::Ran(status) if status != 0 => {
                    self.write_err(&format!("{name}:{}: exit status {status}\n", index + 1));
                    last_failure = status;
                }
                DispatchFlow::Ran(_) | DispatchFlow::Skipped | DispatchFlow::Backgrounded(_) => {}
            }
        }
        ScriptOutcome::Completed { last_failure }
    }

    /// # Errors
    ///
    /// Returns an error if the file can't be opened.
    pub fn run_script_file(&mut self, path: &Path) -> ShellResult<ScriptOutcome> {
        let file = File::open(path)?;
        let name = path.display().to_string();
        Ok(self.run_script(&name, BufReader::new(file)))
    }

    /// Run each file in order. Returns the last non zero status, else `0`, or the code
    /// passed to `exit`.
    pub fn run_script_files(&mut self, paths: &[PathBuf]) -> i32 {
        let mut last_failure = 0;
        for path in paths {
            match self.run_script_file(path) {
                Ok(ScriptOutcome::Exited(code)) => return code,
                Ok(ScriptOutcome::Completed { last_failure: 0 }) => {}
                Ok(ScriptOutcome::Completed { last_failure: it }) => last_failure = it,
                Err(error) => {
                    self.write_err(&format!("{}: {error}\n", path.display()));
                    last_failure = 1;
                }
            }
        }
        // Background jobs that are already done get reported.
        self.report_finished_jobs();
        last_failure
    }

    fn write_out(&self, text: &str) { write_to(&self.out, text); }

    fn write_err(&self, text: &str) { write_to(&self.err, text); }
}

fn write_to(terminal: &SafeRawTerminal, text: &str) {
    let mut it = terminal.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(error) = it.write_all(text.as_bytes()).and_then(|()| it.flush()) {
        tracing::warn!(message = "write failed", error = %error);
    }
}

fn current_dir_or_pwd(env: &Environment) -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| {
        PathBuf::from(env.get_key(EnvKeys::Pwd).unwrap_or("/"))
    })
}

#[cfg(test)]
mod tests_shell {
    use std::{fs,
              io::Cursor,
              sync::{Arc, Mutex as StdMutex},
              thread,
              time::{Duration, Instant}};

    use pretty_assertions::assert_eq;
    use r3bl_test_fixtures::{ByteStreamMock, StdoutMock, create_temp_dir};

    use super::*;
    use crate::ReadlineOptions;

    struct Fixture {
        shell: Shell,
        out: StdoutMock,
        err: StdoutMock,
    }

    fn fixture() -> Fixture {
        let out = StdoutMock::new();
        let err = StdoutMock::new();
        let out_terminal: SafeRawTerminal = Arc::new(StdMutex::new(out.clone()));
        let err_terminal: SafeRawTerminal = Arc::new(StdMutex::new(err.clone()));
        let shell = Shell::new(
            ShellConfig::default(),
            Environment::from_process(),
            out_terminal,
            err_terminal,
        );
        Fixture { shell, out, err }
    }

    fn wait_for_reap(shell: &mut Shell) -> Vec<String> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut reported = vec![];
        while shell.jobs.running_count() > 0 && Instant::now() < deadline {
            shell.jobs.reap();
            reported.extend(shell.jobs.drain_finished().iter().map(ToString::to_string));
            thread::sleep(Duration::from_millis(10));
        }
        reported
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        let mut it = fixture();
        assert_eq!(it.shell.dispatch_line(""), DispatchFlow::Skipped);
        assert_eq!(it.shell.dispatch_line(" \t "), DispatchFlow::Skipped);
        assert_eq!(it.shell.dispatch_line("  # ls"), DispatchFlow::Skipped);
        assert_eq!(it.shell.dispatch_line("$NO_SUCH_VARIABLE_HERE"), DispatchFlow::Skipped);
    }

    #[test]
    fn test_last_status_is_expanded() {
        let mut it = fixture();
        let dir = create_temp_dir().unwrap();
        let out_file = dir.join("status.txt");

        assert_eq!(it.shell.dispatch_line("false"), DispatchFlow::Ran(1));
        let line = format!("echo $? > {}", out_file.display());
        assert_eq!(it.shell.dispatch_line(&line), DispatchFlow::Ran(0));
        assert_eq!(fs::read_to_string(&out_file).unwrap(), "1\n");

        // The echo succeeded, so now `$?` is 0.
        let line = format!("echo $? >> {}", out_file.display());
        it.shell.dispatch_line(&line);
        assert_eq!(fs::read_to_string(&out_file).unwrap(), "1\n0\n");
    }

    #[test]
    fn test_quoted_operators_are_arguments() {
        let mut it = fixture();
        let dir = create_temp_dir().unwrap();
        let out_file = dir.join("out.txt");

        let line = format!(r#"echo ">" "&" a\>b > {}"#, out_file.display());
        assert_eq!(it.shell.dispatch_line(&line), DispatchFlow::Ran(0));
        assert_eq!(fs::read_to_string(&out_file).unwrap(), "> & a>b\n");
        assert_eq!(it.shell.jobs.running_count(), 0);
    }

    #[test]
    fn test_unknown_command() {
        let mut it = fixture();
        let flow = it.shell.dispatch_line("no_such_command_r3bl_shell arg");
        assert_eq!(flow, DispatchFlow::Ran(127));
        assert_eq!(it.shell.last_status, 127);
        assert_eq!(
            it.err.get_copy_of_buffer_as_string(),
            "Unknown command: no_such_command_r3bl_shell\n"
        );
    }

    #[test]
    fn test_signaled_job_keeps_status() {
        let mut it = fixture();
        it.shell.dispatch_line(r#"sh -c "exit 5""#);
        assert_eq!(it.shell.last_status, 5);

        let flow = it.shell.dispatch_line(r#"sh -c "kill -9 $$""#);
        assert_eq!(flow, DispatchFlow::Ran(128 + 9));
        assert_eq!(it.shell.last_status, 5);
        assert!(it.err.get_copy_of_buffer_as_string().contains("Killed (signal 9)"));
    }

    #[test]
    fn test_background_does_not_touch_status() {
        let mut it = fixture();
        let dir = create_temp_dir().unwrap();
        let out_file = dir.join("out");

        it.shell.dispatch_line("false");
        let line = format!("echo arg > {} &", out_file.display());
        let DispatchFlow::Backgrounded(pid) = it.shell.dispatch_line(&line) else {
            panic!("expected a background job");
        };
        assert_eq!(it.out.get_copy_of_buffer_as_string(), format!("[{pid}]\n"));
        assert_eq!(it.shell.jobs.running_count(), 1);

        let reported = wait_for_reap(&mut it.shell);
        assert_eq!(reported, vec![format!("[{pid}] Done (0)  echo arg")]);
        assert_eq!(it.shell.last_status, 1);
        assert_eq!(fs::read_to_string(&out_file).unwrap(), "arg\n");
    }

    #[test]
    fn test_export_then_expand() {
        let mut it = fixture();
        let dir = create_temp_dir().unwrap();
        let out_file = dir.join("out");

        it.shell.dispatch_line("export GREETING=hello BAD");
        let line = format!("echo ${{GREETING}} world > {}", out_file.display());
        it.shell.dispatch_line(&line);
        assert_eq!(fs::read_to_string(&out_file).unwrap(), "hello world\n");
    }

    #[test]
    fn test_builtin_errors() {
        let mut it = fixture();
        assert_eq!(it.shell.dispatch_line("cd a b"), DispatchFlow::Ran(1));
        assert_eq!(
            it.out.get_copy_of_buffer_as_string(),
            "cd: too many arguments, usage: cd [dir]\n"
        );

        it.shell.env.unset("HOME");
        assert_eq!(it.shell.dispatch_line("cd $HOME"), DispatchFlow::Ran(1));
        assert_eq!(it.err.get_copy_of_buffer_as_string(), "cd: HOME not set\n");
    }

    #[test]
    fn test_exit_and_init() {
        let mut it = fixture();
        assert_eq!(it.shell.dispatch_line("init"), DispatchFlow::Ran(0));
        assert_eq!(it.shell.dispatch_line("exit 3"), DispatchFlow::Exit(3));
        assert_eq!(it.shell.dispatch_line("exit nope"), DispatchFlow::Ran(1));
    }

    #[test]
    fn test_script_reports_failures_and_continues() {
        let mut it = fixture();
        let script = "#!/bin/shell\ntrue\nfalse\n\n# comment\ntrue\n";
        let outcome = it.shell.run_script("demo.sh", Cursor::new(script));
        assert_eq!(outcome, ScriptOutcome::Completed { last_failure: 1 });
        assert_eq!(it.err.get_copy_of_buffer_as_string(), "demo.sh:3: exit status 1\n");
    }

    #[test]
    fn test_script_exit_stops_it() {
        let mut it = fixture();
        let script = "exit 4\nfalse\n";
        let outcome = it.shell.run_script("demo.sh", Cursor::new(script));
        assert_eq!(outcome, ScriptOutcome::Exited(4));
        assert!(it.err.get_copy_of_buffer_as_string().is_empty());
    }

    #[test]
    fn test_missing_script_file() {
        let mut it = fixture();
        let status = it
            .shell
            .run_script_files(&[PathBuf::from("/no/such/script/r3bl_shell.sh")]);
        assert_eq!(status, 1);
        assert!(
            it.err
                .get_copy_of_buffer_as_string()
                .starts_with("/no/such/script/r3bl_shell.sh: ")
        );
    }

    #[test]
    fn test_interactive_session_records_history() {
        let mut it = fixture();
        let input = ByteStreamMock::from_chunks([
            b"true\r".as_slice(),
            b"  \r",
            b"false\r",
            b"\x1b[A\x1b[A\r",
        ]);
        let out_terminal: SafeRawTerminal = Arc::new(StdMutex::new(it.out.clone()));
        let mut readline =
            Readline::new(Box::new(input), out_terminal, ReadlineOptions::default());

        let status = it.shell.run_interactive(&mut readline);

        // Two ups from an empty line recall "true" and run it again, then end of input.
        assert_eq!(status, 0);
        let entries: Vec<&str> = it.shell.history.iter().collect();
        assert_eq!(entries, vec!["true", "false", "true"]);
        assert!(it.out.get_copy_of_buffer_as_string().contains("\n-> "));
    }

    #[test]
    fn test_interactive_exit_builtin() {
        let mut it = fixture();
        let input = ByteStreamMock::from_chunks([b"exit 7\r".as_slice(), b"false\r"]);
        let out_terminal: SafeRawTerminal = Arc::new(StdMutex::new(it.out.clone()));
        let mut readline =
            Readline::new(Box::new(input), out_terminal, ReadlineOptions::default());

        assert_eq!(it.shell.run_interactive(&mut readline), 7);
        assert_eq!(it.shell.last_status, 0);
    }
}
