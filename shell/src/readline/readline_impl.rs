// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{fmt,
          io::{self, Read, Write},
          sync::{Arc, Mutex as StdMutex, PoisonError}};

use thiserror::Error;

use super::{DEBUG_READLINE_MOD, DelKeyBehavior, DEFAULT_LINE_CAPACITY, EditContext,
            KeyDecoder, LineState, apply_key};
use crate::{CompletionContext, HistoryNavigator, HistoryRing, take_interrupt};

/// Size of one `read(2)` from the terminal. A full read means more bytes are likely
/// waiting.
const READ_BUFFER_SIZE: usize = 64;

/// Where the editor echoes. Shared with the rest of the shell so that prompts, job
/// notifications, and the echo all go through the same lock.
pub type SafeRawTerminal = Arc<StdMutex<dyn Write + Send>>;

/// Error returned from [`readline()`][Readline::readline].
#[derive(Debug, Error, miette::Diagnostic)]
pub enum ReadlineError {
    #[error(transparent)]
    #[diagnostic(code(r3bl_shell::readline::io))]
    IO(#[from] io::Error),

    /// `readline()` was called after the input already reported end of file.
    #[error("input closed")]
    #[diagnostic(code(r3bl_shell::readline::closed))]
    Closed,
}

/// Events emitted by [`Readline::readline()`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ReadlineEvent {
    /// The user entered a line of text (possibly empty).
    Line(String),
    /// `Ctrl+D` on an empty line, or the input reached end of file.
    Eof,
    /// `Ctrl+C`, either as a byte or as a `SIGINT` that interrupted the read.
    Interrupted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadlineOptions {
    /// Bytes per line, including one reserved cell.
    pub line_capacity: usize,
    pub del_key: DelKeyBehavior,
}

impl Default for ReadlineOptions {
    fn default() -> Self {
        Self {
            line_capacity: DEFAULT_LINE_CAPACITY,
            del_key: DelKeyBehavior::default(),
        }
    }
}

/// Blocking line editor over any byte source. The terminal is expected to already be
/// in editing mode (see [`crate::TerminalModeGuard`]); this type only reads and echoes.
pub struct Readline {
    input: Box<dyn Read + Send>,
    pub safe_raw_terminal: SafeRawTerminal,
    decoder: KeyDecoder,
    line_state: LineState,
    navigator: HistoryNavigator,
    input_closed: bool,
}

impl fmt::Debug for Readline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Readline")
            .field("decoder", &self.decoder)
            .field("line_state", &self.line_state)
            .field("navigator", &self.navigator)
            .field("input_closed", &self.input_closed)
            .finish_non_exhaustive()
    }
}

impl Readline {
    #[must_use]
    pub fn new(
        input: Box<dyn Read + Send>,
        safe_raw_terminal: SafeRawTerminal,
        options: ReadlineOptions,
    ) -> Self {
        Self {
            input,
            safe_raw_terminal,
            decoder: KeyDecoder::new(options.del_key),
            line_state: LineState::new(options.line_capacity),
            navigator: HistoryNavigator::default(),
            input_closed: false,
        }
    }

    /// Read one line. Keys typed ahead (already decoded) are used first.
    ///
    /// `on_idle` runs every time the editor is about to block on the input, so the
    /// caller can do housekeeping (like reaping background jobs) between keystrokes.
    ///
    /// # Errors
    ///
    /// - [`ReadlineError::Closed`] if an earlier call already returned end of file.
    /// - [`ReadlineError::IO`] if reading or echoing fails.
    pub fn readline(
        &mut self,
        history: &HistoryRing,
        completion: &CompletionContext,
        on_idle: &mut dyn FnMut(),
    ) -> Result<ReadlineEvent, ReadlineError> {
        if self.input_closed {
            return Err(ReadlineError::Closed);
        }

        self.line_state.reset();
        self.navigator.reset(history);
        let mut read_buffer = [0_u8; READ_BUFFER_SIZE];

        loop {
            for key in self.decoder.by_ref() {
                let mut term = self
                    .safe_raw_terminal
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                let mut ctx = EditContext {
                    history,
                    navigator: &mut self.navigator,
                    completion,
                };
                if let Some(event) = apply_key(&mut self.line_state, key, &mut *term, &mut ctx)?
                {
                    term.flush()?;
                    return Ok(event);
                }
            }

            self.flush()?;
            on_idle();

            match self.input.read(&mut read_buffer) {
                Ok(0) => {
                    DEBUG_READLINE_MOD.then(|| {
                        tracing::debug!(message = "readline -> input closed");
                    });
                    self.input_closed = true;
                    self.line_state.reset();
                    return Ok(ReadlineEvent::Eof);
                }
                Ok(count) => {
                    self.decoder
                        .advance(&read_buffer[..count], count == READ_BUFFER_SIZE);
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {
                    if take_interrupt() {
                        return self.abort_line();
                    }
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// A `SIGINT` arrived while waiting for input.
    fn abort_line(&mut self) -> Result<ReadlineEvent, ReadlineError> {
        self.line_state.reset();
        let mut term = self
            .safe_raw_terminal
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        term.write_all(b"\n")?;
        term.flush()?;
        Ok(ReadlineEvent::Interrupted)
    }

    fn flush(&self) -> io::Result<()> {
        self.safe_raw_terminal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}
