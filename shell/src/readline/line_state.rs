// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The line being edited, and the cursor in it. Every edit writes its visual effect to
//! `term` before it returns, so that the terminal cursor column always matches
//! [`LineState::cursor`] (relative to where the line started, right after the prompt).
//!
//! The buffer only ever holds printable ASCII, so one byte is one column.

use std::{borrow::Cow,
          io::{self, Write}};

use super::{ASCII_BACKSPACE, write_cursor_backward, write_cursor_forward};

/// Default line capacity, including the one cell that the terminator of a C string would
/// take. So a line holds at most `DEFAULT_LINE_CAPACITY - 1` bytes.
pub const DEFAULT_LINE_CAPACITY: usize = 256;

/// The only bytes the buffer holds. One byte, one column.
#[must_use]
pub fn is_printable_ascii(byte: u8) -> bool { (0x20..=0x7e).contains(&byte) }

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineState {
    buffer: Vec<u8>,
    /// `0 <= cursor <= buffer.len()`.
    cursor: usize,
    /// `buffer.len() <= line_max`.
    line_max: usize,
    overwrite: bool,
}

impl Default for LineState {
    fn default() -> Self { Self::new(DEFAULT_LINE_CAPACITY) }
}

impl LineState {
    #[must_use]
    pub fn new(line_capacity: usize) -> Self {
        let line_max = line_capacity.saturating_sub(1).max(1);
        Self {
            buffer: Vec::with_capacity(line_max),
            cursor: 0,
            line_max,
            overwrite: false,
        }
    }

    /// The text of the line. Inserts keep the buffer ASCII, so this borrows.
    #[must_use]
    pub fn line(&self) -> Cow<'_, str> { String::from_utf8_lossy(&self.buffer) }

    #[must_use]
    pub fn cursor(&self) -> usize { self.cursor }

    #[must_use]
    pub fn len(&self) -> usize { self.buffer.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.buffer.is_empty() }

    #[must_use]
    pub fn line_max(&self) -> usize { self.line_max }

    #[must_use]
    pub fn is_overwrite(&self) -> bool { self.overwrite }

    pub fn toggle_overwrite(&mut self) { self.overwrite = !self.overwrite; }

    /// Start a new line. The overwrite toggle is kept.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    /// Echo the newline and hand over the line. The state is reset.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn finish(&mut self, term: &mut dyn Write) -> io::Result<String> {
        term.write_all(b"\n")?;
        let line = self.line().into_owned();
        self.reset();
        Ok(line)
    }

    /// Insert (or overwrite) at the cursor. A full line ignores inserts, and so does a
    /// byte that is not printable ASCII.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn insert_byte(&mut self, byte: u8, term: &mut dyn Write) -> io::Result<()> {
        if !is_printable_ascii(byte) {
            return Ok(());
        }
        if self.overwrite && self.cursor < self.buffer.len() {
            self.buffer[self.cursor] = byte;
            term.write_all(&[byte])?;
            self.cursor += 1;
            return Ok(());
        }
        self.insert_bytes(&[byte], term)
    }

    /// Insert at the cursor, shifting the rest of the line right, regardless of the
    /// overwrite toggle. Bytes that are not printable ASCII are left out, and bytes that
    /// don't fit are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn insert_bytes(&mut self, bytes: &[u8], term: &mut dyn Write) -> io::Result<()> {
        let room = self.line_max - self.buffer.len();
        let bytes: Vec<u8> = bytes
            .iter()
            .copied()
            .filter(|it| is_printable_ascii(*it))
            .take(room)
            .collect();
        if bytes.is_empty() {
            return Ok(());
        }

        let inserted = bytes.len();
        self.buffer.splice(self.cursor..self.cursor, bytes);
        term.write_all(&self.buffer[self.cursor..])?;
        self.cursor += inserted;
        write_cursor_backward(term, self.buffer.len() - self.cursor)
    }

    /// Delete left of the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn backspace(&mut self, term: &mut dyn Write) -> io::Result<()> {
        if self.cursor == 0 {
            return Ok(());
        }
        self.cursor -= 1;
        self.buffer.remove(self.cursor);
        term.write_all(&[ASCII_BACKSPACE])?;
        self.redraw_tail_after_delete(term)
    }

    /// Delete under the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn delete_forward(&mut self, term: &mut dyn Write) -> io::Result<()> {
        if self.cursor >= self.buffer.len() {
            return Ok(());
        }
        self.buffer.remove(self.cursor);
        self.redraw_tail_after_delete(term)
    }

    /// The terminal cursor is at `self.cursor`, the line got one byte shorter. Reprint
    /// the tail, blank the stale last column, and come back.
    fn redraw_tail_after_delete(&self, term: &mut dyn Write) -> io::Result<()> {
        let tail = &self.buffer[self.cursor..];
        term.write_all(tail)?;
        term.write_all(b" ")?;
        write_cursor_backward(term, tail.len() + 1)
    }

    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn move_left(&mut self, term: &mut dyn Write) -> io::Result<()> {
        if self.cursor == 0 {
            return Ok(());
        }
        self.cursor -= 1;
        write_cursor_backward(term, 1)
    }

    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn move_right(&mut self, term: &mut dyn Write) -> io::Result<()> {
        if self.cursor >= self.buffer.len() {
            return Ok(());
        }
        self.cursor += 1;
        write_cursor_forward(term, 1)
    }

    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn move_home(&mut self, term: &mut dyn Write) -> io::Result<()> {
        let distance = self.cursor;
        self.cursor = 0;
        write_cursor_backward(term, distance)
    }

    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn move_end(&mut self, term: &mut dyn Write) -> io::Result<()> {
        let distance = self.buffer.len() - self.cursor;
        self.cursor = self.buffer.len();
        write_cursor_forward(term, distance)
    }

    /// Blank the line on screen, then empty it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn kill_line(&mut self, term: &mut dyn Write) -> io::Result<()> {
        self.erase_display(term)?;
        self.reset();
        Ok(())
    }

    /// Blank the line on screen and print `text` instead, with the cursor at the end.
    /// Non printable bytes are left out, and the text is cut at the line max.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn replace_line(&mut self, text: &str, term: &mut dyn Write) -> io::Result<()> {
        self.erase_display(term)?;
        self.buffer.clear();
        self.buffer.extend(
            text.bytes()
                .filter(|it| is_printable_ascii(*it))
                .take(self.line_max),
        );
        term.write_all(&self.buffer)?;
        self.cursor = self.buffer.len();
        Ok(())
    }

    /// Cursor to the start of the line, spaces over it, cursor back to the start.
    fn erase_display(&self, term: &mut dyn Write) -> io::Result<()> {
        write_cursor_backward(term, self.cursor)?;
        let blanks = vec![b' '; self.buffer.len()];
        term.write_all(&blanks)?;
        write_cursor_backward(term, self.buffer.len())
    }
}
