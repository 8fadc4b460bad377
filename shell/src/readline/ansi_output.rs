// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The only control sequences the line editor writes. Everything else it writes is
//! 7-bit ASCII.

use std::{fmt::{Display, Formatter, Result},
          io::{self, Write}};

pub const ASCII_BACKSPACE: u8 = 0x08;

/// CSI sequences that move the cursor on the current row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsiSequence {
    /// `ESC [ n D`
    CursorBackward(usize),
    /// `ESC [ n C`
    CursorForward(usize),
}

impl Display for CsiSequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            CsiSequence::CursorBackward(n) => write!(f, "\x1b[{n}D"),
            CsiSequence::CursorForward(n) => write!(f, "\x1b[{n}C"),
        }
    }
}

/// No output for `n == 0`, since `ESC [ 0 D` moves by one on most terminals.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn write_cursor_backward(term: &mut dyn Write, n: usize) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(term, "{}", CsiSequence::CursorBackward(n))
}

/// No output for `n == 0`.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn write_cursor_forward(term: &mut dyn Write, n: usize) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(term, "{}", CsiSequence::CursorForward(n))
}
