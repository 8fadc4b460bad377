// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Stateful decoder for terminal input bytes. See [`KeyDecoder`] docs.

use std::collections::VecDeque;

const ASCII_ESC: u8 = 0x1b;
const ASCII_DEL: u8 = 0x7f;
const ASCII_ETX: u8 = 0x03;
const ASCII_EOT: u8 = 0x04;
const ASCII_NAK: u8 = 0x15;

/// Longer escape sequences than this are not something the editor understands, and are
/// dropped.
const MAX_SEQUENCE_LEN: usize = 16;

/// The keys the line editor reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// A byte in `0x20..=0x7e`.
    Printable(u8),
    Enter,
    Backspace,
    /// Delete the byte under the cursor.
    Delete,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Insert,
    PageUp,
    PageDown,
    /// `Ctrl+C` (`0x03`, or `ESC ^ C`).
    Abort,
    /// `Ctrl+U` (`0x15`, or `ESC ^ U`).
    KillLine,
    /// `Ctrl+D` (`0x04`).
    EndOfInput,
}

/// What a `DEL` (`0x7f`) byte means. Many terminals send it for the `Backspace` key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DelKeyBehavior {
    #[default]
    DeleteForward,
    Backspace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParseOutcome {
    /// Need more bytes.
    Incomplete,
    Key(Key),
    /// A complete sequence (or byte) that maps to no key.
    Dropped,
}

/// Stateful decoder for terminal input bytes.
///
/// Accumulates bytes and parses them into [`Key`]s using the `more` flag for `ESC`
/// disambiguation:
///
/// - `more = true`: More bytes might be coming, wait before deciding
/// - `more = false`: No more bytes available, a lone `ESC` is the `ESC` key (which the
///   editor ignores)
///
/// This works because if [`read()`] fills the entire buffer, more data is likely
/// waiting; if it returns fewer bytes, we've drained all available input.
///
/// [`read()`]: std::io::Read::read
#[derive(Debug)]
pub struct KeyDecoder {
    /// Accumulator for the escape sequence being parsed.
    buffer: Vec<u8>,
    /// Decoded keys ready to be consumed.
    internal_keys: VecDeque<Key>,
    del_key: DelKeyBehavior,
}

impl Default for KeyDecoder {
    fn default() -> Self { Self::new(DelKeyBehavior::default()) }
}

impl KeyDecoder {
    #[must_use]
    pub fn new(del_key: DelKeyBehavior) -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_SEQUENCE_LEN),
            internal_keys: VecDeque::with_capacity(64),
            del_key,
        }
    }

    /// Process incoming bytes.
    /// - `bytes`: Raw bytes read from the terminal.
    /// - `more`: Whether more data is likely available (`read_count == buffer size`).
    pub fn advance(&mut self, bytes: &[u8], more: bool) {
        for (idx, byte) in bytes.iter().enumerate() {
            let more = idx + 1 < bytes.len() || more;

            // An `ESC` in the middle of a sequence starts a new one.
            if *byte == ASCII_ESC && !self.buffer.is_empty() {
                self.buffer.clear();
            }
            self.buffer.push(*byte);

            match try_parse_key(&self.buffer, more, self.del_key) {
                ParseOutcome::Incomplete => {}
                ParseOutcome::Key(key) => {
                    self.internal_keys.push_back(key);
                    self.buffer.clear();
                }
                ParseOutcome::Dropped => self.buffer.clear(),
            }
        }
    }

    /// `true` if part of an escape sequence is still buffered.
    #[must_use]
    pub fn is_mid_sequence(&self) -> bool { !self.buffer.is_empty() }
}

impl Iterator for KeyDecoder {
    type Item = Key;

    fn next(&mut self) -> Option<Self::Item> { self.internal_keys.pop_front() }
}

fn try_parse_key(buffer: &[u8], more: bool, del_key: DelKeyBehavior) -> ParseOutcome {
    match buffer {
        [] => ParseOutcome::Incomplete,
        [ASCII_ESC] if more => ParseOutcome::Incomplete,
        [ASCII_ESC] => ParseOutcome::Dropped,
        [ASCII_ESC, ..] if buffer.len() > MAX_SEQUENCE_LEN => ParseOutcome::Dropped,
        [ASCII_ESC, b'[', params @ ..] => parse_csi(params),
        [ASCII_ESC, b'O'] | [ASCII_ESC, b'^'] => ParseOutcome::Incomplete,
        [ASCII_ESC, b'O', final_byte] => match final_byte {
            b'A' => ParseOutcome::Key(Key::Up),
            b'B' => ParseOutcome::Key(Key::Down),
            b'C' => ParseOutcome::Key(Key::Right),
            b'D' => ParseOutcome::Key(Key::Left),
            b'H' => ParseOutcome::Key(Key::Home),
            b'F' => ParseOutcome::Key(Key::End),
            _ => ParseOutcome::Dropped,
        },
        [ASCII_ESC, b'^', b'C'] => ParseOutcome::Key(Key::Abort),
        [ASCII_ESC, b'^', b'U'] => ParseOutcome::Key(Key::KillLine),
        [ASCII_ESC, ..] => ParseOutcome::Dropped,
        [byte] => parse_single_byte(*byte, del_key),
        // Only escape sequences are ever buffered.
        _ => ParseOutcome::Dropped,
    }
}

fn parse_single_byte(byte: u8, del_key: DelKeyBehavior) -> ParseOutcome {
    let key = match byte {
        b'\n' | b'\r' => Key::Enter,
        b'\t' => Key::Tab,
        0x08 => Key::Backspace,
        ASCII_DEL => match del_key {
            DelKeyBehavior::DeleteForward => Key::Delete,
            DelKeyBehavior::Backspace => Key::Backspace,
        },
        ASCII_ETX => Key::Abort,
        ASCII_EOT => Key::EndOfInput,
        ASCII_NAK => Key::KillLine,
        0x20..=0x7e => Key::Printable(byte),
        _ => return ParseOutcome::Dropped,
    };
    ParseOutcome::Key(key)
}

/// `params` is everything after `ESC [`. Parameter bytes are `0x30..=0x3f`,
/// intermediate bytes `0x20..=0x2f`, and the final byte is `0x40..=0x7e`.
fn parse_csi(params: &[u8]) -> ParseOutcome {
    let Some((final_byte, head)) = params.split_last() else {
        return ParseOutcome::Incomplete;
    };
    match final_byte {
        0x20..=0x3f => ParseOutcome::Incomplete,
        // Modifiers (eg: `ESC [ 1 ; 5 C`) are ignored for the arrows.
        b'A' => ParseOutcome::Key(Key::Up),
        b'B' => ParseOutcome::Key(Key::Down),
        b'C' => ParseOutcome::Key(Key::Right),
        b'D' => ParseOutcome::Key(Key::Left),
        b'H' => ParseOutcome::Key(Key::Home),
        b'F' => ParseOutcome::Key(Key::End),
        b'~' => match head {
            b"1" | b"7" => ParseOutcome::Key(Key::Home),
            b"2" => ParseOutcome::Key(Key::Insert),
            b"3" => ParseOutcome::Key(Key::Delete),
            b"4" | b"8" => ParseOutcome::Key(Key::End),
            b"5" => ParseOutcome::Key(Key::PageUp),
            b"6" => ParseOutcome::Key(Key::PageDown),
            _ => ParseOutcome::Dropped,
        },
        _ => ParseOutcome::Dropped,
    }
}
