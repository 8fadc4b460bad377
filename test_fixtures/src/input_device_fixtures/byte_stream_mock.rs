// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{collections::VecDeque,
          io::{self, Read}};

/// One scripted outcome of a `read(2)` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadStep {
    /// The bytes delivered by one read. A terminal delivers a whole escape sequence
    /// in a single read, so keep them together in one chunk.
    Bytes(Vec<u8>),
    /// The read was interrupted by a signal (`EINTR`).
    Interrupted,
}

/// A [Read] implementation that replays [`ReadStep`]s, then reports end of input.
#[derive(Clone, Debug, Default)]
pub struct ByteStreamMock {
    steps: VecDeque<ReadStep>,
}

impl ByteStreamMock {
    #[must_use]
    pub fn new(steps: impl IntoIterator<Item = ReadStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    /// Each chunk becomes one read.
    #[must_use]
    pub fn from_chunks<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> Self {
        Self::new(chunks.into_iter().map(|it| ReadStep::Bytes(it.to_vec())))
    }

    /// Number of steps not consumed yet.
    #[must_use]
    pub fn remaining(&self) -> usize { self.steps.len() }
}

impl Read for ByteStreamMock {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.steps.pop_front() {
            None => Ok(0),
            Some(ReadStep::Interrupted) => Err(io::ErrorKind::Interrupted.into()),
            Some(ReadStep::Bytes(mut bytes)) => {
                let count = bytes.len().min(buf.len());
                buf[..count].copy_from_slice(&bytes[..count]);
                if count < bytes.len() {
                    let rest = bytes.split_off(count);
                    self.steps.push_front(ReadStep::Bytes(rest));
                }
                Ok(count)
            }
        }
    }
}
