// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{io::{Result, Write},
          sync::{Arc, Mutex as StdMutex}};

use smallvec::{SmallVec, smallvec};
use strip_ansi_escapes::strip;

/// Inline storage for the captured bytes. Most tests write less than this.
pub type CapturedBytes = SmallVec<[u8; 256]>;

/// You can safely clone this struct, since it only contains an `Arc<StdMutex<..>>`.
/// The inner `buffer` will not be cloned, just the [Arc] will be cloned. Hand one clone
/// to the code under test and keep the other one to make assertions.
#[derive(Clone, Debug)]
pub struct StdoutMock {
    pub buffer: Arc<StdMutex<CapturedBytes>>,
}

impl Default for StdoutMock {
    fn default() -> Self {
        Self {
            buffer: Arc::new(StdMutex::new(smallvec![])),
        }
    }
}

impl StdoutMock {
    #[must_use]
    pub fn new() -> Self { Self::default() }
}

impl StdoutMock {
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn get_copy_of_buffer(&self) -> CapturedBytes {
        self.buffer.lock().unwrap().clone()
    }

    /// # Panics
    ///
    /// Panics if the lock is poisoned or the bytes are not UTF-8.
    #[must_use]
    pub fn get_copy_of_buffer_as_string(&self) -> String {
        let buffer_data = self.buffer.lock().unwrap();
        String::from_utf8(buffer_data.to_vec()).expect("utf8")
    }

    /// # Panics
    ///
    /// Panics if the lock is poisoned or the bytes are not UTF-8.
    #[must_use]
    pub fn get_copy_of_buffer_as_string_strip_ansi(&self) -> String {
        let buffer_data = self.buffer.lock().unwrap();
        let buffer_data = strip(buffer_data.to_vec());
        String::from_utf8(buffer_data).expect("utf8")
    }

    /// Empty the buffer, so the next assertion only sees new output.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn clear(&self) { self.buffer.lock().unwrap().clear(); }
}

impl Write for StdoutMock {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> { Ok(()) }
}
