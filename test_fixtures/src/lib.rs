// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # Introduction
//!
//! This is a test fixtures library that provides reusable components for testing the
//! `r3bl_shell` and `r3bl_periodic` crates. It is intended to be a
//! [`dev-dependency`](https://doc.rust-lang.org/cargo/reference/specifying-dependencies.html#dev-dependencies)
//! for the other crates in this workspace.
//!
//! 1. The input device fixtures feed scripted bytes into a line editor, in chunks, the
//!    way a terminal delivers them.
//! 2. The output device fixtures capture everything written to "stdout" so that the
//!    exact byte sequences (cursor movement, echo) can be asserted on.
//! 3. [`create_temp_dir`] and the `pwd` macros help with tests that touch the file
//!    system or the process working directory.
//!
//! # stdout fixtures
//!
//! ```
//! use std::io::Write;
//! use r3bl_test_fixtures::StdoutMock;
//!
//! let mut stdout_mock = StdoutMock::default();
//! let stdout_mock_clone = stdout_mock.clone(); // Same inner buffer.
//!
//! stdout_mock.write_all(b"\x1b[1Dhello").unwrap();
//!
//! assert_eq!(stdout_mock_clone.get_copy_of_buffer_as_string_strip_ansi(), "hello");
//! ```

// Attach sources.
pub mod input_device_fixtures;
pub mod output_device_fixtures;
pub mod pwd_fixtures;
pub mod temp_dir;

// Re-export.
pub use input_device_fixtures::*;
pub use output_device_fixtures::*;
pub use temp_dir::*;
