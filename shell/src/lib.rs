// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # r3bl_shell
//!
//! A small interactive command shell for Unix terminals. It reads a line of input with
//! a byte-level line editor (cursor movement, history, `Tab` completion), expands
//! environment variables, parses I/O redirections, and then either runs a built-in
//! command or forks and executes an external program in the foreground or the
//! background.
//!
//! The pieces are independent of each other and can be used separately:
//!
//! | Module         | What it does                                                   |
//! |:---------------|:---------------------------------------------------------------|
//! | [`history`]    | Fixed capacity ring of previously entered lines + navigation.  |
//! | [`readline`]   | Key decoding, in-place line editing, terminal mode switching.  |
//! | [`completion`] | Filename and `$PATH` executable completion for `Tab`.          |
//! | [`expansion`]  | `$NAME`, `${NAME}`, `$?` expansion and tokenizing into argv.   |
//! | [`job`]        | Redirections, fork / exec, foreground wait, background reaping. |
//! | [`dispatch`]   | Built-ins, the prompt, interactive and script modes.           |
//!
//! The binary (`shell`) wires these together, see [`Shell`].

#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach sources.
pub mod completion;
pub mod config;
pub mod decl_macros;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod expansion;
pub mod history;
pub mod job;
pub mod log;
pub mod readline;

// Re-export.
pub use completion::*;
pub use config::*;
pub use dispatch::*;
pub use env::*;
pub use error::*;
pub use expansion::*;
pub use history::*;
pub use job::*;
pub use log::*;
pub use readline::*;
