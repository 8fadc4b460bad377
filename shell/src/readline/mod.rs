// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod ansi_output;
pub mod event_handlers;
pub mod key_decoder;
pub mod line_state;
pub mod readline_impl;
pub mod terminal_mode;

// Re-export.
pub use ansi_output::*;
pub use event_handlers::*;
pub use key_decoder::*;
pub use line_state::*;
pub use readline_impl::*;
pub use terminal_mode::*;

/// Flip this to `false` to silence the `tracing::debug!` calls in this module.
pub const DEBUG_READLINE_MOD: bool = true;

/// One `tracing::debug!` per key. Noisy, so it is off even when the module is on.
pub const DEBUG_READLINE_SHOW_KEYS: bool = false;
